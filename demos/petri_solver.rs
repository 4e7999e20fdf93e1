use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use petri_rs::analysis::{AnalysisOptions, Analyzer};
use petri_rs::bdd::BddConfig;
use petri_rs::dot::net_to_dot;
use petri_rs::explicit::Order;
use petri_rs::model::{Model, ModelBuilder};
use petri_rs::reach::ReachOptions;
use petri_rs::search::SearchOptions;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Net {
    /// Fork into two places, join into one.
    Diamond,
    /// A single token circulating over `n` places.
    Ring,
    /// Dining philosophers picking up the left fork first.
    Philosophers,
    /// `n` processes sharing one lock.
    Mutex,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Explicit {
    Bfs,
    Dfs,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Net to analyze.
    #[arg(value_enum, default_value = "philosophers")]
    net: Net,

    /// Net size (ignored for the diamond).
    #[clap(short, long, value_name = "INT", default_value = "5")]
    n: usize,

    /// Search for a reachable deadlock.
    #[clap(long)]
    deadlock: bool,

    /// Maximize the weighted token sum, one weight per place (comma-separated).
    #[clap(long, value_name = "INT,...", value_delimiter = ',', allow_hyphen_values = true)]
    weights: Option<Vec<i64>>,

    /// BDD size (in bits, so the actual size is `2^size` nodes).
    #[clap(long, value_name = "INT", value_parser = clap::value_parser!(u8).range(1..=31))]
    size: Option<u8>,

    /// Maximum number of image iterations.
    #[clap(long, value_name = "INT", default_value = "1000")]
    max_iters: usize,

    /// Maximum number of no-good cuts per search.
    #[clap(long, value_name = "INT", default_value = "10000")]
    max_cuts: usize,

    /// Disable garbage collection between iterations.
    #[clap(long)]
    no_gc: bool,

    /// Run the searches on a partial reached set.
    #[clap(long)]
    allow_partial: bool,

    /// Cross-check the state count with explicit enumeration.
    #[clap(long, value_enum, value_name = "ORDER")]
    explicit: Option<Explicit>,

    /// Print the solver log.
    #[clap(short, long)]
    verbose: bool,

    /// Write the net in DOT format to this file.
    #[clap(long, value_name = "FILE")]
    dot: Option<PathBuf>,
}

fn diamond() -> color_eyre::Result<Model> {
    let mut builder = ModelBuilder::new();
    builder.place("p0", 1).place("p1", 0).place("p2", 0).place("p3", 0);
    builder.transition("t0").input("p0").output("p1").output("p2");
    builder.transition("t1").input("p1").input("p2").output("p3");
    Ok(builder.build()?)
}

fn ring(n: usize) -> color_eyre::Result<Model> {
    let mut builder = ModelBuilder::new();
    for i in 0..n {
        builder.place(&format!("p{}", i), (i == 0) as u8);
    }
    for i in 0..n {
        builder
            .transition(&format!("t{}", i))
            .input(&format!("p{}", i))
            .output(&format!("p{}", (i + 1) % n));
    }
    Ok(builder.build()?)
}

fn philosophers(n: usize) -> color_eyre::Result<Model> {
    let mut builder = ModelBuilder::new();
    for i in 0..n {
        builder
            .place(&format!("think{}", i), 1)
            .place(&format!("left{}", i), 0)
            .place(&format!("eat{}", i), 0)
            .place(&format!("fork{}", i), 1);
    }
    for i in 0..n {
        let right = format!("fork{}", (i + 1) % n);
        builder
            .transition(&format!("take_left{}", i))
            .input(&format!("think{}", i))
            .input(&format!("fork{}", i))
            .output(&format!("left{}", i));
        builder
            .transition(&format!("take_right{}", i))
            .input(&format!("left{}", i))
            .input(&right)
            .output(&format!("eat{}", i));
        builder
            .transition(&format!("release{}", i))
            .input(&format!("eat{}", i))
            .output(&format!("think{}", i))
            .output(&format!("fork{}", i))
            .output(&right);
    }
    Ok(builder.build()?)
}

fn mutex(n: usize) -> color_eyre::Result<Model> {
    let mut builder = ModelBuilder::new();
    builder.place("lock", 1);
    for i in 0..n {
        builder
            .place(&format!("idle{}", i), 1)
            .place(&format!("wait{}", i), 0)
            .place(&format!("crit{}", i), 0);
    }
    for i in 0..n {
        builder
            .transition(&format!("request{}", i))
            .input(&format!("idle{}", i))
            .output(&format!("wait{}", i));
        builder
            .transition(&format!("enter{}", i))
            .input(&format!("wait{}", i))
            .input("lock")
            .output(&format!("crit{}", i));
        builder
            .transition(&format!("leave{}", i))
            .input(&format!("crit{}", i))
            .output(&format!("idle{}", i))
            .output("lock");
    }
    Ok(builder.build()?)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let model = match args.net {
        Net::Diamond => diamond()?,
        Net::Ring => ring(args.n)?,
        Net::Philosophers => philosophers(args.n)?,
        Net::Mutex => mutex(args.n)?,
    };
    info!(
        "{:?} net: {} places, {} transitions",
        args.net,
        model.num_places(),
        model.num_transitions()
    );

    if let Some(path) = &args.dot {
        fs::write(path, net_to_dot(&model)?)?;
        info!("net written to {}", path.display());
    }

    let bdd = args.size.map(|size| BddConfig {
        storage_bits: size as usize,
        cache_bits: (size as usize).saturating_sub(2).min(18),
    });
    let options = AnalysisOptions {
        bdd,
        reach: ReachOptions {
            max_iters: args.max_iters,
            gc: !args.no_gc,
        },
        search: SearchOptions {
            max_cuts: args.max_cuts,
            verbose: args.verbose,
        },
        deadlock: args.deadlock,
        weights: args.weights.clone(),
        allow_partial: args.allow_partial,
        explicit: args.explicit.map(|order| match order {
            Explicit::Bfs => Order::Bfs,
            Explicit::Dfs => Order::Dfs,
        }),
    };

    let report = Analyzer::new(&model, options).run()?;
    print!("{}", report);

    println!("Total time: {:?}", time_total.elapsed());
    Ok(())
}
