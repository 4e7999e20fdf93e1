#![allow(dead_code)]

use petri_rs::model::{Model, ModelBuilder};

pub fn diamond() -> Model {
    let mut builder = ModelBuilder::new();
    builder.place("p0", 1).place("p1", 0).place("p2", 0).place("p3", 0);
    builder.transition("t0").input("p0").output("p1").output("p2");
    builder.transition("t1").input("p1").input("p2").output("p3");
    builder.build().unwrap()
}

pub fn ring(n: usize) -> Model {
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
    builder.build().unwrap()
}

/// Philosophers taking the left fork first; deadlocks when everyone holds one fork.
pub fn philosophers(n: usize) -> Model {
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
    builder.build().unwrap()
}

pub fn mutex(n: usize) -> Model {
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
    builder.build().unwrap()
}

/// Two independent branches forked from one place and joined back into it.
pub fn fork_join() -> Model {
    let mut builder = ModelBuilder::new();
    builder
        .place("start", 1)
        .place("a0", 0)
        .place("a1", 0)
        .place("b0", 0)
        .place("b1", 0);
    builder.transition("fork").input("start").output("a0").output("b0");
    builder.transition("step_a").input("a0").output("a1");
    builder.transition("step_b").input("b0").output("b1");
    builder.transition("join").input("a1").input("b1").output("start");
    builder.build().unwrap()
}
