use std::collections::HashSet;

use num_bigint::BigUint;
use test_log::test;

use petri_rs::encoder::SymbolicContext;
use petri_rs::explicit::{self, Order};
use petri_rs::model::{Marking, Model, ModelBuilder};
use petri_rs::reach::{self, Fixpoint, ReachOptions, ReachState};

mod common;
use common::*;

fn nets() -> Vec<(&'static str, Model)> {
    vec![
        ("diamond", diamond()),
        ("ring4", ring(4)),
        ("ring9", ring(9)),
        ("philosophers2", philosophers(2)),
        ("philosophers3", philosophers(3)),
        ("philosophers4", philosophers(4)),
        ("mutex3", mutex(3)),
        ("fork_join", fork_join()),
    ]
}

#[test]
fn test_symbolic_count_matches_explicit() {
    for (name, model) in nets() {
        let ctx = SymbolicContext::new(&model);
        let result = reach::run(&ctx, &model, ReachOptions::default()).unwrap();
        assert_eq!(result.state, ReachState::Converged, "{}", name);

        for order in [Order::Bfs, Order::Dfs] {
            let e = explicit::enumerate(&model, order);
            assert!(e.complete);
            assert_eq!(result.states, BigUint::from(e.states), "{} ({:?})", name, order);
        }
    }
}

#[test]
fn test_symbolic_set_matches_explicit() {
    for (name, model) in nets() {
        let ctx = SymbolicContext::new(&model);
        let result = reach::run(&ctx, &model, ReachOptions::default()).unwrap();
        let e = explicit::enumerate(&model, Order::Bfs);

        let symbolic: HashSet<Marking> = result.reached.markings().into_iter().collect();
        assert_eq!(symbolic, e.markings, "{}", name);
        for m in &e.markings {
            assert!(result.reached.is_reachable(m), "{}: {}", name, m);
        }
    }
}

#[test]
fn test_known_counts() {
    let cases = [
        (diamond(), 3u32),
        (ring(6), 6),
        (philosophers(3), 14),
        (philosophers(4), 34),
        (mutex(3), 20),
        (mutex(4), 48),
        (fork_join(), 5),
    ];
    for (model, expected) in cases {
        let ctx = SymbolicContext::new(&model);
        let result = reach::run(&ctx, &model, ReachOptions::default()).unwrap();
        assert_eq!(result.states, BigUint::from(expected));
        assert!(result.reached.is_reachable(model.initial_marking()));
    }
}

#[test]
fn test_diamond_reached_set() {
    let model = diamond();
    let ctx = SymbolicContext::new(&model);
    let result = reach::run(&ctx, &model, ReachOptions::default()).unwrap();

    assert_eq!(
        result.reached.markings(),
        vec![
            Marking::from([0, 0, 0, 1]),
            Marking::from([0, 1, 1, 0]),
            Marking::from([1, 0, 0, 0]),
        ]
    );
    assert!(!result.reached.is_reachable(&Marking::from([0, 1, 0, 0])));
    assert!(!result.reached.is_reachable(&Marking::from([1, 1, 1, 1])));
}

#[test]
fn test_fixpoint_is_monotone_and_bounded() {
    for (name, model) in nets() {
        let explicit_states = explicit::enumerate(&model, Order::Bfs).states;
        let ctx = SymbolicContext::new(&model);
        let mut fixpoint = Fixpoint::new(&ctx, &model, ReachOptions::default()).unwrap();

        let mut previous = BigUint::from(1u32);
        while let Some(stats) = fixpoint.step().unwrap() {
            assert!(stats.states > previous, "{}", name);
            previous = stats.states.clone();
        }
        assert_eq!(fixpoint.state(), ReachState::Converged);
        assert!(fixpoint.iterations() < explicit_states, "{}", name);

        let result = fixpoint.finish();
        assert_eq!(result.states, BigUint::from(explicit_states));
    }
}

#[test]
fn test_zero_transitions() {
    let mut builder = ModelBuilder::new();
    builder.place("a", 1).place("b", 0).place("c", 1);
    let model = builder.build().unwrap();
    let ctx = SymbolicContext::new(&model);
    let result = reach::run(&ctx, &model, ReachOptions::default()).unwrap();

    assert!(result.is_complete());
    assert_eq!(result.iterations, 0);
    assert_eq!(result.reached.markings(), vec![Marking::from([1, 0, 1])]);
}

#[test]
fn test_budget_gives_under_approximation() {
    let model = ring(10);
    let ctx = SymbolicContext::new(&model);
    let options = ReachOptions {
        max_iters: 4,
        ..ReachOptions::default()
    };
    let result = reach::run(&ctx, &model, options).unwrap();
    assert_eq!(result.state, ReachState::BudgetExceeded);
    assert!(!result.is_complete());

    let all = explicit::enumerate(&model, Order::Bfs);
    for m in result.reached.markings() {
        assert!(all.contains(&m));
    }
    assert!(result.states < BigUint::from(all.states));
}

#[test]
fn test_independent_contexts() {
    let a = philosophers(3);
    let b = mutex(3);
    let ctx_a = SymbolicContext::new(&a);
    let ctx_b = SymbolicContext::new(&b);
    let ra = reach::run(&ctx_a, &a, ReachOptions::default()).unwrap();
    let rb = reach::run(&ctx_b, &b, ReachOptions::default()).unwrap();

    assert_eq!(ra.states, BigUint::from(14u32));
    assert_eq!(rb.states, BigUint::from(20u32));
    drop(ra);
    assert!(rb.reached.is_reachable(b.initial_marking()));
}
