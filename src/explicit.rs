//! Explicit state-space enumeration, the baseline the symbolic engine is checked against.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::model::{Marking, Model};

/// Exploration order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Order {
    Bfs,
    Dfs,
}

#[derive(Debug, Clone)]
pub struct ExplicitResult {
    pub states: usize,
    pub markings: HashSet<Marking>,
    /// False if the state limit stopped the exploration.
    pub complete: bool,
    pub elapsed: Duration,
}

impl ExplicitResult {
    pub fn contains(&self, m: &Marking) -> bool {
        self.markings.contains(m)
    }

    /// Reachable markings with no enabled transition.
    pub fn deadlocks<'a>(&'a self, model: &'a Model) -> impl Iterator<Item = &'a Marking> + 'a {
        self.markings.iter().filter(move |m| model.is_deadlock(m))
    }
}

/// Enumerate every marking reachable from the initial marking.
pub fn enumerate(model: &Model, order: Order) -> ExplicitResult {
    enumerate_bounded(model, order, usize::MAX)
}

/// Like [`enumerate`], stopping once `max_states` markings are known.
pub fn enumerate_bounded(model: &Model, order: Order, max_states: usize) -> ExplicitResult {
    let start = Instant::now();
    let m0 = model.initial_marking().clone();

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(m0.clone());
    queue.push_back(m0);
    let mut complete = true;

    'outer: while let Some(current) = match order {
        Order::Bfs => queue.pop_front(),
        Order::Dfs => queue.pop_back(),
    } {
        for t in model.enabled(&current) {
            if let Some(next) = model.fire(&current, t) {
                if !visited.contains(&next) {
                    if visited.len() >= max_states {
                        complete = false;
                        break 'outer;
                    }
                    visited.insert(next.clone());
                    queue.push_back(next);
                }
            }
        }
    }

    if !complete {
        warn!("explicit enumeration stopped at {} markings", visited.len());
    }
    let result = ExplicitResult {
        states: visited.len(),
        markings: visited,
        complete,
        elapsed: start.elapsed(),
    };
    info!("{:?}: {} markings in {:?}", order, result.states, result.elapsed);
    result
}
