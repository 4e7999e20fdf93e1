//! Symbolic reachability by frontier-based fixpoint iteration.
//!
//! ```text
//! Reached := New := M0
//! loop:
//!     Next := (∃x. New(x) ∧ TR(x, x'))[x' := x]
//!     Diff := Next ∧ ¬Reached
//!     if Diff = 0: converged
//!     Reached := Reached ∨ Diff; New := Diff
//! ```
//!
//! Only the frontier `New` is fed to the image computation, so every marking is expanded once.

use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use log::{debug, info};
use num_bigint::BigUint;

use crate::encoder::SymbolicContext;
use crate::error::ReachError;
use crate::model::Model;
use crate::reached::ReachedSet;
use crate::reference::Ref;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReachState {
    Init,
    Iterating,
    Converged,
    BudgetExceeded,
}

impl Display for ReachState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReachState::Init => "init",
            ReachState::Iterating => "iterating",
            ReachState::Converged => "converged",
            ReachState::BudgetExceeded => "budget exceeded",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ReachOptions {
    /// Maximum number of image steps that may discover new markings.
    pub max_iters: usize,
    /// Collect garbage between iterations when the node pool is more than half full.
    pub gc: bool,
}

impl Default for ReachOptions {
    fn default() -> Self {
        Self { max_iters: 1000, gc: true }
    }
}

/// Statistics of one completed iteration.
#[derive(Debug, Clone)]
pub struct IterationStats {
    pub iteration: usize,
    /// Markings discovered by this iteration.
    pub new_states: BigUint,
    /// Markings reached so far.
    pub states: BigUint,
    pub reached_nodes: usize,
    pub pool_nodes: usize,
}

#[derive(Debug)]
pub struct ReachResult {
    pub state: ReachState,
    /// Number of reached markings.
    pub states: BigUint,
    /// Size of the reached-set BDD.
    pub reached_nodes: usize,
    /// Live nodes in the whole pool at the end of the run.
    pub pool_nodes: usize,
    pub iterations: usize,
    pub elapsed: Duration,
    pub reached: ReachedSet,
}

impl ReachResult {
    /// Whether the fixpoint was reached. A partial result under-approximates the reachable set.
    pub fn is_complete(&self) -> bool {
        self.state == ReachState::Converged
    }
}

/// The fixpoint state machine.
pub struct Fixpoint<'a> {
    ctx: &'a SymbolicContext,
    options: ReachOptions,
    state: ReachState,
    tr: Ref,
    reached: Ref,
    new: Ref,
    iterations: usize,
    start: Instant,
}

impl<'a> Fixpoint<'a> {
    /// Encode the initial marking and the transition relation.
    pub fn new(ctx: &'a SymbolicContext, model: &Model, options: ReachOptions) -> Result<Self, ReachError> {
        let start = Instant::now();
        let tr = ctx.build_transition_relation(model)?;
        let init = ctx.encode_marking(model.initial_marking())?;
        debug!(
            "transition relation: {} nodes over {} transitions",
            ctx.bdd().size(tr),
            model.num_transitions()
        );
        Ok(Self {
            ctx,
            options,
            state: ReachState::Init,
            tr,
            reached: init,
            new: init,
            iterations: 0,
            start,
        })
    }

    pub fn state(&self) -> ReachState {
        self.state
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Current reached set. Only valid until the next garbage collection.
    pub fn reached(&self) -> Ref {
        self.reached
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, ReachState::Converged | ReachState::BudgetExceeded)
    }

    /// Perform one image step.
    ///
    /// Returns the statistics of the iteration, or `None` if the step reached a terminal state
    /// without discovering anything.
    pub fn step(&mut self) -> Result<Option<IterationStats>, ReachError> {
        if self.is_terminal() {
            return Ok(None);
        }
        self.state = ReachState::Iterating;

        let bdd = self.ctx.bdd();
        let next = self.ctx.image(self.new, self.tr)?;
        let diff = bdd.apply_diff(next, self.reached)?;

        if bdd.is_zero(diff) {
            self.state = ReachState::Converged;
            return Ok(None);
        }

        self.reached = bdd.apply_or(self.reached, diff)?;
        self.new = diff;
        self.iterations += 1;

        let stats = IterationStats {
            iteration: self.iterations,
            new_states: self.ctx.count_states(diff),
            states: self.ctx.count_states(self.reached),
            reached_nodes: bdd.size(self.reached),
            pool_nodes: bdd.num_nodes(),
        };
        debug!(
            "iteration {}: +{} markings, {} total, {} nodes in reached set, {} in pool, {} cache hits",
            stats.iteration,
            stats.new_states,
            stats.states,
            stats.reached_nodes,
            stats.pool_nodes,
            bdd.cache_hits()
        );

        if self.iterations > self.options.max_iters {
            self.state = ReachState::BudgetExceeded;
        } else if self.options.gc && bdd.num_nodes() > bdd.capacity() / 2 {
            bdd.collect_garbage(&[self.tr, self.reached, self.new]);
        }

        Ok(Some(stats))
    }

    /// Package the terminal state into a result.
    pub fn finish(self) -> ReachResult {
        let bdd = self.ctx.bdd();
        let reached = ReachedSet::new(self.ctx.clone(), self.reached, self.state == ReachState::Converged);
        ReachResult {
            state: self.state,
            states: self.ctx.count_states(self.reached),
            reached_nodes: bdd.size(self.reached),
            pool_nodes: bdd.num_nodes(),
            iterations: self.iterations,
            elapsed: self.start.elapsed(),
            reached,
        }
    }
}

/// Compute the markings reachable from the initial marking of `model`.
pub fn run(ctx: &SymbolicContext, model: &Model, options: ReachOptions) -> Result<ReachResult, ReachError> {
    run_with(ctx, model, options, |_| {})
}

/// Like [`run`], calling `observer` after every iteration that discovered new markings.
pub fn run_with(
    ctx: &SymbolicContext,
    model: &Model,
    options: ReachOptions,
    mut observer: impl FnMut(&IterationStats),
) -> Result<ReachResult, ReachError> {
    let mut fixpoint = Fixpoint::new(ctx, model, options)?;
    while !fixpoint.is_terminal() {
        if let Some(stats) = fixpoint.step()? {
            observer(&stats);
        }
    }

    let result = fixpoint.finish();
    info!(
        "reachability {} after {} iterations: {} markings, {} nodes, {:?}",
        result.state, result.iterations, result.states, result.reached_nodes, result.elapsed
    );
    Ok(result)
}
