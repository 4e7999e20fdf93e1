use std::time::{Duration, Instant};

use log::{info, warn};

use super::{CuttingPlanes, SearchOptions, SearchOutcome};
use crate::error::{ModelError, SearchError};
use crate::milp::{Col, Problem, RowBound, Sense};
use crate::model::{Marking, Model};
use crate::reached::ReachedSet;

#[derive(Debug, Clone)]
pub struct DeadlockResult {
    pub outcome: SearchOutcome,
    /// Number of no-good cuts added.
    pub cuts: usize,
    pub elapsed: Duration,
}

impl DeadlockResult {
    pub fn found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found(_))
    }

    /// Whether the witness is reachable; only accepted witnesses are reported, so this is `found()`.
    pub fn reachable(&self) -> bool {
        self.found()
    }

    pub fn witness(&self) -> Option<&Marking> {
        self.outcome.witness()
    }

    /// Whether the budget ran out, leaving the question open.
    pub fn is_unknown(&self) -> bool {
        self.outcome == SearchOutcome::BudgetExceeded
    }
}

/// Search for a reachable dead marking, preferring the fewest tokens.
///
/// A candidate is accepted only if the reached set contains it and no transition of `model` is
/// enabled in it. The structural rows are exact for 0/1 `Pre` entries only, so weighted nets
/// are rejected.
///
/// A witness found in a partial reached set is still a reachable deadlock, but running out of
/// candidates there proves nothing: the outcome is then `BudgetExceeded`, not `Absent`.
pub fn find_deadlock(model: &Model, reached: &ReachedSet, options: SearchOptions) -> Result<DeadlockResult, SearchError> {
    let start = Instant::now();
    if model.num_places() == 0 {
        return Err(ModelError::Empty.into());
    }
    model.check_one_safe_arcs()?;

    let done = |outcome: SearchOutcome, cuts: usize| {
        let result = DeadlockResult {
            outcome,
            cuts,
            elapsed: start.elapsed(),
        };
        info!("deadlock search: {} ({} cuts, {:?})", result.outcome, result.cuts, result.elapsed);
        Ok(result)
    };

    if model.num_transitions() == 0 {
        let m0 = model.initial_marking();
        return if reached.is_reachable(m0) {
            done(SearchOutcome::Found(m0.clone()), 0)
        } else {
            warn!("net has no transitions but the reached set does not contain the initial marking");
            done(super::settle(SearchOutcome::Absent, reached), 0)
        };
    }

    if let Some(t) = model.transition_ids().find(|&t| model.total_pre(t) == 0) {
        info!(
            "transition '{}' consumes no tokens and is always enabled, no deadlock",
            model.transition_name(t)
        );
        return done(SearchOutcome::Absent, 0);
    }

    let mut problem = Problem::new("deadlock", Sense::Minimize);
    let cols: Vec<Col> = model
        .place_ids()
        .map(|p| problem.add_binary(&format!("M_{}", model.place_name(p)), 1.0))
        .collect();

    // Every transition must miss at least one of its input tokens.
    for t in model.transition_ids() {
        let coeffs = model.input_places(t).map(|p| (cols[p.index()], 1.0));
        problem.add_row(coeffs, RowBound::Upper(model.total_pre(t) as f64 - 1.0))?;
    }

    let mut planes = CuttingPlanes::new(problem, cols, options);
    let outcome = planes.run(|candidate| reached.is_reachable(candidate) && model.is_deadlock(candidate))?;
    done(super::settle(outcome, reached), planes.cuts())
}
