use std::time::{Duration, Instant};

use log::{info, warn};

use super::{CuttingPlanes, SearchOptions, SearchOutcome};
use crate::error::{ModelError, SearchError};
use crate::milp::{Col, Problem, Sense};
use crate::model::{Marking, Model};
use crate::reached::ReachedSet;

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub outcome: SearchOutcome,
    /// `Σ w_p M_p` of the witness, if one was found.
    pub objective: Option<i64>,
    /// Whether the witness is optimal over all reachable markings. Over a partial reached set
    /// the objective is only a lower bound.
    pub proven: bool,
    pub cuts: usize,
    pub elapsed: Duration,
}

impl OptimizationResult {
    pub fn reachable(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found(_))
    }

    pub fn witness(&self) -> Option<&Marking> {
        self.outcome.witness()
    }

    pub fn is_unknown(&self) -> bool {
        self.outcome == SearchOutcome::BudgetExceeded
    }
}

/// Find a reachable marking maximizing `Σ weights[p] * M_p`.
///
/// Candidates come out of the solver in nonincreasing objective order over the whole 0/1
/// hypercube, so the first reachable one is optimal over the reachable set. If the reached set
/// is partial, the first one it contains is only a lower bound, and an empty search is unknown.
pub fn optimize(
    model: &Model,
    reached: &ReachedSet,
    weights: &[i64],
    options: SearchOptions,
) -> Result<OptimizationResult, SearchError> {
    let start = Instant::now();
    if model.num_places() == 0 {
        return Err(ModelError::Empty.into());
    }
    if weights.len() != model.num_places() {
        return Err(SearchError::WeightMismatch {
            expected: model.num_places(),
            actual: weights.len(),
        });
    }

    let mut problem = Problem::new("optimize", Sense::Maximize);
    let cols: Vec<Col> = model
        .place_ids()
        .map(|p| problem.add_binary(&format!("M_{}", model.place_name(p)), weights[p.index()] as f64))
        .collect();

    let mut planes = CuttingPlanes::new(problem, cols, options);
    let outcome = super::settle(planes.run(|candidate| reached.is_reachable(candidate))?, reached);

    let objective = outcome
        .witness()
        .map(|m| m.iter().zip(weights).map(|(x, &w)| x as i64 * w).sum());
    let proven = objective.is_some() && reached.is_complete();
    if objective.is_some() && !proven {
        warn!("reached set is partial, the optimum is only a lower bound");
    }
    let result = OptimizationResult {
        outcome,
        objective,
        proven,
        cuts: planes.cuts(),
        elapsed: start.elapsed(),
    };
    info!(
        "optimization: {} with objective {:?} ({} cuts, {:?})",
        result.outcome, result.objective, result.cuts, result.elapsed
    );
    Ok(result)
}
