//! End-to-end analysis of a net: reachability, then the searches that depend on it.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use log::{info, warn};
use num_bigint::BigUint;

use crate::bdd::BddConfig;
use crate::encoder::SymbolicContext;
use crate::error::{AnalysisError, SearchError};
use crate::explicit::{self, Order};
use crate::model::Model;
use crate::reach::{self, ReachOptions, ReachResult, ReachState};
use crate::search::{self, DeadlockResult, OptimizationResult, SearchOptions};

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Node pool sizing; derived from the model when `None`.
    pub bdd: Option<BddConfig>,
    pub reach: ReachOptions,
    pub search: SearchOptions,
    /// Run the deadlock search.
    pub deadlock: bool,
    /// Run the optimization search with these per-place weights.
    pub weights: Option<Vec<i64>>,
    /// Run the searches even if reachability stopped on its budget.
    pub allow_partial: bool,
    /// Cross-check the state count with explicit enumeration.
    pub explicit: Option<Order>,
}

/// Reachability statistics, without the reached set itself.
#[derive(Debug, Clone)]
pub struct ReachSummary {
    pub state: ReachState,
    pub states: BigUint,
    pub reached_nodes: usize,
    pub pool_nodes: usize,
    pub iterations: usize,
    pub elapsed: Duration,
}

impl From<&ReachResult> for ReachSummary {
    fn from(result: &ReachResult) -> Self {
        Self {
            state: result.state,
            states: result.states.clone(),
            reached_nodes: result.reached_nodes,
            pool_nodes: result.pool_nodes,
            iterations: result.iterations,
            elapsed: result.elapsed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExplicitSummary {
    pub order: Order,
    pub states: usize,
    /// Whether the explicit count equals the symbolic one.
    pub agrees: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub reach: ReachSummary,
    pub explicit: Option<ExplicitSummary>,
    pub deadlock: Option<DeadlockResult>,
    pub optimum: Option<OptimizationResult>,
}

impl Display for AnalysisReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let r = &self.reach;
        writeln!(
            f,
            "reachability: {}, {} markings, {} BDD nodes ({} in pool), {} iterations, {:?}",
            r.state, r.states, r.reached_nodes, r.pool_nodes, r.iterations, r.elapsed
        )?;
        if let Some(e) = &self.explicit {
            writeln!(
                f,
                "explicit ({:?}): {} markings, {}, {:?}",
                e.order,
                e.states,
                if e.agrees { "agrees" } else { "DISAGREES" },
                e.elapsed
            )?;
        }
        if let Some(d) = &self.deadlock {
            writeln!(f, "deadlock: {} ({} cuts, {:?})", d.outcome, d.cuts, d.elapsed)?;
        }
        if let Some(o) = &self.optimum {
            match (o.objective, o.witness()) {
                (Some(value), Some(m)) => writeln!(
                    f,
                    "optimum: {}{} at {} ({} cuts, {:?})",
                    if o.proven { "" } else { ">= " },
                    value,
                    m,
                    o.cuts,
                    o.elapsed
                )?,
                _ => writeln!(f, "optimum: {} ({} cuts, {:?})", o.outcome, o.cuts, o.elapsed)?,
            }
        }
        Ok(())
    }
}

pub struct Analyzer<'a> {
    model: &'a Model,
    options: AnalysisOptions,
}

impl<'a> Analyzer<'a> {
    pub fn new(model: &'a Model, options: AnalysisOptions) -> Self {
        Self { model, options }
    }

    pub fn run(&self) -> Result<AnalysisReport, AnalysisError> {
        let model = self.model;
        let options = &self.options;

        model.validate();
        model.check_one_safe_arcs()?;
        if let Some(weights) = &options.weights {
            if weights.len() != model.num_places() {
                return Err(SearchError::WeightMismatch {
                    expected: model.num_places(),
                    actual: weights.len(),
                }
                .into());
            }
        }

        let config = options.bdd.unwrap_or_else(|| BddConfig::for_model(model.num_places()));
        info!(
            "analyzing net with {} places and {} transitions, node pool of 2^{}",
            model.num_places(),
            model.num_transitions(),
            config.storage_bits
        );
        let ctx = SymbolicContext::with_config(model, config);
        let result = reach::run(&ctx, model, options.reach)?;
        let summary = ReachSummary::from(&result);

        let explicit = options.explicit.map(|order| {
            let e = explicit::enumerate(model, order);
            let agrees = BigUint::from(e.states) == summary.states;
            if !agrees {
                warn!(
                    "explicit enumeration found {} markings, symbolic engine {}",
                    e.states, summary.states
                );
            }
            ExplicitSummary {
                order,
                states: e.states,
                agrees,
                elapsed: e.elapsed,
            }
        });

        let searchable = result.is_complete() || options.allow_partial;
        if !searchable && (options.deadlock || options.weights.is_some()) {
            warn!("reachability stopped on its iteration budget, skipping the searches");
        }

        let deadlock = if searchable && options.deadlock {
            Some(search::find_deadlock(model, &result.reached, options.search)?)
        } else {
            None
        };
        let optimum = match &options.weights {
            Some(weights) if searchable => Some(search::optimize(model, &result.reached, weights, options.search)?),
            _ => None,
        };

        Ok(AnalysisReport {
            reach: summary,
            explicit,
            deadlock,
            optimum,
        })
    }
}
