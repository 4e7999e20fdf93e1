//! Reachability-guided search over 0/1 markings.
//!
//! Both queries share one cutting-plane loop: solve a 0/1 program whose columns are the places,
//! check the optimal candidate against the reached set, and exclude rejected candidates with
//! an exact no-good cut until a candidate is accepted or the program becomes infeasible.
//!
//! - [`find_deadlock`]: minimum-cardinality reachable dead marking.
//! - [`optimize`]: reachable marking maximizing a weighted token sum.

mod deadlock;
mod optimize;

pub use deadlock::{find_deadlock, DeadlockResult};
pub use optimize::{optimize, OptimizationResult};

use std::fmt::{Display, Formatter};

use log::{debug, info, warn};

use crate::error::SearchError;
use crate::milp::{Col, Problem, RowBound, Status};
use crate::model::Marking;
use crate::reached::ReachedSet;

#[derive(Debug, Copy, Clone)]
pub struct SearchOptions {
    /// Maximum number of no-good cuts one search call may add.
    pub max_cuts: usize,
    /// Log every candidate and every solver call at `info` level.
    pub verbose: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_cuts: 10_000,
            verbose: false,
        }
    }
}

/// How a search call ended.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SearchOutcome {
    /// An accepted witness.
    Found(Marking),
    /// No candidate is left: the answer is a proof of absence (relative to the reached set).
    Absent,
    /// A budget ran out before an answer: unknown. Either the cut budget, or the reachability
    /// budget that left the reached set partial.
    BudgetExceeded,
}

impl SearchOutcome {
    pub fn witness(&self) -> Option<&Marking> {
        match self {
            SearchOutcome::Found(m) => Some(m),
            _ => None,
        }
    }
}

impl Display for SearchOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchOutcome::Found(m) => write!(f, "found {}", m),
            SearchOutcome::Absent => write!(f, "none"),
            SearchOutcome::BudgetExceeded => write!(f, "unknown (budget exceeded)"),
        }
    }
}

/// Absence is only proven over a complete reached set; over a partial or released one it
/// stays unknown.
fn settle(outcome: SearchOutcome, reached: &ReachedSet) -> SearchOutcome {
    if outcome == SearchOutcome::Absent && !reached.is_complete() {
        warn!("no candidate left, but the reached set is partial or released: result unknown");
        return SearchOutcome::BudgetExceeded;
    }
    outcome
}

/// The exclusion row for `candidate`: coefficients and bound.
///
/// For `k` ones: `Σ_{c_p=1} M_p - Σ_{c_p=0} M_p <= k - 1`, which only `candidate` violates.
/// The empty vector cannot be cut that way, so it gets `Σ M_p >= 1` instead.
pub fn no_good_cut(candidate: &Marking) -> (Vec<(usize, f64)>, RowBound) {
    let k = candidate.ones();
    if k == 0 {
        let coeffs = (0..candidate.len()).map(|p| (p, 1.0)).collect();
        return (coeffs, RowBound::Lower(1.0));
    }
    let coeffs = candidate
        .iter()
        .enumerate()
        .map(|(p, x)| (p, if x > 0 { 1.0 } else { -1.0 }))
        .collect();
    (coeffs, RowBound::Upper(k as f64 - 1.0))
}

/// The shared cutting-plane loop over a program with one binary column per place.
pub(crate) struct CuttingPlanes {
    problem: Problem,
    cols: Vec<Col>,
    cuts: usize,
    options: SearchOptions,
}

impl CuttingPlanes {
    pub(crate) fn new(mut problem: Problem, cols: Vec<Col>, options: SearchOptions) -> Self {
        problem.set_verbose(options.verbose);
        Self {
            problem,
            cols,
            cuts: 0,
            options,
        }
    }

    pub(crate) fn cuts(&self) -> usize {
        self.cuts
    }

    fn candidate(&self, values: &[f64]) -> Marking {
        Marking::new(self.cols.iter().map(|c| (values[c.index()] > 0.5) as u8).collect())
    }

    fn add_cut(&mut self, candidate: &Marking) -> Result<(), SearchError> {
        let (coeffs, bound) = no_good_cut(candidate);
        let coeffs = coeffs.into_iter().map(|(p, a)| (self.cols[p], a));
        self.problem.add_row(coeffs, bound)?;
        self.cuts += 1;
        Ok(())
    }

    /// Run the loop until `accept` takes a candidate, the program is infeasible, or the cut
    /// budget is spent.
    pub(crate) fn run(&mut self, mut accept: impl FnMut(&Marking) -> bool) -> Result<SearchOutcome, SearchError> {
        loop {
            let solution = self.problem.solve()?;
            if solution.status == Status::Infeasible {
                if self.options.verbose {
                    info!("{}: program infeasible after {} cuts", self.problem.name(), self.cuts);
                }
                return Ok(SearchOutcome::Absent);
            }

            let candidate = self.candidate(&solution.values);
            if accept(&candidate) {
                if self.options.verbose {
                    info!("{}: accepted {} after {} cuts", self.problem.name(), candidate, self.cuts);
                }
                return Ok(SearchOutcome::Found(candidate));
            }

            if self.cuts >= self.options.max_cuts {
                info!(
                    "{}: cut budget of {} exhausted, result unknown",
                    self.problem.name(),
                    self.options.max_cuts
                );
                return Ok(SearchOutcome::BudgetExceeded);
            }

            if self.options.verbose {
                info!("{}: rejected {}, adding cut #{}", self.problem.name(), candidate, self.cuts + 1);
            } else {
                debug!("{}: rejected {}, adding cut #{}", self.problem.name(), candidate, self.cuts + 1);
            }
            self.add_cut(&candidate)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::milp::Sense;

    #[test]
    fn test_no_good_cut_excludes_only_candidate() {
        let candidate = Marking::from([1, 0, 1]);
        let (coeffs, bound) = no_good_cut(&candidate);
        assert_eq!(bound, RowBound::Upper(1.0));

        let activity = |m: &Marking| -> f64 { coeffs.iter().map(|&(p, a)| a * m[p] as f64).sum() };
        for bits in 0..8u8 {
            let m = Marking::from([bits & 1, (bits >> 1) & 1, (bits >> 2) & 1]);
            let excluded = activity(&m) > 1.0;
            assert_eq!(excluded, m == candidate, "{}", m);
        }
    }

    #[test]
    fn test_no_good_cut_empty_candidate() {
        let (coeffs, bound) = no_good_cut(&Marking::zeros(3));
        assert_eq!(bound, RowBound::Lower(1.0));
        assert_eq!(coeffs, vec![(0, 1.0), (1, 1.0), (2, 1.0)]);
    }

    fn hypercube(n: usize, sense: Sense) -> (Problem, Vec<Col>) {
        let mut problem = Problem::new("cube", sense);
        let cols = (0..n).map(|p| problem.add_binary(&format!("M_{}", p), 1.0)).collect();
        (problem, cols)
    }

    #[test]
    fn test_rejected_candidates_never_return() {
        let (problem, cols) = hypercube(3, Sense::Minimize);
        let mut planes = CuttingPlanes::new(problem, cols, SearchOptions::default());
        let mut seen = Vec::new();
        let outcome = planes
            .run(|m| {
                assert!(!seen.contains(m), "candidate {} returned twice", m);
                seen.push(m.clone());
                false
            })
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Absent);
        assert_eq!(seen.len(), 8);
        assert_eq!(planes.cuts(), 8);
        // Minimization visits candidates by nondecreasing cardinality.
        assert!(seen.windows(2).all(|w| w[0].ones() <= w[1].ones()));
    }

    #[test]
    fn test_cut_budget() {
        let (problem, cols) = hypercube(3, Sense::Maximize);
        let options = SearchOptions {
            max_cuts: 2,
            ..SearchOptions::default()
        };
        let mut planes = CuttingPlanes::new(problem, cols, options);
        let outcome = planes.run(|_| false).unwrap();
        assert_eq!(outcome, SearchOutcome::BudgetExceeded);
        assert_eq!(planes.cuts(), 2);
    }

    #[test]
    fn test_accept_first() {
        let (problem, cols) = hypercube(2, Sense::Maximize);
        let mut planes = CuttingPlanes::new(problem, cols, SearchOptions::default());
        let outcome = planes.run(|_| true).unwrap();
        assert_eq!(outcome, SearchOutcome::Found(Marking::from([1, 1])));
        assert_eq!(outcome.witness(), Some(&Marking::from([1, 1])));
        assert_eq!(planes.cuts(), 0);
    }
}
