//! 0/1 integer linear programming.
//!
//! A [`Problem`] has binary columns, a linear objective and linear rows with bounds. It is
//! solved by depth-first branch-and-bound on top of a dense simplex for the LP relaxation.
//! This is adequate for the problem sizes of the reachability-guided search (one column per
//! place), not a general-purpose MILP engine.
//!
//! ```
//! use petri_rs::milp::{Problem, RowBound, Sense, Status};
//!
//! let mut lp = Problem::new("knapsack", Sense::Maximize);
//! let a = lp.add_binary("a", 3.0);
//! let b = lp.add_binary("b", 2.0);
//! let c = lp.add_binary("c", 2.0);
//! lp.add_row([(a, 2.0), (b, 1.0), (c, 1.0)], RowBound::Upper(2.0)).unwrap();
//!
//! let solution = lp.solve().unwrap();
//! assert_eq!(solution.status, Status::Optimal);
//! assert_eq!(solution.objective, 4.0);
//! ```

mod branch;
mod simplex;

use std::fmt::{Display, Formatter};

use crate::error::SolverError;

const ROW_EPS: f64 = 1e-6;

/// Objective direction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// Handle to a column of a [`Problem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Col(usize);

impl Col {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a row of a [`Problem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RowId(usize);

impl RowId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Bounds on the activity `Σ a_j x_j` of a row.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RowBound {
    /// `activity <= ub`
    Upper(f64),
    /// `activity >= lb`
    Lower(f64),
    /// `lb <= activity <= ub`
    Range(f64, f64),
    /// `activity == v`
    Fixed(f64),
}

impl RowBound {
    fn admits(&self, activity: f64) -> bool {
        match *self {
            RowBound::Upper(ub) => activity <= ub + ROW_EPS,
            RowBound::Lower(lb) => activity >= lb - ROW_EPS,
            RowBound::Range(lb, ub) => activity >= lb - ROW_EPS && activity <= ub + ROW_EPS,
            RowBound::Fixed(v) => (activity - v).abs() <= ROW_EPS,
        }
    }
}

impl Display for RowBound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RowBound::Upper(ub) => write!(f, "<= {}", ub),
            RowBound::Lower(lb) => write!(f, ">= {}", lb),
            RowBound::Range(lb, ub) => write!(f, "in [{}, {}]", lb, ub),
            RowBound::Fixed(v) => write!(f, "== {}", v),
        }
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    objective: f64,
}

#[derive(Debug, Clone)]
struct Row {
    coeffs: Vec<(usize, f64)>,
    bound: RowBound,
}

#[derive(Debug, Copy, Clone)]
pub struct SolverConfig {
    /// Maximum number of branch-and-bound nodes per solve.
    pub node_limit: usize,
    /// Maximum number of simplex pivots per LP relaxation.
    pub pivot_limit: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_limit: 100_000,
            pivot_limit: 100_000,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    Optimal,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: Status,
    /// Objective value; meaningless unless optimal.
    pub objective: f64,
    /// Column values (0 or 1); empty unless optimal.
    pub values: Vec<f64>,
}

impl Solution {
    pub fn value(&self, col: Col) -> f64 {
        self.values.get(col.0).copied().unwrap_or(0.0)
    }
}

/// A 0/1 integer program.
#[derive(Debug, Clone)]
pub struct Problem {
    name: String,
    sense: Sense,
    cols: Vec<Column>,
    rows: Vec<Row>,
    verbose: bool,
    config: SolverConfig,
}

impl Problem {
    pub fn new(name: &str, sense: Sense) -> Self {
        Self {
            name: name.to_string(),
            sense,
            cols: Vec::new(),
            rows: Vec::new(),
            verbose: false,
            config: SolverConfig::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_sense(&mut self, sense: Sense) {
        self.sense = sense;
    }

    /// Report each solve through `log::info!`.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn col_name(&self, col: Col) -> &str {
        &self.cols[col.0].name
    }

    pub fn add_binary(&mut self, name: &str, objective: f64) -> Col {
        self.cols.push(Column {
            name: name.to_string(),
            objective,
        });
        Col(self.cols.len() - 1)
    }

    /// Add a row over existing columns. Repeated columns are summed.
    pub fn add_row(&mut self, coeffs: impl IntoIterator<Item = (Col, f64)>, bound: RowBound) -> Result<RowId, SolverError> {
        let row = self.rows.len();
        let mut dense: Vec<(usize, f64)> = Vec::new();
        for (col, a) in coeffs {
            if col.0 >= self.cols.len() {
                return Err(SolverError::BadColumn {
                    row,
                    col: col.0,
                    num_cols: self.cols.len(),
                });
            }
            match dense.iter_mut().find(|(j, _)| *j == col.0) {
                Some((_, b)) => *b += a,
                None => dense.push((col.0, a)),
            }
        }
        self.rows.push(Row { coeffs: dense, bound });
        Ok(RowId(row))
    }

    /// Objective value of a full column assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.cols.iter().zip(values).map(|(c, v)| c.objective * v).sum()
    }

    /// Whether a full column assignment satisfies every row.
    pub fn is_feasible(&self, values: &[f64]) -> bool {
        self.rows.iter().all(|row| {
            let activity: f64 = row.coeffs.iter().map(|&(j, a)| a * values[j]).sum();
            row.bound.admits(activity)
        })
    }

    /// Solve to optimality.
    ///
    /// Hitting a node or pivot limit is an error: the status would be neither optimal nor
    /// infeasible.
    pub fn solve(&self) -> Result<Solution, SolverError> {
        branch::branch_and_bound(self, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_knapsack() {
        let mut lp = Problem::new("knapsack", Sense::Maximize);
        let weights = [5.0, 4.0, 3.0, 2.0];
        let values = [10.0, 40.0, 30.0, 50.0];
        let cols: Vec<Col> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| lp.add_binary(&format!("x{}", i), v))
            .collect();
        lp.add_row(cols.iter().zip(weights).map(|(&c, w)| (c, w)), RowBound::Upper(7.0))
            .unwrap();

        let solution = lp.solve().unwrap();
        assert_eq!(solution.status, Status::Optimal);
        assert_eq!(solution.objective, 90.0);
        assert_eq!(solution.values, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(solution.value(cols[3]), 1.0);
    }

    #[test]
    fn test_minimize_with_cover() {
        // Set cover: every pair of consecutive elements must be covered.
        let mut lp = Problem::new("cover", Sense::Minimize);
        let x: Vec<Col> = (0..5).map(|i| lp.add_binary(&format!("x{}", i), 1.0)).collect();
        for i in 0..4 {
            lp.add_row([(x[i], 1.0), (x[i + 1], 1.0)], RowBound::Lower(1.0)).unwrap();
        }

        let solution = lp.solve().unwrap();
        assert_eq!(solution.status, Status::Optimal);
        assert_eq!(solution.objective, 2.0);
        assert!(lp.is_feasible(&solution.values));
    }

    #[test]
    fn test_infeasible() {
        let mut lp = Problem::new("odd", Sense::Minimize);
        let a = lp.add_binary("a", 1.0);
        let b = lp.add_binary("b", 1.0);
        // a + b == 1 and a - b == 0 has a fractional solution only
        lp.add_row([(a, 1.0), (b, 1.0)], RowBound::Fixed(1.0)).unwrap();
        lp.add_row([(a, 1.0), (b, -1.0)], RowBound::Fixed(0.0)).unwrap();

        let solution = lp.solve().unwrap();
        assert_eq!(solution.status, Status::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_range_row() {
        let mut lp = Problem::new("range", Sense::Maximize);
        let x: Vec<Col> = (0..4).map(|i| lp.add_binary(&format!("x{}", i), 1.0)).collect();
        lp.add_row(x.iter().map(|&c| (c, 1.0)), RowBound::Range(1.0, 2.0)).unwrap();

        let solution = lp.solve().unwrap();
        assert_eq!(solution.objective, 2.0);

        lp.set_sense(Sense::Minimize);
        let solution = lp.solve().unwrap();
        assert_eq!(solution.objective, 1.0);
    }

    #[test]
    fn test_bad_column() {
        let mut other = Problem::new("other", Sense::Minimize);
        other.add_binary("a", 0.0);
        let foreign = other.add_binary("b", 0.0);

        let mut lp = Problem::new("lp", Sense::Minimize);
        lp.add_binary("a", 0.0);
        assert_eq!(
            lp.add_row([(foreign, 1.0)], RowBound::Upper(1.0)),
            Err(SolverError::BadColumn {
                row: 0,
                col: 1,
                num_cols: 1
            })
        );
        assert_eq!(lp.num_rows(), 0);
    }

    #[test]
    fn test_node_limit() {
        let mut lp = Problem::new("limited", Sense::Maximize);
        let x: Vec<Col> = (0..3).map(|i| lp.add_binary(&format!("x{}", i), 1.0)).collect();
        lp.add_row(x.iter().map(|&c| (c, 2.0)), RowBound::Upper(3.0)).unwrap();
        lp.set_config(SolverConfig {
            node_limit: 1,
            ..SolverConfig::default()
        });
        assert_eq!(lp.solve(), Err(SolverError::NodeLimit { limit: 1 }));
    }

    #[test]
    fn test_duplicate_columns_are_summed() {
        let mut lp = Problem::new("dup", Sense::Maximize);
        let a = lp.add_binary("a", 1.0);
        lp.add_row([(a, 1.0), (a, 1.0)], RowBound::Upper(1.0)).unwrap();
        let solution = lp.solve().unwrap();
        assert_eq!(solution.objective, 0.0);
        assert_eq!(lp.col_name(a), "a");
    }
}
