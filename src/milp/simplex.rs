//! Dense two-phase primal simplex over variables in `[0, 1]`.
//!
//! Bland's rule (lowest-index entering column, lowest-index leaving basic variable on ties)
//! rules out cycling on the highly degenerate 0/1 programs produced by the search.

use log::trace;

use crate::error::SolverError;

/// Feasibility and optimality tolerance.
pub(crate) const EPS: f64 = 1e-9;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Cmp {
    Le,
    Ge,
    Eq,
}

impl Cmp {
    fn flip(self) -> Self {
        match self {
            Cmp::Le => Cmp::Ge,
            Cmp::Ge => Cmp::Le,
            Cmp::Eq => Cmp::Eq,
        }
    }
}

/// Sparse constraint `coeffs · x (cmp) rhs`.
#[derive(Debug, Clone)]
pub(crate) struct Constraint {
    pub coeffs: Vec<(usize, f64)>,
    pub cmp: Cmp,
    pub rhs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpOutcome {
    /// Minimum objective value and the optimal point.
    Optimal { objective: f64, values: Vec<f64> },
    Infeasible,
}

struct Tableau {
    rows: Vec<Vec<f64>>,
    /// Reduced costs; the last entry holds `-z`.
    obj: Vec<f64>,
    basis: Vec<usize>,
    width: usize,
    pivots: usize,
    pivot_limit: usize,
}

impl Tableau {
    fn rhs(&self, i: usize) -> f64 {
        self.rows[i][self.width - 1]
    }

    fn pivot(&mut self, r: usize, c: usize) -> Result<(), SolverError> {
        self.pivots += 1;
        if self.pivots > self.pivot_limit {
            return Err(SolverError::PivotLimit {
                limit: self.pivot_limit,
            });
        }

        let p = self.rows[r][c];
        for x in self.rows[r].iter_mut() {
            *x /= p;
        }
        let pivot_row = self.rows[r].clone();

        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let f = row[c];
            if f.abs() > EPS {
                for (x, &y) in row.iter_mut().zip(&pivot_row) {
                    *x -= f * y;
                }
            }
            row[c] = 0.0;
        }
        let f = self.obj[c];
        if f.abs() > EPS {
            for (x, &y) in self.obj.iter_mut().zip(&pivot_row) {
                *x -= f * y;
            }
        }
        self.obj[c] = 0.0;

        self.basis[r] = c;
        Ok(())
    }

    /// Minimize `cost` over the current basis, entering only columns below `allowed`.
    ///
    /// Returns `false` if the objective is unbounded.
    fn optimize(&mut self, cost: &[f64], allowed: usize) -> Result<bool, SolverError> {
        self.obj = cost.to_vec();
        self.obj.resize(self.width, 0.0);
        for (i, &b) in self.basis.iter().enumerate() {
            let cb = self.obj[b];
            if cb != 0.0 {
                for (x, &y) in self.obj.iter_mut().zip(&self.rows[i]) {
                    *x -= cb * y;
                }
            }
        }

        loop {
            let Some(c) = (0..allowed).find(|&j| self.obj[j] < -EPS) else {
                return Ok(true);
            };

            let mut leave: Option<(usize, f64)> = None;
            for i in 0..self.rows.len() {
                let a = self.rows[i][c];
                if a > EPS {
                    let ratio = self.rhs(i) / a;
                    leave = match leave {
                        None => Some((i, ratio)),
                        Some((r, best)) => {
                            if ratio < best - EPS || (ratio <= best + EPS && self.basis[i] < self.basis[r]) {
                                Some((i, ratio))
                            } else {
                                Some((r, best))
                            }
                        }
                    };
                }
            }

            match leave {
                Some((r, _)) => self.pivot(r, c)?,
                None => return Ok(false),
            }
        }
    }

    fn objective(&self) -> f64 {
        -self.obj[self.width - 1]
    }
}

/// Minimize `cost · x` subject to `constraints` and `0 <= x <= 1`.
pub(crate) fn solve_lp(cost: &[f64], constraints: &[Constraint], pivot_limit: usize) -> Result<LpOutcome, SolverError> {
    let n = cost.len();

    // Upper bounds become explicit rows; every rhs is made nonnegative.
    let mut all: Vec<Constraint> = constraints.to_vec();
    all.extend((0..n).map(|j| Constraint {
        coeffs: vec![(j, 1.0)],
        cmp: Cmp::Le,
        rhs: 1.0,
    }));
    for c in all.iter_mut() {
        if c.rhs < 0.0 {
            c.rhs = -c.rhs;
            c.cmp = c.cmp.flip();
            for (_, a) in c.coeffs.iter_mut() {
                *a = -*a;
            }
        }
    }

    let num_slack = all.iter().filter(|c| c.cmp != Cmp::Eq).count();
    let num_art = all.iter().filter(|c| c.cmp != Cmp::Le).count();
    let art_start = n + num_slack;
    let width = art_start + num_art + 1;

    let mut rows = Vec::with_capacity(all.len());
    let mut basis = Vec::with_capacity(all.len());
    let (mut slack, mut art) = (n, art_start);
    for c in &all {
        let mut row = vec![0.0; width];
        for &(j, a) in &c.coeffs {
            row[j] += a;
        }
        row[width - 1] = c.rhs;
        match c.cmp {
            Cmp::Le => {
                row[slack] = 1.0;
                basis.push(slack);
                slack += 1;
            }
            Cmp::Ge => {
                row[slack] = -1.0;
                slack += 1;
                row[art] = 1.0;
                basis.push(art);
                art += 1;
            }
            Cmp::Eq => {
                row[art] = 1.0;
                basis.push(art);
                art += 1;
            }
        }
        rows.push(row);
    }

    let mut tableau = Tableau {
        rows,
        obj: Vec::new(),
        basis,
        width,
        pivots: 0,
        pivot_limit,
    };

    if num_art > 0 {
        let mut phase1 = vec![0.0; width - 1];
        for x in phase1[art_start..].iter_mut() {
            *x = 1.0;
        }
        tableau.optimize(&phase1, width - 1)?;
        if tableau.objective() > 1e-7 {
            trace!("simplex: phase 1 infeasible after {} pivots", tableau.pivots);
            return Ok(LpOutcome::Infeasible);
        }

        // Drive zero-valued artificials out of the basis where possible.
        for r in 0..tableau.rows.len() {
            if tableau.basis[r] >= art_start {
                if let Some(c) = (0..art_start).find(|&j| tableau.rows[r][j].abs() > EPS) {
                    tableau.pivot(r, c)?;
                }
            }
        }
    }

    if !tableau.optimize(cost, art_start)? {
        return Err(SolverError::Unbounded);
    }

    let mut values = vec![0.0; n];
    for (i, &b) in tableau.basis.iter().enumerate() {
        if b < n {
            values[b] = tableau.rhs(i).clamp(0.0, 1.0);
        }
    }
    trace!(
        "simplex: optimum {} after {} pivots",
        tableau.objective(),
        tableau.pivots
    );

    Ok(LpOutcome::Optimal {
        objective: tableau.objective(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn le(coeffs: &[(usize, f64)], rhs: f64) -> Constraint {
        Constraint {
            coeffs: coeffs.to_vec(),
            cmp: Cmp::Le,
            rhs,
        }
    }

    fn ge(coeffs: &[(usize, f64)], rhs: f64) -> Constraint {
        Constraint {
            coeffs: coeffs.to_vec(),
            cmp: Cmp::Ge,
            rhs,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_unconstrained_box() {
        // min -x0 + x1 over the unit box: x0 = 1, x1 = 0
        let out = solve_lp(&[-1.0, 1.0], &[], 100).unwrap();
        match out {
            LpOutcome::Optimal { objective, values } => {
                assert!(approx(objective, -1.0));
                assert!(approx(values[0], 1.0));
                assert!(approx(values[1], 0.0));
            }
            LpOutcome::Infeasible => panic!("box is feasible"),
        }
    }

    #[test]
    fn test_fractional_optimum() {
        // max x0 + x1 s.t. 2x0 + 2x1 <= 3
        let out = solve_lp(&[-1.0, -1.0], &[le(&[(0, 2.0), (1, 2.0)], 3.0)], 100).unwrap();
        let LpOutcome::Optimal { objective, values } = out else {
            panic!("feasible");
        };
        assert!(approx(objective, -1.5));
        assert!(approx(values[0] + values[1], 1.5));
    }

    #[test]
    fn test_phase_one() {
        // min x0 + x1 + x2 s.t. x0 + x1 + x2 >= 2, x0 - x1 = 0
        let eq = Constraint {
            coeffs: vec![(0, 1.0), (1, -1.0)],
            cmp: Cmp::Eq,
            rhs: 0.0,
        };
        let out = solve_lp(&[1.0, 1.0, 1.0], &[ge(&[(0, 1.0), (1, 1.0), (2, 1.0)], 2.0), eq], 100).unwrap();
        let LpOutcome::Optimal { objective, values } = out else {
            panic!("feasible");
        };
        assert!(approx(objective, 2.0));
        assert!(approx(values[0], values[1]));
    }

    #[test]
    fn test_negative_rhs() {
        // -x0 <= -1 means x0 >= 1
        let out = solve_lp(&[1.0], &[le(&[(0, -1.0)], -1.0)], 100).unwrap();
        let LpOutcome::Optimal { values, .. } = out else {
            panic!("feasible");
        };
        assert!(approx(values[0], 1.0));
    }

    #[test]
    fn test_infeasible() {
        let out = solve_lp(&[1.0, 1.0], &[ge(&[(0, 1.0), (1, 1.0)], 3.0)], 100).unwrap();
        assert_eq!(out, LpOutcome::Infeasible);

        // Constant row with no columns: 0 >= 1
        let out = solve_lp(&[], &[ge(&[], 1.0)], 100).unwrap();
        assert_eq!(out, LpOutcome::Infeasible);
    }

    #[test]
    fn test_pivot_limit() {
        let err = solve_lp(&[1.0, 1.0], &[ge(&[(0, 1.0), (1, 1.0)], 1.0)], 0).unwrap_err();
        assert_eq!(err, SolverError::PivotLimit { limit: 0 });
    }
}
