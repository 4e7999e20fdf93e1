//! Depth-first branch-and-bound over binary columns.

use log::{debug, info};

use super::simplex::{solve_lp, Cmp, Constraint, LpOutcome, EPS};
use super::{Problem, RowBound, Sense, Solution, SolverConfig, Status};
use crate::error::SolverError;

/// Integrality tolerance.
const INT_EPS: f64 = 1e-6;

struct Incumbent {
    objective: f64,
    values: Vec<f64>,
}

/// The LP relaxation of `problem` with some columns fixed.
///
/// Returns the objective in the problem's own sense and the full column vector.
fn relax(problem: &Problem, fixed: &[Option<bool>], config: &SolverConfig) -> Result<Option<(f64, Vec<f64>)>, SolverError> {
    let free: Vec<usize> = (0..problem.num_cols()).filter(|&j| fixed[j].is_none()).collect();
    let mut position = vec![usize::MAX; problem.num_cols()];
    for (k, &j) in free.iter().enumerate() {
        position[j] = k;
    }

    let fixed_value = |j: usize| match fixed[j] {
        Some(true) => 1.0,
        _ => 0.0,
    };

    let sign = match problem.sense {
        Sense::Minimize => 1.0,
        Sense::Maximize => -1.0,
    };
    let cost: Vec<f64> = free.iter().map(|&j| sign * problem.cols[j].objective).collect();
    let constant: f64 = (0..problem.num_cols())
        .filter(|&j| fixed[j].is_some())
        .map(|j| problem.cols[j].objective * fixed_value(j))
        .sum();

    let mut constraints = Vec::with_capacity(problem.rows.len());
    for row in &problem.rows {
        let mut shift = 0.0;
        let mut coeffs = Vec::with_capacity(row.coeffs.len());
        for &(j, a) in &row.coeffs {
            if fixed[j].is_some() {
                shift += a * fixed_value(j);
            } else {
                coeffs.push((position[j], a));
            }
        }
        let mut push = |cmp: Cmp, rhs: f64| {
            constraints.push(Constraint {
                coeffs: coeffs.clone(),
                cmp,
                rhs: rhs - shift,
            })
        };
        match row.bound {
            RowBound::Upper(ub) => push(Cmp::Le, ub),
            RowBound::Lower(lb) => push(Cmp::Ge, lb),
            RowBound::Range(lb, ub) => {
                push(Cmp::Ge, lb);
                push(Cmp::Le, ub);
            }
            RowBound::Fixed(v) => push(Cmp::Eq, v),
        }
    }

    match solve_lp(&cost, &constraints, config.pivot_limit)? {
        LpOutcome::Infeasible => Ok(None),
        LpOutcome::Optimal { objective, values } => {
            let mut full: Vec<f64> = (0..problem.num_cols()).map(fixed_value).collect();
            for (k, &j) in free.iter().enumerate() {
                full[j] = values[k];
            }
            Ok(Some((constant + sign * objective, full)))
        }
    }
}

/// Whether `a` is strictly better than `b` in the given sense.
fn better(sense: Sense, a: f64, b: f64) -> bool {
    match sense {
        Sense::Minimize => a < b - EPS,
        Sense::Maximize => a > b + EPS,
    }
}

/// The unfixed column whose value is closest to 1/2, lowest index on ties.
fn nearest_to_half(values: &[f64], fixed: &[Option<bool>]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (j, &v) in values.iter().enumerate() {
        if fixed[j].is_some() {
            continue;
        }
        let frac = v.min(1.0 - v);
        if best.map_or(true, |(_, f)| frac > f + EPS) {
            best = Some((j, frac));
        }
    }
    best
}

pub(crate) fn branch_and_bound(problem: &Problem, config: &SolverConfig) -> Result<Solution, SolverError> {
    let mut stack: Vec<Vec<Option<bool>>> = vec![vec![None; problem.num_cols()]];
    let mut incumbent: Option<Incumbent> = None;
    let mut nodes = 0;

    while let Some(fixed) = stack.pop() {
        nodes += 1;
        if nodes > config.node_limit {
            return Err(SolverError::NodeLimit {
                limit: config.node_limit,
            });
        }

        let Some((bound, values)) = relax(problem, &fixed, config)? else {
            continue;
        };
        if let Some(best) = &incumbent {
            if !better(problem.sense, bound, best.objective) {
                continue;
            }
        }

        // Most fractional column, lowest index on ties.
        let mut branch: Option<(usize, f64)> = None;
        for (j, &v) in values.iter().enumerate() {
            let frac = v.min(1.0 - v);
            if frac > INT_EPS && branch.map_or(true, |(_, f)| frac > f + EPS) {
                branch = Some((j, frac));
            }
        }

        if branch.is_none() {
            let rounded: Vec<f64> = values.iter().map(|v| v.round()).collect();
            if problem.is_feasible(&rounded) {
                let objective = problem.evaluate(&rounded);
                if incumbent
                    .as_ref()
                    .map_or(true, |best| better(problem.sense, objective, best.objective))
                {
                    incumbent = Some(Incumbent {
                        objective,
                        values: rounded,
                    });
                }
                continue;
            }
            // Rounding drifted past a row; the subtree may still hold feasible points.
            branch = nearest_to_half(&values, &fixed);
            if branch.is_none() {
                debug!("fully fixed node violates a row, dropping it");
                continue;
            }
            debug!("integral relaxation violates a row after rounding, branching on it");
        }

        if let Some((j, _)) = branch {
            // Explore the rounding direction first.
            let first = values[j] >= 0.5;
            for value in [!first, first] {
                let mut child = fixed.clone();
                child[j] = Some(value);
                stack.push(child);
            }
        }
    }

    if problem.verbose {
        info!(
            "{}: {} nodes, {}",
            problem.name,
            nodes,
            match &incumbent {
                Some(best) => format!("optimum {}", best.objective),
                None => "infeasible".to_string(),
            }
        );
    }

    Ok(match incumbent {
        Some(best) => Solution {
            status: Status::Optimal,
            objective: best.objective,
            values: best.values,
        },
        None => Solution {
            status: Status::Infeasible,
            objective: 0.0,
            values: Vec::new(),
        },
    })
}
