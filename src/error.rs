//! Error types for every layer of the pipeline.
//!
//! Budget exhaustion (iteration cap, cut cap) is not an error: it is reported as an
//! explicit outcome variant by the reachability engine and the search.

use thiserror::Error;

/// A malformed model or an input that does not fit the model.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ModelError {
    #[error("model has no places")]
    Empty,
    #[error("initial marking has {actual} entries, expected {expected}")]
    MarkingLength { expected: usize, actual: usize },
    #[error("{matrix} matrix is {rows}x{cols}, expected {places}x{transitions}")]
    Dimension {
        matrix: &'static str,
        rows: usize,
        cols: usize,
        places: usize,
        transitions: usize,
    },
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
    #[error("arc between place '{place}' and transition '{transition}' has weight {weight}, only 0/1 weights are supported")]
    WeightedArc {
        place: String,
        transition: String,
        weight: u32,
    },
    #[error("marking {marking} is not a 0/1 vector")]
    NotBinary { marking: String },
}

/// Failure inside the boolean-function package.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BddError {
    #[error("BDD node pool exhausted ({capacity} nodes)")]
    NodePoolExhausted { capacity: usize },
}

/// Failure of the symbolic encoder or the fixpoint engine.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ReachError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Bdd(#[from] BddError),
}

/// The integer solver stopped with a status other than optimal or infeasible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("branch-and-bound node limit reached ({limit} nodes)")]
    NodeLimit { limit: usize },
    #[error("simplex pivot limit reached ({limit} pivots)")]
    PivotLimit { limit: usize },
    #[error("LP relaxation is unbounded")]
    Unbounded,
    #[error("row {row} references column {col}, but the problem has {num_cols} columns")]
    BadColumn { row: usize, col: usize, num_cols: usize },
}

/// Failure of a reachability-guided search call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("weight vector has {actual} entries, expected {expected}")]
    WeightMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Top-level error of an end-to-end analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Reach(#[from] ReachError),
    #[error(transparent)]
    Search(#[from] SearchError),
}
