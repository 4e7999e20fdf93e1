//! # petri-rs: symbolic analysis of 1-safe Petri nets
//!
//! **`petri-rs`** computes the reachable markings of a 1-safe Petri net symbolically, as a
//! Binary Decision Diagram, and uses that set as an oracle for two searches posed as 0/1
//! integer programs: finding a reachable deadlock, and finding the reachable marking that
//! maximizes a weighted token sum.
//!
//! ## Pipeline
//!
//! 1. A [`Model`][crate::model::Model] describes places, transitions, the `Pre`/`Post` incidence
//!    matrices and the initial marking.
//! 2. A [`SymbolicContext`][crate::encoder::SymbolicContext] owns a BDD manager and the fixed
//!    current/next variable pairing, and encodes markings and transitions.
//! 3. [`reach::run`] iterates the image operator to a fixpoint and returns a
//!    [`ReachedSet`][crate::reached::ReachedSet] handle: a reference-counted membership oracle.
//! 4. [`search::find_deadlock`] and [`search::optimize`] run a cutting-plane loop over
//!    [`milp::Problem`]s, querying the oracle for every candidate.
//!
//! [`analysis::Analyzer`] chains all of it and produces a printable report.
//!
//! ## Basic Usage
//!
//! ```rust
//! use num_bigint::BigUint;
//! use petri_rs::encoder::SymbolicContext;
//! use petri_rs::model::{Marking, ModelBuilder};
//! use petri_rs::reach::{self, ReachOptions};
//! use petri_rs::search::{self, SearchOptions};
//!
//! let mut builder = ModelBuilder::new();
//! builder.place("p0", 1).place("p1", 0).place("p2", 0).place("p3", 0);
//! builder.transition("t0").input("p0").output("p1").output("p2");
//! builder.transition("t1").input("p1").input("p2").output("p3");
//! let model = builder.build().unwrap();
//!
//! let ctx = SymbolicContext::new(&model);
//! let result = reach::run(&ctx, &model, ReachOptions::default()).unwrap();
//! assert_eq!(result.states, BigUint::from(3u32));
//!
//! let deadlock = search::find_deadlock(&model, &result.reached, SearchOptions::default()).unwrap();
//! assert_eq!(deadlock.witness(), Some(&Marking::from([0, 0, 0, 1])));
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the BDD manager (complement edges, bounded node pool, garbage collection).
//! - **[`encoder`]**, **[`reach`]**, **[`reached`]**: symbolic reachability.
//! - **[`milp`]**, **[`search`]**: reachability-guided search.
//! - **[`explicit`]**: explicit enumeration, for cross-checking.
//! - **[`dot`]**: Graphviz output for nets and BDDs.

pub mod analysis;
pub mod bdd;
pub mod cache;
pub mod dot;
pub mod encoder;
pub mod error;
pub mod explicit;
pub mod milp;
pub mod model;
pub mod reach;
pub mod reached;
pub mod reference;
pub mod sat;
pub mod search;
pub mod table;
pub mod types;
pub mod utils;
