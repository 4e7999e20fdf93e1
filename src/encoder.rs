//! Boolean encoding of markings and transitions.
//!
//! Place `p` owns two BDD variables: the *current* variable `2p+1` and the *next* variable `2p+2`.
//! Interleaving the pairs keeps the transition relation small: a frame condition `x ↔ x'` only
//! spans two adjacent levels.

use std::collections::HashMap;
use std::rc::Rc;

use num_bigint::BigUint;

use crate::bdd::{Bdd, BddConfig};
use crate::error::{BddError, ModelError, ReachError};
use crate::model::{Marking, Model};
use crate::reference::Ref;
use crate::types::{PlaceId, TransitionId, Var};

/// The fixed current/next variable pairing of one analysis.
#[derive(Debug, Clone)]
pub struct StateVars {
    num_places: usize,
}

impl StateVars {
    pub fn new(num_places: usize) -> Self {
        Self { num_places }
    }

    pub fn num_places(&self) -> usize {
        self.num_places
    }

    pub fn current(&self, p: PlaceId) -> Var {
        Var::new(2 * p.index() as u32 + 1)
    }

    pub fn next(&self, p: PlaceId) -> Var {
        Var::new(2 * p.index() as u32 + 2)
    }

    /// Place owning a current variable, if `v` is one.
    pub fn place_of_current(&self, v: u32) -> Option<PlaceId> {
        if v % 2 == 1 && ((v - 1) / 2) < self.num_places as u32 {
            Some(PlaceId::new((v as usize - 1) / 2))
        } else {
            None
        }
    }

    fn places(&self) -> impl Iterator<Item = PlaceId> {
        (0..self.num_places).map(PlaceId::new)
    }

    pub fn current_vars(&self) -> Vec<u32> {
        self.places().map(|p| self.current(p).id()).collect()
    }

    pub fn next_vars(&self) -> Vec<u32> {
        self.places().map(|p| self.next(p).id()).collect()
    }

    /// Substitution `x'_p -> x_p` for every place.
    pub fn next_to_current(&self) -> HashMap<u32, u32> {
        self.places().map(|p| (self.next(p).id(), self.current(p).id())).collect()
    }
}

/// A BDD manager together with the variable layout of one net.
///
/// One context is created per analysis and passed explicitly to the encoder, the fixpoint engine
/// and the oracle. Independent contexts share nothing.
#[derive(Debug, Clone)]
pub struct SymbolicContext {
    bdd: Rc<Bdd>,
    vars: StateVars,
    next_to_current: HashMap<u32, u32>,
    current_vars: Vec<u32>,
}

impl SymbolicContext {
    /// Context with a node pool sized from the model.
    pub fn new(model: &Model) -> Self {
        Self::with_config(model, BddConfig::for_model(model.num_places()))
    }

    pub fn with_config(model: &Model, config: BddConfig) -> Self {
        let vars = StateVars::new(model.num_places());
        Self {
            bdd: Rc::new(Bdd::new(config)),
            next_to_current: vars.next_to_current(),
            current_vars: vars.current_vars(),
            vars,
        }
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    pub(crate) fn shared_bdd(&self) -> Rc<Bdd> {
        Rc::clone(&self.bdd)
    }

    pub fn vars(&self) -> &StateVars {
        &self.vars
    }

    fn check_marking(&self, m: &Marking) -> Result<(), ModelError> {
        if m.len() != self.vars.num_places() {
            return Err(ModelError::MarkingLength {
                expected: self.vars.num_places(),
                actual: m.len(),
            });
        }
        if !m.is_binary() {
            return Err(ModelError::NotBinary { marking: m.to_string() });
        }
        Ok(())
    }

    /// The cube over current variables denoting exactly `m`.
    pub fn encode_marking(&self, m: &Marking) -> Result<Ref, ReachError> {
        self.check_marking(m)?;
        let literals = self.vars.places().map(|p| {
            let v = self.vars.current(p).id() as i32;
            if m[p] > 0 {
                v
            } else {
                -v
            }
        });
        Ok(self.bdd.mk_cube(literals)?)
    }

    /// Relation of one transition over (current, next) pairs.
    ///
    /// Arc weights are read as 0/1; callers reject weighted nets beforehand.
    pub fn encode_transition(&self, model: &Model, t: TransitionId) -> Result<Ref, BddError> {
        let bdd = &self.bdd;
        let mut clauses = Vec::with_capacity(2 * model.num_places());

        for p in model.place_ids() {
            let x = bdd.mk_var(self.vars.current(p).id())?;
            let x_next = bdd.mk_var(self.vars.next(p).id())?;
            let pre = model.pre(p, t) > 0;
            let post = model.post(p, t) > 0;

            if pre {
                clauses.push(x);
            }
            let next_state = if post {
                x_next
            } else if pre {
                -x_next
            } else {
                bdd.apply_eq(x, x_next)?
            };
            clauses.push(next_state);
        }

        bdd.apply_and_many(clauses)
    }

    /// Disjunction of all transition relations, in index order.
    pub fn build_transition_relation(&self, model: &Model) -> Result<Ref, ReachError> {
        model.check_one_safe_arcs()?;
        let mut tr = self.bdd.zero();
        for t in model.transition_ids() {
            let rel = self.encode_transition(model, t)?;
            tr = self.bdd.apply_or(tr, rel)?;
        }
        Ok(tr)
    }

    /// One-step successors of `from` under `tr`, over current variables.
    pub fn image(&self, from: Ref, tr: Ref) -> Result<Ref, BddError> {
        let next = self.bdd.rel_product(from, tr, &self.current_vars)?;
        self.bdd.rename_vars(next, &self.next_to_current)
    }

    /// Number of markings in a set over current variables.
    pub fn count_states(&self, states: Ref) -> BigUint {
        self.bdd.sat_count_over(states, &self.current_vars)
    }

    /// Whether `m` belongs to `states`, without allocating nodes.
    ///
    /// Markings that are not 0/1 vectors of the right length are never members.
    pub fn contains(&self, states: Ref, m: &Marking) -> bool {
        if self.check_marking(m).is_err() {
            return false;
        }
        self.bdd.is_sat_under(states, |v| {
            self.vars.place_of_current(v).map(|p| m[p] > 0)
        })
    }

    /// All markings in a set over current variables, in lexicographic order.
    ///
    /// Exponential in the worst case; meant for small nets and diagnostics.
    pub fn markings(&self, states: Ref) -> Vec<Marking> {
        let mut result = Vec::new();
        let mut tokens = vec![0u8; self.vars.num_places()];
        self.collect_markings(states, 0, &mut tokens, &mut result);
        result
    }

    fn collect_markings(&self, f: Ref, place: usize, tokens: &mut Vec<u8>, result: &mut Vec<Marking>) {
        if self.bdd.is_zero(f) {
            return;
        }
        if place == self.vars.num_places() {
            result.push(Marking::new(tokens.clone()));
            return;
        }
        let v = self.vars.current(PlaceId::new(place)).id();
        let (low, high) = if self.bdd.variable(f) == v {
            (self.bdd.low_node(f), self.bdd.high_node(f))
        } else {
            (f, f)
        };
        for (value, branch) in [(0, low), (1, high)] {
            tokens[place] = value;
            self.collect_markings(branch, place + 1, tokens, result);
        }
        tokens[place] = 0;
    }
}
