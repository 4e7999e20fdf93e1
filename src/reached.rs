//! Owned, reference-counted handle to a reached-set BDD.

use std::fmt::{Debug, Formatter};

use log::warn;
use num_bigint::BigUint;

use crate::encoder::SymbolicContext;
use crate::model::{Marking, Model};
use crate::reference::Ref;

struct Live {
    ctx: SymbolicContext,
    root: Ref,
}

/// Reached set of a fixpoint run, usable as a membership oracle.
///
/// The handle holds one external reference on its BDD root, so the root survives garbage
/// collection in the shared manager. Cloning acquires another reference, dropping (or
/// [`release`][ReachedSet::release]) gives it back. A released handle stays released: every
/// later query answers "not reachable" and logs a warning.
///
/// A set from a run that stopped on its budget is partial: it under-approximates the
/// reachable markings, so "absent from the set" does not mean "unreachable".
pub struct ReachedSet {
    live: Option<Live>,
    complete: bool,
}

impl ReachedSet {
    pub(crate) fn new(ctx: SymbolicContext, root: Ref, complete: bool) -> Self {
        ctx.bdd().add_ref(root);
        Self {
            live: Some(Live { ctx, root }),
            complete,
        }
    }

    pub fn is_released(&self) -> bool {
        self.live.is_none()
    }

    /// Whether the set holds every reachable marking: the fixpoint converged and the handle
    /// is still live.
    pub fn is_complete(&self) -> bool {
        self.complete && self.live.is_some()
    }

    /// Give the reference back to the manager. Idempotent.
    pub fn release(&mut self) {
        if let Some(live) = self.live.take() {
            live.ctx.bdd().del_ref(live.root);
        }
    }

    /// The BDD root, or `None` once released.
    pub fn root(&self) -> Option<Ref> {
        self.live.as_ref().map(|live| live.root)
    }

    pub fn context(&self) -> Option<&SymbolicContext> {
        self.live.as_ref().map(|live| &live.ctx)
    }

    /// Membership oracle: whether `m` is in the reached set.
    ///
    /// Allocates no BDD nodes, so it can be called any number of times.
    pub fn is_reachable(&self, m: &Marking) -> bool {
        let Some(live) = &self.live else {
            warn!("reachability query on a released reached set, answering 'not reachable'");
            return false;
        };
        let num_places = live.ctx.vars().num_places();
        if m.len() != num_places {
            warn!(
                "marking {} has {} places, reached set has {}, answering 'not reachable'",
                m,
                m.len(),
                num_places
            );
            return false;
        }
        live.ctx.contains(live.root, m)
    }

    /// Number of markings in the set, zero once released.
    pub fn count(&self) -> BigUint {
        match &self.live {
            Some(live) => live.ctx.count_states(live.root),
            None => BigUint::ZERO,
        }
    }

    /// All markings in the set. Exponential in the worst case.
    pub fn markings(&self) -> Vec<Marking> {
        match &self.live {
            Some(live) => live.ctx.markings(live.root),
            None => Vec::new(),
        }
    }

    /// Graphviz rendering of the BDD, labeling levels with place names.
    pub fn to_dot(&self, model: &Model) -> Option<Result<String, std::fmt::Error>> {
        let live = self.live.as_ref()?;
        let vars = live.ctx.vars();
        Some(live.ctx.bdd().to_dot(&[live.root], |v| match vars.place_of_current(v) {
            Some(p) => model.place_name(p).to_string(),
            None => format!("x{}", v),
        }))
    }
}

impl Clone for ReachedSet {
    fn clone(&self) -> Self {
        match &self.live {
            Some(live) => ReachedSet::new(live.ctx.clone(), live.root, self.complete),
            None => ReachedSet {
                live: None,
                complete: self.complete,
            },
        }
    }
}

impl Drop for ReachedSet {
    fn drop(&mut self) {
        self.release();
    }
}

impl Debug for ReachedSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.live {
            Some(live) if self.complete => write!(f, "ReachedSet({})", live.root),
            Some(live) => write!(f, "ReachedSet({}, partial)", live.root),
            None => write!(f, "ReachedSet(released)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::ModelBuilder;

    fn two_places() -> Model {
        let mut builder = ModelBuilder::new();
        builder.place("a", 1).place("b", 0);
        builder.transition("t").input("a").output("b");
        builder.build().unwrap()
    }

    #[test]
    fn test_reference_pairing() {
        let model = two_places();
        let ctx = SymbolicContext::new(&model);
        let root = ctx.bdd().mk_cube([1, -3]).unwrap();

        let mut set = ReachedSet::new(ctx.clone(), root, true);
        assert_eq!(ctx.bdd().ref_count(root), 1);

        let copy = set.clone();
        assert_eq!(ctx.bdd().ref_count(root), 2);
        drop(copy);
        assert_eq!(ctx.bdd().ref_count(root), 1);

        set.release();
        set.release();
        assert_eq!(ctx.bdd().ref_count(root), 0);
        drop(set);
        assert_eq!(ctx.bdd().ref_count(root), 0);
    }

    #[test]
    fn test_released_fails_safe() {
        let model = two_places();
        let ctx = SymbolicContext::new(&model);
        let root = ctx.bdd().mk_cube([1, -3]).unwrap();
        let m = Marking::from([1, 0]);

        let mut set = ReachedSet::new(ctx, root, true);
        assert!(set.is_reachable(&m));
        assert_eq!(set.count(), BigUint::from(1u32));

        assert!(set.is_complete());
        set.release();
        assert!(set.is_released());
        assert!(!set.is_complete());
        assert!(!set.is_reachable(&m));
        assert_eq!(set.count(), BigUint::ZERO);
        assert!(set.markings().is_empty());
        assert!(set.to_dot(&model).is_none());
        assert!(set.clone().is_released());
    }

    #[test]
    fn test_survives_garbage_collection() {
        let model = two_places();
        let ctx = SymbolicContext::new(&model);
        let root = ctx.bdd().mk_cube([1, -3]).unwrap();
        let set = ReachedSet::new(ctx.clone(), root, true);

        let _garbage = ctx.bdd().mk_cube([2, 4]).unwrap();
        ctx.bdd().collect_garbage(&[]);
        assert!(set.is_reachable(&Marking::from([1, 0])));
        assert!(!set.is_reachable(&Marking::from([0, 1])));
        assert!(!set.is_reachable(&Marking::from([1, 0, 0])));

        let dot = set.to_dot(&model).unwrap().unwrap();
        assert!(dot.contains("label=\"a\""));
    }

    #[test]
    fn test_partial_flag_survives_clone() {
        let model = two_places();
        let ctx = SymbolicContext::new(&model);
        let root = ctx.bdd().mk_cube([1, -3]).unwrap();

        let set = ReachedSet::new(ctx, root, false);
        assert!(!set.is_complete());
        assert!(set.is_reachable(&Marking::from([1, 0])));
        assert!(!set.clone().is_complete());
        assert_eq!(format!("{:?}", set), format!("ReachedSet({}, partial)", root));
    }
}
