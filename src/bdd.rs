//! The BDD manager.
//!
//! All functions live in one shared node pool with complement edges: a [`Ref`] is a node index plus a
//! negation bit, and every node is kept with a regular (non-negated) high edge, which makes the
//! representation canonical for the fixed variable ordering `1 < 2 < ... < n`.
//!
//! The pool has a fixed capacity. Running out of nodes is reported as
//! [`BddError::NodePoolExhausted`] rather than a panic, and nodes that are no longer
//! reachable from a referenced root can be reclaimed with [`Bdd::collect_garbage`].

use std::cell::RefCell;
use std::cmp::min;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::error::BddError;
use crate::reference::Ref;
use crate::table::{Table, TableFull};
use crate::utils::{ceil_log2, pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.variable as u64,
            self.low.unsigned() as u64,
            self.high.unsigned() as u64,
        )
    }
}

type IteKey = (Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(
            self.0.unsigned() as u64,
            self.1.unsigned() as u64,
            self.2.unsigned() as u64,
        )
    }
}

impl From<TableFull> for BddError {
    fn from(full: TableFull) -> Self {
        BddError::NodePoolExhausted {
            capacity: full.capacity,
        }
    }
}

/// Sizing of the node pool and the computed table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BddConfig {
    /// The pool holds `2^storage_bits` nodes.
    pub storage_bits: usize,
    /// The computed table holds `2^cache_bits` entries.
    pub cache_bits: usize,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            storage_bits: 20,
            cache_bits: 16,
        }
    }
}

impl BddConfig {
    /// Size the manager for a net with `num_places` places (two variables per place).
    pub fn for_model(num_places: usize) -> Self {
        let num_vars = 2 * num_places.max(1);
        let storage_bits = (14 + ceil_log2(num_vars)).clamp(14, 24);
        Self {
            storage_bits,
            cache_bits: min(storage_bits - 2, 18),
        }
    }
}

/// Set of variables with O(1) membership, used by quantification.
struct VarSet {
    members: Vec<bool>,
    max: u32,
}

impl VarSet {
    fn new(vars: &[u32]) -> Self {
        let max = vars.iter().copied().max().unwrap_or(0);
        let mut members = vec![false; max as usize + 1];
        for &v in vars {
            assert_ne!(v, 0, "Variable index should not be zero");
            members[v as usize] = true;
        }
        Self { members, max }
    }

    fn contains(&self, v: u32) -> bool {
        v <= self.max && self.members[v as usize]
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
    /// External reference counts, keyed by node index.
    refs: RefCell<HashMap<u32, usize>>,
}

impl Bdd {
    pub fn new(config: BddConfig) -> Self {
        assert!(
            (1..=31).contains(&config.storage_bits),
            "Storage bits should be in the range 1..=31"
        );

        let mut storage = Table::new(config.storage_bits);

        // Allocate the terminal node. It is never hashed, so it is never swept.
        let one = storage.add(Node::default()).expect("fresh table has room for the terminal");
        assert_eq!(one, Ref::ONE.index()); // Make sure the terminal node is (1).

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(config.cache_bits)),
            refs: RefCell::new(HashMap::new()),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("capacity", &storage.capacity())
            .field("real_size", &storage.real_size())
            .field("refs", &self.refs.borrow().len())
            .finish()
    }
}

impl Bdd {
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == Ref::ONE.index()
    }

    /// Number of live nodes in the pool, terminal included.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().real_size()
    }

    /// Maximum number of nodes the pool can hold.
    pub fn capacity(&self) -> usize {
        self.storage.borrow().capacity() - 1
    }

    /// Computed-table hits since creation.
    pub fn cache_hits(&self) -> usize {
        self.cache.borrow().hits()
    }

    fn node(&self, index: usize) -> Node {
        *self.storage.borrow().value(index)
    }

    /// Variable at the top of `node`, or `u32::MAX` for terminals (they sit below every variable).
    pub fn variable(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.node(node.index()).variable
        }
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.node(node.index()).low;
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.node(node.index()).high;
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    /// Cofactors of `node` with respect to `v`, which must not be below the top variable of `node`.
    fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        let var = self.variable(node);
        if var > v {
            return (node, node);
        }
        assert_eq!(var, v);
        (self.low_node(node), self.high_node(node))
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Result<Ref, BddError> {
        assert_ne!(v, 0, "Variable index should not be zero");

        if low == high {
            return Ok(low);
        }

        // Canonicity: the high edge is always regular.
        if high.is_negated() {
            return Ok(-self.mk_node(v, -low, -high)?);
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        })?;
        Ok(Ref::positive(i as u32))
    }

    pub fn mk_var(&self, v: u32) -> Result<Ref, BddError> {
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    /// Conjunction of DIMACS-style literals (`v` or `-v`).
    pub fn mk_cube(&self, literals: impl IntoIterator<Item = i32>) -> Result<Ref, BddError> {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| std::cmp::Reverse(v.unsigned_abs()));
        let mut current = Ref::ONE;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(lit.unsigned_abs(), current, Ref::ZERO)?
            } else {
                self.mk_node(lit as u32, Ref::ZERO, current)?
            };
        }
        Ok(current)
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(f, g, h) = (f ∧ g) ∨ (¬f ∧ h)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Result<Ref, BddError> {
        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return Ok(g);
        }
        if self.is_zero(f) {
            return Ok(h);
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            Ref::ONE
        } else if g == -f {
            Ref::ZERO
        } else {
            g
        };
        let h = if h == f {
            Ref::ZERO
        } else if h == -f {
            Ref::ONE
        } else {
            h
        };

        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if g == h {
            return Ok(g);
        }
        if self.is_one(g) && self.is_zero(h) {
            return Ok(f);
        }
        if self.is_zero(g) && self.is_one(h) {
            return Ok(-f);
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, n) = if g.is_negated() {
            (-g, -h, true)
        } else {
            (g, h, false)
        };

        let key = (f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return Ok(if n { -res } else { res });
        }

        let m = self.variable(f).min(self.variable(g)).min(self.variable(h));
        debug_assert_ne!(m, u32::MAX);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0)?;
        let t = self.apply_ite(f1, g1, h1)?;
        let res = self.mk_node(m, e, t)?;
        self.cache.borrow_mut().insert(key, res);

        Ok(if n { -res } else { res })
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, Ref::ONE, v)
    }

    /// Bi-implication `u ↔ v`.
    pub fn apply_eq(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, v, -v)
    }

    /// Set difference `u ∧ ¬v`.
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(v, Ref::ZERO, u)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Result<Ref, BddError> {
        let mut res = Ref::ONE;
        for node in nodes {
            res = self.apply_and(res, node)?;
        }
        Ok(res)
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Result<Ref, BddError> {
        let mut res = Ref::ZERO;
        for node in nodes {
            res = self.apply_or(res, node)?;
        }
        Ok(res)
    }

    /// Existential quantification `∃vars. f`.
    pub fn exists(&self, f: Ref, vars: &[u32]) -> Result<Ref, BddError> {
        let set = VarSet::new(vars);
        let mut cache = HashMap::new();
        self.exists_(f, &set, &mut cache)
    }

    fn exists_(&self, f: Ref, set: &VarSet, cache: &mut HashMap<Ref, Ref>) -> Result<Ref, BddError> {
        if self.is_terminal(f) {
            return Ok(f);
        }
        let v = self.variable(f);
        if v > set.max {
            return Ok(f);
        }
        if let Some(&res) = cache.get(&f) {
            return Ok(res);
        }

        let (f0, f1) = self.top_cofactors(f, v);
        let r0 = self.exists_(f0, set, cache)?;
        let res = if set.contains(v) {
            if self.is_one(r0) {
                Ref::ONE
            } else {
                let r1 = self.exists_(f1, set, cache)?;
                self.apply_or(r0, r1)?
            }
        } else {
            let r1 = self.exists_(f1, set, cache)?;
            self.mk_node(v, r0, r1)?
        };
        cache.insert(f, res);
        Ok(res)
    }

    /// Relational product `∃vars. f ∧ g`, without building `f ∧ g` first.
    pub fn rel_product(&self, f: Ref, g: Ref, vars: &[u32]) -> Result<Ref, BddError> {
        let set = VarSet::new(vars);
        let mut cache = HashMap::new();
        let mut exists_cache = HashMap::new();
        self.rel_product_(f, g, &set, &mut cache, &mut exists_cache)
    }

    fn rel_product_(
        &self,
        f: Ref,
        g: Ref,
        set: &VarSet,
        cache: &mut HashMap<(Ref, Ref), Ref>,
        exists_cache: &mut HashMap<Ref, Ref>,
    ) -> Result<Ref, BddError> {
        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return Ok(Ref::ZERO);
        }
        if self.is_one(f) || f == g {
            return self.exists_(g, set, exists_cache);
        }
        if self.is_one(g) {
            return self.exists_(f, set, exists_cache);
        }

        // Conjunction is commutative: normalize the key.
        let (f, g) = if f.get() <= g.get() { (f, g) } else { (g, f) };
        if let Some(&res) = cache.get(&(f, g)) {
            return Ok(res);
        }

        let m = self.variable(f).min(self.variable(g));
        let res = if m > set.max {
            self.apply_and(f, g)?
        } else {
            let (f0, f1) = self.top_cofactors(f, m);
            let (g0, g1) = self.top_cofactors(g, m);
            let r0 = self.rel_product_(f0, g0, set, cache, exists_cache)?;
            if set.contains(m) {
                if self.is_one(r0) {
                    Ref::ONE
                } else {
                    let r1 = self.rel_product_(f1, g1, set, cache, exists_cache)?;
                    self.apply_or(r0, r1)?
                }
            } else {
                let r1 = self.rel_product_(f1, g1, set, cache, exists_cache)?;
                self.mk_node(m, r0, r1)?
            }
        };
        cache.insert((f, g), res);
        Ok(res)
    }

    /// Simultaneous variable substitution `f[v := map(v)]`.
    ///
    /// Variables absent from `map` are kept as they are.
    pub fn rename_vars(&self, f: Ref, map: &HashMap<u32, u32>) -> Result<Ref, BddError> {
        let mut cache = HashMap::new();
        self.rename_vars_(f, map, &mut cache)
    }

    fn rename_vars_(&self, f: Ref, map: &HashMap<u32, u32>, cache: &mut HashMap<Ref, Ref>) -> Result<Ref, BddError> {
        if self.is_terminal(f) {
            return Ok(f);
        }
        if f.is_negated() {
            return Ok(-self.rename_vars_(-f, map, cache)?);
        }
        if let Some(&res) = cache.get(&f) {
            return Ok(res);
        }

        let v = self.variable(f);
        let low = self.rename_vars_(self.low_node(f), map, cache)?;
        let high = self.rename_vars_(self.high_node(f), map, cache)?;
        let target = map.get(&v).copied().unwrap_or(v);
        let x = self.mk_var(target)?;
        let res = self.apply_ite(x, high, low)?;
        cache.insert(f, res);
        Ok(res)
    }

    /// Check whether `f` has a satisfying assignment agreeing with `value`.
    ///
    /// `value(v)` returns the fixed value of `v`, or `None` for a free variable.
    /// No nodes are allocated, so repeated queries never grow the pool.
    pub fn is_sat_under(&self, f: Ref, value: impl Fn(u32) -> Option<bool>) -> bool {
        let mut memo = HashMap::new();
        self.is_sat_under_(f, &value, &mut memo)
    }

    fn is_sat_under_(&self, f: Ref, value: &impl Fn(u32) -> Option<bool>, memo: &mut HashMap<Ref, bool>) -> bool {
        if self.is_one(f) {
            return true;
        }
        if self.is_zero(f) {
            return false;
        }
        if let Some(&res) = memo.get(&f) {
            return res;
        }
        let res = match value(self.variable(f)) {
            Some(true) => self.is_sat_under_(self.high_node(f), value, memo),
            Some(false) => self.is_sat_under_(self.low_node(f), value, memo),
            None => {
                self.is_sat_under_(self.low_node(f), value, memo) || self.is_sat_under_(self.high_node(f), value, memo)
            }
        };
        memo.insert(f, res);
        res
    }

    /// Indices of all nodes reachable from `nodes`, terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(Ref::ONE.id());
        let mut stack: Vec<Ref> = nodes.into_iter().collect();

        while let Some(node) = stack.pop() {
            if visited.insert(node.id()) {
                let n = self.node(node.index());
                stack.push(n.low);
                stack.push(n.high);
            }
        }

        visited
    }

    /// Number of nodes in `f`, terminal included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    /// Register an external reference to `f`, protecting it from garbage collection.
    pub fn add_ref(&self, f: Ref) {
        if self.is_terminal(f) {
            return;
        }
        *self.refs.borrow_mut().entry(f.id()).or_insert(0) += 1;
    }

    /// Drop an external reference previously registered with [`add_ref`][Bdd::add_ref].
    pub fn del_ref(&self, f: Ref) {
        if self.is_terminal(f) {
            return;
        }
        let mut refs = self.refs.borrow_mut();
        match refs.get_mut(&f.id()) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                refs.remove(&f.id());
            }
            None => panic!("del_ref on unreferenced node {}", f),
        }
    }

    /// Number of external references currently held on `f`.
    pub fn ref_count(&self, f: Ref) -> usize {
        self.refs.borrow().get(&f.id()).copied().unwrap_or(0)
    }

    /// Reclaim every node not reachable from a referenced node or from `roots`.
    ///
    /// Any `Ref` not protected this way is dangling afterwards. Returns the number of reclaimed nodes.
    pub fn collect_garbage(&self, roots: &[Ref]) -> usize {
        let referenced: Vec<Ref> = self.refs.borrow().keys().map(|&i| Ref::positive(i)).collect();
        let alive = self.descendants(roots.iter().copied().chain(referenced));

        self.cache.borrow_mut().clear();
        let dropped = self.storage.borrow_mut().sweep(|i| alive.contains(&(i as u32)));
        debug!(
            "collect_garbage: {} alive, {} reclaimed, {} live nodes",
            alive.len(),
            dropped,
            self.num_nodes()
        );
        dropped
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn small() -> Bdd {
        Bdd::new(BddConfig {
            storage_bits: 12,
            cache_bits: 8,
        })
    }

    #[test]
    fn test_cache_hits() {
        let bdd = small();
        let x1 = bdd.mk_var(1).unwrap();
        let x2 = bdd.mk_var(2).unwrap();
        let before = bdd.cache_hits();
        let f = bdd.apply_and(x1, x2).unwrap();
        assert_eq!(bdd.apply_and(x1, x2).unwrap(), f);
        assert!(bdd.cache_hits() > before);
    }

    #[test]
    fn test_var() {
        let bdd = small();
        let x = bdd.mk_var(1).unwrap();

        assert_eq!(bdd.variable(x), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());

        let not_x = -x;
        assert_eq!(bdd.high_node(not_x), bdd.zero());
        assert_eq!(bdd.low_node(not_x), bdd.one());
    }

    #[test]
    fn test_terminal() {
        let bdd = small();
        assert!(bdd.is_terminal(bdd.zero()));
        assert!(bdd.is_terminal(bdd.one()));
        assert!(bdd.is_zero(-bdd.one()));
        assert_eq!(bdd.num_nodes(), 1);
    }

    #[test]
    fn test_cube() {
        let bdd = small();
        let x1 = bdd.mk_var(1).unwrap();
        let x2 = bdd.mk_var(2).unwrap();
        let x3 = bdd.mk_var(3).unwrap();

        let f = bdd.apply_and_many([x1, -x2, -x3]).unwrap();
        let cube = bdd.mk_cube([-3, 1, -2]).unwrap();
        assert_eq!(f, cube);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = small();
        let x = bdd.mk_var(1).unwrap();
        let y = bdd.mk_var(2).unwrap();

        let f = -bdd.apply_and(x, y).unwrap();
        let g = bdd.apply_or(-x, -y).unwrap();
        assert_eq!(f, g);

        let f = -bdd.apply_or(x, y).unwrap();
        let g = bdd.apply_and(-x, -y).unwrap();
        assert_eq!(f, g);
    }

    #[test]
    fn test_eq_and_diff() {
        let bdd = small();
        let x = bdd.mk_var(1).unwrap();
        let y = bdd.mk_var(2).unwrap();

        let eq = bdd.apply_eq(x, y).unwrap();
        let expected = bdd
            .apply_or(bdd.apply_and(x, y).unwrap(), bdd.apply_and(-x, -y).unwrap())
            .unwrap();
        assert_eq!(eq, expected);

        let diff = bdd.apply_diff(x, y).unwrap();
        assert_eq!(diff, bdd.apply_and(x, -y).unwrap());
        assert!(bdd.is_zero(bdd.apply_diff(x, x).unwrap()));
    }

    #[test]
    fn test_exists() {
        let bdd = small();
        let x1 = bdd.mk_var(1).unwrap();
        let x2 = bdd.mk_var(2).unwrap();
        let x3 = bdd.mk_var(3).unwrap();

        // ∃x2. (x1 ∧ x2) ∨ (¬x2 ∧ x3) = x1 ∨ x3
        let f = bdd
            .apply_or(bdd.apply_and(x1, x2).unwrap(), bdd.apply_and(-x2, x3).unwrap())
            .unwrap();
        let g = bdd.exists(f, &[2]).unwrap();
        assert_eq!(g, bdd.apply_or(x1, x3).unwrap());

        // Quantifying everything out of a satisfiable function gives 1.
        assert!(bdd.is_one(bdd.exists(f, &[1, 2, 3]).unwrap()));
    }

    #[test]
    fn test_rel_product_matches_and_exists() {
        let bdd = small();
        let x1 = bdd.mk_var(1).unwrap();
        let x2 = bdd.mk_var(2).unwrap();
        let x3 = bdd.mk_var(3).unwrap();
        let x4 = bdd.mk_var(4).unwrap();

        let f = bdd.apply_or(x1, -x3).unwrap();
        let g = bdd
            .apply_and(bdd.apply_eq(x1, x2).unwrap(), bdd.apply_eq(x3, x4).unwrap())
            .unwrap();

        let fused = bdd.rel_product(f, g, &[1, 3]).unwrap();
        let naive = bdd.exists(bdd.apply_and(f, g).unwrap(), &[1, 3]).unwrap();
        assert_eq!(fused, naive);
        assert_eq!(naive, bdd.apply_or(x2, -x4).unwrap());
    }

    #[test]
    fn test_rename_vars() {
        let bdd = small();
        let x2 = bdd.mk_var(2).unwrap();
        let x4 = bdd.mk_var(4).unwrap();
        let f = bdd.apply_and(x2, -x4).unwrap();

        let map = HashMap::from([(2, 1), (4, 3)]);
        let g = bdd.rename_vars(f, &map).unwrap();
        assert_eq!(g, bdd.mk_cube([1, -3]).unwrap());

        // Swap is simultaneous, not sequential.
        let x1 = bdd.mk_var(1).unwrap();
        let h = bdd.apply_and(x1, -x2).unwrap();
        let swap = HashMap::from([(1, 2), (2, 1)]);
        let h2 = bdd.rename_vars(h, &swap).unwrap();
        assert_eq!(h2, bdd.mk_cube([2, -1]).unwrap());
    }

    #[test]
    fn test_is_sat_under() {
        let bdd = small();
        let f = bdd.mk_cube([1, -3]).unwrap();

        let assign = |v: u32| match v {
            1 => Some(true),
            3 => Some(false),
            _ => None,
        };
        assert!(bdd.is_sat_under(f, assign));
        assert!(!bdd.is_sat_under(f, |v| if v == 1 { Some(false) } else { None }));
        assert!(bdd.is_sat_under(f, |_| None));
        assert!(!bdd.is_sat_under(bdd.zero(), |_| None));

        let before = bdd.num_nodes();
        for _ in 0..10 {
            bdd.is_sat_under(f, assign);
        }
        assert_eq!(bdd.num_nodes(), before);
    }

    #[test]
    fn test_pool_exhaustion() {
        let bdd = Bdd::new(BddConfig {
            storage_bits: 3,
            cache_bits: 2,
        });
        // 7 usable cells: the terminal and 6 nodes.
        assert_eq!(bdd.capacity(), 7);
        let mut result = Ok(bdd.one());
        for v in 1..=10 {
            result = bdd.mk_var(v);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(BddError::NodePoolExhausted { capacity: 7 }));
    }

    #[test]
    fn test_garbage_collection() {
        let bdd = small();
        let x1 = bdd.mk_var(1).unwrap();
        let x2 = bdd.mk_var(2).unwrap();
        let keep = bdd.apply_and(x1, x2).unwrap();
        let _tmp = bdd.apply_or(bdd.mk_var(3).unwrap(), bdd.mk_var(4).unwrap()).unwrap();

        bdd.add_ref(keep);
        let before = bdd.num_nodes();
        let dropped = bdd.collect_garbage(&[]);
        assert!(dropped > 0);
        assert_eq!(bdd.num_nodes(), before - dropped);
        assert_eq!(bdd.num_nodes(), bdd.size(keep));

        // The protected function is still intact and canonical.
        let x1 = bdd.mk_var(1).unwrap();
        let x2 = bdd.mk_var(2).unwrap();
        assert_eq!(bdd.apply_and(x1, x2).unwrap(), keep);

        bdd.del_ref(keep);
        assert_eq!(bdd.ref_count(keep), 0);
        bdd.collect_garbage(&[]);
        assert_eq!(bdd.num_nodes(), 1);
    }
}
