use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Number of assignments to `vars` satisfying `node`.
    ///
    /// The support of `node` must be contained in `vars`.
    pub fn sat_count_over(&self, node: Ref, vars: &[u32]) -> BigUint {
        let mut sorted = vars.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let position: HashMap<u32, usize> = sorted.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        let k = sorted.len();

        let mut cache = HashMap::new();
        let top = self.position(node, &position, k);
        self._sat_count(node, &position, k, &mut cache) << top
    }

    fn position(&self, node: Ref, position: &HashMap<u32, usize>, k: usize) -> usize {
        if self.is_terminal(node) {
            return k;
        }
        let v = self.variable(node);
        match position.get(&v) {
            Some(&p) => p,
            None => panic!("variable x{} is outside the counting set", v),
        }
    }

    /// Count over the variables at positions `>= position(node)`.
    fn _sat_count(
        &self,
        node: Ref,
        position: &HashMap<u32, usize>,
        k: usize,
        cache: &mut HashMap<Ref, BigUint>,
    ) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return BigUint::from(1u32);
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let p = self.position(node, position, k);
        let regular = node.regular();
        let low = self.low_node(regular);
        let high = self.high_node(regular);

        let count_low = self._sat_count(low, position, k, cache) << (self.position(low, position, k) - p - 1);
        let count_high = self._sat_count(high, position, k, cache) << (self.position(high, position, k) - p - 1);
        let count = count_low + count_high;

        let count = if node.is_negated() {
            (BigUint::from(1u32) << (k - p)) - count
        } else {
            count
        };

        cache.insert(node, count.clone());
        count
    }
}
