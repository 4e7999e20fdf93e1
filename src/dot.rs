//! DOT (Graphviz) rendering of BDDs and Petri nets.
//!
//! BDD conventions:
//! - terminal node `1` is a square at the bottom (sink rank);
//! - variable nodes are circles, grouped by variable level;
//! - solid edges are high branches, dashed edges are low branches;
//! - a complemented low edge is dotted with a hollow circle head;
//! - roots are rectangles at the top (source rank).
//!
//! Net conventions: places are circles labeled with their name and initial tokens,
//! transitions are boxes, arcs are directed and carry their weight when it is above 1.
//!
//! ```
//! use petri_rs::bdd::Bdd;
//!
//! let bdd = Bdd::default();
//! let f = bdd.mk_cube([1, -2]).unwrap();
//! let dot = bdd.to_dot(&[f], |v| format!("x{}", v)).unwrap();
//! assert!(dot.starts_with("graph {"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::bdd::Bdd;
use crate::model::Model;
use crate::reference::Ref;

impl Bdd {
    /// Render every node reachable from `roots`.
    ///
    /// `labeler` maps a variable index to the label of the nodes on its level.
    pub fn to_dot(&self, roots: &[Ref], labeler: impl Fn(u32) -> String) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape=circle];")?;

        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "1 [shape=square, label=\"1\"];")?;
        writeln!(dot, "}}")?;

        let all_nodes = self.descendants(roots.iter().copied());

        // Group nodes at the same variable level for the layout
        let mut levels = BTreeMap::<u32, Vec<u32>>::new();
        for &id in all_nodes.iter() {
            if id == Ref::ONE.id() {
                continue;
            }
            levels.entry(self.variable(Ref::positive(id))).or_default().push(id);
        }

        for (&var, level) in levels.iter_mut() {
            level.sort_unstable();
            writeln!(dot, "{{ rank=same")?;
            for &id in level.iter() {
                writeln!(dot, "{} [label=\"{}\"];", id, labeler(var))?;
            }
            writeln!(dot, "}}")?;
        }

        for level in levels.values() {
            for &id in level {
                let node = Ref::positive(id);

                let high = self.high_node(node);
                assert!(!high.is_negated(), "high edges are regular");
                writeln!(dot, "{} -- {} [style=solid];", id, high.index())?;

                let low = self.low_node(node);
                if low.is_negated() {
                    writeln!(
                        dot,
                        "{} -- {} [style=dotted, dir=forward, arrowhead=odot];",
                        id,
                        low.index()
                    )?;
                } else {
                    writeln!(dot, "{} -- {} [style=dashed];", id, low.index())?;
                }
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape=rect, label=\"{}\"];", i, root)?;
        }
        writeln!(dot, "}}")?;

        for (i, &root) in roots.iter().enumerate() {
            if root.is_negated() {
                writeln!(dot, "r{} -- {} [dir=forward, arrowhead=odot];", i, root.index())?;
            } else {
                writeln!(dot, "r{} -- {};", i, root.index())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

/// Render the net structure: places, transitions and arcs.
pub fn net_to_dot(model: &Model) -> Result<String, std::fmt::Error> {
    let mut dot = String::new();
    writeln!(dot, "digraph {{")?;
    writeln!(dot, "rankdir=LR;")?;

    for p in model.place_ids() {
        let tokens = model.initial_marking()[p.index()];
        writeln!(
            dot,
            "p{} [shape=circle, label=\"{}\\n{}\"];",
            p.index(),
            model.place_name(p),
            tokens
        )?;
    }
    for t in model.transition_ids() {
        writeln!(dot, "t{} [shape=box, label=\"{}\"];", t.index(), model.transition_name(t))?;
    }

    for t in model.transition_ids() {
        for p in model.place_ids() {
            let pre = model.pre(p, t);
            if pre > 0 {
                write!(dot, "p{} -> t{}", p.index(), t.index())?;
                if pre > 1 {
                    write!(dot, " [label=\"{}\"]", pre)?;
                }
                writeln!(dot, ";")?;
            }
            let post = model.post(p, t);
            if post > 0 {
                write!(dot, "t{} -> p{}", t.index(), p.index())?;
                if post > 1 {
                    write!(dot, " [label=\"{}\"]", post)?;
                }
                writeln!(dot, ";")?;
            }
        }
    }

    writeln!(dot, "}}")?;
    Ok(dot)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bdd::BddConfig;
    use crate::model::ModelBuilder;

    fn small() -> Bdd {
        Bdd::new(BddConfig {
            storage_bits: 10,
            cache_bits: 6,
        })
    }

    #[test]
    fn test_to_dot_basic() {
        let bdd = small();
        let f = bdd.mk_cube([-1, 2, 3]).unwrap();

        let dot = bdd.to_dot(&[f], |v| format!("x{}", v)).unwrap();
        assert!(dot.starts_with("graph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("label=\"x2\""));
    }

    #[test]
    fn test_to_dot_constants() {
        let bdd = small();
        let dot = bdd.to_dot(&[bdd.zero(), bdd.one()], |v| v.to_string()).unwrap();
        assert!(dot.contains("r0 -- 1 [dir=forward, arrowhead=odot];"));
        assert!(dot.contains("r1 -- 1;"));
    }

    #[test]
    fn test_to_dot_negated_low() {
        let bdd = small();
        let x1 = bdd.mk_var(1).unwrap();
        let x2 = bdd.mk_var(2).unwrap();
        // x1 ? x2 : ~x2 has a complemented low edge
        let f = bdd.apply_eq(x1, x2).unwrap();
        let dot = bdd.to_dot(&[f], |v| format!("x{}", v)).unwrap();
        assert!(dot.contains("arrowhead=odot"));
    }

    #[test]
    fn test_net_to_dot() {
        let mut builder = ModelBuilder::new();
        builder.place("idle", 1).place("busy", 0);
        builder.transition("start").input("idle").output("busy");
        let model = builder.build().unwrap();

        let dot = net_to_dot(&model).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("p0 [shape=circle, label=\"idle\\n1\"];"));
        assert!(dot.contains("t0 [shape=box, label=\"start\"];"));
        assert!(dot.contains("p0 -> t0;"));
        assert!(dot.contains("t0 -> p1;"));
    }
}
