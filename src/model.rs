//! Petri net model and markings.
//!
//! A [`Model`] is immutable once built: places, transitions, the `Pre`/`Post` incidence matrices
//! (`P x T`, nonnegative arc weights) and the initial marking. It is constructed either from
//! raw matrices with [`Model::new`] or by name with [`ModelBuilder`].

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::ops::Index;

use log::warn;

use crate::error::ModelError;
use crate::types::{PlaceId, TransitionId};

/// Token count per place.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Marking(Vec<u8>);

impl Marking {
    pub fn new(tokens: Vec<u8>) -> Self {
        Marking(tokens)
    }

    /// The empty marking over `num_places` places.
    pub fn zeros(num_places: usize) -> Self {
        Marking(vec![0; num_places])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    /// Number of places holding at least one token.
    pub fn ones(&self) -> usize {
        self.0.iter().filter(|&&x| x > 0).count()
    }

    /// Whether every place holds at most one token.
    pub fn is_binary(&self) -> bool {
        self.0.iter().all(|&x| x <= 1)
    }
}

impl From<Vec<u8>> for Marking {
    fn from(tokens: Vec<u8>) -> Self {
        Marking(tokens)
    }
}

impl<const N: usize> From<[u8; N]> for Marking {
    fn from(tokens: [u8; N]) -> Self {
        Marking(tokens.to_vec())
    }
}

impl Index<usize> for Marking {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Index<PlaceId> for Marking {
    type Output = u8;

    fn index(&self, place: PlaceId) -> &Self::Output {
        &self.0[place.index()]
    }
}

impl Display for Marking {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, x) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", x)?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    places: Vec<String>,
    transitions: Vec<String>,
    /// `pre[p][t]`: tokens consumed from place `p` by transition `t`.
    pre: Vec<Vec<u32>>,
    /// `post[p][t]`: tokens produced into place `p` by transition `t`.
    post: Vec<Vec<u32>>,
    m0: Marking,
    place_index: HashMap<String, PlaceId>,
    transition_index: HashMap<String, TransitionId>,
}

fn check_matrix(
    matrix: &'static str,
    data: &[Vec<u32>],
    places: usize,
    transitions: usize,
) -> Result<(), ModelError> {
    let bad_row = data.iter().find(|row| row.len() != transitions);
    if data.len() != places || bad_row.is_some() {
        return Err(ModelError::Dimension {
            matrix,
            rows: data.len(),
            cols: bad_row.map_or(transitions, |row| row.len()),
            places,
            transitions,
        });
    }
    Ok(())
}

fn index_names<I: Copy>(
    kind: &'static str,
    names: &[String],
    mk: impl Fn(usize) -> I,
) -> Result<HashMap<String, I>, ModelError> {
    let mut index = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if index.insert(name.clone(), mk(i)).is_some() {
            return Err(ModelError::DuplicateName {
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(index)
}

impl Model {
    /// Build a model from incidence matrices, checking all structural invariants.
    pub fn new(
        places: Vec<String>,
        transitions: Vec<String>,
        pre: Vec<Vec<u32>>,
        post: Vec<Vec<u32>>,
        m0: impl Into<Marking>,
    ) -> Result<Self, ModelError> {
        let m0 = m0.into();
        if places.is_empty() {
            return Err(ModelError::Empty);
        }
        if m0.len() != places.len() {
            return Err(ModelError::MarkingLength {
                expected: places.len(),
                actual: m0.len(),
            });
        }
        check_matrix("Pre", &pre, places.len(), transitions.len())?;
        check_matrix("Post", &post, places.len(), transitions.len())?;

        let place_index = index_names("place", &places, PlaceId::new)?;
        let transition_index = index_names("transition", &transitions, TransitionId::new)?;

        Ok(Self {
            places,
            transitions,
            pre,
            post,
            m0,
            place_index,
            transition_index,
        })
    }

    pub fn num_places(&self) -> usize {
        self.places.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn place_ids(&self) -> impl Iterator<Item = PlaceId> {
        (0..self.places.len()).map(PlaceId::new)
    }

    pub fn transition_ids(&self) -> impl Iterator<Item = TransitionId> {
        (0..self.transitions.len()).map(TransitionId::new)
    }

    pub fn place_name(&self, p: PlaceId) -> &str {
        &self.places[p.index()]
    }

    pub fn transition_name(&self, t: TransitionId) -> &str {
        &self.transitions[t.index()]
    }

    pub fn place(&self, name: &str) -> Option<PlaceId> {
        self.place_index.get(name).copied()
    }

    pub fn transition(&self, name: &str) -> Option<TransitionId> {
        self.transition_index.get(name).copied()
    }

    pub fn pre(&self, p: PlaceId, t: TransitionId) -> u32 {
        self.pre[p.index()][t.index()]
    }

    pub fn post(&self, p: PlaceId, t: TransitionId) -> u32 {
        self.post[p.index()][t.index()]
    }

    /// Total number of tokens `t` consumes.
    pub fn total_pre(&self, t: TransitionId) -> u32 {
        self.place_ids().map(|p| self.pre(p, t)).sum()
    }

    /// Places with a nonzero `Pre` entry for `t`.
    pub fn input_places(&self, t: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.place_ids().filter(move |&p| self.pre(p, t) > 0)
    }

    pub fn initial_marking(&self) -> &Marking {
        &self.m0
    }

    /// Check the 1-safe assumption on the initial marking.
    ///
    /// A place holding more than one token is only a warning: the net may still be analyzed
    /// explicitly, but the boolean encoding will refuse that marking.
    pub fn validate(&self) -> bool {
        let mut ok = true;
        for p in self.place_ids() {
            let tokens = self.m0[p];
            if tokens > 1 {
                warn!(
                    "place '{}' holds {} tokens initially, the net is not 1-safe",
                    self.place_name(p),
                    tokens
                );
                ok = false;
            }
        }
        ok
    }

    /// Reject arcs of weight above 1, which the boolean encoding cannot express.
    pub fn check_one_safe_arcs(&self) -> Result<(), ModelError> {
        for t in self.transition_ids() {
            for p in self.place_ids() {
                let weight = self.pre(p, t).max(self.post(p, t));
                if weight > 1 {
                    return Err(ModelError::WeightedArc {
                        place: self.place_name(p).to_string(),
                        transition: self.transition_name(t).to_string(),
                        weight,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_enabled(&self, m: &Marking, t: TransitionId) -> bool {
        self.place_ids().all(|p| m[p] as u32 >= self.pre(p, t))
    }

    /// Fire `t` in `m`, or `None` if `t` is not enabled.
    ///
    /// Token counts saturate at `u8::MAX`.
    pub fn fire(&self, m: &Marking, t: TransitionId) -> Option<Marking> {
        if !self.is_enabled(m, t) {
            return None;
        }
        let tokens = self
            .place_ids()
            .map(|p| {
                let after = m[p] as u32 - self.pre(p, t) + self.post(p, t);
                after.min(u8::MAX as u32) as u8
            })
            .collect();
        Some(Marking(tokens))
    }

    pub fn enabled(&self, m: &Marking) -> impl Iterator<Item = TransitionId> + '_ {
        let m = m.clone();
        self.transition_ids().filter(move |&t| self.is_enabled(&m, t))
    }

    pub fn is_deadlock(&self, m: &Marking) -> bool {
        self.transition_ids().all(|t| !self.is_enabled(m, t))
    }
}

/// Arc list of one transition under construction.
#[derive(Debug, Default)]
struct PendingTransition {
    name: String,
    inputs: Vec<(String, u32)>,
    outputs: Vec<(String, u32)>,
}

/// Incremental, name-based construction of a [`Model`].
///
/// Names are resolved in [`build`][ModelBuilder::build], so arcs may mention places declared later.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    places: Vec<(String, u8)>,
    transitions: Vec<PendingTransition>,
}

pub struct TransitionBuilder<'a> {
    pending: &'a mut PendingTransition,
}

impl TransitionBuilder<'_> {
    pub fn input(self, place: &str) -> Self {
        self.input_weighted(place, 1)
    }

    pub fn output(self, place: &str) -> Self {
        self.output_weighted(place, 1)
    }

    pub fn input_weighted(self, place: &str, weight: u32) -> Self {
        self.pending.inputs.push((place.to_string(), weight));
        self
    }

    pub fn output_weighted(self, place: &str, weight: u32) -> Self {
        self.pending.outputs.push((place.to_string(), weight));
        self
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&mut self, name: &str, tokens: u8) -> &mut Self {
        self.places.push((name.to_string(), tokens));
        self
    }

    pub fn transition(&mut self, name: &str) -> TransitionBuilder<'_> {
        let index = self.transitions.len();
        self.transitions.push(PendingTransition {
            name: name.to_string(),
            ..Default::default()
        });
        TransitionBuilder {
            pending: &mut self.transitions[index],
        }
    }

    pub fn build(&self) -> Result<Model, ModelError> {
        let places: Vec<String> = self.places.iter().map(|(name, _)| name.clone()).collect();
        let transitions: Vec<String> = self.transitions.iter().map(|t| t.name.clone()).collect();
        let m0: Vec<u8> = self.places.iter().map(|&(_, tokens)| tokens).collect();

        let place_index = index_names("place", &places, |i| i)?;
        let mut pre = vec![vec![0; transitions.len()]; places.len()];
        let mut post = vec![vec![0; transitions.len()]; places.len()];

        for (t, pending) in self.transitions.iter().enumerate() {
            for (arcs, matrix) in [(&pending.inputs, &mut pre), (&pending.outputs, &mut post)] {
                for (name, weight) in arcs {
                    let p = *place_index.get(name).ok_or_else(|| ModelError::UnknownName {
                        kind: "place",
                        name: name.clone(),
                    })?;
                    matrix[p][t] += weight;
                }
            }
        }

        Model::new(places, transitions, pre, post, m0)
    }
}
