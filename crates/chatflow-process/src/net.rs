//! Place/transition nets
//!
//! Plain data structure plus the structural queries the synthesizer and the
//! reduction need. Reachability questions are answered on a petgraph view of
//! the bipartite net.

use crate::error::SynthesisError;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

macro_rules! net_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create id
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow as string slice
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

net_id!(
    /// Place identifier
    PlaceId
);
net_id!(
    /// Transition identifier
    TransitionId
);

/// A transition; `label == None` means invisible (silent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Transition id
    pub id: TransitionId,
    /// Observable activity label
    pub label: Option<String>,
}

impl Transition {
    /// Whether the transition is silent
    #[inline]
    #[must_use]
    pub fn is_invisible(&self) -> bool {
        self.label.is_none()
    }
}

/// A directed arc between a place and a transition
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum Arc {
    /// Place → transition (input arc)
    PlaceToTransition {
        /// Input place
        place: PlaceId,
        /// Consuming transition
        transition: TransitionId,
    },
    /// Transition → place (output arc)
    TransitionToPlace {
        /// Producing transition
        transition: TransitionId,
        /// Output place
        place: PlaceId,
    },
}

/// Multiset of tokens on places
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Marking(BTreeMap<PlaceId, u32>);

impl Marking {
    /// Create empty marking
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marking with a single token on `place`
    #[must_use]
    pub fn single(place: PlaceId) -> Self {
        let mut marking = Self::new();
        marking.add(place, 1);
        marking
    }

    /// Add tokens to a place
    pub fn add(&mut self, place: PlaceId, tokens: u32) {
        *self.0.entry(place).or_insert(0) += tokens;
    }

    /// Remove a place, returning its tokens
    pub fn take(&mut self, place: &PlaceId) -> Option<u32> {
        self.0.remove(place)
    }

    /// Whether the place carries tokens
    #[inline]
    #[must_use]
    pub fn contains(&self, place: &PlaceId) -> bool {
        self.0.contains_key(place)
    }

    /// Marked places
    pub fn places(&self) -> impl Iterator<Item = &PlaceId> {
        self.0.keys()
    }
}

/// A place/transition net
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PetriNet {
    places: BTreeSet<PlaceId>,
    transitions: BTreeMap<TransitionId, Transition>,
    arcs: BTreeSet<Arc>,
}

impl PetriNet {
    /// Create empty net
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a place
    ///
    /// # Errors
    /// Returns error if the place already exists
    pub fn add_place(&mut self, place: PlaceId) -> Result<(), SynthesisError> {
        if !self.places.insert(place.clone()) {
            return Err(SynthesisError::DuplicatePlace(place));
        }
        Ok(())
    }

    /// Add a transition
    ///
    /// # Errors
    /// Returns error if the transition already exists
    pub fn add_transition(&mut self, transition: Transition) -> Result<(), SynthesisError> {
        if self.transitions.contains_key(&transition.id) {
            return Err(SynthesisError::DuplicateTransition(transition.id));
        }
        self.transitions.insert(transition.id.clone(), transition);
        Ok(())
    }

    /// Add an input arc `place → transition`
    ///
    /// # Errors
    /// Returns error if either endpoint is unknown
    pub fn add_input_arc(&mut self, place: &PlaceId, transition: &TransitionId) -> Result<(), SynthesisError> {
        self.check_endpoints(place, transition)?;
        self.arcs.insert(Arc::PlaceToTransition {
            place: place.clone(),
            transition: transition.clone(),
        });
        Ok(())
    }

    /// Add an output arc `transition → place`
    ///
    /// # Errors
    /// Returns error if either endpoint is unknown
    pub fn add_output_arc(&mut self, transition: &TransitionId, place: &PlaceId) -> Result<(), SynthesisError> {
        self.check_endpoints(place, transition)?;
        self.arcs.insert(Arc::TransitionToPlace {
            transition: transition.clone(),
            place: place.clone(),
        });
        Ok(())
    }

    fn check_endpoints(&self, place: &PlaceId, transition: &TransitionId) -> Result<(), SynthesisError> {
        if !self.places.contains(place) {
            return Err(SynthesisError::UnknownPlace(place.clone()));
        }
        if !self.transitions.contains_key(transition) {
            return Err(SynthesisError::UnknownTransition(transition.clone()));
        }
        Ok(())
    }

    /// Places
    #[inline]
    #[must_use]
    pub fn places(&self) -> &BTreeSet<PlaceId> {
        &self.places
    }

    /// Transitions by id
    #[inline]
    #[must_use]
    pub fn transitions(&self) -> &BTreeMap<TransitionId, Transition> {
        &self.transitions
    }

    /// Arcs
    #[inline]
    #[must_use]
    pub fn arcs(&self) -> &BTreeSet<Arc> {
        &self.arcs
    }

    /// Look up a transition
    #[inline]
    #[must_use]
    pub fn transition(&self, id: &TransitionId) -> Option<&Transition> {
        self.transitions.get(id)
    }

    /// Set the label of a transition; returns `false` if it does not exist
    pub fn set_label(&mut self, id: &TransitionId, label: Option<String>) -> bool {
        match self.transitions.get_mut(id) {
            Some(transition) => {
                transition.label = label;
                true
            }
            None => false,
        }
    }

    /// Input places of a transition
    #[must_use]
    pub fn preset(&self, transition: &TransitionId) -> Vec<&PlaceId> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                Arc::PlaceToTransition { place, transition: t } if t == transition => Some(place),
                _ => None,
            })
            .collect()
    }

    /// Output places of a transition
    #[must_use]
    pub fn postset(&self, transition: &TransitionId) -> Vec<&PlaceId> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                Arc::TransitionToPlace { transition: t, place } if t == transition => Some(place),
                _ => None,
            })
            .collect()
    }

    /// Transitions consuming from a place
    #[must_use]
    pub fn consumers(&self, place: &PlaceId) -> Vec<&TransitionId> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                Arc::PlaceToTransition { place: p, transition } if p == place => Some(transition),
                _ => None,
            })
            .collect()
    }

    /// Transitions producing into a place
    #[must_use]
    pub fn producers(&self, place: &PlaceId) -> Vec<&TransitionId> {
        self.arcs
            .iter()
            .filter_map(|arc| match arc {
                Arc::TransitionToPlace { transition, place: p } if p == place => Some(transition),
                _ => None,
            })
            .collect()
    }

    /// Remove a transition and its arcs
    pub fn remove_transition(&mut self, id: &TransitionId) -> Option<Transition> {
        self.arcs.retain(|arc| match arc {
            Arc::PlaceToTransition { transition, .. } | Arc::TransitionToPlace { transition, .. } => {
                transition != id
            }
        });
        self.transitions.remove(id)
    }

    /// Fold place `from` into place `into`: every arc touching `from` is
    /// moved to `into` and `from` is deleted
    pub fn merge_place(&mut self, from: &PlaceId, into: &PlaceId) {
        let moved: Vec<Arc> = self
            .arcs
            .iter()
            .filter(|arc| match arc {
                Arc::PlaceToTransition { place, .. } | Arc::TransitionToPlace { place, .. } => place == from,
            })
            .cloned()
            .collect();

        for arc in moved {
            self.arcs.remove(&arc);
            let rewired = match arc {
                Arc::PlaceToTransition { transition, .. } => Arc::PlaceToTransition {
                    place: into.clone(),
                    transition,
                },
                Arc::TransitionToPlace { transition, .. } => Arc::TransitionToPlace {
                    transition,
                    place: into.clone(),
                },
            };
            self.arcs.insert(rewired);
        }
        self.places.remove(from);
    }

    /// Whether a directed path leads from place `from` to place `to`
    #[must_use]
    pub fn connects(&self, from: &PlaceId, to: &PlaceId) -> bool {
        let (graph, places, _) = self.to_graph();
        match (places.get(from), places.get(to)) {
            (Some(&a), Some(&b)) => petgraph::algo::has_path_connecting(&graph, a, b, None),
            _ => false,
        }
    }

    /// Bipartite petgraph view: node weights are place or transition ids
    #[must_use]
    pub fn to_graph(
        &self,
    ) -> (
        DiGraph<NetNode<'_>, ()>,
        BTreeMap<&PlaceId, NodeIndex>,
        BTreeMap<&TransitionId, NodeIndex>,
    ) {
        let mut graph = DiGraph::new();
        let places: BTreeMap<_, _> = self
            .places
            .iter()
            .map(|p| (p, graph.add_node(NetNode::Place(p))))
            .collect();
        let transitions: BTreeMap<_, _> = self
            .transitions
            .keys()
            .map(|t| (t, graph.add_node(NetNode::Transition(t))))
            .collect();

        for arc in &self.arcs {
            let (from, to) = match arc {
                Arc::PlaceToTransition { place, transition } => (places.get(place), transitions.get(transition)),
                Arc::TransitionToPlace { transition, place } => (transitions.get(transition), places.get(place)),
            };
            if let (Some(&a), Some(&b)) = (from, to) {
                graph.add_edge(a, b, ());
            }
        }
        (graph, places, transitions)
    }
}

/// Node of the petgraph view of a net
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetNode<'a> {
    /// A place
    Place(&'a PlaceId),
    /// A transition
    Transition(&'a TransitionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PlaceId {
        PlaceId::from(s)
    }

    fn t(s: &str) -> TransitionId {
        TransitionId::from(s)
    }

    fn chain() -> PetriNet {
        let mut net = PetriNet::new();
        for place in ["start", "mid", "end"] {
            net.add_place(p(place)).unwrap();
        }
        net.add_transition(Transition { id: t("a"), label: Some("A".into()) }).unwrap();
        net.add_transition(Transition { id: t("b"), label: None }).unwrap();
        net.add_input_arc(&p("start"), &t("a")).unwrap();
        net.add_output_arc(&t("a"), &p("mid")).unwrap();
        net.add_input_arc(&p("mid"), &t("b")).unwrap();
        net.add_output_arc(&t("b"), &p("end")).unwrap();
        net
    }

    #[test]
    fn presets_and_postsets() {
        let net = chain();
        assert_eq!(net.preset(&t("b")), vec![&p("mid")]);
        assert_eq!(net.postset(&t("a")), vec![&p("mid")]);
        assert_eq!(net.consumers(&p("start")), vec![&t("a")]);
        assert_eq!(net.producers(&p("end")), vec![&t("b")]);
    }

    #[test]
    fn duplicate_and_unknown_elements_are_rejected() {
        let mut net = chain();
        assert!(matches!(net.add_place(p("mid")), Err(SynthesisError::DuplicatePlace(_))));
        assert!(matches!(
            net.add_input_arc(&p("nowhere"), &t("a")),
            Err(SynthesisError::UnknownPlace(_))
        ));
        assert!(matches!(
            net.add_output_arc(&t("ghost"), &p("end")),
            Err(SynthesisError::UnknownTransition(_))
        ));
    }

    #[test]
    fn connectivity() {
        let net = chain();
        assert!(net.connects(&p("start"), &p("end")));
        assert!(!net.connects(&p("end"), &p("start")));
    }

    #[test]
    fn remove_transition_drops_arcs() {
        let mut net = chain();
        net.remove_transition(&t("b"));
        assert!(net.consumers(&p("mid")).is_empty());
        assert!(!net.connects(&p("start"), &p("end")));
    }

    #[test]
    fn merge_place_rewires_arcs() {
        let mut net = chain();
        net.remove_transition(&t("b"));
        net.merge_place(&p("end"), &p("mid"));
        assert!(!net.places().contains(&p("end")));
        assert_eq!(net.producers(&p("mid")), vec![&t("a")]);
    }

    #[test]
    fn marking_counts_tokens() {
        let mut marking = Marking::single(p("start"));
        marking.add(p("start"), 2);
        assert_eq!(marking.take(&p("start")), Some(3));
        assert!(!marking.contains(&p("start")));
    }
}
