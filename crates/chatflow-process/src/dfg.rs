//! Directly-follows graph
//!
//! A [`Dfg`] maps ordered node-id pairs to an occurrence count and carries the
//! start/end activity sets. Ordered collections keep every iteration, and
//! therefore every derived net, deterministic.

use chatflow_graph::NodeId;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Ordered `(source, target)` pair
pub type DfgEdge = (NodeId, NodeId);

/// Directly-follows graph with start and end activities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dfg {
    edges: BTreeMap<DfgEdge, u64>,
    start: BTreeSet<NodeId>,
    end: BTreeSet<NodeId>,
}

impl Dfg {
    /// Create empty DFG
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Edge counts, ascending by `(source, target)`
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &BTreeMap<DfgEdge, u64> {
        &self.edges
    }

    /// Start activities
    #[inline]
    #[must_use]
    pub fn start(&self) -> &BTreeSet<NodeId> {
        &self.start
    }

    /// End activities
    #[inline]
    #[must_use]
    pub fn end(&self) -> &BTreeSet<NodeId> {
        &self.end
    }

    /// Count of an edge, `None` if absent
    #[inline]
    #[must_use]
    pub fn count(&self, source: &NodeId, target: &NodeId) -> Option<u64> {
        self.edges.get(&(source.clone(), target.clone())).copied()
    }

    /// Whether the edge exists
    #[inline]
    #[must_use]
    pub fn contains_edge(&self, source: &NodeId, target: &NodeId) -> bool {
        self.count(source, target).is_some()
    }

    /// Register an edge with count 0, keeping an existing count
    pub fn insert_edge(&mut self, source: NodeId, target: NodeId) {
        self.edges.entry((source, target)).or_insert(0);
    }

    /// Add `by` to an edge, creating it at `by` if absent
    pub fn increment(&mut self, source: NodeId, target: NodeId, by: u64) {
        *self.edges.entry((source, target)).or_insert(0) += by;
    }

    /// Remove an edge, returning its count
    pub fn remove_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<u64> {
        self.edges.remove(&(source.clone(), target.clone()))
    }

    /// Mark a start activity
    pub fn add_start(&mut self, id: NodeId) {
        self.start.insert(id);
    }

    /// Mark an end activity
    pub fn add_end(&mut self, id: NodeId) {
        self.end.insert(id);
    }

    /// Targets of edges leaving `id`
    pub fn successors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.edges
            .keys()
            .filter(move |(s, _)| s == id)
            .map(|(_, t)| t)
    }

    /// Sources of edges entering `id`
    pub fn predecessors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.edges
            .keys()
            .filter(move |(_, t)| t == id)
            .map(|(s, _)| s)
    }

    /// Whether any edge leaves `id`
    #[must_use]
    pub fn has_outgoing(&self, id: &NodeId) -> bool {
        self.successors(id).next().is_some()
    }

    /// Whether any edge enters `id`
    #[must_use]
    pub fn has_incoming(&self, id: &NodeId) -> bool {
        self.predecessors(id).next().is_some()
    }

    /// Whether any edge touches `id`
    #[must_use]
    pub fn touches(&self, id: &NodeId) -> bool {
        self.edges.keys().any(|(s, t)| s == id || t == id)
    }

    /// Every node that is an edge endpoint
    #[must_use]
    pub fn edge_nodes(&self) -> BTreeSet<&NodeId> {
        self.edges.keys().flat_map(|(s, t)| [s, t]).collect()
    }

    /// Every activity: edge endpoints plus start and end activities
    #[must_use]
    pub fn activities(&self) -> BTreeSet<&NodeId> {
        let mut all = self.edge_nodes();
        all.extend(self.start.iter());
        all.extend(self.end.iter());
        all
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the DFG has no edges
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Serialize)]
struct EdgeWire<'a> {
    source: &'a NodeId,
    target: &'a NodeId,
    count: u64,
}

impl Serialize for Dfg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let edges: Vec<EdgeWire<'_>> = self
            .edges
            .iter()
            .map(|((source, target), count)| EdgeWire {
                source,
                target,
                count: *count,
            })
            .collect();
        let mut state = serializer.serialize_struct("Dfg", 3)?;
        state.serialize_field("edges", &edges)?;
        state.serialize_field("start_activities", &self.start)?;
        state.serialize_field("end_activities", &self.end)?;
        state.end()
    }
}
