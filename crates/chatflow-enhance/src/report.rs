//! Serializable view of an enhanced model

use crate::performance::PerformanceMap;
use chatflow_graph::{NameMap, NodeId};
use chatflow_process::Dfg;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Node of the enhanced graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    /// Node id
    pub id: NodeId,
    /// Activity name
    pub label: Option<String>,
    /// Mean intent-recognition confidence of the activity
    pub avg_confidence: Option<f64>,
}

/// Edge of the enhanced graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEdge {
    /// Source id
    pub source: NodeId,
    /// Target id
    pub target: NodeId,
    /// Mean duration in seconds
    pub performance: Option<f64>,
    /// Observed frequency
    pub frequency: u64,
}

/// Nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewGraph {
    /// Nodes in first-appearance order over the sorted edges
    pub nodes: Vec<ViewNode>,
    /// Edges ascending by `(source, target)`
    pub edges: Vec<ViewEdge>,
}

/// Enhanced model as returned to API consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedModelView {
    /// Graph with frequency and performance annotations
    pub graph: ViewGraph,
    /// Start activities
    pub start_activities: BTreeSet<NodeId>,
    /// End activities
    pub end_activities: BTreeSet<NodeId>,
    /// Id → name map
    pub names: NameMap,
}

impl EnhancedModelView {
    /// Assemble the view; `confidence` maps activity names to their mean
    /// confidence
    #[must_use]
    pub fn build(
        dfg: &Dfg,
        names: &NameMap,
        performance: &PerformanceMap,
        confidence: &BTreeMap<String, f64>,
    ) -> Self {
        let mut seen = BTreeSet::new();
        let mut graph = ViewGraph::default();

        for ((source, target), &frequency) in dfg.edges() {
            for id in [source, target] {
                if seen.insert(id) {
                    let label = names.name_of(id).map(str::to_string);
                    let avg_confidence = label.as_ref().and_then(|l| confidence.get(l)).copied();
                    graph.nodes.push(ViewNode {
                        id: id.clone(),
                        label,
                        avg_confidence,
                    });
                }
            }
            graph.edges.push(ViewEdge {
                source: source.clone(),
                target: target.clone(),
                performance: performance.mean(source, target),
                frequency,
            });
        }

        Self {
            graph,
            start_activities: dfg.start().clone(),
            end_activities: dfg.end().clone(),
            names: names.clone(),
        }
    }
}
