//! Activity resolution
//!
//! Each activity node gets a canonical name: the intent keyword for incoming
//! messages and the function name for bot actions. Resolution is pure and
//! deterministic; fallbacks scan edges in ascending edge-id order.

use crate::attribute::AttributeName;
use crate::fingerprint::Fingerprint;
use crate::model::{ConversationGraph, Node, NodeId, NodeKind, EMPTY_ACTIVITY, EMPTY_INTENT};
use crate::names::NameMap;
use std::collections::BTreeMap;

/// Canonical activity name of a node
///
/// - `IncomingMessage`: own `Intent Keyword`, else the first non-empty label
///   of an edge targeting the node, else `"empty_intent"`
/// - `BotAction`: the `Function Name` attribute (may be `None`)
/// - anything else: `"empty_activity"`
///
/// Unknown ids resolve to `None`.
#[must_use]
pub fn resolve(node_id: &NodeId, graph: &ConversationGraph) -> Option<String> {
    let node = graph.node(node_id)?;
    match node.kind {
        NodeKind::IncomingMessage => {
            let keyword = node
                .attribute_text(&AttributeName::IntentKeyword)
                .or_else(|| {
                    graph
                        .incoming_edges(node_id)
                        .find_map(|(_, edge)| edge.label_text())
                })
                .unwrap_or(EMPTY_INTENT);
            Some(keyword.to_string())
        }
        NodeKind::BotAction => node
            .attribute_text(&AttributeName::FunctionName)
            .map(str::to_string),
        _ => Some(EMPTY_ACTIVITY.to_string()),
    }
}

/// State label of a node
///
/// Incoming messages use their display label, bot actions their function
/// name. Other kinds have no state.
#[must_use]
pub fn resolve_state(node: &Node) -> Option<String> {
    match node.kind {
        NodeKind::IncomingMessage => node
            .label
            .as_ref()
            .and_then(|l| l.text())
            .map(str::to_string),
        NodeKind::BotAction => node
            .attribute_text(&AttributeName::FunctionName)
            .map(str::to_string),
        _ => None,
    }
}

/// Resolved identity of every activity node in a graph
///
/// Computed once per graph revision and shared read-only (see
/// [`IdentityCache`](crate::IdentityCache)). Consumers that need to extend the
/// name map take a clone via [`ActivityIdentity::names`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityIdentity {
    fingerprint: Fingerprint,
    bot_name: String,
    names: NameMap,
    states: BTreeMap<NodeId, String>,
}

impl ActivityIdentity {
    /// Resolve every activity node of the graph
    #[must_use]
    pub fn resolve(graph: &ConversationGraph) -> Self {
        let mut names = NameMap::new();
        let mut states = BTreeMap::new();

        for (id, node) in graph.nodes() {
            if !node.kind.is_activity() {
                continue;
            }
            names.insert(id.clone(), resolve(id, graph));
            if let Some(state) = resolve_state(node) {
                states.insert(id.clone(), state);
            }
        }

        tracing::debug!(
            bot = graph.bot_name(),
            activities = names.len(),
            states = states.len(),
            "activity identity resolved"
        );

        Self {
            fingerprint: graph.fingerprint(),
            bot_name: graph.bot_name().to_string(),
            names,
            states,
        }
    }

    /// Fingerprint of the graph this identity was resolved from
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Bot display name
    #[inline]
    #[must_use]
    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Id → canonical name map
    #[inline]
    #[must_use]
    pub fn names(&self) -> &NameMap {
        &self.names
    }

    /// Id → state label map
    #[inline]
    #[must_use]
    pub fn states(&self) -> &BTreeMap<NodeId, String> {
        &self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph() -> ConversationGraph {
        ConversationGraph::from_json_value(json!({
            "nodes": {
                "bot": { "type": "Bot", "attributes": {
                    "n": { "name": "Name", "value": { "value": "TestBot" } } } },
                "m": { "type": "Messenger", "attributes": {} },
                "A": { "type": "Incoming Message",
                       "attributes": { "k": { "name": "Intent Keyword", "value": { "value": "greet" } } },
                       "label": { "name": "Name", "value": { "value": "Greeting" } } },
                "B": { "type": "Incoming Message",
                       "attributes": { "k": { "name": "Intent Keyword", "value": { "value": "" } } } },
                "C": { "type": "Incoming Message", "attributes": {} },
                "F": { "type": "Bot Action",
                       "attributes": { "f": { "name": "Function Name", "value": { "value": "fetchMenu" } } } },
                "G": { "type": "Bot Action", "attributes": {} }
            },
            "edges": {
                "e1": { "type": "leadsTo", "source": "m", "target": "A" },
                "e3": { "type": "leadsTo", "source": "A", "target": "B", "label": "second" },
                "e2": { "type": "leadsTo", "source": "m", "target": "B", "label": "first" },
                "e4": { "type": "leadsTo", "source": "A", "target": "C", "label": "" },
                "e5": { "type": "uses", "source": "A", "target": "F" },
                "e6": { "type": "uses", "source": "A", "target": "G" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn intent_keyword_attribute_wins() {
        assert_eq!(resolve(&NodeId::from("A"), &graph()).as_deref(), Some("greet"));
    }

    #[test]
    fn empty_keyword_falls_back_to_lowest_edge_label() {
        assert_eq!(resolve(&NodeId::from("B"), &graph()).as_deref(), Some("first"));
    }

    #[test]
    fn no_keyword_and_no_label_is_empty_intent() {
        assert_eq!(resolve(&NodeId::from("C"), &graph()).as_deref(), Some(EMPTY_INTENT));
    }

    #[test]
    fn bot_action_passes_function_name_through() {
        let g = graph();
        assert_eq!(resolve(&NodeId::from("F"), &g).as_deref(), Some("fetchMenu"));
        assert_eq!(resolve(&NodeId::from("G"), &g), None);
    }

    #[test]
    fn other_nodes_are_empty_activity() {
        assert_eq!(resolve(&NodeId::from("m"), &graph()).as_deref(), Some(EMPTY_ACTIVITY));
        assert_eq!(resolve(&NodeId::from("missing"), &graph()), None);
    }

    #[test]
    fn state_labels() {
        let g = graph();
        assert_eq!(resolve_state(&g.nodes()[&NodeId::from("A")]).as_deref(), Some("Greeting"));
        assert_eq!(resolve_state(&g.nodes()[&NodeId::from("F")]).as_deref(), Some("fetchMenu"));
        assert_eq!(resolve_state(&g.nodes()[&NodeId::from("m")]), None);
    }

    #[test]
    fn identity_covers_activity_nodes_only() {
        let identity = ActivityIdentity::resolve(&graph());
        assert_eq!(identity.bot_name(), "TestBot");
        assert_eq!(identity.names().len(), 5);
        assert!(!identity.names().contains(&NodeId::from("m")));
        assert_eq!(identity.names().get(&NodeId::from("G")), Some(None));
        assert_eq!(identity.states().len(), 2);
    }
}
