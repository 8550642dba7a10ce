//! Conversation graph → directly-follows graph
//!
//! # Steps
//! 1. Pattern collapse: `A -uses-> Action` plus `A -leadsTo-> Message`
//!    becomes `A → Action → Message`
//! 2. Drop the edges consumed by step 1
//! 3. Register remaining flow edges; messenger targets are start activities
//! 4. Detect end activities, giving isolated start activities a synthetic
//!    `empty_intent` successor
//! 5. Break cycles back into the entry point by redirecting them to
//!    `empty_intent`

use crate::dfg::Dfg;
use chatflow_graph::{ActivityIdentity, ConversationGraph, EdgeId, EdgeKind, NameMap, NodeId, NodeKind};
use std::collections::BTreeSet;

/// Compile a conversation graph into a DFG
///
/// Compiled edges start with count 0. The result only depends on the graph
/// content, never on map iteration order.
#[must_use]
pub fn compile(graph: &ConversationGraph) -> Dfg {
    let mut dfg = Dfg::new();

    let consumed = collapse_action_patterns(graph, &mut dfg);
    register_flow_edges(graph, &consumed, &mut dfg);

    if graph.messenger_ids().next().is_none() {
        tracing::warn!(
            bot = graph.bot_name(),
            "bot model has no messenger node, no start activities"
        );
    }

    detect_end_activities(graph, &mut dfg);
    break_entry_cycles(&mut dfg);

    tracing::debug!(
        bot = graph.bot_name(),
        edges = dfg.len(),
        start = dfg.start().len(),
        end = dfg.end().len(),
        "compiled dfg"
    );
    dfg
}

/// Name map for a compiled DFG: the resolved names plus the `empty_intent`
/// sentinel when the compiler introduced it
#[must_use]
pub fn name_map_for(dfg: &Dfg, identity: &ActivityIdentity) -> NameMap {
    let mut names = identity.names().clone();
    if dfg.activities().iter().any(|id| id.is_empty_intent()) {
        names.ensure_empty_intent();
    }
    names
}

fn collapse_action_patterns(graph: &ConversationGraph, dfg: &mut Dfg) -> BTreeSet<EdgeId> {
    let mut consumed = BTreeSet::new();

    for (uses_id, uses) in graph.edges() {
        if uses.kind != EdgeKind::Uses || graph.kind_of(&uses.target) != Some(&NodeKind::BotAction) {
            continue;
        }
        consumed.insert(uses_id.clone());

        let action = &uses.target;
        match graph.kind_of(&uses.source) {
            Some(NodeKind::Messenger) => dfg.add_start(action.clone()),
            Some(kind) if kind.is_activity() => dfg.insert_edge(uses.source.clone(), action.clone()),
            _ => {}
        }

        for (leads_id, leads) in graph.outgoing_edges(&uses.source) {
            if leads.kind == EdgeKind::LeadsTo
                && graph.kind_of(&leads.target) == Some(&NodeKind::IncomingMessage)
            {
                dfg.insert_edge(action.clone(), leads.target.clone());
                consumed.insert(leads_id.clone());
            }
        }
    }

    consumed
}

fn register_flow_edges(graph: &ConversationGraph, consumed: &BTreeSet<EdgeId>, dfg: &mut Dfg) {
    for (edge_id, edge) in graph.edges() {
        if consumed.contains(edge_id) || !edge.kind.is_flow() {
            continue;
        }
        let (Some(source), Some(target)) = (graph.kind_of(&edge.source), graph.kind_of(&edge.target))
        else {
            continue;
        };

        if *source == NodeKind::Messenger {
            dfg.add_start(edge.target.clone());
        } else if source.is_activity() && target.is_activity() {
            dfg.insert_edge(edge.source.clone(), edge.target.clone());
        }
    }
}

// A node ends the conversation when nothing follows it except a jump back
// to an entry point.
fn detect_end_activities(graph: &ConversationGraph, dfg: &mut Dfg) {
    for (id, node) in graph.nodes() {
        if !node.kind.is_activity() {
            continue;
        }
        let continues = dfg.successors(id).any(|next| !dfg.start().contains(next));
        if continues {
            continue;
        }

        if dfg.start().contains(id) && !dfg.touches(id) {
            dfg.insert_edge(id.clone(), NodeId::empty_intent());
            dfg.add_end(NodeId::empty_intent());
        } else {
            dfg.add_end(id.clone());
        }
    }
}

fn break_entry_cycles(dfg: &mut Dfg) {
    let back_edges: Vec<(NodeId, NodeId)> = dfg
        .edges()
        .keys()
        .filter(|(source, target)| dfg.start().contains(target) && dfg.end().contains(source))
        .cloned()
        .collect();

    for (source, target) in back_edges {
        tracing::debug!(%source, %target, "redirecting entry cycle to empty_intent");
        dfg.remove_edge(&source, &target);
        dfg.insert_edge(source, NodeId::empty_intent());
        dfg.add_end(NodeId::empty_intent());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn bot() -> Value {
        json!({ "type": "Bot", "attributes": { "n": { "name": "Name", "value": { "value": "Bot" } } } })
    }

    fn message(keyword: &str) -> Value {
        json!({ "type": "Incoming Message", "attributes": {
            "k": { "name": "Intent Keyword", "value": { "value": keyword } } } })
    }

    fn action(function: &str) -> Value {
        json!({ "type": "Bot Action", "attributes": {
            "f": { "name": "Function Name", "value": { "value": function } } } })
    }

    fn edge(kind: &str, source: &str, target: &str) -> Value {
        json!({ "type": kind, "source": source, "target": target })
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn sequential_path() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} },
                       "A": message("a"), "B": message("b") },
            "edges": { "e1": edge("leadsTo", "m", "A"), "e2": edge("leadsTo", "A", "B") }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert_eq!(dfg.start(), &BTreeSet::from([id("A")]));
        assert_eq!(dfg.end(), &BTreeSet::from([id("B")]));
        assert_eq!(dfg.edges().len(), 1);
        assert_eq!(dfg.count(&id("A"), &id("B")), Some(0));
    }

    #[test]
    fn single_node_gets_empty_intent_successor() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} }, "A": message("a") },
            "edges": { "e1": edge("leadsTo", "m", "A") }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert_eq!(dfg.start(), &BTreeSet::from([id("A")]));
        assert_eq!(dfg.end(), &BTreeSet::from([NodeId::empty_intent()]));
        assert_eq!(dfg.edges().len(), 1);
        assert_eq!(dfg.count(&id("A"), &NodeId::empty_intent()), Some(0));
    }

    #[test]
    fn action_is_interposed_between_messages() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} },
                       "A": message("a"), "F": action("fetch"), "B": message("b") },
            "edges": {
                "e1": edge("leadsTo", "m", "A"),
                "e2": edge("uses", "A", "F"),
                "e3": edge("leadsTo", "A", "B")
            }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert!(dfg.contains_edge(&id("A"), &id("F")));
        assert!(dfg.contains_edge(&id("F"), &id("B")));
        assert!(!dfg.contains_edge(&id("A"), &id("B")));
        assert_eq!(dfg.end(), &BTreeSet::from([id("B")]));
    }

    #[test]
    fn messenger_using_action_makes_it_start() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} },
                       "F": action("welcome"), "A": message("a") },
            "edges": { "e1": edge("uses", "m", "F"), "e2": edge("leadsTo", "m", "A") }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert_eq!(dfg.start(), &BTreeSet::from([id("F")]));
        assert!(dfg.contains_edge(&id("F"), &id("A")));
    }

    #[test]
    fn loop_back_to_entry_is_redirected() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} },
                       "S": message("start"), "A": message("a"), "E": message("e") },
            "edges": {
                "e1": edge("leadsTo", "m", "S"),
                "e2": edge("leadsTo", "S", "A"),
                "e3": edge("leadsTo", "A", "E"),
                "e4": edge("leadsTo", "E", "S")
            }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert!(!dfg.contains_edge(&id("E"), &id("S")));
        assert!(dfg.contains_edge(&id("E"), &NodeId::empty_intent()));
        assert!(dfg.end().contains(&NodeId::empty_intent()));
        assert!(dfg.contains_edge(&id("S"), &id("A")));
    }

    #[test]
    fn edge_between_two_entry_points_is_redirected() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} },
                       "A": message("a"), "B": message("b") },
            "edges": {
                "e1": edge("leadsTo", "m", "A"),
                "e2": edge("leadsTo", "m", "B"),
                "e3": edge("leadsTo", "A", "B")
            }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert_eq!(dfg.start(), &BTreeSet::from([id("A"), id("B")]));
        assert!(!dfg.contains_edge(&id("A"), &id("B")));
        assert!(dfg.contains_edge(&id("A"), &NodeId::empty_intent()));
        assert_eq!(
            dfg.end(),
            &BTreeSet::from([id("A"), id("B"), NodeId::empty_intent()])
        );
        assert_eq!(dfg.edges().len(), 1);
    }

    #[test]
    fn non_flow_edges_are_ignored() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} },
                       "A": message("a"), "B": message("b") },
            "edges": {
                "e1": edge("leadsTo", "m", "A"),
                "e2": edge("has", "A", "B"),
                "e3": edge("has", "bot", "m")
            }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert!(!dfg.contains_edge(&id("A"), &id("B")));
        assert!(dfg.end().contains(&id("B")));
    }

    #[test]
    fn no_messenger_yields_no_start() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "A": message("a"), "B": message("b") },
            "edges": { "e1": edge("leadsTo", "A", "B") }
        }))
        .unwrap();

        let dfg = compile(&graph);
        assert!(dfg.start().is_empty());
        assert_eq!(dfg.end(), &BTreeSet::from([id("B")]));
    }

    #[test]
    fn name_map_registers_sentinel() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot(), "m": { "type": "Messenger", "attributes": {} }, "A": message("a") },
            "edges": { "e1": edge("leadsTo", "m", "A") }
        }))
        .unwrap();

        let dfg = compile(&graph);
        let names = name_map_for(&dfg, &ActivityIdentity::resolve(&graph));
        assert_eq!(names.name_of(&NodeId::empty_intent()), Some("empty_intent"));
        assert_eq!(names.name_of(&id("A")), Some("a"));
    }
}
