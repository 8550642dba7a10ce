//! Testing utilities for chatflow workspace
//!
//! Shared bot-model builders, scripted oracles and event fixtures.

#![allow(missing_docs)]

use chatflow_enhance::{AlignmentOracle, AlignmentResult, Event, EventType, Move, OracleError};
use chatflow_graph::ConversationGraph;
use chatflow_process::ProcessModel;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fluent builder for bot-model JSON
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    nodes: Map<String, Value>,
    edges: Map<String, Value>,
    next_edge: usize,
}

impl GraphBuilder {
    /// Builder with a bot node `bot` named `bot_name`
    pub fn new(bot_name: &str) -> Self {
        let mut nodes = Map::new();
        nodes.insert(
            "bot".into(),
            json!({ "type": "Bot", "attributes": { "n": attr("Name", bot_name) } }),
        );
        Self {
            nodes,
            edges: Map::new(),
            next_edge: 0,
        }
    }

    pub fn messenger(mut self, id: &str) -> Self {
        self.nodes
            .insert(id.into(), json!({ "type": "Messenger", "attributes": {} }));
        self
    }

    pub fn message(mut self, id: &str, keyword: &str) -> Self {
        self.nodes.insert(
            id.into(),
            json!({ "type": "Incoming Message", "attributes": { "k": attr("Intent Keyword", keyword) } }),
        );
        self
    }

    pub fn unnamed_message(mut self, id: &str) -> Self {
        self.nodes
            .insert(id.into(), json!({ "type": "Incoming Message", "attributes": {} }));
        self
    }

    pub fn action(mut self, id: &str, function: &str) -> Self {
        self.nodes.insert(
            id.into(),
            json!({ "type": "Bot Action", "attributes": { "f": attr("Function Name", function) } }),
        );
        self
    }

    pub fn unnamed_action(mut self, id: &str) -> Self {
        self.nodes
            .insert(id.into(), json!({ "type": "Bot Action", "attributes": {} }));
        self
    }

    pub fn edge(mut self, kind: &str, source: &str, target: &str) -> Self {
        let id = self.edge_id();
        self.edges
            .insert(id, json!({ "type": kind, "source": source, "target": target }));
        self
    }

    pub fn labelled_edge(mut self, kind: &str, source: &str, target: &str, label: &str) -> Self {
        let id = self.edge_id();
        self.edges.insert(
            id,
            json!({ "type": kind, "source": source, "target": target, "label": label }),
        );
        self
    }

    pub fn leads_to(self, source: &str, target: &str) -> Self {
        self.edge("leadsTo", source, target)
    }

    pub fn uses(self, source: &str, target: &str) -> Self {
        self.edge("uses", source, target)
    }

    // Zero-padded so ascending edge id is insertion order.
    fn edge_id(&mut self) -> String {
        self.next_edge += 1;
        format!("e{:04}", self.next_edge)
    }

    pub fn to_json(&self) -> Value {
        json!({ "nodes": self.nodes, "edges": self.edges })
    }

    pub fn build(&self) -> ConversationGraph {
        ConversationGraph::from_json_value(self.to_json()).unwrap()
    }
}

fn attr(name: &str, value: &str) -> Value {
    json!({ "name": name, "value": { "value": value } })
}

/// `m → A(greet) → B(menu) → C(bye)`, with `A -uses-> F(fetchMenu)` interposed
/// before `B`
pub fn sample_bot() -> ConversationGraph {
    GraphBuilder::new("SampleBot")
        .messenger("m")
        .message("A", "greet")
        .message("B", "menu")
        .message("C", "bye")
        .action("F", "fetchMenu")
        .leads_to("m", "A")
        .uses("A", "F")
        .leads_to("A", "B")
        .leads_to("B", "C")
        .build()
}

/// Moves from `(log, model)` pairs, `">>"` marking a gap
pub fn moves(pairs: &[(&str, &str)]) -> Vec<Move> {
    pairs
        .iter()
        .map(|(log, model)| Move::from(((*log).to_string(), (*model).to_string())))
        .collect()
}

/// Activity trace from string slices
pub fn trace(activities: &[&str]) -> Vec<String> {
    activities.iter().map(|a| (*a).to_string()).collect()
}

/// Oracle with scripted answers per trace; unknown traces fail
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    answers: BTreeMap<Vec<String>, Result<AlignmentResult, OracleError>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn align_as(mut self, activities: &[&str], pairs: &[(&str, &str)]) -> Self {
        self.answers
            .insert(trace(activities), Ok(AlignmentResult::new(moves(pairs))));
        self
    }

    pub fn failing(mut self, activities: &[&str]) -> Self {
        self.answers.insert(
            trace(activities),
            Err(OracleError::Failed("scripted failure".into())),
        );
        self
    }

    /// Number of `align` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AlignmentOracle for ScriptedOracle {
    fn align(&self, trace: &[String], _model: &ProcessModel) -> Result<AlignmentResult, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(trace)
            .cloned()
            .unwrap_or_else(|| Err(OracleError::unknown_trace(trace)))
    }
}

/// Fixed base instant plus `secs`
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Timed user-message events of one case
pub fn case_events(case_id: &str, steps: &[(&str, i64)]) -> Vec<Event> {
    steps
        .iter()
        .map(|(activity, secs)| Event::new(case_id, *activity).with_timestamp(at(*secs)))
        .collect()
}

/// Service request event opening a subprocess
pub fn service_request(case_id: &str, activity: &str, secs: i64) -> Event {
    Event::new(case_id, activity)
        .with_type(EventType::ServiceRequest)
        .with_timestamp(at(secs))
}

/// Event inside a service context
pub fn in_service(case_id: &str, activity: &str, secs: i64) -> Event {
    Event::new(case_id, activity)
        .with_service_context(true)
        .with_timestamp(at(secs))
}
