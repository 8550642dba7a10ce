//! Conversation graph model
//!
//! A bot model is a graph of dialogue nodes (messengers, incoming messages,
//! bot actions, ...) connected by typed edges. [`ConversationGraph`] is the
//! validated, immutable form: it can only be obtained through
//! [`ConversationGraph::new`] or one of the JSON loaders, all of which check
//! the structural invariants.

use crate::attribute::{Attribute, AttributeName};
use crate::error::ConstructionError;
use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create id from any string-like value
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the id as a string slice
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a conversation node (also used for synthetic DFG nodes)
    NodeId
);
string_id!(
    /// Identifier of a conversation edge
    EdgeId
);

/// Sentinel activity name for incoming messages without any intent, and the
/// id of the synthetic end node introduced by the DFG compiler
pub const EMPTY_INTENT: &str = "empty_intent";

/// Sentinel activity name for nodes that are not activities
pub const EMPTY_ACTIVITY: &str = "empty_activity";

/// Whether an activity name is one of the sentinels
#[inline]
#[must_use]
pub fn is_sentinel(name: &str) -> bool {
    name == EMPTY_INTENT || name == EMPTY_ACTIVITY
}

impl NodeId {
    /// Id of the synthetic `empty_intent` end node
    #[inline]
    #[must_use]
    pub fn empty_intent() -> Self {
        Self::from(EMPTY_INTENT)
    }

    /// Whether this is the synthetic `empty_intent` node
    #[inline]
    #[must_use]
    pub fn is_empty_intent(&self) -> bool {
        self.0 == EMPTY_INTENT
    }
}

/// Node type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The bot itself (exactly one per model)
    Bot,
    /// Messenger channel; the conversation entry point
    Messenger,
    /// Message received from the user
    IncomingMessage,
    /// Function executed by the bot
    BotAction,
    /// Any other node type
    Other(String),
}

impl NodeKind {
    /// Wire spelling of the node type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bot => "Bot",
            Self::Messenger => "Messenger",
            Self::IncomingMessage => "Incoming Message",
            Self::BotAction => "Bot Action",
            Self::Other(kind) => kind,
        }
    }

    /// Whether nodes of this kind become DFG activities
    #[inline]
    #[must_use]
    pub fn is_activity(&self) -> bool {
        matches!(self, Self::IncomingMessage | Self::BotAction)
    }
}

impl From<&str> for NodeKind {
    fn from(value: &str) -> Self {
        match value {
            "Bot" => Self::Bot,
            "Messenger" => Self::Messenger,
            "Incoming Message" => Self::IncomingMessage,
            "Bot Action" => Self::BotAction,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for NodeKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Edge type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Conversation flow
    LeadsTo,
    /// Node invokes a bot action
    Uses,
    /// Node generates a message
    Generates,
    /// Containment
    Has,
    /// Any other edge type
    Other(String),
}

impl EdgeKind {
    /// Wire spelling of the edge type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::LeadsTo => "leadsTo",
            Self::Uses => "uses",
            Self::Generates => "generates",
            Self::Has => "has",
            Self::Other(kind) => kind,
        }
    }

    /// Whether edges of this kind express conversation flow
    #[inline]
    #[must_use]
    pub fn is_flow(&self) -> bool {
        matches!(self, Self::LeadsTo | Self::Uses | Self::Generates)
    }
}

impl From<&str> for EdgeKind {
    fn from(value: &str) -> Self {
        match value {
            "leadsTo" => Self::LeadsTo,
            "uses" => Self::Uses,
            "generates" => Self::Generates,
            "has" => Self::Has,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for EdgeKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A conversation node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Node type
    pub kind: NodeKind,
    /// Attributes keyed by attribute id
    pub attributes: BTreeMap<String, Attribute>,
    /// Display label of the node, if any
    pub label: Option<Attribute>,
}

impl Node {
    /// First non-empty value among attributes with the given name
    ///
    /// Attributes are scanned in ascending attribute-id order.
    #[must_use]
    pub fn attribute_text(&self, name: &AttributeName) -> Option<&str> {
        self.attributes
            .values()
            .filter(|a| &a.name == name)
            .find_map(Attribute::text)
    }
}

/// A conversation edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Edge type
    pub kind: EdgeKind,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Edge label (often the intent that triggers the transition)
    pub label: Option<String>,
}

impl Edge {
    /// Non-empty label, if any
    #[inline]
    #[must_use]
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }
}

/// Validated conversation graph
///
/// Nodes and edges live in ordered maps so every traversal is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationGraph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    #[serde(skip)]
    bot_id: NodeId,
    #[serde(skip)]
    bot_name: String,
    #[serde(skip)]
    fingerprint: Fingerprint,
}

impl ConversationGraph {
    /// Build graph, checking structural invariants
    ///
    /// # Errors
    /// - [`ConstructionError::MissingBot`] / [`ConstructionError::MultipleBots`]
    ///   unless exactly one `Bot` node exists
    /// - [`ConstructionError::MissingBotName`] if that node has no `Name`
    /// - [`ConstructionError::DanglingEdge`] if an edge endpoint is unknown
    /// - [`ConstructionError::Fingerprint`] if the content cannot be hashed
    pub fn new(
        nodes: BTreeMap<NodeId, Node>,
        edges: BTreeMap<EdgeId, Edge>,
    ) -> Result<Self, ConstructionError> {
        let mut bots = nodes.iter().filter(|(_, n)| n.kind == NodeKind::Bot);
        let (bot_id, bot) = bots.next().ok_or(ConstructionError::MissingBot)?;
        if let Some((second, _)) = bots.next() {
            return Err(ConstructionError::MultipleBots {
                first: bot_id.clone(),
                second: second.clone(),
            });
        }
        let bot_name = bot
            .attribute_text(&AttributeName::Name)
            .ok_or_else(|| ConstructionError::MissingBotName(bot_id.clone()))?
            .to_string();
        let bot_id = bot_id.clone();

        for (edge_id, edge) in &edges {
            for endpoint in [&edge.source, &edge.target] {
                if !nodes.contains_key(endpoint) {
                    return Err(ConstructionError::DanglingEdge {
                        edge: edge_id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        let fingerprint = Fingerprint::of_content(&nodes, &edges)?;
        tracing::debug!(
            bot = %bot_name,
            nodes = nodes.len(),
            edges = edges.len(),
            fingerprint = %fingerprint.short(),
            "conversation graph constructed"
        );

        Ok(Self {
            nodes,
            edges,
            bot_id,
            bot_name,
            fingerprint,
        })
    }

    /// Parse bot-model JSON text
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the graph is invalid
    pub fn from_json_str(json: &str) -> Result<Self, ConstructionError> {
        let raw: RawGraph = serde_json::from_str(json)?;
        raw.into_graph()
    }

    /// Parse an already-decoded JSON value
    ///
    /// # Errors
    /// Returns error if the value does not describe a valid bot model
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConstructionError> {
        let raw: RawGraph = serde_json::from_value(value)?;
        raw.into_graph()
    }

    /// Parse bot-model JSON from a reader
    ///
    /// # Errors
    /// Returns error on IO failure, malformed JSON, or an invalid graph
    pub fn from_reader(mut reader: impl Read) -> Result<Self, ConstructionError> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    /// All nodes, ascending by id
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    /// All edges, ascending by id
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &BTreeMap<EdgeId, Edge> {
        &self.edges
    }

    /// Look up node
    #[inline]
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Kind of a node, if it exists
    #[inline]
    #[must_use]
    pub fn kind_of(&self, id: &NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    /// Id of the bot node
    #[inline]
    #[must_use]
    pub fn bot_id(&self) -> &NodeId {
        &self.bot_id
    }

    /// Display name of the bot
    #[inline]
    #[must_use]
    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Content fingerprint of nodes and edges
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Messenger nodes, ascending by id
    pub fn messenger_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Messenger)
            .map(|(id, _)| id)
    }

    /// Edges ending at `node`, ascending by edge id
    pub fn incoming_edges<'a>(
        &'a self,
        node: &'a NodeId,
    ) -> impl Iterator<Item = (&'a EdgeId, &'a Edge)> + 'a {
        self.edges.iter().filter(move |(_, e)| &e.target == node)
    }

    /// Edges starting at `node`, ascending by edge id
    pub fn outgoing_edges<'a>(
        &'a self,
        node: &'a NodeId,
    ) -> impl Iterator<Item = (&'a EdgeId, &'a Edge)> + 'a {
        self.edges.iter().filter(move |(_, e)| &e.source == node)
    }
}

// Wire format
//
// { nodes: { [id]: { type, attributes: { [key]: { name, value: { value } } }, label? } },
//   edges: { [id]: { type, source, target, label? } } }

#[derive(Debug, Deserialize)]
struct RawGraph {
    nodes: Option<BTreeMap<String, RawNode>>,
    edges: Option<BTreeMap<String, RawEdge>>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: BTreeMap<String, RawAttribute>,
    #[serde(default)]
    label: Option<RawAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawAttribute {
    name: String,
    #[serde(default)]
    value: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(rename = "type")]
    kind: String,
    source: String,
    target: String,
    #[serde(default)]
    label: Option<RawEdgeLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEdgeLabel {
    Text(String),
    Attribute(RawAttribute),
}

impl RawAttribute {
    fn into_attribute(self) -> Attribute {
        let value = self.value.and_then(|v| Attribute::flatten(&v.value));
        Attribute {
            name: AttributeName::from(self.name.as_str()),
            value,
        }
    }
}

impl RawEdgeLabel {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Attribute(attr) => attr.into_attribute().value,
        }
    }
}

impl RawGraph {
    fn into_graph(self) -> Result<ConversationGraph, ConstructionError> {
        let raw_nodes = self.nodes.ok_or(ConstructionError::MissingSection("nodes"))?;
        let raw_edges = self.edges.ok_or(ConstructionError::MissingSection("edges"))?;

        let nodes = raw_nodes
            .into_iter()
            .map(|(id, raw)| {
                let node = Node {
                    kind: NodeKind::from(raw.kind.as_str()),
                    attributes: raw
                        .attributes
                        .into_iter()
                        .map(|(key, attr)| (key, attr.into_attribute()))
                        .collect(),
                    label: raw.label.map(RawAttribute::into_attribute),
                };
                (NodeId::from(id), node)
            })
            .collect();

        let edges = raw_edges
            .into_iter()
            .map(|(id, raw)| {
                let edge = Edge {
                    kind: EdgeKind::from(raw.kind.as_str()),
                    source: NodeId::from(raw.source),
                    target: NodeId::from(raw.target),
                    label: raw.label.and_then(RawEdgeLabel::into_text),
                };
                (EdgeId::from(id), edge)
            })
            .collect();

        ConversationGraph::new(nodes, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bot_node() -> serde_json::Value {
        json!({
            "type": "Bot",
            "attributes": {
                "a": { "name": "Name", "value": { "value": "MensaBot" } }
            }
        })
    }

    #[test]
    fn parses_minimal_model() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": {
                "bot": bot_node(),
                "m": { "type": "Messenger", "attributes": {} },
                "A": {
                    "type": "Incoming Message",
                    "attributes": {
                        "k": { "name": "Intent Keyword", "value": { "value": "greet" } }
                    }
                }
            },
            "edges": {
                "e1": { "type": "leadsTo", "source": "m", "target": "A" }
            }
        }))
        .unwrap();

        assert_eq!(graph.bot_name(), "MensaBot");
        assert_eq!(graph.bot_id().as_str(), "bot");
        assert_eq!(graph.kind_of(&NodeId::from("A")), Some(&NodeKind::IncomingMessage));
        assert_eq!(graph.messenger_ids().count(), 1);
    }

    #[test]
    fn missing_nodes_section_is_rejected() {
        let err = ConversationGraph::from_json_value(json!({ "edges": {} })).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingSection("nodes")));
    }

    #[test]
    fn empty_model_has_no_bot() {
        let err = ConversationGraph::from_json_value(json!({ "nodes": {}, "edges": {} }))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::MissingBot));
    }

    #[test]
    fn two_bots_are_rejected() {
        let err = ConversationGraph::from_json_value(json!({
            "nodes": { "b1": bot_node(), "b2": bot_node() },
            "edges": {}
        }))
        .unwrap_err();
        assert!(matches!(err, ConstructionError::MultipleBots { .. }));
    }

    #[test]
    fn bot_without_name_is_rejected() {
        let err = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": { "type": "Bot", "attributes": {} } },
            "edges": {}
        }))
        .unwrap_err();
        assert!(matches!(err, ConstructionError::MissingBotName(id) if id.as_str() == "bot"));
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let err = ConversationGraph::from_json_value(json!({
            "nodes": { "bot": bot_node() },
            "edges": { "e1": { "type": "leadsTo", "source": "bot", "target": "ghost" } }
        }))
        .unwrap_err();
        assert!(matches!(err, ConstructionError::DanglingEdge { .. }));
    }

    #[test]
    fn edge_label_accepts_attribute_object() {
        let graph = ConversationGraph::from_json_value(json!({
            "nodes": {
                "bot": bot_node(),
                "m": { "type": "Messenger", "attributes": {} },
                "A": { "type": "Incoming Message", "attributes": {} }
            },
            "edges": {
                "e1": {
                    "type": "leadsTo", "source": "m", "target": "A",
                    "label": { "name": "Intent", "value": { "value": "menu" } }
                }
            }
        }))
        .unwrap();
        let edge = &graph.edges()[&EdgeId::from("e1")];
        assert_eq!(edge.label_text(), Some("menu"));
        assert_eq!(edge.kind, EdgeKind::LeadsTo);
    }

    #[test]
    fn unknown_kinds_are_preserved() {
        assert_eq!(NodeKind::from("Knowledge Base"), NodeKind::Other("Knowledge Base".into()));
        assert_eq!(EdgeKind::from("triggers").as_str(), "triggers");
        assert!(!EdgeKind::Has.is_flow());
        assert!(NodeKind::BotAction.is_activity());
    }
}
