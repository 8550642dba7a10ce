//! Error types for conversation-graph construction
//!
//! Every variant that concerns a specific element carries its id so the
//! offending part of the bot model can be located.

use crate::model::{EdgeId, NodeId};

/// Errors raised while building a [`ConversationGraph`](crate::ConversationGraph)
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    /// Required top-level section (`nodes` or `edges`) is absent
    #[error("invalid bot model: missing '{0}' section")]
    MissingSection(&'static str),

    /// Input is not valid bot-model JSON
    #[error("invalid bot model json: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading the bot model
    #[error("io error reading bot model: {0}")]
    Io(#[from] std::io::Error),

    /// No node of type `Bot`
    #[error("no bot node found in bot model")]
    MissingBot,

    /// More than one node of type `Bot`
    #[error("multiple bot nodes found: {first} and {second}")]
    MultipleBots {
        /// First bot node id (ascending order)
        first: NodeId,
        /// Second bot node id
        second: NodeId,
    },

    /// Bot node lacks its `Name` attribute
    #[error("bot name not found on bot node {0}")]
    MissingBotName(NodeId),

    /// Edge endpoint refers to a node that does not exist
    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge {
        /// Offending edge
        edge: EdgeId,
        /// Missing endpoint
        node: NodeId,
    },

    /// Graph content could not be fingerprinted
    #[error("cannot fingerprint bot model: {0}")]
    Fingerprint(#[from] FingerprintError),
}

/// Errors that can occur when working with fingerprints
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Invalid fingerprint length
    #[error("invalid fingerprint length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Content could not be encoded for hashing
    #[error("fingerprint encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
