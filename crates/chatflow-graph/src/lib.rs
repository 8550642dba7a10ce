//! chatflow Graph
//!
//! Typed model of chatbot conversation designs and the activity identity
//! derived from them.
//!
//! # Architecture
//!
//! ```text
//! bot-model JSON → ConversationGraph → ActivityIdentity (names, states)
//!                        │                    ↑
//!                        └── Fingerprint ──→ IdentityCache
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use chatflow_graph::{ConversationGraph, IdentityCache};
//!
//! let graph = ConversationGraph::from_json_str(&json)?;
//! let cache = IdentityCache::default();
//! let identity = cache.get_or_resolve(&graph);
//! println!("{} activities", identity.names().len());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod attribute;
pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod names;
pub mod resolver;

pub use attribute::{Attribute, AttributeName};
pub use cache::{CacheStats, IdentityCache};
pub use error::{ConstructionError, FingerprintError};
pub use fingerprint::Fingerprint;
pub use model::{
    is_sentinel, ConversationGraph, Edge, EdgeId, EdgeKind, Node, NodeId, NodeKind, EMPTY_ACTIVITY,
    EMPTY_INTENT,
};
pub use names::NameMap;
pub use resolver::{resolve, resolve_state, ActivityIdentity};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
