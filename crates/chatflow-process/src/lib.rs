//! chatflow Process
//!
//! Process-model derivation for conversation graphs.
//!
//! # Architecture
//!
//! ```text
//! ConversationGraph ─compile→ Dfg ─synthesize→ ProcessModel
//!                                   │
//!                                   ├── NetSynthesizer (place/transition construction)
//!                                   ├── LabelTable     (names → labels, sentinels invisible)
//!                                   └── reduce         (silent routing transitions)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use chatflow_graph::{ActivityIdentity, ConversationGraph};
//! use chatflow_process::{compile, name_map_for, synthesize};
//!
//! let graph = ConversationGraph::from_json_str(&json)?;
//! let identity = ActivityIdentity::resolve(&graph);
//! let dfg = compile(&graph);
//! let names = name_map_for(&dfg, &identity);
//! let model = synthesize(&dfg, &names)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod compile;
pub mod dfg;
pub mod error;
pub mod net;
pub mod reduce;
pub mod synthesis;

pub use compile::{compile, name_map_for};
pub use dfg::{Dfg, DfgEdge};
pub use error::SynthesisError;
pub use net::{Arc, Marking, NetNode, PetriNet, PlaceId, Transition, TransitionId};
pub use reduce::reduce_invisibles;
pub use synthesis::{
    synthesize, DfgNetSynthesizer, LabelTable, ModelSynthesizer, NetSynthesizer, ProcessModel,
    SynthesizedNet, SINK_PLACE, SOURCE_PLACE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
