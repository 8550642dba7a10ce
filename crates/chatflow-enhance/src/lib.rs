//! chatflow Enhance
//!
//! Folds production event logs back into conversation process models.
//!
//! # Architecture
//!
//! ```text
//!  EventLog ──variants──┐
//!                       ▼
//!  Dfg + NameMap ──► Enhancer ──synthesize──► ProcessModel ──► AlignmentOracle
//!                       │                                            │
//!                       ◄──────────────── alignments ────────────────┘
//!                       │
//!                       ├── add_edge_frequency
//!                       ├── add_edge_performance
//!                       └── discover_service_subprocesses
//!                       ▼
//!               EnhancedModelView
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use chatflow_enhance::{Enhancer, EventLog, PrecomputedOracle};
//!
//! let log = EventLog::from_json_reader(file)?.for_analysis();
//! let mut enhancer = Enhancer::from_graph(&graph, &identity, oracle);
//! enhancer.add_edge_frequency(&log)?;
//! enhancer.add_edge_performance(&log)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod consistency;
pub mod enhancer;
pub mod error;
pub mod ids;
pub mod log;
pub mod oracle;
pub mod performance;
mod repair;
pub mod report;
pub mod stats;

pub use config::{CacheConfig, ChatflowConfig, EnhancerConfig};
pub use enhancer::{Enhancer, PassReport, SkippedVariant};
pub use error::{ConfigError, ConsistencyError, EnhanceError, LogError, OracleError};
pub use ids::{IdSource, SequentialIds, UuidIds};
pub use log::{Case, Event, EventLog, EventType, Lifecycle, Variant};
pub use oracle::{AlignmentOracle, AlignmentResult, LabelMatchOracle, Move, PrecomputedOracle, GAP};
pub use performance::{EdgeStats, MeanMode, PerformanceMap};
pub use report::{EnhancedModelView, ViewEdge, ViewGraph, ViewNode};
pub use stats::{CaseSummary, LogStatistics};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
