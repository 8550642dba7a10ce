//! Error types for the enhancement engine
//!
//! - [`OracleError`]: one alignment failed (recoverable per variant)
//! - [`ConsistencyError`]: a pass broke a model invariant (internal defect)
//! - [`EnhanceError`]: everything a pass can surface to its caller

use chatflow_graph::{ConstructionError, NodeId};
use chatflow_process::SynthesisError;
use std::path::PathBuf;

/// Alignment oracle failure for one trace
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    /// No alignment is known for the trace
    #[error("no alignment available for trace [{0}]")]
    UnknownTrace(String),

    /// Alignment computation failed
    #[error("alignment failed: {0}")]
    Failed(String),

    /// Oracle returned an alignment that does not fit the trace
    #[error("malformed alignment: {0}")]
    Malformed(String),
}

impl OracleError {
    /// Create unknown-trace error from the trace activities
    pub fn unknown_trace(trace: &[String]) -> Self {
        Self::UnknownTrace(trace.join(", "))
    }
}

/// Post-pass invariant violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    /// DFG endpoint without a name-map entry
    #[error("dfg node {0} has no name-map entry")]
    OrphanNode(NodeId),

    /// Start/end activity without a name-map entry
    #[error("{set} activity {id} has no name-map entry")]
    UnnamedBoundary {
        /// `"start"` or `"end"`
        set: &'static str,
        /// Offending id
        id: NodeId,
    },

    /// Start/end activity introduced by a pass that touches no DFG edge
    #[error("{set} activity {id} does not appear in the dfg")]
    DetachedBoundary {
        /// `"start"` or `"end"`
        set: &'static str,
        /// Offending id
        id: NodeId,
    },
}

/// Errors surfaced by an enhancement pass
#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    /// Malformed bot model
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// Base model cannot be turned into a process model
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Every variant failed to align
    #[error("alignment oracle unavailable: all {attempted} variants failed (last error: {last})")]
    OracleUnavailable {
        /// Number of variants attempted
        attempted: usize,
        /// Last oracle error
        last: OracleError,
    },

    /// Internal invariant violation
    #[error("internal consistency error: {0}")]
    Consistency(#[from] ConsistencyError),
}

impl EnhanceError {
    /// Whether the error stems from malformed input rather than an outage or
    /// an internal defect
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Construction(_) | Self::Synthesis(_))
    }

    /// Whether the error is an internal defect
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }
}

/// Errors while reading an event log
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Input is not a valid event-log document
    #[error("invalid event log json: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading the log
    #[error("io error reading event log: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let user = EnhanceError::from(SynthesisError::NoStartActivities);
        assert!(user.is_user_error());
        assert!(!user.is_internal());

        let internal = EnhanceError::from(ConsistencyError::OrphanNode(NodeId::from("x")));
        assert!(internal.is_internal());
        assert!(!internal.is_user_error());

        let outage = EnhanceError::OracleUnavailable {
            attempted: 2,
            last: OracleError::Failed("timeout".into()),
        };
        assert!(!outage.is_user_error());
        assert!(!outage.is_internal());
        assert!(outage.to_string().contains("all 2 variants"));
    }

    #[test]
    fn unknown_trace_lists_activities() {
        let err = OracleError::unknown_trace(&["greet".to_string(), "bye".to_string()]);
        assert_eq!(err.to_string(), "no alignment available for trace [greet, bye]");
    }
}
