//! Synthetic node ids for activities discovered during enhancement

use chatflow_graph::NodeId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh node ids
///
/// An id already naming a model node is discarded and drawn again, so a
/// source must not repeat itself forever.
pub trait IdSource: Send + Sync {
    /// Next unused id
    fn fresh(&self) -> NodeId;
}

/// Random UUID v4 ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn fresh(&self) -> NodeId {
        NodeId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Deterministic `{prefix}{n}` ids, for reproducible output
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    /// Ids `{prefix}0`, `{prefix}1`, ...
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("new_")
    }
}

impl IdSource for SequentialIds {
    fn fresh(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        NodeId::new(format!("{}{n}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_distinct() {
        assert_ne!(UuidIds.fresh(), UuidIds.fresh());
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("s");
        assert_eq!(ids.fresh(), NodeId::from("s0"));
        assert_eq!(ids.fresh(), NodeId::from("s1"));
    }
}
