//! Error types for process-model synthesis

use crate::net::{PlaceId, TransitionId};
use chatflow_graph::NodeId;

/// The DFG could not be turned into a sound Petri net
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// DFG has no start activity
    #[error("could not build process model: no start activities")]
    NoStartActivities,

    /// DFG has no end activity
    #[error("could not build process model: no end activities")]
    NoEndActivities,

    /// Activity with no outgoing edge that is not an end activity
    #[error("could not build process model: activity {0} has no outgoing edge and is not an end activity")]
    DeadEnd(NodeId),

    /// Activity missing from the name map
    #[error("could not build process model: activity {0} has no name-map entry")]
    UnknownActivity(NodeId),

    /// Place added twice
    #[error("duplicate place: {0}")]
    DuplicatePlace(PlaceId),

    /// Transition added twice
    #[error("duplicate transition: {0}")]
    DuplicateTransition(TransitionId),

    /// Arc refers to an unknown place
    #[error("arc references unknown place: {0}")]
    UnknownPlace(PlaceId),

    /// Arc refers to an unknown transition
    #[error("arc references unknown transition: {0}")]
    UnknownTransition(TransitionId),

    /// Marking place vanished during reduction
    #[error("marking place {0} no longer exists after reduction")]
    DanglingMarking(PlaceId),

    /// Final marking unreachable from the initial marking
    #[error("could not build process model: {final_place} is not reachable from {initial_place}")]
    Disconnected {
        /// Initial marking place
        initial_place: PlaceId,
        /// Final marking place
        final_place: PlaceId,
    },
}

impl SynthesisError {
    /// Node id the error points at, if any
    #[must_use]
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Self::DeadEnd(id) | Self::UnknownActivity(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_ids() {
        let err = SynthesisError::DeadEnd(NodeId::from("n7"));
        assert!(err.to_string().contains("n7"));
        assert_eq!(err.node(), Some(&NodeId::from("n7")));
        assert!(SynthesisError::NoStartActivities.node().is_none());
    }
}
