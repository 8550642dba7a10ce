//! Post-pass model invariants

use crate::error::ConsistencyError;
use chatflow_graph::{NameMap, NodeId};
use chatflow_process::Dfg;
use std::collections::BTreeSet;

/// Check the model after a pass
///
/// - every DFG endpoint and every start/end activity has a name-map entry
/// - every start/end activity the pass introduced touches a DFG edge
///   (`empty_intent` is exempt)
///
/// # Errors
/// Returns the first violation found
pub fn check(dfg: &Dfg, names: &NameMap, introduced: &BTreeSet<NodeId>) -> Result<(), ConsistencyError> {
    if let Some(orphan) = dfg.edge_nodes().into_iter().find(|id| !names.contains(id)) {
        return Err(ConsistencyError::OrphanNode(orphan.clone()));
    }

    for (set, ids) in [("start", dfg.start()), ("end", dfg.end())] {
        for id in ids {
            if !names.contains(id) {
                return Err(ConsistencyError::UnnamedBoundary { set, id: id.clone() });
            }
            if introduced.contains(id) && !id.is_empty_intent() && !dfg.touches(id) {
                return Err(ConsistencyError::DetachedBoundary { set, id: id.clone() });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn names(ids: &[&str]) -> NameMap {
        ids.iter().map(|n| (id(n), Some((*n).to_string()))).collect()
    }

    #[test]
    fn consistent_model_passes() {
        let mut dfg = Dfg::new();
        dfg.increment(id("a"), id("b"), 1);
        dfg.add_start(id("a"));
        dfg.add_end(id("b"));
        assert_eq!(check(&dfg, &names(&["a", "b"]), &BTreeSet::new()), Ok(()));
    }

    #[test]
    fn orphan_endpoint_is_reported() {
        let mut dfg = Dfg::new();
        dfg.increment(id("a"), id("x"), 1);
        assert_eq!(
            check(&dfg, &names(&["a"]), &BTreeSet::new()),
            Err(ConsistencyError::OrphanNode(id("x")))
        );
    }

    #[test]
    fn detached_new_boundary_is_reported() {
        let mut dfg = Dfg::new();
        dfg.increment(id("a"), id("b"), 1);
        dfg.add_end(id("n"));
        let introduced = BTreeSet::from([id("n")]);
        assert_eq!(
            check(&dfg, &names(&["a", "b", "n"]), &introduced),
            Err(ConsistencyError::DetachedBoundary { set: "end", id: id("n") })
        );
        // pre-existing detached ids are left alone
        assert_eq!(check(&dfg, &names(&["a", "b", "n"]), &BTreeSet::new()), Ok(()));
    }

    #[test]
    fn sentinel_end_is_exempt() {
        let mut dfg = Dfg::new();
        dfg.increment(id("a"), id("b"), 1);
        dfg.add_end(NodeId::empty_intent());
        let mut names = names(&["a", "b"]);
        names.ensure_empty_intent();
        let introduced = BTreeSet::from([NodeId::empty_intent()]);
        assert_eq!(check(&dfg, &names, &introduced), Ok(()));
    }
}
