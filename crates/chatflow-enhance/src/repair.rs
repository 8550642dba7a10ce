//! Service-context repair
//!
//! Bot models omit what happens while the bot talks to an external service.
//! The log marks those events with `in_service_context`. A service request
//! opens an anchor at the node named after it; the following in-context
//! events form a chain of new nodes off the anchor, and the first event
//! outside the context closes the chain back to the anchor:
//!
//! ```text
//! anchor → n1 → n2 → … → anchor
//! ```

use crate::enhancer::{ModelState, PassReport};
use crate::error::EnhanceError;
use crate::ids::IdSource;
use crate::log::{EventLog, EventType};
use chatflow_graph::NodeId;
use std::collections::BTreeSet;

struct OpenChain {
    anchor: NodeId,
    last: NodeId,
}

pub(crate) fn discover_service_subprocesses(
    state: &mut ModelState,
    ids: &dyn IdSource,
    log: &EventLog,
) -> Result<PassReport, EnhanceError> {
    let before = state.activity_snapshot();
    let mut report = PassReport::default();
    let mut touched = BTreeSet::new();

    for case in log.cases().values() {
        let mut chain: Option<OpenChain> = None;

        for event in &case.events {
            if let Some(open) = chain.as_mut() {
                let (source, target) = if event.in_service_context {
                    let node = service_node(state, ids, &open.anchor, &event.activity, &mut report.new_nodes);
                    let source = std::mem::replace(&mut open.last, node.clone());
                    (source, node)
                } else {
                    (open.last.clone(), open.anchor.clone())
                };
                state.dfg.increment(source.clone(), target.clone(), 1);
                touched.insert((source, target));
                if !event.in_service_context {
                    chain = None;
                }
            }

            if event.event_type == EventType::ServiceRequest {
                chain = match state.names.id_by_name(&event.activity) {
                    Some(anchor) => Some(OpenChain {
                        anchor: anchor.clone(),
                        last: anchor.clone(),
                    }),
                    None => {
                        tracing::warn!(
                            case = case.id,
                            activity = %event.activity,
                            "service request has no model node, skipping subprocess"
                        );
                        None
                    }
                };
            }
        }
    }

    state.finish_pass(&before, &touched)?;
    report.edges_touched = touched.len();
    tracing::info!(
        edges = report.edges_touched,
        new_nodes = report.new_nodes.len(),
        "service subprocess discovery complete"
    );
    Ok(report)
}

fn service_node(
    state: &mut ModelState,
    ids: &dyn IdSource,
    anchor: &NodeId,
    activity: &str,
    created: &mut Vec<NodeId>,
) -> NodeId {
    let key = (anchor.clone(), activity.to_string());
    if let Some(id) = state.service_nodes.get(&key) {
        return id.clone();
    }
    let id = state.fresh_id(ids);
    state.names.insert(id.clone(), Some(activity.to_string()));
    state.service_nodes.insert(key, id.clone());
    created.push(id.clone());
    id
}
