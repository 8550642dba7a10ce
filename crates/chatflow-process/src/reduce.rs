//! Invisible-transition reduction
//!
//! Fuses the places around a silent routing transition when the transition
//! is the only way out of its input place and the only way into its output
//! place. Transitions bound to a DFG node are never removed, even when they
//! are invisible.

use crate::net::{Marking, PetriNet, PlaceId, TransitionId};
use chatflow_graph::NodeId;
use std::collections::BTreeMap;

/// Reduce silent routing transitions to a fixpoint, returning how many were
/// removed. Tokens on a fused place move to the surviving place.
pub fn reduce_invisibles(
    net: &mut PetriNet,
    bindings: &BTreeMap<TransitionId, NodeId>,
    initial_marking: &mut Marking,
    final_marking: &mut Marking,
) -> usize {
    let mut removed = 0;
    while let Some((tau, input, output)) = next_candidate(net, bindings, initial_marking, final_marking) {
        net.remove_transition(&tau);
        net.merge_place(&output, &input);
        transfer(initial_marking, &output, &input);
        transfer(final_marking, &output, &input);
        tracing::trace!(transition = %tau, into = %input, from = %output, "fused silent transition");
        removed += 1;
    }
    removed
}

fn next_candidate(
    net: &PetriNet,
    bindings: &BTreeMap<TransitionId, NodeId>,
    initial_marking: &Marking,
    final_marking: &Marking,
) -> Option<(TransitionId, PlaceId, PlaceId)> {
    net.transitions()
        .values()
        .filter(|t| t.is_invisible() && !bindings.contains_key(&t.id))
        .find_map(|t| {
            let preset = net.preset(&t.id);
            let postset = net.postset(&t.id);
            let (&[input], &[output]) = (preset.as_slice(), postset.as_slice()) else {
                return None;
            };
            let fusable = input != output
                && net.consumers(input) == [&t.id]
                && net.producers(output) == [&t.id]
                && !(initial_marking.contains(input) && final_marking.contains(output));
            fusable.then(|| (t.id.clone(), input.clone(), output.clone()))
        })
}

fn transfer(marking: &mut Marking, from: &PlaceId, to: &PlaceId) {
    if let Some(tokens) = marking.take(from) {
        marking.add(to.clone(), tokens);
    }
}
