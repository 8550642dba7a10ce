//! DFG → Petri net synthesis
//!
//! Net construction sits behind [`NetSynthesizer`]. [`ModelSynthesizer`]
//! owns the steps around it: name-map checks, label assignment through a
//! [`LabelTable`], invisible reduction and marking validation.
//!
//! # Net layout ([`DfgNetSynthesizer`])
//!
//! ```text
//! source ─τ→ a#in ─[a]→ a#out ─τ→ b#in ─[b]→ b#out ─τ→ sink
//! ```
//!
//! One bound transition per activity, one routing transition per DFG edge
//! and per start/end activity.

use crate::dfg::Dfg;
use crate::error::SynthesisError;
use crate::net::{Marking, PetriNet, PlaceId, Transition, TransitionId};
use crate::reduce::reduce_invisibles;
use chatflow_graph::{NameMap, NodeId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Initial marking place of synthesized nets
pub const SOURCE_PLACE: &str = "source";
/// Final marking place of synthesized nets
pub const SINK_PLACE: &str = "sink";

/// Output of a net synthesizer, before labels are applied
#[derive(Debug, Clone)]
pub struct SynthesizedNet {
    /// The net; bound transitions carry their bare node id as label
    pub net: PetriNet,
    /// Initial marking
    pub initial_marking: Marking,
    /// Final marking
    pub final_marking: Marking,
    /// Transition → DFG node binding
    pub bindings: BTreeMap<TransitionId, NodeId>,
}

/// Builds a sound net with one initial and one final marking place from a DFG
pub trait NetSynthesizer {
    /// Synthesize a net for the DFG
    ///
    /// # Errors
    /// Returns error when the DFG cannot be expressed as a workflow net
    fn synthesize(&self, dfg: &Dfg) -> Result<SynthesizedNet, SynthesisError>;
}

/// Place/transition construction directly from the directly-follows relation
#[derive(Debug, Clone, Copy, Default)]
pub struct DfgNetSynthesizer;

impl DfgNetSynthesizer {
    fn input_place(id: &NodeId) -> PlaceId {
        PlaceId::new(format!("{id}#in"))
    }

    fn output_place(id: &NodeId) -> PlaceId {
        PlaceId::new(format!("{id}#out"))
    }

    fn validate(dfg: &Dfg) -> Result<(), SynthesisError> {
        if dfg.start().is_empty() {
            return Err(SynthesisError::NoStartActivities);
        }
        if dfg.end().is_empty() {
            return Err(SynthesisError::NoEndActivities);
        }
        if let Some(dead) = dfg
            .activities()
            .into_iter()
            .find(|a| !dfg.has_outgoing(a) && !dfg.end().contains(*a))
        {
            return Err(SynthesisError::DeadEnd(dead.clone()));
        }
        Ok(())
    }

    fn route(
        net: &mut PetriNet,
        id: TransitionId,
        from: &PlaceId,
        to: &PlaceId,
    ) -> Result<(), SynthesisError> {
        net.add_transition(Transition { id: id.clone(), label: None })?;
        net.add_input_arc(from, &id)?;
        net.add_output_arc(&id, to)
    }
}

impl NetSynthesizer for DfgNetSynthesizer {
    fn synthesize(&self, dfg: &Dfg) -> Result<SynthesizedNet, SynthesisError> {
        Self::validate(dfg)?;

        let mut net = PetriNet::new();
        let source = PlaceId::from(SOURCE_PLACE);
        let sink = PlaceId::from(SINK_PLACE);
        net.add_place(source.clone())?;
        net.add_place(sink.clone())?;

        let mut bindings = BTreeMap::new();
        for activity in dfg.activities() {
            let transition = TransitionId::new(activity.as_str());
            let (input, output) = (Self::input_place(activity), Self::output_place(activity));
            net.add_place(input.clone())?;
            net.add_place(output.clone())?;
            net.add_transition(Transition {
                id: transition.clone(),
                label: Some(activity.to_string()),
            })?;
            net.add_input_arc(&input, &transition)?;
            net.add_output_arc(&transition, &output)?;
            bindings.insert(transition, activity.clone());
        }

        for start in dfg.start() {
            Self::route(
                &mut net,
                TransitionId::new(format!("tau#start#{start}")),
                &source,
                &Self::input_place(start),
            )?;
        }
        for (source_id, target_id) in dfg.edges().keys() {
            Self::route(
                &mut net,
                TransitionId::new(format!("tau#{source_id}->{target_id}")),
                &Self::output_place(source_id),
                &Self::input_place(target_id),
            )?;
        }
        for end in dfg.end() {
            Self::route(
                &mut net,
                TransitionId::new(format!("tau#end#{end}")),
                &Self::output_place(end),
                &sink,
            )?;
        }

        Ok(SynthesizedNet {
            net,
            initial_marking: Marking::single(source),
            final_marking: Marking::single(sink),
            bindings,
        })
    }
}

/// Transition → label side table resolved from the name map
///
/// Sentinel names and missing names resolve to `None` (invisible).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelTable(BTreeMap<TransitionId, Option<String>>);

impl LabelTable {
    /// Resolve labels for every bound transition
    ///
    /// # Errors
    /// Returns [`SynthesisError::UnknownActivity`] for a bound node without a
    /// name-map entry
    pub fn resolve(
        bindings: &BTreeMap<TransitionId, NodeId>,
        names: &NameMap,
    ) -> Result<Self, SynthesisError> {
        bindings
            .iter()
            .map(|(transition, node)| {
                if !names.contains(node) {
                    return Err(SynthesisError::UnknownActivity(node.clone()));
                }
                Ok((transition.clone(), names.visible_label(node).map(str::to_string)))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }

    /// Write the labels into the net, returning how many transitions were
    /// labelled
    pub fn apply(&self, net: &mut PetriNet) -> usize {
        self.0
            .iter()
            .filter(|(id, label)| net.set_label(id, (*label).clone()))
            .count()
    }

    /// Label of a transition; outer `None` means not in the table
    #[must_use]
    pub fn get(&self, id: &TransitionId) -> Option<Option<&str>> {
        self.0.get(id).map(Option::as_deref)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Labelled, reduced Petri net with markings and its DFG bindings
#[derive(Debug, Clone, Serialize)]
pub struct ProcessModel {
    net: PetriNet,
    initial_marking: Marking,
    final_marking: Marking,
    bindings: BTreeMap<TransitionId, NodeId>,
    labels: LabelTable,
}

impl ProcessModel {
    /// The net
    #[inline]
    #[must_use]
    pub fn net(&self) -> &PetriNet {
        &self.net
    }

    /// Initial marking
    #[inline]
    #[must_use]
    pub fn initial_marking(&self) -> &Marking {
        &self.initial_marking
    }

    /// Final marking
    #[inline]
    #[must_use]
    pub fn final_marking(&self) -> &Marking {
        &self.final_marking
    }

    /// Transition → node bindings
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<TransitionId, NodeId> {
        &self.bindings
    }

    /// Applied label table
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Re-apply the label table to the net
    pub fn relabel(&mut self) -> usize {
        self.labels.apply(&mut self.net)
    }

    /// DFG node a transition stands for
    ///
    /// Bound transitions map through the binding table; routing transitions
    /// map to `None`. Ids unknown to the net (disambiguated copies such as
    /// `n1#2`) fall back to the bound node named by the part before `#`.
    #[must_use]
    pub fn node_for_transition(&self, id: &TransitionId) -> Option<&NodeId> {
        if let Some(node) = self.bindings.get(id) {
            return Some(node);
        }
        if self.net.transition(id).is_some() {
            return None;
        }
        let (stem, _) = id.as_str().split_once('#')?;
        self.bindings.values().find(|node| node.as_str() == stem)
    }

    /// Activities enabled directly from the initial marking
    #[must_use]
    pub fn start_activities(&self) -> BTreeSet<NodeId> {
        self.boundary(true)
    }

    /// Activities that lead directly into the final marking
    #[must_use]
    pub fn end_activities(&self) -> BTreeSet<NodeId> {
        self.boundary(false)
    }

    // Walk routing transitions from the marking places until bound
    // transitions are hit.
    fn boundary(&self, forward: bool) -> BTreeSet<NodeId> {
        let marking = if forward { &self.initial_marking } else { &self.final_marking };
        let mut found = BTreeSet::new();
        let mut seen: BTreeSet<&PlaceId> = marking.places().collect();
        let mut queue: VecDeque<&PlaceId> = seen.iter().copied().collect();

        while let Some(place) = queue.pop_front() {
            let transitions = if forward {
                self.net.consumers(place)
            } else {
                self.net.producers(place)
            };
            for transition in transitions {
                if let Some(node) = self.bindings.get(transition) {
                    found.insert(node.clone());
                    continue;
                }
                let next = if forward {
                    self.net.postset(transition)
                } else {
                    self.net.preset(transition)
                };
                for place in next {
                    if seen.insert(place) {
                        queue.push_back(place);
                    }
                }
            }
        }
        found
    }
}

/// Synthesis pipeline: construction, labelling, reduction, validation
#[derive(Debug, Clone)]
pub struct ModelSynthesizer<S = DfgNetSynthesizer> {
    inner: S,
    reduce_invisibles: bool,
}

impl ModelSynthesizer {
    /// Pipeline over [`DfgNetSynthesizer`] with reduction enabled
    #[must_use]
    pub fn new() -> Self {
        Self::with_synthesizer(DfgNetSynthesizer)
    }
}

impl Default for ModelSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NetSynthesizer> ModelSynthesizer<S> {
    /// Pipeline over a custom net synthesizer
    #[must_use]
    pub fn with_synthesizer(inner: S) -> Self {
        Self {
            inner,
            reduce_invisibles: true,
        }
    }

    /// Enable or disable invisible reduction
    #[must_use]
    pub fn with_reduction(mut self, enabled: bool) -> Self {
        self.reduce_invisibles = enabled;
        self
    }

    /// Build the process model for a DFG
    ///
    /// # Errors
    /// Returns error when an activity has no name, the net cannot be
    /// synthesized, or the reduced net loses its marking places or the path
    /// between them
    pub fn synthesize(&self, dfg: &Dfg, names: &NameMap) -> Result<ProcessModel, SynthesisError> {
        if let Some(unknown) = dfg.activities().into_iter().find(|a| !names.contains(a)) {
            return Err(SynthesisError::UnknownActivity(unknown.clone()));
        }

        let SynthesizedNet {
            mut net,
            mut initial_marking,
            mut final_marking,
            bindings,
        } = self.inner.synthesize(dfg)?;

        let labels = LabelTable::resolve(&bindings, names)?;
        labels.apply(&mut net);

        let reduced = if self.reduce_invisibles {
            reduce_invisibles(&mut net, &bindings, &mut initial_marking, &mut final_marking)
        } else {
            0
        };

        for place in initial_marking.places().chain(final_marking.places()) {
            if !net.places().contains(place) {
                return Err(SynthesisError::DanglingMarking(place.clone()));
            }
        }
        for initial_place in initial_marking.places() {
            if !final_marking.places().any(|p| net.connects(initial_place, p)) {
                let final_place = final_marking
                    .places()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| PlaceId::from(SINK_PLACE));
                return Err(SynthesisError::Disconnected {
                    initial_place: initial_place.clone(),
                    final_place,
                });
            }
        }

        tracing::debug!(
            places = net.places().len(),
            transitions = net.transitions().len(),
            reduced,
            "synthesized process model"
        );

        Ok(ProcessModel {
            net,
            initial_marking,
            final_marking,
            bindings,
            labels,
        })
    }
}

/// Synthesize with the default pipeline
///
/// # Errors
/// See [`ModelSynthesizer::synthesize`]
pub fn synthesize(dfg: &Dfg, names: &NameMap) -> Result<ProcessModel, SynthesisError> {
    ModelSynthesizer::new().synthesize(dfg, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn linear() -> (Dfg, NameMap) {
        let mut dfg = Dfg::new();
        dfg.insert_edge(id("a"), id("b"));
        dfg.insert_edge(id("b"), NodeId::empty_intent());
        dfg.add_start(id("a"));
        dfg.add_end(NodeId::empty_intent());

        let mut names = NameMap::new();
        names.insert(id("a"), Some("greet".into()));
        names.insert(id("b"), None);
        names.ensure_empty_intent();
        (dfg, names)
    }

    #[test]
    fn labels_hide_sentinels_and_missing_names() {
        let (dfg, names) = linear();
        let model = ModelSynthesizer::new().with_reduction(false).synthesize(&dfg, &names).unwrap();

        let net = model.net();
        assert_eq!(net.transition(&TransitionId::from("a")).unwrap().label.as_deref(), Some("greet"));
        assert!(net.transition(&TransitionId::from("b")).unwrap().is_invisible());
        assert!(net.transition(&TransitionId::from("empty_intent")).unwrap().is_invisible());
        assert!(net.transitions().values().all(|t| t.label.as_deref() != Some("empty_intent")));
    }

    #[test]
    fn relabel_is_idempotent() {
        let (dfg, names) = linear();
        let mut model = synthesize(&dfg, &names).unwrap();
        let once = model.net().clone();
        model.relabel();
        model.relabel();
        assert_eq!(model.net(), &once);
    }

    #[test]
    fn empty_start_or_end_is_rejected() {
        let (_, names) = linear();
        let mut dfg = Dfg::new();
        dfg.insert_edge(id("a"), NodeId::empty_intent());
        dfg.add_end(NodeId::empty_intent());
        assert!(matches!(synthesize(&dfg, &names), Err(SynthesisError::NoStartActivities)));

        dfg.add_start(id("a"));
        let mut no_end = Dfg::new();
        no_end.insert_edge(id("a"), id("b"));
        no_end.add_start(id("a"));
        assert!(matches!(synthesize(&no_end, &names), Err(SynthesisError::NoEndActivities)));
        assert!(synthesize(&dfg, &names).is_ok());
    }

    #[test]
    fn dead_end_is_rejected() {
        let (mut dfg, mut names) = linear();
        dfg.insert_edge(id("a"), id("c"));
        names.insert(id("c"), Some("c".into()));
        let err = synthesize(&dfg, &names).unwrap_err();
        assert!(matches!(err, SynthesisError::DeadEnd(ref n) if n == &id("c")));
    }

    #[test]
    fn unknown_activity_is_rejected() {
        let (mut dfg, names) = linear();
        dfg.insert_edge(id("a"), id("ghost"));
        dfg.add_end(id("ghost"));
        let err = synthesize(&dfg, &names).unwrap_err();
        assert!(matches!(err, SynthesisError::UnknownActivity(ref n) if n == &id("ghost")));
    }

    #[test]
    fn start_and_end_survive_reduction() {
        let (dfg, names) = linear();
        for reduce in [false, true] {
            let model = ModelSynthesizer::new().with_reduction(reduce).synthesize(&dfg, &names).unwrap();
            assert_eq!(&model.start_activities(), dfg.start());
            assert_eq!(&model.end_activities(), dfg.end());
        }
    }

    #[test]
    fn reduction_removes_routing_transitions() {
        let (dfg, names) = linear();
        let full = ModelSynthesizer::new().with_reduction(false).synthesize(&dfg, &names).unwrap();
        let reduced = synthesize(&dfg, &names).unwrap();
        assert!(reduced.net().transitions().len() < full.net().transitions().len());
        assert_eq!(reduced.bindings().len(), 3);
        for transition in reduced.bindings().keys() {
            assert!(reduced.net().transition(transition).is_some());
        }
    }

    #[test]
    fn transition_lookup_strips_disambiguation_suffix() {
        let (dfg, names) = linear();
        let model = ModelSynthesizer::new().with_reduction(false).synthesize(&dfg, &names).unwrap();
        assert_eq!(model.node_for_transition(&TransitionId::from("a")), Some(&id("a")));
        assert_eq!(model.node_for_transition(&TransitionId::from("b#2")), Some(&id("b")));
        assert_eq!(model.node_for_transition(&TransitionId::from("tau#start#a")), None);
        assert_eq!(model.node_for_transition(&TransitionId::from("zzz")), None);
    }

    #[test]
    fn cycle_without_exit_is_disconnected() {
        let mut dfg = Dfg::new();
        dfg.insert_edge(id("a"), id("b"));
        dfg.insert_edge(id("b"), id("a"));
        dfg.insert_edge(id("e"), NodeId::empty_intent());
        dfg.add_start(id("a"));
        dfg.add_end(NodeId::empty_intent());
        let names: NameMap = ["a", "b", "e", "empty_intent"]
            .into_iter()
            .map(|n| (id(n), Some(n.to_string())))
            .collect();

        let err = ModelSynthesizer::new().with_reduction(false).synthesize(&dfg, &names).unwrap_err();
        assert!(matches!(err, SynthesisError::Disconnected { .. }));
    }
}
