//! Model enhancer
//!
//! Owns one request's mutable model: the DFG, its name map and the edge
//! performance statistics. Each pass synthesizes a fresh process model from
//! the current DFG, aligns every trace variant once, and folds the aligned
//! paths back into the DFG.
//!
//! # Move resolution
//!
//! | move              | node                                          |
//! |-------------------|-----------------------------------------------|
//! | sync              | node bound to the transition                  |
//! | log only (`>>`)   | synthetic id, one per activity name           |
//! | model only        | skipped                                       |
//! | routing τ         | skipped                                       |
//!
//! Synthetic ids are memoized for the lifetime of the enhancer, so repeated
//! passes reuse the node created for an unseen activity.

use crate::config::EnhancerConfig;
use crate::consistency;
use crate::error::{EnhanceError, OracleError};
use crate::ids::{IdSource, UuidIds};
use crate::log::{Case, EventLog, Variant};
use crate::oracle::{AlignmentOracle, AlignmentResult};
use crate::performance::PerformanceMap;
use crate::repair;
use crate::stats::seconds;
use chatflow_graph::{ActivityIdentity, ConversationGraph, NameMap, NodeId};
use chatflow_process::{compile, name_map_for, Dfg, ModelSynthesizer, ProcessModel, SynthesisError};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A variant the oracle could not align
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedVariant {
    /// Activity sequence
    pub activities: Vec<String>,
    /// Number of cases following it
    pub cases: u64,
    /// Oracle error message
    pub error: String,
}

/// Outcome of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Variants folded into the model
    pub variants_aligned: usize,
    /// Variants skipped after an oracle failure
    pub skipped: Vec<SkippedVariant>,
    /// Distinct DFG edges updated
    pub edges_touched: usize,
    /// Node ids created by the pass, in creation order
    pub new_nodes: Vec<NodeId>,
}

impl PassReport {
    /// Whether some variants could not be aligned
    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Mutable model of one enhancement request
#[derive(Debug, Clone, Default)]
pub(crate) struct ModelState {
    pub(crate) dfg: Dfg,
    pub(crate) names: NameMap,
    pub(crate) performance: PerformanceMap,
    new_nodes: BTreeMap<String, NodeId>,
    pub(crate) service_nodes: BTreeMap<(NodeId, String), NodeId>,
}

impl ModelState {
    /// Draw ids until one names no node of the model
    pub(crate) fn fresh_id(&self, ids: &dyn IdSource) -> NodeId {
        loop {
            let id = ids.fresh();
            if !self.names.contains(&id) && !self.dfg.touches(&id) {
                return id;
            }
            tracing::debug!(%id, "synthetic id already in use, drawing again");
        }
    }

    /// Synthetic node for an activity unknown to the model
    fn discovered_node(&mut self, ids: &dyn IdSource, activity: &str, created: &mut Vec<NodeId>) -> NodeId {
        if let Some(id) = self.new_nodes.get(activity) {
            return id.clone();
        }
        let id = self.fresh_id(ids);
        self.names.insert(id.clone(), Some(activity.to_string()));
        self.new_nodes.insert(activity.to_string(), id.clone());
        created.push(id.clone());
        id
    }

    /// Re-derive start/end membership for ids that are new since `before`
    /// and check the model invariants
    pub(crate) fn finish_pass(
        &mut self,
        before: &BTreeSet<NodeId>,
        touched: &BTreeSet<(NodeId, NodeId)>,
    ) -> Result<(), EnhanceError> {
        let fresh: BTreeSet<NodeId> = touched
            .iter()
            .flat_map(|(s, t)| [s, t])
            .filter(|id| !before.contains(*id))
            .cloned()
            .collect();

        let mut introduced = BTreeSet::new();
        for id in fresh {
            if !self.dfg.has_incoming(&id) {
                self.dfg.add_start(id.clone());
                introduced.insert(id.clone());
            }
            if !self.dfg.has_outgoing(&id) {
                self.dfg.add_end(id.clone());
                introduced.insert(id);
            }
        }

        consistency::check(&self.dfg, &self.names, &introduced)?;
        Ok(())
    }

    pub(crate) fn activity_snapshot(&self) -> BTreeSet<NodeId> {
        self.dfg.activities().into_iter().cloned().collect()
    }
}

/// Aligned variants and the model they were aligned against
struct Aligned<'v> {
    model: ProcessModel,
    variants: Vec<(&'v Variant, AlignmentResult)>,
}

/// One resolved alignment step
#[derive(Debug, Clone)]
struct Step {
    node: NodeId,
    log_index: Option<usize>,
}

/// Frequency, performance and repair passes over one (model, log) pair
pub struct Enhancer<O> {
    oracle: O,
    config: EnhancerConfig,
    ids: Box<dyn IdSource>,
    state: ModelState,
}

impl<O: AlignmentOracle> Enhancer<O> {
    /// Enhancer over a compiled DFG and its name map
    #[must_use]
    pub fn new(dfg: Dfg, names: NameMap, oracle: O) -> Self {
        Self {
            oracle,
            config: EnhancerConfig::default(),
            ids: Box::new(UuidIds),
            state: ModelState {
                dfg,
                names,
                ..ModelState::default()
            },
        }
    }

    /// Compile the graph and start from its DFG
    ///
    /// The identity is typically shared through an
    /// [`IdentityCache`](chatflow_graph::IdentityCache); its name map is
    /// copied, never mutated.
    #[must_use]
    pub fn from_graph(graph: &ConversationGraph, identity: &ActivityIdentity, oracle: O) -> Self {
        let dfg = compile(graph);
        let names = name_map_for(&dfg, identity);
        Self::new(dfg, names, oracle)
    }

    /// With configuration
    #[must_use]
    pub fn with_config(mut self, config: EnhancerConfig) -> Self {
        self.config = config;
        self
    }

    /// With id source for synthetic nodes
    #[must_use]
    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Current DFG
    #[inline]
    #[must_use]
    pub fn dfg(&self) -> &Dfg {
        &self.state.dfg
    }

    /// Current name map
    #[inline]
    #[must_use]
    pub fn names(&self) -> &NameMap {
        &self.state.names
    }

    /// Edge duration statistics
    #[inline]
    #[must_use]
    pub fn performance(&self) -> &PerformanceMap {
        &self.state.performance
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Consume into `(dfg, names, performance)`
    #[must_use]
    pub fn into_parts(self) -> (Dfg, NameMap, PerformanceMap) {
        (self.state.dfg, self.state.names, self.state.performance)
    }

    /// Process model of the current DFG
    ///
    /// # Errors
    /// Returns error if the DFG cannot be synthesized
    pub fn process_model(&self) -> Result<ProcessModel, SynthesisError> {
        ModelSynthesizer::new()
            .with_reduction(self.config.reduce_invisibles)
            .synthesize(&self.state.dfg, &self.state.names)
    }

    /// Add each variant's count to the edges along its alignment
    ///
    /// Pass the log through [`EventLog::for_analysis`] first to drop bot
    /// messages.
    ///
    /// # Errors
    /// Returns error if the model cannot be synthesized, no variant can be
    /// aligned, or the pass breaks a model invariant
    pub fn add_edge_frequency(&mut self, log: &EventLog) -> Result<PassReport, EnhanceError> {
        let before = self.state.activity_snapshot();
        let variants = log.variants();
        let (aligned, mut report) = self.align_variants(&variants)?;

        let mut touched = BTreeSet::new();
        if let Some(Aligned { model, variants }) = &aligned {
            for (variant, alignment) in variants {
                let steps = self.resolve(model, alignment, &mut report.new_nodes);
                for pair in steps.windows(2) {
                    let (s, t) = (pair[0].node.clone(), pair[1].node.clone());
                    self.state.dfg.increment(s.clone(), t.clone(), variant.count());
                    touched.insert((s, t));
                }
            }
        }

        self.state.finish_pass(&before, &touched)?;
        report.edges_touched = touched.len();
        tracing::info!(
            variants = report.variants_aligned,
            skipped = report.skipped.len(),
            edges = report.edges_touched,
            new_nodes = report.new_nodes.len(),
            "frequency pass complete"
        );
        Ok(report)
    }

    /// Fold the observed durations of every aligned pair into the edge
    /// statistics
    ///
    /// A sample is the sum of consecutive timestamp differences between the
    /// two events of a pair; a side without a log event or a missing
    /// timestamp contributes 0.
    ///
    /// # Errors
    /// Same conditions as [`Enhancer::add_edge_frequency`]
    pub fn add_edge_performance(&mut self, log: &EventLog) -> Result<PassReport, EnhanceError> {
        let before = self.state.activity_snapshot();
        let variants = log.variants();
        let cases = log.cases();
        let (aligned, mut report) = self.align_variants(&variants)?;
        let mode = self.config.mean_mode;

        let mut touched = BTreeSet::new();
        if let Some(Aligned { model, variants }) = &aligned {
            for (variant, alignment) in variants {
                let steps = self.resolve(model, alignment, &mut report.new_nodes);
                for case in variant.case_ids.iter().filter_map(|id| cases.get(id.as_str())) {
                    for pair in steps.windows(2) {
                        let (s, t) = (pair[0].node.clone(), pair[1].node.clone());
                        let sample = duration_between(case, pair[0].log_index, pair[1].log_index);
                        self.state.performance.record(s.clone(), t.clone(), sample, mode);
                        self.state.dfg.insert_edge(s.clone(), t.clone());
                        touched.insert((s, t));
                    }
                }
            }
        }

        self.state.finish_pass(&before, &touched)?;
        report.edges_touched = touched.len();
        tracing::info!(
            variants = report.variants_aligned,
            skipped = report.skipped.len(),
            edges = report.edges_touched,
            ?mode,
            "performance pass complete"
        );
        Ok(report)
    }

    /// Add the service-call subprocesses recorded in the log
    ///
    /// # Errors
    /// Returns error if the pass breaks a model invariant
    pub fn discover_service_subprocesses(&mut self, log: &EventLog) -> Result<PassReport, EnhanceError> {
        repair::discover_service_subprocesses(&mut self.state, self.ids.as_ref(), log)
    }

    fn align_variants<'v>(&self, variants: &'v [Variant]) -> Result<(Option<Aligned<'v>>, PassReport), EnhanceError> {
        let mut report = PassReport::default();
        if variants.is_empty() {
            return Ok((None, report));
        }

        let model = self.process_model()?;
        let oracle = &self.oracle;
        let results: Vec<Result<AlignmentResult, OracleError>> = if self.config.parallel_alignment {
            variants
                .par_iter()
                .map(|v| oracle.align(&v.activities, &model))
                .collect()
        } else {
            variants.iter().map(|v| oracle.align(&v.activities, &model)).collect()
        };

        let mut aligned = Vec::with_capacity(variants.len());
        let mut last_error = None;
        for (variant, result) in variants.iter().zip(results) {
            match result {
                Ok(alignment) => aligned.push((variant, alignment)),
                Err(err) => {
                    tracing::warn!(
                        trace = ?variant.activities,
                        cases = variant.count(),
                        error = %err,
                        "skipping variant, alignment failed"
                    );
                    report.skipped.push(SkippedVariant {
                        activities: variant.activities.clone(),
                        cases: variant.count(),
                        error: err.to_string(),
                    });
                    last_error = Some(err);
                }
            }
        }

        if aligned.is_empty() {
            if let Some(last) = last_error {
                return Err(EnhanceError::OracleUnavailable {
                    attempted: variants.len(),
                    last,
                });
            }
        }
        report.variants_aligned = aligned.len();
        Ok((
            Some(Aligned {
                model,
                variants: aligned,
            }),
            report,
        ))
    }

    fn resolve(&mut self, model: &ProcessModel, alignment: &AlignmentResult, created: &mut Vec<NodeId>) -> Vec<Step> {
        let mut steps = Vec::with_capacity(alignment.moves.len());
        let mut log_position = 0;

        for m in &alignment.moves {
            let log_index = m.log.as_ref().map(|_| {
                log_position += 1;
                log_position - 1
            });
            let node = match (&m.log, &m.model) {
                (Some(_), Some(transition)) => model.node_for_transition(transition).cloned(),
                (Some(activity), None) => Some(self.state.discovered_node(self.ids.as_ref(), activity, created)),
                (None, _) => None,
            };
            if let Some(node) = node {
                steps.push(Step { node, log_index });
            }
        }
        steps
    }
}

impl<O> std::fmt::Debug for Enhancer<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enhancer")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn duration_between(case: &Case<'_>, from: Option<usize>, to: Option<usize>) -> f64 {
    let (Some(i), Some(j)) = (from, to) else {
        return 0.0;
    };
    (i..j)
        .map(|k| {
            let first = case.events.get(k).and_then(|e| e.timestamp);
            let second = case.events.get(k + 1).and_then(|e| e.timestamp);
            match (first, second) {
                (Some(a), Some(b)) => seconds(b - a),
                _ => 0.0,
            }
        })
        .sum()
}
