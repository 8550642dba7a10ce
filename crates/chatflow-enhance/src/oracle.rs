//! Alignment oracle interface
//!
//! The engine does not compute optimal alignments itself. It consumes them
//! through [`AlignmentOracle`], called once per trace variant, possibly from
//! several threads at once.

use crate::error::OracleError;
use chatflow_process::{ProcessModel, TransitionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gap marker used on the wire
pub const GAP: &str = ">>";

/// One alignment step; `None` on a side is a gap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Move {
    /// Activity consumed from the trace
    pub log: Option<String>,
    /// Transition fired in the model
    pub model: Option<TransitionId>,
}

impl Move {
    /// Synchronous move
    #[must_use]
    pub fn sync(activity: impl Into<String>, transition: impl Into<TransitionId>) -> Self {
        Self {
            log: Some(activity.into()),
            model: Some(transition.into()),
        }
    }

    /// Move on log only
    #[must_use]
    pub fn log_only(activity: impl Into<String>) -> Self {
        Self {
            log: Some(activity.into()),
            model: None,
        }
    }

    /// Move on model only
    #[must_use]
    pub fn model_only(transition: impl Into<TransitionId>) -> Self {
        Self {
            log: None,
            model: Some(transition.into()),
        }
    }

    /// Whether the log side is a gap
    #[inline]
    #[must_use]
    pub fn is_model_only(&self) -> bool {
        self.log.is_none()
    }

    /// Whether the model side is a gap
    #[inline]
    #[must_use]
    pub fn is_log_only(&self) -> bool {
        self.model.is_none()
    }
}

fn side(value: String) -> Option<String> {
    (value != GAP).then_some(value)
}

impl From<(String, String)> for Move {
    fn from((log, model): (String, String)) -> Self {
        Self {
            log: side(log),
            model: side(model).map(TransitionId::new),
        }
    }
}

impl From<Move> for (String, String) {
    fn from(m: Move) -> Self {
        (
            m.log.unwrap_or_else(|| GAP.to_string()),
            m.model.map_or_else(|| GAP.to_string(), |t| t.as_str().to_string()),
        )
    }
}

/// Alignment of one trace against a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Ordered moves
    #[serde(alias = "alignment")]
    pub moves: Vec<Move>,
    /// Alignment cost
    #[serde(default)]
    pub cost: f64,
}

impl AlignmentResult {
    /// Create from moves with zero cost
    #[must_use]
    pub fn new(moves: Vec<Move>) -> Self {
        Self { moves, cost: 0.0 }
    }

    /// With cost
    #[inline]
    #[must_use]
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

/// Computes the alignment of a trace against a process model
pub trait AlignmentOracle: Send + Sync {
    /// Align `trace` (activity names) with `model`
    ///
    /// # Errors
    /// Returns error when no alignment could be computed for this trace
    fn align(&self, trace: &[String], model: &ProcessModel) -> Result<AlignmentResult, OracleError>;
}

impl<T: AlignmentOracle + ?Sized> AlignmentOracle for &T {
    fn align(&self, trace: &[String], model: &ProcessModel) -> Result<AlignmentResult, OracleError> {
        (**self).align(trace, model)
    }
}

impl<T: AlignmentOracle + ?Sized> AlignmentOracle for Box<T> {
    fn align(&self, trace: &[String], model: &ProcessModel) -> Result<AlignmentResult, OracleError> {
        (**self).align(trace, model)
    }
}

/// Oracle answering from precomputed alignments keyed by activity sequence
#[derive(Debug, Clone, Default)]
pub struct PrecomputedOracle {
    alignments: BTreeMap<Vec<String>, AlignmentResult>,
}

/// Wire format entry of a precomputed alignment file
#[derive(Debug, Clone, Deserialize)]
struct PrecomputedEntry {
    trace: Vec<String>,
    #[serde(flatten)]
    result: AlignmentResult,
}

impl PrecomputedOracle {
    /// Create empty oracle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the alignment of a trace
    pub fn insert(&mut self, trace: Vec<String>, result: AlignmentResult) {
        self.alignments.insert(trace, result);
    }

    /// With the alignment of a trace
    #[must_use]
    pub fn with_alignment(mut self, trace: Vec<String>, result: AlignmentResult) -> Self {
        self.insert(trace, result);
        self
    }

    /// Parse `[{ "trace": [..], "alignment": [[log, model], ..], "cost": n }]`
    ///
    /// # Errors
    /// Returns error on invalid JSON
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        let entries: Vec<PrecomputedEntry> = serde_json::from_reader(reader)?;
        Ok(entries
            .into_iter()
            .fold(Self::new(), |oracle, e| oracle.with_alignment(e.trace, e.result)))
    }

    /// Number of known traces
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.alignments.len()
    }

    /// Whether no trace is known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alignments.is_empty()
    }
}

impl AlignmentOracle for PrecomputedOracle {
    fn align(&self, trace: &[String], _model: &ProcessModel) -> Result<AlignmentResult, OracleError> {
        self.alignments
            .get(trace)
            .cloned()
            .ok_or_else(|| OracleError::unknown_trace(trace))
    }
}

/// Oracle that pairs each activity with the visible transition carrying the
/// same label (lowest id), and emits a log move when there is none
///
/// No model moves are produced, so skipped model parts are not reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelMatchOracle;

impl AlignmentOracle for LabelMatchOracle {
    fn align(&self, trace: &[String], model: &ProcessModel) -> Result<AlignmentResult, OracleError> {
        let mut cost = 0.0;
        let moves = trace
            .iter()
            .map(|activity| {
                let transition = model
                    .net()
                    .transitions()
                    .values()
                    .find(|t| t.label.as_deref() == Some(activity.as_str()));
                match transition {
                    Some(t) => Move::sync(activity.clone(), t.id.clone()),
                    None => {
                        cost += 1.0;
                        Move::log_only(activity.clone())
                    }
                }
            })
            .collect();
        Ok(AlignmentResult::new(moves).with_cost(cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_use_gap_marker_on_the_wire() {
        let moves: Vec<Move> = serde_json::from_str(r#"[["a", "n1"], ["b", ">>"], [">>", "n2"]]"#).unwrap();
        assert_eq!(moves[0], Move::sync("a", TransitionId::from("n1")));
        assert!(moves[1].is_log_only());
        assert!(moves[2].is_model_only());

        let json = serde_json::to_string(&moves[1]).unwrap();
        assert_eq!(json, r#"["b",">>"]"#);
    }

    #[test]
    fn precomputed_entries_parse() {
        let oracle = PrecomputedOracle::from_json_reader(
            r#"[{ "trace": ["a", "b"], "alignment": [["a", "n1"], ["b", "n2"]], "cost": 0 }]"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(oracle.len(), 1);
        let key = vec!["a".to_string(), "b".to_string()];
        assert_eq!(oracle.alignments[&key].moves.len(), 2);
    }
}
