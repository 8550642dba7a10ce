//! Per-edge duration statistics
//!
//! [`MeanMode::Naive`] reproduces the historical pairwise mean
//! `(old + sample) / 2`, which weights recent samples more heavily.
//! [`MeanMode::Weighted`] is the count-weighted running mean.

use chatflow_graph::NodeId;
use chatflow_process::DfgEdge;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// How new duration samples are folded into an edge's mean
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanMode {
    /// `new = (old + sample) / 2`; the first sample is taken as is
    #[default]
    Naive,
    /// `new = old + (sample - old) / n`
    Weighted,
}

/// Running mean of one edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EdgeStats {
    /// Mean duration in seconds
    pub mean: f64,
    /// Number of folded samples
    pub samples: u64,
}

impl EdgeStats {
    /// Fold one sample
    #[allow(clippy::cast_precision_loss)]
    pub fn fold(&mut self, sample: f64, mode: MeanMode) {
        self.mean = match (self.samples, mode) {
            (0, _) => sample,
            (_, MeanMode::Naive) => (self.mean + sample) / 2.0,
            (n, MeanMode::Weighted) => self.mean + (sample - self.mean) / (n + 1) as f64,
        };
        self.samples += 1;
    }
}

/// Edge → duration statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMap {
    edges: BTreeMap<DfgEdge, EdgeStats>,
}

impl PerformanceMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sample into an edge
    pub fn record(&mut self, source: NodeId, target: NodeId, sample: f64, mode: MeanMode) {
        self.edges.entry((source, target)).or_default().fold(sample, mode);
    }

    /// Statistics of an edge
    #[must_use]
    pub fn get(&self, source: &NodeId, target: &NodeId) -> Option<&EdgeStats> {
        self.edges.get(&(source.clone(), target.clone()))
    }

    /// Mean duration of an edge in seconds
    #[must_use]
    pub fn mean(&self, source: &NodeId, target: &NodeId) -> Option<f64> {
        self.get(source, target).map(|s| s.mean)
    }

    /// Iterate in edge order
    pub fn iter(&self) -> impl Iterator<Item = (&DfgEdge, &EdgeStats)> {
        self.edges.iter()
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether no edge has statistics
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Serialize)]
struct StatsWire<'a> {
    source: &'a NodeId,
    target: &'a NodeId,
    mean: f64,
    samples: u64,
}

impl Serialize for PerformanceMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.edges.len()))?;
        for ((source, target), stats) in &self.edges {
            seq.serialize_element(&StatsWire {
                source,
                target,
                mean: stats.mean,
                samples: stats.samples,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn naive_mean_halves_towards_latest() {
        let mut stats = EdgeStats::default();
        for sample in [10.0, 20.0, 40.0] {
            stats.fold(sample, MeanMode::Naive);
        }
        // ((10 + 20) / 2 + 40) / 2
        assert!(close(stats.mean, 27.5));
        assert_eq!(stats.samples, 3);
    }

    #[test]
    fn weighted_mean_is_arithmetic() {
        let mut stats = EdgeStats::default();
        for sample in [10.0, 20.0, 40.0] {
            stats.fold(sample, MeanMode::Weighted);
        }
        assert!(close(stats.mean, 70.0 / 3.0));
    }

    #[test]
    fn first_sample_is_taken_as_is() {
        for mode in [MeanMode::Naive, MeanMode::Weighted] {
            let mut stats = EdgeStats::default();
            stats.fold(0.0, mode);
            assert!(close(stats.mean, 0.0));
            stats.fold(8.0, mode);
            assert!(close(stats.mean, 4.0));
        }
    }

    #[test]
    fn map_records_per_edge() {
        let mut map = PerformanceMap::new();
        map.record(NodeId::from("a"), NodeId::from("b"), 6.0, MeanMode::Weighted);
        map.record(NodeId::from("a"), NodeId::from("b"), 2.0, MeanMode::Weighted);
        assert_eq!(map.mean(&NodeId::from("a"), &NodeId::from("b")), Some(4.0));
        assert_eq!(map.mean(&NodeId::from("b"), &NodeId::from("a")), None);
        assert_eq!(map.len(), 1);
    }
}
