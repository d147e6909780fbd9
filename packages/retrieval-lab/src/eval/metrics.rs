//! Recall, precision and reciprocal rank at cutoffs.
//!
//! Each function scores the first `k` predictions against the ground
//! truth. Reported values are rounded to 3 decimal places.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::config::Cutoffs;

/// The scored metrics, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Mrr,
    Recall,
    Precision,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Mrr, Metric::Recall, Metric::Precision];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Mrr => "mrr",
            Metric::Recall => "recall",
            Metric::Precision => "precision",
        }
    }

    /// Score `predictions[..k]` against `truth`, unrounded.
    pub fn compute(&self, predictions: &[String], truth: &[String], k: usize) -> f64 {
        let head = &predictions[..k.min(predictions.len())];
        match self {
            Metric::Mrr => reciprocal_rank(head, truth),
            Metric::Recall => recall(head, truth),
            Metric::Precision => precision(head, truth),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraction of ground-truth ids found in `predictions`; 0 for empty truth.
pub fn recall(predictions: &[String], truth: &[String]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let found = truth.iter().filter(|id| predictions.contains(id)).count();
    found as f64 / truth.len() as f64
}

/// Fraction of `predictions` that are relevant; 0 when nothing is relevant.
pub fn precision(predictions: &[String], truth: &[String]) -> f64 {
    let correct = predictions.iter().filter(|id| truth.contains(id)).count();
    if correct == 0 {
        return 0.0;
    }
    correct as f64 / predictions.len() as f64
}

/// `1 / (1 + position)` of the first relevant prediction, else 0.
pub fn reciprocal_rank(predictions: &[String], truth: &[String]) -> f64 {
    predictions
        .iter()
        .position(|id| truth.contains(id))
        .map_or(0.0, |index| 1.0 / (index as f64 + 1.0))
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// A `"{metric}@{k}"` report key. Orders by metric, then cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub metric: Metric,
    pub k: usize,
}

impl MetricKey {
    pub fn new(metric: Metric, k: usize) -> Self {
        Self { metric, k }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.metric, self.k)
    }
}

impl FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, k) = s
            .split_once('@')
            .ok_or_else(|| format!("missing '@' in metric key {:?}", s))?;
        let metric = Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| format!("unknown metric {:?}", name))?;
        let k = k
            .parse()
            .map_err(|e| format!("bad cutoff in {:?}: {}", s, e))?;
        Ok(Self { metric, k })
    }
}

impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MetricKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Rounded scores keyed by `"{metric}@{k}"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricReport(BTreeMap<MetricKey, f64>);

impl MetricReport {
    pub fn get(&self, metric: Metric, k: usize) -> Option<f64> {
        self.0.get(&MetricKey::new(metric, k)).copied()
    }

    /// Look up a score by its `"{metric}@{k}"` name.
    pub fn by_name(&self, key: &str) -> Option<f64> {
        key.parse::<MetricKey>().ok().and_then(|k| self.0.get(&k).copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricKey, &f64)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Per-key mean across `reports`, rounded.
    ///
    /// A key missing from some reports is averaged over the reports that
    /// have it.
    pub fn mean<'a>(reports: impl IntoIterator<Item = &'a MetricReport>) -> MetricReport {
        let mut sums: BTreeMap<MetricKey, (f64, usize)> = BTreeMap::new();
        for report in reports {
            for (key, value) in report.iter() {
                let entry = sums.entry(*key).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        MetricReport(
            sums.into_iter()
                .map(|(key, (sum, n))| (key, round3(sum / n as f64)))
                .collect(),
        )
    }
}

impl FromIterator<(MetricKey, f64)> for MetricReport {
    fn from_iter<I: IntoIterator<Item = (MetricKey, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Score one ranked prediction list at every cutoff.
pub fn score(predictions: &[String], truth: &[String], cutoffs: &Cutoffs) -> MetricReport {
    Metric::ALL
        .into_iter()
        .flat_map(|metric| {
            cutoffs.as_slice().iter().map(move |&k| {
                (
                    MetricKey::new(metric, k),
                    round3(metric.compute(predictions, truth, k)),
                )
            })
        })
        .collect()
}
