//! Picking, for a target error rate, the most permissive threshold whose
//! observed coverage is backed by a PAC bound.

use serde::{Deserialize, Serialize};

use crate::Record;
use crate::pac::{PacError, compute_k};

type FxIndexMap<K, V> =
    indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

pub const DEFAULT_DELTA: f64 = 0.1;

/// The part of a [`Record`] that calibration looks at.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "RecordView")]
pub struct Outcome {
    pub max_cost: f64,
    pub contained: bool,
    pub frac_included: f64,
}

#[derive(Deserialize)]
struct RecordView {
    pred_in_target: VerdictView,
    output: OutputView,
}

#[derive(Deserialize)]
struct VerdictView {
    eval: bool,
}

#[derive(Deserialize)]
struct OutputView {
    max_cost: f64,
    frac_included: f64,
}

impl From<RecordView> for Outcome {
    fn from(view: RecordView) -> Self {
        Self {
            max_cost: view.output.max_cost,
            contained: view.pred_in_target.eval,
            frac_included: view.output.frac_included,
        }
    }
}

impl From<&Record> for Outcome {
    fn from(record: &Record) -> Self {
        Self {
            max_cost: record.output.max_cost,
            contained: record.pred_in_target.eval,
            frac_included: record.output.frac_included,
        }
    }
}

/// Aggregate of all outcomes sharing one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdStats {
    pub max_cost: f64,
    /// `exp(-max_cost)`: the probability the budget corresponds to.
    pub tau: f64,
    pub samples: u64,
    /// Percentage of samples whose pruned prediction lies in the target.
    pub coverage: f64,
    pub percent_nodes_removed: f64,
}

/// Groups outcomes by threshold, loosest threshold first.
pub fn aggregate(outcomes: impl IntoIterator<Item = Outcome>) -> Vec<ThresholdStats> {
    let mut groups: FxIndexMap<u64, (u64, u64, f64)> = FxIndexMap::default();
    for outcome in outcomes {
        let (samples, contained, included) = groups.entry(outcome.max_cost.to_bits()).or_default();
        *samples += 1;
        *contained += u64::from(outcome.contained);
        *included += outcome.frac_included;
    }

    let mut stats = groups
        .into_iter()
        .map(|(bits, (samples, contained, included))| {
            let max_cost = f64::from_bits(bits);
            ThresholdStats {
                max_cost,
                tau: (-max_cost).exp(),
                samples,
                coverage: contained as f64 / samples as f64 * 100.0,
                percent_nodes_removed: 100.0 - included / samples as f64 * 100.0,
            }
        })
        .collect::<Vec<_>>();
    stats.sort_by(|a, b| b.max_cost.total_cmp(&a.max_cost));
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationPoint {
    pub epsilon: f64,
    /// Set when a threshold reached its target coverage.
    pub threshold: Option<ThresholdStats>,
    /// Coverage the chosen threshold had to reach.
    pub target_coverage: Option<f64>,
}

/// For every error rate, the loosest threshold whose coverage reaches
/// `100 - k / n * 100`, with `k` from [`compute_k`] over that threshold's
/// sample count. Thresholds with too few samples for a rate are passed over.
pub fn calibrate(
    stats: &[ThresholdStats],
    epsilons: &[f64],
    delta: f64,
) -> Result<Vec<CalibrationPoint>, PacError> {
    let mut points = Vec::with_capacity(epsilons.len());

    for &epsilon in epsilons {
        let mut point = CalibrationPoint { epsilon, threshold: None, target_coverage: None };
        for stat in stats {
            let k = match compute_k(stat.samples, epsilon, delta) {
                Ok(k) => k,
                Err(PacError::TooFewSamples { .. }) => continue,
                Err(error) => return Err(error),
            };
            let target = 100.0 - k as f64 / stat.samples as f64 * 100.0;
            if stat.coverage >= target {
                point.threshold = Some(*stat);
                point.target_coverage = Some(target);
                break;
            }
        }
        points.push(point);
    }

    tracing::debug!(
        thresholds = stats.len(),
        reached = points.iter().filter(|point| point.threshold.is_some()).count(),
        "calibrated"
    );
    Ok(points)
}

/// `count` evenly spaced values from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// The error rates calibration sweeps by default.
pub fn default_epsilons() -> Vec<f64> {
    linspace(0.03, 0.65, 50)
}
