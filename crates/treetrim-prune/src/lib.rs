//! Selecting which nodes of an attributed tree to keep under a cost budget.
//!
//! Both engines share one notion of a hole: a maximal deleted subtree whose
//! parent is retained. The root is always retained and always charged.

mod exact;
mod greedy;
mod knapsack;
mod model;
mod reconstruct;

use serde::{Deserialize, Serialize};
use treetrim_syntax::Node;

pub use exact::{DEFAULT_SEARCH_LIMIT, ExactOptimizer};
pub use greedy::GreedyOptimizer;
pub use reconstruct::{Reconstruction, reconstruct};

/// Slack allowed when comparing a retained cost against its budget.
pub const COST_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PruneError {
    #[error("thresholds must be sorted in descending order, found {previous} before {next}")]
    UnsortedThresholds { previous: f64, next: f64 },
    #[error("threshold {0} is not a number")]
    InvalidThreshold(f64),
    #[error("search gave up after {limit} expansions")]
    SearchLimitExceeded { limit: u64 },
    #[error("search finished without any admissible selection")]
    Unsolved,
    #[error("node {node} has no registered parent")]
    MissingParent { node: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Check {
    Sat,
    Unsat,
}

/// Outcome of pruning one tree for one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pruning {
    pub max_cost: f64,
    pub check: Check,
    /// Only the kept nodes. `None` when nothing could be selected.
    pub pruned: Option<Node>,
    /// The whole tree with every node's `deleted` flag decided.
    pub annotated: Option<Node>,
    pub error_of_tree: f64,
    pub frac_included: f64,
}

impl Pruning {
    fn unsat(max_cost: f64) -> Self {
        Self {
            max_cost,
            check: Check::Unsat,
            pruned: None,
            annotated: None,
            error_of_tree: 0.0,
            frac_included: 0.0,
        }
    }

    fn from_reconstruction(max_cost: f64, check: Check, reconstruction: Reconstruction) -> Self {
        let frac_included = reconstruction.frac_included();
        Self {
            max_cost,
            check,
            pruned: reconstruction.pruned,
            annotated: Some(reconstruction.annotated),
            error_of_tree: reconstruction.error_of_tree,
            frac_included,
        }
    }

    pub fn is_sat(&self) -> bool {
        self.check == Check::Sat
    }
}

/// Which engine a pipeline prunes with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Exact,
    Greedy,
}

impl std::str::FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "greedy" => Ok(Self::Greedy),
            _ => Err(format!("unknown engine `{s}`, expected `exact` or `greedy`")),
        }
    }
}

/// Rejects NaN thresholds and thresholds that are not sorted loosest first.
pub fn check_thresholds(thresholds: &[f64]) -> Result<(), PruneError> {
    if let Some(&nan) = thresholds.iter().find(|threshold| threshold.is_nan()) {
        return Err(PruneError::InvalidThreshold(nan));
    }
    match thresholds.windows(2).find(|pair| pair[0] < pair[1]) {
        Some(pair) => Err(PruneError::UnsortedThresholds { previous: pair[0], next: pair[1] }),
        None => Ok(()),
    }
}

/// A node's contribution to a budget: its clamped cost, zero when unusable.
pub(crate) fn charge(node: &Node) -> f64 {
    node.cost().unwrap_or(0.0)
}
