//! Per-node cost attribution from model token log-probabilities, and the
//! structural containment check used to judge pruned predictions.

mod attribution;
mod completion;
mod consistency;

pub use attribution::{AttributionError, OffsetMap, attribute};
pub use completion::Completion;
pub use consistency::{Verdict, is_subtree, signature};
