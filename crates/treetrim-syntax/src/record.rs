use serde::{Deserialize, Serialize};

use crate::SyntaxKind;

/// Flat, serializable form of a [`crate::Node`], used to store and replay trees
/// without a live parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub kind: SyntaxKind,
    pub code: String,
    pub start: u32,
    pub end: u32,
    #[serde(default)]
    pub intervals: Vec<[u32; 2]>,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub logprobs: Vec<f64>,
    #[serde(default)]
    pub nll: Option<f64>,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colon_name: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("inverted range {start}..{end}")]
    InvertedRange { start: u32, end: u32 },
    #[error("{tokens} tokens but {logprobs} logprobs")]
    TokenCount { tokens: usize, logprobs: usize },
}
