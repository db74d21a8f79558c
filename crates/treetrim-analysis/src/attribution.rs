use std::collections::BTreeSet;
use std::ops::Range;

use text_size::TextRange;
use treetrim_syntax::Node;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributionError {
    #[error("{tokens} tokens but {logprobs} log-probabilities")]
    LengthMismatch { tokens: usize, logprobs: usize },
    #[error("token {token} disagrees with the source at offset {offset}: expected {expected:?}, found {found:?}")]
    TokenMismatch { token: usize, offset: usize, expected: char, found: char },
    #[error("token {token} runs past the end of the source")]
    Overrun { token: usize },
    #[error("tokens stop at offset {offset} before the source does")]
    Truncated { offset: usize },
    #[error("interval {range:?} lies outside the source ({len} bytes)")]
    OutOfRange { range: TextRange, len: usize },
}

/// For every byte of the source, the index of the model token that produced
/// it. Whitespace is ignored on both sides, so it maps to no token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetMap {
    token_at: Vec<Option<u32>>,
}

impl OffsetMap {
    pub fn new(source: &str, tokens: &[String]) -> Result<Self, AttributionError> {
        let mut token_at = vec![None; source.len()];
        let mut chars = source.char_indices().filter(|(_, c)| !c.is_whitespace());

        for (index, token) in tokens.iter().enumerate() {
            for found in token.chars().filter(|c| !c.is_whitespace()) {
                let Some((offset, expected)) = chars.next() else {
                    return Err(AttributionError::Overrun { token: index });
                };
                if expected != found {
                    return Err(AttributionError::TokenMismatch {
                        token: index,
                        offset,
                        expected,
                        found,
                    });
                }
                token_at[offset..offset + expected.len_utf8()].fill(Some(index as u32));
            }
        }

        if let Some((offset, _)) = chars.next() {
            return Err(AttributionError::Truncated { offset });
        }

        Ok(Self { token_at })
    }

    pub fn token_at(&self, offset: usize) -> Option<usize> {
        self.token_at.get(offset).copied().flatten().map(|index| index as usize)
    }

    /// Distinct token indices touched by `range`, in ascending order.
    pub fn tokens_in(&self, range: TextRange) -> Result<BTreeSet<usize>, AttributionError> {
        let bytes = self
            .token_at
            .get(Range::<usize>::from(range))
            .ok_or(AttributionError::OutOfRange { range, len: self.token_at.len() })?;
        Ok(bytes.iter().flatten().map(|&index| index as usize).collect())
    }
}

/// Annotates every node with the tokens its own intervals touch and their
/// negative log-likelihood. Children are charged separately, so a token that
/// straddles a gap and a child counts for both.
pub fn attribute(
    root: &mut Node,
    source: &str,
    tokens: &[String],
    logprobs: &[f64],
) -> Result<(), AttributionError> {
    if tokens.len() != logprobs.len() {
        return Err(AttributionError::LengthMismatch {
            tokens: tokens.len(),
            logprobs: logprobs.len(),
        });
    }

    let map = OffsetMap::new(source, tokens)?;
    let mut result = Ok(());

    root.for_each_mut(&mut |node| {
        if result.is_err() {
            return;
        }

        let mut touched = BTreeSet::new();
        for &interval in &node.intervals {
            match map.tokens_in(interval) {
                Ok(indices) => touched.extend(indices),
                Err(error) => {
                    result = Err(error);
                    return;
                }
            }
        }

        node.tokens = touched.iter().map(|&index| tokens[index].clone()).collect();
        node.logprobs = touched.iter().map(|&index| logprobs[index]).collect();
        node.nll = Some(node.logprobs.iter().fold(0.0, |nll, logprob| nll - logprob));
    });

    if result.is_ok() {
        tracing::debug!(nodes = root.total_nodes(), tokens = tokens.len(), "attributed costs");
    }
    result
}
