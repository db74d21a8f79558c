use std::fmt;

use serde::{Deserialize, Serialize};
use text_size::TextRange;

use crate::SyntaxKind;
use crate::record::{NodeRecord, RecordError};

/// Upper clamp applied to a node's cost before it enters any budget.
pub const MAX_NODE_COST: f64 = 10.0;

/// One syntactic construct of a parsed program.
///
/// A node owns its children in left-to-right source order. Everything besides
/// `kind`, `code`, `range` and `children` is an annotation: `intervals` come from
/// [`crate::layout`], the token fields and `nll` from cost attribution, and
/// `deleted` / `colon_name` from a pruning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "NodeRecord", try_from = "NodeRecord")]
pub struct Node {
    pub kind: SyntaxKind,
    pub code: String,
    pub range: TextRange,
    /// Parts of `range` not covered by any child, in source order.
    pub intervals: Vec<TextRange>,
    pub tokens: Vec<String>,
    pub logprobs: Vec<f64>,
    /// `None` until attribution has run.
    pub nll: Option<f64>,
    /// `None` until a pruning pass has decided on the node.
    pub deleted: Option<bool>,
    pub colon_name: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: SyntaxKind, code: impl Into<String>, range: TextRange) -> Self {
        Self {
            kind,
            code: code.into(),
            range,
            intervals: Vec::new(),
            tokens: Vec::new(),
            logprobs: Vec::new(),
            nll: None,
            deleted: None,
            colon_name: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn start(&self) -> usize {
        self.range.start().into()
    }

    pub fn end(&self) -> usize {
        self.range.end().into()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The node's own cost, or `None` when it has no usable `nll`.
    pub fn cost(&self) -> Option<f64> {
        match self.nll {
            Some(nll) if !nll.is_nan() => Some(nll.clamp(0.0, MAX_NODE_COST)),
            _ => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted == Some(true)
    }

    pub fn total_nodes(&self) -> usize {
        self.preorder().count()
    }

    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    /// Nodes of an annotated tree not marked deleted.
    pub fn retained_nodes(&self) -> usize {
        self.preorder().filter(|node| !node.is_deleted()).count()
    }

    /// Number of maximal deleted subtrees whose parent is retained.
    pub fn holes(&self) -> usize {
        fn walk(node: &Node, parent_deleted: bool) -> usize {
            let deleted = node.is_deleted();
            let own = usize::from(deleted && !parent_deleted);
            own + node.children.iter().map(|child| walk(child, deleted)).sum::<usize>()
        }

        walk(self, false)
    }
}

pub struct Preorder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn go(node: &Node, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:indent$}{:?}@{:?} {:?}", "", node.kind, node.range, node.code, indent = depth * 2)?;
            if node.is_deleted() {
                write!(f, " (deleted)")?;
            }
            writeln!(f)?;
            for child in &node.children {
                go(child, depth + 1, f)?;
            }
            Ok(())
        }

        go(self, 0, f)
    }
}

impl TryFrom<NodeRecord> for Node {
    type Error = RecordError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        if record.start > record.end {
            return Err(RecordError::InvertedRange { start: record.start, end: record.end });
        }

        let intervals = record
            .intervals
            .iter()
            .map(|&[lo, hi]| {
                if lo > hi {
                    Err(RecordError::InvertedRange { start: lo, end: hi })
                } else {
                    Ok(TextRange::new(lo.into(), hi.into()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if record.tokens.len() != record.logprobs.len() {
            return Err(RecordError::TokenCount {
                tokens: record.tokens.len(),
                logprobs: record.logprobs.len(),
            });
        }

        let children =
            record.children.into_iter().map(Node::try_from).collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind: record.kind,
            code: record.code,
            range: TextRange::new(record.start.into(), record.end.into()),
            intervals,
            tokens: record.tokens,
            logprobs: record.logprobs,
            nll: record.nll,
            deleted: record.deleted,
            colon_name: record.colon_name,
            children,
        })
    }
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        Self {
            kind: node.kind,
            code: node.code,
            start: node.range.start().into(),
            end: node.range.end().into(),
            intervals: node
                .intervals
                .iter()
                .map(|interval| [interval.start().into(), interval.end().into()])
                .collect(),
            tokens: node.tokens,
            logprobs: node.logprobs,
            nll: node.nll.filter(|nll| nll.is_finite()),
            deleted: node.deleted,
            colon_name: node.colon_name,
            children: node.children.into_iter().map(NodeRecord::from).collect(),
        }
    }
}
