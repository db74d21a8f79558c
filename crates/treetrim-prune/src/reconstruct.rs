use treetrim_syntax::{Node, NodeId, TreeIndex};

use crate::charge;

/// The two trees a keep decision produces, plus its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Kept nodes only. A node whose parent is dropped is dropped with it.
    pub pruned: Option<Node>,
    /// Same shape as the input, `deleted` set on every node.
    pub annotated: Node,
    /// Summed cost of the kept nodes.
    pub error_of_tree: f64,
    pub kept: usize,
    pub total: usize,
}

impl Reconstruction {
    pub fn frac_included(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.kept as f64 / self.total as f64 }
    }
}

/// Builds fresh output trees from `index` and a per-node keep decision.
///
/// Every output node is named `"<code>::<preorder id>"`. The input tree is
/// only read.
pub fn reconstruct(index: &TreeIndex<'_>, keep: impl Fn(NodeId) -> bool) -> Reconstruction {
    let mut stats = Stats::default();
    let (pruned, annotated) = build(index, index.root(), true, &keep, &mut stats);
    Reconstruction {
        pruned,
        annotated,
        error_of_tree: stats.error,
        kept: stats.kept,
        total: index.len(),
    }
}

#[derive(Default)]
struct Stats {
    error: f64,
    kept: usize,
}

fn build(
    index: &TreeIndex<'_>,
    id: NodeId,
    parent_kept: bool,
    keep: &impl Fn(NodeId) -> bool,
    stats: &mut Stats,
) -> (Option<Node>, Node) {
    let node = index.node(id);
    let kept = parent_kept && keep(id);
    if kept {
        stats.kept += 1;
        stats.error += charge(node);
    }

    let mut pruned = kept.then(|| detached(node, id, false));
    let mut annotated = detached(node, id, !kept);

    for &child in index.children(id) {
        let (pruned_child, annotated_child) = build(index, child, kept, keep, stats);
        if let (Some(pruned), Some(child)) = (&mut pruned, pruned_child) {
            pruned.children.push(child);
        }
        annotated.children.push(annotated_child);
    }

    (pruned, annotated)
}

fn detached(node: &Node, id: NodeId, deleted: bool) -> Node {
    let mut copy = Node::new(node.kind, node.code.clone(), node.range);
    copy.intervals.clone_from(&node.intervals);
    copy.tokens.clone_from(&node.tokens);
    copy.logprobs.clone_from(&node.logprobs);
    copy.nll = node.nll;
    copy.deleted = Some(deleted);
    copy.colon_name = Some(format!("{}::{}", node.code, id.index()));
    copy
}
