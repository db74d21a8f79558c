use std::ops::Range;

use serde::{Deserialize, Serialize};
use treetrim_syntax::Node;

type FxIndexMap<K, V> =
    indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub eval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    fn pass() -> Self {
        Self { eval: true, reason: None }
    }

    fn fail(reason: String) -> Self {
        Self { eval: false, reason: Some(reason) }
    }
}

/// The text a node contributes by itself: its gap intervals concatenated,
/// with whitespace removed so layout differences do not count.
pub fn signature(code: &str, node: &Node) -> String {
    node.intervals
        .iter()
        .filter_map(|&interval| code.get(Range::<usize>::from(interval)))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Checks that the surviving structure of `pruned` can be found in `target`.
///
/// Nodes match by [`signature`]. Every non-deleted child of a pruned node must
/// match some non-deleted child of the corresponding target node, and matched
/// pairs are checked recursively. An absent pruned tree is trivially contained.
pub fn is_subtree(
    target_code: &str,
    target: &Node,
    pruned_code: &str,
    pruned: Option<&Node>,
) -> Verdict {
    let Some(pruned) = pruned else { return Verdict::pass() };

    let target_signature = signature(target_code, target);
    let pruned_signature = signature(pruned_code, pruned);
    if target_signature != pruned_signature {
        return Verdict::fail(format!(
            "nodes differ: pruned {pruned_signature:?}, target {target_signature:?}"
        ));
    }

    let target_children = children_by_signature(target_code, target);
    let pruned_children = children_by_signature(pruned_code, pruned);

    for (signature, &pruned_child) in &pruned_children {
        let Some(&target_child) = target_children.get(signature) else {
            return Verdict::fail(format!("target has no child {signature:?}"));
        };

        let verdict = is_subtree(target_code, target_child, pruned_code, Some(pruned_child));
        if !verdict.eval {
            return verdict;
        }
    }

    Verdict::pass()
}

/// Keyed in first-seen order; a later child replaces an earlier one with the
/// same signature.
fn children_by_signature<'a>(code: &str, node: &'a Node) -> FxIndexMap<String, &'a Node> {
    node.children
        .iter()
        .filter(|child| !child.is_deleted())
        .map(|child| (signature(code, child), child))
        .collect()
}
