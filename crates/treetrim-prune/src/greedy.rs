use std::cmp::Ordering;
use std::collections::BinaryHeap;

use treetrim_syntax::{IdxMap, Node, NodeId, TreeIndex};

use crate::{COST_EPSILON, Check, PruneError, Pruning, charge, reconstruct};

/// Heap-driven approximation of [`crate::ExactOptimizer`] for one threshold.
///
/// Repeatedly removes the most expensive removable node until the retained
/// cost fits. A node is removable once all its children are gone, and the root
/// never is. With the hole budget spent, only nodes whose removal merges
/// existing holes are considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedyOptimizer {
    pub max_holes: Option<usize>,
}

impl GreedyOptimizer {
    pub fn new(max_holes: Option<usize>) -> Self {
        Self { max_holes }
    }

    /// Prunes `tree` until its retained cost is at most `max_cost`.
    ///
    /// Running out of removable nodes first is not an error: the best effort
    /// is returned as `unsat`.
    pub fn prune(&self, tree: &Node, max_cost: f64) -> Result<Pruning, PruneError> {
        if max_cost.is_nan() {
            return Err(PruneError::InvalidThreshold(max_cost));
        }

        let index = TreeIndex::new(tree);
        let mut state = State::new(&index);
        let mut removed = 0;

        while state.retained > max_cost + COST_EPSILON {
            let extend_only = self.max_holes.is_some_and(|max| state.holes >= max);
            let Some(candidate) = state.next(extend_only) else {
                tracing::debug!(extend_only, holes = state.holes, "no removable node left");
                break;
            };
            state.remove(candidate)?;
            removed += 1;
        }

        let check = if state.retained <= max_cost + COST_EPSILON { Check::Sat } else { Check::Unsat };
        let reconstruction = reconstruct(&index, |id| !state.deleted[id]);

        tracing::debug!(
            max_cost,
            removed,
            holes = state.holes,
            retained = state.retained,
            ?check,
            "greedy pruning"
        );
        Ok(Pruning::from_reconstruction(max_cost, check, reconstruction))
    }

    /// One independent run per threshold; a failure stays with its threshold.
    pub fn prune_all(&self, tree: &Node, thresholds: &[f64]) -> Vec<Result<Pruning, PruneError>> {
        thresholds.iter().map(|&max_cost| self.prune(tree, max_cost)).collect()
    }
}

/// Ordered by own cost, then by subtree cost, then earliest in preorder.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    subtree: f64,
    id: NodeId,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.subtree.total_cmp(&other.subtree))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

struct State<'i, 'a> {
    index: &'i TreeIndex<'a>,
    costs: IdxMap<Node, f64>,
    subtree: IdxMap<Node, f64>,
    deleted: IdxMap<Node, bool>,
    live_children: IdxMap<Node, usize>,
    leaves: BinaryHeap<Candidate>,
    /// Nodes whose children were all removed.
    extending: BinaryHeap<Candidate>,
    holes: usize,
    retained: f64,
}

impl<'i, 'a> State<'i, 'a> {
    fn new(index: &'i TreeIndex<'a>) -> Self {
        let costs = IdxMap::from_fn(index.len(), |id| charge(index.node(id)));
        let mut subtree = costs.clone();
        for id in index.ids().rev() {
            let below = index.children(id).iter().map(|&child| subtree[child]).sum::<f64>();
            subtree[id] += below;
        }

        let mut state = Self {
            index,
            retained: subtree[index.root()],
            costs,
            subtree,
            deleted: IdxMap::filled(index.len(), false),
            live_children: IdxMap::from_fn(index.len(), |id| index.children(id).len()),
            leaves: BinaryHeap::new(),
            extending: BinaryHeap::new(),
            holes: 0,
        };

        let leaves = index
            .ids()
            .filter(|&id| id != index.root() && index.children(id).is_empty())
            .map(|id| state.candidate(id))
            .collect::<Vec<_>>();
        state.leaves.extend(leaves);
        state
    }

    fn candidate(&self, id: NodeId) -> Candidate {
        Candidate { cost: self.costs[id], subtree: self.subtree[id], id }
    }

    fn next(&mut self, extend_only: bool) -> Option<Candidate> {
        let heap = if extend_only { &mut self.extending } else { &mut self.leaves };
        let deleted = &self.deleted;
        std::iter::from_fn(|| heap.pop()).find(|candidate| !deleted[candidate.id])
    }

    /// Deletes the candidate with everything below it.
    fn remove(&mut self, candidate: Candidate) -> Result<(), PruneError> {
        let index = self.index;
        let id = candidate.id;
        let parent = index.parent(id).ok_or(PruneError::MissingParent { node: id.index() })?;

        // Its removed children stop being holes of their own.
        self.holes = self.holes + 1 - index.children(id).len();

        self.deleted[id] = true;
        for descendant in index.descendants(id) {
            self.deleted[descendant] = true;
        }
        self.retained =
            index.ids().filter(|&node| !self.deleted[node]).map(|node| self.costs[node]).sum();

        self.live_children[parent] -= 1;
        if self.live_children[parent] == 0 && parent != index.root() {
            let candidate = self.candidate(parent);
            self.leaves.push(candidate);
            self.extending.push(candidate);
        }

        tracing::trace!(
            node = %index.node(id).code,
            cost = candidate.cost,
            holes = self.holes,
            retained = self.retained,
            "removed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use treetrim_syntax::{SyntaxKind, TextRange};

    use super::*;

    fn node(nll: f64, children: Vec<Node>) -> Node {
        let mut node = Node::new(SyntaxKind::IDENT, "n", TextRange::default()).with_children(children);
        node.nll = Some(nll);
        node
    }

    fn kept(pruning: &Pruning) -> Vec<bool> {
        let tree = pruning.annotated.as_ref().unwrap();
        tree.preorder().map(|node| !node.is_deleted()).collect()
    }

    #[test]
    fn removes_the_most_expensive_leaf_first() {
        let tree = node(0.0, vec![node(3.0, vec![]), node(1.0, vec![]), node(2.0, vec![])]);
        let result = GreedyOptimizer::default().prune(&tree, 3.0).unwrap();

        assert_eq!(result.check, Check::Sat);
        assert_eq!(kept(&result), [true, false, true, true]);
        assert_eq!(result.error_of_tree, 3.0);
    }

    #[test]
    fn spent_hole_budget_only_extends_existing_holes() {
        // root(a(b), d): b opens the only hole, a then widens it
        let tree = node(0.0, vec![node(3.0, vec![node(4.0, vec![])]), node(1.0, vec![])]);
        let result = GreedyOptimizer::new(Some(1)).prune(&tree, 1.0).unwrap();

        assert_eq!(result.check, Check::Sat);
        assert_eq!(kept(&result), [true, false, false, true]);
        assert_eq!(result.annotated.as_ref().unwrap().holes(), 1);
    }

    #[test]
    fn no_hole_to_extend_is_unsat() {
        // root(a(b, c), d): after b, a still has c, so nothing extends the hole
        let tree = node(
            0.0,
            vec![node(0.5, vec![node(4.0, vec![]), node(3.0, vec![])]), node(2.0, vec![])],
        );
        let result = GreedyOptimizer::new(Some(1)).prune(&tree, 2.0).unwrap();

        assert_eq!(result.check, Check::Unsat);
        assert_eq!(kept(&result), [true, true, false, true, true]);
        assert_eq!(result.error_of_tree, 5.5);
    }

    #[test]
    fn running_dry_is_unsat_with_a_best_effort() {
        let tree = node(5.0, vec![node(1.0, vec![])]);
        let result = GreedyOptimizer::default().prune(&tree, 1.0).unwrap();

        assert_eq!(result.check, Check::Unsat);
        assert_eq!(kept(&result), [true, false]);
        assert_eq!(result.error_of_tree, 5.0);
        assert_eq!(result.frac_included, 0.5);
    }

    #[test]
    fn zero_holes_allow_no_removal() {
        let tree = node(0.0, vec![node(1.0, vec![])]);
        let result = GreedyOptimizer::new(Some(0)).prune(&tree, 0.0).unwrap();
        assert_eq!(result.check, Check::Unsat);
        assert_eq!(result.frac_included, 1.0);
    }
}
