use treetrim_syntax::Node;

use crate::knapsack::{Knapsack, Selection, Status};
use crate::model::Model;
use crate::{COST_EPSILON, Check, PruneError, Pruning, check_thresholds, reconstruct};

pub const DEFAULT_SEARCH_LIMIT: u64 = 100_000;

/// Maximum-coverage pruning for a whole list of thresholds at once.
///
/// Every indicator-bearing node gets a level: the number of thresholds,
/// loosest first, under which it is kept. Levels never exceed the parent's
/// level, which makes children imply parents and pruning grow as the budget
/// shrinks. The search maximizes the summed levels by branch and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactOptimizer {
    pub max_holes: Option<usize>,
    pub search_limit: u64,
}

impl Default for ExactOptimizer {
    fn default() -> Self {
        Self { max_holes: None, search_limit: DEFAULT_SEARCH_LIMIT }
    }
}

impl ExactOptimizer {
    pub fn new(max_holes: Option<usize>) -> Self {
        Self { max_holes, ..Self::default() }
    }

    pub fn with_search_limit(self, search_limit: u64) -> Self {
        Self { search_limit, ..self }
    }

    /// One result per threshold, in the given order.
    ///
    /// Thresholds the cheapest admissible selection does not fit are `unsat`.
    /// A search failure fails the whole list.
    pub fn prune(&self, tree: &Node, thresholds: &[f64]) -> Result<Vec<Pruning>, PruneError> {
        check_thresholds(thresholds)?;

        let model = Model::new(tree);
        let floor = model.min_cost(self.max_holes);
        let feasible = thresholds
            .iter()
            .take_while(|&&threshold| floor <= threshold + COST_EPSILON)
            .count();
        let budgets =
            thresholds[..feasible].iter().map(|threshold| threshold - model.root_cost).collect();

        let levels = Search::new(&model, budgets, self.max_holes, self.search_limit).run()?;

        let results = thresholds
            .iter()
            .enumerate()
            .map(|(threshold, &max_cost)| {
                if threshold >= feasible {
                    return Pruning::unsat(max_cost);
                }
                let reconstruction =
                    reconstruct(&model.index, |id| model.keeps(&levels, threshold, id));
                Pruning::from_reconstruction(max_cost, Check::Sat, reconstruction)
            })
            .collect();

        tracing::debug!(
            nodes = model.index.len(),
            indicators = model.items.len(),
            floor,
            feasible,
            unsat = thresholds.len() - feasible,
            "exact pruning"
        );
        Ok(results)
    }
}

/// Branch and bound over per-threshold keep decisions.
///
/// Each search node solves every threshold on its own with the tree knapsack.
/// The summed counts bound the joint score, and when the per-threshold
/// selections happen to nest they are the best joint answer below that node.
/// Otherwise the search branches on one item that a tighter threshold keeps
/// but the looser one before it drops.
struct Search<'m> {
    knapsack: Knapsack<'m>,
    items: usize,
    /// Per threshold, what the items may cost on top of the root.
    budgets: Vec<f64>,
    /// One past the last item of each item's subtree.
    ends: Vec<usize>,
    parents: Vec<Option<usize>>,
    limit: u64,
    expansions: u64,
    best: Option<(usize, Vec<usize>)>,
}

impl<'m> Search<'m> {
    fn new(model: &'m Model<'_>, budgets: Vec<f64>, max_holes: Option<usize>, limit: u64) -> Self {
        let items = &model.items;
        let mut ends = vec![0; items.len()];
        for item in (0..items.len()).rev() {
            ends[item] = items[item].children.last().map_or(item + 1, |&last| ends[last]);
        }

        Self {
            knapsack: Knapsack::new(items, max_holes),
            items: items.len(),
            budgets,
            ends,
            parents: items.iter().map(|item| item.parent).collect(),
            limit,
            expansions: 0,
            best: None,
        }
    }

    fn run(mut self) -> Result<Vec<usize>, PruneError> {
        if self.budgets.is_empty() {
            return Ok(vec![0; self.items]);
        }

        self.visit(vec![Status::Free; self.items * self.budgets.len()])?;

        tracing::debug!(expansions = self.expansions, "exact search finished");
        match self.best {
            Some((_, levels)) => Ok(levels),
            None => Err(PruneError::Unsolved),
        }
    }

    /// A nested answer within `fixed`, built tightest threshold first, each
    /// looser one keeping everything the tighter one kept.
    fn grow_from_tightest(&self, fixed: &[Status]) -> Option<(usize, Vec<usize>)> {
        let thresholds = self.budgets.len();
        let mut selections: Vec<Selection> = Vec::with_capacity(thresholds);
        for (threshold, &budget) in self.budgets.iter().enumerate().rev() {
            let tighter = selections.last().map(|selection| selection.kept.as_slice());
            let status = |item: usize| match tighter {
                Some(kept) if kept[item] => Status::Kept,
                _ => fixed[item * thresholds + threshold],
            };
            let selection = self.knapsack.solve(status, budget)?;
            selections.push(selection);
        }
        selections.reverse();
        Some(self.scored(&selections))
    }

    fn visit(&mut self, fixed: Vec<Status>) -> Result<(), PruneError> {
        self.expansions += 1;
        if self.expansions > self.limit {
            return Err(PruneError::SearchLimitExceeded { limit: self.limit });
        }

        let thresholds = self.budgets.len();
        let mut selections = Vec::with_capacity(thresholds);
        for (threshold, &budget) in self.budgets.iter().enumerate() {
            let status = |item: usize| fixed[item * thresholds + threshold];
            match self.knapsack.solve(status, budget) {
                Some(selection) => selections.push(selection),
                None => return Ok(()),
            }
        }

        let bound = selections.iter().map(|selection| selection.count).sum::<usize>();
        if self.best.as_ref().is_some_and(|(best, _)| bound <= *best) {
            return Ok(());
        }

        let conflict = (1..thresholds).find_map(|threshold| {
            (0..self.items).find(|&item| {
                selections[threshold].kept[item] && !selections[threshold - 1].kept[item]
            })
            .map(|item| (item, threshold))
        });
        let Some((item, threshold)) = conflict else {
            self.best = Some(self.scored(&selections));
            return Ok(());
        };

        if let Some(found) = self.grow_from_tightest(&fixed) {
            if self.best.as_ref().is_none_or(|(best, _)| found.0 > *best) {
                self.best = Some(found);
            }
        }
        if self.best.as_ref().is_some_and(|(best, _)| bound <= *best) {
            return Ok(());
        }

        if let Some(fixed) = self.with_kept(&fixed, item, threshold - 1) {
            self.visit(fixed)?;
        }
        if let Some(fixed) = self.with_dropped(&fixed, item, threshold) {
            self.visit(fixed)?;
        }
        Ok(())
    }

    /// Keeps `item` and its ancestors under `threshold` and every looser one.
    fn with_kept(&self, fixed: &[Status], item: usize, threshold: usize) -> Option<Vec<Status>> {
        let thresholds = self.budgets.len();
        let mut fixed = fixed.to_vec();
        for looser in 0..=threshold {
            let mut current = Some(item);
            while let Some(node) = current {
                let slot = &mut fixed[node * thresholds + looser];
                match *slot {
                    Status::Dropped => return None,
                    Status::Kept => break,
                    Status::Free => *slot = Status::Kept,
                }
                current = self.parents[node];
            }
        }
        Some(fixed)
    }

    /// Drops `item` and its subtree under `threshold` and every tighter one.
    fn with_dropped(&self, fixed: &[Status], item: usize, threshold: usize) -> Option<Vec<Status>> {
        let thresholds = self.budgets.len();
        let mut fixed = fixed.to_vec();
        for tighter in threshold..thresholds {
            for node in item..self.ends[item] {
                let slot = &mut fixed[node * thresholds + tighter];
                if *slot == Status::Kept {
                    return None;
                }
                *slot = Status::Dropped;
            }
        }
        Some(fixed)
    }

    /// Score and levels of nested selections, loosest first.
    fn scored(&self, selections: &[Selection]) -> (usize, Vec<usize>) {
        let score = selections.iter().map(|selection| selection.count).sum();
        let levels = (0..self.items)
            .map(|item| selections.iter().take_while(|selection| selection.kept[item]).count())
            .collect();
        (score, levels)
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
        pruning.annotated.as_ref().map_or_else(Vec::new, |tree| {
            tree.preorder().map(|node| !node.is_deleted()).collect()
        })
    }

    #[test]
    fn picks_the_cheaper_leaves_when_only_some_fit() {
        // root(0) with leaves 3, 1, 2 and a budget for two of them
        let tree = node(0.0, vec![node(3.0, vec![]), node(1.0, vec![]), node(2.0, vec![])]);
        let results = ExactOptimizer::default().prune(&tree, &[3.0]).unwrap();

        assert_eq!(kept(&results[0]), [true, false, true, true]);
        assert_eq!(results[0].error_of_tree, 3.0);
        assert_eq!(results[0].frac_included, 0.75);
    }

    #[test]
    fn levels_nest_across_thresholds() {
        let tree = node(0.5, vec![node(1.0, vec![node(1.0, vec![])]), node(2.0, vec![])]);
        let results = ExactOptimizer::default().prune(&tree, &[10.0, 3.0, 1.0, 0.0]).unwrap();

        let checks = results.iter().map(|result| result.check).collect::<Vec<_>>();
        assert_eq!(checks, [Check::Sat, Check::Sat, Check::Sat, Check::Unsat]);
        assert_eq!(kept(&results[0]), [true; 4]);
        assert_eq!(kept(&results[1]), [true, true, true, false]);
        assert_eq!(kept(&results[2]), [true, false, false, false]);
        assert_eq!(results[3].pruned, None);
    }

    #[test]
    fn conflicting_thresholds_trade_off() {
        // root(x(y, y, y), z, z): the loose budget alone prefers x and its free
        // children, the tight one prefers both z, and only one can nest
        let x = node(5.0, vec![node(0.0, vec![]), node(0.0, vec![]), node(0.0, vec![])]);
        let tree = node(0.0, vec![x, node(1.0, vec![]), node(1.0, vec![])]);
        let results = ExactOptimizer::default().prune(&tree, &[5.0, 2.0]).unwrap();

        let items = results.iter().map(|result| kept(result).iter().filter(|&&kept| kept).count() - 1);
        assert_eq!(items.sum::<usize>(), 4);
        assert!(results.iter().all(|result| result.error_of_tree <= result.max_cost));

        let optimizer = ExactOptimizer::default().with_search_limit(1);
        assert_eq!(
            optimizer.prune(&tree, &[5.0, 2.0]),
            Err(PruneError::SearchLimitExceeded { limit: 1 })
        );
    }

    #[test]
    fn many_thresholds_over_many_cheap_nodes() {
        // forty nodes, costs between 0.05 and 0.95
        let leaf = |i: u32| node(f64::from(i % 19) * 0.05 + 0.05, vec![]);
        let branch = |i: u32| node(f64::from(i % 7) * 0.1 + 0.1, (0..4).map(|j| leaf(i * 4 + j)).collect());
        let tree = node(0.1, (0..8).map(branch).collect());
        assert_eq!(tree.total_nodes(), 41);

        let thresholds = [12.0, 8.0, 6.0, 4.0, 3.0, 2.0, 1.0, 0.5];
        for max_holes in [None, Some(2), Some(5)] {
            let results = ExactOptimizer::new(max_holes).prune(&tree, &thresholds).unwrap();
            for pair in results.windows(2) {
                let (looser, tighter) = (kept(&pair[0]), kept(&pair[1]));
                if pair[1].is_sat() {
                    assert!(looser.iter().zip(&tighter).all(|(&l, &t)| l || !t));
                }
            }
            for result in results.iter().filter(|result| result.is_sat()) {
                assert!(result.error_of_tree <= result.max_cost + COST_EPSILON);
                let holes = result.annotated.as_ref().map_or(0, Node::holes);
                assert!(max_holes.is_none_or(|max| holes <= max), "{holes} holes");
            }
        }
    }
}
