use crate::COST_EPSILON;
use crate::model::Item;

/// Decision already taken for one item under one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Free,
    Kept,
    Dropped,
}

/// The most items one threshold can keep, at the cheapest cost among those.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub(crate) count: usize,
    pub(crate) kept: Vec<bool>,
}

/// Cheapest cost of a kept subtree, indexed by holes and then by kept items.
type Table = Vec<Vec<f64>>;

/// Tree knapsack over the indicator forest for a single budget.
///
/// Every item's table is built from its own cost and merged child by child.
/// The intermediate tables are kept so the chosen selection can be traced
/// back. Without a hole budget all holes share row 0.
pub(crate) struct Knapsack<'m> {
    items: &'m [Item],
    roots: Vec<usize>,
    max_holes: Option<usize>,
    width: usize,
}

impl<'m> Knapsack<'m> {
    pub(crate) fn new(items: &'m [Item], max_holes: Option<usize>) -> Self {
        let roots = (0..items.len()).filter(|&item| items[item].parent.is_none()).collect();
        let width = max_holes.map_or(1, |max| max.min(items.len()) + 1);
        Self { items, roots, max_holes, width }
    }

    fn add_holes(&self, a: usize, b: usize) -> Option<usize> {
        match self.max_holes {
            None => Some(0),
            Some(_) => Some(a + b).filter(|&holes| holes < self.width),
        }
    }

    /// `None` when no selection honoring `status` fits `budget`.
    pub(crate) fn solve(
        &self,
        status: impl Fn(usize) -> Status,
        budget: f64,
    ) -> Option<Selection> {
        let mut steps: Vec<Vec<Table>> = vec![Vec::new(); self.items.len()];
        for item in (0..self.items.len()).rev() {
            if status(item) == Status::Dropped {
                continue;
            }
            let mut own = vec![vec![f64::INFINITY; 2]; self.width];
            own[0][1] = self.items[item].cost;
            let history = self.fold(own, &self.items[item].children, &steps, &status);
            steps[item] = history;
        }

        let mut base = vec![vec![f64::INFINITY; 1]; self.width];
        base[0][0] = 0.0;
        let history = self.fold(base, &self.roots, &steps, &status);
        let table = history.last()?;

        let (count, holes) = (0..table[0].len()).rev().find_map(|count| {
            (0..self.width)
                .filter(|&holes| table[holes][count] <= budget + COST_EPSILON)
                .min_by(|&a, &b| table[a][count].total_cmp(&table[b][count]))
                .map(|holes| (count, holes))
        })?;

        let mut kept = vec![false; self.items.len()];
        self.trace(&history, &self.roots, &steps, &status, holes, count, &mut kept);
        Some(Selection { count, kept })
    }

    fn fold(
        &self,
        base: Table,
        children: &[usize],
        steps: &[Vec<Table>],
        status: &impl Fn(usize) -> Status,
    ) -> Vec<Table> {
        let mut history = Vec::with_capacity(children.len() + 1);
        history.push(base);
        for &child in children {
            let Some(current) = history.last() else { break };
            let merged = self.merge(current, steps[child].last(), status(child) != Status::Kept);
            history.push(merged);
        }
        history
    }

    /// Adds one child under a kept parent: dropped as a fresh hole, or kept
    /// with any split of holes and items.
    fn merge(&self, parent: &Table, child: Option<&Table>, droppable: bool) -> Table {
        let child_len = child.map_or(1, |table| table[0].len());
        let mut merged = vec![vec![f64::INFINITY; parent[0].len() + child_len - 1]; self.width];

        for (used, row) in parent.iter().enumerate() {
            for (count, &cost) in row.iter().enumerate() {
                if cost.is_infinite() {
                    continue;
                }
                if let Some(holes) = self.add_holes(used, 1).filter(|_| droppable) {
                    let slot = &mut merged[holes][count];
                    *slot = slot.min(cost);
                }
                let Some(child) = child else { continue };
                for (extra, child_row) in child.iter().enumerate() {
                    let Some(holes) = self.add_holes(used, extra) else { continue };
                    for (more, &child_cost) in child_row.iter().enumerate() {
                        if child_cost.is_infinite() {
                            continue;
                        }
                        let slot = &mut merged[holes][count + more];
                        *slot = slot.min(cost + child_cost);
                    }
                }
            }
        }
        merged
    }

    /// Walks the merges backwards and marks the children the cheapest entry
    /// `(holes, count)` of the last table was built from.
    #[allow(clippy::too_many_arguments)]
    fn trace(
        &self,
        history: &[Table],
        children: &[usize],
        steps: &[Vec<Table>],
        status: &impl Fn(usize) -> Status,
        mut holes: usize,
        mut count: usize,
        kept: &mut [bool],
    ) {
        for (step, &child) in children.iter().enumerate().rev() {
            let target = history[step + 1][holes][count];
            let before = &history[step];

            let dropped = (status(child) != Status::Kept)
                .then(|| {
                    (0..self.width).find(|&used| {
                        self.add_holes(used, 1) == Some(holes)
                            && before[used].get(count) == Some(&target)
                    })
                })
                .flatten();
            if let Some(used) = dropped {
                holes = used;
                continue;
            }

            let Some(child_table) = steps[child].last() else { continue };
            let split = (0..self.width).find_map(|used| {
                (0..=count.min(before[used].len() - 1)).find_map(|taken| {
                    let cost = before[used][taken];
                    if cost.is_infinite() {
                        return None;
                    }
                    (0..self.width).find_map(|extra| {
                        let fits = self.add_holes(used, extra) == Some(holes)
                            && child_table[extra].get(count - taken).is_some_and(|&child_cost| {
                                cost + child_cost == target
                            });
                        fits.then_some((used, taken, extra))
                    })
                })
            });
            let Some((used, taken, extra)) = split else { continue };

            kept[child] = true;
            let grandchildren = &self.items[child].children;
            self.trace(&steps[child], grandchildren, steps, status, extra, count - taken, kept);
            holes = used;
            count = taken;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(shape: &[(f64, Option<usize>)]) -> Vec<Item> {
        let mut items = shape
            .iter()
            .map(|&(cost, parent)| Item { cost, parent, children: Vec::new() })
            .collect::<Vec<_>>();
        for (item, &(_, parent)) in shape.iter().enumerate() {
            if let Some(parent) = parent {
                items[parent].children.push(item);
            }
        }
        items
    }

    #[test]
    fn keeps_as_many_items_as_fit() {
        // a(b, c) and d
        let items = items(&[(1.0, None), (0.5, Some(0)), (2.0, Some(0)), (0.25, None)]);
        let selection = Knapsack::new(&items, None).solve(|_| Status::Free, 2.0).unwrap();

        assert_eq!(selection.count, 3);
        assert_eq!(selection.kept, [true, true, false, true]);
    }

    #[test]
    fn hole_budget_forces_whole_subtrees_out() {
        let items = items(&[(1.0, None), (0.5, Some(0)), (2.0, Some(0)), (0.25, None)]);
        let knapsack = Knapsack::new(&items, Some(1));

        // c is the only hole
        let selection = knapsack.solve(|_| Status::Free, 2.0).unwrap();
        assert_eq!(selection.kept, [true, true, false, true]);

        // too tight for a: its whole subtree becomes the hole
        let selection = knapsack.solve(|_| Status::Free, 0.5).unwrap();
        assert_eq!(selection.kept, [false, false, false, true]);

        assert_eq!(Knapsack::new(&items, Some(0)).solve(|_| Status::Free, 3.0), None);
    }

    #[test]
    fn decided_items_are_respected() {
        let items = items(&[(1.0, None), (0.5, Some(0)), (2.0, Some(0)), (0.25, None)]);
        let knapsack = Knapsack::new(&items, None);

        // a and c are forced in, d is cheaper than b
        let forced = |item: usize| if item == 0 || item == 2 { Status::Kept } else { Status::Free };
        let selection = knapsack.solve(forced, 3.5);
        assert_eq!(selection.map(|selection| selection.kept), Some(vec![true, false, true, true]));

        let selection = knapsack.solve(|item| if item == 0 { Status::Dropped } else { Status::Free }, 10.0);
        assert_eq!(selection.map(|selection| selection.count), Some(1));
    }
}
