use treetrim_syntax::{IdxMap, Node, NodeId, TreeIndex};

use crate::charge;

/// A node below the root that carries a keep decision of its own.
#[derive(Debug, Clone)]
pub(crate) struct Item {
    pub(crate) cost: f64,
    /// Nearest indicator-bearing ancestor below the root.
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
}

/// The indicator forest of one tree.
///
/// Nodes without a usable cost are folded into the item above them, and the
/// root is pinned, so items attached to it have no parent. Items are numbered
/// in preorder: a parent always comes before its children.
pub(crate) struct Model<'a> {
    pub(crate) index: TreeIndex<'a>,
    pub(crate) items: Vec<Item>,
    pub(crate) root_cost: f64,
    owner: IdxMap<Node, Option<usize>>,
}

impl<'a> Model<'a> {
    pub(crate) fn new(tree: &'a Node) -> Self {
        let index = TreeIndex::new(tree);
        let root = index.root();
        let mut items: Vec<Item> = Vec::new();
        let mut owner: IdxMap<Node, Option<usize>> = IdxMap::filled(index.len(), None);

        for id in index.ids().filter(|&id| id != root) {
            let inherited = index.parent(id).and_then(|parent| owner[parent]);
            owner[id] = match index.node(id).cost() {
                Some(cost) => {
                    let item = items.len();
                    if let Some(parent) = inherited {
                        items[parent].children.push(item);
                    }
                    items.push(Item { cost, parent: inherited, children: Vec::new() });
                    Some(item)
                }
                None => inherited,
            };
        }

        Self { root_cost: charge(tree), index, items, owner }
    }

    /// Whether `id` is kept at `threshold` when item `i` is kept at the
    /// first `levels[i]` thresholds.
    pub(crate) fn keeps(&self, levels: &[usize], threshold: usize, id: NodeId) -> bool {
        self.owner[id].is_none_or(|item| levels[item] > threshold)
    }

    /// Cheapest retained cost of any selection with at most `max_holes` holes.
    ///
    /// Without a hole budget this is the root alone. Otherwise each item gets
    /// a table of the cheapest cost of keeping it, indexed by the holes spent
    /// inside its subtree, merged child by child.
    pub(crate) fn min_cost(&self, max_holes: Option<usize>) -> f64 {
        let Some(max_holes) = max_holes else { return self.root_cost };
        let width = max_holes.min(self.items.len()) + 1;
        let mut tables = vec![Vec::new(); self.items.len()];

        for (item, entry) in self.items.iter().enumerate().rev() {
            let mut table = vec![f64::INFINITY; width];
            table[0] = entry.cost;
            for &child in &entry.children {
                table = merge(&table, &std::mem::take(&mut tables[child]));
            }
            tables[item] = table;
        }

        let mut table = vec![f64::INFINITY; width];
        table[0] = self.root_cost;
        for (item, entry) in self.items.iter().enumerate() {
            if entry.parent.is_none() {
                table = merge(&table, &tables[item]);
            }
        }
        table.into_iter().fold(f64::INFINITY, f64::min)
    }
}

/// Adds one child under a kept parent: either drop it as a fresh hole or keep
/// it with any split of the remaining holes.
fn merge(parent: &[f64], child: &[f64]) -> Vec<f64> {
    let mut merged = vec![f64::INFINITY; parent.len()];
    for (used, &cost) in parent.iter().enumerate() {
        if cost.is_infinite() {
            continue;
        }
        if let Some(slot) = merged.get_mut(used + 1) {
            *slot = slot.min(cost);
        }
        for (extra, &child_cost) in child.iter().enumerate().take(parent.len() - used) {
            merged[used + extra] = merged[used + extra].min(cost + child_cost);
        }
    }
    merged
}
