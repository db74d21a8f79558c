use crate::Node;
use crate::arena::{Idx, IdxMap};

/// Preorder position of a node inside one [`TreeIndex`].
pub type NodeId = Idx<Node>;

/// Read-only, per-pass view of a tree: every node gets a stable preorder id,
/// and parent / child relations become side tables instead of pointers.
pub struct TreeIndex<'a> {
    nodes: IdxMap<Node, &'a Node>,
    parent_of: IdxMap<Node, Option<NodeId>>,
    children: IdxMap<Node, Vec<NodeId>>,
    subtree_end: IdxMap<Node, u32>,
}

impl<'a> TreeIndex<'a> {
    pub fn new(root: &'a Node) -> Self {
        let mut nodes = IdxMap::default();
        let mut parent_of = IdxMap::default();
        let mut children: IdxMap<Node, Vec<NodeId>> = IdxMap::default();
        let mut stack = vec![(root, None)];

        while let Some((node, parent)) = stack.pop() {
            let id = nodes.push(node);
            parent_of.push(parent);
            children.push(Vec::with_capacity(node.children.len()));
            if let Some(parent) = parent {
                children[parent].push(id);
            }
            stack.extend(node.children.iter().rev().map(|child| (child, Some(id))));
        }

        let mut subtree_end = IdxMap::filled(nodes.len(), 0);
        for (id, kids) in children.iter().rev() {
            subtree_end[id] = match kids.last() {
                Some(&last) => subtree_end[last],
                None => id.index() + 1,
            };
        }

        Self { nodes, parent_of, children, subtree_end }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    #[track_caller]
    pub fn node(&self, id: NodeId) -> &'a Node {
        self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent_of.get(id).copied().flatten()
    }

    #[track_caller]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    /// All ids in preorder; reversing it visits children before parents.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId::new)
    }

    /// Strict descendants of `id`, in preorder.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        (id.index() + 1..self.subtree_end[id]).map(NodeId::new)
    }
}

#[cfg(test)]
mod tests {
    use text_size::TextRange;

    use super::*;
    use crate::SyntaxKind;

    fn node(children: Vec<Node>) -> Node {
        Node::new(SyntaxKind::IDENT, "", TextRange::default()).with_children(children)
    }

    #[test]
    fn preorder_ids_and_parents() {
        // a(b(c, d), e)
        let tree = node(vec![node(vec![node(vec![]), node(vec![])]), node(vec![])]);
        let index = TreeIndex::new(&tree);

        assert_eq!(index.len(), 5);
        let parents = index.ids().map(|id| index.parent(id).map(Idx::index)).collect::<Vec<_>>();
        assert_eq!(parents, [None, Some(0), Some(1), Some(1), Some(0)]);

        let root_children = index.children(index.root()).iter().map(|id| id.index()).collect::<Vec<_>>();
        assert_eq!(root_children, [1, 4]);

        let below_b = index.descendants(NodeId::new(1)).map(Idx::index).collect::<Vec<_>>();
        assert_eq!(below_b, [2, 3]);
        assert_eq!(index.descendants(NodeId::new(4)).count(), 0);
    }
}
