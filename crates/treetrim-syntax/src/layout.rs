//! Source-span bookkeeping: `code` and gap `intervals` for every node, and the
//! checks that keep both honest.

use text_size::{TextRange, TextSize};

use crate::Node;

/// Fills `code` with the node's source slice and `intervals` with the parts of
/// its range not covered by children. A leaf gets one interval spanning itself.
pub fn layout(root: &mut Node, source: &str) {
    root.for_each_mut(&mut |node| {
        node.code = source.get(std::ops::Range::<usize>::from(node.range)).unwrap_or_default().to_owned();
        node.intervals = gaps(node.range, node.children.iter().map(|child| child.range));
    });
}

pub fn gaps(range: TextRange, children: impl IntoIterator<Item = TextRange>) -> Vec<TextRange> {
    let mut intervals = Vec::new();
    let mut prev_end = range.start();
    let mut any_child = false;

    for child in children {
        any_child = true;
        if child.start() > prev_end {
            intervals.push(TextRange::new(prev_end, child.start()));
        }
        prev_end = prev_end.max(child.end());
    }

    if !any_child {
        return vec![range];
    }

    if prev_end < range.end() {
        intervals.push(TextRange::new(prev_end, range.end()));
    }

    intervals
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpanError {
    #[error("node {range:?} lies outside the source ({len} bytes)")]
    OutOfSource { range: TextRange, len: usize },
    #[error("code of node {range:?} does not match its source slice")]
    CodeMismatch { range: TextRange },
    #[error("child {child:?} of {parent:?} is outside its parent or overlaps a sibling")]
    Misplaced { parent: TextRange, child: TextRange },
    #[error("intervals of node {range:?} do not partition its uncovered span")]
    Partition { range: TextRange },
}

/// Checks the round-trip span invariant (`source[start..end] == code`) and the
/// partition invariant (intervals plus child spans tile the node exactly).
pub fn validate(root: &Node, source: &str) -> Result<(), SpanError> {
    for node in root.preorder() {
        let slice = source
            .get(std::ops::Range::<usize>::from(node.range))
            .ok_or(SpanError::OutOfSource { range: node.range, len: source.len() })?;
        if slice != node.code {
            return Err(SpanError::CodeMismatch { range: node.range });
        }

        let mut cursor = node.range.start();
        for child in &node.children {
            if child.range.start() < cursor || !node.range.contains_range(child.range) {
                return Err(SpanError::Misplaced { parent: node.range, child: child.range });
            }
            cursor = child.range.end();
        }

        let mut pieces = node
            .intervals
            .iter()
            .copied()
            .chain(node.children.iter().map(|child| child.range))
            .collect::<Vec<_>>();
        pieces.sort_by_key(|piece| (piece.start(), piece.end()));

        let mut cursor: TextSize = node.range.start();
        for piece in pieces {
            if piece.start() != cursor {
                return Err(SpanError::Partition { range: node.range });
            }
            cursor = piece.end();
        }
        if cursor != node.range.end() {
            return Err(SpanError::Partition { range: node.range });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntaxKind;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    fn call() -> Node {
        Node::new(SyntaxKind::CALL, "", range(0, 7)).with_children(vec![
            Node::new(SyntaxKind::IDENT, "", range(0, 1)),
            Node::new(SyntaxKind::IDENT, "", range(2, 3)),
            Node::new(SyntaxKind::IDENT, "", range(5, 6)),
        ])
    }

    #[test]
    fn gaps_cover_operators_and_delimiters() {
        let mut tree = call();
        layout(&mut tree, "f(a, b)");

        assert_eq!(tree.code, "f(a, b)");
        assert_eq!(tree.intervals, vec![range(1, 2), range(3, 5), range(6, 7)]);
        assert_eq!(tree.children[1].intervals, vec![range(2, 3)]);
        assert_eq!(tree.children[1].code, "a");
        assert_eq!(validate(&tree, "f(a, b)"), Ok(()));
    }

    #[test]
    fn children_flush_with_parent_leave_no_gap() {
        let intervals = gaps(range(0, 3), [range(0, 1), range(1, 3)]);
        assert!(intervals.is_empty());
    }

    #[test]
    fn validate_reports_drift() {
        let mut tree = call();
        layout(&mut tree, "f(a, b)");

        let mut stale = tree.clone();
        stale.children[0].code = "g".to_owned();
        assert_eq!(validate(&stale, "f(a, b)"), Err(SpanError::CodeMismatch { range: range(0, 1) }));

        let mut torn = tree.clone();
        torn.intervals.pop();
        assert_eq!(validate(&torn, "f(a, b)"), Err(SpanError::Partition { range: range(0, 7) }));

        assert!(matches!(validate(&tree, "f(a"), Err(SpanError::OutOfSource { .. })));
    }
}
