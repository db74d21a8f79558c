//! Parser for the Python subset that model completions are evaluated on.

use treetrim_errors::Diagnostic;
use treetrim_syntax::Node;
use treetrim_syntax::layout::{layout, validate};

mod grammar;
mod parser;

#[derive(Debug, Clone)]
pub struct Parse {
    tree: Option<Node>,
    diagnostics: Vec<Diagnostic>,
}

impl Parse {
    /// The materialized tree, `None` for input without any node.
    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// The tree of an error-free parse.
    pub fn ok(self) -> Option<Node> {
        if self.has_errors() { None } else { self.tree }
    }
}

pub fn parse(text: &str) -> Parse {
    let mut parser = parser::Parser::new(text);
    grammar::stmts::module(&mut parser);
    let (mut tree, mut diagnostics) = parser.finish();

    if let Some(root) = &mut tree {
        layout(root, text);
        if let Err(error) = validate(root, text) {
            diagnostics.push(Diagnostic::error(error.to_string(), root.range));
        }
    }

    tracing::trace!(
        nodes = tree.as_ref().map_or(0, Node::total_nodes),
        errors = diagnostics.len(),
        "parsed"
    );
    Parse { tree, diagnostics }
}

/// Parses `code` into a node tree, or `None` when it does not parse.
pub fn get_node(code: &str) -> Option<Node> {
    parse(code).ok()
}

/// Node count of `code`, `-1` when it does not parse.
pub fn get_num_nodes_from_code(code: &str) -> i64 {
    let parse = parse(code);
    if parse.has_errors() {
        return -1;
    }
    parse.tree().map_or(0, |tree| tree.total_nodes() as i64)
}
