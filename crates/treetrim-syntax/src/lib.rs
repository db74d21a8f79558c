//! Tree model shared by the parser, cost attribution and the pruning engines.

mod arena;
mod index;
pub mod layout;
mod node;
mod record;
mod syntax_kind;
mod syntax_set;

pub use arena::{Idx, IdxMap};
pub use index::{NodeId, TreeIndex};
pub use node::{MAX_NODE_COST, Node, Preorder};
pub use record::{NodeRecord, RecordError};
pub use syntax_kind::SyntaxKind;
pub use syntax_set::SyntaxSet;
pub use text_size::{TextRange, TextSize};
