//! Turn-level tree search.
//!
//! Builds a minimax tree of whole turns, scores nodes with a greedy
//! lookahead, and grows it with evolutionary operators.

pub mod duplicate;
pub mod evaluator;
pub mod evolution;
pub mod node;
pub mod selector;
pub mod tbets;

pub use evaluator::evaluate;
pub use node::{side_to_move, Node, NodeId, NodeKind, Tree};
pub use tbets::{
    add_node, best_root_child, exploit, iterate, new_tree, run, seed_root, SearchContext, SearchStats, Step,
};
