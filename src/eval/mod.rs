//! Position evaluation.
//!
//! Static material scoring of a map, and the deterministic greedy turn
//! policy the search uses for its cheap two-ply lookahead.

pub mod greedy;
pub(crate) mod heuristic;

pub use greedy::greedy_turn;
pub use heuristic::evaluate;
