//! TBETS engine library.
//!
//! Exposes the battlefield model, rules, move generation, layouts, the
//! turn-level evolutionary tree search and the engine entry point for use by
//! integration tests and the self-play binary.

pub mod board;
pub mod config;
pub mod engine;
pub mod eval;
pub mod logging;
pub mod movegen;
pub mod protocol;
pub mod resolve;
pub mod search;
pub mod selfplay;
