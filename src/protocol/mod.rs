//! Text formats for battlefield layouts.

pub mod layout;

pub use layout::{encode_layout, parse_layout, LayoutError};
