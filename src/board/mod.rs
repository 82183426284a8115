//! Battlefield representation.
//!
//! Contains terrain and coordinates, unit kinds with their combat tables,
//! actions, and the overall map state.

pub mod action;
pub mod state;
pub mod terrain;
pub mod unit;

pub use action::{same_bundle, Action, Damage};
pub use state::{Map, UnitQuery};
pub use terrain::{Color, Pos, Terrain, ALL_COLORS};
pub use unit::{Unit, UnitId, UnitKind, ALL_KINDS, MAX_HP};
