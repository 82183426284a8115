//! Actions a team can take during its turn.
//!
//! A turn is played one unit at a time: each unit either moves, moves and
//! attacks, or stays put (a move to its own tile). A team may also end its
//! turn early or surrender.

use serde::{Deserialize, Serialize};

use super::terrain::{Color, Pos};
use super::unit::{Unit, UnitId};

/// Damage exchanged by one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Damage {
    pub dealt: u32,
    pub counter: u32,
}

/// A single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Move `unit` from `from` to `to`. `from == to` means stay in place.
    Move {
        unit: UnitId,
        color: Color,
        from: Pos,
        to: Pos,
    },

    /// Move `unit` to `to`, then attack `target` standing on `target_pos`.
    Attack {
        unit: UnitId,
        color: Color,
        from: Pos,
        to: Pos,
        target: UnitId,
        target_pos: Pos,
    },

    /// Finish every unit of `color` that has not acted yet.
    EndTurn { color: Color },

    /// Concede the game.
    Surrender { color: Color },
}

impl Action {
    /// Builds the stay-in-place move for `unit`.
    pub fn stay(unit: &Unit) -> Action {
        Action::Move {
            unit: unit.id,
            color: unit.color,
            from: unit.pos,
            to: unit.pos,
        }
    }

    /// Builds a move of `unit` to `to`.
    pub fn move_to(unit: &Unit, to: Pos) -> Action {
        Action::Move {
            unit: unit.id,
            color: unit.color,
            from: unit.pos,
            to,
        }
    }

    /// Builds a move of `unit` to `to` followed by an attack on `target`.
    pub fn attack(unit: &Unit, to: Pos, target: &Unit) -> Action {
        Action::Attack {
            unit: unit.id,
            color: unit.color,
            from: unit.pos,
            to,
            target: target.id,
            target_pos: target.pos,
        }
    }

    /// The team performing the action.
    pub fn color(&self) -> Color {
        match *self {
            Action::Move { color, .. }
            | Action::Attack { color, .. }
            | Action::EndTurn { color }
            | Action::Surrender { color } => color,
        }
    }

    /// The acting unit, if any.
    pub fn unit(&self) -> Option<UnitId> {
        match *self {
            Action::Move { unit, .. } | Action::Attack { unit, .. } => Some(unit),
            Action::EndTurn { .. } | Action::Surrender { .. } => None,
        }
    }

    /// The tile the acting unit ends on, if any.
    pub fn destination(&self) -> Option<Pos> {
        match *self {
            Action::Move { to, .. } | Action::Attack { to, .. } => Some(to),
            Action::EndTurn { .. } | Action::Surrender { .. } => None,
        }
    }

    /// The attacked unit, if any.
    pub fn target(&self) -> Option<UnitId> {
        match *self {
            Action::Attack { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_attack(&self) -> bool {
        matches!(self, Action::Attack { .. })
    }

    /// True if both actions have the same kind, unit, destination and
    /// target. Origins are ignored.
    pub fn matches(&self, other: &Action) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.unit() == other.unit()
            && self.destination() == other.destination()
            && self.target() == other.target()
            && self.color() == other.color()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Move { unit, from, to, .. } if from == to => write!(f, "{unit} stay {to}"),
            Action::Move { unit, from, to, .. } => write!(f, "{unit} {from}-{to}"),
            Action::Attack {
                unit,
                from,
                to,
                target,
                ..
            } => write!(f, "{unit} {from}-{to} x {target}"),
            Action::EndTurn { color } => write!(f, "{color} end"),
            Action::Surrender { color } => write!(f, "{color} surrender"),
        }
    }
}

/// True if two bundles are identical action for action.
pub fn same_bundle(a: &[Action], b: &[Action]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
}
