//! Action legality.

use crate::board::{Action, Color, Map, Pos, UnitId};

use super::movement::{in_attack_range, reachable};

/// Why an action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IllegalAction {
    #[error("unit {0} does not exist")]
    NoSuchUnit(UnitId),

    #[error("unit {unit} belongs to {owner}, not {actor}")]
    WrongColor { unit: UnitId, owner: Color, actor: Color },

    #[error("unit {0} has already acted this turn")]
    AlreadyFinished(UnitId),

    #[error("destination {0} is outside the playable area")]
    OutOfBounds(Pos),

    #[error("destination {0} is occupied")]
    Occupied(Pos),

    #[error("destination {0} is out of reach")]
    Unreachable(Pos),

    #[error("target {0} does not exist")]
    NoSuchTarget(UnitId),

    #[error("target {0} is not an enemy")]
    FriendlyTarget(UnitId),

    #[error("target {target} is out of range from {from}")]
    OutOfRange { target: UnitId, from: Pos },
}

/// Checks `action` against `map`, reporting the first rule it breaks.
pub fn check_action(action: &Action, map: &Map) -> Result<(), IllegalAction> {
    let (unit_id, color, to, target) = match *action {
        Action::EndTurn { .. } | Action::Surrender { .. } => return Ok(()),
        Action::Move { unit, color, to, .. } => (unit, color, to, None),
        Action::Attack {
            unit,
            color,
            to,
            target,
            ..
        } => (unit, color, to, Some(target)),
    };

    let unit = map.unit(unit_id).ok_or(IllegalAction::NoSuchUnit(unit_id))?;
    if unit.color != color {
        return Err(IllegalAction::WrongColor {
            unit: unit_id,
            owner: unit.color,
            actor: color,
        });
    }
    if unit.finished {
        return Err(IllegalAction::AlreadyFinished(unit_id));
    }
    if !map.is_interior(to) {
        return Err(IllegalAction::OutOfBounds(to));
    }
    if map.unit_at(to).is_some_and(|u| u.id != unit_id) {
        return Err(IllegalAction::Occupied(to));
    }
    if !reachable(map, unit).contains(to) {
        return Err(IllegalAction::Unreachable(to));
    }

    if let Some(target_id) = target {
        let target = map.unit(target_id).ok_or(IllegalAction::NoSuchTarget(target_id))?;
        if target.color == unit.color {
            return Err(IllegalAction::FriendlyTarget(target_id));
        }
        if !in_attack_range(unit, to, target) {
            return Err(IllegalAction::OutOfRange {
                target: target_id,
                from: to,
            });
        }
    }

    Ok(())
}

/// True if `action` may be applied to `map`.
pub fn is_legal(action: &Action, map: &Map) -> bool {
    check_action(action, map).is_ok()
}
