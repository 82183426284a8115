//! Action resolution.
//!
//! Applies a single legal action to a map: relocation, damage exchange,
//! removal of destroyed units, and bookkeeping of which units have acted.

pub mod damage;

pub use damage::{exchange, raw_damage};

use crate::board::{Action, Damage, Map};
use crate::movegen::legality::{check_action, IllegalAction};

/// Applies `action` to `map` after checking it is legal. Returns the damage
/// exchanged, which is zero for everything but attacks.
pub fn apply_action(map: &mut Map, action: &Action) -> Result<Damage, IllegalAction> {
    check_action(action, map)?;
    Ok(apply_unchecked(map, action))
}

/// Applies an action already known to be legal.
fn apply_unchecked(map: &mut Map, action: &Action) -> Damage {
    match *action {
        Action::Move { unit, to, .. } => {
            map.relocate(unit, to);
            if let Some(u) = map.unit_mut(unit) {
                u.finished = true;
            }
            Damage::default()
        }
        Action::Attack { unit, to, target, .. } => {
            map.relocate(unit, to);
            let (Some(attacker), Some(defender)) = (map.unit(unit).copied(), map.unit(target).copied()) else {
                return Damage::default();
            };
            let damage = exchange(map, &attacker, to, &defender);

            if defender.hp <= damage.dealt {
                map.remove_unit(target);
            } else if let Some(d) = map.unit_mut(target) {
                d.hp -= damage.dealt;
            }
            if attacker.hp <= damage.counter {
                map.remove_unit(unit);
            } else if let Some(a) = map.unit_mut(unit) {
                a.hp -= damage.counter;
                a.finished = true;
            }
            damage
        }
        Action::EndTurn { color } => {
            map.finish_units(color);
            Damage::default()
        }
        Action::Surrender { .. } => Damage::default(),
    }
}

impl Map {
    /// Checked application of `action`; see [`apply_action`].
    pub fn apply_action(&mut self, action: &Action) -> Result<Damage, IllegalAction> {
        apply_action(self, action)
    }
}
