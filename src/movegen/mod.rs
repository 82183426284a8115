//! Legal action generation.
//!
//! Enumerates reachable tiles and attacks for a unit, checks legality, and
//! draws attack-biased random actions for whole turns.

pub mod legality;
pub mod movement;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::{Action, Color, Map, Unit};

pub use legality::{check_action, is_legal, IllegalAction};
pub use movement::{all_attack_actions, attack_actions, in_attack_range, move_actions, reachable, Reach};

/// Picks a random legal action for `unit`.
///
/// With probability `attack_bias` a uniformly random legal attack is tried
/// first; otherwise, or when no attack exists, a uniformly random legal move
/// (staying put included). Falls back to staying put. A unit that already
/// acted gets a stay action.
pub fn biased_action(unit: &Unit, map: &Map, attack_bias: f64, rng: &mut impl Rng) -> Action {
    if unit.finished {
        return Action::stay(unit);
    }

    if rng.gen_bool(attack_bias) {
        let attacks: Vec<Action> = attack_actions(map, unit)
            .into_iter()
            .filter(|a| is_legal(a, map))
            .collect();
        if let Some(a) = attacks.choose(rng) {
            return *a;
        }
    }

    let moves: Vec<Action> = move_actions(map, unit)
        .into_iter()
        .filter(|a| is_legal(a, map))
        .collect();
    moves.choose(rng).copied().unwrap_or_else(|| Action::stay(unit))
}

/// Draws one action for every unit in `units`, in order.
///
/// Each action is applied to a scratch copy of `map` before the next unit is
/// considered, so later units see earlier moves. The result always has
/// exactly `units.len()` entries.
pub fn random_actions(map: &Map, units: &[Unit], attack_bias: f64, rng: &mut impl Rng) -> Vec<Action> {
    let mut sim = map.clone();
    let mut actions = Vec::with_capacity(units.len());

    for snapshot in units {
        let action = match sim.unit(snapshot.id).copied() {
            Some(unit) => biased_action(&unit, &sim, attack_bias, rng),
            None => Action::stay(snapshot),
        };
        if let Err(e) = sim.apply_action(&action) {
            log::trace!("scratch map skipped {action}: {e}");
        }
        actions.push(action);
    }

    actions
}

/// Draws a complete random turn for every movable unit of `color`.
pub fn random_turn(map: &Map, color: Color, attack_bias: f64, rng: &mut impl Rng) -> Vec<Action> {
    let units = map.movable_units(color);
    random_actions(map, &units, attack_bias, rng)
}
