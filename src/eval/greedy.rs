//! Deterministic one-turn policy used for lookahead.
//!
//! Plays a whole turn for one color without randomness: repeatedly take the
//! most valuable attack available, and when no attack is worth it, step the
//! lowest-id idle unit to the tile with the best defensive and offensive
//! prospects. Attack value weighs damage dealt by how threatening the target
//! is, minus counter-damage weighted by the attacker's remaining HP.

use crate::board::{Action, Color, Map, Unit, UnitQuery};
use crate::movegen::{all_attack_actions, attack_actions, is_legal, move_actions};
use crate::resolve::exchange;

/// Attacks scoring at or below this are not worth making.
const ATTACK_THRESHOLD: i64 = -20;

/// Base worth of any unit in attack scoring.
const BASE_WORTH: i64 = 10;

/// Most damage `enemy` could inflict on any unit of the other side this turn.
fn threat(map: &Map, enemy: &Unit) -> u32 {
    attack_actions(map, enemy)
        .iter()
        .filter_map(|a| {
            let target = map.unit(a.target()?)?;
            let to = a.destination()?;
            Some(exchange(map, enemy, to, target).dealt)
        })
        .max()
        .unwrap_or(0)
}

fn attack_value(map: &Map, action: &Action, threats: &[u32]) -> Option<i64> {
    let attacker = map.unit(action.unit()?)?;
    let target = map.unit(action.target()?)?;
    let damage = exchange(map, attacker, action.destination()?, target);
    if damage.dealt == 0 {
        return None;
    }
    let target_worth = BASE_WORTH + threats.get(target.id.index()).copied().unwrap_or(0) as i64;
    let attacker_worth = BASE_WORTH + attacker.hp as i64;
    Some(damage.dealt as i64 * target_worth - damage.counter as i64 * attacker_worth)
}

fn best_attack(map: &Map, color: Color, threats: &[u32]) -> Option<Action> {
    let mut best: Option<(i64, Action)> = None;
    for action in all_attack_actions(map, color) {
        if !is_legal(&action, map) {
            continue;
        }
        let Some(value) = attack_value(map, &action, threats) else {
            continue;
        };
        if value > ATTACK_THRESHOLD && best.map_or(true, |(v, _)| value > v) {
            best = Some((value, action));
        }
    }
    best.map(|(_, a)| a)
}

/// Integer positional score: terrain defense plus the strongest pull toward
/// an enemy this unit can hurt.
fn positional_move(map: &Map, unit: &Unit, enemies: &[Unit]) -> Action {
    let mut best: Option<(i64, Action)> = None;
    for action in move_actions(map, unit) {
        let Some(to) = action.destination() else {
            continue;
        };
        if !is_legal(&action, map) {
            continue;
        }
        let defense = map.defense_at(to, unit.kind) as i64;
        let score = enemies
            .iter()
            .map(|e| defense * 5 + unit.kind.attack_power(e.kind) as i64 / (to.distance(e.pos) as i64 + 5))
            .max()
            .unwrap_or(defense * 5);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, action));
        }
    }
    best.map(|(_, a)| a).unwrap_or_else(|| Action::stay(unit))
}

/// Plays one turn for `color` on `map` in place and returns the actions
/// taken. The turn is not ended; callers decide how to close it.
pub fn greedy_turn(map: &mut Map, color: Color) -> Vec<Action> {
    let enemies: Vec<Unit> = map.units(color, UnitQuery::ENEMY).copied().collect();
    let mut threats = vec![0u32; map.all_units().map(|u| u.id.index() + 1).max().unwrap_or(0)];
    for enemy in &enemies {
        threats[enemy.id.index()] = threat(map, enemy);
    }

    let mut actions = Vec::new();
    loop {
        let Some(idle) = map.units(color, UnitQuery::MOVABLE).next().copied() else {
            break;
        };
        let action = best_attack(map, color, &threats).unwrap_or_else(|| positional_move(map, &idle, &enemies));
        if let Err(e) = map.apply_action(&action) {
            panic!("greedy turn produced illegal action {action}: {e}");
        }
        actions.push(action);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Pos, Terrain, UnitId, UnitKind};

    #[test]
    fn every_idle_unit_acts_once() {
        let mut map = Map::new(10, 10, 30);
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(1, 1)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(2, 1)).unwrap();
        map.add_unit(UnitKind::Cannon, Color::Red, Pos::new(1, 3)).unwrap();
        map.add_unit(UnitKind::Panzer, Color::Blue, Pos::new(8, 8)).unwrap();
        let actions = greedy_turn(&mut map, Color::Red);
        assert_eq!(actions.len(), 3);
        assert_eq!(map.movable_count(Color::Red), 0);
        assert_eq!(map.movable_count(Color::Blue), 1);
    }

    #[test]
    fn is_deterministic() {
        let mut map = Map::new(10, 10, 30);
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Attacker, Color::Red, Pos::new(3, 3)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(6, 4)).unwrap();
        map.add_unit(UnitKind::AntiAir, Color::Blue, Pos::new(7, 7)).unwrap();
        let mut a = map.clone();
        let mut b = map.clone();
        assert_eq!(greedy_turn(&mut a, Color::Red), greedy_turn(&mut b, Color::Red));
        assert_eq!(a, b);
    }

    #[test]
    fn prefers_attacking_a_reachable_target() {
        let mut map = Map::new(10, 10, 30);
        map.add_unit(UnitKind::Attacker, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(4, 2)).unwrap();
        let actions = greedy_turn(&mut map, Color::Red);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].target(), Some(UnitId(1)));
    }

    #[test]
    fn retreats_to_cover_when_nothing_to_attack() {
        // infantry cannot hurt the fighter, so it looks for defensive ground
        let mut map = Map::new(6, 3, 30);
        map.set_terrain(Pos::new(2, 1), Terrain::Forest);
        map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(1, 1)).unwrap();
        map.add_unit(UnitKind::Fighter, Color::Blue, Pos::new(4, 1)).unwrap();
        let actions = greedy_turn(&mut map, Color::Red);
        assert_eq!(actions[0].destination(), Some(Pos::new(2, 1)));
    }
}
