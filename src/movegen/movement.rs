//! Reachability and per-unit action enumeration.

use crate::board::{Action, Color, Map, Pos, Unit, UnitQuery};

/// Tiles a unit can end its move on this turn.
#[derive(Debug, Clone)]
pub struct Reach {
    width: usize,
    cells: Vec<bool>,
}

impl Reach {
    pub fn contains(&self, pos: Pos) -> bool {
        self.cells
            .get(pos.y as usize * self.width + pos.x as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Reachable tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells.iter().enumerate().filter(|(_, &r)| r).map(|(i, _)| {
            Pos::new((i % self.width) as u8, (i / self.width) as u8)
        })
    }
}

/// Computes the tiles `unit` may end on.
///
/// Expansion is bucketed by remaining movement points, highest first, so a
/// tile is always settled with the most points it can be reached with.
/// Enemy units block passage; friendly units can be passed through but not
/// ended on. The unit's own tile is always reachable.
pub fn reachable(map: &Map, unit: &Unit) -> Reach {
    let width = map.width() as usize;
    let mut seen = vec![false; width * map.height() as usize];
    let step = unit.kind.step() as usize;
    let mut buckets: Vec<Vec<Pos>> = vec![Vec::new(); step + 1];

    let at = |p: Pos| p.y as usize * width + p.x as usize;
    seen[at(unit.pos)] = true;
    buckets[step].push(unit.pos);

    for rest in (1..=step).rev() {
        let mut i = 0;
        while i < buckets[rest].len() {
            let pos = buckets[rest][i];
            i += 1;
            for next in pos.neighbors() {
                if !map.in_bounds(next) {
                    continue;
                }
                let cost = unit.kind.move_cost(map.terrain(next)) as usize;
                if cost > rest {
                    continue;
                }
                if map.unit_at(next).is_some_and(|u| u.color != unit.color) {
                    continue;
                }
                if !seen[at(next)] {
                    seen[at(next)] = true;
                    buckets[rest - cost].push(next);
                }
            }
        }
    }

    for u in map.units(unit.color, UnitQuery::OWN) {
        seen[at(u.pos)] = false;
    }
    seen[at(unit.pos)] = true;

    Reach { width, cells: seen }
}

/// True if `attacker` can hit `target` when standing on `from`.
pub fn in_attack_range(attacker: &Unit, from: Pos, target: &Unit) -> bool {
    let (min, max) = attacker.kind.range();
    let dist = from.distance(target.pos);
    if !attacker.kind.is_direct() && from != attacker.pos {
        return false;
    }
    min <= dist && dist <= max
}

/// Stay-in-place plus a move to every other reachable tile.
pub fn move_actions(map: &Map, unit: &Unit) -> Vec<Action> {
    let reach = reachable(map, unit);
    let mut actions = vec![Action::stay(unit)];
    actions.extend(
        reach
            .tiles()
            .filter(|&p| p != unit.pos && map.is_interior(p))
            .map(|p| Action::move_to(unit, p)),
    );
    actions
}

/// Every attack `unit` can make this turn.
///
/// Direct units may strike from any reachable tile orthogonally adjacent to
/// an enemy; indirect units fire from where they stand. Targets the unit
/// cannot damage at all are skipped.
pub fn attack_actions(map: &Map, unit: &Unit) -> Vec<Action> {
    let mut actions = Vec::new();
    let enemies = map
        .units(unit.color, UnitQuery::ENEMY)
        .filter(|e| unit.kind.attack_power(e.kind) > 0);

    if unit.kind.is_direct() {
        let reach = reachable(map, unit);
        for enemy in enemies {
            for tile in enemy.pos.neighbors() {
                if reach.contains(tile) && map.is_interior(tile) {
                    actions.push(Action::attack(unit, tile, enemy));
                }
            }
        }
    } else {
        for enemy in enemies {
            if in_attack_range(unit, unit.pos, enemy) {
                actions.push(Action::attack(unit, unit.pos, enemy));
            }
        }
    }
    actions
}

/// Every attack available to the movable units of `color`.
pub fn all_attack_actions(map: &Map, color: Color) -> Vec<Action> {
    map.units(color, UnitQuery::MOVABLE)
        .flat_map(|u| attack_actions(map, u))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Terrain, UnitId, UnitKind};

    fn open_map() -> Map {
        Map::new(9, 9, 30)
    }

    #[test]
    fn infantry_reach_on_open_ground() {
        let mut map = open_map();
        let id = map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(4, 4)).unwrap();
        let unit = *map.unit(id).unwrap();
        let reach = reachable(&map, &unit);
        // step 3 on plain: diamond of radius 3 clipped to the 7x7 interior
        assert!(reach.contains(Pos::new(4, 4)));
        assert!(reach.contains(Pos::new(1, 4)));
        assert!(reach.contains(Pos::new(5, 6)));
        assert!(!reach.contains(Pos::new(1, 1)));
        assert!(!reach.contains(Pos::new(0, 4)));
        assert!(reach.tiles().all(|p| p.distance(unit.pos) <= 3));
    }

    #[test]
    fn terrain_costs_limit_reach() {
        let mut map = open_map();
        map.set_terrain(Pos::new(5, 4), Terrain::Mountain);
        map.set_terrain(Pos::new(3, 4), Terrain::Sea);
        let id = map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(4, 4)).unwrap();
        let unit = *map.unit(id).unwrap();
        let reach = reachable(&map, &unit);
        assert!(!reach.contains(Pos::new(5, 4)));
        assert!(!reach.contains(Pos::new(3, 4)));
        // still reachable around the obstacles
        assert!(reach.contains(Pos::new(6, 4)));
    }

    #[test]
    fn enemies_block_friends_pass() {
        let mut map = Map::new(9, 3, 30);
        let me = map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(1, 1)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(2, 1)).unwrap();
        let unit = *map.unit(me).unwrap();
        let reach = reachable(&map, &unit);
        assert!(!reach.contains(Pos::new(2, 1)), "cannot end on a friend");
        assert!(reach.contains(Pos::new(3, 1)), "can pass a friend");

        let mut blocked = Map::new(9, 3, 30);
        let me = blocked.add_unit(UnitKind::Infantry, Color::Red, Pos::new(1, 1)).unwrap();
        blocked.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(2, 1)).unwrap();
        let unit = *blocked.unit(me).unwrap();
        let reach = reachable(&blocked, &unit);
        assert!(!reach.contains(Pos::new(3, 1)));
        assert_eq!(reach.tiles().count(), 1);
    }

    #[test]
    fn move_actions_start_with_stay() {
        let mut map = open_map();
        let id = map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(4, 4)).unwrap();
        let unit = *map.unit(id).unwrap();
        let moves = move_actions(&map, &unit);
        assert_eq!(moves[0], Action::stay(&unit));
        assert_eq!(moves.len(), reachable(&map, &unit).tiles().count());
    }

    #[test]
    fn direct_attack_from_adjacent_tiles() {
        let mut map = open_map();
        let me = map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(4, 2)).unwrap();
        let unit = *map.unit(me).unwrap();
        let attacks = attack_actions(&map, &unit);
        assert_eq!(attacks.len(), 4);
        for a in &attacks {
            assert_eq!(a.target(), Some(UnitId(1)));
            assert_eq!(a.destination().unwrap().distance(Pos::new(4, 2)), 1);
        }
    }

    #[test]
    fn indirect_attack_only_in_range_from_current_tile() {
        let mut map = open_map();
        let me = map.add_unit(UnitKind::Cannon, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(3, 2)).unwrap();
        map.add_unit(UnitKind::Panzer, Color::Blue, Pos::new(4, 3)).unwrap();
        map.add_unit(UnitKind::Panzer, Color::Blue, Pos::new(7, 7)).unwrap();
        let unit = *map.unit(me).unwrap();
        let attacks = attack_actions(&map, &unit);
        assert_eq!(attacks.len(), 1);
        assert_eq!(attacks[0].target(), Some(UnitId(2)));
        assert_eq!(attacks[0].destination(), Some(Pos::new(2, 2)));
    }

    #[test]
    fn harmless_targets_are_skipped() {
        let mut map = open_map();
        let me = map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Fighter, Color::Blue, Pos::new(3, 2)).unwrap();
        let unit = *map.unit(me).unwrap();
        assert!(attack_actions(&map, &unit).is_empty());
    }

    #[test]
    fn all_attacks_ignore_finished_units() {
        let mut map = open_map();
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(6, 6)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(3, 2)).unwrap();
        let before = all_attack_actions(&map, Color::Red).len();
        map.unit_mut(UnitId(0)).unwrap().finished = true;
        let after = all_attack_actions(&map, Color::Red);
        assert!(after.len() < before);
        assert!(after.iter().all(|a| a.unit() == Some(UnitId(1))));
    }
}
