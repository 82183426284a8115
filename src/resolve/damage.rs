//! Combat damage.

use crate::board::{Damage, Map, Pos, Unit, UnitKind};

/// Damage dealt by a unit of `kind` with `hp` to a target of `target_kind`
/// with `target_hp` defended by `target_stars`. Air targets never benefit
/// from terrain.
pub fn raw_damage(kind: UnitKind, hp: u32, target_kind: UnitKind, target_hp: u32, target_stars: u32) -> u32 {
    let stars = if target_kind.is_air() { 0 } else { target_stars };
    let power = kind.attack_power(target_kind);
    let dmg = (power * hp + 70) / (100 + stars * target_hp);
    dmg.min(target_hp)
}

/// Damage exchanged when `attacker`, standing on `from`, attacks `target`.
///
/// A surviving target counterattacks only when both sides are direct-attack
/// units, using its remaining HP against the attacker's footing on `from`.
pub fn exchange(map: &Map, attacker: &Unit, from: Pos, target: &Unit) -> Damage {
    let target_stars = map.terrain(target.pos).defense();
    let dealt = raw_damage(attacker.kind, attacker.hp, target.kind, target.hp, target_stars);

    let remaining = target.hp - dealt;
    let counter = if remaining > 0 && attacker.kind.is_direct() && target.kind.is_direct() {
        let attacker_stars = map.terrain(from).defense();
        raw_damage(target.kind, remaining, attacker.kind, attacker.hp, attacker_stars)
    } else {
        0
    };

    Damage { dealt, counter }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Color, Terrain};

    #[test]
    fn formula_matches_reference_values() {
        // (75 * 10 + 70) / (100 + 1 * 10) = 7
        assert_eq!(raw_damage(UnitKind::Panzer, 10, UnitKind::Infantry, 10, 1), 7);
        // capped at the target's HP
        assert_eq!(raw_damage(UnitKind::Attacker, 10, UnitKind::Infantry, 3, 0), 3);
        // zero power still rounds down to nothing
        assert_eq!(raw_damage(UnitKind::Infantry, 10, UnitKind::Fighter, 10, 0), 0);
    }

    #[test]
    fn air_targets_ignore_terrain() {
        let on_plain = raw_damage(UnitKind::AntiAir, 10, UnitKind::Fighter, 10, 0);
        let on_mountain = raw_damage(UnitKind::AntiAir, 10, UnitKind::Fighter, 10, 4);
        assert_eq!(on_plain, on_mountain);
    }

    #[test]
    fn counterattack_rules() {
        let mut map = Map::new(9, 9, 30);
        map.set_terrain(Pos::new(3, 2), Terrain::Forest);
        let p = map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        let i = map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(4, 2)).unwrap();
        let c = map.add_unit(UnitKind::Cannon, Color::Red, Pos::new(4, 4)).unwrap();
        let panzer = *map.unit(p).unwrap();
        let infantry = *map.unit(i).unwrap();
        let cannon = *map.unit(c).unwrap();

        let d = exchange(&map, &panzer, Pos::new(3, 2), &infantry);
        assert_eq!(d.dealt, 7);
        // 3 HP infantry vs panzer on forest: (5 * 3 + 70) / (100 + 3 * 10) = 0
        assert_eq!(d.counter, 0);

        let d = exchange(&map, &cannon, cannon.pos, &infantry);
        assert!(d.dealt > 0);
        assert_eq!(d.counter, 0, "indirect attacks are never answered");

        let mut weak = infantry;
        weak.hp = 2;
        let d = exchange(&map, &panzer, Pos::new(3, 2), &weak);
        assert_eq!(d.dealt, 2);
        assert_eq!(d.counter, 0, "destroyed targets do not answer");
    }
}
