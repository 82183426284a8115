//! Static material evaluation.
//!
//! Scores a map from one color's perspective as a blend of two shares: the
//! HP-weighted material share (weights per unit kind) and the plain
//! unit-count share. A wiped-out side scores exactly 0.0 or 1.0.

use crate::board::{Color, Map, UnitQuery};

/// Weight of the material share; the unit-count share gets the rest.
const MATERIAL_WEIGHT: f64 = 0.7;

fn material(map: &Map, color: Color) -> f64 {
    map.units(color, UnitQuery::OWN)
        .map(|u| u.kind.value() * u.hp as f64)
        .sum()
}

/// Evaluates `map` for `color` in `[0, 1]`; 0.5 means an even position.
pub fn evaluate(map: &Map, color: Color) -> f64 {
    let own = map.alive_count(color);
    let enemy = map.alive_count(color.opponent());
    if own == 0 {
        return 0.0;
    }
    if enemy == 0 {
        return 1.0;
    }

    let own_value = material(map, color);
    let enemy_value = material(map, color.opponent());
    let value_ratio = own_value / (own_value + enemy_value);
    let unit_ratio = own as f64 / (own + enemy) as f64;

    MATERIAL_WEIGHT * value_ratio + (1.0 - MATERIAL_WEIGHT) * unit_ratio
}
