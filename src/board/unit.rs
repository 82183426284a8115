//! Unit kinds, their static combat tables, and unit instances.

use serde::{Deserialize, Serialize};

use super::terrain::{Color, Pos, Terrain, TERRAIN_COUNT};

/// Hit points every unit starts with.
pub const MAX_HP: u32 = 10;

/// Move cost that no unit can pay.
pub const IMPASSABLE: u32 = 99;

/// Stable identifier of a unit within one map. Ids index `Map::units`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u16);

impl UnitId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The type of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Fighter,
    Attacker,
    Panzer,
    Cannon,
    AntiAir,
    Infantry,
}

/// All unit kinds in table order.
pub const ALL_KINDS: [UnitKind; 6] = [
    UnitKind::Fighter,
    UnitKind::Attacker,
    UnitKind::Panzer,
    UnitKind::Cannon,
    UnitKind::AntiAir,
    UnitKind::Infantry,
];

/// Attack power indexed by `[attacker][target]`.
const ATTACK_POWER: [[u32; 6]; 6] = [
    [55, 65, 0, 0, 0, 0],
    [0, 0, 105, 105, 85, 115],
    [0, 0, 55, 70, 75, 75],
    [0, 0, 60, 75, 65, 90],
    [70, 70, 15, 50, 45, 105],
    [0, 0, 5, 10, 3, 55],
];

/// Move cost indexed by `[kind][terrain]`.
const MOVE_COST: [[u32; TERRAIN_COUNT]; 6] = [
    [IMPASSABLE, 1, 1, 1, 1, 1, 1],
    [IMPASSABLE, 1, 1, 1, 1, 1, 1],
    [IMPASSABLE, 1, IMPASSABLE, 2, IMPASSABLE, 1, 1],
    [IMPASSABLE, 1, IMPASSABLE, 2, IMPASSABLE, 1, 1],
    [IMPASSABLE, 1, IMPASSABLE, 2, IMPASSABLE, 1, 1],
    [IMPASSABLE, 1, IMPASSABLE, 1, 2, 1, 1],
];

impl UnitKind {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Movement points available per turn.
    pub const fn step(self) -> u32 {
        match self {
            UnitKind::Fighter => 9,
            UnitKind::Attacker => 7,
            UnitKind::Panzer => 6,
            UnitKind::Cannon => 5,
            UnitKind::AntiAir => 6,
            UnitKind::Infantry => 3,
        }
    }

    /// Inclusive Manhattan attack range.
    pub const fn range(self) -> (u32, u32) {
        match self {
            UnitKind::Cannon => (2, 3),
            _ => (1, 1),
        }
    }

    /// Direct-attack units may move before attacking and counterattack.
    pub const fn is_direct(self) -> bool {
        !matches!(self, UnitKind::Cannon)
    }

    /// Air units ignore terrain defense.
    pub const fn is_air(self) -> bool {
        matches!(self, UnitKind::Fighter | UnitKind::Attacker)
    }

    /// Base attack power of this kind against `target`.
    pub const fn attack_power(self, target: UnitKind) -> u32 {
        ATTACK_POWER[self.index()][target.index()]
    }

    /// Movement points consumed entering a tile of `terrain`.
    pub const fn move_cost(self, terrain: Terrain) -> u32 {
        MOVE_COST[self.index()][terrain.index()]
    }

    /// Material weight of one hit point of this kind.
    pub const fn value(self) -> f64 {
        match self {
            UnitKind::Fighter => 4.0,
            UnitKind::Attacker => 6.0,
            UnitKind::Panzer => 4.0,
            UnitKind::Cannon => 4.0,
            UnitKind::AntiAir => 2.5,
            UnitKind::Infantry => 1.0,
        }
    }

    /// Returns the lowercase name used in layouts.
    pub const fn name(self) -> &'static str {
        match self {
            UnitKind::Fighter => "fighter",
            UnitKind::Attacker => "attacker",
            UnitKind::Panzer => "panzer",
            UnitKind::Cannon => "cannon",
            UnitKind::AntiAir => "antiair",
            UnitKind::Infantry => "infantry",
        }
    }

    /// Parses a unit kind from its lowercase name.
    pub fn from_name(name: &str) -> Option<UnitKind> {
        ALL_KINDS.iter().copied().find(|k| k.name() == name)
    }
}

/// A unit on the battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub color: Color,
    pub pos: Pos,
    pub hp: u32,
    /// Set once the unit has acted this turn.
    pub finished: bool,
}

impl Unit {
    pub fn new(id: UnitId, kind: UnitKind, color: Color, pos: Pos) -> Self {
        Unit {
            id,
            kind,
            color,
            pos,
            hp: MAX_HP,
            finished: false,
        }
    }

    /// True if the unit may still act this turn.
    pub fn is_movable(&self) -> bool {
        !self.finished
    }
}
