//! Battlefield state.
//!
//! A `Map` owns the terrain grid, every unit (indexed by `UnitId`), an
//! occupancy grid for O(1) tile lookup, and the turn counters. Terrain never
//! changes during a game, so clones share it through an `Arc`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::terrain::{Color, Pos, Terrain, ALL_COLORS};
use super::unit::{Unit, UnitId, UnitKind};

/// Which units `Map::units` yields for a given color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitQuery {
    /// Include units that already acted this turn.
    pub finished: bool,
    /// Include units that may still act.
    pub movable: bool,
    /// Select the opponent's units instead of the color's own.
    pub enemy: bool,
}

impl UnitQuery {
    pub const MOVABLE: UnitQuery = UnitQuery {
        finished: false,
        movable: true,
        enemy: false,
    };
    pub const OWN: UnitQuery = UnitQuery {
        finished: true,
        movable: true,
        enemy: false,
    };
    pub const ENEMY: UnitQuery = UnitQuery {
        finished: true,
        movable: true,
        enemy: true,
    };
}

/// Complete battlefield snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    width: u8,
    height: u8,
    terrain: Arc<Vec<Terrain>>,
    occupant: Vec<Option<UnitId>>,
    units: Vec<Option<Unit>>,
    turn: u32,
    turn_limit: u32,
    draw_hp_threshold: u32,
}

impl Map {
    /// Creates a map whose border is blocked and whose interior is plain.
    ///
    /// Panics if either dimension is smaller than 3.
    pub fn new(width: u8, height: u8, turn_limit: u32) -> Self {
        assert!(width >= 3 && height >= 3, "map must be at least 3x3");
        let mut terrain = vec![Terrain::Blocked; width as usize * height as usize];
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                terrain[y as usize * width as usize + x as usize] = Terrain::Plain;
            }
        }
        Map {
            width,
            height,
            terrain: Arc::new(terrain),
            occupant: vec![None; width as usize * height as usize],
            units: Vec::new(),
            turn: 0,
            turn_limit,
            draw_hp_threshold: 0,
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    fn idx(&self, pos: Pos) -> usize {
        pos.y as usize * self.width as usize + pos.x as usize
    }

    /// True if `pos` lies inside the grid.
    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// True if `pos` is a playable tile (inside the blocked border).
    pub fn is_interior(&self, pos: Pos) -> bool {
        pos.x >= 1 && pos.y >= 1 && pos.x + 1 < self.width && pos.y + 1 < self.height
    }

    /// Iterates every interior tile in row-major order.
    pub fn interior(&self) -> impl Iterator<Item = Pos> + '_ {
        (1..self.height - 1).flat_map(move |y| (1..self.width - 1).map(move |x| Pos::new(x, y)))
    }

    /// Terrain at `pos`. Out-of-bounds tiles read as blocked.
    pub fn terrain(&self, pos: Pos) -> Terrain {
        if self.in_bounds(pos) {
            self.terrain[self.idx(pos)]
        } else {
            Terrain::Blocked
        }
    }

    /// Sets the terrain of an interior tile. Border tiles stay blocked.
    pub fn set_terrain(&mut self, pos: Pos, terrain: Terrain) -> bool {
        if !self.is_interior(pos) {
            return false;
        }
        let idx = self.idx(pos);
        Arc::make_mut(&mut self.terrain)[idx] = terrain;
        true
    }

    /// Defensive stars a unit of `kind` enjoys on `pos`.
    pub fn defense_at(&self, pos: Pos, kind: UnitKind) -> u32 {
        if kind.is_air() {
            0
        } else {
            self.terrain(pos).defense()
        }
    }

    /// Places a new unit with full HP. Returns `None` if the tile is not
    /// interior or already occupied.
    pub fn add_unit(&mut self, kind: UnitKind, color: Color, pos: Pos) -> Option<UnitId> {
        if !self.is_interior(pos) || self.unit_at(pos).is_some() {
            return None;
        }
        let id = UnitId(self.units.len() as u16);
        self.units.push(Some(Unit::new(id, kind, color, pos)));
        let idx = self.idx(pos);
        self.occupant[idx] = Some(id);
        Some(id)
    }

    /// The unit with `id`, if it is still alive.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// The unit standing on `pos`, if any.
    pub fn unit_at(&self, pos: Pos) -> Option<&Unit> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.occupant[self.idx(pos)].and_then(|id| self.unit(id))
    }

    /// Every living unit in id order.
    pub fn all_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().flatten()
    }

    /// Living units selected by `query` relative to `color`, in id order.
    pub fn units(&self, color: Color, query: UnitQuery) -> impl Iterator<Item = &Unit> {
        let side = if query.enemy { color.opponent() } else { color };
        self.all_units().filter(move |u| {
            u.color == side && if u.finished { query.finished } else { query.movable }
        })
    }

    /// Copies of the units of `color` that may still act, in id order.
    pub fn movable_units(&self, color: Color) -> Vec<Unit> {
        self.units(color, UnitQuery::MOVABLE).copied().collect()
    }

    pub fn movable_count(&self, color: Color) -> usize {
        self.units(color, UnitQuery::MOVABLE).count()
    }

    pub fn alive_count(&self, color: Color) -> usize {
        self.units(color, UnitQuery::OWN).count()
    }

    /// Sum of the HP of every living unit of `color`.
    pub fn total_hp(&self, color: Color) -> u32 {
        self.units(color, UnitQuery::OWN).map(|u| u.hp).sum()
    }

    /// Moves a unit to `to`, updating occupancy.
    pub(crate) fn relocate(&mut self, id: UnitId, to: Pos) {
        let Some(from) = self.unit(id).map(|u| u.pos) else {
            return;
        };
        if from == to {
            return;
        }
        let (fi, ti) = (self.idx(from), self.idx(to));
        self.occupant[fi] = None;
        self.occupant[ti] = Some(id);
        if let Some(u) = self.unit_mut(id) {
            u.pos = to;
        }
    }

    /// Removes a destroyed unit from the board.
    pub(crate) fn remove_unit(&mut self, id: UnitId) {
        if let Some(u) = self.units.get_mut(id.index()).and_then(Option::take) {
            let idx = self.idx(u.pos);
            if self.occupant[idx] == Some(id) {
                self.occupant[idx] = None;
            }
        }
    }

    /// Makes every unit of `color` able to act again.
    pub fn enable_units(&mut self, color: Color) {
        for u in self.units.iter_mut().flatten() {
            if u.color == color {
                u.finished = false;
            }
        }
    }

    /// Marks every unit of `color` as having acted.
    pub fn finish_units(&mut self, color: Color) {
        for u in self.units.iter_mut().flatten() {
            if u.color == color {
                u.finished = true;
            }
        }
    }

    pub fn increment_turn(&mut self) {
        self.turn += 1;
    }

    /// Closes the current color's turn: every unit is re-enabled and the
    /// turn counter advances.
    pub fn end_turn(&mut self) {
        for c in ALL_COLORS {
            self.enable_units(c);
        }
        self.increment_turn();
    }

    pub fn turn_count(&self) -> u32 {
        self.turn
    }

    pub fn set_turn_count(&mut self, turn: u32) {
        self.turn = turn;
    }

    pub fn turn_limit(&self) -> u32 {
        self.turn_limit
    }

    pub fn draw_hp_threshold(&self) -> u32 {
        self.draw_hp_threshold
    }

    pub fn set_draw_hp_threshold(&mut self, threshold: u32) {
        self.draw_hp_threshold = threshold;
    }

    /// True once a team is wiped out or the turn limit is reached.
    pub fn is_terminal(&self) -> bool {
        self.alive_count(Color::Red) == 0
            || self.alive_count(Color::Blue) == 0
            || self.turn >= self.turn_limit
    }

    /// Adjudicates by remaining HP: a team wins only if it leads by more
    /// than the draw threshold.
    pub fn winner_by_hp(&self) -> Option<Color> {
        let red = self.total_hp(Color::Red);
        let blue = self.total_hp(Color::Blue);
        if red > blue + self.draw_hp_threshold {
            Some(Color::Red)
        } else if blue > red + self.draw_hp_threshold {
            Some(Color::Blue)
        } else {
            None
        }
    }

    /// Positional equivalence: same turn count and the same living units
    /// with the same kind, color, tile and HP. Finished flags are ignored.
    pub fn is_equivalent(&self, other: &Map) -> bool {
        if self.turn != other.turn {
            return false;
        }
        let mut a = self.all_units();
        let mut b = other.all_units();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if x.id != y.id
                        || x.kind != y.kind
                        || x.color != y.color
                        || x.pos != y.pos
                        || x.hp != y.hp
                    {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }

    /// Hash over exactly the fields `is_equivalent` compares. Units are
    /// visited in id order, so equal positions hash equally regardless of
    /// the order their actions were played in.
    pub fn content_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.turn.hash(&mut h);
        for u in self.all_units() {
            (u.id, u.kind, u.color, u.pos, u.hp).hash(&mut h);
        }
        h.finish()
    }
}
