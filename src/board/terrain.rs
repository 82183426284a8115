//! Terrain, grid coordinates, and team colors.
//!
//! The battlefield is a rectangular grid whose outermost ring is always
//! `Terrain::Blocked`, so every playable tile has four in-bounds neighbors.

use serde::{Deserialize, Serialize};

/// One of the two teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
}

/// Both colors in index order.
pub const ALL_COLORS: [Color; 2] = [Color::Red, Color::Blue];

impl Color {
    /// Returns the stable array index (Red = 0, Blue = 1).
    pub const fn index(self) -> usize {
        match self {
            Color::Red => 0,
            Color::Blue => 1,
        }
    }

    /// Returns the other team.
    pub const fn opponent(self) -> Color {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }

    /// Returns the lowercase name used in layouts and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
        }
    }

    /// Parses a color from its lowercase name.
    pub fn from_name(name: &str) -> Option<Color> {
        match name {
            "red" => Some(Color::Red),
            "blue" => Some(Color::Blue),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ground type of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terrain {
    Blocked,
    Plain,
    Sea,
    Forest,
    Mountain,
    Road,
    Castle,
}

/// Number of terrain variants, used to size per-terrain tables.
pub const TERRAIN_COUNT: usize = 7;

impl Terrain {
    /// Returns the table index of this terrain.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Defensive stars granted to a ground unit standing on this terrain.
    pub const fn defense(self) -> u32 {
        match self {
            Terrain::Blocked => 0,
            Terrain::Plain => 1,
            Terrain::Sea => 0,
            Terrain::Forest => 3,
            Terrain::Mountain => 4,
            Terrain::Road => 0,
            Terrain::Castle => 4,
        }
    }

    /// Returns the layout character for this terrain.
    pub const fn layout_char(self) -> char {
        match self {
            Terrain::Blocked => '#',
            Terrain::Plain => '.',
            Terrain::Sea => '~',
            Terrain::Forest => 'f',
            Terrain::Mountain => '^',
            Terrain::Road => '=',
            Terrain::Castle => 'C',
        }
    }

    /// Parses a terrain from its layout character.
    pub fn from_layout_char(c: char) -> Option<Terrain> {
        match c {
            '#' => Some(Terrain::Blocked),
            '.' => Some(Terrain::Plain),
            '~' => Some(Terrain::Sea),
            'f' => Some(Terrain::Forest),
            '^' => Some(Terrain::Mountain),
            '=' => Some(Terrain::Road),
            'C' => Some(Terrain::Castle),
            _ => None,
        }
    }
}

/// A tile coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub x: u8,
    pub y: u8,
}

impl Pos {
    pub const fn new(x: u8, y: u8) -> Self {
        Pos { x, y }
    }

    /// Manhattan distance between two tiles.
    pub fn distance(self, other: Pos) -> u32 {
        (self.x.abs_diff(other.x) + self.y.abs_diff(other.y)) as u32
    }

    /// Orthogonal neighbors. Coordinates that would underflow are skipped.
    pub fn neighbors(self) -> impl Iterator<Item = Pos> {
        let Pos { x, y } = self;
        [
            x.checked_sub(1).map(|nx| Pos::new(nx, y)),
            x.checked_add(1).map(|nx| Pos::new(nx, y)),
            y.checked_sub(1).map(|ny| Pos::new(x, ny)),
            y.checked_add(1).map(|ny| Pos::new(x, ny)),
        ]
        .into_iter()
        .flatten()
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}
