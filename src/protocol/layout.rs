//! Plain-text battlefield layouts.
//!
//! A layout is a line-oriented description of a map. Blank lines and lines
//! starting with `//` are ignored. Directives:
//!
//! ```text
//! limit 30                     turn limit (required)
//! turn 4                       current turn count (default 0)
//! draw 10                      draw HP threshold (default 0)
//! row ..ff^..                  one interior terrain row, top to bottom
//! unit red panzer 2 3          color, kind, x, y
//! unit blue cannon 5 1 7 done  optional HP and finished flag
//! ```
//!
//! Rows describe only the playable interior; the blocked border is added
//! automatically, so the first interior tile is `(1, 1)`. Terrain
//! characters: `#` blocked, `.` plain, `~` sea, `f` forest, `^` mountain,
//! `=` road, `C` castle. Units receive ids in the order they are listed.

use crate::board::terrain::{Color, Pos, Terrain};
use crate::board::unit::{UnitId, UnitKind, MAX_HP};
use crate::board::Map;

/// Errors that can occur while parsing a layout.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("line {line}: unknown directive '{word}'")]
    UnknownDirective { line: usize, word: String },

    #[error("line {line}: expected a number, got '{value}'")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: missing argument for '{directive}'")]
    MissingArgument { line: usize, directive: &'static str },

    #[error("line {line}: invalid terrain character '{ch}'")]
    InvalidTerrain { line: usize, ch: char },

    #[error("line {line}: row has width {got}, expected {expected}")]
    RaggedRow { line: usize, got: usize, expected: usize },

    #[error("line {line}: unknown color '{value}'")]
    UnknownColor { line: usize, value: String },

    #[error("line {line}: unknown unit kind '{value}'")]
    UnknownKind { line: usize, value: String },

    #[error("line {line}: HP must be between 1 and {max}, got {hp}", max = MAX_HP)]
    InvalidHp { line: usize, hp: u32 },

    #[error("line {line}: tile ({x},{y}) is outside the map or occupied")]
    BadTile { line: usize, x: u32, y: u32 },

    #[error("line {line}: unexpected trailing token '{token}'")]
    TrailingToken { line: usize, token: String },

    #[error("layout has no terrain rows")]
    NoRows,

    #[error("layout is missing a 'limit' directive")]
    MissingLimit,

    #[error("map of {0}x{1} interior tiles is too large")]
    TooLarge(usize, usize),
}

struct UnitEntry {
    line: usize,
    color: Color,
    kind: UnitKind,
    x: u32,
    y: u32,
    hp: u32,
    finished: bool,
}

fn parse_number(line: usize, value: Option<&str>, directive: &'static str) -> Result<u32, LayoutError> {
    let value = value.ok_or(LayoutError::MissingArgument { line, directive })?;
    value.parse::<u32>().map_err(|_| LayoutError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

fn parse_row(line: usize, row: &str) -> Result<Vec<Terrain>, LayoutError> {
    row.chars()
        .map(|ch| Terrain::from_layout_char(ch).ok_or(LayoutError::InvalidTerrain { line, ch }))
        .collect()
}

fn parse_unit<'a>(line: usize, mut words: impl Iterator<Item = &'a str>) -> Result<UnitEntry, LayoutError> {
    let color_word = words.next().ok_or(LayoutError::MissingArgument { line, directive: "unit" })?;
    let color = Color::from_name(color_word).ok_or_else(|| LayoutError::UnknownColor {
        line,
        value: color_word.to_string(),
    })?;
    let kind_word = words.next().ok_or(LayoutError::MissingArgument { line, directive: "unit" })?;
    let kind = UnitKind::from_name(kind_word).ok_or_else(|| LayoutError::UnknownKind {
        line,
        value: kind_word.to_string(),
    })?;
    let x = parse_number(line, words.next(), "unit")?;
    let y = parse_number(line, words.next(), "unit")?;

    let mut hp = MAX_HP;
    let mut finished = false;
    for word in words {
        if word == "done" && !finished {
            finished = true;
        } else if let Ok(v) = word.parse::<u32>() {
            if v == 0 || v > MAX_HP {
                return Err(LayoutError::InvalidHp { line, hp: v });
            }
            hp = v;
        } else {
            return Err(LayoutError::TrailingToken {
                line,
                token: word.to_string(),
            });
        }
    }

    Ok(UnitEntry {
        line,
        color,
        kind,
        x,
        y,
        hp,
        finished,
    })
}

/// Parses a layout into a `Map`.
pub fn parse_layout(s: &str) -> Result<Map, LayoutError> {
    let mut limit = None;
    let mut turn = 0;
    let mut draw = 0;
    let mut rows: Vec<Vec<Terrain>> = Vec::new();
    let mut units = Vec::new();

    for (i, raw) in s.lines().enumerate() {
        let line = i + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with("//") {
            continue;
        }
        let mut words = text.split_whitespace();
        let Some(directive) = words.next() else {
            continue;
        };
        match directive {
            "limit" => limit = Some(parse_number(line, words.next(), "limit")?),
            "turn" => turn = parse_number(line, words.next(), "turn")?,
            "draw" => draw = parse_number(line, words.next(), "draw")?,
            "row" => {
                let row = words.next().ok_or(LayoutError::MissingArgument { line, directive: "row" })?;
                let parsed = parse_row(line, row)?;
                if let Some(first) = rows.first() {
                    if first.len() != parsed.len() {
                        return Err(LayoutError::RaggedRow {
                            line,
                            got: parsed.len(),
                            expected: first.len(),
                        });
                    }
                }
                rows.push(parsed);
                continue;
            }
            "unit" => {
                units.push(parse_unit(line, &mut words)?);
                continue;
            }
            other => {
                return Err(LayoutError::UnknownDirective {
                    line,
                    word: other.to_string(),
                })
            }
        }
        if let Some(extra) = words.next() {
            return Err(LayoutError::TrailingToken {
                line,
                token: extra.to_string(),
            });
        }
    }

    let limit = limit.ok_or(LayoutError::MissingLimit)?;
    let inner_h = rows.len();
    let inner_w = rows.first().map(Vec::len).ok_or(LayoutError::NoRows)?;
    if inner_w == 0 {
        return Err(LayoutError::NoRows);
    }
    if inner_w + 2 > u8::MAX as usize || inner_h + 2 > u8::MAX as usize {
        return Err(LayoutError::TooLarge(inner_w, inner_h));
    }

    let mut map = Map::new(inner_w as u8 + 2, inner_h as u8 + 2, limit);
    map.set_turn_count(turn);
    map.set_draw_hp_threshold(draw);
    for (y, row) in rows.iter().enumerate() {
        for (x, &t) in row.iter().enumerate() {
            map.set_terrain(Pos::new(x as u8 + 1, y as u8 + 1), t);
        }
    }

    for entry in units {
        let bad = LayoutError::BadTile {
            line: entry.line,
            x: entry.x,
            y: entry.y,
        };
        let (Ok(x), Ok(y)) = (u8::try_from(entry.x), u8::try_from(entry.y)) else {
            return Err(bad);
        };
        let id: UnitId = map.add_unit(entry.kind, entry.color, Pos::new(x, y)).ok_or(bad)?;
        if let Some(u) = map.unit_mut(id) {
            u.hp = entry.hp;
            u.finished = entry.finished;
        }
    }

    Ok(map)
}

/// Encodes a map back into layout text. Destroyed units are omitted, so ids
/// are only preserved when no unit has died.
pub fn encode_layout(map: &Map) -> String {
    let mut out = String::new();
    out.push_str(&format!("limit {}\n", map.turn_limit()));
    if map.turn_count() > 0 {
        out.push_str(&format!("turn {}\n", map.turn_count()));
    }
    if map.draw_hp_threshold() > 0 {
        out.push_str(&format!("draw {}\n", map.draw_hp_threshold()));
    }
    for y in 1..map.height() - 1 {
        let row: String = (1..map.width() - 1)
            .map(|x| map.terrain(Pos::new(x, y)).layout_char())
            .collect();
        out.push_str(&format!("row {}\n", row));
    }
    for u in map.all_units() {
        out.push_str(&format!("unit {} {} {} {}", u.color.name(), u.kind.name(), u.pos.x, u.pos.y));
        if u.hp != MAX_HP {
            out.push_str(&format!(" {}", u.hp));
        }
        if u.finished {
            out.push_str(" done");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIRMISH: &str = "\
// two squads facing each other across a forest
limit 20
draw 5
row .....
row .ff..
row ..~..
unit red panzer 1 1
unit red infantry 2 1 6
unit blue cannon 5 3 done
";

    #[test]
    fn parse_skirmish() {
        let map = parse_layout(SKIRMISH).expect("failed to parse layout");
        assert_eq!(map.width(), 7);
        assert_eq!(map.height(), 5);
        assert_eq!(map.turn_limit(), 20);
        assert_eq!(map.turn_count(), 0);
        assert_eq!(map.draw_hp_threshold(), 5);
        assert_eq!(map.terrain(Pos::new(2, 2)), Terrain::Forest);
        assert_eq!(map.terrain(Pos::new(3, 3)), Terrain::Sea);
        assert_eq!(map.terrain(Pos::new(0, 0)), Terrain::Blocked);

        let inf = map.unit(UnitId(1)).unwrap();
        assert_eq!(inf.kind, UnitKind::Infantry);
        assert_eq!(inf.hp, 6);
        assert!(!inf.finished);
        let cannon = map.unit(UnitId(2)).unwrap();
        assert_eq!(cannon.color, Color::Blue);
        assert!(cannon.finished);
    }

    #[test]
    fn encode_then_parse_preserves_map() {
        let map = parse_layout(SKIRMISH).unwrap();
        let again = parse_layout(&encode_layout(&map)).unwrap();
        assert_eq!(map, again);
    }

    #[test]
    fn rejects_missing_limit_and_rows() {
        assert_eq!(parse_layout("row ...\n"), Err(LayoutError::MissingLimit));
        assert_eq!(parse_layout("limit 3\n"), Err(LayoutError::NoRows));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_layout("limit 3\nrow ...\nrow ..\n").unwrap_err();
        assert_eq!(
            err,
            LayoutError::RaggedRow {
                line: 3,
                got: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn rejects_bad_units() {
        let base = "limit 3\nrow ...\n";
        let err = parse_layout(&format!("{base}unit green panzer 1 1\n")).unwrap_err();
        assert!(matches!(err, LayoutError::UnknownColor { line: 3, .. }));
        let err = parse_layout(&format!("{base}unit red tank 1 1\n")).unwrap_err();
        assert!(matches!(err, LayoutError::UnknownKind { .. }));
        let err = parse_layout(&format!("{base}unit red panzer 0 1\n")).unwrap_err();
        assert!(matches!(err, LayoutError::BadTile { .. }));
        let err = parse_layout(&format!("{base}unit red panzer 1 1\nunit blue panzer 1 1\n")).unwrap_err();
        assert!(matches!(err, LayoutError::BadTile { line: 4, .. }));
        let err = parse_layout(&format!("{base}unit red panzer 1 1 11\n")).unwrap_err();
        assert_eq!(err, LayoutError::InvalidHp { line: 3, hp: 11 });
    }

    #[test]
    fn rejects_unknown_directive() {
        let err = parse_layout("limit 3\nweather rain\n").unwrap_err();
        assert!(matches!(err, LayoutError::UnknownDirective { line: 2, .. }));
    }
}
