use std::fmt;

use miego_engine::{Grid, GridError, Vec2};
use serde::Serialize;
use thiserror::Error;

use super::tile::Tile;

/// Cell coordinate; row 0 is the top row of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GridPos {
    pub column: u32,
    pub row: u32,
}

impl GridPos {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelParseError {
    #[error("level text has no rows")]
    Empty,
    #[error("row {row} has {actual} tokens, expected {expected}")]
    RaggedRow {
        row: u32,
        expected: u32,
        actual: u32,
    },
    #[error("unknown tile token {token:?} at column {column}, row {row}")]
    UnknownToken {
        token: char,
        column: u32,
        row: u32,
    },
    #[error("level has no {0} marker")]
    MissingMarker(&'static str),
    #[error("level has more than one {0} marker")]
    DuplicateMarker(&'static str),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A generated or hand-written level. The grid never changes size; the
/// session copies what it needs into entities at load.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelData {
    tiles: Grid<Tile>,
    player_spawn: GridPos,
    flagpole: GridPos,
    seed: Option<u64>,
    difficulty: u32,
}

impl LevelData {
    /// Wraps a finished grid, locating the spawn and flagpole markers.
    pub fn from_grid(
        tiles: Grid<Tile>,
        seed: Option<u64>,
        difficulty: u32,
    ) -> Result<Self, LevelParseError> {
        let player_spawn = find_single(&tiles, Tile::PlayerSpawnMarker, "player spawn")?;
        let flagpole = find_single(&tiles, Tile::FlagpoleMarker, "flagpole")?;
        Ok(Self {
            tiles,
            player_spawn,
            flagpole,
            seed,
            difficulty,
        })
    }

    /// Used by the generator, which tracks its marker cells as it places them.
    pub(super) fn from_generated(
        tiles: Grid<Tile>,
        player_spawn: GridPos,
        flagpole: GridPos,
        seed: u64,
        difficulty: u32,
    ) -> Self {
        Self {
            tiles,
            player_spawn,
            flagpole,
            seed: Some(seed),
            difficulty,
        }
    }

    /// Parses single-character token rows, top row first.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, LevelParseError> {
        let first = rows.first().ok_or(LevelParseError::Empty)?;
        let width = first.as_ref().chars().count() as u32;
        let mut cells = Vec::with_capacity(width as usize * rows.len());
        for (row, text) in (0u32..).zip(rows) {
            let actual = text.as_ref().chars().count() as u32;
            if actual != width {
                return Err(LevelParseError::RaggedRow {
                    row,
                    expected: width,
                    actual,
                });
            }
            for (column, token) in (0u32..).zip(text.as_ref().chars()) {
                let tile = Tile::from_char(token).ok_or(LevelParseError::UnknownToken {
                    token,
                    column,
                    row,
                })?;
                cells.push(tile);
            }
        }
        let tiles = Grid::new(width, rows.len() as u32, cells)?;
        Self::from_grid(tiles, None, 1)
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.tiles
            .rows()
            .map(|row| row.iter().map(|tile| tile.to_char()).collect())
            .collect()
    }

    pub fn width(&self) -> u32 {
        self.tiles.width()
    }

    pub fn height(&self) -> u32 {
        self.tiles.height()
    }

    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }

    pub fn tile(&self, column: u32, row: u32) -> Option<Tile> {
        self.tiles.get(column, row).copied()
    }

    pub fn player_spawn(&self) -> GridPos {
        self.player_spawn
    }

    pub fn flagpole(&self) -> GridPos {
        self.flagpole
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn world_width(&self, tile_size: f32) -> f32 {
        self.width() as f32 * tile_size
    }

    /// World-space center of a cell. World origin is the grid's bottom-left
    /// corner and y grows upward.
    pub fn cell_center(&self, pos: GridPos, tile_size: f32) -> Vec2 {
        Vec2::new(
            (pos.column as f32 + 0.5) * tile_size,
            self.cell_bottom(pos.row, tile_size) + tile_size * 0.5,
        )
    }

    /// World y of the bottom edge of a row.
    pub fn cell_bottom(&self, row: u32, tile_size: f32) -> f32 {
        (self.height() - 1 - row) as f32 * tile_size
    }

    /// Bottom-center of a cell, where a standing body's feet go.
    pub fn cell_floor(&self, pos: GridPos, tile_size: f32) -> Vec2 {
        Vec2::new(
            (pos.column as f32 + 0.5) * tile_size,
            self.cell_bottom(pos.row, tile_size),
        )
    }

    /// Counts cells holding `tile`.
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.cells().filter(|(_, _, cell)| **cell == tile).count()
    }
}

impl fmt::Display for LevelData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.to_rows().iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            f.write_str(row)?;
        }
        Ok(())
    }
}

fn find_single(
    tiles: &Grid<Tile>,
    marker: Tile,
    name: &'static str,
) -> Result<GridPos, LevelParseError> {
    let mut found = None;
    for (column, row, tile) in tiles.cells() {
        if *tile != marker {
            continue;
        }
        if found.is_some() {
            return Err(LevelParseError::DuplicateMarker(name));
        }
        found = Some(GridPos::new(column, row));
    }
    found.ok_or(LevelParseError::MissingMarker(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: [&str; 5] = [
        "----------",
        "---?--C---",
        "-@---g--->",
        "GGGGG--GGG",
        "#####WW###",
    ];

    fn fixture() -> Vec<String> {
        FIXTURE.iter().map(|row| row.to_string()).collect()
    }

    #[test]
    fn rows_round_trip_through_text() {
        let rows = fixture();
        let level = LevelData::from_rows(&rows).expect("level");
        assert_eq!(level.width(), 10);
        assert_eq!(level.height(), 5);
        assert_eq!(level.player_spawn(), GridPos::new(1, 2));
        assert_eq!(level.flagpole(), GridPos::new(9, 2));
        assert_eq!(level.to_rows(), rows);
        assert_eq!(level.to_string(), rows.join("\n"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = LevelData::from_rows(&["-@->", "GG"]).expect_err("ragged");
        assert_eq!(
            err,
            LevelParseError::RaggedRow {
                row: 1,
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn unknown_tokens_report_their_cell() {
        let err = LevelData::from_rows(&["-@>", "GzG"]).expect_err("unknown");
        assert_eq!(
            err,
            LevelParseError::UnknownToken {
                token: 'z',
                column: 1,
                row: 1
            }
        );
    }

    #[test]
    fn markers_must_be_unique_and_present() {
        assert_eq!(
            LevelData::from_rows(&["---", "GGG"]).expect_err("no spawn"),
            LevelParseError::MissingMarker("player spawn")
        );
        assert_eq!(
            LevelData::from_rows(&["@@>", "GGG"]).expect_err("two spawns"),
            LevelParseError::DuplicateMarker("player spawn")
        );
        assert_eq!(
            LevelData::from_rows(&["@--", "GGG"]).expect_err("no flag"),
            LevelParseError::MissingMarker("flagpole")
        );
    }

    #[test]
    fn world_mapping_puts_the_bottom_row_at_zero() {
        let level = LevelData::from_rows(&fixture()).expect("level");
        assert_eq!(level.cell_bottom(4, 32.0), 0.0);
        assert_eq!(level.cell_bottom(0, 32.0), 128.0);
        assert_eq!(
            level.cell_center(GridPos::new(1, 3), 32.0),
            Vec2::new(48.0, 48.0)
        );
        assert_eq!(
            level.cell_floor(level.player_spawn(), 32.0),
            Vec2::new(48.0, 64.0)
        );
        assert_eq!(level.world_width(32.0), 320.0);
    }
}
