use std::collections::BTreeSet;

use miego_engine::{Grid, GridError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::{ConfigError, LevelGenConfig};
use crate::entity::{BlockContent, EnemyKind, ShotKind};

use super::data::{GridPos, LevelData};
use super::difficulty::scaled_for_level;
use super::tile::{PipePart, Tile, MULTI_COIN_BLOCK_COINS};

/// Procedural level builder. Holds the level-1 layout; each call scales it
/// for the requested difficulty.
#[derive(Debug, Clone)]
pub struct LevelGenerator {
    base: LevelGenConfig,
}

impl LevelGenerator {
    pub fn new(base: LevelGenConfig) -> Result<Self, ConfigError> {
        base.validate()?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &LevelGenConfig {
        &self.base
    }

    /// Same `seed` and `level` always give the same grid. Without a seed a
    /// fresh one is drawn and recorded on the result.
    pub fn generate(&self, level: u32, seed: Option<u64>) -> Result<LevelData, GridError> {
        let seed = seed.unwrap_or_else(rand::random);
        let config = scaled_for_level(&self.base, level);
        let mut rng = StdRng::seed_from_u64(seed);
        let built = Layout::new(&config)?.build(&mut rng);
        let level_data = LevelData::from_generated(
            built.tiles,
            built.player_spawn,
            built.flagpole,
            seed,
            level.max(1),
        );
        debug!(
            level = level_data.difficulty(),
            seed,
            width = level_data.width(),
            "level_generated"
        );
        Ok(level_data)
    }
}

struct Built {
    tiles: Grid<Tile>,
    player_spawn: GridPos,
    flagpole: GridPos,
}

#[derive(Debug, Clone, Copy)]
struct Gap {
    start: u32,
    end: u32,
}

/// Working state for one generation pass. Stages run in a fixed order and
/// each one only writes into cells earlier stages left empty.
struct Layout<'a> {
    config: &'a LevelGenConfig,
    tiles: Grid<Tile>,
    gaps: Vec<Gap>,
    pipes: Vec<u32>,
    occupied_columns: BTreeSet<u32>,
}

impl<'a> Layout<'a> {
    fn new(config: &'a LevelGenConfig) -> Result<Self, GridError> {
        Ok(Self {
            config,
            tiles: Grid::filled(config.width, config.height, Tile::Empty)?,
            gaps: Vec::new(),
            pipes: Vec::new(),
            occupied_columns: BTreeSet::new(),
        })
    }

    fn build<R: Rng>(mut self, rng: &mut R) -> Built {
        self.build_ground();
        self.place_gaps(rng);
        self.place_platforms();
        self.place_pipes(rng);
        let (player_spawn, flagpole) = self.place_markers();
        self.place_enemies(rng);
        self.place_blocks(rng);
        self.place_coins(rng);
        Built {
            tiles: self.tiles,
            player_spawn,
            flagpole,
        }
    }

    fn surface_row(&self) -> u32 {
        self.config.height - 2
    }

    /// Row things stand in, right above the ground.
    fn standing_row(&self) -> u32 {
        self.config.height - 3
    }

    fn end_limit(&self) -> u32 {
        self.config.width - self.config.safe_zone_before_end
    }

    fn is_empty(&self, column: u32, row: u32) -> bool {
        self.tiles.get(column, row).is_some_and(|tile| tile.is_empty())
    }

    fn build_ground(&mut self) {
        let surface = self.surface_row();
        for column in 0..self.config.width {
            self.tiles.set(column, surface, Tile::Ground { surface: true });
            self.tiles.set(column, surface + 1, Tile::Ground { surface: false });
        }
    }

    fn place_gaps<R: Rng>(&mut self, rng: &mut R) {
        let min_column = self.config.safe_zone_from_start + 10;
        let max_column = self.end_limit().saturating_sub(10);
        let available = max_column.saturating_sub(min_column);
        if available == 0 || self.config.gap_count == 0 {
            return;
        }
        let spacing = available / (self.config.gap_count + 1);
        let surface = self.surface_row();

        for index in 0..self.config.gap_count {
            let center = min_column + spacing * (index + 1);
            let width = rng.gen_range(self.config.min_gap_width..=self.config.max_gap_width);
            let start = center.saturating_sub(width / 2);
            let end = (start + width - 1).min(self.config.width - 1);
            for column in start..=end {
                self.tiles.set(column, surface, Tile::Hazard);
                self.tiles.set(column, surface + 1, Tile::Hazard);
                self.occupied_columns.insert(column);
            }
            self.gaps.push(Gap { start, end });
        }
    }

    /// Bricks start one column before each gap and run `platform_overhang`
    /// columns past it, so no gap needs a hazard-only crossing.
    fn place_platforms(&mut self) {
        let row = self.surface_row() - self.config.platform_height_above_ground;
        for gap in self.gaps.clone() {
            let start = gap.start.saturating_sub(1);
            let end = (gap.end + self.config.platform_overhang).min(self.config.width - 1);
            for column in start..=end {
                self.tiles.set(column, row, Tile::Brick);
            }
        }
    }

    fn place_pipes<R: Rng>(&mut self, rng: &mut R) {
        let surface = self.surface_row();
        let last_column = self.end_limit().saturating_sub(3);
        let mut candidates: Vec<u32> = (self.config.safe_zone_from_start..last_column)
            .filter(|&column| !self.near_water(column) && !self.near_water(column + 1))
            .filter(|column| {
                !self.occupied_columns.contains(column)
                    && !self.occupied_columns.contains(&(column + 1))
            })
            .collect();

        for _ in 0..self.config.pipe_count {
            let height = rng.gen_range(self.config.min_pipe_height..=self.config.max_pipe_height);
            let top = surface - height;
            candidates.retain(|&column| {
                (top..surface).all(|row| self.is_empty(column, row) && self.is_empty(column + 1, row))
            });
            let Some(&column) = candidates.choose(rng) else {
                debug!(placed = self.pipes.len(), "pipe_placement_exhausted");
                break;
            };

            self.tiles.set(column, top, Tile::PipeSegment(PipePart::TopLeft));
            self.tiles.set(column + 1, top, Tile::PipeSegment(PipePart::TopRight));
            for row in top + 1..surface {
                self.tiles.set(column, row, Tile::PipeSegment(PipePart::BodyLeft));
                self.tiles.set(column + 1, row, Tile::PipeSegment(PipePart::BodyRight));
            }
            self.pipes.push(column);
            self.occupied_columns.insert(column);
            self.occupied_columns.insert(column + 1);

            let spacing = self.config.min_distance_between_pipes;
            candidates.retain(|&other| other.abs_diff(column) >= spacing);
        }
    }

    fn near_water(&self, column: u32) -> bool {
        let reach = self.config.min_distance_from_water;
        self.gaps
            .iter()
            .any(|gap| column + reach >= gap.start && column <= gap.end + reach)
    }

    /// Markers overwrite whatever is there; later stages only fill empty
    /// cells, so each marker stays unique.
    fn place_markers(&mut self) -> (GridPos, GridPos) {
        let row = self.standing_row();
        let spawn = GridPos::new(self.config.player_start_column, row);
        let flagpole = GridPos::new(
            self.config.width - self.config.flagpole_columns_from_end,
            row,
        );
        self.tiles.set(spawn.column, spawn.row, Tile::PlayerSpawnMarker);
        self.tiles.set(flagpole.column, flagpole.row, Tile::FlagpoleMarker);
        (spawn, flagpole)
    }

    fn place_enemies<R: Rng>(&mut self, rng: &mut R) {
        let min_column = self.config.player_start_column + self.config.min_enemy_distance_from_start;
        let max_column = self.end_limit().saturating_sub(5);
        if min_column >= max_column {
            return;
        }

        let mut kinds = Vec::new();
        kinds.extend((0..self.config.walker_count).map(|_| EnemyKind::Walker));
        kinds.extend((0..self.config.shell_walker_count).map(|_| EnemyKind::ShellWalker));
        kinds.extend((0..self.config.shooter_count).map(|index| {
            if index % 2 == 0 {
                EnemyKind::Shooter(ShotKind::Frost)
            } else {
                EnemyKind::Shooter(ShotKind::Flame)
            }
        }));

        let row = self.standing_row();
        let mut placed: Vec<u32> = Vec::new();
        for kind in kinds {
            let found = (0..self.config.enemy_attempts)
                .map(|_| rng.gen_range(min_column..max_column))
                .find(|&column| {
                    placed
                        .iter()
                        .all(|&other| other.abs_diff(column) >= self.config.min_distance_between_enemies)
                        && !self.occupied_columns.contains(&column)
                        && self.is_empty(column, row)
                });
            match found {
                Some(column) => {
                    self.tiles.set(column, row, Tile::EnemySpawnMarker(kind));
                    placed.push(column);
                }
                None => debug!(?kind, "enemy_placement_skipped"),
            }
        }
    }

    fn place_blocks<R: Rng>(&mut self, rng: &mut R) {
        let config = self.config;
        let start = config.safe_zone_from_start;
        let middle = config.width / 2;
        let third = config.width / 3;
        let end = self.end_limit();

        let mut requests: Vec<(BlockContent, u32, u32)> = Vec::new();
        for index in 0..config.mushroom_count {
            let range = if index == 0 {
                (start + 5, start + 15)
            } else {
                (start, end - 1)
            };
            requests.push((BlockContent::Mushroom, range.0, range.1));
        }
        for _ in 0..config.fire_flower_count {
            requests.push((BlockContent::FireFlower, middle.saturating_sub(10), middle + 10));
        }
        for _ in 0..config.star_count {
            requests.push((BlockContent::Star, third.saturating_sub(5), third + 5));
        }
        for _ in 0..config.multi_coin_block_count {
            requests.push((
                BlockContent::MultiCoin(MULTI_COIN_BLOCK_COINS),
                middle + 5,
                middle + 20,
            ));
        }
        for _ in 0..config.question_block_count {
            requests.push((BlockContent::Coin, start, end - 1));
        }

        let mut placed: Vec<GridPos> = Vec::new();
        for (content, low, high) in requests {
            let high = high.min(config.width - 1);
            if low > high {
                continue;
            }
            let found = (0..config.block_attempts)
                .map(|_| {
                    GridPos::new(
                        rng.gen_range(low..=high),
                        rng.gen_range(config.block_row_min..=config.block_row_max),
                    )
                })
                .find(|pos| self.is_valid_block_position(*pos, &placed));
            match found {
                Some(pos) => {
                    self.tiles
                        .set(pos.column, pos.row, Tile::QuestionBlock(content));
                    placed.push(pos);
                }
                None => debug!(?content, "block_placement_skipped"),
            }
        }
    }

    fn is_valid_block_position(&self, pos: GridPos, placed: &[GridPos]) -> bool {
        let spacing = self.config.min_distance_between_blocks;
        self.is_empty(pos.column, pos.row)
            && placed
                .iter()
                .all(|other| other.row != pos.row || other.column.abs_diff(pos.column) >= spacing)
    }

    fn place_coins<R: Rng>(&mut self, rng: &mut R) {
        let config = self.config;
        let start = config.safe_zone_from_start;
        let end = self.end_limit();
        let mut coin_columns = BTreeSet::new();

        let spacing = (end - start) / (config.coin_arc_count + 1);
        for arc in 0..config.coin_arc_count {
            let first = start + spacing * (arc + 1);
            for index in 0..config.coins_per_arc {
                let column = first + index * config.coin_arc_spacing;
                if column < end && self.is_empty(column, config.coin_arc_row) {
                    self.tiles.set(column, config.coin_arc_row, Tile::CoinMarker);
                    coin_columns.insert(column);
                }
            }
        }

        if config.scattered_coin_rows.is_empty() {
            return;
        }
        for _ in 0..config.scattered_coin_count {
            let found = (0..config.scattered_coin_attempts)
                .map(|_| {
                    let row = config.scattered_coin_rows[rng.gen_range(0..config.scattered_coin_rows.len())];
                    GridPos::new(rng.gen_range(start..end), row)
                })
                .find(|pos| self.is_empty(pos.column, pos.row) && !coin_columns.contains(&pos.column));
            match found {
                Some(pos) => {
                    self.tiles.set(pos.column, pos.row, Tile::CoinMarker);
                    coin_columns.insert(pos.column);
                }
                None => debug!("coin_placement_skipped"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::difficulty::enemy_count;

    fn generator() -> LevelGenerator {
        LevelGenerator::new(LevelGenConfig::default()).expect("generator")
    }

    fn enemy_markers(level: &LevelData) -> Vec<GridPos> {
        level
            .tiles()
            .cells()
            .filter(|(_, _, tile)| matches!(tile, Tile::EnemySpawnMarker(_)))
            .map(|(column, row, _)| GridPos::new(column, row))
            .collect()
    }

    #[test]
    fn same_seed_gives_identical_levels() {
        let generator = generator();
        for level in 1..6 {
            let a = generator.generate(level, Some(42)).expect("level generates");
            let b = generator.generate(level, Some(42)).expect("level generates");
            assert_eq!(a.to_rows(), b.to_rows(), "level {level}");
            assert_eq!(a.seed(), Some(42));
        }
    }

    #[test]
    fn unseeded_generation_records_its_seed() {
        let level = generator().generate(1, None).expect("level generates");
        let seed = level.seed().expect("seed recorded");
        let replay = generator().generate(1, Some(seed)).expect("level generates");
        assert_eq!(replay.to_rows(), level.to_rows());
    }

    #[test]
    fn zero_sized_layout_is_an_error() {
        let config = LevelGenConfig {
            width: 0,
            ..LevelGenConfig::default()
        };
        assert!(matches!(
            Layout::new(&config),
            Err(GridError::EmptyDimensions { width: 0, .. })
        ));
    }

    #[test]
    fn every_level_has_one_spawn_and_one_flagpole() {
        let generator = generator();
        for seed in 0..40 {
            let level = generator
                .generate(1 + (seed % 8) as u32, Some(seed))
                .expect("level generates");
            assert_eq!(level.count(Tile::PlayerSpawnMarker), 1, "seed {seed}");
            assert_eq!(level.count(Tile::FlagpoleMarker), 1, "seed {seed}");
            assert_eq!(level.width(), 100);
            assert_eq!(level.height(), 14);
        }
    }

    #[test]
    fn every_hazard_column_has_a_platform_above_it() {
        let generator = generator();
        let config = LevelGenConfig::default();
        let platform_row = config.height - 2 - config.platform_height_above_ground;
        for seed in 0..40 {
            let level = generator
                .generate(1 + (seed % 8) as u32, Some(seed))
                .expect("level generates");
            let hazard_columns: Vec<u32> = (0..level.width())
                .filter(|&column| level.tile(column, config.height - 2) == Some(Tile::Hazard))
                .collect();
            assert!(!hazard_columns.is_empty(), "seed {seed}");
            for column in hazard_columns {
                assert_eq!(
                    level.tile(column, platform_row),
                    Some(Tile::Brick),
                    "seed {seed} column {column}"
                );
            }
        }
    }

    #[test]
    fn enemies_stand_on_ground_away_from_the_start() {
        let generator = generator();
        let config = LevelGenConfig::default();
        for seed in 0..40 {
            let level = generator.generate(4, Some(seed)).expect("level generates");
            let markers = enemy_markers(&level);
            assert!(!markers.is_empty(), "seed {seed}");
            for pos in &markers {
                assert_eq!(pos.row, config.height - 3);
                assert!(pos.column >= config.player_start_column + config.min_enemy_distance_from_start);
                assert_eq!(
                    level.tile(pos.column, pos.row + 1),
                    Some(Tile::Ground { surface: true }),
                    "seed {seed} column {}",
                    pos.column
                );
            }
            for (index, a) in markers.iter().enumerate() {
                for b in &markers[index + 1..] {
                    assert!(a.column.abs_diff(b.column) >= config.min_distance_between_enemies);
                }
            }
        }
    }

    #[test]
    fn pipes_are_whole_and_clear_of_water() {
        let generator = generator();
        let config = LevelGenConfig::default();
        for seed in 0..40 {
            let level = generator.generate(3, Some(seed)).expect("level generates");
            for (column, row, tile) in level.tiles().cells() {
                if *tile != Tile::PipeSegment(PipePart::TopLeft) {
                    continue;
                }
                assert_eq!(
                    level.tile(column + 1, row),
                    Some(Tile::PipeSegment(PipePart::TopRight))
                );
                for below in row + 1..config.height - 2 {
                    assert_eq!(
                        level.tile(column, below),
                        Some(Tile::PipeSegment(PipePart::BodyLeft))
                    );
                }
                for offset in 0..=(config.min_distance_from_water * 2 + 1) {
                    let probe = (column + offset).saturating_sub(config.min_distance_from_water);
                    assert_ne!(level.tile(probe, config.height - 2), Some(Tile::Hazard));
                }
            }
        }
    }

    #[test]
    fn enemy_markers_never_exceed_the_scaled_count() {
        let generator = generator();
        let config = LevelGenConfig::default();
        for level in 1..8 {
            let generated = generator.generate(level, Some(7)).expect("level generates");
            let wanted = enemy_count(&scaled_for_level(&config, level)) as usize;
            assert!(enemy_markers(&generated).len() <= wanted, "level {level}");
        }
    }

    #[test]
    fn question_blocks_respect_row_spacing() {
        let generator = generator();
        let config = LevelGenConfig::default();
        for seed in 0..20 {
            let level = generator.generate(3, Some(seed)).expect("level generates");
            let blocks: Vec<GridPos> = level
                .tiles()
                .cells()
                .filter(|(_, _, tile)| matches!(tile, Tile::QuestionBlock(_)))
                .map(|(column, row, _)| GridPos::new(column, row))
                .collect();
            assert!(!blocks.is_empty());
            for (index, a) in blocks.iter().enumerate() {
                assert!((config.block_row_min..=config.block_row_max).contains(&a.row));
                for b in &blocks[index + 1..] {
                    if a.row == b.row {
                        assert!(a.column.abs_diff(b.column) >= config.min_distance_between_blocks);
                    }
                }
            }
        }
    }

    #[test]
    fn invalid_layouts_are_refused_up_front() {
        let config = LevelGenConfig {
            width: 20,
            ..LevelGenConfig::default()
        };
        assert!(LevelGenerator::new(config).is_err());
    }

    #[test]
    fn generated_text_parses_back() {
        let level = generator().generate(2, Some(11)).expect("level generates");
        let parsed = LevelData::from_rows(&level.to_rows()).expect("parse");
        assert_eq!(parsed.to_rows(), level.to_rows());
        assert_eq!(parsed.player_spawn(), level.player_spawn());
        assert_eq!(parsed.flagpole(), level.flagpole());
    }
}
