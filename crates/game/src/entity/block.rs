use miego_engine::{BodyDesc, BodyError, PhysicsBody, Vec2};
use serde::Serialize;

use crate::collision::layers;
use crate::level::Tile;

use super::item::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockContent {
    None,
    Coin,
    MultiCoin(u32),
    Mushroom,
    FireFlower,
    Star,
    ExtraLife,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Ground,
    Brick,
    Question,
    Pipe,
    Platform,
}

/// What a hit lets out of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Coin,
    Item(ItemKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockHitOutcome {
    /// Mid-bump, spent, unbreakable or already broken.
    Ignored,
    Bumped { release: Option<Release> },
    Broken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    kind: BlockKind,
    content: BlockContent,
    bump_timer: f32,
    broken: bool,
}

impl Block {
    pub fn new(kind: BlockKind, content: BlockContent) -> Self {
        Self {
            kind,
            content,
            bump_timer: 0.0,
            broken: false,
        }
    }

    pub fn from_tile(tile: Tile) -> Option<Self> {
        let block = match tile {
            Tile::Ground { .. } => Self::new(BlockKind::Ground, BlockContent::None),
            Tile::Brick => Self::new(BlockKind::Brick, BlockContent::None),
            Tile::QuestionBlock(content) => Self::new(BlockKind::Question, content),
            Tile::Platform => Self::new(BlockKind::Platform, BlockContent::None),
            Tile::PipeSegment(_) => Self::new(BlockKind::Pipe, BlockContent::None),
            _ => return None,
        };
        Some(block)
    }

    /// Static body filling one tile cell.
    pub fn body(&self, center: Vec2, tile_size: f32) -> Result<PhysicsBody, BodyError> {
        let half = Vec2::new(tile_size * 0.5, tile_size * 0.5);
        let desc = match self.kind {
            BlockKind::Ground | BlockKind::Pipe => BodyDesc::fixed(half, layers::GROUND),
            BlockKind::Brick | BlockKind::Question => BodyDesc::fixed(half, layers::BLOCK),
            BlockKind::Platform => BodyDesc::fixed(half, layers::PLATFORM).with_one_way(true),
        };
        PhysicsBody::new(center, desc)
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn content(&self) -> BlockContent {
        self.content
    }

    pub fn is_bumping(&self) -> bool {
        self.bump_timer > 0.0
    }

    pub fn is_spent(&self) -> bool {
        self.kind == BlockKind::Question && self.content == BlockContent::None
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn state_label(&self) -> &'static str {
        if self.broken {
            "broken"
        } else if self.is_bumping() {
            "bumping"
        } else if self.is_spent() {
            "spent"
        } else {
            "idle"
        }
    }

    /// Handles a head-butt from below. `strong` is true for a Big or Fire
    /// player. Hits that land while the block is still bumping are ignored.
    pub fn hit_from_below(&mut self, strong: bool, bump_seconds: f32) -> BlockHitOutcome {
        if self.broken || self.is_bumping() {
            return BlockHitOutcome::Ignored;
        }
        match self.kind {
            BlockKind::Question => match self.take_content() {
                Some(release) => {
                    self.bump_timer = bump_seconds;
                    BlockHitOutcome::Bumped {
                        release: Some(release),
                    }
                }
                None => BlockHitOutcome::Ignored,
            },
            BlockKind::Brick => match self.take_content() {
                Some(release) => {
                    self.bump_timer = bump_seconds;
                    if self.content == BlockContent::None {
                        // A brick that gave out its last content turns into a spent block.
                        self.kind = BlockKind::Question;
                    }
                    BlockHitOutcome::Bumped {
                        release: Some(release),
                    }
                }
                None if strong => {
                    self.broken = true;
                    BlockHitOutcome::Broken
                }
                None => {
                    self.bump_timer = bump_seconds;
                    BlockHitOutcome::Bumped { release: None }
                }
            },
            BlockKind::Ground | BlockKind::Pipe | BlockKind::Platform => BlockHitOutcome::Ignored,
        }
    }

    pub fn update(&mut self, dt_seconds: f32) {
        self.bump_timer = (self.bump_timer - dt_seconds).max(0.0);
    }

    fn take_content(&mut self) -> Option<Release> {
        let (release, remaining) = match self.content {
            BlockContent::None | BlockContent::MultiCoin(0) => return None,
            BlockContent::Coin => (Release::Coin, BlockContent::None),
            BlockContent::MultiCoin(left) if left > 1 => {
                (Release::Coin, BlockContent::MultiCoin(left - 1))
            }
            BlockContent::MultiCoin(_) => (Release::Coin, BlockContent::None),
            BlockContent::Mushroom => (Release::Item(ItemKind::Mushroom), BlockContent::None),
            BlockContent::FireFlower => (Release::Item(ItemKind::FireFlower), BlockContent::None),
            BlockContent::Star => (Release::Item(ItemKind::Star), BlockContent::None),
            BlockContent::ExtraLife => (Release::Item(ItemKind::ExtraLife), BlockContent::None),
        };
        self.content = remaining;
        Some(release)
    }
}
