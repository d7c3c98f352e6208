use serde::Serialize;

use crate::entity::{BlockContent, EnemyKind, ShotKind};

/// Coins a `$` block pays out before it empties.
pub const MULTI_COIN_BLOCK_COINS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipePart {
    TopLeft,
    TopRight,
    BodyLeft,
    BodyRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tile {
    Empty,
    /// `surface` marks the top ground row.
    Ground { surface: bool },
    Brick,
    QuestionBlock(BlockContent),
    /// One-way ledge.
    Platform,
    PipeSegment(PipePart),
    Hazard,
    FlagpoleMarker,
    PlayerSpawnMarker,
    EnemySpawnMarker(EnemyKind),
    CoinMarker,
}

impl Tile {
    pub fn to_char(self) -> char {
        match self {
            Tile::Empty => '-',
            Tile::Ground { surface: false } => '#',
            Tile::Ground { surface: true } => 'G',
            Tile::Brick => 'B',
            Tile::QuestionBlock(content) => match content {
                BlockContent::None => 'X',
                BlockContent::Coin => '?',
                BlockContent::MultiCoin(_) => '$',
                BlockContent::Mushroom => 'M',
                BlockContent::FireFlower => 'F',
                BlockContent::Star => 'S',
                BlockContent::ExtraLife => '1',
            },
            Tile::Platform => '=',
            Tile::PipeSegment(PipePart::TopLeft) => '[',
            Tile::PipeSegment(PipePart::TopRight) => ']',
            Tile::PipeSegment(PipePart::BodyLeft) => 'P',
            Tile::PipeSegment(PipePart::BodyRight) => '|',
            Tile::Hazard => 'W',
            Tile::FlagpoleMarker => '>',
            Tile::PlayerSpawnMarker => '@',
            Tile::EnemySpawnMarker(kind) => match kind {
                EnemyKind::Walker => 'g',
                EnemyKind::ShellWalker => 'k',
                EnemyKind::Stationary => 'p',
                EnemyKind::Shooter(ShotKind::Frost) => 'T',
                EnemyKind::Shooter(ShotKind::Flame) => 'H',
            },
            Tile::CoinMarker => 'C',
        }
    }

    pub fn from_char(token: char) -> Option<Self> {
        let tile = match token {
            '-' => Tile::Empty,
            '#' => Tile::Ground { surface: false },
            'G' => Tile::Ground { surface: true },
            'B' => Tile::Brick,
            'X' => Tile::QuestionBlock(BlockContent::None),
            '?' => Tile::QuestionBlock(BlockContent::Coin),
            '$' => Tile::QuestionBlock(BlockContent::MultiCoin(MULTI_COIN_BLOCK_COINS)),
            'M' => Tile::QuestionBlock(BlockContent::Mushroom),
            'F' => Tile::QuestionBlock(BlockContent::FireFlower),
            'S' => Tile::QuestionBlock(BlockContent::Star),
            '1' => Tile::QuestionBlock(BlockContent::ExtraLife),
            '=' => Tile::Platform,
            '[' => Tile::PipeSegment(PipePart::TopLeft),
            ']' => Tile::PipeSegment(PipePart::TopRight),
            'P' => Tile::PipeSegment(PipePart::BodyLeft),
            '|' => Tile::PipeSegment(PipePart::BodyRight),
            'W' => Tile::Hazard,
            '>' => Tile::FlagpoleMarker,
            '@' => Tile::PlayerSpawnMarker,
            'g' => Tile::EnemySpawnMarker(EnemyKind::Walker),
            'k' => Tile::EnemySpawnMarker(EnemyKind::ShellWalker),
            'p' => Tile::EnemySpawnMarker(EnemyKind::Stationary),
            'T' => Tile::EnemySpawnMarker(EnemyKind::Shooter(ShotKind::Frost)),
            'H' => Tile::EnemySpawnMarker(EnemyKind::Shooter(ShotKind::Flame)),
            'C' => Tile::CoinMarker,
            _ => return None,
        };
        Some(tile)
    }

    pub fn is_empty(self) -> bool {
        self == Tile::Empty
    }

    /// Terrain that bodies stand on or bump into.
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            Tile::Ground { .. }
                | Tile::Brick
                | Tile::QuestionBlock(_)
                | Tile::Platform
                | Tile::PipeSegment(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_documented_token_parses_back_to_itself() {
        for token in "-#GBX?$MFS1=[]P|W>@gkpTHC".chars() {
            let tile = Tile::from_char(token).expect("known token");
            assert_eq!(tile.to_char(), token, "token {token}");
        }
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert_eq!(Tile::from_char('z'), None);
        assert_eq!(Tile::from_char(' '), None);
    }

    #[test]
    fn markers_are_not_solid() {
        assert!(Tile::Brick.is_solid());
        assert!(Tile::Platform.is_solid());
        assert!(!Tile::Hazard.is_solid());
        assert!(!Tile::CoinMarker.is_solid());
        assert!(!Tile::EnemySpawnMarker(EnemyKind::Walker).is_solid());
    }
}
