mod data;
pub mod difficulty;
mod generator;
mod tile;

pub use data::{GridPos, LevelData, LevelParseError};
pub use generator::LevelGenerator;
pub use tile::{PipePart, Tile, MULTI_COIN_BLOCK_COINS};
