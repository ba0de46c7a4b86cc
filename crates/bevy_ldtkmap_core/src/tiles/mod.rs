//! Tile staging and commit into `bevy_ecs_tilemap`.

pub mod batch;

pub use batch::{CommittedTilemap, TilePlacementBatch, TileTransform, TilemapTarget};
