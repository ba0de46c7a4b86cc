//! Components of the built entity hierarchy.
//!
//! ```text
//! LdtkProjectRoot
//! └── LdtkWorld
//!     └── LdtkLevel (+ LevelGeometry, LdtkFields)
//!         ├── LevelBackground
//!         └── LdtkLayer (+ IntGridLayerData)
//!             ├── tilemap (bevy_ecs_tilemap)
//!             └── LdtkEntity (+ LdtkFields, injected components)
//! ```

pub mod entity;
pub mod layer;
pub mod level;
pub mod project;

pub use entity::LdtkEntity;
pub use layer::{IntGridLayerData, LdtkLayer};
pub use level::{LdtkLevel, LevelBackground, LevelGeometry};
pub use project::{LdtkProjectRoot, LdtkWorld, RespawnLdtkProject};
