//! # `bevy_ldtkmap_core`
//!
//! Build pipeline of `bevy_ldtkmap`. Turns a parsed LDtk project into an ECS hierarchy of
//! worlds, levels, layers, tilemaps and entities with typed field data.
//!
//! ## Architecture
//!
//! Layer 2 (this crate) sits on top of **Layer 1** (`bevy_ldtkmap_schema`), the read-only
//! document model. A build walks the document once:
//!
//! 1. **UID registry**: index of every definition and instance, alive for one build only
//! 2. **Builders**: project, world, level and layer nodes, dispatching per layer content
//! 3. **Tiles**: staged per tilemap and committed into `bevy_ecs_tilemap` in one batch
//! 4. **Auto-tiling**: rule evaluation over int-grids, seeded and deterministic
//! 5. **Fields**: typed values on every entity and level, injected into components
//!
//! Problems met along the way do not stop the build. They are logged, collected in the
//! [`BuildReport`](build::BuildReport) and the rest of the project still builds.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_ldtkmap_core::prelude::*;
//!
//! #[derive(Component, Default, LdtkInjectable)]
//! #[ldtk(entity = "Mob")]
//! struct Mob {
//!     #[ldtk]
//!     hp: i32,
//!     #[ldtk(name = "patrol")]
//!     waypoints: Vec<IVec2>,
//! }
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(LdtkCorePlugin::default())
//!         .add_systems(Startup, spawn_project)
//!         .run();
//! }
//!
//! fn spawn_project(mut commands: Commands, asset_server: Res<AssetServer>) {
//!     commands.spawn(LdtkProjectRoot::new(asset_server.load("levels/world.ldtk")));
//! }
//! ```

extern crate self as bevy_ldtkmap_core;

pub mod autotile;
pub mod build;
pub mod components;
pub mod error;
pub mod events;
pub mod fields;
pub mod plugin;
pub mod registry;
pub mod systems;
pub mod tiles;

// Used by code generated by the derive macros
#[doc(hidden)]
pub use inventory;

pub use bevy_ldtkmap_schema as schema;

pub mod prelude {
    //! Common imports for `bevy_ldtkmap_core` users.

    pub use crate::build::{BuildReport, BuildState, LdtkBuildReport, ProjectBuilder};
    pub use crate::components::{
        IntGridLayerData, LdtkEntity, LdtkLayer, LdtkLevel, LdtkProjectRoot, LdtkWorld,
        LevelBackground, LevelGeometry, RespawnLdtkProject,
    };
    pub use crate::error::{FatalInput, ImportError};
    pub use crate::events::{EntitySpawned, LayerSpawned, LevelSpawned, ProjectBuilt, WorldSpawned};
    pub use crate::fields::{
        FieldInjector, FieldKind, FieldValue, FromFieldValue, LdtkEntityRef, LdtkEnum, LdtkFields,
        LdtkInjectable, LdtkTargetRegistry, LdtkValueParser, MemberType, TypedParser,
    };
    pub use crate::plugin::{LayerZConfig, LdtkBuildConfig, LdtkCoreConfig, LdtkCorePlugin};
    pub use crate::tiles::TileTransform;

    // Derive macros, sharing their trait's name
    pub use bevy_ldtkmap_macros::{LdtkEnum, LdtkInjectable};
}

// Re-export plugin types at crate root for convenience
pub use plugin::{LayerZConfig, LdtkBuildConfig, LdtkCoreConfig, LdtkCorePlugin};
