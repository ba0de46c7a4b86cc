//! # bevy_ldtkmap
//!
//! LDtk project importer for Bevy.
//!
//! This is a meta-crate that combines the `bevy_ldtkmap_*` sub-crates behind a single
//! plugin and prelude.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_ldtkmap::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(BevyLdtkmapPlugin::default())
//!         .add_systems(Startup, spawn_project)
//!         .run();
//! }
//!
//! fn spawn_project(mut commands: Commands, asset_server: Res<AssetServer>) {
//!     commands.spawn(LdtkProjectRoot::new(asset_server.load("levels/world.ldtk")));
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Layer 1** ([`schema`]): serde model of the `.ldtk` document, exposed as a Bevy
//!   asset; its only Bevy dependency is `bevy_asset`
//! - **Layer 2** ([`core`]): the build pipeline, from UID registry to tilemaps, entity nodes
//!   and injected components
//!
//! ## Using Individual Crates
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_ldtkmap_core::prelude::*;
//!
//! App::new()
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(LdtkCorePlugin::default())
//!     .run();
//! ```

pub mod plugin;

// Re-export sub-crates for advanced usage
pub use bevy_ldtkmap_core as core;
pub use bevy_ldtkmap_schema as schema;

// Used by code generated by the derive macros
#[doc(hidden)]
pub use inventory;

/// Unified prelude for bevy_ldtkmap
///
/// Schema types are not glob-exported here: the LDtk `World` type would shadow Bevy's. Use
/// them through [`schema`].
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_ldtkmap::prelude::*;
///
/// fn list_doors(doors: Query<(&LdtkEntity, &LdtkFields)>) {
///     for (entity, fields) in &doors {
///         info!("{} locked: {}", entity.iid, fields.get_bool("locked"));
///     }
/// }
/// ```
pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::schema::LdtkProject;

    // Unified plugin
    pub use crate::plugin::BevyLdtkmapPlugin;
}
