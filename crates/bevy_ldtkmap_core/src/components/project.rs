//! Project and world components.

use bevy::prelude::*;
use bevy_ldtkmap_schema::LdtkProject;
use bevy_ldtkmap_schema::prelude::WorldLayout;

/// Root of a built LDtk project.
///
/// Spawn an entity with this component to build the project once its asset is loaded.
///
/// # Example
///
/// ```rust,no_run
/// # use bevy::prelude::*;
/// # use bevy_ldtkmap_core::prelude::LdtkProjectRoot;
/// fn spawn_project(mut commands: Commands, asset_server: Res<AssetServer>) {
///     commands.spawn(LdtkProjectRoot::new(asset_server.load("levels/world.ldtk")));
/// }
/// ```
#[derive(Component, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Visibility)]
pub struct LdtkProjectRoot {
    pub handle: Handle<LdtkProject>,
    /// Asset path used to resolve project-relative paths. Defaults to the handle's path,
    /// which in-memory assets do not have.
    pub source: Option<String>,
}

impl LdtkProjectRoot {
    pub fn new(handle: Handle<LdtkProject>) -> Self {
        Self {
            handle,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Marker to rebuild a project root on the next update.
#[derive(Component)]
pub struct RespawnLdtkProject;

/// A world node.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Visibility)]
pub struct LdtkWorld {
    pub identifier: String,
    pub iid: String,
    #[reflect(ignore)]
    pub layout: Option<WorldLayout>,
}
