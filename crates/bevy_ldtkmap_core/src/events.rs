//! Lifecycle events of a build.
//!
//! Every event is triggered in the post-build phase, after the whole hierarchy exists, so
//! observers can query parents, siblings and children of the node they are told about.

use bevy::prelude::*;

/// Fired for every entity node, once the project hierarchy is complete.
///
/// # Example
///
/// ```rust,no_run
/// # use bevy::prelude::*;
/// # use bevy_ldtkmap_core::prelude::*;
/// fn setup(app: &mut App) {
///     app.add_observer(|spawned: On<EntitySpawned>, mut commands: Commands| {
///         if spawned.identifier == "Player" {
///             commands.entity(spawned.entity).insert(Player);
///         }
///     });
/// }
/// # #[derive(Component)] struct Player;
/// ```
#[derive(Event, Debug, Clone)]
pub struct EntitySpawned {
    pub entity: Entity,
    /// The layer node the entity belongs to
    pub layer_entity: Entity,
    /// LDtk entity identifier
    pub identifier: String,
}

/// Fired for every layer node.
#[derive(Event, Debug, Clone)]
pub struct LayerSpawned {
    pub entity: Entity,
    pub level_entity: Entity,
    pub identifier: String,
    /// Tilemaps committed under this layer
    pub tilemaps: Vec<Entity>,
}

/// Fired for every level node.
#[derive(Event, Debug, Clone)]
pub struct LevelSpawned {
    pub entity: Entity,
    pub world_entity: Entity,
    pub identifier: String,
}

/// Fired on a world node when all its levels are built.
///
/// This is an `EntityEvent` that can be observed on the world entity.
#[derive(EntityEvent, Debug, Clone)]
pub struct WorldSpawned {
    /// The world entity
    #[event_target]
    pub entity: Entity,
}

/// Fired on the project root once the whole project is built. Always the last event of a
/// build.
///
/// # Example
///
/// ```rust,no_run
/// # use bevy::prelude::*;
/// # use bevy_ldtkmap_core::prelude::*;
/// fn spawn_project(mut commands: Commands, asset_server: Res<AssetServer>) {
///     commands
///         .spawn(LdtkProjectRoot::new(asset_server.load("levels/world.ldtk")))
///         .observe(|built: On<ProjectBuilt>| {
///             info!("Project ready with {} errors", built.error_count);
///         });
/// }
/// ```
#[derive(EntityEvent, Debug, Clone)]
pub struct ProjectBuilt {
    /// The project root entity
    #[event_target]
    pub entity: Entity,
    pub world_count: usize,
    pub error_count: usize,
}
