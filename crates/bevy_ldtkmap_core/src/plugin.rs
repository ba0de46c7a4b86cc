//! Plugin for `bevy_ldtkmap_core`.

use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
use bevy_ldtkmap_schema::LdtkProject;
use serde::Deserialize;

use crate::components::{
    IntGridLayerData, LdtkEntity, LdtkLayer, LdtkLevel, LdtkProjectRoot, LdtkWorld,
    LevelBackground, LevelGeometry,
};
use crate::fields::{FieldInjector, LdtkEntityRef, LdtkTargetRegistry};
use crate::systems::process_loaded_projects;
use crate::tiles::TileTransform;

/// Configuration for layer Z-ordering.
///
/// Z value = offset + (depth * multiplier), where depth counts layers from the back of the
/// level. The level background sits one step behind the back-most layer.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayerZConfig {
    /// Base Z offset for all layers
    pub offset: f32,
    /// Spacing between consecutive layers
    pub multiplier: f32,
}

impl Default for LayerZConfig {
    fn default() -> Self {
        Self {
            offset: 0.0,
            multiplier: 1.0,
        }
    }
}

/// Options applied to every build.
///
/// Inserted as a resource by [`LdtkCorePlugin`]; change it before a project is built, or
/// rebuild with [`RespawnLdtkProject`](crate::components::RespawnLdtkProject).
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LdtkBuildConfig {
    /// Evaluate auto-layer rules instead of using the tiles the editor precomputed. Rules
    /// are always evaluated for layers with rules but no precomputed tiles.
    pub evaluate_auto_rules: bool,
    /// Make int-grid cells visible as tiles tinted with their value colour.
    pub show_int_grid: bool,
    /// Log the duration of builds with more than one world.
    pub log_build_times: bool,
    pub layer_z: LayerZConfig,
}

impl Default for LdtkBuildConfig {
    fn default() -> Self {
        Self {
            evaluate_auto_rules: false,
            show_int_grid: false,
            log_build_times: true,
            layer_z: LayerZConfig::default(),
        }
    }
}

/// Configuration for [`LdtkCorePlugin`].
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_ldtkmap_core::{LdtkBuildConfig, LdtkCoreConfig, LdtkCorePlugin};
///
/// App::new().add_plugins(LdtkCorePlugin::new(LdtkCoreConfig {
///     build: LdtkBuildConfig {
///         evaluate_auto_rules: true,
///         ..default()
///     },
///     ..default()
/// }));
/// ```
#[derive(Debug, Clone)]
pub struct LdtkCoreConfig {
    /// Register the JSON asset loader for `.ldtk` files. Disable when another plugin
    /// provides [`LdtkProject`] assets.
    pub register_json_loader: bool,
    pub build: LdtkBuildConfig,
}

impl Default for LdtkCoreConfig {
    fn default() -> Self {
        Self {
            register_json_loader: true,
            build: LdtkBuildConfig::default(),
        }
    }
}

/// Plugin for building LDtk projects into the ECS hierarchy.
///
/// Spawn an [`LdtkProjectRoot`] and the project is built under it once its asset is loaded.
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_ldtkmap_core::LdtkCorePlugin;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(LdtkCorePlugin::default())
///     .run();
/// ```
#[derive(Default)]
pub struct LdtkCorePlugin {
    config: LdtkCoreConfig,
}

impl LdtkCorePlugin {
    /// Create a new plugin with custom configuration.
    pub fn new(config: LdtkCoreConfig) -> Self {
        Self { config }
    }
}

impl Plugin for LdtkCorePlugin {
    fn build(&self, app: &mut App) {
        if self.config.register_json_loader {
            app.add_plugins(JsonAssetPlugin::<LdtkProject>::new(&["ldtk"]));
        } else {
            app.init_asset::<LdtkProject>();
        }

        app.insert_resource(self.config.build.clone())
            .insert_resource(FieldInjector::with_defaults())
            .insert_resource(LdtkTargetRegistry::from_inventory());

        app.register_type::<LdtkProjectRoot>()
            .register_type::<LdtkWorld>()
            .register_type::<LdtkLevel>()
            .register_type::<LevelGeometry>()
            .register_type::<LevelBackground>()
            .register_type::<LdtkLayer>()
            .register_type::<IntGridLayerData>()
            .register_type::<LdtkEntity>()
            .register_type::<LdtkEntityRef>()
            .register_type::<TileTransform>();

        // Runs before user systems
        app.add_systems(PreUpdate, process_loaded_projects);

        info!(
            "LdtkCorePlugin initialized with {} injectable targets",
            app.world().resource::<LdtkTargetRegistry>().len()
        );
    }
}
