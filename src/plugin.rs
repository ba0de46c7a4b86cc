//! Unified plugin for bevy_ldtkmap.

use bevy::prelude::*;
use bevy_ldtkmap_core::{LdtkCoreConfig, LdtkCorePlugin};

/// Unified plugin that adds all bevy_ldtkmap functionality.
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_ldtkmap::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(BevyLdtkmapPlugin::default().with_core(LdtkCoreConfig {
///         build: LdtkBuildConfig {
///             show_int_grid: true,
///             ..default()
///         },
///         ..default()
///     }))
///     .run();
/// ```
#[derive(Default)]
pub struct BevyLdtkmapPlugin {
    /// Core configuration
    pub core: LdtkCoreConfig,
}

impl BevyLdtkmapPlugin {
    /// Create with custom core configuration
    pub fn with_core(mut self, config: LdtkCoreConfig) -> Self {
        self.core = config;
        self
    }
}

impl Plugin for BevyLdtkmapPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(LdtkCorePlugin::new(self.core.clone()));

        info!("BevyLdtkmapPlugin initialized");
    }
}
