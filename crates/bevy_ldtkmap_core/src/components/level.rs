//! Level components.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::{Level, LevelBackgroundPosition};

/// A level node. Its transform places the level's bottom-left corner in world space.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Visibility)]
pub struct LdtkLevel {
    pub identifier: String,
    pub iid: String,
    pub uid: i32,
    pub world_depth: i32,
    /// Layers live in a separate file and were not built.
    pub external: bool,
}

impl From<&Level> for LdtkLevel {
    fn from(level: &Level) -> Self {
        Self {
            identifier: level.identifier.clone(),
            iid: level.iid.clone(),
            uid: level.uid,
            world_depth: level.world_depth,
            external: level.is_external(),
        }
    }
}

/// World-space geometry of a level.
///
/// # Coordinate System
///
/// - Local origin (0, 0) is the bottom-left corner of the level
/// - Y increases upward, while LDtk pixel and cell coordinates grow downward
///
/// # Example
///
/// ```rust,no_run
/// # use bevy::prelude::*;
/// # use bevy_ldtkmap_core::prelude::LevelGeometry;
/// fn current_level(
///     player: Single<&GlobalTransform, With<Player>>,
///     levels: Query<(&LevelGeometry, &Name)>,
/// ) {
///     let position = player.translation().truncate();
///     for (geometry, name) in &levels {
///         if geometry.world_bounds.contains(position) {
///             info!("Player is in {name}");
///         }
///     }
/// }
/// # #[derive(Component)] struct Player;
/// ```
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct LevelGeometry {
    /// Level size in pixels.
    pub size: Vec2,
    /// Bounds in the level's local space: `min` at (0, 0), `max` at `size`.
    pub bounds: Rect,
    /// Bounds in world space, Y up.
    pub world_bounds: Rect,
}

impl LevelGeometry {
    pub fn from_level(level: &Level) -> Self {
        let size = Vec2::new(level.px_wid as f32, level.px_hei as f32);
        let origin = Vec2::new(level.world_x as f32, -(level.world_y as f32) - size.y);
        Self {
            size,
            bounds: Rect::from_corners(Vec2::ZERO, size),
            world_bounds: Rect::from_corners(origin, origin + size),
        }
    }

    /// Local position of an LDtk pixel coordinate (Y down).
    pub fn px_to_local(&self, px: IVec2) -> Vec2 {
        Vec2::new(px.x as f32, self.size.y - px.y as f32)
    }

    /// Local center of a cell of the given grid size. `None` outside the level.
    pub fn cell_to_local(&self, cell: IVec2, grid_size: i32) -> Option<Vec2> {
        let grid = grid_size as f32;
        let center = Vec2::new((cell.x as f32 + 0.5) * grid, self.size.y - (cell.y as f32 + 0.5) * grid);
        (cell.x >= 0 && cell.y >= 0 && self.bounds.contains(center)).then_some(center)
    }

    /// Cell under a local position. `None` outside the level.
    pub fn local_to_cell(&self, local: Vec2, grid_size: i32) -> Option<IVec2> {
        if !self.bounds.contains(local) || grid_size <= 0 {
            return None;
        }
        let grid = grid_size as f32;
        let x = (local.x / grid).floor() as i32;
        let y = ((self.size.y - local.y) / grid).floor() as i32;
        // The top edge belongs to row 0
        Some(IVec2::new(x, y.max(0)))
    }
}

/// Background node of a level, one z step behind its layers.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Visibility)]
pub struct LevelBackground {
    pub color: Color,
    /// Asset path of the background image, resolved against the project file.
    pub image_path: Option<String>,
    #[reflect(ignore)]
    pub position: Option<LevelBackgroundPosition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> Level {
        Level {
            px_wid: 64,
            px_hei: 32,
            world_x: 100,
            world_y: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_world_bounds_flip_y() {
        let geometry = LevelGeometry::from_level(&level());
        assert_eq!(geometry.world_bounds.min, Vec2::new(100.0, -82.0));
        assert_eq!(geometry.world_bounds.max, Vec2::new(164.0, -50.0));
    }

    #[test]
    fn test_cell_round_trip() {
        let geometry = LevelGeometry::from_level(&level());

        let center = geometry.cell_to_local(IVec2::new(1, 0), 16).unwrap();
        assert_eq!(center, Vec2::new(24.0, 24.0));
        assert_eq!(geometry.local_to_cell(center, 16), Some(IVec2::new(1, 0)));

        assert!(geometry.cell_to_local(IVec2::new(4, 0), 16).is_none());
        assert!(geometry.local_to_cell(Vec2::new(-1.0, 0.0), 16).is_none());
    }
}
