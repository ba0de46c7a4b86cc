//! Entity instance components.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::{EntityDefinition, EntityInstance, TilesetRect};

use crate::fields::parse_color;

/// An entity node, carrying the metadata of its LDtk entity instance.
///
/// Field values are in the sibling [`LdtkFields`](crate::fields::LdtkFields) component.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Visibility)]
pub struct LdtkEntity {
    pub identifier: String,
    pub iid: String,
    pub def_uid: i32,
    /// Cell of the entity pivot.
    pub grid: IVec2,
    /// Size in pixels.
    pub size: Vec2,
    pub pivot: Vec2,
    pub tags: Vec<String>,
    pub color: Color,
    #[reflect(ignore)]
    pub tile: Option<TilesetRect>,
}

impl LdtkEntity {
    pub fn new(instance: &EntityInstance, definition: &EntityDefinition) -> Self {
        let color = parse_color(&instance.smart_color)
            .or_else(|| parse_color(&definition.color))
            .unwrap_or(Color::WHITE);
        let size = if instance.width > 0 && instance.height > 0 {
            Vec2::new(instance.width as f32, instance.height as f32)
        } else {
            Vec2::new(definition.width as f32, definition.height as f32)
        };

        Self {
            identifier: definition.identifier.clone(),
            iid: instance.iid.clone(),
            def_uid: definition.uid,
            grid: IVec2::new(instance.grid[0], instance.grid[1]),
            size,
            pivot: Vec2::new(instance.pivot[0], instance.pivot[1]),
            tags: instance.tags.clone(),
            color,
            tile: instance.tile.or(definition.tile_rect),
        }
    }
}
