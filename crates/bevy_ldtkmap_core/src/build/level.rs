//! Level nodes: background, layers and level fields.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::Level;

use super::context::BuildContext;
use super::layers::LayerBuilder;
use crate::components::{LdtkLevel, LevelBackground, LevelGeometry};
use crate::events::LevelSpawned;
use crate::fields::{LdtkFields, parse_color};

/// Builds one level subtree.
pub(crate) struct LevelBuilder<'a> {
    level: &'a Level,
}

impl<'a> LevelBuilder<'a> {
    pub fn new(level: &'a Level) -> Self {
        Self { level }
    }

    /// Spawn the level node under `world_entity`, then its background and layers.
    ///
    /// The level node sits at the level's bottom-left corner in world space. Layers are
    /// stored front-most first, so the first layer gets the highest z.
    pub fn build(&self, world: &mut World, world_entity: Entity, context: &mut BuildContext<'_>) -> Entity {
        let level = self.level;
        let description = format!("level '{}'", level.identifier);

        let fields = LdtkFields::from_instances(
            &level.field_instances,
            &context.registry,
            &description,
            &mut context.errors,
        );

        let mut node = world.spawn((
            Name::new(format!("Level: {}", level.identifier)),
            LdtkLevel::from(level),
            LevelGeometry::from_level(level),
            Transform::from_xyz(
                level.world_x as f32,
                -(level.world_y + level.px_hei) as f32,
                0.0,
            ),
            ChildOf(world_entity),
        ));
        for target in context.targets.for_level() {
            (target.insert)(&mut node, context.injector, &fields, &description, &mut context.errors);
        }
        node.insert(fields);
        let level_entity = node.id();

        self.spawn_background(world, level_entity, &description, context);

        if level.is_external() {
            warn!("LDtk: {description} is stored in a separate file, its layers are not built");
            if let Some(path) = &level.external_rel_path {
                context.depend_on(path, &description);
            }
        }

        let layers = level.layers();
        let layer_z = context.config.layer_z;
        for (index, layer) in layers.iter().enumerate() {
            let depth = (layers.len() - 1 - index) as f32;
            let z = layer_z.offset + depth * layer_z.multiplier;
            LayerBuilder::new(level, layer, layers, z).build(world, level_entity, context);
        }

        debug!("Built {description} with {} layers", layers.len());

        let identifier = level.identifier.clone();
        context.post_build.push(move |world: &mut World| {
            world.trigger(LevelSpawned {
                entity: level_entity,
                world_entity,
                identifier,
            });
        });

        level_entity
    }

    fn spawn_background(
        &self,
        world: &mut World,
        level_entity: Entity,
        description: &str,
        context: &mut BuildContext<'_>,
    ) {
        let level = self.level;
        let color = parse_color(level.background_color()).unwrap_or(Color::BLACK);
        let image_path = level
            .bg_rel_path
            .as_deref()
            .and_then(|path| context.depend_on(path, description));
        let layer_z = context.config.layer_z;

        world.spawn((
            Name::new("Background"),
            LevelBackground {
                color,
                image_path,
                position: level.bg_pos.clone(),
            },
            Transform::from_xyz(0.0, 0.0, layer_z.offset - layer_z.multiplier),
            ChildOf(level_entity),
        ));
    }
}
