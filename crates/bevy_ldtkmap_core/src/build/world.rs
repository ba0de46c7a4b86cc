//! World nodes.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::WorldView;

use super::context::BuildContext;
use super::level::LevelBuilder;
use crate::components::LdtkWorld;
use crate::events::WorldSpawned;

/// Builds one world and every level in it.
pub(crate) struct WorldBuilder<'a> {
    view: WorldView<'a>,
}

impl<'a> WorldBuilder<'a> {
    pub fn new(view: WorldView<'a>) -> Self {
        Self { view }
    }

    /// Spawn the world node under `root`, then its levels in document order.
    pub fn build(&self, world: &mut World, root: Entity, context: &mut BuildContext<'_>) -> Entity {
        let view = &self.view;
        let world_entity = world
            .spawn((
                Name::new(format!("World: {}", view.identifier)),
                LdtkWorld {
                    identifier: view.identifier.to_string(),
                    iid: view.iid.to_string(),
                    layout: view.layout,
                },
                ChildOf(root),
            ))
            .id();

        for level in view.levels {
            LevelBuilder::new(level).build(world, world_entity, context);
        }

        debug!(
            "Built world '{}' with {} levels",
            view.identifier,
            view.levels.len()
        );

        context.post_build.push(move |world: &mut World| {
            world.trigger(WorldSpawned {
                entity: world_entity,
            });
        });

        world_entity
    }
}
