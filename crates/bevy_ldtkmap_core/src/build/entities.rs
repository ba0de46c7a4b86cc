//! Entity nodes.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::{LayerInstance, Level};

use super::context::BuildContext;
use crate::components::LdtkEntity;
use crate::events::EntitySpawned;
use crate::fields::LdtkFields;

/// Spawn one node per entity instance of `layer` under `layer_entity`.
///
/// Each node carries [`LdtkEntity`], its [`LdtkFields`] and every component registered for
/// its identifier with `#[derive(LdtkInjectable)]`. An instance whose definition cannot be
/// resolved is reported and skipped; its siblings still build. Returns the number of nodes
/// spawned.
pub(crate) fn build_entities(
    world: &mut World,
    level: &Level,
    layer: &LayerInstance,
    layer_entity: Entity,
    context: &mut BuildContext<'_>,
) -> usize {
    let mut spawned = 0;

    for instance in &layer.entity_instances {
        let description = format!(
            "entity '{}' ({}) in layer '{}' of level '{}'",
            instance.identifier, instance.iid, layer.identifier, level.identifier
        );

        let Some(definition) = context
            .errors
            .ok(context.registry.entity_def(instance.def_uid, &description))
        else {
            continue;
        };

        let fields = LdtkFields::from_instances(
            &instance.field_instances,
            &context.registry,
            &description,
            &mut context.errors,
        );

        // Pixel position is Y down from the level's top edge
        let translation = Vec3::new(
            instance.px[0] as f32,
            (level.px_hei - instance.px[1]) as f32,
            0.0,
        );

        let mut node = world.spawn((
            Name::new(format!("Entity: {}", definition.identifier)),
            LdtkEntity::new(instance, definition),
            Transform::from_translation(translation),
            ChildOf(layer_entity),
        ));
        for target in context.targets.for_entity(&definition.identifier) {
            (target.insert)(&mut node, context.injector, &fields, &description, &mut context.errors);
        }
        node.insert(fields);
        let entity = node.id();
        spawned += 1;

        let identifier = definition.identifier.clone();
        context.post_build.push(move |world: &mut World| {
            world.trigger(EntitySpawned {
                entity,
                layer_entity,
                identifier,
            });
        });
    }

    spawned
}
