//! Layer nodes and dispatch per layer content kind.

use std::collections::HashSet;

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::{
    LayerContentKind, LayerDefinition, LayerInstance, Level, TileInstance, TilesetDefinition,
};

use super::context::BuildContext;
use super::entities::build_entities;
use crate::autotile::{AutoTileEvaluator, IntGridView};
use crate::components::{IntGridLayerData, LdtkLayer};
use crate::error::{ImportError, UidKind};
use crate::events::LayerSpawned;
use crate::fields::parse_color;
use crate::tiles::{TilePlacementBatch, TileTransform, TilemapTarget};

/// Z step between tilemaps of the same layer.
const TILEMAP_Z_STEP: f32 = 0.01;

/// Builds one layer instance: int-grid painter, auto-tile evaluator, tile placer and entity
/// instantiator, in that order.
pub(crate) struct LayerBuilder<'a> {
    level: &'a Level,
    layer: &'a LayerInstance,
    /// Every layer of the level, for auto-layers fed by another layer's int-grid.
    siblings: &'a [LayerInstance],
    z: f32,
}

/// Per-layer state while committing tilemaps.
struct LayerNode<'a> {
    entity: Entity,
    definition: &'a LayerDefinition,
    tileset: Option<&'a TilesetDefinition>,
    description: String,
    tilemaps: Vec<Entity>,
}

impl LayerNode<'_> {
    fn next_z(&self) -> f32 {
        self.tilemaps.len() as f32 * TILEMAP_Z_STEP
    }
}

impl<'a> LayerBuilder<'a> {
    pub fn new(level: &'a Level, layer: &'a LayerInstance, siblings: &'a [LayerInstance], z: f32) -> Self {
        Self {
            level,
            layer,
            siblings,
            z,
        }
    }

    /// Spawn the layer node under `level_entity` and build its content.
    ///
    /// A layer whose definition cannot be resolved is reported and not built.
    pub fn build(
        &self,
        world: &mut World,
        level_entity: Entity,
        context: &mut BuildContext<'_>,
    ) -> Option<Entity> {
        let layer = self.layer;
        let description = format!(
            "layer '{}' of level '{}'",
            layer.identifier, self.level.identifier
        );

        let definition = context
            .errors
            .ok(context.registry.layer_def(layer.layer_def_uid, &description))?;
        let tileset = match layer.effective_tileset_uid().or(definition.tileset_uid()) {
            Some(uid) => context.errors.ok(context.registry.tileset(uid, &description)),
            None => None,
        };

        let visibility = if layer.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        let entity = world
            .spawn((
                Name::new(format!("Layer: {}", layer.identifier)),
                LdtkLayer::from(layer),
                Transform::from_xyz(
                    layer.px_total_offset_x as f32,
                    -layer.px_total_offset_y as f32,
                    self.z,
                ),
                visibility,
                ChildOf(level_entity),
            ))
            .id();

        let mut node = LayerNode {
            entity,
            definition,
            tileset,
            description,
            tilemaps: Vec::new(),
        };

        let evaluate_rules = definition.has_auto_rules()
            && (context.config.evaluate_auto_rules || !layer.has_auto_tiles());

        for kind in layer.content_kinds() {
            match kind {
                LayerContentKind::IntGrid => self.paint_int_grid(world, &mut node, context),
                LayerContentKind::AutoTiles if evaluate_rules => {}
                LayerContentKind::AutoTiles => {
                    self.place_tiles(world, &mut node, &layer.auto_layer_tiles, context);
                }
                LayerContentKind::GridTiles => {
                    self.place_tiles(world, &mut node, &layer.grid_tiles, context);
                }
                LayerContentKind::Entities => {
                    build_entities(world, self.level, layer, entity, context);
                }
            }
        }
        if evaluate_rules {
            self.evaluate_rules(world, &mut node, context);
        }

        debug!(
            "Built {} with {} tilemaps",
            node.description,
            node.tilemaps.len()
        );

        let identifier = layer.identifier.clone();
        let tilemaps = node.tilemaps;
        context.post_build.push(move |world: &mut World| {
            world.trigger(LayerSpawned {
                entity,
                level_entity,
                identifier,
                tilemaps,
            });
        });

        Some(entity)
    }

    /// Int-grid cells become tiles tinted with their value colour, hidden unless configured
    /// otherwise. The values themselves are kept on the layer node.
    fn paint_int_grid(&self, world: &mut World, node: &mut LayerNode<'_>, context: &mut BuildContext<'_>) {
        let layer = self.layer;
        let data = IntGridLayerData::from_layer(layer);
        let mut batch = TilePlacementBatch::new(node.description.clone());
        let mut unknown = HashSet::new();

        for (cell, value) in data.iter_filled() {
            let Some(value_def) = node.definition.int_grid_value(value) else {
                if unknown.insert(value) {
                    context.errors.report(ImportError::unresolved(
                        UidKind::IntGridValue,
                        value,
                        &node.description,
                    ));
                }
                continue;
            };
            if context.errors.ok(batch.stage(cell, (value - 1).max(0) as u32)).is_none() {
                continue;
            }
            let color = parse_color(&value_def.color).unwrap_or(Color::WHITE);
            batch.stage_tint(cell, color.with_alpha(layer.opacity));
        }
        world.entity_mut(node.entity).insert(data);

        let target = TilemapTarget {
            parent: node.entity,
            texture: Handle::default(),
            tile_size: Vec2::splat(layer.grid_size as f32),
            grid_size: layer.grid_size as f32,
            height_cells: layer.c_hei,
            visible: context.config.show_int_grid,
            is_int_grid: true,
            z: node.next_z(),
        };
        if let Some(committed) = batch.commit(world, &target) {
            node.tilemaps.push(committed.entity);
        }
    }

    /// Run the definition's rules over the int-grid feeding this layer.
    fn evaluate_rules(&self, world: &mut World, node: &mut LayerNode<'_>, context: &mut BuildContext<'_>) {
        let layer = self.layer;
        let source = match node.definition.auto_source_layer_def_uid {
            Some(uid) if uid != node.definition.uid => self
                .siblings
                .iter()
                .find(|sibling| sibling.layer_def_uid == uid),
            _ => Some(layer),
        };
        let Some(source) = source else {
            if let Some(uid) = node.definition.auto_source_layer_def_uid {
                context.errors.report(ImportError::unresolved(
                    UidKind::LayerInstance,
                    uid,
                    &node.description,
                ));
            }
            return;
        };

        let grid = IntGridView::new(source.c_wid, source.c_hei, &source.int_grid_csv);
        let evaluator = AutoTileEvaluator::new(node.definition, layer, node.tileset, &mut context.errors);
        let mut batch = TilePlacementBatch::new(node.description.clone());
        let staged = evaluator.evaluate(&grid, &mut batch, &mut context.errors);

        debug!(
            "{} auto-layer rules staged {staged} tiles in {}",
            evaluator.rule_count(),
            node.description
        );

        let target = self.tile_target(node, context);
        if let Some(committed) = batch.commit(world, &target) {
            node.tilemaps.push(committed.entity);
        }
    }

    /// Place precomputed tiles. Tiles stacked on one cell go to additional tilemaps above
    /// the first one.
    fn place_tiles(
        &self,
        world: &mut World,
        node: &mut LayerNode<'_>,
        tiles: &[TileInstance],
        context: &mut BuildContext<'_>,
    ) {
        let layer = self.layer;
        if node.tileset.is_none() && layer.effective_tileset_uid().is_none() {
            context.errors.report(ImportError::unresolved(
                UidKind::Tileset,
                "null",
                &node.description,
            ));
            return;
        }

        let mut batches: Vec<TilePlacementBatch> = Vec::new();
        for tile in tiles {
            let Ok(tile_id) = u32::try_from(tile.t) else {
                debug!("Skipping tile with id {} in {}", tile.t, node.description);
                continue;
            };
            let (cx, cy) = tile.cell(layer.grid_size);
            let cell = IVec2::new(cx, cy);

            let index = match batches.iter().position(|batch| batch.tile_at(cell).is_none()) {
                Some(index) => index,
                None => {
                    batches.push(TilePlacementBatch::new(node.description.clone()));
                    batches.len() - 1
                }
            };
            let batch = &mut batches[index];
            if context.errors.ok(batch.stage(cell, tile_id)).is_none() {
                continue;
            }

            let alpha = tile.a * layer.opacity;
            if alpha < 1.0 {
                batch.stage_tint(cell, Color::srgba(1.0, 1.0, 1.0, alpha.max(0.0)));
            }
            let transform = TileTransform::flipped(tile.flip_x(), tile.flip_y());
            if !transform.is_identity() {
                batch.stage_transform(cell, transform);
            }
        }

        for batch in batches {
            let target = self.tile_target(node, context);
            if let Some(committed) = batch.commit(world, &target) {
                node.tilemaps.push(committed.entity);
            }
        }
    }

    fn tile_target(&self, node: &LayerNode<'_>, context: &BuildContext<'_>) -> TilemapTarget {
        let layer = self.layer;
        let (texture, tile_size) = match node.tileset {
            Some(tileset) => (
                context.tileset_image(tileset.uid),
                tileset.tile_grid_size as f32,
            ),
            None => (Handle::default(), layer.grid_size as f32),
        };

        TilemapTarget {
            parent: node.entity,
            texture,
            tile_size: Vec2::splat(tile_size),
            grid_size: layer.grid_size as f32,
            height_cells: layer.c_hei,
            visible: true,
            is_int_grid: false,
            z: node.next_z(),
        }
    }
}
