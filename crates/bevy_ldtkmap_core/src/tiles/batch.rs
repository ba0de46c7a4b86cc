//! Staging buffer for the tiles of one tilemap.
//!
//! Builders stage cell assignments and per-cell overrides, then [`TilePlacementBatch::commit`]
//! turns the whole buffer into a `bevy_ecs_tilemap` tilemap with a single
//! `World::spawn_batch` call.

use std::collections::HashMap;

use bevy::prelude::*;
use bevy_ecs_tilemap::prelude::*;

use crate::error::ImportError;

/// Per-tile flip and pixel offset, from rule flips, tile flip bits and jitter.
///
/// Flips are mirrored into `TileFlip`; the offset is kept on the tile for renderers that
/// support it.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Reflect)]
#[reflect(Component)]
pub struct TileTransform {
    pub flip_x: bool,
    pub flip_y: bool,
    /// Pixel offset, Y up.
    pub offset: Vec2,
}

impl TileTransform {
    pub fn flipped(flip_x: bool, flip_y: bool) -> Self {
        Self {
            flip_x,
            flip_y,
            offset: Vec2::ZERO,
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.flip_x && !self.flip_y && self.offset == Vec2::ZERO
    }
}

/// Where and how a batch is committed.
#[derive(Debug, Clone)]
pub struct TilemapTarget {
    /// Entity the tilemap becomes a child of, usually the layer node.
    pub parent: Entity,
    pub texture: Handle<Image>,
    /// Size of one tile in the texture, in pixels.
    pub tile_size: Vec2,
    /// Size of one grid cell, in pixels.
    pub grid_size: f32,
    /// Height of the layer in cells, for the Y flip.
    pub height_cells: i32,
    pub visible: bool,
    /// Tiles only carry int-grid data; anything attached to them is removed.
    pub is_int_grid: bool,
    pub z: f32,
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommittedTilemap {
    pub entity: Entity,
    /// Occupied cells, inclusive on both ends, in layer cell coordinates (Y down).
    pub bounds: IRect,
    pub tile_count: usize,
}

/// Pending tile assignments and overrides for one tilemap.
#[derive(Debug, Default)]
pub struct TilePlacementBatch {
    context: String,
    tiles: HashMap<IVec2, u32>,
    order: Vec<IVec2>,
    tints: HashMap<IVec2, Color>,
    transforms: HashMap<IVec2, TileTransform>,
}

impl TilePlacementBatch {
    /// Empty batch; `context` names the layer in error messages.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..default()
        }
    }

    /// Stage `tile` at `cell`. A cell that already holds a tile keeps it.
    pub fn stage(&mut self, cell: IVec2, tile: u32) -> Result<(), ImportError> {
        if self.tiles.contains_key(&cell) {
            return Err(ImportError::DuplicateStage {
                cell,
                context: self.context.clone(),
            });
        }
        self.tiles.insert(cell, tile);
        self.order.push(cell);
        Ok(())
    }

    /// Tint for the tile at `cell`, applied after commit.
    pub fn stage_tint(&mut self, cell: IVec2, color: Color) {
        self.tints.insert(cell, color);
    }

    /// Flip and offset for the tile at `cell`, applied after commit.
    pub fn stage_transform(&mut self, cell: IVec2, transform: TileTransform) {
        self.transforms.insert(cell, transform);
    }

    pub fn tile_at(&self, cell: IVec2) -> Option<u32> {
        self.tiles.get(&cell).copied()
    }

    pub fn tint_at(&self, cell: IVec2) -> Option<Color> {
        self.tints.get(&cell).copied()
    }

    pub fn transform_at(&self, cell: IVec2) -> Option<TileTransform> {
        self.transforms.get(&cell).copied()
    }

    /// Staged tiles in staging order.
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, u32)> + '_ {
        self.order.iter().map(|cell| (*cell, self.tiles[cell]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Rectangle enclosing every staged cell.
    pub fn bounds(&self) -> Option<IRect> {
        let first = *self.order.first()?;
        let (min, max) = self
            .order
            .iter()
            .fold((first, first), |(min, max), cell| (min.min(*cell), max.max(*cell)));
        Some(IRect::from_corners(min, max))
    }

    /// Spawn the tilemap and all its tiles.
    ///
    /// Tiles are spawned by one `spawn_batch` call, then tints and transforms are applied to
    /// the spawned tiles. The tilemap is sized to the occupied rectangle and positioned so
    /// each tile sits on its cell in layer space. Returns `None` for an empty batch.
    pub fn commit(self, world: &mut World, target: &TilemapTarget) -> Option<CommittedTilemap> {
        let bounds = self.bounds()?;
        let (min, max) = (bounds.min, bounds.max);
        let size = TilemapSize {
            x: (max.x - min.x + 1) as u32,
            y: (max.y - min.y + 1) as u32,
        };

        let tilemap = world.spawn((Name::new("Tilemap"), ChildOf(target.parent))).id();

        // Cell Y grows downward, TilePos Y grows upward
        let positions: Vec<(IVec2, TilePos)> = self
            .order
            .iter()
            .map(|cell| {
                let pos = TilePos {
                    x: (cell.x - min.x) as u32,
                    y: (max.y - cell.y) as u32,
                };
                (*cell, pos)
            })
            .collect();

        let visible = TileVisible(target.visible);
        let tiles = &self.tiles;
        let entities: Vec<Entity> = world
            .spawn_batch(positions.iter().map(|(cell, pos)| {
                (
                    TileBundle {
                        position: *pos,
                        texture_index: TileTextureIndex(tiles[cell]),
                        tilemap_id: TilemapId(tilemap),
                        visible,
                        ..default()
                    },
                    ChildOf(tilemap),
                )
            }))
            .collect();

        let mut storage = TileStorage::empty(size);
        let mut by_cell = HashMap::with_capacity(entities.len());
        for ((cell, pos), entity) in positions.iter().zip(&entities) {
            storage.set(pos, *entity);
            by_cell.insert(*cell, *entity);
        }

        for (cell, color) in &self.tints {
            if *color == Color::WHITE {
                continue;
            }
            match by_cell.get(cell) {
                Some(entity) => {
                    world.entity_mut(*entity).insert(TileColor(*color));
                }
                None => debug!("Tint staged on empty cell {cell} in {}", self.context),
            }
        }

        for (cell, transform) in &self.transforms {
            if transform.is_identity() {
                continue;
            }
            match by_cell.get(cell) {
                Some(entity) => {
                    world.entity_mut(*entity).insert((
                        TileFlip {
                            x: transform.flip_x,
                            y: transform.flip_y,
                            d: false,
                        },
                        *transform,
                    ));
                }
                None => debug!("Transform staged on empty cell {cell} in {}", self.context),
            }
        }

        let grid = target.grid_size;
        let origin = Vec3::new(
            (min.x as f32 + 0.5) * grid,
            (target.height_cells - max.y) as f32 * grid - 0.5 * grid,
            target.z,
        );

        world.entity_mut(tilemap).insert(TilemapBundle {
            grid_size: TilemapGridSize { x: grid, y: grid },
            size,
            storage,
            texture: TilemapTexture::Single(target.texture.clone()),
            tile_size: TilemapTileSize {
                x: target.tile_size.x,
                y: target.tile_size.y,
            },
            map_type: TilemapType::Square,
            transform: Transform::from_translation(origin),
            ..default()
        });

        if target.is_int_grid {
            // Let observers and hooks run before looking for what they attached
            world.flush();
            for entity in &entities {
                let Some(children) = world.get::<Children>(*entity) else {
                    continue;
                };
                for child in children.to_vec() {
                    world.despawn(child);
                }
            }
        }

        Some(CommittedTilemap {
            entity: tilemap,
            bounds,
            tile_count: entities.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(world: &mut World, is_int_grid: bool) -> TilemapTarget {
        TilemapTarget {
            parent: world.spawn_empty().id(),
            texture: Handle::default(),
            tile_size: Vec2::splat(16.0),
            grid_size: 16.0,
            height_cells: 4,
            visible: true,
            is_int_grid,
            z: 0.0,
        }
    }

    #[test]
    fn test_duplicate_stage_keeps_first() {
        let mut batch = TilePlacementBatch::new("layer 'Ground'");
        assert!(batch.stage(IVec2::new(1, 1), 4).is_ok());

        let error = batch.stage(IVec2::new(1, 1), 9).unwrap_err();

        assert!(matches!(error, ImportError::DuplicateStage { cell, .. } if cell == IVec2::new(1, 1)));
        assert_eq!(batch.tile_at(IVec2::new(1, 1)), Some(4));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_commit_covers_exactly_staged_cells() {
        for order in [[(0, 10), (1, 11)], [(1, 11), (0, 10)]] {
            let mut world = World::new();
            let target = target(&mut world, false);
            let mut batch = TilePlacementBatch::new("test");
            for (x, tile) in order {
                batch.stage(IVec2::new(x, 0), tile).unwrap();
            }

            let committed = batch.commit(&mut world, &target).unwrap();

            assert_eq!(committed.tile_count, 2);
            let storage = world.get::<TileStorage>(committed.entity).unwrap();
            assert_eq!(storage.size, TilemapSize { x: 2, y: 1 });
            let index_at = |x| {
                let tile = storage.get(&TilePos { x, y: 0 }).unwrap();
                world.get::<TileTextureIndex>(tile).unwrap().0
            };
            assert_eq!(index_at(0), 10);
            assert_eq!(index_at(1), 11);
        }
    }

    #[test]
    fn test_bounds_are_compacted_to_occupied_cells() {
        let mut world = World::new();
        let target = target(&mut world, false);
        let mut batch = TilePlacementBatch::new("test");
        batch.stage(IVec2::new(2, 1), 0).unwrap();
        batch.stage(IVec2::new(3, 2), 0).unwrap();

        let committed = batch.commit(&mut world, &target).unwrap();

        assert_eq!(committed.bounds, IRect::new(2, 1, 3, 2));
        let transform = world.get::<Transform>(committed.entity).unwrap();
        // Cell (2, 2) is TilePos (0, 0), the tilemap origin
        assert_eq!(transform.translation, Vec3::new(40.0, 24.0, 0.0));
    }

    #[test]
    fn test_overrides_apply_only_when_not_default() {
        let mut world = World::new();
        let target = target(&mut world, false);
        let mut batch = TilePlacementBatch::new("test");
        batch.stage(IVec2::new(0, 0), 1).unwrap();
        batch.stage(IVec2::new(1, 0), 2).unwrap();
        batch.stage_tint(IVec2::new(0, 0), Color::srgba(1.0, 1.0, 1.0, 0.5));
        batch.stage_tint(IVec2::new(1, 0), Color::WHITE);
        batch.stage_transform(IVec2::new(1, 0), TileTransform::flipped(true, false));

        let committed = batch.commit(&mut world, &target).unwrap();
        let storage = world.get::<TileStorage>(committed.entity).unwrap().clone();
        let first = storage.get(&TilePos { x: 0, y: 0 }).unwrap();
        let second = storage.get(&TilePos { x: 1, y: 0 }).unwrap();

        assert_eq!(
            world.get::<TileColor>(first).unwrap().0,
            Color::srgba(1.0, 1.0, 1.0, 0.5)
        );
        assert_eq!(world.get::<TileColor>(second).unwrap().0, Color::WHITE);
        assert!(world.get::<TileFlip>(second).unwrap().x);
        assert!(world.get::<TileTransform>(first).is_none());
    }

    #[test]
    fn test_int_grid_commit_removes_attached_children() {
        let mut world = World::new();
        world.add_observer(|add: On<Add, TilePos>, mut commands: Commands| {
            commands.spawn((Name::new("Placeholder"), ChildOf(add.entity)));
        });
        let target = target(&mut world, true);
        let mut batch = TilePlacementBatch::new("test");
        batch.stage(IVec2::new(0, 0), 0).unwrap();

        let committed = batch.commit(&mut world, &target).unwrap();
        let storage = world.get::<TileStorage>(committed.entity).unwrap();
        let tile = storage.get(&TilePos { x: 0, y: 0 }).unwrap();

        assert!(world.get::<Children>(tile).is_none_or(|children| children.is_empty()));
    }

    #[test]
    fn test_empty_batch_commits_nothing() {
        let mut world = World::new();
        let target = target(&mut world, false);
        assert!(TilePlacementBatch::new("test").commit(&mut world, &target).is_none());
    }
}
