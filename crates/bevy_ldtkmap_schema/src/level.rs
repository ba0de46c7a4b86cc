//! Levels and their per-level instance data.

use serde::Deserialize;
use serde_json::Value;

use crate::defs::{LayerType, TilesetRect};

/// A level of a world.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Level {
    pub identifier: String,
    pub iid: String,
    pub uid: i32,
    pub px_wid: i32,
    pub px_hei: i32,
    /// World-space X of the top-left corner, in pixels.
    pub world_x: i32,
    /// World-space Y of the top-left corner, in pixels (Y down).
    pub world_y: i32,
    pub world_depth: i32,
    /// Resolved background colour (`#rrggbb`), project default applied.
    #[serde(rename = "__bgColor")]
    pub resolved_bg_color: String,
    /// Level-specific background colour override.
    pub bg_color: Option<String>,
    pub bg_rel_path: Option<String>,
    #[serde(rename = "__bgPos")]
    pub bg_pos: Option<LevelBackgroundPosition>,
    pub field_instances: Vec<FieldInstance>,
    /// Layers, front-most first. `None` when the level lives in a separate file.
    pub layer_instances: Option<Vec<LayerInstance>>,
    /// Path of the separate level file, relative to the project.
    pub external_rel_path: Option<String>,
}

impl Level {
    /// Background colour, preferring the level override.
    pub fn background_color(&self) -> &str {
        self.bg_color.as_deref().unwrap_or(&self.resolved_bg_color)
    }

    /// Layer instances, or an empty slice for external levels.
    pub fn layers(&self) -> &[LayerInstance] {
        self.layer_instances.as_deref().unwrap_or_default()
    }

    /// Whether the level's layers are stored in another file.
    pub fn is_external(&self) -> bool {
        self.layer_instances.is_none() && self.external_rel_path.is_some()
    }
}

/// Placement of a level background image.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelBackgroundPosition {
    /// `[x, y, width, height]` of the cropped image region, in pixels.
    pub crop_rect: [f32; 4],
    pub scale: [f32; 2],
    pub top_left_px: [i32; 2],
}

/// What a layer instance contributes to the scene.
///
/// A layer instance may hold several kinds at once (an int-grid layer with auto rules holds
/// both cells and auto tiles); builders dispatch once per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerContentKind {
    IntGrid,
    AutoTiles,
    GridTiles,
    Entities,
}

/// Per-level realization of a layer definition.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__type")]
    pub layer_type: LayerType,
    #[serde(rename = "__cWid")]
    pub c_wid: i32,
    #[serde(rename = "__cHei")]
    pub c_hei: i32,
    #[serde(rename = "__gridSize")]
    pub grid_size: i32,
    #[serde(rename = "__opacity")]
    pub opacity: f32,
    #[serde(rename = "__pxTotalOffsetX")]
    pub px_total_offset_x: i32,
    #[serde(rename = "__pxTotalOffsetY")]
    pub px_total_offset_y: i32,
    #[serde(rename = "__tilesetDefUid")]
    pub tileset_def_uid: Option<i32>,
    #[serde(rename = "__tilesetRelPath")]
    pub tileset_rel_path: Option<String>,
    pub iid: String,
    /// UID of the level containing this instance.
    pub level_id: i32,
    pub layer_def_uid: i32,
    pub px_offset_x: i32,
    pub px_offset_y: i32,
    pub visible: bool,
    /// Row-major int-grid values, `0` meaning empty.
    pub int_grid_csv: Vec<i32>,
    /// Tiles produced by auto-layer rules, as computed by the editor.
    pub auto_layer_tiles: Vec<TileInstance>,
    /// Hand-placed tiles.
    pub grid_tiles: Vec<TileInstance>,
    pub entity_instances: Vec<EntityInstance>,
    /// Random seed for auto-layer rules.
    pub seed: i64,
    pub override_tileset_uid: Option<i32>,
    /// UIDs of optional rule groups enabled for this instance.
    pub optional_rules: Vec<i32>,
}

impl Default for LayerInstance {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            layer_type: LayerType::default(),
            c_wid: 0,
            c_hei: 0,
            grid_size: 16,
            opacity: 1.0,
            px_total_offset_x: 0,
            px_total_offset_y: 0,
            tileset_def_uid: None,
            tileset_rel_path: None,
            iid: String::new(),
            level_id: 0,
            layer_def_uid: 0,
            px_offset_x: 0,
            px_offset_y: 0,
            visible: true,
            int_grid_csv: Vec::new(),
            auto_layer_tiles: Vec::new(),
            grid_tiles: Vec::new(),
            entity_instances: Vec::new(),
            seed: 0,
            override_tileset_uid: None,
            optional_rules: Vec::new(),
        }
    }
}

impl LayerInstance {
    /// Whether the int-grid holds at least one non-empty cell.
    pub fn is_int_grid(&self) -> bool {
        self.int_grid_csv.iter().any(|v| *v != 0)
    }

    /// Whether the editor computed auto-layer tiles for this instance.
    pub fn has_auto_tiles(&self) -> bool {
        !self.auto_layer_tiles.is_empty()
    }

    pub fn has_grid_tiles(&self) -> bool {
        !self.grid_tiles.is_empty()
    }

    pub fn has_entities(&self) -> bool {
        !self.entity_instances.is_empty()
    }

    /// Content kinds present in this instance, in build order.
    pub fn content_kinds(&self) -> Vec<LayerContentKind> {
        let mut kinds = Vec::with_capacity(4);
        if self.is_int_grid() {
            kinds.push(LayerContentKind::IntGrid);
        }
        if self.has_auto_tiles() {
            kinds.push(LayerContentKind::AutoTiles);
        }
        if self.has_grid_tiles() {
            kinds.push(LayerContentKind::GridTiles);
        }
        if self.has_entities() {
            kinds.push(LayerContentKind::Entities);
        }
        kinds
    }

    /// Tileset in effect: the per-instance override wins over the definition's.
    pub fn effective_tileset_uid(&self) -> Option<i32> {
        self.override_tileset_uid.or(self.tileset_def_uid)
    }

    /// Int-grid value at a cell, `None` outside the grid.
    pub fn int_grid_value(&self, cx: i32, cy: i32) -> Option<i32> {
        if cx < 0 || cy < 0 || cx >= self.c_wid || cy >= self.c_hei {
            return None;
        }
        self.int_grid_csv
            .get((cy * self.c_wid + cx) as usize)
            .copied()
    }
}

/// One placed tile.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TileInstance {
    /// Pixel position in the layer, top-left corner.
    pub px: [i32; 2],
    /// Pixel position in the tileset image.
    pub src: [i32; 2],
    /// Flip bits: bit 0 flips X, bit 1 flips Y.
    pub f: u8,
    /// Tile id in the tileset.
    pub t: i32,
    /// Alpha, `1.0` when opaque.
    pub a: f32,
}

impl Default for TileInstance {
    fn default() -> Self {
        Self {
            px: [0, 0],
            src: [0, 0],
            f: 0,
            t: 0,
            a: 1.0,
        }
    }
}

impl TileInstance {
    #[inline]
    pub fn flip_x(&self) -> bool {
        self.f & 1 != 0
    }

    #[inline]
    pub fn flip_y(&self) -> bool {
        self.f & 2 != 0
    }

    /// Grid cell covered by this tile.
    pub fn cell(&self, grid_size: i32) -> (i32, i32) {
        if grid_size <= 0 {
            return (0, 0);
        }
        (
            self.px[0].div_euclid(grid_size),
            self.px[1].div_euclid(grid_size),
        )
    }
}

/// A placed entity.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__grid")]
    pub grid: [i32; 2],
    #[serde(rename = "__pivot")]
    pub pivot: [f32; 2],
    #[serde(rename = "__tags")]
    pub tags: Vec<String>,
    #[serde(rename = "__tile")]
    pub tile: Option<TilesetRect>,
    #[serde(rename = "__smartColor")]
    pub smart_color: String,
    #[serde(rename = "__worldX")]
    pub world_x: Option<i32>,
    #[serde(rename = "__worldY")]
    pub world_y: Option<i32>,
    pub iid: String,
    pub def_uid: i32,
    pub width: i32,
    pub height: i32,
    /// Pixel position in the layer, at the entity pivot.
    pub px: [i32; 2],
    pub field_instances: Vec<FieldInstance>,
}

/// Value of one field on an entity or a level.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__type")]
    pub type_name: String,
    /// Raw JSON value; its shape depends on the declared type.
    #[serde(rename = "__value")]
    pub value: Value,
    #[serde(rename = "__tile")]
    pub tile: Option<TilesetRect>,
    pub def_uid: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_content_kinds() {
        let layer: LayerInstance = serde_json::from_value(serde_json::json!({
            "__identifier": "Walls",
            "__type": "IntGrid",
            "__cWid": 2,
            "__cHei": 1,
            "intGridCsv": [0, 1],
            "autoLayerTiles": [{ "px": [16, 0], "src": [0, 0], "f": 0, "t": 0 }]
        }))
        .unwrap();

        assert_eq!(
            layer.content_kinds(),
            vec![LayerContentKind::IntGrid, LayerContentKind::AutoTiles]
        );
        assert_eq!(layer.int_grid_value(1, 0), Some(1));
        assert_eq!(layer.int_grid_value(2, 0), None);
        assert_eq!(layer.opacity, 1.0);
    }

    #[test]
    fn test_all_zero_int_grid_is_not_content() {
        let layer = LayerInstance {
            c_wid: 2,
            c_hei: 2,
            int_grid_csv: vec![0; 4],
            ..Default::default()
        };
        assert!(layer.content_kinds().is_empty());
    }

    #[test]
    fn test_tile_instance_flip_bits_and_alpha() {
        let tile: TileInstance =
            serde_json::from_value(serde_json::json!({ "px": [32, 48], "f": 3, "t": 9 })).unwrap();
        assert!(tile.flip_x());
        assert!(tile.flip_y());
        assert_eq!(tile.a, 1.0);
        assert_eq!(tile.cell(16), (2, 3));
    }

    #[test]
    fn test_external_level_has_no_layers() {
        let level: Level = serde_json::from_value(serde_json::json!({
            "identifier": "Far",
            "layerInstances": null,
            "externalRelPath": "project/Far.ldtkl"
        }))
        .unwrap();
        assert!(level.is_external());
        assert!(level.layers().is_empty());
    }

    #[test]
    fn test_background_colour_override() {
        let level = Level {
            resolved_bg_color: "#40465B".into(),
            bg_color: Some("#FF0000".into()),
            ..Default::default()
        };
        assert_eq!(level.background_color(), "#FF0000");
    }
}
