//! Definitions: the static schema shared by every instance in the project.

use serde::Deserialize;

/// Pattern value meaning "any non-empty int-grid value" (negated: "empty cell").
pub const PATTERN_ANYTHING: i32 = 1_000_001;

/// Container of every definition in the project.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Definitions {
    pub layers: Vec<LayerDefinition>,
    pub entities: Vec<EntityDefinition>,
    pub tilesets: Vec<TilesetDefinition>,
    pub enums: Vec<EnumDefinition>,
    pub external_enums: Vec<EnumDefinition>,
    pub level_fields: Vec<FieldDefinition>,
}

/// Kind of a layer, as declared by its definition.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayerType {
    #[default]
    IntGrid,
    Entities,
    Tiles,
    AutoLayer,
}

/// Static schema of a layer, shared by all its instances.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerDefinition {
    #[serde(rename = "__type")]
    pub layer_type: LayerType,
    pub identifier: String,
    pub uid: i32,
    /// Cell size in pixels.
    pub grid_size: i32,
    pub display_opacity: f32,
    pub px_offset_x: i32,
    pub px_offset_y: i32,
    /// Value → identifier/colour table of int-grid layers.
    pub int_grid_values: Vec<IntGridValueDefinition>,
    /// Auto-layer rule groups, evaluated in order.
    pub auto_rule_groups: Vec<AutoRuleGroup>,
    /// Int-grid layer the rules of an `AutoLayer` read from.
    pub auto_source_layer_def_uid: Option<i32>,
    pub tileset_def_uid: Option<i32>,
    /// Tileset of auto-layers written by LDtk versions before 1.0.
    pub auto_tileset_def_uid: Option<i32>,
}

impl Default for LayerDefinition {
    fn default() -> Self {
        Self {
            layer_type: LayerType::default(),
            identifier: String::new(),
            uid: 0,
            grid_size: 16,
            display_opacity: 1.0,
            px_offset_x: 0,
            px_offset_y: 0,
            int_grid_values: Vec::new(),
            auto_rule_groups: Vec::new(),
            auto_source_layer_def_uid: None,
            tileset_def_uid: None,
            auto_tileset_def_uid: None,
        }
    }
}

impl LayerDefinition {
    /// Look up the int-grid value definition for `value`.
    pub fn int_grid_value(&self, value: i32) -> Option<&IntGridValueDefinition> {
        self.int_grid_values.iter().find(|v| v.value == value)
    }

    /// Tileset used for tiles of this layer, including the legacy auto-layer field.
    pub fn tileset_uid(&self) -> Option<i32> {
        self.tileset_def_uid.or(self.auto_tileset_def_uid)
    }

    /// Whether any rule group holds at least one rule.
    pub fn has_auto_rules(&self) -> bool {
        self.auto_rule_groups.iter().any(|g| !g.rules.is_empty())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct IntGridValueDefinition {
    pub value: i32,
    pub identifier: Option<String>,
    /// Display colour (`#rrggbb`).
    pub color: String,
}

/// An ordered group of auto-layer rules.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoRuleGroup {
    pub uid: i32,
    pub name: String,
    pub active: bool,
    /// Optional groups only run when enabled per layer instance.
    pub is_optional: bool,
    pub rules: Vec<AutoLayerRuleDefinition>,
}

impl Default for AutoRuleGroup {
    fn default() -> Self {
        Self {
            uid: 0,
            name: String::new(),
            active: true,
            is_optional: false,
            rules: Vec::new(),
        }
    }
}

/// Checker offset mode of an auto-layer rule.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckerMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// How an auto-layer rule paints the tiles of a matched rectangle.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileMode {
    /// One tile per matched cell.
    #[default]
    Single,
    /// Every tile of the rectangle, laid out around the rule pivot.
    Stamp,
}

/// A single auto-layer rule.
///
/// `pattern` is a row-major `size × size` matrix centred on the evaluated cell. A value of `0`
/// ignores the neighbour, a positive value requires it, a negative value forbids it, and
/// `±PATTERN_ANYTHING` matches any non-empty (or empty) neighbour.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoLayerRuleDefinition {
    pub uid: i32,
    pub active: bool,
    pub break_on_match: bool,
    /// Probability in `[0, 1]` that a matching cell is painted.
    pub chance: f32,
    pub checker: CheckerMode,
    pub flip_x: bool,
    pub flip_y: bool,
    /// Value used for neighbours outside the level. `None` makes them mismatch.
    pub out_of_bounds_value: Option<i32>,
    pub pattern: Vec<i32>,
    pub perlin_active: bool,
    pub perlin_octaves: f32,
    pub perlin_scale: f32,
    pub perlin_seed: f32,
    pub pivot_x: f32,
    pub pivot_y: f32,
    pub size: i32,
    pub tile_mode: TileMode,
    pub tile_random_x_min: i32,
    pub tile_random_x_max: i32,
    pub tile_random_y_min: i32,
    pub tile_random_y_max: i32,
    /// Candidate tile rectangles, each a list of tile ids.
    pub tile_rects_ids: Vec<Vec<i32>>,
    /// Flat candidate list written by LDtk versions before 1.5.
    pub tile_ids: Vec<i32>,
    pub tile_x_offset: i32,
    pub tile_y_offset: i32,
    pub x_modulo: i32,
    pub y_modulo: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub alpha: f32,
    pub invalidated: bool,
}

impl Default for AutoLayerRuleDefinition {
    fn default() -> Self {
        Self {
            uid: 0,
            active: true,
            break_on_match: true,
            chance: 1.0,
            checker: CheckerMode::None,
            flip_x: false,
            flip_y: false,
            out_of_bounds_value: None,
            pattern: Vec::new(),
            perlin_active: false,
            perlin_octaves: 2.0,
            perlin_scale: 0.2,
            perlin_seed: 0.0,
            pivot_x: 0.0,
            pivot_y: 0.0,
            size: 3,
            tile_mode: TileMode::Single,
            tile_random_x_min: 0,
            tile_random_x_max: 0,
            tile_random_y_min: 0,
            tile_random_y_max: 0,
            tile_rects_ids: Vec::new(),
            tile_ids: Vec::new(),
            tile_x_offset: 0,
            tile_y_offset: 0,
            x_modulo: 1,
            y_modulo: 1,
            x_offset: 0,
            y_offset: 0,
            alpha: 1.0,
            invalidated: false,
        }
    }
}

impl AutoLayerRuleDefinition {
    /// Candidate tile rectangles, falling back to the legacy flat id list.
    ///
    /// In `Single` mode every legacy id is its own candidate; in `Stamp` mode the legacy list
    /// forms one rectangle.
    pub fn tile_rects(&self) -> Vec<Vec<i32>> {
        if !self.tile_rects_ids.is_empty() {
            return self.tile_rects_ids.clone();
        }
        if self.tile_ids.is_empty() {
            return Vec::new();
        }
        match self.tile_mode {
            TileMode::Single => self.tile_ids.iter().map(|id| vec![*id]).collect(),
            TileMode::Stamp => vec![self.tile_ids.clone()],
        }
    }
}

/// Static schema of a tileset image.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TilesetDefinition {
    pub uid: i32,
    pub identifier: String,
    /// Image path relative to the project file. `None` for embedded atlases.
    pub rel_path: Option<String>,
    pub px_wid: i32,
    pub px_hei: i32,
    pub tile_grid_size: i32,
    pub spacing: i32,
    pub padding: i32,
    #[serde(rename = "__cWid")]
    pub c_wid: i32,
    #[serde(rename = "__cHei")]
    pub c_hei: i32,
    pub tags: Vec<String>,
    pub embed_atlas: Option<String>,
}

impl TilesetDefinition {
    /// Number of tile columns, computed from the image when `__cWid` is missing.
    pub fn columns(&self) -> i32 {
        if self.c_wid > 0 {
            return self.c_wid;
        }
        let step = self.tile_grid_size + self.spacing;
        if step <= 0 {
            return 0;
        }
        (self.px_wid - 2 * self.padding + self.spacing) / step
    }

    /// Linear tile id of the tile whose top-left pixel is `(px_x, px_y)` in the image.
    pub fn tile_id_at(&self, px_x: i32, px_y: i32) -> Option<i32> {
        let step = self.tile_grid_size + self.spacing;
        if step <= 0 {
            return None;
        }
        let cx = (px_x - self.padding) / step;
        let cy = (px_y - self.padding) / step;
        (cx >= 0 && cy >= 0).then(|| cx + cy * self.columns())
    }

    /// Column/row of a linear tile id inside the image.
    pub fn tile_coords(&self, tile_id: i32) -> Option<(i32, i32)> {
        let columns = self.columns();
        (columns > 0 && tile_id >= 0).then(|| (tile_id % columns, tile_id / columns))
    }

    /// Total number of tiles in the image.
    pub fn tile_count(&self) -> i32 {
        let rows = if self.c_hei > 0 {
            self.c_hei
        } else {
            let step = self.tile_grid_size + self.spacing;
            if step <= 0 {
                return 0;
            }
            (self.px_hei - 2 * self.padding + self.spacing) / step
        };
        self.columns() * rows
    }
}

/// A rectangle of pixels inside a tileset image.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TilesetRect {
    pub tileset_uid: i32,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Static schema of an entity.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityDefinition {
    pub uid: i32,
    pub identifier: String,
    pub width: i32,
    pub height: i32,
    pub pivot_x: f32,
    pub pivot_y: f32,
    /// Editor display colour (`#rrggbb`).
    pub color: String,
    pub render_mode: String,
    pub tileset_id: Option<i32>,
    pub tile_rect: Option<TilesetRect>,
    pub tags: Vec<String>,
    /// Field definitions, in editor order.
    pub field_defs: Vec<FieldDefinition>,
}

/// Static schema of a field of an entity or a level.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldDefinition {
    pub uid: i32,
    pub identifier: String,
    /// Human-readable type, for example `Int`, `Array<LocalEnum.Item>`.
    #[serde(rename = "__type")]
    pub type_name: String,
    pub is_array: bool,
    pub can_be_null: bool,
}

/// Static schema of an enum.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EnumDefinition {
    pub uid: i32,
    pub identifier: String,
    pub values: Vec<EnumValueDefinition>,
    pub icon_tileset_uid: Option<i32>,
    pub external_rel_path: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EnumValueDefinition {
    pub id: String,
    pub tile_rect: Option<TilesetRect>,
    pub color: i32,
}
