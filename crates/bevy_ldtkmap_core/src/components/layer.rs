//! Layer components.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::{LayerInstance, LayerType};

/// A layer node. Layers are ordered front-most first in the document and built back to
/// front, with z increasing toward the viewer.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform, Visibility)]
pub struct LdtkLayer {
    pub identifier: String,
    pub iid: String,
    pub def_uid: i32,
    #[reflect(ignore)]
    pub layer_type: LayerType,
    pub grid_size: i32,
    /// Size in cells.
    pub size: IVec2,
    pub opacity: f32,
}

impl From<&LayerInstance> for LdtkLayer {
    fn from(layer: &LayerInstance) -> Self {
        Self {
            identifier: layer.identifier.clone(),
            iid: layer.iid.clone(),
            def_uid: layer.layer_def_uid,
            layer_type: layer.layer_type,
            grid_size: layer.grid_size,
            size: IVec2::new(layer.c_wid, layer.c_hei),
            opacity: layer.opacity,
        }
    }
}

/// Int-grid values of a layer, for collision and gameplay queries.
///
/// Cells are row-major with Y down, as in LDtk; `0` means empty.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct IntGridLayerData {
    pub width: i32,
    pub height: i32,
    pub grid_size: i32,
    pub values: Vec<i32>,
}

impl IntGridLayerData {
    pub fn from_layer(layer: &LayerInstance) -> Self {
        Self {
            width: layer.c_wid,
            height: layer.c_hei,
            grid_size: layer.grid_size,
            values: layer.int_grid_csv.clone(),
        }
    }

    /// Value at a cell, `None` outside the grid.
    pub fn get(&self, cell: IVec2) -> Option<i32> {
        if cell.x < 0 || cell.y < 0 || cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        self.values.get((cell.y * self.width + cell.x) as usize).copied()
    }

    /// Non-empty cells with their values.
    pub fn iter_filled(&self) -> impl Iterator<Item = (IVec2, i32)> + '_ {
        let width = self.width.max(1);
        self.values
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0)
            .map(move |(index, value)| {
                let index = index as i32;
                (IVec2::new(index % width, index / width), *value)
            })
    }
}
