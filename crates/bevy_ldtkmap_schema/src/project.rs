//! Root project document and worlds.

use bevy::prelude::*;
use serde::Deserialize;

use crate::defs::Definitions;
use crate::level::Level;

/// Identifier given to the implicit world of single-world projects.
pub const IMPLICIT_WORLD_IDENTIFIER: &str = "World";

/// Root of an LDtk project file.
///
/// Loaded from `.ldtk` files by `bevy_common_assets`' JSON loader, or constructed directly
/// with `serde_json`. Multi-world projects list their worlds in [`worlds`](Self::worlds);
/// older single-world projects keep every level at the top level in
/// [`levels`](Self::levels) instead.
///
/// # Example
///
/// ```rust
/// use bevy_ldtkmap_schema::LdtkProject;
///
/// let project: LdtkProject = serde_json::from_str(r#"{ "jsonVersion": "1.5.3" }"#).unwrap();
/// assert_eq!(project.worlds().count(), 1);
/// ```
#[derive(Asset, TypePath, Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LdtkProject {
    /// Unique instance identifier of the project.
    pub iid: String,
    /// Version of the LDtk file format that wrote this document.
    pub json_version: String,
    /// Project background colour (`#rrggbb`).
    pub bg_color: String,
    /// All definitions shared by worlds and levels.
    pub defs: Definitions,
    /// Levels of a single-world project. Empty when [`worlds`](Self::worlds) is used.
    pub levels: Vec<Level>,
    /// Worlds of a multi-world project.
    pub worlds: Vec<World>,
    /// Layout of the implicit world. `null` in multi-world projects.
    pub world_layout: Option<WorldLayout>,
    /// Grid width of the implicit world (GridVania layout only). `null` in multi-world projects.
    pub world_grid_width: Option<i32>,
    /// Grid height of the implicit world (GridVania layout only). `null` in multi-world projects.
    pub world_grid_height: Option<i32>,
    /// Whether levels are stored in separate `.ldtkl` files.
    pub external_levels: bool,
}

/// A world: an ordered collection of levels.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct World {
    /// User-defined unique identifier.
    pub identifier: String,
    /// Unique instance identifier.
    pub iid: String,
    /// Levels of this world, in document order.
    pub levels: Vec<Level>,
    /// How levels are laid out in world space.
    pub world_layout: Option<WorldLayout>,
    /// Width of a world grid cell in pixels (GridVania layout only).
    pub world_grid_width: i32,
    /// Height of a world grid cell in pixels (GridVania layout only).
    pub world_grid_height: i32,
}

/// Level arrangement inside a world.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorldLayout {
    #[default]
    Free,
    GridVania,
    LinearHorizontal,
    LinearVertical,
}

/// Borrowed view over one world, real or implicit.
///
/// Builders iterate worlds through this view so the legacy single-world layout and the
/// multi-world layout are handled by the same code path.
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    pub identifier: &'a str,
    pub iid: &'a str,
    pub levels: &'a [Level],
    pub layout: Option<WorldLayout>,
}

impl LdtkProject {
    /// Whether the project stores its levels in [`worlds`](Self::worlds).
    #[inline]
    pub fn is_multi_world(&self) -> bool {
        !self.worlds.is_empty()
    }

    /// Iterate every world of the project.
    ///
    /// When the project has no explicit worlds, yields exactly one implicit world wrapping the
    /// top-level levels, named [`IMPLICIT_WORLD_IDENTIFIER`].
    pub fn worlds(&self) -> impl Iterator<Item = WorldView<'_>> {
        let implicit = (!self.is_multi_world()).then(|| WorldView {
            identifier: IMPLICIT_WORLD_IDENTIFIER,
            iid: &self.iid,
            levels: &self.levels,
            layout: self.world_layout,
        });

        self.worlds
            .iter()
            .map(|world| WorldView {
                identifier: &world.identifier,
                iid: &world.iid,
                levels: &world.levels,
                layout: world.world_layout,
            })
            .chain(implicit)
    }

    /// Iterate every level of every world.
    pub fn all_levels(&self) -> impl Iterator<Item = &Level> {
        self.levels
            .iter()
            .chain(self.worlds.iter().flat_map(|world| world.levels.iter()))
    }

    /// Total number of levels across all worlds.
    pub fn level_count(&self) -> usize {
        self.all_levels().count()
    }
}
