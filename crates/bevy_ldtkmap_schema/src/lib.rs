//! # `bevy_ldtkmap_schema`
//!
//! Serde data model for LDtk project files (`.ldtk`).
//!
//! This is the **Layer 1** crate of `bevy_ldtkmap`: it describes the on-disk JSON document and
//! nothing else. Parsing raw text is delegated to `serde_json` (through
//! `bevy_common_assets` when used as an asset), and turning the document into entities is the
//! job of `bevy_ldtkmap_core`.
//!
//! The document is read-only input. Definitions reference each other through integer UIDs
//! and instances reference definitions the same way; nothing here resolves those references.
//!
//! ## Layout
//!
//! - [`project`]: the root [`LdtkProject`] asset, worlds and the legacy single-world fallback
//! - [`defs`]: layer, tileset, entity, enum and field definitions, auto-layer rules
//! - [`level`]: levels, layer instances, tiles, entity and field instances
//! - [`path`]: resolution of project-relative paths

pub mod defs;
pub mod level;
pub mod path;
pub mod project;

pub mod prelude {
    //! Common imports for `bevy_ldtkmap_schema` users.

    pub use crate::defs::{
        AutoLayerRuleDefinition, AutoRuleGroup, CheckerMode, Definitions, EntityDefinition,
        EnumDefinition, EnumValueDefinition, FieldDefinition, IntGridValueDefinition,
        LayerDefinition, LayerType, TileMode, TilesetDefinition, TilesetRect,
    };
    pub use crate::level::{
        EntityInstance, FieldInstance, LayerContentKind, LayerInstance, Level,
        LevelBackgroundPosition, TileInstance,
    };
    pub use crate::path::{SchemaError, resolve_relative_path};
    pub use crate::project::{LdtkProject, World, WorldLayout, WorldView};
}

pub use project::LdtkProject;
