//! UID registry: the index half of the document arena.
//!
//! LDtk cross-references everything by integer UID (and instances by IID string). The
//! registry maps those ids to borrowed references into the parsed [`LdtkProject`], so every
//! referrer shares the one definition stored in the document.
//!
//! A registry is built at the start of one build and consumed by [`UidRegistry::release`] at
//! its end. It borrows the document, so it cannot outlive it.

use std::collections::HashMap;

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::*;

use crate::error::{ImportError, ImportErrors, UidKind};

/// Borrowed handle to an object of the document.
#[derive(Debug, Clone, Copy)]
pub enum UidRef<'a> {
    Tileset(&'a TilesetDefinition),
    LayerDef(&'a LayerDefinition),
    EntityDef(&'a EntityDefinition),
    EnumDef(&'a EnumDefinition),
    FieldDef(&'a FieldDefinition),
    AutoRule(&'a AutoLayerRuleDefinition),
    Level(&'a Level),
    LayerInstance(&'a LayerInstance),
    EntityInstance(&'a EntityInstance),
}

impl UidRef<'_> {
    pub fn kind(&self) -> UidKind {
        match self {
            UidRef::Tileset(_) => UidKind::Tileset,
            UidRef::LayerDef(_) => UidKind::LayerDef,
            UidRef::EntityDef(_) => UidKind::EntityDef,
            UidRef::EnumDef(_) => UidKind::EnumDef,
            UidRef::FieldDef(_) => UidKind::FieldDef,
            UidRef::AutoRule(_) => UidKind::AutoRule,
            UidRef::Level(_) => UidKind::Level,
            UidRef::LayerInstance(_) => UidKind::LayerInstance,
            UidRef::EntityInstance(_) => UidKind::EntityInstance,
        }
    }
}

/// Index from `(kind, uid)` and from IID to objects of one project document.
#[derive(Debug, Default)]
pub struct UidRegistry<'a> {
    by_uid: HashMap<(UidKind, i32), UidRef<'a>>,
    by_iid: HashMap<&'a str, UidRef<'a>>,
}

/// Typed resolve helper: `resolve(kind, uid)` then unwrap the expected variant.
macro_rules! typed_resolve {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self, uid: i32, context: &str) -> Result<&'a $ty, ImportError> {
            match self.resolve(UidKind::$variant, uid, context)? {
                UidRef::$variant(object) => Ok(object),
                _ => Err(ImportError::unresolved(UidKind::$variant, uid, context)),
            }
        }
    };
}

impl<'a> UidRegistry<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for a whole document in one pass.
    ///
    /// Definitions are registered before instances. Duplicates are reported and the first
    /// registration is kept.
    pub fn populate(project: &'a LdtkProject, errors: &mut ImportErrors) -> Self {
        let mut registry = Self::new();
        let defs = &project.defs;

        for tileset in &defs.tilesets {
            errors.ok(registry.register(tileset.uid, UidRef::Tileset(tileset)));
        }
        for layer in &defs.layers {
            errors.ok(registry.register(layer.uid, UidRef::LayerDef(layer)));
            for group in &layer.auto_rule_groups {
                for rule in &group.rules {
                    errors.ok(registry.register(rule.uid, UidRef::AutoRule(rule)));
                }
            }
        }
        for entity in &defs.entities {
            errors.ok(registry.register(entity.uid, UidRef::EntityDef(entity)));
            for field in &entity.field_defs {
                errors.ok(registry.register(field.uid, UidRef::FieldDef(field)));
            }
        }
        for field in &defs.level_fields {
            errors.ok(registry.register(field.uid, UidRef::FieldDef(field)));
        }
        for enum_def in defs.enums.iter().chain(&defs.external_enums) {
            errors.ok(registry.register(enum_def.uid, UidRef::EnumDef(enum_def)));
        }

        for level in project.all_levels() {
            errors.ok(registry.register(level.uid, UidRef::Level(level)));
            errors.ok(registry.register_iid(&level.iid, UidRef::Level(level)));

            for layer in level.layers() {
                errors.ok(registry.register_iid(&layer.iid, UidRef::LayerInstance(layer)));
                for entity in &layer.entity_instances {
                    errors.ok(registry.register_iid(&entity.iid, UidRef::EntityInstance(entity)));
                }
            }
        }

        debug!(
            "UID registry populated with {} uids and {} iids",
            registry.by_uid.len(),
            registry.by_iid.len()
        );

        registry
    }

    /// Register an object under its integer UID.
    ///
    /// Returns [`ImportError::DuplicateUid`] if the `(kind, uid)` pair is already taken.
    pub fn register(&mut self, uid: i32, object: UidRef<'a>) -> Result<(), ImportError> {
        let key = (object.kind(), uid);
        if self.by_uid.contains_key(&key) {
            return Err(ImportError::DuplicateUid {
                kind: key.0,
                uid: uid.to_string(),
            });
        }
        self.by_uid.insert(key, object);
        Ok(())
    }

    /// Register an instance under its IID. Empty IIDs are ignored.
    pub fn register_iid(&mut self, iid: &'a str, object: UidRef<'a>) -> Result<(), ImportError> {
        if iid.is_empty() {
            return Ok(());
        }
        if self.by_iid.contains_key(iid) {
            return Err(ImportError::DuplicateUid {
                kind: object.kind(),
                uid: iid.to_string(),
            });
        }
        self.by_iid.insert(iid, object);
        Ok(())
    }

    /// Resolve `(kind, uid)`, failing with [`ImportError::UnresolvedReference`].
    ///
    /// `context` names the referrer and ends up in the error message.
    pub fn resolve(&self, kind: UidKind, uid: i32, context: &str) -> Result<UidRef<'a>, ImportError> {
        self.by_uid
            .get(&(kind, uid))
            .copied()
            .ok_or_else(|| ImportError::unresolved(kind, uid, context))
    }

    /// Resolve an instance of `kind` by IID.
    ///
    /// An IID registered for another kind of instance is unresolved as well.
    pub fn resolve_iid(&self, kind: UidKind, iid: &str, context: &str) -> Result<UidRef<'a>, ImportError> {
        self.by_iid
            .get(iid)
            .copied()
            .filter(|object| object.kind() == kind)
            .ok_or_else(|| ImportError::unresolved(kind, iid, context))
    }

    typed_resolve!(tileset, Tileset, TilesetDefinition);
    typed_resolve!(layer_def, LayerDef, LayerDefinition);
    typed_resolve!(entity_def, EntityDef, EntityDefinition);
    typed_resolve!(enum_def, EnumDef, EnumDefinition);
    typed_resolve!(field_def, FieldDef, FieldDefinition);
    typed_resolve!(auto_rule, AutoRule, AutoLayerRuleDefinition);
    typed_resolve!(
        /// Resolve a level by UID, for example the owner of a layer instance.
        level, Level, Level
    );

    pub fn len(&self) -> usize {
        self.by_uid.len() + self.by_iid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uid.is_empty() && self.by_iid.is_empty()
    }

    /// End the registry's lifetime. Consumes it, so no reference survives the build.
    pub fn release(self) {
        debug!("UID registry released ({} entries)", self.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> LdtkProject {
        serde_json::from_value(serde_json::json!({
            "defs": {
                "tilesets": [{ "uid": 1, "identifier": "Tiles" }],
                "layers": [{ "uid": 2, "identifier": "Walls", "__type": "IntGrid" }],
                "entities": [{
                    "uid": 3,
                    "identifier": "Mob",
                    "fieldDefs": [{ "uid": 4, "identifier": "hp", "__type": "Int" }]
                }]
            },
            "levels": [{
                "uid": 0,
                "iid": "level-0",
                "identifier": "Level_0",
                "layerInstances": [{
                    "iid": "layer-0",
                    "layerDefUid": 2,
                    "levelId": 0,
                    "entityInstances": [{ "iid": "mob-0", "defUid": 3 }]
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_round_trip_every_kind() {
        let project = project();
        let mut errors = ImportErrors::new();
        let registry = UidRegistry::populate(&project, &mut errors);

        assert!(errors.is_empty());
        assert!(std::ptr::eq(
            registry.tileset(1, "test").unwrap(),
            &project.defs.tilesets[0]
        ));
        assert!(std::ptr::eq(
            registry.layer_def(2, "test").unwrap(),
            &project.defs.layers[0]
        ));
        assert_eq!(registry.entity_def(3, "test").unwrap().identifier, "Mob");
        assert_eq!(registry.field_def(4, "test").unwrap().identifier, "hp");
        assert_eq!(registry.level(0, "test").unwrap().identifier, "Level_0");

        let Ok(UidRef::EntityInstance(mob)) =
            registry.resolve_iid(UidKind::EntityInstance, "mob-0", "test")
        else {
            panic!("entity instance not registered");
        };
        assert_eq!(mob.def_uid, 3);
    }

    #[test]
    fn test_unresolved_reference_is_an_error() {
        let project = project();
        let mut errors = ImportErrors::new();
        let registry = UidRegistry::populate(&project, &mut errors);

        let error = registry.entity_def(99, "entity 'Ghost'").unwrap_err();
        assert_eq!(
            error,
            ImportError::unresolved(UidKind::EntityDef, 99, "entity 'Ghost'")
        );

        // Same uid, different kind
        assert!(registry.tileset(2, "test").is_err());
    }

    #[test]
    fn test_unresolved_iid_names_the_requested_kind() {
        let project = project();
        let mut errors = ImportErrors::new();
        let registry = UidRegistry::populate(&project, &mut errors);

        assert!(matches!(
            registry.resolve_iid(UidKind::Level, "level-0", "test"),
            Ok(UidRef::Level(_))
        ));
        assert_eq!(
            registry
                .resolve_iid(UidKind::Level, "level-9", "neighbour of 'Level_0'")
                .unwrap_err(),
            ImportError::unresolved(UidKind::Level, "level-9", "neighbour of 'Level_0'")
        );
        // Registered, but as a layer instance
        assert_eq!(
            registry
                .resolve_iid(UidKind::EntityInstance, "layer-0", "test")
                .unwrap_err(),
            ImportError::unresolved(UidKind::EntityInstance, "layer-0", "test")
        );
    }

    #[test]
    fn test_duplicate_uid_keeps_first() {
        let first = TilesetDefinition {
            uid: 5,
            identifier: "First".into(),
            ..Default::default()
        };
        let second = TilesetDefinition {
            uid: 5,
            identifier: "Second".into(),
            ..Default::default()
        };

        let mut registry = UidRegistry::new();
        assert!(registry.register(5, UidRef::Tileset(&first)).is_ok());
        assert!(matches!(
            registry.register(5, UidRef::Tileset(&second)),
            Err(ImportError::DuplicateUid { kind: UidKind::Tileset, .. })
        ));
        assert_eq!(registry.tileset(5, "test").unwrap().identifier, "First");
    }

    #[test]
    fn test_release_consumes_registry() {
        let project = project();
        let mut errors = ImportErrors::new();
        let registry = UidRegistry::populate(&project, &mut errors);
        assert!(!registry.is_empty());
        registry.release();
    }
}
