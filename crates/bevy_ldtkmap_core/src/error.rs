//! Error taxonomy of a build and the side-channel collector that carries it.
//!
//! Only [`FatalInput`] stops a build, and it does so before any entity is spawned. Every
//! other problem is an [`ImportError`]: it is logged, recorded in [`ImportErrors`], and the
//! builder carries on with whatever is still buildable.

use std::fmt;

use bevy::prelude::*;
use thiserror::Error;

/// Kind of object a UID (or IID) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UidKind {
    Tileset,
    LayerDef,
    EntityDef,
    EnumDef,
    FieldDef,
    AutoRule,
    Level,
    LayerInstance,
    EntityInstance,
    /// Value of an int-grid cell, resolved against its layer definition.
    IntGridValue,
}

impl fmt::Display for UidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UidKind::Tileset => "tileset",
            UidKind::LayerDef => "layer definition",
            UidKind::EntityDef => "entity definition",
            UidKind::EnumDef => "enum definition",
            UidKind::FieldDef => "field definition",
            UidKind::AutoRule => "auto-layer rule",
            UidKind::Level => "level",
            UidKind::LayerInstance => "layer instance",
            UidKind::EntityInstance => "entity instance",
            UidKind::IntGridValue => "int-grid value",
        };
        f.write_str(name)
    }
}

/// Required top-level input is missing. The build stops before creating anything.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalInput {
    #[error("no project document to build")]
    MissingDocument,
    #[error("project '{0}' has no levels")]
    NoLevels(String),
    #[error("no project file reference")]
    MissingSource,
}

/// A non-fatal problem met while building. The dependent object is skipped or defaulted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImportError {
    #[error("unresolved {kind} reference '{uid}' ({context})")]
    UnresolvedReference {
        kind: UidKind,
        uid: String,
        context: String,
    },

    #[error("duplicate {kind} uid '{uid}', keeping the first registration")]
    DuplicateUid { kind: UidKind, uid: String },

    #[error("field '{field}': {message} ({context})")]
    FieldMismatch {
        field: String,
        message: String,
        context: String,
    },

    #[error("tile already staged at cell {cell} in {context}")]
    DuplicateStage { cell: IVec2, context: String },

    #[error("auto-layer rule {rule_uid} skipped: {message}")]
    InvalidRule { rule_uid: i32, message: String },
}

impl ImportError {
    pub fn unresolved(kind: UidKind, uid: impl ToString, context: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            uid: uid.to_string(),
            context: context.into(),
        }
    }

    pub fn field_mismatch(
        field: impl Into<String>,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::FieldMismatch {
            field: field.into(),
            message: message.into(),
            context: context.into(),
        }
    }
}

/// Collector of every non-fatal error of one build.
///
/// Passed by `&mut` through the builder call chain so a failing subtree never unwinds its
/// siblings. Each error is logged as it is reported.
#[derive(Debug, Default, Clone)]
pub struct ImportErrors {
    errors: Vec<ImportError>,
}

impl ImportErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record an error.
    pub fn report(&mut self, error: ImportError) {
        match &error {
            ImportError::DuplicateStage { .. } => warn!("LDtk: {error}"),
            _ => error!("LDtk: {error}"),
        }
        self.errors.push(error);
    }

    /// Report the error of a failed result, passing successful values through.
    pub fn ok<T>(&mut self, result: Result<T, ImportError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(error);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportError> {
        self.errors.iter()
    }

    /// Number of unresolved references of the given kind.
    pub fn unresolved_count(&self, kind: UidKind) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, ImportError::UnresolvedReference { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn into_vec(self) -> Vec<ImportError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_reports_errors_and_passes_values() {
        let mut errors = ImportErrors::new();

        assert_eq!(errors.ok::<i32>(Ok(3)), Some(3));
        assert_eq!(
            errors.ok::<i32>(Err(ImportError::unresolved(UidKind::Tileset, 9, "layer 'Walls'"))),
            None
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.unresolved_count(UidKind::Tileset), 1);
        assert_eq!(errors.unresolved_count(UidKind::LayerDef), 0);
    }

    #[test]
    fn test_error_messages_carry_context() {
        let error = ImportError::DuplicateStage {
            cell: IVec2::new(2, 5),
            context: "layer 'Ground'".into(),
        };
        assert_eq!(
            error.to_string(),
            "tile already staged at cell [2, 5] in layer 'Ground'"
        );

        let error = ImportError::unresolved(UidKind::EntityDef, 42, "entity 'Mob'");
        assert_eq!(
            error.to_string(),
            "unresolved entity definition reference '42' (entity 'Mob')"
        );
    }
}
