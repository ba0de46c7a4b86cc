//! Resolution of paths stored relative to the project file.

use std::path::Path;

use normalize_path::NormalizePath;
use thiserror::Error;

/// Errors raised while interpreting schema values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Resolve a path stored in the project (tileset image, level background, external level)
/// against the project's own asset path.
///
/// LDtk writes every path relative to the `.ldtk` file. The result is an asset-root-relative
/// path with forward slashes, suitable for `AssetServer::load`.
///
/// # Arguments
///
/// * `project_path` - Asset path of the `.ldtk` file, for example `levels/world.ldtk`
/// * `relative_path` - Path as written in the document, for example `../atlas/tiles.png`
///
/// # Returns
///
/// The normalized asset path, or [`SchemaError::InvalidPath`] if it is not valid UTF-8.
pub fn resolve_relative_path(
    project_path: &Path,
    relative_path: &str,
) -> Result<String, SchemaError> {
    let parent = project_path.parent().unwrap_or(Path::new(""));

    // Path::join does not collapse `..` segments
    let normalized = parent.join(relative_path).normalize();

    let asset_path = normalized
        .to_str()
        .ok_or_else(|| SchemaError::InvalidPath(format!("Invalid UTF-8 in path: {normalized:?}")))?
        .replace('\\', "/");

    Ok(asset_path)
}
