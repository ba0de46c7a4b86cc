//! The project-to-hierarchy build pipeline.
//!
//! [`ProjectBuilder`] validates its input, populates the UID registry, then walks worlds,
//! levels and layers, dispatching each layer's content to the int-grid painter, the
//! auto-tile evaluator, the tile placer and the entity instantiator. Lifecycle events and
//! registered hooks run once the hierarchy is complete.

mod context;
mod entities;
mod layers;
mod level;
mod project;
mod world;

pub use context::{BuildDependencies, BuildReport, BuildState, LdtkBuildReport, PostBuildQueue};
pub use project::ProjectBuilder;
