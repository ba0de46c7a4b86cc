//! State shared by the builders of one build pass.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use bevy::ecs::world::CommandQueue;
use bevy::prelude::*;
use bevy_ldtkmap_schema::LdtkProject;
use bevy_ldtkmap_schema::path::resolve_relative_path;

use crate::error::{FatalInput, ImportError, ImportErrors};
use crate::fields::{FieldInjector, LdtkTargetRegistry};
use crate::plugin::LdtkBuildConfig;
use crate::registry::UidRegistry;

/// Phase of a [`ProjectBuilder`](super::ProjectBuilder).
///
/// `NotStarted → ValidatingInput → BuildingHierarchy → PostProcessing → Done`, or
/// `ValidatingInput → Failed` when required input is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum BuildState {
    #[default]
    NotStarted,
    ValidatingInput,
    BuildingHierarchy,
    PostProcessing,
    Done,
    Failed,
}

/// Actions deferred until the whole hierarchy exists.
///
/// Each action runs exactly once, in the order it was pushed.
#[derive(Default)]
pub struct PostBuildQueue {
    queue: CommandQueue,
    len: usize,
}

impl PostBuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: impl FnOnce(&mut World) + Send + 'static) {
        self.queue.push(action);
        self.len += 1;
    }

    /// Append every action of `other` after the ones already queued.
    pub fn append(&mut self, other: &mut PostBuildQueue) {
        self.queue.append(&mut other.queue);
        self.len += std::mem::take(&mut other.len);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run and drain every queued action.
    pub fn apply(&mut self, world: &mut World) {
        self.queue.apply(world);
        self.len = 0;
    }
}

impl fmt::Debug for PostBuildQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostBuildQueue").field("len", &self.len).finish()
    }
}

/// Source files a build read, as asset paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDependencies {
    paths: HashSet<String>,
}

impl BuildDependencies {
    /// Record a dependency. Returns `false` if it was already recorded.
    pub fn add(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub root: Entity,
    /// World nodes, in document order.
    pub worlds: Vec<Entity>,
    /// Every non-fatal error, in the order it was reported.
    pub errors: Vec<ImportError>,
    pub dependencies: BuildDependencies,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of the last build of a project root, inserted by the plugin.
#[derive(Component, Debug, Clone)]
pub enum LdtkBuildReport {
    Built(BuildReport),
    Failed(FatalInput),
}

impl LdtkBuildReport {
    pub fn report(&self) -> Option<&BuildReport> {
        match self {
            LdtkBuildReport::Built(report) => Some(report),
            LdtkBuildReport::Failed(_) => None,
        }
    }

    pub fn errors(&self) -> &[ImportError] {
        self.report().map_or(&[], |report| &report.errors)
    }
}

/// Everything the world, level and layer builders read or write during one pass.
pub(crate) struct BuildContext<'a> {
    pub project: &'a LdtkProject,
    pub registry: UidRegistry<'a>,
    pub config: &'a LdtkBuildConfig,
    pub injector: &'a FieldInjector,
    pub targets: &'a LdtkTargetRegistry,
    pub tileset_images: &'a HashMap<i32, Handle<Image>>,
    /// Asset path of the project file.
    pub source: &'a str,
    pub errors: ImportErrors,
    pub dependencies: BuildDependencies,
    pub post_build: PostBuildQueue,
}

impl BuildContext<'_> {
    /// Image of a tileset, or the default handle when none was provided.
    pub fn tileset_image(&self, uid: i32) -> Handle<Image> {
        self.tileset_images.get(&uid).cloned().unwrap_or_default()
    }

    /// Resolve a project-relative path and record it as a dependency.
    pub fn depend_on(&mut self, relative: &str, context: &str) -> Option<String> {
        match resolve_relative_path(Path::new(self.source), relative) {
            Ok(path) => {
                self.dependencies.add(path.clone());
                Some(path)
            }
            Err(error) => {
                warn!("LDtk: cannot resolve '{relative}' for {context}: {error}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Resource, Default)]
    struct Trace(Vec<u32>);

    #[test]
    fn test_post_build_queue_runs_in_order_once() {
        let mut world = World::new();
        world.init_resource::<Trace>();

        let mut queue = PostBuildQueue::new();
        for i in 0..3 {
            queue.push(move |world: &mut World| world.resource_mut::<Trace>().0.push(i));
        }
        let mut later = PostBuildQueue::new();
        later.push(|world: &mut World| world.resource_mut::<Trace>().0.push(9));
        queue.append(&mut later);
        assert_eq!(queue.len(), 4);
        assert!(later.is_empty());

        queue.apply(&mut world);
        queue.apply(&mut world);

        assert!(queue.is_empty());
        assert_eq!(world.resource::<Trace>().0, vec![0, 1, 2, 9]);
    }

    #[test]
    fn test_dependencies_are_idempotent() {
        let mut dependencies = BuildDependencies::default();

        assert!(dependencies.add("tiles/cavern.png"));
        assert!(!dependencies.add("tiles/cavern.png"));
        assert!(dependencies.add("levels/boss.ldtkl"));

        assert_eq!(dependencies.len(), 2);
        assert!(dependencies.contains("tiles/cavern.png"));
    }
}
