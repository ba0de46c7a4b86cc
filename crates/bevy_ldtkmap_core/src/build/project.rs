//! Top-level build of a project document.

use std::collections::HashMap;
use std::path::Path;

use bevy::platform::time::Instant;
use bevy::prelude::*;
use bevy_ldtkmap_schema::LdtkProject;

use super::context::{BuildContext, BuildDependencies, BuildReport, BuildState, PostBuildQueue};
use super::world::WorldBuilder;
use crate::error::{FatalInput, ImportErrors};
use crate::events::ProjectBuilt;
use crate::fields::{FieldInjector, LdtkTargetRegistry};
use crate::plugin::LdtkBuildConfig;
use crate::registry::UidRegistry;

/// Builds a whole project into the world: one root, one node per world, level, layer and
/// entity.
///
/// Input is validated before anything is spawned, so a [`FatalInput`] leaves the world
/// untouched. Past validation every problem is collected into the [`BuildReport`] and the
/// rest of the project still builds.
///
/// # Example
///
/// ```rust,no_run
/// # use bevy::prelude::*;
/// # use bevy_ldtkmap_core::prelude::*;
/// # use bevy_ldtkmap_core::schema::LdtkProject;
/// fn build(world: &mut World, project: &LdtkProject) {
///     let config = LdtkBuildConfig::default();
///     let injector = FieldInjector::with_defaults();
///     let targets = LdtkTargetRegistry::from_inventory();
///
///     let report = ProjectBuilder::new(Some(project), Some("levels/world.ldtk"), &config, &injector, &targets)
///         .with_post_build(|world: &mut World| info!("{} entities", world.entities().len()))
///         .build(world);
/// }
/// ```
pub struct ProjectBuilder<'a> {
    document: Option<&'a LdtkProject>,
    source: Option<&'a str>,
    config: &'a LdtkBuildConfig,
    injector: &'a FieldInjector,
    targets: &'a LdtkTargetRegistry,
    tileset_images: HashMap<i32, Handle<Image>>,
    hooks: PostBuildQueue,
    state: BuildState,
}

impl<'a> ProjectBuilder<'a> {
    pub fn new(
        document: Option<&'a LdtkProject>,
        source: Option<&'a str>,
        config: &'a LdtkBuildConfig,
        injector: &'a FieldInjector,
        targets: &'a LdtkTargetRegistry,
    ) -> Self {
        Self {
            document,
            source,
            config,
            injector,
            targets,
            tileset_images: HashMap::new(),
            hooks: PostBuildQueue::new(),
            state: BuildState::NotStarted,
        }
    }

    /// Images to use for tilesets, by tileset UID. Tilesets without one get the default
    /// image handle.
    pub fn with_tileset_images(mut self, images: HashMap<i32, Handle<Image>>) -> Self {
        self.tileset_images = images;
        self
    }

    /// Register an action to run once after the whole hierarchy is built.
    pub fn with_post_build(mut self, hook: impl FnOnce(&mut World) + Send + 'static) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn add_post_build(&mut self, hook: impl FnOnce(&mut World) + Send + 'static) {
        self.hooks.push(hook);
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Validate the input and build it under a new root entity.
    pub fn build(&mut self, world: &mut World) -> Result<BuildReport, FatalInput> {
        let (project, source) = self.validate()?;

        let name = Path::new(source)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(source);
        let root = world
            .spawn((
                Name::new(format!("LDtk Project: {name}")),
                Transform::default(),
                Visibility::default(),
            ))
            .id();

        Ok(self.build_hierarchy(world, root, project, source))
    }

    /// Validate the input and build it under an existing root entity.
    pub fn build_into(&mut self, world: &mut World, root: Entity) -> Result<BuildReport, FatalInput> {
        let (project, source) = self.validate()?;
        Ok(self.build_hierarchy(world, root, project, source))
    }

    fn transition(&mut self, state: BuildState) {
        debug!("LDtk build: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn validate(&mut self) -> Result<(&'a LdtkProject, &'a str), FatalInput> {
        self.transition(BuildState::ValidatingInput);

        let result = match (self.document, self.source) {
            (None, _) => Err(FatalInput::MissingDocument),
            (Some(_), None) => Err(FatalInput::MissingSource),
            (Some(project), Some(source)) if project.level_count() == 0 => {
                Err(FatalInput::NoLevels(source.to_string()))
            }
            (Some(project), Some(source)) => Ok((project, source)),
        };

        if let Err(error) = &result {
            error!("LDtk: build aborted: {error}");
            self.transition(BuildState::Failed);
        }
        result
    }

    fn build_hierarchy(
        &mut self,
        world: &mut World,
        root: Entity,
        project: &'a LdtkProject,
        source: &'a str,
    ) -> BuildReport {
        let start = Instant::now();
        self.transition(BuildState::BuildingHierarchy);

        let mut errors = ImportErrors::new();
        let registry = UidRegistry::populate(project, &mut errors);
        let hooks = std::mem::take(&mut self.hooks);
        let tileset_images = std::mem::take(&mut self.tileset_images);

        let mut context = BuildContext {
            project,
            registry,
            config: self.config,
            injector: self.injector,
            targets: self.targets,
            tileset_images: &tileset_images,
            source,
            errors,
            dependencies: BuildDependencies::default(),
            post_build: hooks,
        };

        let worlds: Vec<Entity> = project
            .worlds()
            .map(|view| WorldBuilder::new(view).build(world, root, &mut context))
            .collect();

        let BuildContext {
            registry,
            errors,
            dependencies,
            mut post_build,
            ..
        } = context;

        self.transition(BuildState::PostProcessing);

        let world_count = worlds.len();
        let error_count = errors.len();
        post_build.push(move |world: &mut World| {
            world.trigger(ProjectBuilt {
                entity: root,
                world_count,
                error_count,
            });
        });
        post_build.apply(world);
        registry.release();
        self.tileset_images = tileset_images;

        let elapsed = start.elapsed();
        if world_count > 1 && self.config.log_build_times {
            info!("Built all worlds and levels in {}ms", elapsed.as_millis());
        }
        if error_count > 0 {
            warn!("LDtk: '{source}' built with {error_count} errors");
        }

        self.transition(BuildState::Done);

        BuildReport {
            root,
            worlds,
            errors: errors.into_vec(),
            dependencies,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(value: serde_json::Value) -> LdtkProject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_document_fails_without_spawning() {
        let mut world = World::new();
        let config = LdtkBuildConfig::default();
        let injector = FieldInjector::with_defaults();
        let targets = LdtkTargetRegistry::default();

        let mut builder = ProjectBuilder::new(None, Some("a.ldtk"), &config, &injector, &targets);
        assert_eq!(builder.state(), BuildState::NotStarted);

        let result = builder.build(&mut world);

        assert_eq!(result.unwrap_err(), FatalInput::MissingDocument);
        assert_eq!(builder.state(), BuildState::Failed);
        assert_eq!(world.entities().len(), 0);
    }

    #[test]
    fn test_no_levels_and_missing_source_are_fatal() {
        let mut world = World::new();
        let config = LdtkBuildConfig::default();
        let injector = FieldInjector::with_defaults();
        let targets = LdtkTargetRegistry::default();
        let empty = project(json!({ "iid": "p" }));

        let result = ProjectBuilder::new(Some(&empty), None, &config, &injector, &targets).build(&mut world);
        assert_eq!(result.unwrap_err(), FatalInput::MissingSource);

        let result =
            ProjectBuilder::new(Some(&empty), Some("empty.ldtk"), &config, &injector, &targets).build(&mut world);
        assert_eq!(result.unwrap_err(), FatalInput::NoLevels("empty.ldtk".into()));

        assert_eq!(world.entities().len(), 0);
    }

    #[test]
    fn test_hooks_run_after_hierarchy_in_order() {
        #[derive(Resource, Default)]
        struct Seen(Vec<(&'static str, usize)>);

        let mut world = World::new();
        world.init_resource::<Seen>();
        let config = LdtkBuildConfig::default();
        let injector = FieldInjector::with_defaults();
        let targets = LdtkTargetRegistry::default();
        let document = project(json!({
            "iid": "p",
            "levels": [{ "identifier": "A", "iid": "a", "uid": 1, "layerInstances": [] }]
        }));

        let count_worlds = |world: &mut World| {
            world
                .query::<&crate::components::LdtkWorld>()
                .iter(world)
                .count()
        };
        let mut builder = ProjectBuilder::new(Some(&document), Some("a.ldtk"), &config, &injector, &targets)
            .with_post_build(move |world: &mut World| {
                let worlds = count_worlds(world);
                world.resource_mut::<Seen>().0.push(("first", worlds));
            })
            .with_post_build(|world: &mut World| world.resource_mut::<Seen>().0.push(("second", 0)));

        let report = builder.build(&mut world).unwrap();

        assert_eq!(builder.state(), BuildState::Done);
        assert_eq!(report.worlds.len(), 1);
        assert!(report.is_clean());
        assert_eq!(world.resource::<Seen>().0, vec![("first", 1), ("second", 0)]);
    }
}
