//! Reactive build of project roots whose asset finished loading.

use std::collections::HashMap;
use std::path::Path;

use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy_ldtkmap_schema::LdtkProject;
use bevy_ldtkmap_schema::path::resolve_relative_path;

use crate::build::{LdtkBuildReport, ProjectBuilder};
use crate::components::{LdtkProjectRoot, RespawnLdtkProject};
use crate::fields::{FieldInjector, LdtkTargetRegistry};
use crate::plugin::LdtkBuildConfig;

/// Exclusive system that builds every pending [`LdtkProjectRoot`].
///
/// Runs in `PreUpdate` before user systems.
///
/// # Triggers
///
/// - A root without [`LdtkBuildReport`]: first build once the asset is available
/// - A root with [`RespawnLdtkProject`]: its children are despawned and it is built again
///
/// Roots whose asset is still loading are left for a later frame. A root whose asset failed
/// to load gets a failed report.
pub fn process_loaded_projects(world: &mut World) {
    let mut roots = world.query_filtered::<
        (Entity, &LdtkProjectRoot, Has<RespawnLdtkProject>),
        Or<(Without<LdtkBuildReport>, With<RespawnLdtkProject>)>,
    >();
    let pending: Vec<(Entity, LdtkProjectRoot, bool)> = roots
        .iter(world)
        .map(|(entity, root, respawn)| (entity, root.clone(), respawn))
        .collect();

    for (entity, root, respawn) in pending {
        let document = world
            .resource::<Assets<LdtkProject>>()
            .get(&root.handle)
            .cloned();

        if document.is_none() && !load_failed(world, &root.handle) {
            continue;
        }

        let source = root.source.clone().or_else(|| {
            root.handle
                .path()
                .map(|path| path.path().to_string_lossy().into_owned())
        });

        if respawn {
            despawn_children(world, entity);
            world.entity_mut(entity).remove::<RespawnLdtkProject>();
        }

        let images = match (&document, &source) {
            (Some(project), Some(source)) => load_tileset_images(world, project, source),
            _ => HashMap::new(),
        };

        let config = world.resource::<LdtkBuildConfig>().clone();
        let result = world.resource_scope(|world, injector: Mut<FieldInjector>| {
            world.resource_scope(|world, targets: Mut<LdtkTargetRegistry>| {
                ProjectBuilder::new(document.as_ref(), source.as_deref(), &config, &injector, &targets)
                    .with_tileset_images(images)
                    .build_into(world, entity)
            })
        });

        let report = match result {
            Ok(report) => {
                info!(
                    "Built LDtk project '{}' with {} worlds and {} errors",
                    source.as_deref().unwrap_or_default(),
                    report.worlds.len(),
                    report.errors.len()
                );
                LdtkBuildReport::Built(report)
            }
            Err(error) => LdtkBuildReport::Failed(error),
        };

        let mut root_entity = world.entity_mut(entity);
        if !root_entity.contains::<Name>() {
            root_entity.insert(Name::new(format!(
                "LDtk Project: {}",
                project_name(source.as_deref())
            )));
        }
        root_entity.insert(report);
    }
}

fn load_failed(world: &World, handle: &Handle<LdtkProject>) -> bool {
    world
        .get_resource::<AssetServer>()
        .is_some_and(|server| matches!(server.load_state(handle), LoadState::Failed(_)))
}

fn despawn_children(world: &mut World, entity: Entity) {
    let children = world
        .get::<Children>(entity)
        .map(|children| children.to_vec())
        .unwrap_or_default();
    for child in children {
        world.despawn(child);
    }
}

/// Load the image of every tileset stored as a file next to the project.
///
/// Nothing is loaded when the app has no image assets, as in headless apps.
fn load_tileset_images(world: &World, project: &LdtkProject, source: &str) -> HashMap<i32, Handle<Image>> {
    if !world.contains_resource::<Assets<Image>>() {
        return HashMap::new();
    }
    let Some(server) = world.get_resource::<AssetServer>() else {
        return HashMap::new();
    };

    project
        .defs
        .tilesets
        .iter()
        .filter_map(|tileset| {
            let relative = tileset.rel_path.as_deref()?;
            match resolve_relative_path(Path::new(source), relative) {
                Ok(path) => Some((tileset.uid, server.load(path))),
                Err(error) => {
                    warn!("Tileset '{}': {error}", tileset.identifier);
                    None
                }
            }
        })
        .collect()
}

fn project_name(source: Option<&str>) -> &str {
    source
        .and_then(|source| Path::new(source).file_stem())
        .and_then(|stem| stem.to_str())
        .unwrap_or("Project")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FatalInput;

    #[test]
    fn test_project_name_from_source() {
        assert_eq!(project_name(Some("levels/cavern.ldtk")), "cavern");
        assert_eq!(project_name(None), "Project");
    }

    #[test]
    fn test_missing_source_is_reported_on_root() {
        let mut world = World::new();
        world.init_resource::<Assets<LdtkProject>>();
        world.insert_resource(LdtkBuildConfig::default());
        world.insert_resource(FieldInjector::with_defaults());
        world.init_resource::<LdtkTargetRegistry>();

        let handle = world
            .resource_mut::<Assets<LdtkProject>>()
            .add(LdtkProject::default());
        let root = world.spawn(LdtkProjectRoot::new(handle)).id();

        process_loaded_projects(&mut world);

        let report = world.get::<LdtkBuildReport>(root).unwrap();
        assert!(matches!(report, LdtkBuildReport::Failed(FatalInput::MissingSource)));
    }
}
