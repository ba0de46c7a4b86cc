//! Evaluation of a layer's auto-layer rules into a tile batch.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::{LayerDefinition, LayerInstance, TilesetDefinition};

use super::rule::{CompiledRule, IntGridView, Orientation};
use crate::error::ImportErrors;
use crate::tiles::{TilePlacementBatch, TileTransform};

/// Rules of one layer instance, compiled and filtered, ready to run over its grid.
///
/// Built fresh for every layer instance of every build; nothing is cached between builds.
pub struct AutoTileEvaluator<'a> {
    rules: Vec<CompiledRule<'a>>,
    tileset: Option<&'a TilesetDefinition>,
    seed: i64,
    opacity: f32,
}

impl<'a> AutoTileEvaluator<'a> {
    /// Collect the runnable rules of `definition` for `instance`.
    ///
    /// Inactive groups and rules are skipped, optional groups run only when the instance
    /// enables them, and invalid rules are reported and skipped.
    pub fn new(
        definition: &'a LayerDefinition,
        instance: &LayerInstance,
        tileset: Option<&'a TilesetDefinition>,
        errors: &mut ImportErrors,
    ) -> Self {
        let mut rules = Vec::new();

        for group in &definition.auto_rule_groups {
            if !group.active {
                continue;
            }
            if group.is_optional && !instance.optional_rules.contains(&group.uid) {
                continue;
            }
            for rule in &group.rules {
                if !rule.active || rule.invalidated {
                    continue;
                }
                if let Some(compiled) = errors.ok(CompiledRule::compile(rule)) {
                    rules.push(compiled);
                }
            }
        }

        Self {
            rules,
            tileset,
            seed: instance.seed,
            opacity: instance.opacity,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run every rule over every cell, staging results into `batch`.
    ///
    /// Cells are visited row by row; at each cell rules run in order until one matching
    /// rule breaks on match. Returns the number of tiles staged.
    pub fn evaluate(
        &self,
        grid: &IntGridView,
        batch: &mut TilePlacementBatch,
        errors: &mut ImportErrors,
    ) -> usize {
        let mut staged = 0;

        for y in 0..grid.height {
            for x in 0..grid.width {
                let cell = IVec2::new(x, y);
                for rule in &self.rules {
                    if !rule.passes_chance(self.seed, cell)
                        || !rule.passes_perlin(cell)
                        || !rule.passes_modulo(cell)
                    {
                        continue;
                    }
                    let Some(orientation) = rule.find_match(grid, cell) else {
                        continue;
                    };

                    staged += self.paint(rule, grid, cell, orientation, batch, errors);

                    if rule.breaks_on_match() {
                        break;
                    }
                }
            }
        }

        staged
    }

    fn paint(
        &self,
        rule: &CompiledRule,
        grid: &IntGridView,
        cell: IVec2,
        orientation: Orientation,
        batch: &mut TilePlacementBatch,
        errors: &mut ImportErrors,
    ) -> usize {
        let pixel_offset = rule.pixel_offset(self.seed, cell);
        let transform = TileTransform {
            flip_x: orientation.flip_x,
            flip_y: orientation.flip_y,
            // Y up
            offset: Vec2::new(pixel_offset.x as f32, -pixel_offset.y as f32),
        };
        let alpha = rule.def.alpha * self.opacity;

        let mut staged = 0;
        for tile in rule.tiles(self.tileset, self.seed, cell, orientation) {
            let target = cell + tile.offset;
            if !grid.contains(target) {
                continue;
            }
            if errors.ok(batch.stage(target, tile.tile_id)).is_none() {
                continue;
            }
            if alpha < 1.0 {
                batch.stage_tint(target, Color::srgba(1.0, 1.0, 1.0, alpha.max(0.0)));
            }
            if !transform.is_identity() {
                batch.stage_transform(target, transform);
            }
            staged += 1;
        }
        staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ldtkmap_schema::prelude::{AutoLayerRuleDefinition, AutoRuleGroup};

    fn layer(rules: Vec<AutoLayerRuleDefinition>) -> LayerDefinition {
        LayerDefinition {
            uid: 1,
            identifier: "Walls".into(),
            auto_rule_groups: vec![AutoRuleGroup {
                uid: 10,
                rules,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn everywhere(uid: i32, tile: i32) -> AutoLayerRuleDefinition {
        AutoLayerRuleDefinition {
            uid,
            size: 1,
            pattern: vec![1],
            tile_rects_ids: vec![vec![tile]],
            ..Default::default()
        }
    }

    fn evaluate(definition: &LayerDefinition, instance: &LayerInstance, values: &[i32]) -> (TilePlacementBatch, ImportErrors) {
        let mut errors = ImportErrors::new();
        let mut batch = TilePlacementBatch::new("test");
        let grid = IntGridView::new(3, 3, values);
        AutoTileEvaluator::new(definition, instance, None, &mut errors).evaluate(&grid, &mut batch, &mut errors);
        (batch, errors)
    }

    #[test]
    fn test_full_grid_single_rule_stages_every_cell() {
        let definition = layer(vec![everywhere(1, 7)]);
        let (batch, errors) = evaluate(&definition, &LayerInstance::default(), &[1; 9]);

        assert_eq!(batch.len(), 9);
        assert!(errors.is_empty());
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(batch.tile_at(IVec2::new(x, y)), Some(7));
            }
        }
    }

    #[test]
    fn test_break_on_match_stops_later_rules() {
        let definition = layer(vec![everywhere(1, 7), everywhere(2, 8)]);
        let (batch, errors) = evaluate(&definition, &LayerInstance::default(), &[1; 9]);

        assert!(errors.is_empty());
        assert!(batch.iter().all(|(_, tile)| tile == 7));
    }

    #[test]
    fn test_stacked_rules_report_duplicate_stage() {
        let mut first = everywhere(1, 7);
        first.break_on_match = false;
        let definition = layer(vec![first, everywhere(2, 8)]);
        let (batch, errors) = evaluate(&definition, &LayerInstance::default(), &[0, 0, 0, 0, 1, 0, 0, 0, 0]);

        assert_eq!(batch.tile_at(IVec2::new(1, 1)), Some(7));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let mut rule = everywhere(1, 7);
        rule.chance = 0.5;
        rule.tile_rects_ids = vec![vec![1], vec![2], vec![3]];
        rule.tile_random_x_max = 3;
        let definition = layer(vec![rule]);
        let instance = LayerInstance {
            seed: 1234,
            ..Default::default()
        };

        let (first, _) = evaluate(&definition, &instance, &[1; 9]);
        let (second, _) = evaluate(&definition, &instance, &[1; 9]);

        assert_eq!(first.iter().collect::<Vec<_>>(), second.iter().collect::<Vec<_>>());
        for (cell, _) in first.iter() {
            assert_eq!(first.transform_at(cell), second.transform_at(cell));
        }
    }

    #[test]
    fn test_perlin_gate_drops_cells_independently_of_layer_seed() {
        let run = |rule: &AutoLayerRuleDefinition, seed: i64| {
            let definition = layer(vec![rule.clone()]);
            let instance = LayerInstance {
                seed,
                ..Default::default()
            };
            let values = [1; 16 * 16];
            let mut errors = ImportErrors::new();
            let mut batch = TilePlacementBatch::new("test");
            AutoTileEvaluator::new(&definition, &instance, None, &mut errors).evaluate(
                &IntGridView::new(16, 16, &values),
                &mut batch,
                &mut errors,
            );
            let mut cells: Vec<_> = batch.iter().map(|(cell, _)| (cell.x, cell.y)).collect();
            cells.sort_unstable();
            cells
        };

        let mut rule = everywhere(1, 7);
        rule.perlin_active = true;
        rule.perlin_seed = 11.0;
        rule.perlin_scale = 0.3;

        let first = run(&rule, 1);
        assert!(!first.is_empty());
        assert!(first.len() < 16 * 16);
        assert_eq!(first, run(&rule, 1));
        assert_eq!(first, run(&rule, 9000));

        rule.perlin_active = false;
        assert_eq!(run(&rule, 9000).len(), 16 * 16);
    }

    #[test]
    fn test_inactive_and_optional_groups() {
        let mut definition = layer(vec![everywhere(1, 7)]);
        definition.auto_rule_groups[0].is_optional = true;

        let (batch, _) = evaluate(&definition, &LayerInstance::default(), &[1; 9]);
        assert!(batch.is_empty());

        let enabled = LayerInstance {
            optional_rules: vec![10],
            ..Default::default()
        };
        let (batch, _) = evaluate(&definition, &enabled, &[1; 9]);
        assert_eq!(batch.len(), 9);

        definition.auto_rule_groups[0].active = false;
        let (batch, _) = evaluate(&definition, &enabled, &[1; 9]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_invalid_rule_is_reported_and_skipped() {
        let mut broken = everywhere(1, 7);
        broken.size = 4;
        let definition = layer(vec![broken, everywhere(2, 8)]);
        let (batch, errors) = evaluate(&definition, &LayerInstance::default(), &[1; 9]);

        assert_eq!(errors.len(), 1);
        assert_eq!(batch.len(), 9);
        assert_eq!(batch.tile_at(IVec2::ZERO), Some(8));
    }

    #[test]
    fn test_alpha_and_opacity_become_tint() {
        let mut rule = everywhere(1, 7);
        rule.alpha = 0.5;
        let definition = layer(vec![rule]);
        let instance = LayerInstance {
            opacity: 0.5,
            ..Default::default()
        };

        let (batch, _) = evaluate(&definition, &instance, &[1; 9]);

        assert_eq!(batch.tint_at(IVec2::ZERO), Some(Color::srgba(1.0, 1.0, 1.0, 0.25)));
    }
}
