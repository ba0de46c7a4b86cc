//! A validated auto-layer rule and its per-cell tests.

use bevy::prelude::*;
use bevy_ldtkmap_schema::defs::PATTERN_ANYTHING;
use bevy_ldtkmap_schema::prelude::{AutoLayerRuleDefinition, CheckerMode, TileMode, TilesetDefinition};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::random::{self, Salt};
use crate::error::ImportError;

/// Largest pattern side LDtk allows.
pub const MAX_PATTERN_SIZE: i32 = 7;

/// Read-only view of an int-grid, row-major with Y down.
#[derive(Debug, Clone, Copy)]
pub struct IntGridView<'a> {
    pub width: i32,
    pub height: i32,
    pub values: &'a [i32],
}

impl<'a> IntGridView<'a> {
    pub fn new(width: i32, height: i32, values: &'a [i32]) -> Self {
        Self {
            width,
            height,
            values,
        }
    }

    /// Value at `cell`, `None` outside the grid.
    pub fn get(&self, cell: IVec2) -> Option<i32> {
        if cell.x < 0 || cell.y < 0 || cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        self.values.get((cell.y * self.width + cell.x) as usize).copied()
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }
}

/// Mirroring applied to a pattern when testing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub flip_x: bool,
    pub flip_y: bool,
}

const ORIENTATIONS: [Orientation; 4] = [
    Orientation { flip_x: false, flip_y: false },
    Orientation { flip_x: true, flip_y: false },
    Orientation { flip_x: false, flip_y: true },
    Orientation { flip_x: true, flip_y: true },
];

/// One tile a matched rule paints, relative to the matched cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTile {
    pub offset: IVec2,
    pub tile_id: u32,
}

/// An auto-layer rule checked for consistency, ready to evaluate.
pub struct CompiledRule<'a> {
    pub def: &'a AutoLayerRuleDefinition,
    radius: i32,
    rects: Vec<Vec<i32>>,
    perlin: Option<Fbm<Perlin>>,
}

impl<'a> CompiledRule<'a> {
    /// Validate a rule definition.
    ///
    /// The pattern side must be odd and at most [`MAX_PATTERN_SIZE`], the pattern must hold
    /// `size²` values, and the rule needs at least one candidate tile.
    pub fn compile(def: &'a AutoLayerRuleDefinition) -> Result<Self, ImportError> {
        let invalid = |message: String| ImportError::InvalidRule {
            rule_uid: def.uid,
            message,
        };

        if def.size < 1 || def.size > MAX_PATTERN_SIZE || def.size % 2 == 0 {
            return Err(invalid(format!("pattern size {} is not 1, 3, 5 or 7", def.size)));
        }
        let expected = (def.size * def.size) as usize;
        if def.pattern.len() != expected {
            return Err(invalid(format!(
                "pattern holds {} values, expected {expected}",
                def.pattern.len()
            )));
        }

        let rects: Vec<Vec<i32>> = def
            .tile_rects()
            .into_iter()
            .filter(|rect| !rect.is_empty())
            .collect();
        if rects.is_empty() {
            return Err(invalid("no candidate tiles".to_string()));
        }

        let perlin = def.perlin_active.then(|| {
            Fbm::<Perlin>::new(random::noise_seed(def.perlin_seed))
                .set_octaves(def.perlin_octaves.max(1.0) as usize)
        });

        Ok(Self {
            def,
            radius: def.size / 2,
            rects,
            perlin,
        })
    }

    pub fn uid(&self) -> i32 {
        self.def.uid
    }

    pub fn breaks_on_match(&self) -> bool {
        self.def.break_on_match
    }

    /// Seeded chance roll for `cell`.
    pub fn passes_chance(&self, seed: i64, cell: IVec2) -> bool {
        let chance = self.def.chance;
        if chance >= 1.0 {
            return true;
        }
        if chance <= 0.0 {
            return false;
        }
        random::unit(seed, self.def.uid, cell, Salt::Chance) < chance
    }

    /// Perlin gate; cells where the noise is negative are rejected.
    pub fn passes_perlin(&self, cell: IVec2) -> bool {
        let Some(perlin) = &self.perlin else {
            return true;
        };
        let scale = f64::from(self.def.perlin_scale);
        perlin.get([f64::from(cell.x) * scale, f64::from(cell.y) * scale]) >= 0.0
    }

    /// Modulo and offset gating, with the alternate-row/column shift of checker modes.
    pub fn passes_modulo(&self, cell: IVec2) -> bool {
        let x_modulo = self.def.x_modulo.max(1);
        let y_modulo = self.def.y_modulo.max(1);
        let checker = self.def.checker;

        let row = if checker == CheckerMode::Vertical {
            cell.y + (cell.x / x_modulo) % 2
        } else {
            cell.y
        };
        let column = if checker == CheckerMode::Horizontal {
            cell.x + (cell.y / y_modulo) % 2
        } else {
            cell.x
        };

        (row - self.def.y_offset).rem_euclid(y_modulo) == 0
            && (column - self.def.x_offset).rem_euclid(x_modulo) == 0
    }

    /// Test the pattern around `cell` in one orientation.
    pub fn matches(&self, grid: &IntGridView, cell: IVec2, orientation: Orientation) -> bool {
        let size = self.def.size;
        for py in 0..size {
            for px in 0..size {
                let expected = self.def.pattern[(py * size + px) as usize];
                if expected == 0 {
                    continue;
                }

                let mut offset = IVec2::new(px - self.radius, py - self.radius);
                if orientation.flip_x {
                    offset.x = -offset.x;
                }
                if orientation.flip_y {
                    offset.y = -offset.y;
                }

                let neighbour = grid
                    .get(cell + offset)
                    .or_else(|| self.def.out_of_bounds_value.filter(|_| !grid.contains(cell + offset)));
                let Some(actual) = neighbour else {
                    return false;
                };

                let ok = match expected {
                    PATTERN_ANYTHING => actual != 0,
                    v if v == -PATTERN_ANYTHING => actual == 0,
                    v if v > 0 => actual == v,
                    v => actual != -v,
                };
                if !ok {
                    return false;
                }
            }
        }
        true
    }

    /// First allowed orientation whose pattern matches at `cell`.
    pub fn find_match(&self, grid: &IntGridView, cell: IVec2) -> Option<Orientation> {
        ORIENTATIONS
            .into_iter()
            .filter(|o| (!o.flip_x || self.def.flip_x) && (!o.flip_y || self.def.flip_y))
            .find(|o| self.matches(grid, cell, *o))
    }

    /// Tiles to paint for a match at `cell`.
    ///
    /// `Single` paints the first tile of a randomly picked rectangle on the cell. `Stamp`
    /// paints every tile of the rectangle, laid out as in the tileset and anchored on the
    /// rule pivot, mirrored with the matched orientation.
    pub fn tiles(
        &self,
        tileset: Option<&TilesetDefinition>,
        seed: i64,
        cell: IVec2,
        orientation: Orientation,
    ) -> Vec<RuleTile> {
        let rect = &self.rects[random::pick(seed, self.def.uid, cell, self.rects.len())];

        let stamp = self.def.tile_mode == TileMode::Stamp && rect.len() > 1;
        let Some(tileset) = tileset.filter(|_| stamp) else {
            return vec![RuleTile {
                offset: IVec2::ZERO,
                tile_id: rect[0].max(0) as u32,
            }];
        };

        let coords: Vec<(i32, IVec2)> = rect
            .iter()
            .filter_map(|id| {
                tileset
                    .tile_coords(*id)
                    .map(|(x, y)| (*id, IVec2::new(x, y)))
            })
            .collect();
        let Some(first) = coords.first().map(|(_, c)| *c) else {
            return Vec::new();
        };
        let (min, max) = coords
            .iter()
            .fold((first, first), |(min, max), (_, c)| (min.min(*c), max.max(*c)));
        let extent = max - min;
        let pivot = IVec2::new(
            (self.def.pivot_x * extent.x as f32).floor() as i32,
            (self.def.pivot_y * extent.y as f32).floor() as i32,
        );

        coords
            .into_iter()
            .map(|(id, coord)| {
                let mut offset = coord - min - pivot;
                if orientation.flip_x {
                    offset.x = -offset.x;
                }
                if orientation.flip_y {
                    offset.y = -offset.y;
                }
                RuleTile {
                    offset,
                    tile_id: id as u32,
                }
            })
            .collect()
    }

    /// Constant offset plus seeded jitter, in pixels with Y down.
    pub fn pixel_offset(&self, seed: i64, cell: IVec2) -> IVec2 {
        let def = self.def;
        let jitter_x = if def.tile_random_x_min != 0 || def.tile_random_x_max != 0 {
            random::range(seed, def.uid, cell, Salt::JitterX, def.tile_random_x_min, def.tile_random_x_max)
        } else {
            0
        };
        let jitter_y = if def.tile_random_y_min != 0 || def.tile_random_y_max != 0 {
            random::range(seed, def.uid, cell, Salt::JitterY, def.tile_random_y_min, def.tile_random_y_max)
        } else {
            0
        };
        IVec2::new(def.tile_x_offset + jitter_x, def.tile_y_offset + jitter_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(size: i32, pattern: Vec<i32>) -> AutoLayerRuleDefinition {
        AutoLayerRuleDefinition {
            uid: 1,
            size,
            pattern,
            tile_rects_ids: vec![vec![5]],
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_sizes_are_rejected() {
        let even = rule(2, vec![1; 4]);
        assert!(matches!(
            CompiledRule::compile(&even),
            Err(ImportError::InvalidRule { rule_uid: 1, .. })
        ));

        let short = rule(3, vec![1; 8]);
        assert!(CompiledRule::compile(&short).is_err());

        let mut empty = rule(1, vec![1]);
        empty.tile_rects_ids.clear();
        assert!(CompiledRule::compile(&empty).is_err());
    }

    #[test]
    fn test_pattern_value_semantics() {
        // 1 2
        // 0 3
        let values = [1, 2, 0, 3];
        let grid = IntGridView::new(2, 2, &values);
        let at = |pattern| {
            let def = rule(1, vec![pattern]);
            let compiled = CompiledRule::compile(&def).unwrap();
            [IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(0, 1), IVec2::new(1, 1)]
                .map(|cell| compiled.matches(&grid, cell, Orientation::default()))
        };

        assert_eq!(at(2), [false, true, false, false]);
        assert_eq!(at(-2), [true, false, true, true]);
        assert_eq!(at(PATTERN_ANYTHING), [true, true, false, true]);
        assert_eq!(at(-PATTERN_ANYTHING), [false, false, true, false]);
    }

    #[test]
    fn test_out_of_bounds_neighbours() {
        let values = [1];
        let grid = IntGridView::new(1, 1, &values);
        // Requires a 1 on the left
        let mut def = rule(3, vec![0, 0, 0, 1, 0, 0, 0, 0, 0]);

        let compiled = CompiledRule::compile(&def).unwrap();
        assert!(!compiled.matches(&grid, IVec2::ZERO, Orientation::default()));

        def.out_of_bounds_value = Some(1);
        let compiled = CompiledRule::compile(&def).unwrap();
        assert!(compiled.matches(&grid, IVec2::ZERO, Orientation::default()));
    }

    #[test]
    fn test_flip_x_matches_mirrored_pattern() {
        // 0 1
        let values = [0, 1];
        let grid = IntGridView::new(2, 1, &values);
        // Requires a 1 on the left
        let mut def = rule(3, vec![0, 0, 0, 1, 0, 0, 0, 0, 0]);

        assert_eq!(
            CompiledRule::compile(&def).unwrap().find_match(&grid, IVec2::ZERO),
            None
        );

        def.flip_x = true;
        assert_eq!(
            CompiledRule::compile(&def).unwrap().find_match(&grid, IVec2::ZERO),
            Some(Orientation { flip_x: true, flip_y: false })
        );
    }

    #[test]
    fn test_modulo_and_checker() {
        let mut def = rule(1, vec![0]);
        def.x_modulo = 2;
        let compiled = CompiledRule::compile(&def).unwrap();
        assert!(compiled.passes_modulo(IVec2::new(0, 0)));
        assert!(!compiled.passes_modulo(IVec2::new(1, 0)));
        assert!(compiled.passes_modulo(IVec2::new(0, 1)));

        def.checker = CheckerMode::Horizontal;
        let compiled = CompiledRule::compile(&def).unwrap();
        assert!(compiled.passes_modulo(IVec2::new(0, 0)));
        assert!(!compiled.passes_modulo(IVec2::new(0, 1)));
        assert!(compiled.passes_modulo(IVec2::new(1, 1)));
    }

    #[test]
    fn test_checker_modes_shift_alternate_lines() {
        let passing = |checker| {
            let mut def = rule(1, vec![0]);
            def.x_modulo = 2;
            def.y_modulo = 2;
            def.checker = checker;
            let compiled = CompiledRule::compile(&def).unwrap();
            let mut cells = Vec::new();
            for y in 0..4 {
                for x in 0..4 {
                    if compiled.passes_modulo(IVec2::new(x, y)) {
                        cells.push((x, y));
                    }
                }
            }
            cells
        };

        assert_eq!(passing(CheckerMode::None), vec![(0, 0), (2, 0), (0, 2), (2, 2)]);
        // Every other column moves down one row
        assert_eq!(passing(CheckerMode::Vertical), vec![(0, 0), (2, 1), (0, 2), (2, 3)]);
        // Every other row moves right one column
        assert_eq!(passing(CheckerMode::Horizontal), vec![(0, 0), (2, 0), (1, 2), (3, 2)]);
    }

    fn perlin_mask(def: &AutoLayerRuleDefinition) -> Vec<bool> {
        let compiled = CompiledRule::compile(def).unwrap();
        let mut mask = Vec::new();
        for y in 0..32 {
            for x in 0..32 {
                mask.push(compiled.passes_perlin(IVec2::new(x, y)));
            }
        }
        mask
    }

    #[test]
    fn test_perlin_gate_is_seeded_and_deterministic() {
        let mut def = rule(1, vec![0]);
        def.perlin_active = true;
        def.perlin_seed = 4.0;
        def.perlin_scale = 0.3;

        let first = perlin_mask(&def);
        assert_eq!(first, perlin_mask(&def));
        assert!(first.contains(&true));
        assert!(first.contains(&false));

        def.perlin_seed = -4.0;
        assert_ne!(first, perlin_mask(&def));

        def.perlin_active = false;
        def.perlin_seed = 99.0;
        assert!(perlin_mask(&def).iter().all(|passes| *passes));
    }

    #[test]
    fn test_chance_extremes() {
        let mut def = rule(1, vec![0]);
        def.chance = 0.0;
        let compiled = CompiledRule::compile(&def).unwrap();
        assert!((0..32).all(|x| !compiled.passes_chance(9, IVec2::new(x, 0))));

        def.chance = 1.0;
        let compiled = CompiledRule::compile(&def).unwrap();
        assert!((0..32).all(|x| compiled.passes_chance(9, IVec2::new(x, 0))));
    }

    #[test]
    fn test_stamp_lays_out_rectangle_around_pivot() {
        let tileset = TilesetDefinition {
            uid: 1,
            c_wid: 4,
            c_hei: 4,
            tile_grid_size: 16,
            ..Default::default()
        };
        let mut def = rule(1, vec![0]);
        def.tile_mode = TileMode::Stamp;
        // 2x1 rectangle: tiles 5 and 6, pivot on the right tile
        def.tile_rects_ids = vec![vec![5, 6]];
        def.pivot_x = 1.0;
        let compiled = CompiledRule::compile(&def).unwrap();

        let tiles = compiled.tiles(Some(&tileset), 0, IVec2::ZERO, Orientation::default());

        assert_eq!(
            tiles,
            vec![
                RuleTile { offset: IVec2::new(-1, 0), tile_id: 5 },
                RuleTile { offset: IVec2::new(0, 0), tile_id: 6 },
            ]
        );
    }

    #[test]
    fn test_jitter_stays_within_range() {
        let mut def = rule(1, vec![0]);
        def.tile_x_offset = 4;
        def.tile_random_x_min = -2;
        def.tile_random_x_max = 2;
        let compiled = CompiledRule::compile(&def).unwrap();

        for x in 0..32 {
            let offset = compiled.pixel_offset(3, IVec2::new(x, 0));
            assert!((2..=6).contains(&offset.x));
            assert_eq!(offset.y, 0);
        }
    }
}
