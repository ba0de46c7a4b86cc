//! Stateless randomness keyed by layer seed, rule and cell.
//!
//! Every roll is a pure function of its inputs, so evaluating the same layer twice stages the
//! same tiles regardless of evaluation order.

use bevy::prelude::IVec2;

/// Independent streams for the different rolls made at one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Salt {
    Chance = 1,
    Pick = 2,
    JitterX = 3,
    JitterY = 4,
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn fold_mix(state: u64, value: u64, tweak: u64) -> u64 {
    splitmix64(state ^ value.wrapping_mul(tweak))
}

/// Hash of `(seed, rule, cell, salt)`.
pub fn cell_hash(seed: i64, rule_uid: i32, cell: IVec2, salt: Salt) -> u64 {
    let mut state = splitmix64(seed as u64);
    state = fold_mix(state, rule_uid as u32 as u64, 0x9E37_79B9);
    state = fold_mix(state, cell.x as u32 as u64, 0xC2B2_AE35);
    state = fold_mix(state, cell.y as u32 as u64, 0x1656_67B1);
    splitmix64(state ^ (salt as u64).wrapping_mul(0xD1B5_4A32_4F3A_9E55))
}

/// Seed for a noise generator, mixed from the whole float so distinct seeds stay distinct.
pub fn noise_seed(seed: f32) -> u32 {
    (splitmix64(u64::from(seed.to_bits())) >> 32) as u32
}

/// Uniform value in `[0, 1)`.
pub fn unit(seed: i64, rule_uid: i32, cell: IVec2, salt: Salt) -> f32 {
    let mantissa = cell_hash(seed, rule_uid, cell, salt) >> 40;
    mantissa as f32 / (1u64 << 24) as f32
}

/// Index in `0..len`; `0` for empty ranges.
pub fn pick(seed: i64, rule_uid: i32, cell: IVec2, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (cell_hash(seed, rule_uid, cell, Salt::Pick) % len as u64) as usize
}

/// Integer in `min..=max`, bounds in any order.
pub fn range(seed: i64, rule_uid: i32, cell: IVec2, salt: Salt, min: i32, max: i32) -> i32 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let span = (high as i64 - low as i64 + 1) as u64;
    low + (cell_hash(seed, rule_uid, cell, salt) % span) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_pure() {
        let cell = IVec2::new(4, 7);
        assert_eq!(
            cell_hash(42, 3, cell, Salt::Chance),
            cell_hash(42, 3, cell, Salt::Chance)
        );
        assert_ne!(
            cell_hash(42, 3, cell, Salt::Chance),
            cell_hash(42, 3, cell, Salt::Pick)
        );
        assert_ne!(
            cell_hash(42, 3, cell, Salt::Chance),
            cell_hash(43, 3, cell, Salt::Chance)
        );
    }

    #[test]
    fn test_unit_and_range_stay_in_bounds() {
        for x in 0..64 {
            let cell = IVec2::new(x, -x);
            let roll = unit(7, 1, cell, Salt::Chance);
            assert!((0.0..1.0).contains(&roll));

            let jitter = range(7, 1, cell, Salt::JitterX, 2, -2);
            assert!((-2..=2).contains(&jitter));

            assert!(pick(7, 1, cell, 3) < 3);
        }
        assert_eq!(range(7, 1, IVec2::ZERO, Salt::JitterY, 5, 5), 5);
    }

    #[test]
    fn test_noise_seed_keeps_negative_and_large_seeds_apart() {
        let seeds = [0.0, -1.0, -2.0, 5.0e9, 6.0e9, 0.5];
        for (i, a) in seeds.iter().enumerate() {
            for b in &seeds[i + 1..] {
                assert_ne!(noise_seed(*a), noise_seed(*b), "{a} and {b}");
            }
        }
        assert_eq!(noise_seed(-1.0), noise_seed(-1.0));
    }
}
