//! Auto-layer rule evaluation.
//!
//! Rules are matched against an int-grid with seeded, order-independent randomness, so a
//! layer always produces the same tiles for the same document.

pub mod evaluate;
pub mod random;
pub mod rule;

pub use evaluate::AutoTileEvaluator;
pub use rule::{CompiledRule, IntGridView, MAX_PATTERN_SIZE, Orientation, RuleTile};
