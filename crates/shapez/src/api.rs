//! Curated surface for the CLI and benches (UNSTABLE).
//!
//! Breaking changes are allowed; prefer these re-exports for consistency
//! across commands.

// Shapes and the text codec
pub use crate::shape::{
    Shape, ShapeCodeError, FLAT_1, FLAT_2, FLAT_3, FLAT_4, NUM_LAYERS, PIN_1, PIN_4,
};
// Operators
pub use crate::ops::{
    crystallize, crystallize_one, cut_left, cut_right, fast_stack, fast_swap, pin_push,
    rotate_180, rotate_left, rotate_right, stack, swap_left, swap_right, ArityError, Op, OpKind,
    OpStats,
};
// Search
pub use crate::solver::{
    Build, CostRule, InvariantViolation, Ledger, OpSet, RunSummary, Solver, SolverCfg,
    COST_LIMIT, DEFAULT_SEEDS, SEED_COST,
};
// Persistence and reporting
pub use crate::census::{cost_histogram, layer_census, LayerCensus};
pub use crate::recipe::{render as render_recipe, trace as trace_recipe, RecipeStep};
pub use crate::store::{
    read_ledger, read_shapes, shard_index, write_ledger, write_shapes, write_sharded, BuildSource,
    ShardedDb, StoreError,
};
