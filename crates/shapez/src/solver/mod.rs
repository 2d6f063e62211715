//! Frontier search engine and build ledger.
//!
//! Purpose
//! - Compute, for every shape reachable from a seed set, the cheapest known
//!   sequence of operator applications that builds it.
//!
//! Why this design
//! - Costs are positive integers, so draining cost buckets in ascending order
//!   finalizes a shape's cost when its bucket is drained (Dijkstra by levels).
//! - Batches bound peak memory; the expansion of a batch is data-parallel
//!   (rayon) and offers results into a sharded concurrent map (dashmap).
//! - Equal-cost ties are resolved by a total order on records, so the final
//!   ledger does not depend on thread scheduling.
//!
//! References
//! - Code cross-refs: `crate::ops::Op`, `crate::store` (persistence),
//!   `crate::recipe` (construction trees).

mod engine;
mod frontier;
mod ledger;
mod types;

pub use engine::Solver;
pub use frontier::Frontier;
pub use ledger::{Ledger, Offer};
pub use types::{
    BinaryStep, Build, CostRule, InvariantViolation, OpSet, RunSummary, SolverCfg, COST_LIMIT,
    SEED_COST,
};

use crate::shape::Shape;

/// The reference primitive set: a full solid layer and a full pin layer.
pub const DEFAULT_SEEDS: [Shape; 2] = [Shape(0x000f), Shape(0x000f_0000)];

#[cfg(test)]
mod tests;
