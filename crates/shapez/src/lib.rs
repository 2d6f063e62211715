//! Shape state-space search: codec, operators, frontier solver, persistence.
//!
//! Cross-refs live in doc comments; module docs follow the
//! "Purpose / Why this design / References" layout.
//!
//! API Policy
//! - This crate backs the `shapez-cli` binary. There is no stable public API;
//!   prefer `api` or `prelude` for imports.

pub mod api;
pub mod census;
pub mod ops;
pub mod recipe;
pub mod shape;
pub mod solver;
pub mod store;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use shape::{Shape, ShapeCodeError};

/// Common exports for callers.
pub mod prelude {
    pub use crate::ops::{Op, OpStats};
    pub use crate::shape::Shape;
    pub use crate::solver::{Build, CostRule, Ledger, OpSet, RunSummary, Solver, SolverCfg};
}
