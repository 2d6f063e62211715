//! Configuration, build records and the solver's error/summary types.

use std::fmt;

use crate::ops::{Op, OpStats};
use crate::shape::Shape;

/// Cost of every seed (`Op::Nop`) record.
pub const SEED_COST: u32 = 1;

/// Largest accepted `max_cost`; recorded costs stay within two hex digits.
pub const COST_LIMIT: u32 = 0x100;

/// How a candidate's cost is derived from its inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CostRule {
    /// Operator cost plus the most expensive input.
    #[default]
    Max,
    /// Operator cost plus the sum of input costs.
    Sum,
}

impl CostRule {
    pub fn combine(self, op_cost: u32, inputs: &[u32]) -> u32 {
        let base = match self {
            CostRule::Max => inputs.iter().copied().max().unwrap_or(0),
            CostRule::Sum => inputs.iter().sum(),
        };
        op_cost + base
    }

    pub const fn name(self) -> &'static str {
        match self {
            CostRule::Max => "max",
            CostRule::Sum => "sum",
        }
    }
}

/// A binary operator with a precondition per operand.
#[derive(Clone, Copy)]
pub struct BinaryStep {
    pub op: Op,
    pub lhs: fn(Shape) -> bool,
    pub rhs: fn(Shape) -> bool,
}

impl fmt::Debug for BinaryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryStep").field("op", &self.op).finish()
    }
}

fn any_shape(_: Shape) -> bool {
    true
}

fn flat_top(shape: Shape) -> bool {
    shape.is_one_layer() && !shape.has_crystal()
}

/// Operators the solver applies to every drained shape.
#[derive(Clone, Debug)]
pub struct OpSet {
    pub unary: Vec<Op>,
    pub binary: Vec<BinaryStep>,
}

impl OpSet {
    const UNARY: [Op; 7] = [
        Op::RotateRight,
        Op::Rotate180,
        Op::RotateLeft,
        Op::CutRight,
        Op::CutLeft,
        Op::PinPush,
        Op::Crystal,
    ];

    /// Unary set plus fast swap (left half × right half) and stacking with a
    /// flat, crystal-free top.
    pub fn search() -> Self {
        Self {
            unary: Self::UNARY.to_vec(),
            binary: vec![
                BinaryStep {
                    op: Op::FastSwap,
                    lhs: Shape::is_left_half,
                    rhs: Shape::is_right_half,
                },
                BinaryStep {
                    op: Op::Stack,
                    lhs: flat_top,
                    rhs: any_shape,
                },
            ],
        }
    }

    /// Unary set plus unguarded full swaps and stacking.
    pub fn full() -> Self {
        let step = |op| BinaryStep {
            op,
            lhs: any_shape,
            rhs: any_shape,
        };
        Self {
            unary: Self::UNARY.to_vec(),
            binary: vec![step(Op::SwapLeft), step(Op::SwapRight), step(Op::Stack)],
        }
    }
}

impl Default for OpSet {
    fn default() -> Self {
        Self::search()
    }
}

/// Solver configuration.
#[derive(Clone, Debug)]
pub struct SolverCfg {
    /// Cost levels to visit before stopping.
    pub max_iters: u32,
    /// Results with more layers are discarded.
    pub max_layers: u32,
    /// Shapes drained from a bucket per batch.
    pub batch_size: usize,
    /// Exclusive upper bound on bucket indices.
    pub max_cost: u32,
    pub cost_rule: CostRule,
    pub ops: OpSet,
}

impl Default for SolverCfg {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            max_layers: 3,
            batch_size: 1_000_000,
            max_cost: COST_LIMIT,
            cost_rule: CostRule::Max,
            ops: OpSet::search(),
        }
    }
}

impl SolverCfg {
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let bad = |reason: &str| Err(InvariantViolation::Config(reason.to_string()));
        if self.batch_size == 0 {
            return bad("batch_size must be positive");
        }
        if !(1..=4).contains(&self.max_layers) {
            return bad("max_layers must be within 1..=4");
        }
        if self.max_cost <= SEED_COST {
            return bad("max_cost must exceed the seed cost");
        }
        if self.max_cost > COST_LIMIT {
            return bad("max_cost must not exceed 0x100");
        }
        if self.ops.unary.iter().any(|op| op.arity() != 1 || *op == Op::Nop)
            || self.ops.binary.iter().any(|s| s.op.arity() != 2)
        {
            return bad("operator set mixes arities");
        }
        Ok(())
    }
}

/// Cheapest known construction of a shape.
///
/// Seeds use `Op::Nop` with `input1` set to the shape itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Build {
    pub cost: u32,
    pub op: Op,
    pub input1: Shape,
    pub input2: Option<Shape>,
}

impl Build {
    pub fn seed(shape: Shape, cost: u32) -> Self {
        Self {
            cost,
            op: Op::Nop,
            input1: shape,
            input2: None,
        }
    }

    pub fn is_seed(&self) -> bool {
        self.op == Op::Nop
    }

    /// Inputs that have their own records (none for seeds).
    pub fn inputs(&self) -> impl Iterator<Item = Shape> {
        let first = (!self.is_seed()).then_some(self.input1);
        first.into_iter().chain(self.input2)
    }
}

/// A logic defect detected in the ledger or the solver state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    Config(String),
    /// A record refers to an input without a record.
    MissingInput { shape: Shape, input: Shape },
    /// An input costs more than its consumer allows.
    CostInversion {
        shape: Shape,
        input: Shape,
        cost: u32,
        input_cost: u32,
    },
    /// Re-applying the recorded operator does not reproduce the shape, or the
    /// recorded cost differs from the recomputed one.
    ReplayMismatch {
        shape: Shape,
        op: Op,
        got: Shape,
        cost: u32,
        expected_cost: u32,
    },
    /// A shape was drained a second time.
    DrainedTwice { shape: Shape, cost: u32 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(reason) => write!(f, "invalid solver config: {reason}"),
            Self::MissingInput { shape, input } => {
                write!(f, "record {shape:08x} uses {input:08x}, which has no record")
            }
            Self::CostInversion {
                shape,
                input,
                cost,
                input_cost,
            } => write!(
                f,
                "record {shape:08x} (cost {cost}) uses {input:08x} with cost {input_cost}"
            ),
            Self::ReplayMismatch {
                shape,
                op,
                got,
                cost,
                expected_cost,
            } => write!(
                f,
                "record {shape:08x} via {op} replays to {got:08x} at cost {expected_cost} (recorded {cost})"
            ),
            Self::DrainedTwice { shape, cost } => {
                write!(f, "shape {shape:08x} drained twice (cost {cost})")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// What a `Solver::run` call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub total_cost: u64,
    pub max_cost: u32,
    pub levels: u32,
    pub batches: u64,
    pub inserted: u64,
    pub improved: u64,
    /// Candidates dropped for reaching `max_cost`.
    pub over_cost: u64,
    pub interrupted: bool,
    pub stats: Vec<(&'static str, u64)>,
}

impl RunSummary {
    pub(crate) fn with_stats(mut self, stats: &OpStats) -> Self {
        self.stats = stats.snapshot();
        self
    }
}
