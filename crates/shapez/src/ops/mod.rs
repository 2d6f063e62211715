//! Operator library: the transition function of the shape search.
//!
//! Purpose
//! - A closed set of unary and binary operators, each a pure total function
//!   over packed shapes with a fixed integer cost.
//! - `Op` is the dispatch surface: code, cost, arity, and an arity-checked
//!   `invoke` that also records per-kind counts into an explicit `OpStats`.
//!
//! Why this design
//! - The physics lives in free functions (`physics`) so the solver and tests
//!   can call them directly without a statistics context.
//! - Counters are owned by the caller; there is no process-wide state.
//!
//! References
//! - Code cross-refs: `crate::shape::Shape`, `crate::solver::OpSet`.

mod physics;

pub use physics::{
    crystallize, crystallize_one, cut_left, cut_right, fast_stack, fast_swap, pin_push, stack,
    swap_left, swap_right,
};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::shape::Shape;

/// Rotate one step to the right.
#[inline]
pub fn rotate_right(shape: Shape) -> Shape {
    shape.rotated(1)
}

#[inline]
pub fn rotate_180(shape: Shape) -> Shape {
    shape.rotated(2)
}

#[inline]
pub fn rotate_left(shape: Shape) -> Shape {
    shape.rotated(3)
}

/// Operator kinds. Declaration order is the tie-break rank used by the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    /// Seed marker; identity.
    Nop,
    RotateRight,
    Rotate180,
    RotateLeft,
    CutRight,
    CutLeft,
    PinPush,
    Crystal,
    SwapRight,
    SwapLeft,
    /// Merge a left half with a right half (no cut).
    FastSwap,
    Stack,
    /// Stack with a one-layer, crystal-free top.
    FastStack,
}

impl Op {
    pub const ALL: [Op; 13] = [
        Op::Nop,
        Op::RotateRight,
        Op::Rotate180,
        Op::RotateLeft,
        Op::CutRight,
        Op::CutLeft,
        Op::PinPush,
        Op::Crystal,
        Op::SwapRight,
        Op::SwapLeft,
        Op::FastSwap,
        Op::Stack,
        Op::FastStack,
    ];

    /// Two-character code used in ledger files.
    pub const fn code(self) -> &'static str {
        match self {
            Op::Nop => "--",
            Op::RotateRight => "RR",
            Op::Rotate180 => "RU",
            Op::RotateLeft => "RL",
            Op::CutRight => "CR",
            Op::CutLeft => "CL",
            Op::PinPush => "PP",
            Op::Crystal => "XX",
            Op::SwapRight => "SR",
            Op::SwapLeft => "SL",
            Op::FastSwap => "SW",
            Op::Stack => "ST",
            Op::FastStack => "FS",
        }
    }

    pub fn from_code(code: &str) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.code() == code)
    }

    pub const fn cost(self) -> u32 {
        match self {
            Op::Nop => 0,
            Op::Crystal => 2,
            Op::Stack | Op::FastStack => 3,
            _ => 1,
        }
    }

    pub const fn arity(self) -> usize {
        match self {
            Op::SwapRight | Op::SwapLeft | Op::FastSwap | Op::Stack | Op::FastStack => 2,
            _ => 1,
        }
    }

    #[inline]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Apply a unary operator. Binary operators yield `Shape::EMPTY`.
    pub fn apply1(self, shape: Shape) -> Shape {
        match self {
            Op::Nop => shape,
            Op::RotateRight => rotate_right(shape),
            Op::Rotate180 => rotate_180(shape),
            Op::RotateLeft => rotate_left(shape),
            Op::CutRight => cut_right(shape),
            Op::CutLeft => cut_left(shape),
            Op::PinPush => pin_push(shape),
            Op::Crystal => crystallize(shape),
            _ => Shape::EMPTY,
        }
    }

    /// Apply a binary operator. Unary operators yield `Shape::EMPTY`.
    pub fn apply2(self, a: Shape, b: Shape) -> Shape {
        match self {
            Op::SwapRight => swap_right(a, b),
            Op::SwapLeft => swap_left(a, b),
            Op::FastSwap => fast_swap(a, b),
            Op::Stack => stack(a, b),
            Op::FastStack => fast_stack(a, b),
            _ => Shape::EMPTY,
        }
    }

    /// Arity-checked application that records the work into `stats`.
    pub fn invoke(self, inputs: &[Shape], stats: &OpStats) -> Result<Shape, ArityError> {
        if inputs.len() != self.arity() {
            return Err(ArityError {
                op: self,
                expected: self.arity(),
                got: inputs.len(),
            });
        }
        stats.record(self);
        Ok(match *inputs {
            [a] => self.apply1(a),
            [a, b] => self.apply2(a, b),
            _ => Shape::EMPTY,
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Operator called with the wrong number of inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArityError {
    pub op: Op,
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for ArityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operator {} takes {} input(s), got {}",
            self.op, self.expected, self.got
        )
    }
}

impl std::error::Error for ArityError {}

/// Counted kinds of operator work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Cut,
    Swap,
    Stack,
    Rotate,
    PinPush,
    Crystal,
    Collapse,
}

impl OpKind {
    pub const ALL: [OpKind; 7] = [
        OpKind::Cut,
        OpKind::Swap,
        OpKind::Stack,
        OpKind::Rotate,
        OpKind::PinPush,
        OpKind::Crystal,
        OpKind::Collapse,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            OpKind::Cut => "cut",
            OpKind::Swap => "swap",
            OpKind::Stack => "stack",
            OpKind::Rotate => "rotate",
            OpKind::PinPush => "pinpush",
            OpKind::Crystal => "crystal",
            OpKind::Collapse => "collapse",
        }
    }
}

/// Diagnostic operation counters, safe to share across worker threads.
#[derive(Debug, Default)]
pub struct OpStats {
    counts: [AtomicU64; 7],
}

impl OpStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&self, kind: OpKind, n: u64) {
        self.counts[kind as usize].fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self, kind: OpKind) -> u64 {
        self.counts[kind as usize].load(Ordering::Relaxed)
    }

    /// Count one application of `op`, including the collapses it performs.
    pub fn record(&self, op: Op) {
        match op {
            Op::Nop => {}
            Op::RotateRight | Op::Rotate180 | Op::RotateLeft => self.add(OpKind::Rotate, 1),
            Op::CutRight | Op::CutLeft => {
                self.add(OpKind::Cut, 1);
                self.add(OpKind::Collapse, 1);
            }
            Op::PinPush => {
                self.add(OpKind::PinPush, 1);
                self.add(OpKind::Collapse, 1);
            }
            Op::Crystal => self.add(OpKind::Crystal, 1),
            Op::SwapRight | Op::SwapLeft => {
                self.add(OpKind::Swap, 1);
                self.add(OpKind::Cut, 2);
                self.add(OpKind::Collapse, 2);
            }
            Op::FastSwap => self.add(OpKind::Swap, 1),
            Op::Stack | Op::FastStack => self.add(OpKind::Stack, 1),
        }
    }

    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        OpKind::ALL
            .iter()
            .map(|&kind| (kind.name(), self.get(kind)))
            .collect()
    }

    pub fn clear(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}

impl fmt::Display for OpStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.snapshot().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}
