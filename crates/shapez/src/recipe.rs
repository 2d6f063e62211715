//! Construction trees: expand a shape's build record down to the seeds.

use std::fmt;

use crate::shape::Shape;
use crate::solver::Build;
use crate::store::{BuildSource, StoreError};

/// One node of a construction tree in pre-order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecipeStep {
    pub depth: usize,
    pub shape: Shape,
    /// `None` when the source has no record for the shape.
    pub build: Option<Build>,
}

/// Expand `shape` depth-first: each step is followed by the tree of its first
/// input, then of its second. Expansion stops at seeds, at shapes without a
/// record, and at records that are not cheaper than their consumer (which
/// cannot happen in a verified ledger).
pub fn trace<S: BuildSource + ?Sized>(
    source: &mut S,
    shape: Shape,
) -> Result<Vec<RecipeStep>, StoreError> {
    let mut steps = Vec::new();
    let mut todo = vec![(0usize, shape, u32::MAX)];
    while let Some((depth, shape, bound)) = todo.pop() {
        let build = source.build_of(shape)?;
        steps.push(RecipeStep {
            depth,
            shape,
            build,
        });
        let Some(build) = build else { continue };
        if build.is_seed() || build.cost >= bound {
            continue;
        }
        if let Some(input2) = build.input2 {
            todo.push((depth + 1, input2, build.cost));
        }
        todo.push((depth + 1, build.input1, build.cost));
    }
    Ok(steps)
}

impl fmt::Display for RecipeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:indent$}{:08x} <- ", "", self.shape, indent = 2 * self.depth)?;
        match self.build {
            None => f.write_str("?"),
            Some(b) if b.is_seed() => write!(f, "seed [{}]", b.cost),
            Some(b) => match b.input2 {
                Some(input2) => write!(f, "{}({:08x},{:08x}) [{}]", b.op, b.input1, input2, b.cost),
                None => write!(f, "{}({:08x}) [{}]", b.op, b.input1, b.cost),
            },
        }
    }
}

/// Indented text form, one step per line, e.g. `  00000003 <- RR(00000009) [3]`.
pub fn render(steps: &[RecipeStep]) -> String {
    steps.iter().map(|step| format!("{step}\n")).collect()
}
