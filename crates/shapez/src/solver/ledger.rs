//! Build ledger: shape → cheapest known build, improved monotonically.
//!
//! Each shape's read-compare-write runs under its `DashMap` shard lock via
//! the entry API, so concurrent offers never lose an improvement. Offers are
//! ordered by `(cost, epoch, op rank, input1, input2)`; the smallest wins,
//! which makes the final state independent of worker interleaving.

use std::collections::BTreeMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rayon::prelude::*;

use super::types::{Build, CostRule, InvariantViolation};
use crate::shape::Shape;

#[derive(Clone, Copy, Debug)]
struct Slot {
    build: Build,
    epoch: u64,
}

impl Slot {
    fn order(&self) -> (u32, u64, u8, Shape, Option<Shape>) {
        (
            self.build.cost,
            self.epoch,
            self.build.op.rank(),
            self.build.input1,
            self.build.input2,
        )
    }
}

/// Outcome of `Ledger::offer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    Inserted,
    Improved { old_cost: u32 },
    Rejected,
}

#[derive(Debug, Default)]
pub struct Ledger {
    map: DashMap<Shape, Slot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `build` for `shape` if it beats the current entry.
    ///
    /// A strictly cheaper build always wins. At equal cost, an entry from an
    /// earlier epoch is kept; within one epoch the lower operator rank and
    /// inputs win.
    pub fn offer(&self, shape: Shape, build: Build, epoch: u64) -> Offer {
        let slot = Slot { build, epoch };
        match self.map.entry(shape) {
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Offer::Inserted
            }
            Entry::Occupied(mut occupied) => {
                let current = *occupied.get();
                if slot.order() < current.order() {
                    occupied.insert(slot);
                    Offer::Improved {
                        old_cost: current.build.cost,
                    }
                } else {
                    Offer::Rejected
                }
            }
        }
    }

    pub fn get(&self, shape: Shape) -> Option<Build> {
        self.map.get(&shape).map(|slot| slot.build)
    }

    pub fn cost(&self, shape: Shape) -> Option<u32> {
        self.map.get(&shape).map(|slot| slot.build.cost)
    }

    pub fn contains(&self, shape: Shape) -> bool {
        self.map.contains_key(&shape)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All records in ascending shape order.
    pub fn records(&self) -> Vec<(Shape, Build)> {
        let mut out: Vec<(Shape, Build)> = self
            .map
            .iter()
            .map(|entry| (*entry.key(), entry.value().build))
            .collect();
        out.par_sort_unstable_by_key(|&(shape, _)| shape);
        out
    }

    pub fn snapshot(&self) -> BTreeMap<Shape, Build> {
        self.map
            .iter()
            .map(|entry| (*entry.key(), entry.value().build))
            .collect()
    }

    /// Check every record against its inputs: inputs exist, are cheap enough,
    /// and replaying the operator reproduces the shape at the recorded cost.
    ///
    /// Reports the violation with the smallest shape.
    pub fn verify(&self, rule: CostRule) -> Result<(), InvariantViolation> {
        let records = self.records();
        match records
            .par_iter()
            .find_map_first(|&(shape, build)| self.check(shape, build, rule).err())
        {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    fn check(&self, shape: Shape, build: Build, rule: CostRule) -> Result<(), InvariantViolation> {
        if build.is_seed() {
            return Ok(());
        }
        let mut input_costs = Vec::with_capacity(2);
        for input in build.inputs() {
            let input_cost = self
                .cost(input)
                .ok_or(InvariantViolation::MissingInput { shape, input })?;
            if input_cost + build.op.cost() > build.cost {
                return Err(InvariantViolation::CostInversion {
                    shape,
                    input,
                    cost: build.cost,
                    input_cost,
                });
            }
            input_costs.push(input_cost);
        }
        let got = match build.input2 {
            Some(input2) => build.op.apply2(build.input1, input2),
            None => build.op.apply1(build.input1),
        };
        let expected_cost = rule.combine(build.op.cost(), &input_costs);
        if got != shape || expected_cost != build.cost {
            return Err(InvariantViolation::ReplayMismatch {
                shape,
                op: build.op,
                got,
                cost: build.cost,
                expected_cost,
            });
        }
        Ok(())
    }
}

impl FromIterator<(Shape, Build)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (Shape, Build)>>(iter: I) -> Self {
        let ledger = Ledger::new();
        for (shape, build) in iter {
            ledger.offer(shape, build, 0);
        }
        ledger
    }
}
