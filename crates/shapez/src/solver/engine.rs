//! Cost-layered frontier search.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;

use super::frontier::Frontier;
use super::ledger::{Ledger, Offer};
use super::types::{BinaryStep, Build, InvariantViolation, RunSummary, SolverCfg, SEED_COST};
use crate::ops::{Op, OpStats};
use crate::shape::Shape;

/// Drained shapes usable as each side of one binary step, with their costs.
#[derive(Debug, Default)]
struct Pools {
    lhs: Vec<(Shape, u32)>,
    rhs: Vec<(Shape, u32)>,
}

/// Frontier search over shapes.
///
/// Buckets are drained in cost order, each in batches of `batch_size`
/// ascending shapes. Binary steps pair the batch with itself and with every
/// previously drained shape in both operand positions.
#[derive(Debug)]
pub struct Solver {
    cfg: SolverCfg,
    ledger: Ledger,
    frontier: Frontier,
    pools: Vec<Pools>,
    drained: HashSet<Shape>,
    stats: OpStats,
    epoch: u64,
    over_cost: AtomicU64,
}

impl Solver {
    /// Seed every shape in `seeds` with a `Nop` record at `SEED_COST`.
    pub fn new(cfg: SolverCfg, seeds: &[Shape]) -> Result<Self, InvariantViolation> {
        let mut solver = Self::empty(cfg)?;
        for &seed in seeds {
            if seed.is_empty() {
                return Err(InvariantViolation::Config("empty seed shape".into()));
            }
            solver.ledger.offer(seed, Build::seed(seed, SEED_COST), 0);
            solver.frontier.schedule(seed, SEED_COST);
        }
        Ok(solver)
    }

    /// Resume from persisted records; every shape is re-queued at its cost.
    pub fn from_records<I>(cfg: SolverCfg, records: I) -> Result<Self, InvariantViolation>
    where
        I: IntoIterator<Item = (Shape, Build)>,
    {
        let mut solver = Self::empty(cfg)?;
        for (shape, build) in records {
            if !solver.frontier.schedule(shape, build.cost) {
                return Err(InvariantViolation::Config(format!(
                    "record {shape:08x} has cost {} beyond max_cost {}",
                    build.cost, solver.cfg.max_cost
                )));
            }
            solver.ledger.offer(shape, build, 0);
        }
        tracing::info!(records = solver.ledger.len(), "solver_resumed");
        Ok(solver)
    }

    fn empty(cfg: SolverCfg) -> Result<Self, InvariantViolation> {
        cfg.validate()?;
        let pools = cfg.ops.binary.iter().map(|_| Pools::default()).collect();
        Ok(Self {
            frontier: Frontier::new(cfg.max_cost),
            cfg,
            ledger: Ledger::new(),
            pools,
            drained: HashSet::new(),
            stats: OpStats::new(),
            epoch: 0,
            over_cost: AtomicU64::new(0),
        })
    }

    pub fn cfg(&self) -> &SolverCfg {
        &self.cfg
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    pub fn stats(&self) -> &OpStats {
        &self.stats
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Drain buckets until the frontier is empty, `max_cost` or `max_iters`
    /// is reached, or `stop` is observed between batches.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<RunSummary, InvariantViolation> {
        self.run_until(|_| stop.load(Ordering::Relaxed))
    }

    /// Like [`Solver::run`], but asks `should_stop` with this run's progress
    /// before each batch. A stopped solver can be run again and continues
    /// where it left off.
    pub fn run_until<F>(&mut self, mut should_stop: F) -> Result<RunSummary, InvariantViolation>
    where
        F: FnMut(&RunSummary) -> bool,
    {
        let mut summary = RunSummary::default();
        let Some(mut cost) = self.frontier.lowest() else {
            return Ok(self.finish(summary));
        };
        while cost < self.cfg.max_cost && summary.levels < self.cfg.max_iters {
            if self.frontier.is_empty() {
                break;
            }
            summary.levels += 1;
            let pending = self.frontier.pending(cost);
            if pending > 0 {
                tracing::info!(cost, pending, records = self.ledger.len(), "solver_level");
                tracing::debug!(buckets = ?self.frontier.summary(), "frontier");
            }
            while self.frontier.pending(cost) > 0 {
                if should_stop(&summary) {
                    tracing::warn!(cost, "solver_interrupted");
                    summary.interrupted = true;
                    return Ok(self.finish(summary));
                }
                let batch = self.frontier.take_batch(cost, self.cfg.batch_size);
                self.process_batch(cost, batch, &mut summary)?;
            }
            cost += 1;
        }
        Ok(self.finish(summary))
    }

    fn process_batch(
        &mut self,
        cost: u32,
        batch: Vec<Shape>,
        summary: &mut RunSummary,
    ) -> Result<(), InvariantViolation> {
        for &shape in &batch {
            if !self.drained.insert(shape) {
                return Err(InvariantViolation::DrainedTwice { shape, cost });
            }
        }
        self.epoch += 1;
        summary.batches += 1;
        let before = self.ledger.len();
        let dropped_before = self.over_cost.load(Ordering::Relaxed);

        let mut touched = self.expand_unary(&batch, cost);
        for (step, pools) in self.cfg.ops.binary.iter().zip(&self.pools) {
            touched.extend(self.expand_binary(step, pools, &batch, cost));
        }
        touched.par_sort_unstable();
        touched.dedup();

        let inserted = (self.ledger.len() - before) as u64;
        let improved = touched.len() as u64 - inserted;
        for &shape in &touched {
            if let Some(new_cost) = self.ledger.cost(shape) {
                self.frontier.schedule(shape, new_cost);
            }
        }
        for (step, pools) in self.cfg.ops.binary.iter().zip(self.pools.iter_mut()) {
            pools
                .lhs
                .extend(batch.iter().filter(|&&s| (step.lhs)(s)).map(|&s| (s, cost)));
            pools
                .rhs
                .extend(batch.iter().filter(|&&s| (step.rhs)(s)).map(|&s| (s, cost)));
        }

        summary.inserted += inserted;
        summary.improved += improved;
        tracing::info!(
            cost,
            batch = batch.len(),
            inserted,
            improved,
            records = self.ledger.len(),
            "solver_batch"
        );
        let dropped = self.over_cost.load(Ordering::Relaxed) - dropped_before;
        if dropped > 0 {
            tracing::warn!(cost, dropped, max_cost = self.cfg.max_cost, "over_cost_dropped");
        }
        Ok(())
    }

    fn expand_unary(&self, batch: &[Shape], cost: u32) -> Vec<Shape> {
        let unary = &self.cfg.ops.unary;
        batch
            .par_iter()
            .flat_map_iter(|&shape| {
                // Arities are checked by `SolverCfg::validate`.
                unary.iter().filter_map(move |&op| {
                    let result = op.invoke(&[shape], &self.stats).ok()?;
                    self.consider(op, result, shape, None, &[cost])
                })
            })
            .collect()
    }

    fn expand_binary(
        &self,
        step: &BinaryStep,
        pools: &Pools,
        batch: &[Shape],
        cost: u32,
    ) -> Vec<Shape> {
        let select = |pre: fn(Shape) -> bool| -> Vec<(Shape, u32)> {
            batch
                .iter()
                .filter(|&&s| pre(s))
                .map(|&s| (s, cost))
                .collect()
        };
        let (lhs_new, rhs_new) = (select(step.lhs), select(step.rhs));
        let op = step.op;

        let fresh_lhs = lhs_new.par_iter().flat_map_iter(|&a| {
            rhs_new
                .iter()
                .chain(&pools.rhs)
                .filter_map(move |&b| self.combine(op, a, b))
        });
        let old_lhs = pools.lhs.par_iter().flat_map_iter(|&a| {
            rhs_new
                .iter()
                .filter_map(move |&b| self.combine(op, a, b))
        });
        fresh_lhs.chain(old_lhs).collect()
    }

    fn combine(&self, op: Op, (a, ca): (Shape, u32), (b, cb): (Shape, u32)) -> Option<Shape> {
        let result = op.invoke(&[a, b], &self.stats).ok()?;
        self.consider(op, result, a, Some(b), &[ca, cb])
    }

    /// Filter a raw result and offer it to the ledger. Returns the shape when
    /// its record changed.
    fn consider(
        &self,
        op: Op,
        result: Shape,
        input1: Shape,
        input2: Option<Shape>,
        input_costs: &[u32],
    ) -> Option<Shape> {
        if result.is_empty()
            || result == input1
            || Some(result) == input2
            || result.layer_count() > self.cfg.max_layers
        {
            return None;
        }
        let cost = self.cfg.cost_rule.combine(op.cost(), input_costs);
        if cost >= self.cfg.max_cost {
            self.over_cost.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let build = Build {
            cost,
            op,
            input1,
            input2,
        };
        match self.ledger.offer(result, build, self.epoch) {
            Offer::Rejected => None,
            Offer::Inserted | Offer::Improved { .. } => Some(result),
        }
    }

    fn finish(&self, mut summary: RunSummary) -> RunSummary {
        let records = self.ledger.records();
        summary.records = records.len();
        summary.total_cost = records.iter().map(|(_, b)| u64::from(b.cost)).sum();
        summary.max_cost = records.iter().map(|(_, b)| b.cost).max().unwrap_or(0);
        summary.over_cost = self.over_cost.load(Ordering::Relaxed);
        tracing::info!(
            records = summary.records,
            total_cost = summary.total_cost,
            levels = summary.levels,
            batches = summary.batches,
            interrupted = summary.interrupted,
            stats = %self.stats,
            "solver_done"
        );
        summary.with_stats(&self.stats)
    }
}
