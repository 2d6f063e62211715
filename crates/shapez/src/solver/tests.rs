use super::*;
use crate::ops::Op;
use std::sync::atomic::AtomicBool;

fn flat_cfg() -> SolverCfg {
    SolverCfg {
        max_layers: 1,
        ..SolverCfg::default()
    }
}

fn build(cost: u32, op: Op, input1: u32, input2: Option<u32>) -> Build {
    Build {
        cost,
        op,
        input1: Shape(input1),
        input2: input2.map(Shape),
    }
}

#[test]
fn cost_rules() {
    assert_eq!(CostRule::Max.combine(3, &[2, 5]), 8);
    assert_eq!(CostRule::Sum.combine(3, &[2, 5]), 10);
    assert_eq!(CostRule::Max.combine(1, &[4]), 5);
    assert_eq!(CostRule::default(), CostRule::Max);
}

#[test]
fn config_validation() {
    assert!(SolverCfg::default().validate().is_ok());
    let bad = [
        SolverCfg {
            batch_size: 0,
            ..SolverCfg::default()
        },
        SolverCfg {
            max_layers: 5,
            ..SolverCfg::default()
        },
        SolverCfg {
            max_cost: SEED_COST,
            ..SolverCfg::default()
        },
        SolverCfg {
            max_cost: COST_LIMIT + 1,
            ..SolverCfg::default()
        },
        SolverCfg {
            ops: OpSet {
                unary: vec![Op::Stack],
                binary: vec![],
            },
            ..SolverCfg::default()
        },
    ];
    for cfg in bad {
        assert!(matches!(cfg.validate(), Err(InvariantViolation::Config(_))));
    }
    assert!(Solver::new(flat_cfg(), &[Shape::EMPTY]).is_err());

    let huge = SolverCfg {
        max_cost: u32::MAX,
        ..SolverCfg::default()
    };
    assert!(matches!(
        Solver::new(huge, &DEFAULT_SEEDS),
        Err(InvariantViolation::Config(_))
    ));
    let widest = SolverCfg {
        max_cost: COST_LIMIT,
        ..SolverCfg::default()
    };
    assert!(widest.validate().is_ok());
    assert_eq!(SolverCfg::default().max_cost, COST_LIMIT);
}

#[test]
fn op_sets() {
    let search = OpSet::search();
    assert_eq!(search.unary.len(), 7);
    let binary: Vec<Op> = search.binary.iter().map(|s| s.op).collect();
    assert_eq!(binary, [Op::FastSwap, Op::Stack]);
    let swap = search.binary[0];
    assert!((swap.lhs)(Shape(0xc)) && !(swap.lhs)(Shape(0x3)));
    assert!((swap.rhs)(Shape(0x3)) && !(swap.rhs)(Shape(0xc)));
    let stack = search.binary[1];
    assert!((stack.lhs)(Shape(0x5)));
    assert!(!(stack.lhs)(Shape(0x11)));
    assert!(!(stack.lhs)(Shape(0x0001_0001)));

    let full: Vec<Op> = OpSet::full().binary.iter().map(|s| s.op).collect();
    assert_eq!(full, [Op::SwapLeft, Op::SwapRight, Op::Stack]);
}

#[test]
fn ledger_keeps_strictly_cheaper_and_earlier_records() {
    let ledger = Ledger::new();
    let s = Shape(0x3);
    assert_eq!(ledger.offer(s, build(4, Op::Stack, 1, Some(2)), 1), Offer::Inserted);
    assert_eq!(
        ledger.offer(s, build(3, Op::CutRight, 0xf, None), 2),
        Offer::Improved { old_cost: 4 }
    );
    // Equal cost from a later batch never displaces.
    assert_eq!(
        ledger.offer(s, build(3, Op::RotateRight, 0x9, None), 3),
        Offer::Rejected
    );
    assert_eq!(ledger.offer(s, build(5, Op::Nop, 3, None), 4), Offer::Rejected);
    assert_eq!(ledger.get(s), Some(build(3, Op::CutRight, 0xf, None)));
    assert_eq!(ledger.cost(s), Some(3));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn ledger_ties_within_a_batch_go_to_the_lowest_rank_then_inputs() {
    let ledger = Ledger::new();
    let s = Shape(0xf);
    ledger.offer(s, build(4, Op::Stack, 0x5, Some(0xa)), 7);
    ledger.offer(s, build(4, Op::FastSwap, 0xc, Some(0x3)), 7);
    ledger.offer(s, build(4, Op::FastSwap, 0xc, Some(0x7)), 7);
    assert_eq!(ledger.get(s), Some(build(4, Op::FastSwap, 0xc, Some(0x3))));
}

#[test]
fn ledger_verify_detects_defects() {
    let good: Ledger = [
        (Shape(0xf), Build::seed(Shape(0xf), 1)),
        (Shape(0x3), build(2, Op::CutRight, 0xf, None)),
    ]
    .into_iter()
    .collect();
    assert_eq!(good.verify(CostRule::Max), Ok(()));
    assert_eq!(good.snapshot().len(), 2);

    let missing: Ledger = [(Shape(0x3), build(2, Op::CutRight, 0xf, None))]
        .into_iter()
        .collect();
    assert_eq!(
        missing.verify(CostRule::Max),
        Err(InvariantViolation::MissingInput {
            shape: Shape(0x3),
            input: Shape(0xf)
        })
    );

    let inverted: Ledger = [
        (Shape(0xf), Build::seed(Shape(0xf), 5)),
        (Shape(0x3), build(2, Op::CutRight, 0xf, None)),
    ]
    .into_iter()
    .collect();
    assert!(matches!(
        inverted.verify(CostRule::Max),
        Err(InvariantViolation::CostInversion { .. })
    ));

    let wrong_op: Ledger = [
        (Shape(0xf), Build::seed(Shape(0xf), 1)),
        (Shape(0x3), build(2, Op::CutLeft, 0xf, None)),
    ]
    .into_iter()
    .collect();
    assert!(matches!(
        wrong_op.verify(CostRule::Max),
        Err(InvariantViolation::ReplayMismatch { got: Shape(0xc), .. })
    ));

    let overpriced: Ledger = [
        (Shape(0xf), Build::seed(Shape(0xf), 1)),
        (Shape(0x3), build(3, Op::CutRight, 0xf, None)),
    ]
    .into_iter()
    .collect();
    assert!(matches!(
        overpriced.verify(CostRule::Max),
        Err(InvariantViolation::ReplayMismatch {
            cost: 3,
            expected_cost: 2,
            ..
        })
    ));
}

#[test]
fn frontier_moves_and_batches() {
    let mut f = Frontier::new(10);
    assert!(f.schedule(Shape(5), 4));
    assert!(f.schedule(Shape(3), 4));
    assert!(f.schedule(Shape(9), 6));
    assert!(!f.schedule(Shape(1), 10));
    assert_eq!(f.lowest(), Some(4));

    // Moving a shape leaves its old bucket.
    assert!(f.schedule(Shape(9), 4));
    assert_eq!(f.pending(6), 0);
    assert_eq!(f.bucket_of(Shape(9)), Some(4));
    assert_eq!(f.summary(), vec![(4, 3)]);

    assert_eq!(f.take_batch(4, 2), vec![Shape(3), Shape(5)]);
    assert_eq!(f.take_batch(4, 2), vec![Shape(9)]);
    assert!(f.take_batch(4, 2).is_empty());
    assert!(f.take_batch(99, 2).is_empty());
    assert!(f.is_empty());
    assert_eq!(f.lowest(), None);
}

#[test]
fn one_layer_run_reaches_every_flat_shape() {
    let seeds = [Shape(0x1), Shape(0x2), Shape(0x4), Shape(0x8), Shape(0x000f_0000)];
    let mut solver = Solver::new(flat_cfg(), &seeds).expect("config");
    let summary = solver.run(&AtomicBool::new(false)).expect("run");

    assert_eq!(summary.records, 255);
    assert_eq!(summary.total_cost, 1612);
    assert_eq!(summary.max_cost, 9);
    assert!(!summary.interrupted);
    assert_eq!(summary.inserted as usize + seeds.len(), summary.records);

    let ledger = solver.ledger();
    assert_eq!(ledger.get(Shape(0xf)), Some(build(4, Op::FastSwap, 0xc, Some(0x3))));
    assert_eq!(ledger.get(Shape(0x5)), Some(build(2, Op::FastSwap, 0x4, Some(0x1))));
    assert_eq!(ledger.get(Shape(0x3)), Some(build(3, Op::RotateRight, 0x9, None)));
    assert_eq!(ledger.get(Shape(0x000f_000f)), Some(build(3, Op::Crystal, 0x000f_0000, None)));
    assert_eq!(ledger.verify(CostRule::Max), Ok(()));
    assert!(solver.frontier().is_empty());
    assert!(solver.stats().get(crate::ops::OpKind::Swap) > 0);
}

#[test]
fn cost_rule_and_op_set_change_the_records() {
    let seeds = [Shape(0x1), Shape(0x2), Shape(0x4), Shape(0x8), Shape(0x000f_0000)];

    let mut sum = Solver::new(
        SolverCfg {
            cost_rule: CostRule::Sum,
            ..flat_cfg()
        },
        &seeds,
    )
    .expect("config");
    let summary = sum.run(&AtomicBool::new(false)).expect("run");
    assert_eq!(summary.total_cost, 2573);
    assert_eq!(sum.ledger().get(Shape(0xf)), Some(build(9, Op::Stack, 0x5, Some(0xa))));
    assert_eq!(sum.ledger().verify(CostRule::Sum), Ok(()));

    let mut full = Solver::new(
        SolverCfg {
            ops: OpSet::full(),
            ..flat_cfg()
        },
        &seeds,
    )
    .expect("config");
    let summary = full.run(&AtomicBool::new(false)).expect("run");
    assert_eq!(summary.records, 255);
    assert_eq!(summary.total_cost, 1354);
    assert_eq!(full.ledger().get(Shape(0xf)), Some(build(4, Op::SwapRight, 0xc, Some(0x3))));
    assert_eq!(full.ledger().verify(CostRule::Max), Ok(()));
}

#[test]
fn max_iters_bounds_the_levels_and_resume_completes_the_run() {
    let cfg = SolverCfg {
        max_iters: 2,
        ..flat_cfg()
    };
    let mut partial = Solver::new(cfg, &DEFAULT_SEEDS).expect("config");
    let summary = partial.run(&AtomicBool::new(false)).expect("run");
    assert_eq!(summary.levels, 2);
    assert_eq!(summary.records, 15);
    assert!(!partial.frontier().is_empty());

    let mut fresh = Solver::new(flat_cfg(), &DEFAULT_SEEDS).expect("config");
    fresh.run(&AtomicBool::new(false)).expect("run");

    let mut resumed =
        Solver::from_records(flat_cfg(), partial.ledger().records()).expect("config");
    resumed.run(&AtomicBool::new(false)).expect("run");

    let costs = |l: &Ledger| -> Vec<(Shape, u32)> {
        l.records().into_iter().map(|(s, b)| (s, b.cost)).collect()
    };
    assert_eq!(costs(resumed.ledger()), costs(fresh.ledger()));
    assert_eq!(resumed.ledger().verify(CostRule::Max), Ok(()));
}

#[test]
fn resume_rejects_records_beyond_the_cost_bound() {
    let cfg = SolverCfg {
        max_cost: 4,
        ..flat_cfg()
    };
    let records = [(Shape(0x3), build(4, Op::CutRight, 0xf, None))];
    assert!(matches!(
        Solver::from_records(cfg, records),
        Err(InvariantViolation::Config(_))
    ));
}

#[test]
fn stop_signal_is_observed_before_the_first_batch() {
    let mut solver = Solver::new(flat_cfg(), &DEFAULT_SEEDS).expect("config");
    let summary = solver.run(&AtomicBool::new(true)).expect("run");
    assert!(summary.interrupted);
    assert_eq!(summary.batches, 0);
    assert_eq!(summary.records, 2);
}

#[test]
fn low_cost_bound_drops_and_counts_candidates() {
    let cfg = SolverCfg {
        max_cost: 3,
        ..flat_cfg()
    };
    let mut solver = Solver::new(cfg, &DEFAULT_SEEDS).expect("config");
    let summary = solver.run(&AtomicBool::new(false)).expect("run");
    assert!(summary.over_cost > 0);
    assert!(solver.ledger().records().iter().all(|(_, b)| b.cost < 3));
}

#[test]
fn empty_seed_set_finishes_immediately() {
    let mut solver = Solver::new(flat_cfg(), &[]).expect("config");
    let summary = solver.run(&AtomicBool::new(false)).expect("run");
    assert_eq!(summary.records, 0);
    assert_eq!(summary.levels, 0);
}
