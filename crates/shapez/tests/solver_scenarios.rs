use std::sync::atomic::AtomicBool;

use shapez::api::*;

const QUARTERS_AND_PINS: [Shape; 5] = [
    Shape(0x1),
    Shape(0x2),
    Shape(0x4),
    Shape(0x8),
    Shape(0x000f_0000),
];

fn two_layer_cfg() -> SolverCfg {
    SolverCfg {
        max_layers: 2,
        max_cost: 7,
        ..SolverCfg::default()
    }
}

fn solve(cfg: SolverCfg, seeds: &[Shape]) -> (Ledger, RunSummary) {
    let mut solver = Solver::new(cfg, seeds).expect("valid config");
    let summary = solver.run(&AtomicBool::new(false)).expect("run");
    (solver.into_ledger(), summary)
}

#[test]
fn full_layer_is_assembled_from_quarters() {
    let (ledger, summary) = solve(two_layer_cfg(), &QUARTERS_AND_PINS);
    assert_eq!(summary.records, 962);
    assert_eq!(summary.total_cost, 5243);

    let full = ledger.get(Shape(0xf)).expect("0xf reachable");
    assert!(matches!(full.op, Op::Stack | Op::FastSwap));
    assert_eq!(full.op, Op::FastSwap);
    assert_eq!(full.cost, 4);
    assert_eq!((full.input1, full.input2), (Shape(0xc), Some(Shape(0x3))));

    let tower = ledger.get(Shape(0x11)).expect("0x11 reachable");
    assert_eq!((tower.op, tower.cost), (Op::Stack, 4));
    assert_eq!(ledger.get(Shape(0x000f_00f0)).map(|b| b.op), Some(Op::PinPush));
    assert!(ledger.records().iter().all(|(s, _)| s.layer_count() <= 2));
}

#[test]
fn finished_ledger_is_consistent() {
    let (ledger, summary) = solve(two_layer_cfg(), &QUARTERS_AND_PINS);
    assert_eq!(ledger.verify(CostRule::Max), Ok(()));
    for (shape, build) in ledger.records() {
        if build.is_seed() {
            assert_eq!(build.cost, SEED_COST);
            continue;
        }
        let inputs: Vec<u32> = build
            .inputs()
            .map(|s| ledger.cost(s).expect("input recorded"))
            .collect();
        assert_eq!(
            build.cost,
            CostRule::Max.combine(build.op.cost(), &inputs),
            "{shape:08x}"
        );
    }
    assert_eq!(summary.max_cost, ledger.records().iter().map(|(_, b)| b.cost).max().unwrap());
}

#[test]
fn runs_are_reproducible_across_thread_counts() {
    let run_with = |threads: usize| {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        pool.install(|| solve(two_layer_cfg(), &QUARTERS_AND_PINS).0.records())
    };
    let single = run_with(1);
    assert_eq!(run_with(4), single);
    assert_eq!(run_with(4), single);
}

#[test]
fn batch_size_changes_ties_but_not_costs() {
    let (reference, _) = solve(two_layer_cfg(), &QUARTERS_AND_PINS);
    let (batched, summary) = solve(
        SolverCfg {
            batch_size: 3,
            ..two_layer_cfg()
        },
        &QUARTERS_AND_PINS,
    );
    assert!(summary.batches > 10);
    let costs = |l: &Ledger| -> Vec<(Shape, u32)> {
        l.records().into_iter().map(|(s, b)| (s, b.cost)).collect()
    };
    assert_eq!(costs(&batched), costs(&reference));
    assert_eq!(batched.verify(CostRule::Max), Ok(()));
}

#[test]
fn persisted_ledger_traces_back_to_seeds() {
    let (ledger, _) = solve(two_layer_cfg(), &QUARTERS_AND_PINS);
    let dir = tempfile::tempdir().unwrap();
    let db_dir = dir.path().join("db");
    write_sharded(&db_dir, &ledger).unwrap();
    write_shapes(dir.path().join("shapes.txt"), ledger.records().into_iter().map(|(s, _)| s))
        .unwrap();

    assert_eq!(read_ledger(&db_dir).unwrap(), ledger.snapshot());
    assert_eq!(read_shapes(dir.path().join("shapes.txt")).unwrap().len(), 962);

    let mut db = ShardedDb::open(&db_dir).unwrap();
    let steps = trace_recipe(&mut db, Shape(0x11)).unwrap();
    assert_eq!(steps[0].shape, Shape(0x11));
    let leaves: Vec<&RecipeStep> = steps
        .iter()
        .filter(|s| s.build.map_or(true, |b| b.is_seed()))
        .collect();
    assert!(!leaves.is_empty());
    assert!(leaves
        .iter()
        .all(|s| QUARTERS_AND_PINS.contains(&s.shape)));
    assert!(render_recipe(&steps).starts_with("00000011 <- ST("));
}

#[test]
fn interrupted_run_leaves_a_consistent_resumable_ledger() {
    let cfg = SolverCfg {
        batch_size: 1,
        ..two_layer_cfg()
    };
    let mut solver = Solver::new(cfg, &QUARTERS_AND_PINS).unwrap();
    let summary = solver.run_until(|progress| progress.batches >= 40).unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.batches, 40);
    assert!(summary.records > QUARTERS_AND_PINS.len() && summary.records < 962);
    assert!(!solver.frontier().is_empty());
    assert_eq!(solver.ledger().verify(CostRule::Max), Ok(()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    write_ledger(&path, solver.ledger()).unwrap();
    let saved = read_ledger(&path).unwrap();
    assert_eq!(saved, solver.ledger().snapshot());

    let mut resumed = Solver::from_records(two_layer_cfg(), saved).unwrap();
    let finished = resumed.run(&AtomicBool::new(false)).unwrap();
    assert!(!finished.interrupted);
    assert_eq!((finished.records, finished.total_cost), (962, 5243));
    assert_eq!(resumed.ledger().verify(CostRule::Max), Ok(()));
}

#[test]
fn stopped_solver_continues_where_it_left_off() {
    let (reference, _) = solve(two_layer_cfg(), &QUARTERS_AND_PINS);
    let mut solver = Solver::new(two_layer_cfg(), &QUARTERS_AND_PINS).unwrap();
    let first = solver.run_until(|progress| progress.batches >= 3).unwrap();
    assert!(first.interrupted);
    let rest = solver.run(&AtomicBool::new(false)).unwrap();
    assert!(!rest.interrupted);
    assert_eq!(solver.ledger().records(), reference.records());
}

#[test]
fn stacking_a_pin_lands_one_layer_up() {
    let out = stack(Shape(0x0001_0000), Shape(0xf));
    assert_eq!(out.layers(), [0x0f, 0x10, 0, 0]);
    assert_eq!(out.code(), "RrRrRrRr:P-------");
}
