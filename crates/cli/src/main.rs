mod provenance;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::fmt::SubscriberBuilder;

use provenance::{write_sidecar, Provenance};
use shapez::api::*;

#[derive(Parser)]
#[command(name = "shapez-cli")]
#[command(about = "Shape state-space solver and ledger tools")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Run the solver and persist the ledger, shape list and summary under --out
    Solve(SolveArgs),
    /// Decode shapes given as hex values or shape codes
    Show {
        #[arg(required = true, value_parser = parse_shape)]
        shapes: Vec<Shape>,
    },
    /// Print the construction tree of a shape from a ledger file or shard directory
    Trace {
        #[arg(long)]
        db: PathBuf,
        #[arg(value_parser = parse_shape)]
        shape: Shape,
    },
    /// Print a JSON summary of a ledger
    Stats {
        #[arg(long)]
        db: PathBuf,
    },
    /// Print a small provenance JSON block
    Report,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RuleArg {
    Max,
    Sum,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OpsArg {
    /// Fast swap of halves and flat-top stacking
    Search,
    /// Unguarded full swaps and stacking
    Full,
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Output directory
    #[arg(long)]
    out: PathBuf,
    /// Seed shapes (hex or code); defaults to a full solid layer and a full pin layer
    #[arg(long, value_delimiter = ',', value_parser = parse_shape)]
    seeds: Vec<Shape>,
    /// Resume from a ledger file or shard directory instead of seeding
    #[arg(long, conflicts_with = "seeds")]
    resume: Option<PathBuf>,
    #[arg(long, default_value_t = SolverCfg::default().max_iters)]
    max_iters: u32,
    #[arg(long, default_value_t = SolverCfg::default().max_layers)]
    max_layers: u32,
    #[arg(long, default_value_t = SolverCfg::default().batch_size)]
    batch_size: usize,
    #[arg(long, default_value_t = SolverCfg::default().max_cost)]
    max_cost: u32,
    #[arg(long, value_enum, default_value_t = RuleArg::Max)]
    cost_rule: RuleArg,
    #[arg(long, value_enum, default_value_t = OpsArg::Search)]
    ops: OpsArg,
    /// Write a single ledger file instead of a shard directory
    #[arg(long)]
    flat: bool,
}

impl SolveArgs {
    fn cfg(&self) -> SolverCfg {
        SolverCfg {
            max_iters: self.max_iters,
            max_layers: self.max_layers,
            batch_size: self.batch_size,
            max_cost: self.max_cost,
            cost_rule: match self.cost_rule {
                RuleArg::Max => CostRule::Max,
                RuleArg::Sum => CostRule::Sum,
            },
            ops: match self.ops {
                OpsArg::Search => OpSet::search(),
                OpsArg::Full => OpSet::full(),
            },
        }
    }

    fn params(&self) -> Value {
        json!({
            "seeds": self.seeds.iter().map(|s| format!("{s:08x}")).collect::<Vec<_>>(),
            "resume": self.resume,
            "max_iters": self.max_iters,
            "max_layers": self.max_layers,
            "batch_size": self.batch_size,
            "max_cost": self.max_cost,
            "cost_rule": format!("{:?}", self.cost_rule).to_lowercase(),
            "ops": format!("{:?}", self.ops).to_lowercase(),
            "flat": self.flat,
        })
    }
}

/// Hex value (optionally `0x`-prefixed) or shape code.
fn parse_shape(text: &str) -> Result<Shape> {
    let hex = text.strip_prefix("0x").unwrap_or(text);
    if !hex.is_empty() && hex.len() <= 8 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(Shape(u32::from_str_radix(hex, 16)?));
    }
    Ok(Shape::from_code(text)?)
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Solve(args) => solve(args),
        Action::Show { shapes } => show(&shapes),
        Action::Trace { db, shape } => trace(&db, shape),
        Action::Stats { db } => stats(&db),
        Action::Report => report(),
    }
}

fn solve(args: SolveArgs) -> Result<()> {
    let cfg = args.cfg();
    tracing::info!(out = %args.out.display(), params = %args.params(), "solve");

    let mut solver = match &args.resume {
        Some(path) => {
            let records = read_ledger(path)
                .with_context(|| format!("reading ledger {}", path.display()))?;
            Solver::from_records(cfg, records)?
        }
        None if args.seeds.is_empty() => Solver::new(cfg, &DEFAULT_SEEDS)?,
        None => Solver::new(cfg, &args.seeds)?,
    };

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("ctrl_c_received");
        handler_stop.store(true, Ordering::Relaxed);
    })
    .context("installing Ctrl+C handler")?;

    let summary = solver.run(&stop)?;
    let rule = solver.cfg().cost_rule;
    solver
        .ledger()
        .verify(rule)
        .context("ledger failed verification; nothing persisted")?;
    persist(&args, solver.ledger(), &summary)
}

fn persist(args: &SolveArgs, ledger: &Ledger, summary: &RunSummary) -> Result<()> {
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let ledger_path = if args.flat {
        let path = args.out.join("ledger.db");
        write_ledger(&path, ledger).with_context(|| format!("writing {}", path.display()))?;
        path
    } else {
        let path = args.out.join("db");
        write_sharded(&path, ledger).with_context(|| format!("writing {}", path.display()))?;
        path
    };
    let shapes_path = args.out.join("shapes.txt");
    write_shapes(&shapes_path, ledger.records().into_iter().map(|(s, _)| s))
        .with_context(|| format!("writing {}", shapes_path.display()))?;

    let summary_json = summary_json(summary);
    let summary_path = args.out.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_vec_pretty(&summary_json)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    let mut prov = Provenance::new("solve", args.params())
        .output(&ledger_path)
        .output(&shapes_path)
        .output(&summary_path);
    prov.summary = Some(summary_json);
    write_sidecar(&args.out, &prov)?;
    Ok(())
}

fn summary_json(summary: &RunSummary) -> Value {
    let stats: BTreeMap<&str, u64> = summary.stats.iter().copied().collect();
    json!({
        "records": summary.records,
        "total_cost": summary.total_cost,
        "max_cost": summary.max_cost,
        "levels": summary.levels,
        "batches": summary.batches,
        "inserted": summary.inserted,
        "improved": summary.improved,
        "over_cost": summary.over_cost,
        "interrupted": summary.interrupted,
        "op_stats": stats,
    })
}

fn describe(shape: Shape) -> Value {
    json!({
        "hex": format!("{shape:08x}"),
        "code": shape.code(),
        "layers": shape.layer_count(),
        "valid": shape.is_valid(),
        "crystal": shape.has_crystal(),
        "key": format!("{:08x}", shape.key()),
    })
}

fn show(shapes: &[Shape]) -> Result<()> {
    for &shape in shapes {
        println!("{}", serde_json::to_string(&describe(shape))?);
    }
    Ok(())
}

fn trace(db: &Path, shape: Shape) -> Result<()> {
    let steps = if db.is_dir() {
        let mut source = ShardedDb::open(db)?;
        trace_recipe(&mut source, shape)?
    } else {
        let mut source = read_ledger(db).with_context(|| format!("reading {}", db.display()))?;
        trace_recipe(&mut source, shape)?
    };
    if steps.first().and_then(|s| s.build).is_none() {
        bail!("no record for {shape:08x} in {}", db.display());
    }
    println!("{shape:08x} {}", shape.code());
    print!("{}", render_recipe(&steps));
    Ok(())
}

fn stats(db: &Path) -> Result<()> {
    let records: Vec<(Shape, Build)> = read_ledger(db)
        .with_context(|| format!("reading {}", db.display()))?
        .into_iter()
        .collect();
    let shapes: Vec<Shape> = records.iter().map(|(s, _)| *s).collect();
    let by_cost: BTreeMap<String, usize> = cost_histogram(&records)
        .into_iter()
        .map(|(cost, n)| (cost.to_string(), n))
        .collect();
    let by_layers: Vec<Value> = layer_census(&shapes)
        .into_iter()
        .map(|c| json!({"max_layers": c.max_layers, "shapes": c.shapes, "keys": c.keys}))
        .collect();
    let obj = json!({
        "records": records.len(),
        "by_cost": by_cost,
        "by_layers": by_layers,
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

fn report() -> Result<()> {
    let prov = Provenance::new("report", json!({ "defaults": {
        "max_iters": SolverCfg::default().max_iters,
        "max_layers": SolverCfg::default().max_layers,
        "batch_size": SolverCfg::default().batch_size,
        "max_cost": SolverCfg::default().max_cost,
    }}));
    println!("{}", serde_json::to_string_pretty(&prov)?);
    Ok(())
}
