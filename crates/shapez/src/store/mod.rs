//! Persistence adapter: flat shape sets, ledger dumps and sharded ledgers.
//!
//! Formats
//! - Shape set: one `%08x` line per shape, ascending.
//! - Ledger: `shape,op,input1,input2,cost` as `%08x,%s,%08x,%08x,%02x`.
//!   Seeds store their own shape as `input1`; unary records store `0` as
//!   `input2`.
//! - Sharded ledger: a directory of 256 ledger files `SDB00`..`SDBff`; a
//!   shape lives in shard `((v1 >> 12) & 0xf) | ((v2 >> 12) << 4)`.
//!
//! The solver only touches this module at startup and shutdown.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::ops::Op;
use crate::shape::Shape;
use crate::solver::{Build, Ledger};

/// File name prefix of ledger shards.
pub const SHARD_PREFIX: &str = "SDB";
pub const NUM_SHARDS: usize = 256;

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    UnknownOp {
        path: PathBuf,
        line: usize,
        code: String,
    },
    NotFound { path: PathBuf },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, line, reason } => {
                write!(f, "{}:{line}: {reason}", path.display())
            }
            Self::UnknownOp { path, line, code } => {
                write!(f, "{}:{line}: unknown operator code {code:?}", path.display())
            }
            Self::NotFound { path } => write!(f, "{}: no such file or directory", path.display()),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_hex(path: &Path, line: usize, field: &str) -> Result<u32, StoreError> {
    u32::from_str_radix(field, 16).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        line,
        reason: format!("bad hex field {field:?}: {e}"),
    })
}

/// Shard holding `shape`.
#[inline]
pub fn shard_index(shape: Shape) -> usize {
    (((shape.v1() >> 12) & 0xf) | ((shape.v2() >> 12) << 4)) as usize
}

pub fn shard_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{SHARD_PREFIX}{index:02x}"))
}

/// Write shapes in ascending order, one per line.
pub fn write_shapes<P: AsRef<Path>>(
    path: P,
    shapes: impl IntoIterator<Item = Shape>,
) -> Result<(), StoreError> {
    let path = path.as_ref();
    let mut sorted: Vec<Shape> = shapes.into_iter().collect();
    sorted.par_sort_unstable();
    sorted.dedup();
    let mut out = BufWriter::new(File::create(path).map_err(io_err(path))?);
    for shape in &sorted {
        writeln!(out, "{shape:08x}").map_err(io_err(path))?;
    }
    out.flush().map_err(io_err(path))?;
    tracing::info!(path = %path.display(), shapes = sorted.len(), "shapes_written");
    Ok(())
}

/// Read a shape set. Only the first comma-separated field of each line is
/// used, so ledger files are accepted too.
pub fn read_shapes<P: AsRef<Path>>(path: P) -> Result<BTreeSet<Shape>, StoreError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_err(path))?;
    let mut out = BTreeSet::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err(path))?;
        let field = line.split(',').next().unwrap_or_default().trim();
        if field.is_empty() {
            continue;
        }
        out.insert(Shape(parse_hex(path, i + 1, field)?));
    }
    Ok(out)
}

fn format_record(shape: Shape, build: &Build) -> String {
    let input2 = build.input2.unwrap_or(Shape::EMPTY);
    format!(
        "{:08x},{},{:08x},{:08x},{:02x}\n",
        shape, build.op, build.input1, input2, build.cost
    )
}

fn parse_record(path: &Path, line: usize, text: &str) -> Result<(Shape, Build), StoreError> {
    let fields: Vec<&str> = text.trim().split(',').collect();
    if fields.len() != 5 {
        return Err(StoreError::Parse {
            path: path.to_path_buf(),
            line,
            reason: format!("expected 5 fields, found {}", fields.len()),
        });
    }
    let op = Op::from_code(fields[1]).ok_or_else(|| StoreError::UnknownOp {
        path: path.to_path_buf(),
        line,
        code: fields[1].to_string(),
    })?;
    let shape = Shape(parse_hex(path, line, fields[0])?);
    let input1 = Shape(parse_hex(path, line, fields[2])?);
    let input2 = Shape(parse_hex(path, line, fields[3])?);
    let cost = parse_hex(path, line, fields[4])?;
    let build = Build {
        cost,
        op,
        input1,
        input2: (op.arity() == 2).then_some(input2),
    };
    Ok((shape, build))
}

fn write_records<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a (Shape, Build)>,
) -> Result<usize, StoreError> {
    let mut out = BufWriter::new(File::create(path).map_err(io_err(path))?);
    let mut n = 0;
    for (shape, build) in records {
        out.write_all(format_record(*shape, build).as_bytes())
            .map_err(io_err(path))?;
        n += 1;
    }
    out.flush().map_err(io_err(path))?;
    Ok(n)
}

/// Write every record of `ledger` to one file, ascending by shape.
pub fn write_ledger<P: AsRef<Path>>(path: P, ledger: &Ledger) -> Result<(), StoreError> {
    let path = path.as_ref();
    let n = write_records(path, &ledger.records())?;
    tracing::info!(path = %path.display(), records = n, "ledger_written");
    Ok(())
}

/// Write `ledger` as 256 shard files under `dir` (created if missing).
/// Every shard file is written, empty or not.
pub fn write_sharded<P: AsRef<Path>>(dir: P, ledger: &Ledger) -> Result<(), StoreError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut shards: Vec<Vec<(Shape, Build)>> = vec![Vec::new(); NUM_SHARDS];
    for record in ledger.records() {
        shards[shard_index(record.0)].push(record);
    }
    shards
        .par_iter()
        .enumerate()
        .try_for_each(|(index, records)| {
            write_records(&shard_path(dir, index), records).map(|_| ())
        })?;
    tracing::info!(dir = %dir.display(), records = ledger.len(), "ledger_sharded");
    Ok(())
}

fn read_records(path: &Path, into: &mut HashMap<Shape, Build>) -> Result<(), StoreError> {
    let file = File::open(path).map_err(io_err(path))?;
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err(path))?;
        if line.trim().is_empty() {
            continue;
        }
        let (shape, build) = parse_record(path, i + 1, &line)?;
        into.insert(shape, build);
    }
    Ok(())
}

/// Read a ledger from a single file or from every file in a directory.
/// Later lines win when a shape appears twice.
pub fn read_ledger<P: AsRef<Path>>(path: P) -> Result<BTreeMap<Shape, Build>, StoreError> {
    let path = path.as_ref();
    let mut records = HashMap::new();
    if path.is_file() {
        read_records(path, &mut records)?;
    } else if path.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(path).map_err(io_err(path))? {
            let entry = entry.map_err(io_err(path))?;
            if entry.path().is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        for file in &files {
            read_records(file, &mut records)?;
        }
        tracing::debug!(dir = %path.display(), files = files.len(), "ledger_dir_read");
    } else {
        return Err(StoreError::NotFound {
            path: path.to_path_buf(),
        });
    }
    tracing::info!(path = %path.display(), records = records.len(), "ledger_read");
    Ok(records.into_iter().collect())
}

/// Lookup of build records from something that holds them.
pub trait BuildSource {
    fn build_of(&mut self, shape: Shape) -> Result<Option<Build>, StoreError>;
}

impl BuildSource for Ledger {
    fn build_of(&mut self, shape: Shape) -> Result<Option<Build>, StoreError> {
        Ok(self.get(shape))
    }
}

impl BuildSource for BTreeMap<Shape, Build> {
    fn build_of(&mut self, shape: Shape) -> Result<Option<Build>, StoreError> {
        Ok(self.get(&shape).copied())
    }
}

/// Sharded ledger directory that reads a shard on first lookup into it.
/// A missing shard file counts as an empty shard.
#[derive(Debug)]
pub struct ShardedDb {
    dir: PathBuf,
    loaded: HashSet<usize>,
    builds: HashMap<Shape, Build>,
}

impl ShardedDb {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(StoreError::NotFound {
                path: dir.to_path_buf(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            loaded: HashSet::new(),
            builds: HashMap::new(),
        })
    }

    pub fn get(&mut self, shape: Shape) -> Result<Option<Build>, StoreError> {
        let index = shard_index(shape);
        if !self.loaded.contains(&index) {
            let path = shard_path(&self.dir, index);
            match read_records(&path, &mut self.builds) {
                Ok(()) => {}
                Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            self.loaded.insert(index);
            tracing::debug!(shard = index, "shard_loaded");
        }
        Ok(self.builds.get(&shape).copied())
    }

    /// Shards read so far.
    pub fn loaded_shards(&self) -> usize {
        self.loaded.len()
    }
}

impl BuildSource for ShardedDb {
    fn build_of(&mut self, shape: Shape) -> Result<Option<Build>, StoreError> {
        self.get(shape)
    }
}
