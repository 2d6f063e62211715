use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;

/// What produced a set of solver artifacts.
#[derive(Debug, Serialize)]
pub struct Provenance {
    pub code_rev: String,
    pub shapez_version: &'static str,
    pub command: String,
    pub params: Value,
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
}

impl Provenance {
    pub fn new(command: &str, params: Value) -> Self {
        Self {
            code_rev: current_git_rev(),
            shapez_version: shapez::VERSION,
            command: command.to_string(),
            params,
            outputs: Vec::new(),
            summary: None,
        }
    }

    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.outputs
            .push(path.as_ref().to_string_lossy().into_owned());
        self
    }
}

/// Write the sidecar for `artifact` and return its path. A directory gets
/// `provenance.json` inside it; a file gets `<stem>.provenance.json` beside it.
#[track_caller]
pub fn write_sidecar<P: AsRef<Path>>(artifact: P, provenance: &Provenance) -> Result<PathBuf> {
    let artifact = artifact.as_ref();
    let path = sidecar_path(artifact);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }
    let callsite = Location::caller();
    let mut doc = serde_json::to_value(provenance)?;
    doc["callsite"] = serde_json::json!({ "file": callsite.file(), "line": callsite.line() });
    fs::write(&path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "provenance_written");
    Ok(path)
}

fn sidecar_path(artifact: &Path) -> PathBuf {
    if artifact.is_dir() {
        return artifact.join("provenance.json");
    }
    let mut name = artifact
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".provenance.json");
    artifact.with_file_name(name)
}

/// Commit of the build (`GIT_COMMIT` at compile or run time), else `git`.
pub fn current_git_rev() -> String {
    let from_env = option_env!("GIT_COMMIT")
        .map(str::to_string)
        .or_else(|| std::env::var("GIT_COMMIT").ok())
        .filter(|rev| !rev.is_empty());
    if let Some(rev) = from_env {
        return rev;
    }
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
