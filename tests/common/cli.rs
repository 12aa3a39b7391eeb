use assert_cmd::Command;
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

pub const SOURCE_MAPPING: &str = include_str!("../fixtures/source_mapping.yaml");
pub const DESTINATION_MAPPING: &str = include_str!("../fixtures/destination_mapping.yaml");
pub const SOURCE_SNAPSHOT: &str = include_str!("../fixtures/source.jsonl");
pub const EXPORT_CSV: &str = include_str!("../fixtures/export.csv");

#[derive(Debug)]
pub struct TkbRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl TkbRun {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", self.stdout))
    }

    /// The structured error printed on stderr, skipping any log lines before it.
    pub fn error_json(&self) -> Value {
        parse_error_json(&self.stderr)
            .unwrap_or_else(|| panic!("no error JSON on stderr: {}", self.stderr))
    }
}

pub struct BridgeWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub bridge_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl BridgeWorkspace {
    /// An empty directory with no `.bridge` workspace.
    pub fn bare() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            bridge_dir: root.join(".bridge"),
            temp_dir,
            root,
            log_dir,
        }
    }

    /// A workspace with both mappings and the source snapshot in place.
    pub fn new() -> Self {
        let workspace = Self::bare();
        workspace.write("mappings/source.yaml", SOURCE_MAPPING);
        workspace.write("mappings/destination.yaml", DESTINATION_MAPPING);
        workspace.write("source.jsonl", SOURCE_SNAPSHOT);
        workspace
    }

    /// Write a file relative to the `.bridge` directory.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.bridge_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.bridge_dir.join(relative)
    }

    pub fn exists(&self, relative: &str) -> bool {
        Path::new(&self.path(relative)).exists()
    }
}

pub fn run_tkb<I, S>(workspace: &BridgeWorkspace, args: I, label: &str) -> TkbRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_tkb_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_tkb_with_env<I, S, E, K, V>(
    workspace: &BridgeWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> TkbRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tkb"));
    cmd.current_dir(&workspace.root);
    cmd.env_remove("BRIDGE_DIR");
    cmd.args(args);
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "ticket_bridge=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run tkb");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let timestamp = SystemTime::now();
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        timestamp,
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    TkbRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// Errors are pretty-printed, so the payload starts on a line that is just `{`.
pub fn parse_error_json(stderr: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str(stderr) {
        return Some(json);
    }
    let start = stderr
        .match_indices("\n{\n")
        .last()
        .map(|(index, _)| index + 1)
        .or_else(|| stderr.starts_with("{\n").then_some(0))?;
    serde_json::from_str(stderr[start..].trim()).ok()
}
