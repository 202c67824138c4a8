use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

/// Environment variables that would leak the developer's own settings
/// into a test run.
const SCRUBBED_ENV: &[&str] = &[
    "MEGA_EMAIL",
    "MEGA_PWD",
    "MEGACMDSHELL",
    "VERBOSE",
    "TREE_PARITY_EMAIL",
    "TREE_PARITY_PASSWORD",
    "TREE_PARITY_SHELL",
    "TREE_PARITY_COMMAND_PREFIX",
    "TREE_PARITY_TIMEOUT_SECS",
    "TREE_PARITY_WORKDIR",
    "TREE_PARITY_CONTINUE",
];

#[derive(Debug)]
pub struct ParityRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

pub struct ParityWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl ParityWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }
}

pub fn run_parity<I, S>(workspace: &ParityWorkspace, args: I, label: &str) -> ParityRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_parity_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_parity_with_env<I, S, E, K, V>(
    workspace: &ParityWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> ParityRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tree-parity"));
    cmd.current_dir(&workspace.root);
    for name in SCRUBBED_ENV {
        cmd.env_remove(name);
    }
    cmd.args(args);
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "tree_parity=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run tree-parity");
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

    ParityRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// The JSON document in `text`, skipping any log lines before it.
pub fn extract_json_payload(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    text.trim().to_string()
}
