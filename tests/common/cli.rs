use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Variables that would leak the developer's own setup into a run.
const SCRUBBED_ENV: &[&str] = &[
    "GH_TOKEN",
    "GITHUB_TOKEN",
    "GH_REPO",
    "GH_EDITOR",
    "GH_PROMPT_DISABLED",
    "GHI_API_URL",
    "GHI_TOKEN",
    "GHI_REPO",
    "GHI_WORKERS",
    "GHI_EDITOR",
    "GHI_HTTP_TIMEOUT",
    "XDG_CONFIG_HOME",
];

#[derive(Debug)]
pub struct GhiRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl GhiRun {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Scratch directory used as both CWD and HOME of a run.
pub struct GhiWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl GhiWorkspace {
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

    /// Write `~/.config/ghi/config.yaml` inside the workspace.
    pub fn write_user_config(&self, contents: &str) {
        let dir = self.root.join(".config").join("ghi");
        fs::create_dir_all(&dir).expect("config dir");
        fs::write(dir.join("config.yaml"), contents).expect("write config");
    }
}

impl Default for GhiWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

pub fn run_ghi<I, S>(workspace: &GhiWorkspace, args: I, label: &str) -> GhiRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_ghi_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_ghi_with_env<I, S, E, K, V>(
    workspace: &GhiWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> GhiRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ghi"));
    cmd.current_dir(&workspace.root);
    for var in SCRUBBED_ENV {
        cmd.env_remove(var);
    }
    cmd.args(args);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "ghi=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);
    cmd.envs(env_vars);

    let start = Instant::now();
    let output = cmd.output().expect("run ghi");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        "label: {label}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    GhiRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// The first JSON document in `output`, skipping log lines before it.
pub fn extract_json_payload(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        if line.starts_with('[') || line.starts_with('{') {
            let mut depth = 0i32;
            let mut collected = Vec::new();
            for candidate in &lines[idx..] {
                collected.push(*candidate);
                depth += candidate.matches(|c: char| c == '{' || c == '[').count() as i32;
                depth -= candidate.matches(|c: char| c == '}' || c == ']').count() as i32;
                if depth <= 0 {
                    break;
                }
            }
            return collected.join("\n");
        }
    }
    output.trim().to_string()
}
