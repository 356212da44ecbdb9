//! External tool execution: spawn, capture, wait with a timeout.
//!
//! Every subprocess the library starts goes through [`ToolRunner`]. The
//! default [`ProcessRunner`] uses `tokio::process`; tests inject their own
//! implementation through
//! [`crate::config::ConverterConfigBuilder::runner`] so conversion logic can
//! be exercised without a TeX distribution or pandoc installed.
//!
//! A runner maps every way an invocation can go wrong onto
//! [`StepError`]: it never panics and never returns a fatal error, because a
//! broken tool must only fail its own step.

use crate::error::StepError;
use crate::output::ToolKind;
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// One fully-specified tool call.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: ToolKind,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Job working directory; the process runs with this as its cwd.
    pub working_dir: PathBuf,
    /// Extra environment variables on top of the inherited environment.
    pub env: Vec<(OsString, OsString)>,
    pub timeout: Option<Duration>,
    /// Artifact the tool is expected to create inside `working_dir`.
    pub expected_output: PathBuf,
}

impl ToolInvocation {
    /// Shell-like rendering for logs, e.g. `pdflatex -halt-on-error doc.tex`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Program name without directory or extension, e.g. `pdflatex`.
    pub fn program_label(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes tool invocations and locates executables.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `invocation` to completion or until its timeout.
    ///
    /// A non-zero exit is **not** an error here: it is returned as a
    /// [`ToolOutput`] so the caller keeps the captured output for the log.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, StepError>;

    /// Resolve `program` to an existing executable file, if any.
    fn locate(&self, program: &Path) -> Option<PathBuf> {
        find_executable(program)
    }
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, inv: &ToolInvocation) -> Result<ToolOutput, StepError> {
        debug!("Running {}: {}", inv.tool, inv.command_line());

        let mut command = Command::new(&inv.program);
        command
            .args(&inv.args)
            .current_dir(&inv.working_dir)
            .envs(inv.env.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| spawn_error(inv, e))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = match inv.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("{} timed out after {:?}", inv.program_label(), limit);
                    return Err(StepError::Timeout {
                        tool: inv.tool,
                        secs: limit.as_secs_f64().ceil() as u64,
                    });
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|e| StepError::LaunchFailed {
            tool: inv.tool,
            program: inv.program.display().to_string(),
            detail: e.to_string(),
        })?;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn spawn_error(inv: &ToolInvocation, e: std::io::Error) -> StepError {
    let program = inv.program.display().to_string();
    if e.kind() == std::io::ErrorKind::NotFound {
        StepError::ExecutableNotFound {
            tool: inv.tool,
            program,
        }
    } else {
        StepError::LaunchFailed {
            tool: inv.tool,
            program,
            detail: e.to_string(),
        }
    }
}

/// Resolve a program the way the OS would when spawning it.
///
/// A value with a directory component must name an existing file. A bare
/// name is searched on `PATH`; on Windows `.exe` is tried as well.
pub fn find_executable(program: &Path) -> Option<PathBuf> {
    if program.as_os_str().is_empty() {
        return None;
    }
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) && program.extension().is_none() {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
