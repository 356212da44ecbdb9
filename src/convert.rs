//! Single-document conversion entry points.
//!
//! A conversion job moves linearly through four states:
//!
//! ```text
//! submitted ──▶ pdf attempted ──▶ docx attempted ──▶ finalized
//! ```
//!
//! Each job gets its own temporary working directory, so auxiliary files of
//! one job never collide with another and compiler scratch files disappear
//! with the directory. The two tool steps are independent: a failed or
//! missing compiler never prevents the DOCX step, and the combined log is
//! written to the output directory whatever happened.

use crate::config::ConverterConfig;
use crate::error::{ConvertError, StepError};
use crate::output::{JobResult, StepOutcome, StepStatus, ToolKind};
use crate::pipeline::diagnostics::extract_latex_error;
use crate::pipeline::runner::{ProcessRunner, ToolInvocation, ToolRunner};
use crate::pipeline::source::SourceDocument;
use crate::pipeline::tools;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert pasted LaTeX text.
///
/// # Arguments
/// * `text`       — LaTeX source
/// * `file_name`  — name for the source inside the working directory;
///   defaults to `document.tex`. Artifacts are named after its stem.
/// * `output_dir` — created if missing; receives `<name>.pdf`,
///   `<name>.docx` and `<name>.log.txt`
///
/// # Errors
/// Fatal errors only: empty text, unusable file name, no enabled tool
/// available, output directory not writable. Tool failures are reported in
/// the returned [`JobResult`].
pub async fn convert_text(
    text: &str,
    file_name: Option<&str>,
    output_dir: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<JobResult, ConvertError> {
    let source = SourceDocument::from_text(text, file_name)?;
    ensure_tools(config)?;
    convert_source(&source, output_dir, config).await
}

/// Convert one `.tex` file.
pub async fn convert_file(
    path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<JobResult, ConvertError> {
    let source = SourceDocument::from_file(path).await?;
    ensure_tools(config)?;
    convert_source(&source, output_dir, config).await
}

/// Blocking wrapper around [`convert_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_file_sync(
    path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<JobResult, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_file(path, output_dir, config))
}

/// Run one conversion job for an already-collected source.
///
/// Does not check tool availability up front; a missing executable is
/// recorded as [`StepError::ExecutableNotFound`] for its step only.
pub async fn convert_source(
    source: &SourceDocument,
    output_dir: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<JobResult, ConvertError> {
    let start = Instant::now();
    let output_dir = output_dir.as_ref();
    info!("Converting {}", source.file_name());

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    // ── Step 1: Isolated working directory ───────────────────────────────
    let work_dir = tempfile::Builder::new()
        .prefix("tex2doc-")
        .tempdir()
        .map_err(|e| ConvertError::Internal(format!("tempdir: {e}")))?;
    let tex_path = work_dir.path().join(source.file_name());
    tokio::fs::write(&tex_path, source.text())
        .await
        .map_err(|e| ConvertError::Internal(format!("Failed to write temp source: {e}")))?;
    debug!("Working directory: {}", work_dir.path().display());

    let runner = tool_runner(config);
    let mut log = String::new();

    // ── Step 2: PDF ──────────────────────────────────────────────────────
    let mut error_summary = None;
    let (pdf, pdf_path) = if config.make_pdf {
        let inv = tools::pdf_invocation(config, source, work_dir.path());
        let mut attempt = run_step(runner.as_ref(), &inv, &mut log).await;
        if attempt.outcome.failed() {
            error_summary = extract_latex_error(&attempt.captured);
        }
        let path = collect_artifact(&mut attempt.outcome, &inv, output_dir, &mut log).await;
        (attempt.outcome, path)
    } else {
        (StepOutcome::skipped(ToolKind::PdfCompiler), None)
    };

    // ── Step 3: DOCX (regardless of the PDF outcome) ─────────────────────
    let (docx, docx_path) = if config.make_docx {
        let inv = tools::docx_invocation(config, source, work_dir.path());
        let mut attempt = run_step(runner.as_ref(), &inv, &mut log).await;
        let path = collect_artifact(&mut attempt.outcome, &inv, output_dir, &mut log).await;
        (attempt.outcome, path)
    } else {
        (StepOutcome::skipped(ToolKind::DocxConverter), None)
    };

    // ── Step 4: Finalize ─────────────────────────────────────────────────
    if config.keep_intermediates {
        if let Err(e) = keep_scratch_files(work_dir.path(), source, output_dir).await {
            warn!("Keeping intermediates for {} failed: {}", source.file_name(), e);
            log.push_str(&format!("\n[intermediates] {e}\n"));
        }
    }

    let log_path = output_dir.join(format!("{}.log.txt", source.name()));
    tokio::fs::write(&log_path, &log)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: log_path.clone(),
            source: e,
        })?;

    let result = JobResult {
        name: source.name().to_string(),
        source_path: source.origin().map(Path::to_path_buf),
        pdf_path,
        docx_path,
        log_path,
        log,
        pdf,
        docx,
        error_summary,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Finished {}: pdf {}, docx {} in {}ms",
        source.file_name(),
        result.pdf.label(),
        result.docx.label(),
        result.duration_ms
    );
    Ok(result)
}

// ── Tool preflight ───────────────────────────────────────────────────────

/// Whether one configured tool can be found.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCheck {
    pub tool: ToolKind,
    pub program: PathBuf,
    pub enabled: bool,
    /// Executable the program resolved to, `None` if not found.
    pub resolved: Option<PathBuf>,
}

impl ToolCheck {
    pub fn available(&self) -> bool {
        self.resolved.is_some()
    }

    fn describe(&self) -> String {
        match (&self.resolved, self.enabled) {
            (_, false) => format!("{} (disabled)", self.program.display()),
            (Some(p), true) => p.display().to_string(),
            (None, true) => format!("{} (not found)", self.program.display()),
        }
    }
}

/// Locate both configured tools through the configured runner.
pub fn check_tools(config: &ConverterConfig) -> [ToolCheck; 2] {
    let runner = tool_runner(config);
    let check = |tool, program: &PathBuf, enabled| ToolCheck {
        tool,
        program: program.clone(),
        enabled,
        resolved: runner.locate(program),
    };
    [
        check(ToolKind::PdfCompiler, &config.pdf_compiler, config.make_pdf),
        check(ToolKind::DocxConverter, &config.docx_converter, config.make_docx),
    ]
}

/// Fail fast when no enabled tool can be found.
///
/// One missing tool is not fatal: its step fails per job with
/// [`StepError::ExecutableNotFound`] while the other still runs.
pub fn ensure_tools(config: &ConverterConfig) -> Result<[ToolCheck; 2], ConvertError> {
    let checks = check_tools(config);
    for c in checks.iter().filter(|c| c.enabled && !c.available()) {
        warn!("{} not found: {}", c.tool, c.program.display());
    }
    if !checks.iter().any(|c| c.enabled && c.available()) {
        return Err(ConvertError::NoToolsAvailable {
            pdf: checks[0].describe(),
            docx: checks[1].describe(),
        });
    }
    Ok(checks)
}

// ── Internal helpers ─────────────────────────────────────────────────────

pub(crate) fn tool_runner(config: &ConverterConfig) -> Arc<dyn ToolRunner> {
    match config.runner {
        Some(ref runner) => Arc::clone(runner),
        None => Arc::new(ProcessRunner),
    }
}

struct StepAttempt {
    outcome: StepOutcome,
    /// stdout + stderr, for diagnostics.
    captured: String,
}

/// Run one tool, append its section to `log`, and classify the result.
async fn run_step(runner: &dyn ToolRunner, inv: &ToolInvocation, log: &mut String) -> StepAttempt {
    let label = inv.program_label();
    let started = Instant::now();
    let result = runner.run(inv).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    log.push_str(&format!("\n--- {label} log ---\n$ {}\n", inv.command_line()));

    let (status, exit_code, captured) = match result {
        Ok(output) => {
            log.push_str(&output.stdout);
            log.push('\n');
            log.push_str(&output.stderr);
            log.push('\n');

            let status = if !output.success() {
                StepStatus::Failed(StepError::CompilationFailed {
                    tool: inv.tool,
                    exit_code: output.exit_code,
                })
            } else if !tokio::fs::try_exists(&inv.expected_output)
                .await
                .unwrap_or(false)
            {
                StepStatus::Failed(StepError::MissingOutput {
                    tool: inv.tool,
                    expected: file_name_of(&inv.expected_output),
                })
            } else {
                StepStatus::Succeeded
            };
            let captured = format!("{}\n{}", output.stdout, output.stderr);
            (status, output.exit_code, captured)
        }
        Err(e) => (StepStatus::Failed(e), None, String::new()),
    };

    match (&status, exit_code) {
        (StepStatus::Failed(e), _) => {
            warn!("{e}");
            log.push_str(&format!("[{label}] failed: {e}\n"));
        }
        (_, Some(code)) => log.push_str(&format!("[{label}] exit status: {code}\n")),
        (_, None) => log.push_str(&format!("[{label}] exit status: unknown\n")),
    }

    StepAttempt {
        outcome: StepOutcome {
            tool: inv.tool,
            status,
            exit_code,
            duration_ms,
        },
        captured,
    }
}

/// Copy a successful step's artifact from the working dir to `output_dir`.
///
/// A failed copy turns the step into [`StepError::CollectFailed`]; the job
/// carries on with its other step and its log.
async fn collect_artifact(
    outcome: &mut StepOutcome,
    inv: &ToolInvocation,
    output_dir: &Path,
    log: &mut String,
) -> Option<PathBuf> {
    if !outcome.succeeded() {
        return None;
    }
    let dest = output_dir.join(file_name_of(&inv.expected_output));
    match tokio::fs::copy(&inv.expected_output, &dest).await {
        Ok(_) => {
            debug!("Collected {}", dest.display());
            Some(dest)
        }
        Err(e) => {
            let err = StepError::CollectFailed {
                tool: inv.tool,
                dest: dest.display().to_string(),
                detail: e.to_string(),
            };
            warn!("{err}");
            log.push_str(&format!("[{}] failed: {err}\n", inv.program_label()));
            outcome.status = StepStatus::Failed(err);
            None
        }
    }
}

/// Copy compiler scratch files (everything except the source and the two
/// artifacts) next to the outputs.
async fn keep_scratch_files(
    work_dir: &Path,
    source: &SourceDocument,
    output_dir: &Path,
) -> Result<(), ConvertError> {
    let skip = [
        source.file_name().to_string(),
        tools::artifact_name(source, ToolKind::PdfCompiler),
        tools::artifact_name(source, ToolKind::DocxConverter),
    ];
    let mut entries = tokio::fs::read_dir(work_dir)
        .await
        .map_err(|e| ConvertError::Internal(format!("read_dir {}: {e}", work_dir.display())))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ConvertError::Internal(format!("read_dir {}: {e}", work_dir.display())))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file || skip.contains(&name) {
            continue;
        }
        let dest = output_dir.join(&name);
        tokio::fs::copy(entry.path(), &dest)
            .await
            .map_err(|e| ConvertError::OutputWriteFailed { path: dest, source: e })?;
    }
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
