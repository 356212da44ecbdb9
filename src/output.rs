//! Result types produced by single-file and batch conversion.
//!
//! Every type here is plain data: it owns its log text and artifact paths and
//! derives [`serde::Serialize`] so the CLI can emit it as JSON.

use crate::error::StepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which external tool a step invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    /// LaTeX → PDF (pdflatex, xelatex, lualatex, …).
    PdfCompiler,
    /// LaTeX → DOCX (pandoc).
    DocxConverter,
}

impl ToolKind {
    /// File extension of the artifact this tool produces.
    pub fn artifact_extension(self) -> &'static str {
        match self {
            ToolKind::PdfCompiler => "pdf",
            ToolKind::DocxConverter => "docx",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::PdfCompiler => f.write_str("PDF compiler"),
            ToolKind::DocxConverter => f.write_str("DOCX converter"),
        }
    }
}

/// Final state of one tool step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Tool exited 0 and its artifact was collected.
    Succeeded,
    /// Tool could not run, failed, timed out, or produced nothing.
    Failed(StepError),
    /// Target disabled in configuration; the tool was not invoked.
    Skipped,
}

/// Outcome of one tool invocation within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub tool: ToolKind,
    pub status: StepStatus,
    /// Process exit code, when the process ran to completion.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl StepOutcome {
    pub fn skipped(tool: ToolKind) -> Self {
        Self {
            tool,
            status: StepStatus::Skipped,
            exit_code: None,
            duration_ms: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Succeeded
    }

    pub fn failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&StepError> {
        match &self.status {
            StepStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Short human label: `ok`, `skipped`, or the failure message.
    pub fn label(&self) -> String {
        match &self.status {
            StepStatus::Succeeded => "ok".to_string(),
            StepStatus::Skipped => "skipped".to_string(),
            StepStatus::Failed(e) => format!("FAILED ({e})"),
        }
    }
}

/// Everything one conversion job produced.
///
/// Artifact paths point into the caller's output directory; the job's
/// working directory is gone by the time this value exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Base name shared by all artifacts of this job (`<name>.pdf`, …).
    pub name: String,
    /// Originating `.tex` file, `None` for inline text.
    pub source_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
    pub docx_path: Option<PathBuf>,
    /// `<name>.log.txt`; written whether or not any step succeeded.
    pub log_path: PathBuf,
    /// Combined output of both tools.
    pub log: String,
    pub pdf: StepOutcome,
    pub docx: StepOutcome,
    /// First LaTeX error line from the compiler output, when PDF failed.
    pub error_summary: Option<String>,
    pub duration_ms: u64,
}

impl JobResult {
    /// Every artifact written for this job, in pdf → docx → log order.
    pub fn artifacts(&self) -> Vec<&Path> {
        let mut out = Vec::with_capacity(3);
        if let Some(p) = &self.pdf_path {
            out.push(p.as_path());
        }
        if let Some(p) = &self.docx_path {
            out.push(p.as_path());
        }
        out.push(self.log_path.as_path());
        out
    }

    /// True if no enabled step failed.
    pub fn is_success(&self) -> bool {
        !self.pdf.failed() && !self.docx.failed()
    }
}

/// One entry of a batch, in enumeration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEntry {
    /// The job ran (each step may still have failed).
    Completed(JobResult),
    /// The job could not be set up, e.g. the source file was unreadable.
    Aborted { source: PathBuf, error: String },
}

impl BatchEntry {
    pub fn job(&self) -> Option<&JobResult> {
        match self {
            BatchEntry::Completed(job) => Some(job),
            BatchEntry::Aborted { .. } => None,
        }
    }

    /// Display name: the job's base name or the source file name.
    pub fn name(&self) -> String {
        match self {
            BatchEntry::Completed(job) => job.name.clone(),
            BatchEntry::Aborted { source, .. } => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.display().to_string()),
        }
    }
}

/// Counters over a finished batch.
///
/// An aborted entry counts as a failure for every enabled target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub pdf_succeeded: usize,
    pub pdf_failed: usize,
    pub docx_succeeded: usize,
    pub docx_failed: usize,
    pub aborted: usize,
    pub total_duration_ms: u64,
}

impl BatchStats {
    pub(crate) fn record(&mut self, entry: &BatchEntry, pdf_enabled: bool, docx_enabled: bool) {
        self.total_files += 1;
        match entry {
            BatchEntry::Completed(job) => {
                if job.pdf.succeeded() {
                    self.pdf_succeeded += 1;
                } else if job.pdf.failed() {
                    self.pdf_failed += 1;
                }
                if job.docx.succeeded() {
                    self.docx_succeeded += 1;
                } else if job.docx.failed() {
                    self.docx_failed += 1;
                }
            }
            BatchEntry::Aborted { .. } => {
                self.aborted += 1;
                if pdf_enabled {
                    self.pdf_failed += 1;
                }
                if docx_enabled {
                    self.docx_failed += 1;
                }
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.pdf_failed > 0 || self.docx_failed > 0
    }
}

/// Result of converting a set of sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Directory the sources came from (`None` for an explicit file list).
    pub input_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub entries: Vec<BatchEntry>,
    pub stats: BatchStats,
}

impl BatchResult {
    /// Completed jobs only, in enumeration order.
    pub fn jobs(&self) -> Vec<&JobResult> {
        self.entries.iter().filter_map(BatchEntry::job).collect()
    }

    /// Plain-text per-file table of PDF/DOCX outcomes.
    pub fn report(&self) -> String {
        let width = self
            .entries
            .iter()
            .map(|e| e.name().len())
            .max()
            .unwrap_or(4)
            .max(4);

        let mut out = format!("{:<width$}  {:<8}  {:<8}\n", "FILE", "PDF", "DOCX");
        for entry in &self.entries {
            match entry {
                BatchEntry::Completed(job) => {
                    out.push_str(&format!(
                        "{:<width$}  {:<8}  {:<8}\n",
                        job.name,
                        short_label(&job.pdf),
                        short_label(&job.docx),
                    ));
                    if let Some(e) = job.pdf.error() {
                        out.push_str(&format!("{:<width$}    pdf:  {e}\n", ""));
                    }
                    if let Some(summary) = &job.error_summary {
                        out.push_str(&format!("{:<width$}    {summary}\n", ""));
                    }
                    if let Some(e) = job.docx.error() {
                        out.push_str(&format!("{:<width$}    docx: {e}\n", ""));
                    }
                }
                BatchEntry::Aborted { error, .. } => {
                    out.push_str(&format!(
                        "{:<width$}  {:<8}  {:<8}\n",
                        entry.name(),
                        "aborted",
                        "aborted"
                    ));
                    out.push_str(&format!("{:<width$}    {error}\n", ""));
                }
            }
        }
        let s = &self.stats;
        out.push_str(&format!(
            "\n{} files: PDF {} ok / {} failed, DOCX {} ok / {} failed\n",
            s.total_files, s.pdf_succeeded, s.pdf_failed, s.docx_succeeded, s.docx_failed
        ));
        out
    }
}

fn short_label(step: &StepOutcome) -> &'static str {
    match step.status {
        StepStatus::Succeeded => "ok",
        StepStatus::Skipped => "skipped",
        StepStatus::Failed(_) => "FAILED",
    }
}
