//! Error types for the latex2doc library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the job or batch cannot proceed at all
//!   (input directory missing, no source files, every enabled tool missing,
//!   output directory not writable). Returned as `Err(ConvertError)` from the
//!   top-level `convert*` functions, before any subprocess is started where
//!   possible.
//!
//! * [`StepError`] — **Non-fatal**: one tool invocation for one source failed
//!   (compiler error, timeout, missing executable). Stored inside
//!   [`crate::output::StepOutcome`] so the other target of the same job, and
//!   every other job of a batch, still runs.

use std::path::PathBuf;
use thiserror::Error;

use crate::output::ToolKind;

/// All fatal errors returned by the latex2doc library.
///
/// Per-tool failures use [`StepError`] and are stored in
/// [`crate::output::StepOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path was not found.
    #[error("Path not found: '{path}'\nCheck the path exists and is readable.")]
    PathNotFound { path: PathBuf },

    /// Batch input exists but is a file, not a directory.
    #[error("Not a directory: '{path}'\nFolder mode expects a directory of .tex files.")]
    NotADirectory { path: PathBuf },

    /// Process does not have read permission on the input.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Directory contains no file with the source extension.
    #[error("No .{extension} files found in '{dir}'")]
    NoSourceFiles { dir: PathBuf, extension: String },

    /// Inline source text is empty or whitespace only.
    #[error("LaTeX source is empty; paste some LaTeX code first")]
    EmptySource,

    /// The requested source file name cannot be used inside a working directory.
    #[error("Invalid source file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: String },

    /// A source file exists but could not be read.
    #[error("Failed to read source '{path}': {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// None of the enabled external tools could be located.
    #[error(
        "No conversion tool is available.\n\
         PDF compiler:   {pdf}\n\
         DOCX converter: {docx}\n\
         Install them or point --pdf-compiler / --docx-converter at the executables."
    )]
    NoToolsAvailable { pdf: String, docx: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// ZIP archive could not be assembled.
    #[error("Failed to build archive '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A settings file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {detail}")]
    ConfigLoadFailed { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for one tool invocation of one job.
///
/// Stored in [`crate::output::StepOutcome`]. The job continues with its
/// other target and the log artifact is still written.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum StepError {
    /// The configured program does not exist or is not on `PATH`.
    #[error("{tool}: executable not found: '{program}'")]
    ExecutableNotFound { tool: ToolKind, program: String },

    /// The program exists but the OS refused to start it.
    #[error("{tool}: failed to launch '{program}': {detail}")]
    LaunchFailed {
        tool: ToolKind,
        program: String,
        detail: String,
    },

    /// The tool ran and exited non-zero (or was killed by a signal).
    #[error("{tool}: failed with {}", describe_exit(.exit_code))]
    CompilationFailed {
        tool: ToolKind,
        exit_code: Option<i32>,
    },

    /// The tool did not finish within the configured timeout.
    #[error("{tool}: timed out after {secs}s")]
    Timeout { tool: ToolKind, secs: u64 },

    /// The tool exited 0 but the expected artifact was not produced.
    #[error("{tool}: exited successfully but produced no '{expected}'")]
    MissingOutput { tool: ToolKind, expected: String },

    /// The artifact was produced but could not be copied to the output directory.
    #[error("{tool}: could not copy artifact to '{dest}': {detail}")]
    CollectFailed {
        tool: ToolKind,
        dest: String,
        detail: String,
    },
}

impl StepError {
    /// The tool this failure belongs to.
    pub fn tool(&self) -> ToolKind {
        match self {
            StepError::ExecutableNotFound { tool, .. }
            | StepError::LaunchFailed { tool, .. }
            | StepError::CompilationFailed { tool, .. }
            | StepError::Timeout { tool, .. }
            | StepError::MissingOutput { tool, .. }
            | StepError::CollectFailed { tool, .. } => *tool,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(c) => format!("exit code {c}"),
        None => "termination by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_failed_display() {
        let e = StepError::CompilationFailed {
            tool: ToolKind::PdfCompiler,
            exit_code: Some(1),
        };
        let msg = e.to_string();
        assert!(msg.contains("exit code 1"), "got: {msg}");
        assert!(msg.contains("PDF compiler"), "got: {msg}");
    }

    #[test]
    fn compilation_failed_by_signal_display() {
        let e = StepError::CompilationFailed {
            tool: ToolKind::DocxConverter,
            exit_code: None,
        };
        assert!(e.to_string().contains("signal"));
    }

    #[test]
    fn timeout_display() {
        let e = StepError::Timeout {
            tool: ToolKind::PdfCompiler,
            secs: 120,
        };
        assert!(e.to_string().contains("120s"));
        assert_eq!(e.tool(), ToolKind::PdfCompiler);
    }

    #[test]
    fn collect_failed_display() {
        let e = StepError::CollectFailed {
            tool: ToolKind::DocxConverter,
            dest: "/out/a.docx".into(),
            detail: "Is a directory".into(),
        };
        assert!(e.to_string().contains("/out/a.docx"));
        assert_eq!(e.tool(), ToolKind::DocxConverter);
    }

    #[test]
    fn no_source_files_display() {
        let e = ConvertError::NoSourceFiles {
            dir: PathBuf::from("/tmp/papers"),
            extension: "tex".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains(".tex"), "got: {msg}");
        assert!(msg.contains("/tmp/papers"), "got: {msg}");
    }

    #[test]
    fn step_error_serialises() {
        let e = StepError::ExecutableNotFound {
            tool: ToolKind::DocxConverter,
            program: "pandoc".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("ExecutableNotFound"), "got: {json}");
        assert!(json.contains("pandoc"), "got: {json}");
    }
}
