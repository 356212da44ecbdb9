//! Configuration types for LaTeX → PDF/DOCX conversion.
//!
//! All conversion behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`] or loaded from a TOML settings file with
//! [`ConverterConfig::from_toml_file`]. The two external tool paths live here
//! rather than in constants, and tool execution is routed through an
//! injectable [`ToolRunner`], so tests can swap in a fake runner without
//! pdflatex or pandoc installed.
//!
//! # Settings file
//!
//! ```toml
//! pdf_compiler   = "/usr/bin/pdflatex"
//! pdf_flags      = ["-interaction=nonstopmode", "-halt-on-error"]
//! docx_converter = "/usr/bin/pandoc"
//! timeout_secs   = 120
//! recursive      = false
//! ```

use crate::error::ConvertError;
use crate::pipeline::runner::ToolRunner;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default PDF compiler, resolved on `PATH`.
pub const DEFAULT_PDF_COMPILER: &str = "pdflatex";
/// Default document-format converter, resolved on `PATH`.
pub const DEFAULT_DOCX_CONVERTER: &str = "pandoc";
/// Name of the archive produced when more than one source was converted.
pub const DEFAULT_ARCHIVE_NAME: &str = "converted_latex.zip";

/// Configuration for LaTeX conversion.
///
/// Built via [`ConverterConfig::builder()`], [`ConverterConfig::default()`],
/// or [`ConverterConfig::from_toml_file`].
///
/// # Example
/// ```rust
/// use latex2doc::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .pdf_compiler("xelatex")
///     .timeout_secs(60)
///     .recursive(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// LaTeX compiler executable: a bare name looked up on `PATH`, or a path.
    /// Default: `pdflatex`.
    pub pdf_compiler: PathBuf,

    /// Flags passed to the compiler before the source file name.
    /// Default: `-interaction=nonstopmode -halt-on-error`.
    ///
    /// Must keep the compiler non-interactive: stdin is closed, so a compiler
    /// waiting for input on an error only ends at the timeout.
    pub pdf_flags: Vec<String>,

    /// Format converter executable. Default: `pandoc`.
    pub docx_converter: PathBuf,

    /// Extra arguments appended to the converter command line. Default: none.
    pub docx_args: Vec<String>,

    /// Run the PDF step. Default: true.
    pub make_pdf: bool,

    /// Run the DOCX step. Default: true.
    pub make_docx: bool,

    /// Per-invocation timeout in seconds; 0 waits indefinitely. Default: 120.
    pub timeout_secs: u64,

    /// Descend into subdirectories in folder mode. Default: false.
    pub recursive: bool,

    /// Source file extension matched in folder mode (case-insensitive). Default: `tex`.
    pub source_extension: String,

    /// Copy compiler scratch files (`.aux`, the compiler's `.log`, …) to the
    /// output directory instead of deleting them with the working directory.
    /// Default: false.
    pub keep_intermediates: bool,

    /// File name of the batch archive. Default: `converted_latex.zip`.
    pub archive_name: String,

    /// Pre-constructed tool runner. If None, external processes are spawned
    /// with [`crate::pipeline::runner::ProcessRunner`].
    #[serde(skip)]
    pub runner: Option<Arc<dyn ToolRunner>>,

    /// Optional per-file progress callback for batch conversion.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pdf_compiler: PathBuf::from(DEFAULT_PDF_COMPILER),
            pdf_flags: vec![
                "-interaction=nonstopmode".to_string(),
                "-halt-on-error".to_string(),
            ],
            docx_converter: PathBuf::from(DEFAULT_DOCX_CONVERTER),
            docx_args: Vec::new(),
            make_pdf: true,
            make_docx: true,
            timeout_secs: 120,
            recursive: false,
            source_extension: "tex".to_string(),
            keep_intermediates: false,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            runner: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("pdf_compiler", &self.pdf_compiler)
            .field("pdf_flags", &self.pdf_flags)
            .field("docx_converter", &self.docx_converter)
            .field("docx_args", &self.docx_args)
            .field("make_pdf", &self.make_pdf)
            .field("make_docx", &self.make_docx)
            .field("timeout_secs", &self.timeout_secs)
            .field("recursive", &self.recursive)
            .field("source_extension", &self.source_extension)
            .field("keep_intermediates", &self.keep_intermediates)
            .field("archive_name", &self.archive_name)
            .field("runner", &self.runner.as_ref().map(|_| "<dyn ToolRunner>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load settings from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConvertError::ConfigLoadFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConvertError::InvalidConfig(detail) => ConvertError::ConfigLoadFailed {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConvertError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConvertError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the serialisable settings as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConvertError> {
        toml::to_string_pretty(self).map_err(|e| ConvertError::Internal(e.to_string()))
    }

    /// Per-invocation timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Check the constraints the builder enforces.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !self.make_pdf && !self.make_docx {
            return Err(ConvertError::InvalidConfig(
                "at least one of PDF or DOCX output must be enabled".into(),
            ));
        }
        if self.make_pdf && self.pdf_compiler.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "PDF compiler path must not be empty".into(),
            ));
        }
        if self.make_docx && self.docx_converter.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "DOCX converter path must not be empty".into(),
            ));
        }
        let ext = self.source_extension.trim_start_matches('.');
        if ext.is_empty() || ext.contains(['/', '\\', '*', '?', '[']) {
            return Err(ConvertError::InvalidConfig(format!(
                "invalid source extension '{}'",
                self.source_extension
            )));
        }
        if self.archive_name.trim().is_empty() || self.archive_name.contains(['/', '\\']) {
            return Err(ConvertError::InvalidConfig(format!(
                "archive name must be a plain file name, got '{}'",
                self.archive_name
            )));
        }
        Ok(())
    }
}

/// Builder for [`ConverterConfig`].
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl fmt::Debug for ConverterConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConverterConfigBuilder {
    /// Start from an existing configuration, e.g. one loaded from TOML.
    pub fn from_config(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn pdf_compiler(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.pdf_compiler = program.into();
        self
    }

    pub fn pdf_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pdf_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn docx_converter(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.docx_converter = program.into();
        self
    }

    pub fn docx_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.docx_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn make_pdf(mut self, v: bool) -> Self {
        self.config.make_pdf = v;
        self
    }

    pub fn make_docx(mut self, v: bool) -> Self {
        self.config.make_docx = v;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn recursive(mut self, v: bool) -> Self {
        self.config.recursive = v;
        self
    }

    pub fn source_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.source_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn keep_intermediates(mut self, v: bool) -> Self {
        self.config.keep_intermediates = v;
        self
    }

    pub fn archive_name(mut self, name: impl Into<String>) -> Self {
        self.config.archive_name = name.into();
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.config.runner = Some(runner);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_tool_invocation() {
        let c = ConverterConfig::default();
        assert_eq!(c.pdf_compiler, PathBuf::from("pdflatex"));
        assert_eq!(c.docx_converter, PathBuf::from("pandoc"));
        assert_eq!(
            c.pdf_flags,
            vec!["-interaction=nonstopmode", "-halt-on-error"]
        );
        assert_eq!(c.timeout(), Some(Duration::from_secs(120)));
        assert!(!c.recursive);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn builder_rejects_all_targets_disabled() {
        let err = ConverterConfig::builder()
            .make_pdf(false)
            .make_docx(false)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeout_disables_the_limit() {
        let c = ConverterConfig::builder().timeout_secs(0).build().unwrap();
        assert_eq!(c.timeout(), None);
    }

    #[test]
    fn builder_strips_leading_dot_from_extension() {
        let c = ConverterConfig::builder()
            .source_extension(".ltx")
            .build()
            .unwrap();
        assert_eq!(c.source_extension, "ltx");
    }

    #[test]
    fn builder_rejects_archive_path() {
        assert!(ConverterConfig::builder()
            .archive_name("../out.zip")
            .build()
            .is_err());
    }

    #[test]
    fn toml_partial_settings_keep_defaults() {
        let c = ConverterConfig::from_toml_str(
            r#"
            pdf_compiler = "C:/Program Files/MiKTeX/miktex/bin/x64/pdflatex.exe"
            recursive = true
            "#,
        )
        .unwrap();
        assert!(c.recursive);
        assert_eq!(c.docx_converter, PathBuf::from("pandoc"));
        assert_eq!(c.timeout_secs, 120);
        assert!(c.pdf_compiler.to_string_lossy().ends_with("pdflatex.exe"));
    }

    #[test]
    fn toml_invalid_values_are_rejected() {
        let err = ConverterConfig::from_toml_str("make_pdf = false\nmake_docx = false\n")
            .unwrap_err();
        assert!(err.to_string().contains("at least one"));
        assert!(ConverterConfig::from_toml_str("timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn toml_round_trip_of_rendered_settings() {
        let original = ConverterConfig::builder()
            .pdf_compiler("lualatex")
            .docx_args(["--toc"])
            .build()
            .unwrap();
        let text = original.to_toml_string().unwrap();
        let parsed = ConverterConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.pdf_compiler, PathBuf::from("lualatex"));
        assert_eq!(parsed.docx_args, vec!["--toc"]);
    }

    #[test]
    fn from_toml_file_reports_missing_file() {
        let err = ConverterConfig::from_toml_file("/definitely/not/here/tex2doc.toml").unwrap_err();
        assert!(matches!(err, ConvertError::ConfigLoadFailed { .. }));
    }
}
