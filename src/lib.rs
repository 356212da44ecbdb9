//! # latex2doc
//!
//! Convert LaTeX sources into PDF and DOCX by driving two external tools:
//! a TeX engine (`pdflatex` by default) and a document converter (`pandoc`
//! by default).
//!
//! ## Why this crate?
//!
//! Compiling one `.tex` file by hand is easy. Compiling a folder of them,
//! keeping going when some fail, and knowing afterwards *which* ones failed
//! and why is tedious. This crate runs every job in its own scratch
//! directory, treats the PDF and DOCX steps independently, always writes a
//! combined log, and bundles many results into one ZIP archive.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .tex text / file / folder
//!  │
//!  ├─ 1. Source   collect text, validate the file name
//!  ├─ 2. PDF      <compiler> -interaction=nonstopmode -halt-on-error name.tex
//!  ├─ 3. DOCX     <converter> name.tex --to docx -o name.docx
//!  ├─ 4. Collect  copy artifacts + name.log.txt to the output directory
//!  └─ 5. Deliver  single job: separate files; batch: converted_latex.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use latex2doc::{convert_directory, deliver, ConverterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::default();
//!     let batch = convert_directory("papers/", "out/", &config).await?;
//!     print!("{}", batch.report());
//!     let delivery = deliver(&batch.jobs(), &batch.output_dir, &config)?;
//!     eprintln!("{:?}", delivery);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tex2doc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! latex2doc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::{archive_bytes, deliver, write_archive, Delivery};
pub use batch::{convert_directory, convert_directory_sync, convert_files, discover_sources};
pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::{
    check_tools, convert_file, convert_file_sync, convert_source, convert_text, ensure_tools,
    ToolCheck,
};
pub use error::{ConvertError, StepError};
pub use output::{BatchEntry, BatchResult, BatchStats, JobResult, StepOutcome, StepStatus, ToolKind};
pub use pipeline::runner::{find_executable, ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use pipeline::source::SourceDocument;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
