//! CLI binary for latex2doc.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConverterConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use latex2doc::{
    check_tools, convert_directory, convert_file, convert_files, convert_text, deliver,
    BatchProgressCallback, BatchResult, ConverterConfig, ConverterConfigBuilder, Delivery,
    JobResult, ProgressCallback, StepOutcome,
};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// finished file.
struct CliProgressCallback {
    bar: ProgressBar,
    failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");

        Arc::new(Self {
            bar,
            failures: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_files} file(s)…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, success: bool) {
        let mark = if success {
            green("✓")
        } else {
            self.failures.fetch_add(1, Ordering::SeqCst);
            red("✗")
        };
        self.bar
            .println(format!("  {} {:>3}/{:<3}  {}", mark, index, total, name));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.failures.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} with failures)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Paste LaTeX on stdin
  cat snippet.tex | tex2doc text --name snippet -o out/

  # One file (relative \input and graphics resolve from its directory)
  tex2doc text paper/main.tex -o out/

  # Every .tex file in a folder, bundled into converted_latex.zip
  tex2doc dir papers/ -o out/

  # An explicit list of files, PDF only
  tex2doc --no-docx files a.tex b.tex c.tex -o out/

  # Use another engine and a longer timeout
  tex2doc --pdf-compiler xelatex --timeout 300 dir thesis/ -o out/

  # Verify that the configured tools can be found
  tex2doc check

  # Write a starter configuration file
  tex2doc config init tex2doc.toml

OUTPUT:
  For every source <name>.tex the output directory receives <name>.pdf,
  <name>.docx (when each step succeeds) and <name>.log.txt (always).
  Batches of more than one file are also bundled into an archive.

EXIT STATUS:
  0  every requested artifact was produced
  1  at least one PDF or DOCX step failed, or a fatal error occurred

ENVIRONMENT VARIABLES:
  TEX2DOC_CONFIG          Path to a TOML configuration file
  TEX2DOC_PDF_COMPILER    PDF compiler executable (default: pdflatex)
  TEX2DOC_DOCX_CONVERTER  DOCX converter executable (default: pandoc)
  TEX2DOC_TIMEOUT         Per-tool timeout in seconds, 0 = none (default: 120)
  RUST_LOG                Overrides the log filter (e.g. latex2doc=debug)
"#;

/// Convert LaTeX sources to PDF and DOCX.
#[derive(Parser, Debug)]
#[command(
    name = "tex2doc",
    version,
    about = "Convert LaTeX sources to PDF and DOCX with pdflatex and pandoc",
    long_about = "Convert LaTeX text, files or whole folders to PDF (via a TeX engine such as \
pdflatex) and DOCX (via pandoc). Each file is compiled in its own scratch directory; a \
combined log is always written, and batches are bundled into a ZIP archive.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// TOML configuration file; flags override its values.
    #[arg(long, global = true, env = "TEX2DOC_CONFIG")]
    config: Option<PathBuf>,

    /// PDF compiler executable (name on PATH or full path).
    #[arg(long, global = true, env = "TEX2DOC_PDF_COMPILER")]
    pdf_compiler: Option<PathBuf>,

    /// DOCX converter executable (name on PATH or full path).
    #[arg(long, global = true, env = "TEX2DOC_DOCX_CONVERTER")]
    docx_converter: Option<PathBuf>,

    /// Flags passed to the PDF compiler, whitespace separated.
    #[arg(long, global = true, env = "TEX2DOC_PDF_FLAGS", allow_hyphen_values = true)]
    pdf_flags: Option<String>,

    /// Per-tool timeout in seconds (0 disables the limit).
    #[arg(long, global = true, env = "TEX2DOC_TIMEOUT")]
    timeout: Option<u64>,

    /// Skip the PDF step.
    #[arg(long, global = true, env = "TEX2DOC_NO_PDF")]
    no_pdf: bool,

    /// Skip the DOCX step.
    #[arg(long, global = true, env = "TEX2DOC_NO_DOCX")]
    no_docx: bool,

    /// Copy compiler scratch files (.aux, .toc, …) next to the outputs.
    #[arg(long, global = true, env = "TEX2DOC_KEEP_INTERMEDIATES")]
    keep_intermediates: bool,

    /// Output structured JSON instead of a human-readable report.
    #[arg(long, global = true, env = "TEX2DOC_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "TEX2DOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "TEX2DOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, global = true, env = "TEX2DOC_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert pasted LaTeX (stdin) or a single .tex file.
    Text {
        /// Source file; reads stdin when omitted or `-`.
        input: Option<PathBuf>,

        /// File name for stdin input (default: document.tex).
        #[arg(long)]
        name: Option<String>,

        /// Output directory.
        #[arg(short, long, env = "TEX2DOC_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,
    },

    /// Convert every .tex file in a folder.
    Dir {
        /// Folder containing the sources.
        input_dir: PathBuf,

        /// Output directory.
        #[arg(short, long, env = "TEX2DOC_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,

        /// Descend into sub-folders.
        #[arg(short, long)]
        recursive: bool,

        /// Archive file name for batches of more than one file.
        #[arg(long)]
        archive: Option<String>,
    },

    /// Convert an explicit list of .tex files.
    Files {
        /// Source files, converted in the given order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory.
        #[arg(short, long, env = "TEX2DOC_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,

        /// Archive file name for batches of more than one file.
        #[arg(long)]
        archive: Option<String>,
    },

    /// Verify that the configured tools can be found.
    Check,

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the effective configuration to a TOML file.
    Init {
        #[arg(default_value = "tex2doc.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration as TOML.
    Show,
}

/// JSON document for batch subcommands.
#[derive(Serialize)]
struct BatchReport<'a> {
    result: &'a BatchResult,
    delivery: &'a Delivery,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let is_batch = matches!(cli.command, Command::Dir { .. } | Command::Files { .. });
    let show_progress = is_batch && !g.quiet && !g.no_progress && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress || g.json {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Text {
            input,
            name,
            output_dir,
        } => {
            let config = build_config(g, progress_cb, |b| b)?;
            let job = match input.as_deref() {
                Some(path) if path != Path::new("-") => convert_file(path, output_dir, &config)
                    .await
                    .with_context(|| format!("Conversion of {} failed", path.display()))?,
                _ => {
                    let mut text = String::new();
                    io::stdin()
                        .read_to_string(&mut text)
                        .context("Failed to read LaTeX from stdin")?;
                    convert_text(&text, name.as_deref(), output_dir, &config)
                        .await
                        .context("Conversion failed")?
                }
            };
            let delivery = deliver(&[&job], output_dir, &config).context("Delivery failed")?;

            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&job).context("Failed to serialise output")?
                );
            } else {
                print_job(&job, g.quiet);
                if g.verbose {
                    eprintln!("{}", dim(&format!("{delivery:?}")));
                }
            }
            Ok(exit_code(job.is_success()))
        }

        Command::Dir {
            input_dir,
            output_dir,
            recursive,
            archive,
        } => {
            let config = build_config(g, progress_cb, |b| {
                let b = if *recursive { b.recursive(true) } else { b };
                match archive {
                    Some(name) => b.archive_name(name.clone()),
                    None => b,
                }
            })?;
            let batch = convert_directory(input_dir, output_dir, &config)
                .await
                .with_context(|| format!("Conversion of {} failed", input_dir.display()))?;
            finish_batch(&batch, output_dir, &config, g)
        }

        Command::Files {
            inputs,
            output_dir,
            archive,
        } => {
            let config = build_config(g, progress_cb, |b| match archive {
                Some(name) => b.archive_name(name.clone()),
                None => b,
            })?;
            let batch = convert_files(inputs, output_dir, &config)
                .await
                .context("Conversion failed")?;
            finish_batch(&batch, output_dir, &config, g)
        }

        Command::Check => {
            let config = build_config(g, None, |b| b)?;
            let checks = check_tools(&config);
            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&checks).context("Failed to serialise output")?
                );
            } else {
                for c in &checks {
                    let (mark, detail) = match (&c.resolved, c.enabled) {
                        (_, false) => (dim("–"), dim("disabled")),
                        (Some(p), true) => (green("✓"), p.display().to_string()),
                        (None, true) => (red("✗"), red("not found")),
                    };
                    println!(
                        "{} {:<15} {:<12} {}",
                        mark,
                        c.tool.to_string(),
                        c.program.display().to_string(),
                        detail
                    );
                }
            }
            let ok = checks.iter().all(|c| !c.enabled || c.available());
            Ok(exit_code(ok))
        }

        Command::Config { action } => {
            let config = build_config(g, None, |b| b)?;
            let toml = config.to_toml_string().context("Failed to render TOML")?;
            match action {
                ConfigAction::Show => print!("{toml}"),
                ConfigAction::Init { path, force } => {
                    if path.exists() && !force {
                        bail!(
                            "{} already exists; pass --force to overwrite",
                            path.display()
                        );
                    }
                    std::fs::write(path, toml)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    if !g.quiet {
                        eprintln!("{} wrote {}", green("✔"), bold(&path.display().to_string()));
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Map CLI args (over an optional TOML file) to `ConverterConfig`.
fn build_config(
    g: &GlobalArgs,
    progress: Option<ProgressCallback>,
    extra: impl FnOnce(ConverterConfigBuilder) -> ConverterConfigBuilder,
) -> Result<ConverterConfig> {
    let base = match &g.config {
        Some(path) => ConverterConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConverterConfig::default(),
    };

    let mut builder = ConverterConfigBuilder::from_config(base);
    if let Some(ref p) = g.pdf_compiler {
        builder = builder.pdf_compiler(p.clone());
    }
    if let Some(ref p) = g.docx_converter {
        builder = builder.docx_converter(p.clone());
    }
    if let Some(ref flags) = g.pdf_flags {
        builder = builder.pdf_flags(flags.split_whitespace());
    }
    if let Some(secs) = g.timeout {
        builder = builder.timeout_secs(secs);
    }
    if g.no_pdf {
        builder = builder.make_pdf(false);
    }
    if g.no_docx {
        builder = builder.make_docx(false);
    }
    if g.keep_intermediates {
        builder = builder.keep_intermediates(true);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    extra(builder).build().context("Invalid configuration")
}

fn finish_batch(
    batch: &BatchResult,
    output_dir: &Path,
    config: &ConverterConfig,
    g: &GlobalArgs,
) -> Result<ExitCode> {
    let delivery = deliver(&batch.jobs(), output_dir, config).context("Failed to package results")?;

    if g.json {
        let report = BatchReport {
            result: batch,
            delivery: &delivery,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise output")?
        );
    } else {
        print!("{}", batch.report());
        if !g.quiet {
            match &delivery {
                Delivery::Archive { path, entries } => eprintln!(
                    "{}  {} entries  →  {}",
                    green("✔"),
                    entries,
                    bold(&path.display().to_string())
                ),
                Delivery::Separate { log, .. } => {
                    eprintln!("   log  →  {}", bold(&log.display().to_string()))
                }
                Delivery::Empty => eprintln!("{}", dim("nothing converted")),
            }
        }
    }
    Ok(exit_code(!batch.stats.has_failures()))
}

fn print_job(job: &JobResult, quiet: bool) {
    let line = |label: &str, outcome: &StepOutcome, path: &Option<PathBuf>| {
        match (outcome.error(), path) {
            (Some(e), _) => println!("{} {:<5} {}", red("✗"), label, red(&e.to_string())),
            (None, Some(p)) => println!("{} {:<5} {}", green("✓"), label, p.display()),
            (None, None) if !quiet => println!("{} {:<5} {}", dim("–"), label, dim("skipped")),
            (None, None) => {}
        }
    };
    line("PDF", &job.pdf, &job.pdf_path);
    line("DOCX", &job.docx, &job.docx_path);
    if let Some(ref summary) = job.error_summary {
        println!("  {}", red(summary));
    }
    println!("  {:<5} {}", "log", job.log_path.display());
    if !quiet {
        eprintln!("{}", dim(&format!("{}ms total", job.duration_ms)));
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
