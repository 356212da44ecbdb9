//! Integration tests driving the public API with a scripted `ToolRunner`.
//!
//! No TeX distribution or pandoc is needed: the fake runner writes the
//! artifact a real tool would produce, or fails like one when the source
//! contains `\broken`.

use async_trait::async_trait;
use latex2doc::{
    archive_bytes, convert_directory, convert_file, convert_files, convert_text, deliver,
    BatchEntry, BatchProgressCallback, ConvertError, ConverterConfig, Delivery, StepError,
    StepStatus, ToolInvocation, ToolKind, ToolOutput, ToolRunner,
};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeRunner {
    /// (tool, source file name) per invocation, in call order.
    calls: Mutex<Vec<(ToolKind, String)>>,
    /// Programs that "do not exist".
    missing: Vec<PathBuf>,
}

impl FakeRunner {
    fn with_missing(program: &str) -> Self {
        Self {
            missing: vec![PathBuf::from(program)],
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls_for(&self, tool: ToolKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == tool)
            .count()
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(&self, inv: &ToolInvocation) -> Result<ToolOutput, StepError> {
        let source_name = inv
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .find(|a| a.ends_with(".tex"))
            .expect("source file argument");
        self.calls
            .lock()
            .unwrap()
            .push((inv.tool, source_name.clone()));

        if self.missing.contains(&inv.program) {
            return Err(StepError::ExecutableNotFound {
                tool: inv.tool,
                program: inv.program.display().to_string(),
            });
        }

        let text = std::fs::read_to_string(inv.working_dir.join(&source_name)).unwrap();
        if inv.tool == ToolKind::PdfCompiler && text.contains("\\broken") {
            return Ok(ToolOutput {
                exit_code: Some(1),
                stdout: "! Undefined control sequence.\nl.2 \\broken\n".into(),
                stderr: String::new(),
            });
        }

        std::fs::write(&inv.expected_output, format!("{} of {}", inv.tool, text)).unwrap();
        Ok(ToolOutput {
            exit_code: Some(0),
            stdout: format!("Output written on {}", inv.expected_output.display()),
            stderr: String::new(),
        })
    }

    fn locate(&self, program: &Path) -> Option<PathBuf> {
        (!self.missing.iter().any(|m| m == program)).then(|| program.to_path_buf())
    }
}

fn config_with(runner: Arc<FakeRunner>) -> ConverterConfig {
    ConverterConfig::builder().runner(runner).build().unwrap()
}

fn write_sources(dir: &Path, sources: &[(&str, &str)]) {
    for (name, text) in sources {
        std::fs::write(dir.join(name), text).unwrap();
    }
}

fn status_lines(log: &str) -> Vec<String> {
    log.lines()
        .filter(|l| l.starts_with('['))
        .map(str::to_string)
        .collect()
}

// ── Single job ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_compile_produces_artifact_and_log() {
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::default());
    let config = config_with(runner.clone());

    let job = convert_text("\\documentclass{article}", None, out.path(), &config)
        .await
        .unwrap();

    let pdf = std::fs::read(job.pdf_path.as_ref().unwrap()).unwrap();
    assert!(!pdf.is_empty());
    assert!(job.log.contains("--- pdflatex log ---"));
    assert!(job.log.contains("--- pandoc log ---"));
    assert!(job.log.contains("Output written on"));
    assert!(job.is_success());
    assert_eq!(job.artifacts().len(), 3);
}

#[tokio::test]
async fn compiler_error_keeps_docx_and_log() {
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::default());
    let config = config_with(runner.clone());

    let job = convert_text("\\broken", Some("bad.tex"), out.path(), &config)
        .await
        .unwrap();

    assert!(job.pdf_path.is_none());
    assert!(!out.path().join("bad.pdf").exists());
    assert!(matches!(
        job.pdf.status,
        StepStatus::Failed(StepError::CompilationFailed {
            exit_code: Some(1),
            ..
        })
    ));
    assert!(job.docx.succeeded());
    assert!(out.path().join("bad.docx").exists());
    assert!(out.path().join("bad.log.txt").exists());
    assert!(job.log.contains("[pdflatex] failed:"));
    assert!(job.error_summary.unwrap().contains("Undefined control sequence"));
    assert_eq!(runner.call_count(), 2);
}

#[tokio::test]
async fn misconfigured_pdf_tool_still_attempts_docx() {
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::with_missing("/opt/missing/pdflatex"));
    let config = ConverterConfig::builder()
        .pdf_compiler("/opt/missing/pdflatex")
        .runner(runner.clone())
        .build()
        .unwrap();

    let job = convert_text("hello", None, out.path(), &config)
        .await
        .unwrap();

    assert!(matches!(
        job.pdf.error(),
        Some(StepError::ExecutableNotFound { .. })
    ));
    assert!(job.docx.succeeded());
    assert_eq!(runner.calls_for(ToolKind::DocxConverter), 1);
}

#[tokio::test]
async fn no_available_tools_is_fatal_before_any_invocation() {
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner {
        missing: vec![PathBuf::from("pdflatex"), PathBuf::from("pandoc")],
        ..FakeRunner::default()
    });
    let config = config_with(runner.clone());

    let err = convert_text("hello", None, out.path(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::NoToolsAvailable { .. }));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn status_lines_are_stable_across_runs() {
    let runner = Arc::new(FakeRunner::default());
    let config = config_with(runner);

    let mut seen = Vec::new();
    for _ in 0..2 {
        let out = tempfile::tempdir().unwrap();
        let job = convert_text("\\broken", Some("same"), out.path(), &config)
            .await
            .unwrap();
        seen.push(status_lines(&job.log));
    }
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0].len(), 2);
}

/// Succeeds only if `chapter.tex` is reachable through `TEXINPUTS`, with
/// entries resolved against the working directory the way TeX resolves them.
struct SearchPathRunner;

#[async_trait]
impl ToolRunner for SearchPathRunner {
    async fn run(&self, inv: &ToolInvocation) -> Result<ToolOutput, StepError> {
        let search = inv
            .env
            .iter()
            .find(|(k, _)| k == "TEXINPUTS")
            .map(|(_, v)| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        let found = std::env::split_paths(&search)
            .filter(|dir| !dir.as_os_str().is_empty())
            .any(|dir| inv.working_dir.join(dir).join("chapter.tex").is_file());
        if !found {
            return Ok(ToolOutput {
                exit_code: Some(1),
                stdout: format!(
                    "! LaTeX Error: File `chapter.tex' not found.\nTEXINPUTS={search}\n"
                ),
                stderr: String::new(),
            });
        }
        std::fs::write(&inv.expected_output, b"%PDF").unwrap();
        Ok(ToolOutput {
            exit_code: Some(0),
            ..ToolOutput::default()
        })
    }

    fn locate(&self, program: &Path) -> Option<PathBuf> {
        Some(program.to_path_buf())
    }
}

#[tokio::test]
async fn relative_source_path_resolves_inputs_from_its_directory() {
    let cwd = std::env::current_dir().unwrap();
    let paper = tempfile::tempdir_in(&cwd).unwrap();
    let out = tempfile::tempdir().unwrap();
    write_sources(
        paper.path(),
        &[("main.tex", "\\input{chapter}"), ("chapter.tex", "Chapter")],
    );
    let relative = paper.path().strip_prefix(&cwd).unwrap().join("main.tex");
    let config = ConverterConfig::builder()
        .runner(Arc::new(SearchPathRunner))
        .make_docx(false)
        .build()
        .unwrap();

    let job = convert_file(&relative, out.path(), &config).await.unwrap();

    assert!(job.pdf.succeeded(), "{}", job.log);
    assert!(out.path().join("main.pdf").exists());
    assert!(job.source_path.unwrap().is_absolute());
}

// ── Batches ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_counts_failures_per_file() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_sources(
        input.path(),
        &[
            ("a.tex", "fine"),
            ("b.tex", "\\broken"),
            ("c.tex", "fine"),
            ("d.tex", "\\broken"),
            ("e.tex", "fine"),
        ],
    );
    let runner = Arc::new(FakeRunner::default());
    let config = config_with(runner.clone());

    let batch = convert_directory(input.path(), out.path(), &config)
        .await
        .unwrap();

    assert_eq!(batch.stats.total_files, 5);
    assert_eq!(batch.stats.pdf_failed, 2);
    assert_eq!(batch.stats.pdf_succeeded, 3);
    assert_eq!(batch.stats.docx_succeeded, 5);
    assert!(batch.stats.has_failures());
    assert_eq!(runner.call_count(), 10);

    let names: Vec<String> = batch.entries.iter().map(BatchEntry::name).collect();
    assert_eq!(names, vec!["a", "b", "c", "d", "e"]);

    let report = batch.report();
    assert!(report.contains("FAILED"));
    assert!(report.contains("5 files"));
}

#[tokio::test]
async fn missing_directory_invokes_nothing() {
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::default());
    let config = config_with(runner.clone());

    let err = convert_directory("/definitely/not/a/folder", out.path(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::PathNotFound { .. }));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn unreadable_file_aborts_only_itself() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_sources(input.path(), &[("ok.tex", "fine")]);
    let runner = Arc::new(FakeRunner::default());
    let config = config_with(runner.clone());

    let paths = vec![input.path().join("gone.tex"), input.path().join("ok.tex")];
    let batch = convert_files(&paths, out.path(), &config).await.unwrap();

    assert!(matches!(batch.entries[0], BatchEntry::Aborted { .. }));
    assert!(batch.entries[1].job().unwrap().is_success());
    assert_eq!(batch.stats.aborted, 1);
    assert_eq!(batch.stats.pdf_failed, 1);
    assert_eq!(batch.stats.pdf_succeeded, 1);
}

#[tokio::test]
async fn duplicate_base_names_do_not_overwrite() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    std::fs::create_dir(input.path().join("one")).unwrap();
    std::fs::create_dir(input.path().join("two")).unwrap();
    write_sources(&input.path().join("one"), &[("main.tex", "first")]);
    write_sources(&input.path().join("two"), &[("main.tex", "second")]);
    let config = ConverterConfig::builder()
        .runner(Arc::new(FakeRunner::default()))
        .recursive(true)
        .build()
        .unwrap();

    let batch = convert_directory(input.path(), out.path(), &config)
        .await
        .unwrap();

    let names: Vec<String> = batch.entries.iter().map(BatchEntry::name).collect();
    assert_eq!(names, vec!["main", "main-2"]);
    let second = std::fs::read_to_string(out.path().join("main-2.pdf")).unwrap();
    assert!(second.contains("second"));
}

#[tokio::test]
async fn progress_callback_sees_every_file() {
    #[derive(Default)]
    struct Counter {
        started: AtomicUsize,
        completed: AtomicUsize,
        succeeded: AtomicUsize,
    }
    impl BatchProgressCallback for Counter {
        fn on_file_start(&self, _: usize, _: usize, _: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_file_complete(&self, _: usize, _: usize, _: &str, success: bool) {
            self.completed.fetch_add(1, Ordering::SeqCst);
            if success {
                self.succeeded.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_sources(input.path(), &[("a.tex", "fine"), ("b.tex", "\\broken")]);
    let counter = Arc::new(Counter::default());
    let config = ConverterConfig::builder()
        .runner(Arc::new(FakeRunner::default()))
        .progress_callback(counter.clone())
        .build()
        .unwrap();

    convert_directory(input.path(), out.path(), &config)
        .await
        .unwrap();

    assert_eq!(counter.started.load(Ordering::SeqCst), 2);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    assert_eq!(counter.succeeded.load(Ordering::SeqCst), 1);
}

// ── Delivery ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn archive_contains_every_artifact_unchanged() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_sources(
        input.path(),
        &[("a.tex", "fine"), ("b.tex", "\\broken"), ("c.tex", "fine")],
    );
    let config = config_with(Arc::new(FakeRunner::default()));

    let batch = convert_directory(input.path(), out.path(), &config)
        .await
        .unwrap();
    let jobs = batch.jobs();
    let artifacts: Vec<&Path> = jobs.iter().flat_map(|j| j.artifacts()).collect();
    assert_eq!(artifacts.len(), 8);

    let delivery = deliver(&jobs, out.path(), &config).unwrap();
    assert_eq!(
        delivery,
        Delivery::Archive {
            path: out.path().join("converted_latex.zip"),
            entries: 8
        }
    );

    let mut zip = zip::ZipArchive::new(Cursor::new(archive_bytes(&jobs).unwrap())).unwrap();
    assert_eq!(zip.len(), artifacts.len());
    for path in artifacts {
        let name = path.file_name().unwrap().to_string_lossy();
        let mut entry = zip.by_name(&name).unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, std::fs::read(path).unwrap(), "{name}");
    }
}
