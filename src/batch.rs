//! Folder and multi-file conversion.
//!
//! The batch driver enumerates sources, then runs one conversion job per
//! source, strictly one after another, in enumeration order. A job that
//! cannot even start (unreadable file, unusable name) becomes a
//! [`BatchEntry::Aborted`] entry; it never stops the remaining files.
//!
//! Base names are made unique within a batch (`intro`, `intro-2`, …) so that
//! per-file outputs and archive entries never overwrite each other.

use crate::config::ConverterConfig;
use crate::convert::{convert_source, ensure_tools};
use crate::error::ConvertError;
use crate::output::{BatchEntry, BatchResult, BatchStats, JobResult};
use crate::pipeline::source::SourceDocument;
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every source file in `input_dir`.
///
/// Files are matched by [`ConverterConfig::source_extension`]
/// (case-insensitive) and, with [`ConverterConfig::recursive`], in
/// sub-directories too.
///
/// # Errors
/// Fatal errors only, all raised before any tool runs: the directory is
/// missing or unreadable, it holds no source files, no enabled tool is
/// available, or `output_dir` cannot be created.
pub async fn convert_directory(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<BatchResult, ConvertError> {
    let input_dir = input_dir.as_ref();
    let sources = discover_sources(input_dir, config).await?;
    info!(
        "Found {} .{} file(s) in {}",
        sources.len(),
        config.source_extension,
        input_dir.display()
    );
    let mut result = convert_files(&sources, output_dir, config).await?;
    result.input_dir = Some(input_dir.to_path_buf());
    Ok(result)
}

/// Blocking wrapper around [`convert_directory`].
pub fn convert_directory_sync(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<BatchResult, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_directory(input_dir, output_dir, config))
}

/// Convert an explicit list of source files, in the given order.
///
/// An empty list yields an empty result; the no-files error is specific to
/// folder discovery.
pub async fn convert_files(
    paths: &[PathBuf],
    output_dir: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<BatchResult, ConvertError> {
    let start = Instant::now();
    let output_dir = output_dir.as_ref();

    ensure_tools(config)?;
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    let total = paths.len();
    let callback = config.progress_callback.as_ref();
    if let Some(cb) = callback {
        cb.on_batch_start(total);
    }

    let mut names = UniqueNames::default();
    let mut entries = Vec::with_capacity(total);
    let mut stats = BatchStats::default();
    let mut success_count = 0;

    for (i, path) in paths.iter().enumerate() {
        let index = i + 1;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if let Some(cb) = callback {
            cb.on_file_start(index, total, &display_name);
        }
        info!("[{}/{}] {}", index, total, display_name);

        let entry = match run_job(path, output_dir, config, &mut names).await {
            Ok(job) => BatchEntry::Completed(job),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                BatchEntry::Aborted {
                    source: path.clone(),
                    error: e.to_string(),
                }
            }
        };

        let success = entry.job().is_some_and(|j| j.is_success());
        if success {
            success_count += 1;
        }
        if let Some(cb) = callback {
            cb.on_file_complete(index, total, &display_name, success);
        }
        stats.record(&entry, config.make_pdf, config.make_docx);
        entries.push(entry);
    }

    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    if let Some(cb) = callback {
        cb.on_batch_complete(total, success_count);
    }
    info!(
        "Batch done: PDF {} ok / {} failed, DOCX {} ok / {} failed in {}ms",
        stats.pdf_succeeded,
        stats.pdf_failed,
        stats.docx_succeeded,
        stats.docx_failed,
        stats.total_duration_ms
    );

    Ok(BatchResult {
        input_dir: None,
        output_dir: output_dir.to_path_buf(),
        entries,
        stats,
    })
}

/// List source files in `dir`, sorted by path.
///
/// # Errors
/// [`ConvertError::PathNotFound`], [`ConvertError::NotADirectory`],
/// [`ConvertError::PermissionDenied`] or [`ConvertError::SourceReadFailed`]
/// for an unusable directory and [`ConvertError::NoSourceFiles`] when
/// nothing matches.
pub async fn discover_sources(
    dir: &Path,
    config: &ConverterConfig,
) -> Result<Vec<PathBuf>, ConvertError> {
    let meta = tokio::fs::metadata(dir)
        .await
        .map_err(|e| dir_error(dir, e))?;
    if !meta.is_dir() {
        return Err(ConvertError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    tokio::fs::read_dir(dir)
        .await
        .map_err(|e| dir_error(dir, e))?;

    let extension = config.source_extension.trim_start_matches('.');
    let file_glob = format!("*.{}", Pattern::escape(extension));
    let pattern = if config.recursive {
        format!("{}/**/{}", Pattern::escape(&dir.to_string_lossy()), file_glob)
    } else {
        format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), file_glob)
    };
    debug!("Discovering sources with pattern {}", pattern);

    // glob walks the tree with std::fs.
    let mut found = tokio::task::spawn_blocking(move || glob_files(&pattern))
        .await
        .map_err(|e| ConvertError::Internal(format!("source discovery task failed: {e}")))??;
    found.sort();

    if found.is_empty() {
        return Err(ConvertError::NoSourceFiles {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }
    Ok(found)
}

fn glob_files(pattern: &str) -> Result<Vec<PathBuf>, ConvertError> {
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let files = glob::glob_with(pattern, options)
        .map_err(|e| ConvertError::Internal(format!("invalid glob '{pattern}': {e}")))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    Ok(files)
}

fn dir_error(dir: &Path, e: std::io::Error) -> ConvertError {
    let path = dir.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory => {
            ConvertError::PathNotFound { path }
        }
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied { path },
        _ => ConvertError::SourceReadFailed { path, source: e },
    }
}

async fn run_job(
    path: &Path,
    output_dir: &Path,
    config: &ConverterConfig,
    names: &mut UniqueNames,
) -> Result<JobResult, ConvertError> {
    let source = SourceDocument::from_file(path).await?;
    let unique = names.claim(source.file_name());
    let source = if unique != source.file_name() {
        debug!("Renaming {} to {} to avoid a clash", source.file_name(), unique);
        source.with_name(&unique)?
    } else {
        source
    };
    convert_source(&source, output_dir, config).await
}

/// Hands out file names whose stems are unique (case-insensitively).
#[derive(Debug, Default)]
struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    fn claim(&mut self, file_name: &str) -> String {
        let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, "tex"));
        let mut candidate = stem.to_string();
        let mut n = 2;
        while !self.taken.insert(candidate.to_lowercase()) {
            candidate = format!("{stem}-{n}");
            n += 1;
        }
        format!("{candidate}.{ext}")
    }
}
