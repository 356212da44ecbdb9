//! Result packaging: hand out one job's files directly, or bundle many into
//! a ZIP archive.
//!
//! Every artifact is stored under its bare file name (`<name>.pdf`,
//! `<name>.docx`, `<name>.log.txt`). Base names are unique within a batch,
//! so entry names never collide.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::output::JobResult;
use serde::Serialize;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// How results are offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    /// Nothing was converted.
    Empty,
    /// A single job: its files are handed out individually.
    Separate {
        pdf: Option<PathBuf>,
        docx: Option<PathBuf>,
        log: PathBuf,
    },
    /// Several jobs bundled into one archive.
    Archive { path: PathBuf, entries: usize },
}

/// Decide how to present `jobs`, writing an archive when there is more than
/// one.
///
/// The archive goes to `output_dir/<archive_name>`, replacing any previous
/// archive of the same name.
pub fn deliver(
    jobs: &[&JobResult],
    output_dir: &Path,
    config: &ConverterConfig,
) -> Result<Delivery, ConvertError> {
    match jobs {
        [] => Ok(Delivery::Empty),
        [job] => Ok(Delivery::Separate {
            pdf: job.pdf_path.clone(),
            docx: job.docx_path.clone(),
            log: job.log_path.clone(),
        }),
        _ => {
            let path = output_dir.join(&config.archive_name);
            let entries = write_archive(jobs, &path)?;
            Ok(Delivery::Archive { path, entries })
        }
    }
}

/// Write every artifact of `jobs` into a ZIP file at `dest`.
///
/// Returns the number of entries written.
pub fn write_archive(jobs: &[&JobResult], dest: &Path) -> Result<usize, ConvertError> {
    let fail = |detail: String| ConvertError::ArchiveFailed {
        path: dest.to_path_buf(),
        detail,
    };
    let file = std::fs::File::create(dest).map_err(|e| ConvertError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;
    let (_, entries) = build(file, jobs).map_err(fail)?;
    info!("Wrote {} ({} entries)", dest.display(), entries);
    Ok(entries)
}

/// Build the archive in memory.
pub fn archive_bytes(jobs: &[&JobResult]) -> Result<Vec<u8>, ConvertError> {
    let (cursor, _) = build(Cursor::new(Vec::new()), jobs).map_err(|detail| {
        ConvertError::ArchiveFailed {
            path: PathBuf::from("<memory>"),
            detail,
        }
    })?;
    Ok(cursor.into_inner())
}

fn build<W: Write + Seek>(sink: W, jobs: &[&JobResult]) -> Result<(W, usize), String> {
    let mut zip = ZipWriter::new(sink);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0;

    for path in jobs.iter().flat_map(|job| job.artifacts()) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("artifact without file name: {}", path.display()))?;
        let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;

        zip.start_file(name.as_str(), options)
            .map_err(|e| format!("{name}: {e}"))?;
        zip.write_all(&bytes).map_err(|e| format!("{name}: {e}"))?;
        debug!("Archived {} ({} bytes)", name, bytes.len());
        entries += 1;
    }

    let sink = zip.finish().map_err(|e| e.to_string())?;
    Ok((sink, entries))
}
