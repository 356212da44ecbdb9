//! Input collection: pasted LaTeX text or a `.tex` file on disk.
//!
//! No LaTeX structure is inspected. The only job of this stage is to hold
//! the raw text together with a file name that is safe to create inside a
//! working directory and to pass to the tools as a bare argument.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name used for pasted text when the caller gives none.
pub const DEFAULT_FILE_NAME: &str = "document.tex";

/// One LaTeX source document awaiting conversion.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    file_name: String,
    text: String,
    origin: Option<PathBuf>,
}

impl SourceDocument {
    /// Wrap pasted text. `file_name` defaults to [`DEFAULT_FILE_NAME`]; a
    /// missing `.tex` extension is added.
    ///
    /// # Errors
    /// [`ConvertError::EmptySource`] for blank text,
    /// [`ConvertError::InvalidFileName`] for names with path separators or a
    /// leading `-`.
    pub fn from_text(text: impl Into<String>, file_name: Option<&str>) -> Result<Self, ConvertError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ConvertError::EmptySource);
        }
        let file_name = normalise_file_name(file_name.unwrap_or(DEFAULT_FILE_NAME))?;
        Ok(Self {
            file_name,
            text,
            origin: None,
        })
    }

    /// Read a `.tex` file. Invalid UTF-8 is replaced rather than rejected.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::PathNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConvertError::SourceReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let raw_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ConvertError::InvalidFileName {
                name: path.display().to_string(),
                reason: "path has no file name".into(),
            })?;
        let file_name = normalise_file_name(&raw_name)?;
        debug!("Read source {} ({} bytes)", path.display(), bytes.len());

        // Tools run inside the job's working directory, so the origin must
        // not depend on the caller's cwd.
        let origin = std::path::absolute(path).map_err(|e| ConvertError::SourceReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            file_name,
            text: String::from_utf8_lossy(&bytes).into_owned(),
            origin: Some(origin),
        })
    }

    /// Replace the base name while keeping the `.tex` extension.
    pub fn with_name(mut self, name: &str) -> Result<Self, ConvertError> {
        self.file_name = normalise_file_name(name)?;
        Ok(self)
    }

    /// File name inside the working directory, e.g. `thesis.tex`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Base name shared by every artifact, e.g. `thesis`.
    pub fn name(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Originating file as an absolute path, `None` for pasted text.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Directory of the originating file, used to resolve `\input` and graphics.
    pub fn origin_dir(&self) -> Option<&Path> {
        self.origin
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Validate a user-supplied file name and ensure a `.tex`-style extension.
fn normalise_file_name(name: &str) -> Result<String, ConvertError> {
    let name = name.trim();
    let invalid = |reason: &str| ConvertError::InvalidFileName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Ok(DEFAULT_FILE_NAME.to_string());
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("must not contain path separators"));
    }
    if name.starts_with('-') {
        return Err(invalid("must not start with '-'"));
    }
    if name.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Ok(name.to_string()),
        _ => Ok(format!("{}.tex", name.trim_end_matches('.'))),
    }
}
