//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as the batch driver works through each source file. Callers can
//! forward them to a terminal progress bar, a GUI, or a log without the
//! library knowing how the host application reports progress.
//!
//! # Example
//!
//! ```rust
//! use latex2doc::{BatchProgressCallback, ConverterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, name: &str, success: bool) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} ({})", index, total, name, if success { "ok" } else { "failed" });
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch driver as it processes each source file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Files are processed one at a time, so calls never
/// overlap, but implementations must still be `Send + Sync` to live inside a
/// cloneable [`crate::config::ConverterConfig`].
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before the first file is converted.
    ///
    /// # Arguments
    /// * `total_files` — number of source files that will be processed
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before the tools are invoked for a file.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the batch
    /// * `total` — total files in the batch
    /// * `name`  — source file name
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file has been attempted.
    ///
    /// `success` is false if any enabled step failed or the job aborted.
    fn on_file_complete(&self, index: usize, total: usize, name: &str, success: bool) {
        let _ = (index, total, name, success);
    }

    /// Called once after every file has been attempted.
    ///
    /// # Arguments
    /// * `total_files`   — files in the batch
    /// * `success_count` — files whose enabled steps all succeeded
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
