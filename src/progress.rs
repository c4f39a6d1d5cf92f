//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the PDG files in reading order.
//!
//! # Example
//!
//! ```rust
//! use pdg2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     converted: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, position: usize, total: usize, source_name: &str) {
//!         self.converted.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{position}/{total} {source_name}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     converted: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each PDG file.
///
/// Pages are converted one at a time, so events for different pages never
/// overlap; the `Send + Sync` bound lets the callback live inside a
/// shareable [`crate::ConversionConfig`]. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after the input folder was scanned and sorted.
    ///
    /// # Arguments
    /// * `total_files` — number of PDG files that will be converted
    fn on_conversion_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before the converter runs on a file.
    ///
    /// # Arguments
    /// * `position`    — 1-indexed reading position
    /// * `total`       — total PDG files
    /// * `source_name` — file name of the PDG file
    fn on_page_start(&self, position: usize, total: usize, source_name: &str) {
        let _ = (position, total, source_name);
    }

    /// Called when a file was converted to a raster page.
    fn on_page_complete(&self, position: usize, total: usize, source_name: &str) {
        let _ = (position, total, source_name);
    }

    /// Called when a file failed and will be left out of the PDF.
    ///
    /// # Arguments
    /// * `error` — human-readable error, including the converter's stderr
    fn on_page_error(&self, position: usize, total: usize, error: String) {
        let _ = (position, total, error);
    }

    /// Called before the converted pages are merged into the PDF.
    fn on_assembly_start(&self, page_count: usize) {
        let _ = page_count;
    }

    /// Called once after the PDF was written.
    ///
    /// # Arguments
    /// * `total_files`   — PDG files attempted
    /// * `success_count` — pages that made it into the PDF
    fn on_conversion_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
