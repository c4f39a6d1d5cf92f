//! # pdg2pdf
//!
//! Batch-convert a folder of PDG page images (the format used by scanned
//! e-book collections) into a single PDF.
//!
//! PDG is not something image libraries read directly, so every page goes
//! through an external converter first (macOS `sips` by default), which
//! writes an intermediate TIFF. The TIFF pages are then merged into one PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder/*.pdg
//!  │
//!  ├─ 1. Scan     list *.pdg, sort by first number in the name
//!  ├─ 2. Convert  sips -s format tiff <page> --out <tmp>/<stem>.tiff
//!  │              (one page at a time; failures are skipped)
//!  ├─ 3. Merge    TIFF pages → PDF, one page per image, in order
//!  └─ 4. Cleanup  temp directory removed on every exit path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdg2pdf::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("scans/book", "book.pdf", &config).await?;
//!     eprintln!(
//!         "{}/{} pages",
//!         output.stats.converted_pages, output.stats.total_files
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdg2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, inspect};
pub use error::{PageError, Pdg2PdfError};
pub use output::{ConversionOutput, ConversionStats, PageResult};
pub use pipeline::raster::{CommandConverter, RasterConverter};
pub use pipeline::sort::{extract_number, SourceFile};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
