//! Result types returned by a conversion run.

use crate::error::{PageError, Pdg2PdfError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome for one PDG file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed reading position after sorting.
    pub position: usize,
    /// File name of the PDG source.
    pub source_name: String,
    /// `None` when the page made it into the PDF.
    pub error: Option<PageError>,
    /// Wall-clock time spent in the converter.
    pub duration_ms: u64,
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_files: usize,
    pub converted_pages: usize,
    pub failed_pages: usize,
    pub total_duration_ms: u64,
    pub convert_duration_ms: u64,
    pub assemble_duration_ms: u64,
    /// Size of the written PDF.
    pub output_bytes: u64,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub output_path: PathBuf,
    /// One entry per PDG file, in reading order.
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Pages that were skipped, in reading order.
    pub fn failures(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.error.is_some())
    }

    /// Treat any skipped page as an error.
    pub fn into_result(self) -> Result<Self, Pdg2PdfError> {
        if self.stats.failed_pages > 0 {
            Err(Pdg2PdfError::PartialFailure {
                success: self.stats.converted_pages,
                failed: self.stats.failed_pages,
                total: self.stats.total_files,
            })
        } else {
            Ok(self)
        }
    }
}
