//! Error types for the pdg2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdg2PdfError`] — **Fatal**: the run cannot proceed at all (missing
//!   input directory, nothing to convert, output not writable). Returned as
//!   `Err(Pdg2PdfError)` from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: the external converter failed on a
//!   single PDG file but the other pages are fine. Stored inside
//!   [`crate::output::PageResult`]; the file is skipped and the run goes on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdg2pdf library.
///
/// Per-file failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdg2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input directory does not exist.
    #[error("PDG folder not found: '{path}'\nCheck the path exists and is a directory.")]
    InputDirectoryMissing { path: PathBuf },

    /// The input path exists but is a file, not a directory.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// The directory listing could not be read.
    #[error("Failed to read PDG folder '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory holds no `*.pdg` files.
    #[error("No PDG files found in '{path}'")]
    NoMatchingFiles { path: PathBuf },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The temporary workspace could not be created.
    #[error("Failed to create temporary workspace: {source}")]
    WorkspaceFailed {
        #[source]
        source: std::io::Error,
    },

    /// Every PDG file failed conversion; there is nothing to assemble.
    #[error("None of the {total} PDG files could be converted.\nFirst error: {first_error}")]
    AllConversionsFailed { total: usize, first_error: String },

    /// Some pages converted but at least one failed.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any skipped page as an error.
    #[error("{failed}/{total} PDG files failed to convert")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// A raster page could not be decoded or the PDF could not be serialised.
    #[error("PDF assembly failed: {detail}")]
    AssemblyFailed { detail: String },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single PDG file.
///
/// The page is left out of the PDF; the run continues unless every page fails.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The converter ran and exited unsuccessfully.
    #[error("{file}: converter exited with {status}: {stderr}")]
    ConverterFailed {
        file: String,
        status: String,
        stderr: String,
    },

    /// The converter process could not be started.
    #[error("{file}: could not run converter: {detail}")]
    SpawnFailed { file: String, detail: String },

    /// The converter reported success but wrote nothing.
    #[error("{file}: converter produced no output at '{path}'")]
    MissingOutput { file: String, path: PathBuf },
}

impl PageError {
    /// Name of the PDG file this error belongs to.
    pub fn file(&self) -> &str {
        match self {
            PageError::ConverterFailed { file, .. }
            | PageError::SpawnFailed { file, .. }
            | PageError::MissingOutput { file, .. } => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Pdg2PdfError::PartialFailure {
            success: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn all_conversions_failed_display() {
        let e = Pdg2PdfError::AllConversionsFailed {
            total: 3,
            first_error: "page1.pdg: converter exited with 1: boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 PDG files"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn converter_failed_surfaces_stderr_verbatim() {
        let e = PageError::ConverterFailed {
            file: "page7.pdg".into(),
            status: "exit status: 13".into(),
            stderr: "Error: Unable to render source image".into(),
        };
        assert_eq!(e.file(), "page7.pdg");
        assert!(e.to_string().contains("Error: Unable to render source image"));
    }

    #[test]
    fn missing_directory_display() {
        let e = Pdg2PdfError::InputDirectoryMissing {
            path: PathBuf::from("/no/such/dir"),
        };
        assert!(e.to_string().contains("/no/such/dir"));
    }
}
