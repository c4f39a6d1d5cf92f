//! Input resolution: validate the PDG folder and list its page files.
//!
//! Only regular files directly inside the folder whose extension is `pdg`
//! (any ASCII case) are picked up; sub-directories are not searched. The
//! listing is sorted by file name before the numeric sort runs so that ties
//! resolve the same way on every file system.

use crate::config::SOURCE_EXTENSION;
use crate::error::Pdg2PdfError;
use crate::pipeline::sort::{sort_sources, SourceFile};
use std::path::Path;
use tracing::debug;

/// Check that `dir` exists and is a directory.
pub fn validate_input_dir(dir: &Path) -> Result<(), Pdg2PdfError> {
    if !dir.exists() {
        return Err(Pdg2PdfError::InputDirectoryMissing {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(Pdg2PdfError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}

/// True when `path` carries the PDG extension.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

/// List the PDG files in `dir` in reading order.
///
/// # Errors
/// - [`Pdg2PdfError::InputDirectoryMissing`] / [`Pdg2PdfError::NotADirectory`]
/// - [`Pdg2PdfError::InputUnreadable`] if the listing fails
/// - [`Pdg2PdfError::NoMatchingFiles`] if no file matches
pub fn scan_sources(dir: &Path) -> Result<Vec<SourceFile>, Pdg2PdfError> {
    validate_input_dir(dir)?;

    let unreadable = |source: std::io::Error| Pdg2PdfError::InputUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if path.is_file() && is_source_file(&path) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(Pdg2PdfError::NoMatchingFiles {
            path: dir.to_path_buf(),
        });
    }

    paths.sort();
    let mut files: Vec<SourceFile> = paths.into_iter().map(SourceFile::new).collect();
    sort_sources(&mut files);

    debug!("Found {} PDG files in {}", files.len(), dir.display());
    Ok(files)
}
