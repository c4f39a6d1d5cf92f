//! Scratch directory for the intermediate TIFF pages.
//!
//! A [`Workspace`] owns a `tempfile::TempDir`. The directory and everything
//! the converter wrote into it is removed when the workspace is closed or
//! dropped, which covers early returns, `?` propagation and panics alike.

use crate::config::RASTER_FORMAT;
use crate::error::Pdg2PdfError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Private temporary directory holding the converted pages of one run.
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    used_names: HashSet<String>,
}

impl Workspace {
    /// Create a uniquely named directory under the system temp dir.
    pub fn create() -> Result<Self, Pdg2PdfError> {
        let dir = tempfile::Builder::new()
            .prefix("pdg2pdf-")
            .tempdir()
            .map_err(|source| Pdg2PdfError::WorkspaceFailed { source })?;
        let path = dir.path().to_path_buf();
        debug!("Workspace: {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
            used_names: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reserve the output path for a page converted from `stem`.
    ///
    /// Returns `<stem>.tiff`, or `<stem>-<n>.tiff` when another page already
    /// claimed that name (e.g. `a.pdg` next to `a.PDG`).
    pub fn page_path(&mut self, stem: &str) -> PathBuf {
        let mut name = format!("{stem}.{RASTER_FORMAT}");
        let mut n = 1;
        while !self.used_names.insert(name.to_ascii_lowercase()) {
            name = format!("{stem}-{n}.{RASTER_FORMAT}");
            n += 1;
        }
        self.path.join(name)
    }

    /// Remove the directory now, reporting failure as a warning.
    pub fn close(mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!("Removed workspace {}", self.path.display()),
                Err(e) => warn!(
                    "Failed to remove workspace {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!("Failed to remove workspace {}: {}", self.path.display(), e);
            }
        }
    }
}
