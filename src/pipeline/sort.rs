//! Reading order: sort PDG files by the first number in their name.
//!
//! Scanned books name their pages `00000001.pdg`, `page2.pdg`, `cov001.pdg`
//! and so on. A plain lexicographic sort puts `page10` before `page2`, so the
//! key is the integer value of the first digit run in the file stem. Stems
//! without digits get [`SortKey::Unnumbered`], which orders after every
//! number.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

static RE_DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Sort key derived from a file stem.
///
/// `Number` holds the digit run with leading zeros stripped, so runs of any
/// length compare by exact integer value without overflowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Number(String),
    Unnumbered,
}

impl SortKey {
    /// Derive the key from a file stem (or any name).
    pub fn from_name(name: &str) -> Self {
        match RE_DIGIT_RUN.find(name) {
            Some(m) => {
                let digits = m.as_str().trim_start_matches('0');
                SortKey::Number(if digits.is_empty() {
                    "0".to_string()
                } else {
                    digits.to_string()
                })
            }
            None => SortKey::Unnumbered,
        }
    }

    /// The numeric value, when there is one and it fits in a `u64`.
    pub fn value(&self) -> Option<u64> {
        match self {
            SortKey::Number(digits) => digits.parse().ok(),
            SortKey::Unnumbered => None,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (SortKey::Number(_), SortKey::Unnumbered) => Ordering::Less,
            (SortKey::Unnumbered, SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Unnumbered, SortKey::Unnumbered) => Ordering::Equal,
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Integer value of the first digit run in `name`, if any.
///
/// Returns `None` both for names without digits and for runs too large for a
/// `u64`; use [`SortKey`] for ordering.
pub fn extract_number(name: &str) -> Option<u64> {
    SortKey::from_name(name).value()
}

/// One PDG file found in the input folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    key: SortKey,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = SortKey::from_name(&stem_of(&path));
        Self { path, key }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &SortKey {
        &self.key
    }

    /// File name for log lines and error messages.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File name without the extension.
    pub fn stem(&self) -> String {
        stem_of(&self.path)
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Put files into reading order. The sort is stable: files with equal keys
/// keep the order they were given in.
pub fn sort_sources(files: &mut [SourceFile]) {
    files.sort_by(|a, b| a.key.cmp(&b.key));
}
