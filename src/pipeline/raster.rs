//! Page conversion: PDG → TIFF through an external converter.
//!
//! ## Why spawn_blocking?
//!
//! [`RasterConverter::convert`] blocks until the child process exits.
//! `tokio::task::spawn_blocking` keeps that wait off the async worker
//! threads. Each conversion is awaited before the next one starts, so pages
//! are converted strictly one at a time and in reading order.
//!
//! ## Failure policy
//!
//! A failed page is logged, reported to the progress callback and skipped.
//! Only the caller decides whether zero successful pages is fatal.

use crate::config::{ConversionConfig, RASTER_FORMAT};
use crate::error::{PageError, Pdg2PdfError};
use crate::output::PageResult;
use crate::pipeline::sort::SourceFile;
use crate::pipeline::workspace::Workspace;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Converts one source page into one raster file.
///
/// Implementations run synchronously; the pipeline calls them from the
/// blocking pool.
pub trait RasterConverter: Send + Sync {
    /// Short name for logs (e.g. the program name).
    fn name(&self) -> &str;

    /// Write a TIFF rendering of `source` to `target`.
    fn convert(&self, source: &Path, target: &Path) -> Result<(), PageError>;
}

/// Runs `<program> -s format tiff <source> --out <target>`.
///
/// The argument layout is the one macOS `sips` expects.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: PathBuf,
    name: String,
}

impl CommandConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self { program, name }
    }

    /// The executable this converter spawns.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, source: &Path, target: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-s")
            .arg("format")
            .arg(RASTER_FORMAT)
            .arg(source)
            .arg("--out")
            .arg(target)
            .stdin(Stdio::null());
        cmd
    }
}

impl RasterConverter for CommandConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn convert(&self, source: &Path, target: &Path) -> Result<(), PageError> {
        let file = file_label(source);
        let output = self
            .command(source, target)
            .output()
            .map_err(|e| PageError::SpawnFailed {
                file: file.clone(),
                detail: format!("{} ({})", e, self.program().display()),
            })?;

        if !output.status.success() {
            return Err(PageError::ConverterFailed {
                file,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{}: {}", self.name, stdout.trim());
        }
        Ok(())
    }
}

/// A raster page that made it through conversion, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPage {
    /// 1-indexed reading position of the source file.
    pub position: usize,
    pub path: PathBuf,
}

/// Pick the converter: a pre-built one from the config, else a
/// [`CommandConverter`] for `config.converter_program`.
pub fn resolve_converter(config: &ConversionConfig) -> Arc<dyn RasterConverter> {
    match config.converter {
        Some(ref converter) => Arc::clone(converter),
        None => Arc::new(CommandConverter::new(&config.converter_program)),
    }
}

/// Convert every source file in order, skipping failures.
///
/// Returns one [`PageResult`] per source and the successfully converted
/// pages, both in reading order.
pub async fn convert_pages(
    sources: &[SourceFile],
    workspace: &mut Workspace,
    converter: &Arc<dyn RasterConverter>,
    config: &ConversionConfig,
) -> Result<(Vec<PageResult>, Vec<ConvertedPage>), Pdg2PdfError> {
    let total = sources.len();
    let mut results = Vec::with_capacity(total);
    let mut converted = Vec::with_capacity(total);

    for (idx, source) in sources.iter().enumerate() {
        let position = idx + 1;
        let name = source.name();
        let target = workspace.page_path(&source.stem());

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(position, total, &name);
        }

        let start = Instant::now();
        let outcome = {
            let converter = Arc::clone(converter);
            let src = source.path().to_path_buf();
            let dst = target.clone();
            tokio::task::spawn_blocking(move || converter.convert(&src, &dst))
                .await
                .map_err(|e| Pdg2PdfError::Internal(format!("Converter task panicked: {}", e)))?
        };
        let outcome = outcome.and_then(|()| {
            if config.verify_output {
                check_output(&name, &target)
            } else {
                Ok(())
            }
        });
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                debug!(
                    "Converted {} → {} in {}ms",
                    name,
                    target.display(),
                    duration_ms
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(position, total, &name);
                }
                converted.push(ConvertedPage {
                    position,
                    path: target,
                });
                results.push(PageResult {
                    position,
                    source_name: name,
                    error: None,
                    duration_ms,
                });
            }
            Err(e) => {
                warn!("Conversion failed, skipping: {}", e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(position, total, e.to_string());
                }
                results.push(PageResult {
                    position,
                    source_name: name,
                    error: Some(e),
                    duration_ms,
                });
            }
        }
    }

    Ok((results, converted))
}

/// The converter claimed success; make sure it actually wrote something.
fn check_output(name: &str, target: &Path) -> Result<(), PageError> {
    match std::fs::metadata(target) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(PageError::MissingOutput {
            file: name.to_string(),
            path: target.to_path_buf(),
        }),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Writes a few bytes for every source except those named in `fail`.
    struct ScriptedConverter {
        fail: Vec<&'static str>,
        write: bool,
        calls: Mutex<Vec<String>>,
    }

    impl RasterConverter for ScriptedConverter {
        fn name(&self) -> &str {
            "scripted"
        }

        fn convert(&self, source: &Path, target: &Path) -> Result<(), PageError> {
            let file = file_label(source);
            self.calls.lock().unwrap().push(file.clone());
            if self.fail.contains(&file.as_str()) {
                return Err(PageError::ConverterFailed {
                    file,
                    status: "exit status: 1".into(),
                    stderr: "cannot read".into(),
                });
            }
            if self.write {
                std::fs::write(target, b"II*\0").unwrap();
            }
            Ok(())
        }
    }

    fn sources(names: &[&str]) -> Vec<SourceFile> {
        names
            .iter()
            .map(|n| SourceFile::new(format!("/in/{n}")))
            .collect()
    }

    #[test]
    fn command_converter_builds_sips_arguments() {
        let conv = CommandConverter::new("/usr/bin/sips");
        assert_eq!(conv.name(), "sips");
        let cmd = conv.command(Path::new("/in/p1.pdg"), Path::new("/tmp/w/p1.tiff"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            ["-s", "format", "tiff", "/in/p1.pdg", "--out", "/tmp/w/p1.tiff"]
        );
    }

    #[test]
    fn missing_program_is_a_page_error() {
        let conv = CommandConverter::new("/definitely/not/a/converter");
        let err = conv
            .convert(Path::new("/in/p1.pdg"), Path::new("/tmp/p1.tiff"))
            .unwrap_err();
        assert_eq!(err.file(), "p1.pdg");
        match err {
            PageError::SpawnFailed { detail, .. } => {
                assert!(detail.contains(&conv.program().display().to_string()));
            }
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failures_are_skipped_in_order() {
        let converter: Arc<dyn RasterConverter> = Arc::new(ScriptedConverter {
            fail: vec!["p2.pdg"],
            write: true,
            calls: Mutex::new(Vec::new()),
        });
        let mut ws = Workspace::create().unwrap();
        let srcs = sources(&["p1.pdg", "p2.pdg", "p3.pdg"]);
        let (results, pages) =
            convert_pages(&srcs, &mut ws, &converter, &ConversionConfig::default())
                .await
                .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[1].error.is_some());
        let positions: Vec<usize> = pages.iter().map(|p| p.position).collect();
        assert_eq!(positions, [1, 3]);
        assert_eq!(pages[1].path.file_name().unwrap(), "p3.tiff");
    }

    #[tokio::test]
    async fn zero_exit_without_output_is_a_failure() {
        let converter: Arc<dyn RasterConverter> = Arc::new(ScriptedConverter {
            fail: vec![],
            write: false,
            calls: Mutex::new(Vec::new()),
        });
        let mut ws = Workspace::create().unwrap();
        let srcs = sources(&["p1.pdg"]);

        let (results, pages) =
            convert_pages(&srcs, &mut ws, &converter, &ConversionConfig::default())
                .await
                .unwrap();
        assert!(pages.is_empty());
        assert!(matches!(
            results[0].error,
            Some(PageError::MissingOutput { .. })
        ));

        let lenient = ConversionConfig::builder().verify_output(false).build().unwrap();
        let (_, pages) = convert_pages(&srcs, &mut ws, &converter, &lenient)
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
    }
}
