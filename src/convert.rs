//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline: scan and sort the PDG folder, open a
//! [`Workspace`], convert each page, merge the survivors into a PDF, write
//! it, and remove the workspace. The workspace is an RAII guard, so it is
//! also removed when any step returns early with an error.

use crate::config::ConversionConfig;
use crate::error::Pdg2PdfError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::sort::SourceFile;
use crate::pipeline::workspace::Workspace;
use crate::pipeline::{assemble, input, raster};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert every PDG file in `input_dir` into one PDF at `output_path`.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_dir`   — folder holding the `*.pdg` pages (not searched recursively)
/// * `output_path` — PDF to write; an existing file is replaced
/// * `config`      — conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages were skipped
/// (check `output.stats.failed_pages`, or call
/// [`ConversionOutput::into_result`]).
///
/// # Errors
/// Returns `Err(Pdg2PdfError)` only for fatal errors:
/// - Input folder missing, unreadable, or without PDG files
/// - Every page failed to convert
/// - The PDF could not be assembled or written
pub async fn convert(
    input_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdg2PdfError> {
    let total_start = Instant::now();
    let input_dir = input_dir.as_ref();
    let output_path = output_path.as_ref();
    info!("Starting conversion: {}", input_dir.display());

    // ── Step 1: Scan and sort ────────────────────────────────────────────
    let sources = input::scan_sources(input_dir)?;
    let total = sources.len();
    info!("Found {} PDG files", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total);
    }

    // ── Step 2: Open workspace ───────────────────────────────────────────
    let mut workspace = Workspace::create()?;
    info!("Temporary directory: {}", workspace.path().display());

    // ── Step 3: Convert pages one by one ─────────────────────────────────
    let converter = raster::resolve_converter(config);
    debug!("Using converter: {}", converter.name());
    let convert_start = Instant::now();
    let (pages, converted) =
        raster::convert_pages(&sources, &mut workspace, &converter, config).await?;
    let convert_duration_ms = convert_start.elapsed().as_millis() as u64;

    if converted.is_empty() {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Pdg2PdfError::AllConversionsFailed { total, first_error });
    }

    // ── Step 4: Assemble and write ───────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_start(converted.len());
    }
    info!("Generating PDF from {} pages", converted.len());
    let assemble_start = Instant::now();
    let raster_paths: Vec<PathBuf> = converted.iter().map(|p| p.path.clone()).collect();
    let bytes = assemble::assemble_pdf(&raster_paths, config.dpi).await?;
    assemble::write_output(output_path, &bytes).await?;
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;
    info!("PDF written: {}", output_path.display());

    // ── Step 5: Clean up ─────────────────────────────────────────────────
    workspace.close();
    info!("Temporary files cleaned up");

    let stats = ConversionStats {
        total_files: total,
        converted_pages: converted.len(),
        failed_pages: total - converted.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        convert_duration_ms,
        assemble_duration_ms,
        output_bytes: bytes.len() as u64,
    };

    info!(
        "Conversion complete: {}/{} pages, {}ms total",
        stats.converted_pages, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total, stats.converted_pages);
    }

    Ok(ConversionOutput {
        output_path: output_path.to_path_buf(),
        pages,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdg2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdg2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_dir, output_path, config))
}

/// List the PDG files of `input_dir` in the order they would become pages.
///
/// Runs no converter and touches nothing on disk.
pub fn inspect(input_dir: impl AsRef<Path>) -> Result<Vec<SourceFile>, Pdg2PdfError> {
    input::scan_sources(input_dir.as_ref())
}
