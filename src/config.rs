//! Configuration types for PDG-to-PDF conversion.
//!
//! Everything a run needs besides the two paths lives in
//! [`ConversionConfig`], built via [`ConversionConfigBuilder`]. The defaults
//! reproduce the classic macOS workflow: `sips` transcodes each page to TIFF
//! and the pages are laid out at 96 DPI.

use crate::error::Pdg2PdfError;
use crate::pipeline::raster::RasterConverter;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Extension of the source page files (matched ASCII case-insensitively).
pub const SOURCE_EXTENSION: &str = "pdg";

/// Intermediate raster format handed to the converter (`-s format tiff`).
pub const RASTER_FORMAT: &str = "tiff";

/// Default external converter program.
pub const DEFAULT_CONVERTER: &str = "sips";

/// Configuration for a PDG-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdg2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .converter_program("/usr/bin/sips")
///     .dpi(150)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Program invoked once per page as
    /// `<program> -s format tiff <input> --out <output>`. Default: `sips`.
    pub converter_program: PathBuf,

    /// Pre-constructed converter. Takes precedence over `converter_program`.
    pub converter: Option<Arc<dyn RasterConverter>>,

    /// Fallback resolution for pages whose raster records none: such a
    /// page is `pixels * 72 / dpi` points wide. Range: 36–1200. Default: 96.
    pub dpi: u32,

    /// Treat a zero-exit conversion that left no (or an empty) output file
    /// as a page failure. Default: true.
    pub verify_output: bool,

    /// Receives per-page events while the run progresses.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            converter_program: PathBuf::from(DEFAULT_CONVERTER),
            converter: None,
            dpi: 96,
            verify_output: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("converter_program", &self.converter_program)
            .field(
                "converter",
                &self.converter.as_ref().map(|c| c.name().to_string()),
            )
            .field("dpi", &self.dpi)
            .field("verify_output", &self.verify_output)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn converter_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.converter_program = program.into();
        self
    }

    pub fn converter(mut self, converter: Arc<dyn RasterConverter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(36, 1200);
        self
    }

    pub fn verify_output(mut self, v: bool) -> Self {
        self.config.verify_output = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdg2PdfError> {
        let c = &self.config;
        if c.dpi < 36 || c.dpi > 1200 {
            return Err(Pdg2PdfError::InvalidConfig(format!(
                "DPI must be 36–1200, got {}",
                c.dpi
            )));
        }
        if c.converter.is_none() && c.converter_program.as_os_str().is_empty() {
            return Err(Pdg2PdfError::InvalidConfig(
                "Converter program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
