//! CLI binary for pdg2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, asks for missing paths on stdin, and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdg2pdf::pipeline::input::validate_input_dir;
use pdg2pdf::{
    convert, inspect, ConversionConfig, ConversionProgressCallback, ProgressCallback,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one ✓/✗ line per
/// PDG file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the page currently in the converter.
    page_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the file count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning folder…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    /// Clear the bar when the run stops on a fatal error, so the error is
    /// not printed under a half-drawn bar.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} PDG files"))
        ));
    }

    fn on_page_start(&self, _position: usize, _total: usize, source_name: &str) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(source_name.to_string());
    }

    fn on_page_complete(&self, position: usize, total: usize, source_name: &str) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            green("✓"),
            position,
            total,
            source_name,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, position: usize, total: usize, error: String) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per page even when the converter is chatty.
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error,
        };

        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            red("✗"),
            position,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_assembly_start(&self, page_count: usize) {
        self.bar.set_prefix("Merging");
        self.bar.set_message(format!("{page_count} pages → PDF"));
    }

    fn on_conversion_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages converted  ({} skipped)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a folder (asks for the paths when they are omitted)
  pdg2pdf ~/Books/12345678 ~/Books/12345678.pdf

  # Show the page order without converting anything
  pdg2pdf --list-only ~/Books/12345678

  # Use a different sips binary, assume 300 DPI for pages without one
  pdg2pdf --converter /usr/local/bin/sips --dpi 300 scans/ book.pdf

  # Fail (exit code 1) if any page had to be skipped
  pdg2pdf --strict scans/ book.pdf

  # JSON report of every page
  pdg2pdf --json scans/ book.pdf > report.json

PAGE ORDER:
  Files are ordered by the first number in their name, so page2.pdg comes
  before page10.pdg. Files without a number go last.

ENVIRONMENT VARIABLES:
  PDG2PDF_CONVERTER   Converter program (default: sips)
  PDG2PDF_DPI         Page resolution used to size the PDF pages
  RUST_LOG            Override the log filter (e.g. pdg2pdf=debug)
"#;

/// Convert a folder of PDG page images into a single PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdg2pdf",
    version,
    about = "Convert a folder of PDG page images into a single PDF",
    long_about = "Convert every .pdg file in a folder into one PDF. Each page is transcoded \
to TIFF with an external converter (macOS sips by default) and the pages are merged in \
numeric filename order. Pages the converter cannot read are skipped.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the .pdg files. Prompted for when omitted.
    input: Option<PathBuf>,

    /// PDF file to write (overwritten). Prompted for when omitted.
    output: Option<PathBuf>,

    /// Converter program, called as `<program> -s format tiff <in> --out <out>`.
    #[arg(long, env = "PDG2PDF_CONVERTER", default_value = "sips")]
    converter: PathBuf,

    /// Resolution for pages whose TIFF records none (36–1200).
    #[arg(long, env = "PDG2PDF_DPI", default_value_t = 96,
          value_parser = clap::value_parser!(u32).range(36..=1200))]
    dpi: u32,

    /// Print the page order only, no conversion.
    #[arg(long)]
    list_only: bool,

    /// Output a structured JSON report instead of the summary.
    #[arg(long, env = "PDG2PDF_JSON")]
    json: bool,

    /// Exit with an error if any page was skipped.
    #[arg(long, env = "PDG2PDF_STRICT")]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDG2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDG2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports every page; keep INFO logs out of
    // its way unless --verbose asks for everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve paths ────────────────────────────────────────────────────
    let input_dir = match cli.input.clone() {
        Some(p) => p,
        None => prompt_path("PDG folder path: ")?,
    };
    validate_input_dir(&input_dir).context("Cannot use input folder")?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_only {
        let files = inspect(&input_dir).context("Failed to scan folder")?;
        if cli.json {
            let names: Vec<String> = files.iter().map(|f| f.name()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&names).context("Failed to serialise file list")?
            );
        } else {
            for (i, f) in files.iter().enumerate() {
                println!("{:>5}  {}", i + 1, f.name());
            }
        }
        return Ok(());
    }

    let output_path = match cli.output.clone() {
        Some(p) => p,
        None => prompt_path("Output PDF path: ")?,
    };

    // ── Build config ─────────────────────────────────────────────────────
    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert(&input_dir, &output_path, &config).await;
    if result.is_err() {
        if let Some(ref cb) = cli_progress {
            cb.abandon();
        }
    }
    let output = result.context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.converted_pages,
            stats.total_files,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        for failure in output.failures() {
            if let Some(ref e) = failure.error {
                eprintln!("   {} {}", red("skipped"), dim(&e.to_string()));
            }
        }
    }

    if cli.strict {
        output.into_result().context("Some pages were skipped")?;
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .converter_program(cli.converter.clone())
        .dpi(cli.dpi);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Ask for a path on stdin; surrounding whitespace is ignored.
fn prompt_path(label: &str) -> Result<PathBuf> {
    eprint!("{label}");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    parse_path_answer(&line)
}

fn parse_path_answer(line: &str) -> Result<PathBuf> {
    let answer = line.trim();
    if answer.is_empty() {
        bail!("No path given");
    }
    Ok(PathBuf::from(answer))
}
