//! End-to-end test against the real `sips` converter.
//!
//! Needs macOS and a folder of real PDG pages. Gated behind `E2E_ENABLED`
//! so it does not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDG_TEST_DIR=/path/to/book cargo test --test e2e -- --nocapture

use pdg2pdf::{convert, inspect, ConversionConfig};
use std::path::PathBuf;

/// Skip this test unless E2E_ENABLED is set and PDG_TEST_DIR points at a folder.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let Ok(dir) = std::env::var("PDG_TEST_DIR") else {
            println!("SKIP — set PDG_TEST_DIR to a folder of .pdg files");
            return;
        };
        let p = PathBuf::from(dir);
        if !p.is_dir() {
            println!("SKIP — not a directory: {}", p.display());
            return;
        }
        p
    }};
}

#[tokio::test]
async fn test_convert_real_book_with_sips() {
    let dir = e2e_skip_unless_ready!();
    let expected = inspect(&dir).expect("folder should contain PDG files").len();

    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("book.pdf");
    let output = convert(&dir, &out, &ConversionConfig::default())
        .await
        .expect("conversion should succeed");

    let doc = lopdf::Document::load(&out).expect("valid PDF");
    assert_eq!(doc.get_pages().len(), output.stats.converted_pages);
    assert_eq!(output.stats.total_files, expected);
    println!(
        "{} / {} pages, {} bytes, {}ms",
        output.stats.converted_pages,
        expected,
        output.stats.output_bytes,
        output.stats.total_duration_ms
    );
}
