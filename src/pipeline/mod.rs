//! Pipeline stages for PDG-to-PDF conversion.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ sort ──▶ raster ──▶ assemble
//! (scan)   (order)  (sips→TIFF)  (lopdf)
//!             └──── workspace (temp dir, removed on every exit) ────┘
//! ```
//!
//! 1. [`input`]     — validate the folder and list `*.pdg` files
//! 2. [`sort`]      — reading order by the first number in each name
//! 3. [`workspace`] — scoped temp directory for the intermediate pages
//! 4. [`raster`]    — run the external converter per file, skipping failures
//! 5. [`assemble`]  — merge the raster pages into one PDF and write it

pub mod assemble;
pub mod input;
pub mod raster;
pub mod sort;
pub mod workspace;
