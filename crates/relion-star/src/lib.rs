//! RELION STAR particle table and text codec.
//!
//! This crate provides an in-memory, column-oriented table for particle
//! metadata as used by RELION and the tomography picking tools around it,
//! plus a reader and writer for the STAR text format.
//!
//! # Features
//!
//! - Typed columns (text, integer, real) validated against the label catalogue
//! - Row and column editing, lookup and subsetting
//! - STAR text parsing with preamble capture and trailing-content tolerance
//! - STAR text rendering that round-trips through the parser
//!
//! # Example
//!
//! ```
//! use relion_model::CellValue;
//! use relion_model::labels::{COORDINATE_X, MICROGRAPH_NAME};
//! use relion_star::{StarTable, parse_star};
//!
//! let mut star = StarTable::new();
//! star.add_column(MICROGRAPH_NAME).unwrap();
//! star.add_column(COORDINATE_X).unwrap();
//! star.add_row(&[
//!     (MICROGRAPH_NAME, CellValue::Text("mics/tomo_a.mrc".into())),
//!     (COORDINATE_X, CellValue::Real(12.5)),
//! ])
//! .unwrap();
//!
//! let text = star.to_star_string();
//! let reparsed = parse_star(&text).unwrap();
//! assert_eq!(reparsed.nrows(), 1);
//! ```

mod reader;
pub mod table;
mod writer;

// Re-export error types
pub use relion_model::{Result, StarError};

// Re-export the table and its defaults
pub use table::{DEFAULT_PREAMBLE, StarTable};

// Re-export codec functionality
pub use reader::parse_star;
pub use writer::render_star;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
