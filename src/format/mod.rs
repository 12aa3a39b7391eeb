//! Input and output formats for flat records.
//!
//! - [`csv`] reads CSV exports into flat records
//! - [`text`] renders flat records as aligned tables for humans
//!
//! Machine-readable output is plain `serde_json` of the model types.

pub mod csv;
mod text;

pub use csv::CsvTable;
pub use text::{render_rows, render_table, terminal_width, truncate};
