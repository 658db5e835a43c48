//! Spreadsheet export for contributor rosters.
//!
//! Writes the multi-sheet result workbook and reads previously exported
//! workbooks so repeated runs never duplicate a contributor row.

mod workbook;

pub use workbook::{ExportConfig, ExportSummary, export_contributors, read_contributors};
