//! Turns an uploaded workbook into an ordered list of schema-less row payloads.
//!
//! Every sheet is read in workbook order. The first row of a sheet's used range
//! names the columns; each following non-blank row becomes a JSON object whose
//! keys keep column order. Two provenance keys are prepended to every payload so
//! a row can always be traced back to its sheet and position.

pub mod cell;
pub mod headers;
pub mod workbook;

pub use workbook::{ParsedRow, flatten_sheet, parse_workbook};

/// Payload key holding the originating sheet name.
pub const SHEET_KEY: &str = "__sheet";
/// Payload key holding the zero-based offset of the row among its sheet's data rows.
pub const ROW_INDEX_KEY: &str = "__rowIndex";
