use std::io::Cursor;

use anyhow::Context as _;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cell::{cell_to_json, header_text, is_blank};
use crate::headers::normalize_headers;
use crate::{ROW_INDEX_KEY, SHEET_KEY};

/// One data row lifted out of a workbook.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRow {
    /// Position across the whole workbook, sheet-then-row order, starting at zero.
    pub index: u64,
    pub data: Map<String, Value>,
}

/// Parse every sheet of an in-memory workbook into row payloads.
///
/// The format (xlsx, xlsm, xlsb, xls, ods) is detected from the bytes. Sheets
/// that cannot be read as a cell grid (chart sheets and the like) are skipped.
pub fn parse_workbook(bytes: &[u8]) -> anyhow::Result<Vec<ParsedRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .context("unrecognised or corrupt workbook")?;

    let mut rows = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(err) => {
                warn!(%err, sheet = %sheet_name, "skipping unreadable sheet");
                continue;
            }
        };

        let before = rows.len();
        flatten_sheet(&sheet_name, range.rows(), &mut rows);
        debug!(sheet = %sheet_name, rows = rows.len() - before, "sheet flattened");
    }

    Ok(rows)
}

/// Append the data rows of one sheet to `out`.
///
/// The first row supplies the headers. Blank rows are dropped and do not consume a
/// `__rowIndex`. Indices continue from whatever `out` already holds.
pub fn flatten_sheet<'a, I>(sheet_name: &str, rows: I, out: &mut Vec<ParsedRow>)
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut rows = rows.into_iter();
    let Some(header_row) = rows.next() else {
        return;
    };

    let headers = normalize_headers(header_row.iter().map(header_text));
    let mut row_index: u64 = 0;

    for cells in rows {
        if cells.iter().all(is_blank) {
            continue;
        }

        let mut data = Map::with_capacity(headers.len() + 2);
        data.insert(SHEET_KEY.to_owned(), Value::String(sheet_name.to_owned()));
        data.insert(ROW_INDEX_KEY.to_owned(), Value::from(row_index));

        for (position, header) in headers.iter().enumerate() {
            let value = cells.get(position).map_or(Value::Null, cell_to_json);
            data.insert(header.clone(), value);
        }

        out.push(ParsedRow {
            index: out.len() as u64,
            data,
        });
        row_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use calamine::Data;
    use rust_xlsxwriter::Workbook;
    use serde_json::{Value, json};

    use super::{ParsedRow, flatten_sheet, parse_workbook};

    fn text(value: &str) -> Data {
        Data::String(value.to_owned())
    }

    fn keys(row: &ParsedRow) -> Vec<&str> {
        row.data.keys().map(String::as_str).collect()
    }

    #[test]
    fn first_row_names_the_columns() {
        let grid = vec![
            vec![text("Region"), text("Sales")],
            vec![text("North"), Data::Int(10)],
            vec![text("South"), Data::Float(12.5)],
        ];

        let mut out = Vec::new();
        flatten_sheet("Q1", grid.iter().map(Vec::as_slice), &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(keys(&out[0]), ["__sheet", "__rowIndex", "Region", "Sales"]);
        assert_eq!(out[0].data["__sheet"], json!("Q1"));
        assert_eq!(out[1].data["__rowIndex"], json!(1));
        assert_eq!(out[1].data["Sales"], json!(12.5));
    }

    #[test]
    fn empty_cells_are_explicit_nulls() {
        let grid = vec![
            vec![text("A"), text("B"), text("C")],
            vec![text("x"), Data::Empty, Data::Empty],
        ];

        let mut out = Vec::new();
        flatten_sheet("S", grid.iter().map(Vec::as_slice), &mut out);

        assert_eq!(out[0].data.get("B"), Some(&Value::Null));
        assert_eq!(out[0].data.get("C"), Some(&Value::Null));
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let grid = vec![vec![text("A"), text("B")], vec![text("only-a")]];

        let mut out = Vec::new();
        flatten_sheet("S", grid.iter().map(Vec::as_slice), &mut out);

        assert_eq!(out[0].data.get("B"), Some(&Value::Null));
    }

    #[test]
    fn blank_rows_are_skipped_without_consuming_offsets() {
        let grid = vec![
            vec![text("A")],
            vec![text("first")],
            vec![Data::Empty],
            vec![text("second")],
        ];

        let mut out = Vec::new();
        flatten_sheet("S", grid.iter().map(Vec::as_slice), &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].data["A"], json!("second"));
        assert_eq!(out[1].data["__rowIndex"], json!(1));
    }

    #[test]
    fn header_only_or_empty_sheets_produce_nothing() {
        let header_only = vec![vec![text("A"), text("B")]];
        let mut out = Vec::new();
        flatten_sheet("S", header_only.iter().map(Vec::as_slice), &mut out);
        flatten_sheet("Empty", std::iter::empty(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn indices_continue_across_sheets() {
        let first = vec![vec![text("A")], vec![text("a1")], vec![text("a2")]];
        let second = vec![vec![text("B")], vec![text("b1")]];

        let mut out = Vec::new();
        flatten_sheet("One", first.iter().map(Vec::as_slice), &mut out);
        flatten_sheet("Two", second.iter().map(Vec::as_slice), &mut out);

        let indices: Vec<u64> = out.iter().map(|row| row.index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(out[2].data["__sheet"], json!("Two"));
        assert_eq!(out[2].data["__rowIndex"], json!(0));
    }

    #[test]
    fn reads_a_real_multi_sheet_workbook() {
        let mut workbook = Workbook::new();

        let people = workbook.add_worksheet();
        people.set_name("People").unwrap();
        people.write_string(0, 0, "name").unwrap();
        people.write_string(0, 1, "age").unwrap();
        people.write_string(1, 0, "Ada").unwrap();
        people.write_number(1, 1, 36.0).unwrap();
        people.write_string(2, 0, "Linus").unwrap();

        let flags = workbook.add_worksheet();
        flags.set_name("Flags").unwrap();
        flags.write_string(0, 0, "enabled").unwrap();
        flags.write_boolean(1, 0, true).unwrap();

        let bytes = workbook.save_to_buffer().unwrap();
        let rows = parse_workbook(&bytes).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].data["name"], json!("Ada"));
        assert_eq!(rows[0].data["age"], json!(36.0));
        assert_eq!(rows[1].data["age"], Value::Null);
        assert_eq!(rows[2].index, 2);
        assert_eq!(rows[2].data["__sheet"], json!("Flags"));
        assert_eq!(rows[2].data["enabled"], json!(true));
    }

    #[test]
    fn rejects_bytes_that_are_not_a_workbook() {
        assert!(parse_workbook(b"definitely not a spreadsheet").is_err());
    }
}
