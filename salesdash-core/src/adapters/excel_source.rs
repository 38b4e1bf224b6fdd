//! Workbook reader (xlsx, xls, xlsm, ods) via calamine
//!
//! Only the first worksheet is read. Its first row holds the headers.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};

use crate::domain::result::{Error, Result};
use crate::domain::{RawCell, RawRow, RawTable};

/// Workbook extensions accepted for upload
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "ods"];

/// Read the first worksheet of an in-memory workbook
pub fn read_workbook(bytes: Vec<u8>) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| Error::invalid_file(format!("Unreadable workbook: {}", e)))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::invalid_file("Workbook has no worksheets"))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| Error::invalid_file(format!("Unreadable worksheet '{}': {}", sheet, e)))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(|c| to_raw_cell(c).as_text()).collect(),
        None => return Err(Error::invalid_file(format!("Worksheet '{}' is empty", sheet))),
    };

    let mut rows = Vec::new();
    for cells in rows_iter {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut row = RawRow::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if !header.is_empty() {
                row.insert(header, to_raw_cell(cell));
            }
        }
        rows.push(row);
    }

    tracing::debug!(sheet = %sheet, rows = rows.len(), "Read worksheet");
    Ok(RawTable { headers, rows })
}

fn to_raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::String(s) => RawCell::from(s.as_str()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(serial) => match cell.as_date() {
            Some(date) => RawCell::Date(date),
            None => RawCell::Number(serial.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}
