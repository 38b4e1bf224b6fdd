//! CSV reader producing header-keyed raw rows

use std::io::Read;

use crate::domain::result::{Error, Result};
use crate::domain::{RawRow, RawTable};

/// Read a CSV with a header row
///
/// Cells are kept as text; interpretation happens in the record parser.
/// Short rows are padded with empty cells, blank lines are skipped.
pub fn read_csv<R: Read>(input: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::invalid_file(format!("Unreadable CSV header: {}", e)))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Excel-exported CSVs often start with a byte order mark
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(Error::invalid_file("CSV has no header row"));
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            Error::invalid_file(format!("Unreadable CSV record {}: {}", line + 1, e))
        })?;
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }
        let pairs = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), record.get(i).unwrap_or("")));
        rows.push(RawRow::from_pairs(pairs));
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "Read CSV");
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawCell;

    #[test]
    fn test_reads_rows_by_header() {
        let data = "\u{feff}Invoice Number,Customer,Mass\n100,Spar Chatsworth,\"1,200\"\n\n101,Mega,-\n";
        let table = read_csv(data.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["Invoice Number", "Customer", "Mass"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0].get("mass"),
            &RawCell::Text("1,200".to_string())
        );
        assert_eq!(table.rows[1].get("Customer").as_text(), "Mega");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = read_csv("A,B,C\n1\n".as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table.rows[0].get("C").is_blank());
    }

    #[test]
    fn test_empty_input_is_invalid() {
        assert!(matches!(read_csv("".as_bytes()), Err(Error::InvalidFile(_))));
    }
}
