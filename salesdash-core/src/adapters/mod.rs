//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the SalesStore port
//! - csv and calamine readers for uploaded files
//! - HTTP gateway and log-only sinks for NotificationSink

pub mod csv_source;
pub mod duckdb;
pub mod excel_source;
pub mod log_sink;
pub mod webhook;

use std::path::Path;

use crate::domain::result::{Error, Result};
use crate::domain::RawTable;

/// Read an uploaded sales file, dispatching on its extension
pub fn read_sales_file(file_name: &str, bytes: Vec<u8>) -> Result<RawTable> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if extension == "csv" {
        csv_source::read_csv(bytes.as_slice())
    } else if excel_source::WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        excel_source::read_workbook(bytes)
    } else {
        Err(Error::invalid_file(format!(
            "Unsupported file type '{}': expected .csv, .xlsx, .xls, .xlsm or .ods",
            file_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_extension() {
        let table = read_sales_file("Sales.CSV", b"Customer\nSpar\n".to_vec()).unwrap();
        assert_eq!(table.rows.len(), 1);

        let err = read_sales_file("sales.pdf", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidFile(_)));
        assert!(matches!(read_sales_file("noext", Vec::new()), Err(Error::InvalidFile(_))));
    }
}
