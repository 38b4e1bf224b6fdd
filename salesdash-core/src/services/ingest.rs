//! Ingest service - uploaded file to stored snapshot
//!
//! Reads a CSV or workbook, parses every row (rows are never rejected) and
//! replaces the stored snapshot with the result.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::read_sales_file;
use crate::domain::{columns, RawTable, SalesTransaction};
use crate::ports::SalesStore;

/// Rows parsed from one file, with coercion counts
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub records: Vec<SalesTransaction>,
    /// Rows where at least one field fell back to its default
    pub defaulted_rows: usize,
    /// Numeric cells that held text which is not a number
    pub invalid_number_cells: usize,
    /// Non-blank date cells that could not be read
    pub invalid_dates: usize,
    /// Expected headers absent from the file
    pub missing_headers: Vec<String>,
}

impl ParsedBatch {
    /// Parse every row of `table`
    pub fn from_table(table: &RawTable) -> Self {
        let mut batch = ParsedBatch {
            records: Vec::with_capacity(table.rows.len()),
            missing_headers: missing_headers(table),
            ..Default::default()
        };

        for row in &table.rows {
            let parsed = SalesTransaction::parse_row(row);
            if !parsed.issues.is_clean() {
                batch.defaulted_rows += 1;
                batch.invalid_number_cells += parsed.issues.invalid_numbers.len();
                if parsed.issues.invalid_date {
                    batch.invalid_dates += 1;
                }
            }
            batch.records.push(parsed.transaction);
        }
        batch
    }
}

/// `R/KG` may also arrive under its alternate header
fn missing_headers(table: &RawTable) -> Vec<String> {
    table
        .missing_headers(&columns::EXPECTED)
        .into_iter()
        .filter(|h| {
            *h != columns::PRICE_PER_KG
                || !table.missing_headers(&[columns::PRICE_PER_KG_ALT]).is_empty()
        })
        .map(str::to_string)
        .collect()
}

/// Outcome of one upload
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub file_name: String,
    pub batch_id: String,
    pub rows_read: usize,
    pub rows_stored: usize,
    pub rows_replaced: usize,
    pub defaulted_rows: usize,
    pub invalid_number_cells: usize,
    pub invalid_dates: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Ingest service
pub struct IngestService {
    store: Arc<dyn SalesStore>,
}

impl IngestService {
    pub fn new(store: Arc<dyn SalesStore>) -> Self {
        Self { store }
    }

    /// Ingest a file from disk
    pub fn ingest_file(
        &self,
        path: &Path,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<IngestResult> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.ingest_bytes(&file_name, bytes, progress)
    }

    /// Ingest an uploaded file held in memory
    ///
    /// File-level problems surface as [`crate::Error::InvalidFile`] before the
    /// store is touched.
    pub fn ingest_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<IngestResult> {
        let table = read_sales_file(file_name, bytes)?;
        let batch = ParsedBatch::from_table(&table);

        let mut warnings = Vec::new();
        if !batch.missing_headers.is_empty() {
            tracing::warn!(missing = ?batch.missing_headers, "Upload is missing expected columns");
            warnings.push(format!(
                "Missing columns (defaults used): {}",
                batch.missing_headers.join(", ")
            ));
        }
        if batch.defaulted_rows > 0 {
            warnings.push(format!(
                "{} row(s) had unreadable values replaced with defaults",
                batch.defaulted_rows
            ));
        }

        let replaced = self
            .store
            .replace_all_with_progress(&batch.records, progress)
            .context("Failed to store uploaded rows")?;

        tracing::info!(
            rows = replaced.inserted,
            defaulted = batch.defaulted_rows,
            "Upload ingested"
        );

        Ok(IngestResult {
            file_name: file_name.to_string(),
            batch_id: replaced.batch_id,
            rows_read: table.rows.len(),
            rows_stored: replaced.inserted,
            rows_replaced: replaced.deleted,
            defaulted_rows: batch.defaulted_rows,
            invalid_number_cells: batch.invalid_number_cells,
            invalid_dates: batch.invalid_dates,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::csv_source::read_csv;
    use crate::adapters::duckdb::DuckDbSalesStore;
    use crate::domain::result::Error;
    use crate::domain::SalesFilter;

    const CSV: &str = "Invoice Number,Transaction Type,Date,Account Number,Customer,Product,Mass,Sales Value,Sales Qty,R/KG\n\
        1001,INV,2025-05-17,A1,Spar Chatsworth,Breast Fillet,\"1,200\",\"10,500.456\",12,87.50\n\
        1002,INV,not a date,A2,Mega Save,Wings,-,abc,,\n";

    fn service() -> (IngestService, Arc<DuckDbSalesStore>) {
        let store = Arc::new(DuckDbSalesStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        (IngestService::new(store.clone()), store)
    }

    #[test]
    fn test_batch_counts_coercions() {
        let table = read_csv(CSV.as_bytes()).unwrap();
        let batch = ParsedBatch::from_table(&table);

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.defaulted_rows, 1);
        assert_eq!(batch.invalid_number_cells, 1);
        assert_eq!(batch.invalid_dates, 1);
        assert!(batch.missing_headers.is_empty());
        assert_eq!(batch.records[0].mass, 1200);
        assert_eq!(batch.records[1].date, None);
    }

    #[test]
    fn test_alternate_price_header_is_not_missing() {
        let table = read_csv("Customer,Price per Kg\nX,1\n".as_bytes()).unwrap();
        let batch = ParsedBatch::from_table(&table);
        assert!(!batch.missing_headers.contains(&"R/KG".to_string()));
        assert!(batch.missing_headers.contains(&"Mass".to_string()));
    }

    #[test]
    fn test_ingest_bytes_replaces_snapshot() {
        let (service, store) = service();

        let result = service
            .ingest_bytes("sales.csv", CSV.as_bytes().to_vec(), &mut |_, _| {})
            .unwrap();
        assert_eq!(result.rows_stored, 2);
        assert_eq!(result.rows_replaced, 0);
        assert_eq!(result.warnings.len(), 1);

        let again = service
            .ingest_bytes("sales.csv", CSV.as_bytes().to_vec(), &mut |_, _| {})
            .unwrap();
        assert_eq!(again.rows_replaced, 2);
        assert_eq!(store.query(&SalesFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn test_unsupported_file_is_rejected_before_store() {
        let (service, store) = service();
        service
            .ingest_bytes("sales.csv", CSV.as_bytes().to_vec(), &mut |_, _| {})
            .unwrap();

        let err = service
            .ingest_bytes("sales.txt", b"whatever".to_vec(), &mut |_, _| {})
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidFile(_))));
        assert_eq!(store.count().unwrap(), 2);
    }
}
