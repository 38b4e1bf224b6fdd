//! DuckDB sales store

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use duckdb::{Connection, ToSql};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{SalesFilter, SalesTransaction};
use crate::ports::{ReplaceResult, SalesStore, INSERT_CHUNK_SIZE};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const INSERT_COLUMNS: &str = "invoice_number, transaction_type, date, account_number, customer, \
     product, mass, sales_value, sales_qty, r_kg, batch_id";

/// One row of placeholders; decimals and dates travel as text
const ROW_PLACEHOLDERS: &str =
    "(?, ?, CAST(? AS DATE), ?, ?, ?, ?, CAST(? AS DECIMAL(14, 2)), ?, CAST(? AS DECIMAL(14, 2)), ?)";

const SELECT_COLUMNS: &str = "invoice_number, transaction_type, date::VARCHAR, account_number, \
     customer, product, mass, sales_value::VARCHAR, sales_qty, r_kg::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock")
}

/// Snapshot-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub row_count: i64,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub undated_rows: i64,
    pub distinct_customers: i64,
    pub distinct_products: i64,
    pub batch_id: Option<String>,
    pub uploaded_at: Option<String>,
}

/// Text column with distinct-value lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColumn {
    Customer,
    Product,
    TransactionType,
}

impl TextColumn {
    fn sql(&self) -> &'static str {
        match self {
            TextColumn::Customer => "customer",
            TextColumn::Product => "product",
            TextColumn::TransactionType => "transaction_type",
        }
    }
}

/// DuckDB-backed [`SalesStore`]
pub struct DuckDbSalesStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbSalesStore {
    /// Open (or create) the database at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "Database busy, retrying"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// In-memory store, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs an extension
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("Migration failed: {}", e)))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "Database migrations applied");
        }
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    // === Reads beyond the port ===

    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sales_data", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let (row_count, earliest, latest, undated, customers, products): (
            i64,
            Option<String>,
            Option<String>,
            i64,
            i64,
            i64,
        ) = conn.query_row(
            "SELECT COUNT(*),
                    MIN(date)::VARCHAR,
                    MAX(date)::VARCHAR,
                    COUNT(*) FILTER (WHERE date IS NULL),
                    COUNT(DISTINCT customer),
                    COUNT(DISTINCT product)
             FROM sales_data",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )?;

        let batch: Option<(String, String)> = conn
            .query_row(
                "SELECT batch_id, uploaded_at::VARCHAR FROM sales_data ORDER BY row_id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .ok();

        Ok(StoreStats {
            row_count,
            earliest_date: earliest.as_deref().and_then(parse_date),
            latest_date: latest.as_deref().and_then(parse_date),
            undated_rows: undated,
            distinct_customers: customers,
            distinct_products: products,
            batch_id: batch.as_ref().map(|b| b.0.clone()),
            uploaded_at: batch.map(|b| b.1),
        })
    }

    /// Calendar years present in the snapshot, ascending
    pub fn years(&self) -> Result<Vec<i32>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT CAST(year(date) AS INTEGER) AS y FROM sales_data
             WHERE date IS NOT NULL ORDER BY y",
        )?;
        let years = stmt
            .query_map([], |row| row.get::<_, i32>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(years)
    }

    /// Distinct non-empty values of `column` in first-seen order
    pub fn distinct_values(&self, column: TextColumn) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let col = column.sql();
        let sql = format!(
            "SELECT {col} FROM sales_data WHERE {col} <> ''
             GROUP BY {col} ORDER BY MIN(row_id)"
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }
}

impl SalesStore for DuckDbSalesStore {
    fn replace_all_with_progress(
        &self,
        records: &[SalesTransaction],
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<ReplaceResult> {
        let batch_id = Uuid::new_v4().to_string();
        let total = records.len();

        let mut conn = self.lock()?;
        // Dropping the transaction without commit rolls everything back
        let tx = conn.transaction()?;

        let deleted = tx.execute("DELETE FROM sales_data", [])?;

        let mut inserted = 0;
        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let placeholders = vec![ROW_PLACEHOLDERS; chunk.len()].join(", ");
            let sql = format!("INSERT INTO sales_data ({}) VALUES {}", INSERT_COLUMNS, placeholders);

            let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(chunk.len() * 11);
            for record in chunk {
                push_record_params(&mut values, record, &batch_id);
            }

            let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            tx.execute(&sql, param_refs.as_slice()).map_err(|e| {
                tracing::error!(
                    inserted,
                    total,
                    error = %e,
                    "Chunk insert failed, rolling back replace"
                );
                Error::database(format!(
                    "Insert failed after {} of {} rows: {}",
                    inserted, total, e
                ))
            })?;

            inserted += chunk.len();
            progress(inserted, total);
        }

        tx.commit()?;
        tracing::info!(deleted, inserted, batch_id = %batch_id, "Sales snapshot replaced");

        Ok(ReplaceResult {
            batch_id,
            deleted,
            inserted,
        })
    }

    fn query(&self, filter: &SalesFilter) -> Result<Vec<SalesTransaction>> {
        let (where_sql, params) = build_where(filter);
        let sql = format!(
            "SELECT {} FROM sales_data {} ORDER BY row_id",
            SELECT_COLUMNS, where_sql
        );

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn latest_date(&self, filter: &SalesFilter) -> Result<Option<NaiveDate>> {
        let (where_sql, params) = build_where(filter);
        let sql = format!("SELECT MAX(date)::VARCHAR FROM sales_data {}", where_sql);

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.lock()?;
        let latest: Option<String> = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(latest.as_deref().and_then(parse_date))
    }
}

fn push_record_params(values: &mut Vec<Box<dyn ToSql>>, record: &SalesTransaction, batch_id: &str) {
    values.push(Box::new(record.invoice_number));
    values.push(Box::new(record.transaction_type.clone()));
    values.push(Box::new(record.date.map(|d| d.format("%Y-%m-%d").to_string())));
    values.push(Box::new(record.account_number.clone()));
    values.push(Box::new(record.customer.clone()));
    values.push(Box::new(record.product.clone()));
    values.push(Box::new(record.mass));
    values.push(Box::new(record.sales_value.to_string()));
    values.push(Box::new(record.sales_qty));
    values.push(Box::new(record.price_per_kg.to_string()));
    values.push(Box::new(batch_id.to_string()));
}

/// Render a filter as a WHERE clause with positional parameters
fn build_where(filter: &SalesFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if filter.is_unsatisfiable() {
        clauses.push("FALSE".to_string());
    }

    for range in [filter.calendar_range(), filter.date_range].into_iter().flatten() {
        clauses.push("date >= CAST(? AS DATE) AND date < CAST(? AS DATE)".to_string());
        params.push(Box::new(range.start.format("%Y-%m-%d").to_string()));
        params.push(Box::new(range.end.format("%Y-%m-%d").to_string()));
    }

    let substring_filters = [
        ("product", &filter.supplier),
        ("customer", &filter.customer),
        ("product", &filter.product),
    ];
    for (column, value) in substring_filters {
        if let Some(needle) = value {
            clauses.push(format!("strpos(lower({}), lower(?)) > 0", column));
            params.push(Box::new(needle.clone()));
        }
    }

    if let Some(customers) = &filter.customer_in {
        if customers.is_empty() {
            clauses.push("FALSE".to_string());
        } else {
            let marks = vec!["?"; customers.len()].join(", ");
            clauses.push(format!("customer IN ({})", marks));
            for c in customers {
                params.push(Box::new(c.clone()));
            }
        }
    }

    if let Some(tt) = &filter.transaction_type {
        clauses.push("lower(transaction_type) = lower(?)".to_string());
        params.push(Box::new(tt.trim().to_string()));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), params)
    }
}

fn row_to_transaction(row: &duckdb::Row) -> duckdb::Result<SalesTransaction> {
    // Column indices from SELECT_COLUMNS:
    // 0: invoice_number, 1: transaction_type, 2: date, 3: account_number, 4: customer,
    // 5: product, 6: mass, 7: sales_value, 8: sales_qty, 9: r_kg
    let date: Option<String> = row.get(2)?;
    let sales_value: String = row.get(7)?;
    let r_kg: String = row.get(9)?;

    Ok(SalesTransaction {
        invoice_number: row.get(0)?,
        transaction_type: row.get(1)?,
        date: date.as_deref().and_then(parse_date),
        account_number: row.get(3)?,
        customer: row.get(4)?,
        product: row.get(5)?,
        mass: row.get(6)?,
        sales_value: Decimal::from_str(&sales_value).unwrap_or_default(),
        sales_qty: row.get(8)?,
        price_per_kg: Decimal::from_str(&r_kg).unwrap_or_default(),
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
