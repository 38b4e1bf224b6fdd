//! Status service - snapshot summary

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbSalesStore;

/// Status service for the stored snapshot
pub struct StatusService {
    store: Arc<DuckDbSalesStore>,
}

impl StatusService {
    pub fn new(store: Arc<DuckDbSalesStore>) -> Self {
        Self { store }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let stats = self.store.stats()?;

        Ok(StatusSummary {
            total_rows: stats.row_count,
            undated_rows: stats.undated_rows,
            distinct_customers: stats.distinct_customers,
            distinct_products: stats.distinct_products,
            date_range: DataSpan {
                earliest: stats.earliest_date.map(|d| d.to_string()),
                latest: stats.latest_date.map(|d| d.to_string()),
            },
            last_batch_id: stats.batch_id,
            last_uploaded_at: stats.uploaded_at,
            database: self
                .store
                .db_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_rows: i64,
    pub undated_rows: i64,
    pub distinct_customers: i64,
    pub distinct_products: i64,
    pub date_range: DataSpan,
    pub last_batch_id: Option<String>,
    pub last_uploaded_at: Option<String>,
    pub database: String,
}

/// Earliest and latest stored dates, as text
#[derive(Debug, Serialize)]
pub struct DataSpan {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SalesTransaction;
    use crate::ports::SalesStore;

    #[test]
    fn test_status_of_empty_and_loaded_store() {
        let store = Arc::new(DuckDbSalesStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        let service = StatusService::new(store.clone());

        let empty = service.get_status().unwrap();
        assert_eq!(empty.total_rows, 0);
        assert!(empty.last_batch_id.is_none());
        assert_eq!(empty.database, ":memory:");

        let result = store
            .replace_all(&[SalesTransaction {
                customer: "Spar".to_string(),
                date: chrono::NaiveDate::from_ymd_opt(2025, 5, 17),
                ..Default::default()
            }])
            .unwrap();

        let loaded = service.get_status().unwrap();
        assert_eq!(loaded.total_rows, 1);
        assert_eq!(loaded.date_range.latest.as_deref(), Some("2025-05-17"));
        assert_eq!(loaded.last_batch_id, Some(result.batch_id));
    }

    #[test]
    fn test_span_serializes_next_to_filter_ranges() {
        use crate::domain::DateRange;
        use crate::services::*;

        let range = DateRange::year(2025).unwrap();
        let span = DataSpan {
            earliest: Some(range.start.to_string()),
            latest: None,
        };
        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(json["earliest"], "2025-01-01");
        assert!(json["latest"].is_null());
    }
}
