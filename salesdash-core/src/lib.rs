//! Salesdash Core - sales ingestion, aggregation and reporting
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Sales records, aggregation, comparison and report shapes
//! - **ports**: Trait definitions for external dependencies (SalesStore, NotificationSink)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, CSV/Excel readers, SMS gateway)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbSalesStore;
use config::Config;
use domain::ReportOptions;
use ports::SalesStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    AggregatedGroup, ComparisonPeriod, GroupBy, NotificationConfig, NotificationStatus, Report,
    ReportMode, SalesFilter, SalesTransaction,
};

pub use services::{EntryPoint, LogEvent, LoggingService};

pub const DB_FILE: &str = "salesdash.duckdb";

/// Main context for salesdash operations
///
/// Holds the store, configuration and every service. Both binaries build
/// one of these per process.
pub struct SalesdashContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub store: Arc<DuckDbSalesStore>,
    pub ingest_service: IngestService,
    pub report_service: ReportService,
    pub dashboard_service: DashboardService,
    pub filter_service: FilterService,
    pub status_service: StatusService,
    pub notification_service: NotificationService,
}

impl SalesdashContext {
    /// Open (or create) the data directory's database and wire services
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let store = Arc::new(DuckDbSalesStore::new(&data_dir.join(DB_FILE))?);
        store.ensure_schema()?;

        Self::with_store(data_dir, config, store)
    }

    /// Wire services around an already opened store
    pub fn with_store(data_dir: &Path, config: Config, store: Arc<DuckDbSalesStore>) -> Result<Self> {
        let dyn_store: Arc<dyn SalesStore> = store.clone();

        let ingest_service = IngestService::new(Arc::clone(&dyn_store));
        let report_service = ReportService::new(
            Arc::clone(&dyn_store),
            config.report_transaction_type.clone(),
            ReportOptions {
                focus_lines: config.focus_lines.clone(),
                ..Default::default()
            },
        );
        let dashboard_service = DashboardService::new(Arc::clone(&dyn_store), config.reps.clone());
        let filter_service = FilterService::new(Arc::clone(&store), config.reps.clone());
        let status_service = StatusService::new(Arc::clone(&store));
        let notification_service = NotificationService::from_settings(
            config.gateway_url.as_deref(),
            config.notification_defaults.clone(),
        )?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            store,
            ingest_service,
            report_service,
            dashboard_service,
            filter_service,
            status_service,
            notification_service,
        })
    }

    /// Record notification outcomes in the event log as well as tracing
    pub fn attach_event_log(&mut self, event_log: Arc<LoggingService>) {
        let service = std::mem::replace(
            &mut self.notification_service,
            NotificationService::new(Arc::new(adapters::log_sink::LogSink), None),
        );
        self.notification_service = service.with_event_log(event_log);
    }
}
