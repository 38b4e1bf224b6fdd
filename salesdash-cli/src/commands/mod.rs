//! CLI command implementations

pub mod aggregate;
pub mod dashboard;
pub mod filters;
pub mod import;
pub mod logs;
pub mod notify;
pub mod report;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use salesdash_core::services::DashboardQuery;
use salesdash_core::{EntryPoint, LogEvent, LoggingService, SalesdashContext};

/// Environment variable overriding the data directory
pub const ENV_DATA_DIR: &str = "SALESDASH_DIR";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".salesdash"))
        .context("Could not find home directory (set SALESDASH_DIR)")
}

/// Open the data directory and wire every service
pub fn get_context() -> Result<SalesdashContext> {
    let data_dir = get_data_dir()?;
    let mut ctx = SalesdashContext::new(&data_dir).context("Failed to initialize salesdash context")?;
    if let Some(logger) = get_logger() {
        ctx.attach_event_log(Arc::new(logger));
    }
    Ok(ctx)
}

/// Selection flags shared by `aggregate` and `dashboard`
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Calendar year
    #[arg(long)]
    pub year: Option<i32>,
    /// Month (1-12), used together with --year
    #[arg(long)]
    pub month: Option<u32>,
    /// Sales rep whose customers to include ("All" for everyone)
    #[arg(long)]
    pub rep: Option<String>,
    /// Supplier substring (matched against product names)
    #[arg(long)]
    pub supplier: Option<String>,
    /// Customer substring
    #[arg(long)]
    pub customer: Option<String>,
    /// Product substring
    #[arg(long)]
    pub product: Option<String>,
}

impl SelectionArgs {
    pub fn to_query(&self) -> DashboardQuery {
        DashboardQuery {
            year: self.year,
            month: self.month,
            rep: self.rep.clone(),
            supplier: self.supplier.clone(),
            customer: self.customer.clone(),
            product: self.product.clone(),
            ..Default::default()
        }
    }
}
