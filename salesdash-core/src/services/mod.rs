//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod dashboard;
mod filters;
pub mod ingest;
pub mod logging;
pub mod migration;
mod notify;
pub mod report;
mod status;

pub use dashboard::{
    DashboardQuery, DashboardRow, DashboardService, DashboardSummary, DirectorDashboard,
    GrowthBasis, ManagerDashboard, OrderHistory, SortKey, SortOrder, TraderDashboard, WeekCount,
};
pub use filters::{FilterOptions, FilterService};
pub use ingest::{IngestResult, IngestService, ParsedBatch};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use notify::NotificationService;
pub use report::{GeneratedReport, ReportRequest, ReportService};
pub use status::{DataSpan, StatusService, StatusSummary};
