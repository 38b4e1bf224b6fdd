//! Core domain entities
//!
//! Sales records, the aggregation and comparison engines, and the report
//! shapes. Pure data structures and functions - no I/O.

pub mod aggregate;
pub mod classify;
pub mod comparison;
pub mod filter;
pub mod notification;
pub mod period;
pub mod raw_row;
pub mod report;
pub mod result;
pub mod rounding;
mod sale;

pub use aggregate::{aggregate, AggregatedGroup, GroupBy, OrderedGroups};
pub use classify::{CustomerGroup, ProductCategory};
pub use comparison::{compare, compare_by, ComparisonOutput, ComparisonResult, Metric, PercentageChange};
pub use filter::{DateRange, SalesFilter};
pub use notification::{NotificationConfig, NotificationEnvelope, NotificationStatus, SmsProvider};
pub use period::{ComparisonPeriod, PeriodWindows};
pub use raw_row::{RawCell, RawRow, RawTable};
pub use report::{assemble, AggregateOutput, Report, ReportMode, ReportOptions};
pub use sale::{columns, ParsedRow, RowIssues, SalesTransaction};
