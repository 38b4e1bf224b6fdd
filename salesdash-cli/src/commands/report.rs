//! Report command - daily totals or period comparison for a reporting day

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use colored::Colorize;
use salesdash_core::services::logging::events;
use salesdash_core::services::{GeneratedReport, ReportRequest};
use salesdash_core::{ComparisonPeriod, LogEvent, NotificationConfig, ReportMode, SalesdashContext};

use super::{get_context, get_logger, log_event};
use crate::output;

/// Flags selecting which report to build
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Compare against the previous period instead of plain totals
    #[arg(long)]
    pub compare: bool,
    /// Comparison period (daily, weekly, monthly); implies --compare
    #[arg(long)]
    pub period: Option<ComparisonPeriod>,
    /// Reporting day (YYYY-MM-DD); defaults to the latest day with sales
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl ReportArgs {
    pub fn to_request(&self) -> ReportRequest {
        ReportRequest {
            mode: ReportMode::from_flags(self.compare || self.period.is_some(), self.period),
            report_date: self.date,
        }
    }
}

/// Build a report and record the outcome in the event log
pub fn generate(ctx: &SalesdashContext, args: &ReportArgs) -> Result<GeneratedReport> {
    let logger = get_logger();
    match ctx.report_service.generate(&args.to_request()) {
        Ok(generated) => {
            log_event(
                &logger,
                LogEvent::new(events::REPORT_GENERATED)
                    .with_command(generated.report.mode().to_string())
                    .with_row_count(generated.current_rows),
            );
            Ok(generated)
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new(events::REPORT_GENERATED)
                    .with_command("report")
                    .with_error(e.to_string()),
            );
            Err(e)
        }
    }
}

/// Read notification settings from a JSON file
pub fn load_notification_config(path: &Path) -> Result<NotificationConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid notification settings in {}", path.display()))
}

pub fn run(args: &ReportArgs, notify: bool, sms_config: Option<PathBuf>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let generated = generate(&ctx, args)?;

    let notification = if notify {
        let config = sms_config.as_deref().map(load_notification_config).transpose()?;
        let runtime = tokio::runtime::Runtime::new()?;
        Some(runtime.block_on(
            ctx.notification_service
                .notify(&generated.report, config.as_ref()),
        ))
    } else {
        None
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "report": generated.report,
                "anchor": generated.anchor,
                "current_rows": generated.current_rows,
                "prior_rows": generated.prior_rows,
                "notification": notification,
            }))?
        );
        return Ok(());
    }

    println!("{}", generated.report.to_sms_text());
    println!();
    let rows = match generated.prior_rows {
        Some(prior) => format!("{} rows vs {} prior rows", generated.current_rows, prior),
        None => format!("{} rows", generated.current_rows),
    };
    println!("{}", rows.dimmed());

    if let Some(status) = notification {
        if status.sent {
            output::success(&format!(
                "Sent to {} recipient(s) via {}",
                status.recipients,
                ctx.notification_service.sink_name()
            ));
        } else {
            output::warning(&format!(
                "Notification not sent: {}",
                status.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    Ok(())
}
