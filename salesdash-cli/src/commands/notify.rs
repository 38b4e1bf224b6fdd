//! Notify command - send a report through the configured gateway

use std::path::PathBuf;

use anyhow::{Context, Result};
use salesdash_core::Report;

use super::get_context;
use super::report::{generate, load_notification_config, ReportArgs};
use crate::output;

pub fn run(
    args: &ReportArgs,
    report_file: Option<PathBuf>,
    sms_config: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let report: Report = match report_file {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} does not hold a report", path.display()))?
        }
        None => generate(&ctx, args)?.report,
    };
    let config = sms_config.as_deref().map(load_notification_config).transpose()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let status = runtime.block_on(ctx.notification_service.notify(&report, config.as_ref()));

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if status.sent {
        output::success(&format!(
            "Sent {} report for {} to {} recipient(s)",
            report.mode().name(),
            report.date(),
            status.recipients
        ));
    } else {
        output::error(&format!(
            "Notification failed: {}",
            status.error.as_deref().unwrap_or("unknown error")
        ));
    }

    if status.sent {
        Ok(())
    } else {
        anyhow::bail!("Notification was not delivered")
    }
}
