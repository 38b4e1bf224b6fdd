//! Import command - replace the stored snapshot with a CSV or workbook

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use salesdash_core::services::logging::events;
use salesdash_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(file: PathBuf, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let bar = if json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} rows")?.progress_chars("=> "),
        );
        bar
    };

    let result = ctx.ingest_service.ingest_file(&file, &mut |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });
    bar.finish_and_clear();

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new(events::UPLOAD_FAILED)
                    .with_command("import")
                    .with_error(e.to_string())
                    .with_error_details(format!("{:?}", e)),
            );
            return Err(e);
        }
    };

    log_event(
        &logger,
        LogEvent::new(events::UPLOAD_COMPLETED)
            .with_command("import")
            .with_row_count(result.rows_stored),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::success(&format!(
        "Imported {} rows from {}",
        result.rows_stored, result.file_name
    ));
    println!("  Replaced: {} rows", result.rows_replaced);
    println!("  Batch: {}", result.batch_id.dimmed());
    if result.defaulted_rows > 0 {
        println!(
            "  Defaulted: {} rows ({} unreadable numbers, {} unreadable dates)",
            result.defaulted_rows, result.invalid_number_cells, result.invalid_dates
        );
    }
    for warning in &result.warnings {
        output::warning(warning);
    }

    Ok(())
}
