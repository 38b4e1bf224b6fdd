//! Status command - show what the stored snapshot holds

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::get_context;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Sales Data Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Rows", &status.total_rows.to_string()]);
    table.add_row(vec!["Undated rows", &status.undated_rows.to_string()]);
    table.add_row(vec!["Customers", &status.distinct_customers.to_string()]);
    table.add_row(vec!["Products", &status.distinct_products.to_string()]);

    println!("{}", table);
    println!();

    if let (Some(earliest), Some(latest)) = (&status.date_range.earliest, &status.date_range.latest) {
        println!("Date range: {} to {}", earliest, latest);
    }
    if let Some(uploaded_at) = &status.last_uploaded_at {
        println!(
            "Last upload: {} ({})",
            uploaded_at,
            status.last_batch_id.as_deref().unwrap_or("-").dimmed()
        );
    } else {
        println!("{}", "No data uploaded yet. Use 'sd import <file>'.".yellow());
    }
    println!("Database: {}", status.database);

    Ok(())
}
