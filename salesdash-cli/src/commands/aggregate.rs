//! Aggregate command - grouped totals over a selection

use anyhow::Result;
use comfy_table::Cell;
use salesdash_core::GroupBy;

use super::{get_context, SelectionArgs};
use crate::output::{self, align_numbers, create_table, format_kg, format_money};

pub fn run(group_by: GroupBy, selection: &SelectionArgs, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let groups = ctx
        .dashboard_service
        .aggregate(&selection.to_query(), group_by)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        output::info("No sales match the selection.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec![
        group_by.to_string(),
        "Sales".to_string(),
        "Mass".to_string(),
        "Qty".to_string(),
        "Customers".to_string(),
        "Rows".to_string(),
        "R/kg".to_string(),
    ]);
    for group in &groups {
        table.add_row(vec![
            Cell::new(&group.group_key),
            Cell::new(format_money(group.sales_value_sum)),
            Cell::new(format_kg(group.mass_sum)),
            Cell::new(group.sales_qty_sum),
            Cell::new(group.distinct_customer_count),
            Cell::new(group.record_count),
            Cell::new(group.avg_price_per_kg),
        ]);
    }
    align_numbers(&mut table);
    println!("{}", table);

    Ok(())
}
