//! Dashboard command - director, manager and trader views

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Cell, Table};
use salesdash_core::services::{
    DashboardQuery, DashboardRow, DashboardSummary, GrowthBasis, OrderHistory, SortKey, SortOrder,
};

use super::{get_context, SelectionArgs};
use crate::output::{align_numbers, create_table, format_change, format_kg, format_money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Director,
    Manager,
    Trader,
}

pub fn run(
    role: Role,
    selection: &SelectionArgs,
    sort_by: Option<SortKey>,
    sort_order: Option<SortOrder>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let query = DashboardQuery {
        sort_by,
        sort_order,
        ..selection.to_query()
    };
    let service = &ctx.dashboard_service;

    match role {
        Role::Director => {
            let view = service.director(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            print_summary(&view.summary, view.growth_basis);
            print_rows("Suppliers", &view.suppliers, false);
        }
        Role::Manager => {
            let view = service.manager(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            print_summary(&view.summary, view.growth_basis);
            if let Some(as_of) = view.as_of {
                println!("As of {}", as_of);
                println!();
            }
            print_rows("Customers", &view.customers, true);
            print_rows("Products", &view.products, false);
            print_rows("Categories", &view.categories, false);
        }
        Role::Trader => {
            let view = service.trader(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            print_summary(&view.summary, view.growth_basis);
            print_rows("Customers", &view.customers, true);
            print_history(&view.order_history);
        }
    }

    Ok(())
}

fn basis_label(basis: GrowthBasis) -> &'static str {
    match basis {
        GrowthBasis::PreviousMonth => "vs previous month",
        GrowthBasis::PreviousYear => "vs previous year",
        GrowthBasis::None => "no comparison period",
    }
}

fn print_summary(summary: &DashboardSummary, basis: GrowthBasis) {
    println!("{}", "Summary".bold());
    println!("  Sales:      {}", format_money(summary.total_sales));
    println!("  Mass:       {}", format_kg(summary.total_mass));
    println!("  R/kg:       {}", summary.avg_price_per_kg);
    println!("  Rows:       {}", summary.record_count);
    println!("  Customers:  {}", summary.unique_customers);
    println!("  Products:   {}", summary.unique_products);
    println!("  Growth:     {}", basis_label(basis).dimmed());
    println!();
}

fn print_rows(title: &str, rows: &[DashboardRow], with_recency: bool) {
    println!("{}", title.bold());
    if rows.is_empty() {
        println!("  {}", "(none)".dimmed());
        println!();
        return;
    }

    let mut table = create_table();
    let mut header = vec!["Name", "Sales", "Growth", "Mass", "Growth", "Qty", "Customers", "R/kg"];
    if with_recency {
        header.push("Days since order");
    }
    table.set_header(header);

    for row in rows {
        let mut cells = vec![
            Cell::new(&row.name),
            Cell::new(format_money(row.sales_value)),
            Cell::new(format_change(&row.sales_growth)),
            Cell::new(format_kg(row.mass)),
            Cell::new(format_change(&row.mass_growth)),
            Cell::new(row.sales_qty),
            Cell::new(row.customer_count),
            Cell::new(row.avg_price_per_kg),
        ];
        if with_recency {
            cells.push(Cell::new(
                row.days_since_last_order
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        table.add_row(cells);
    }
    align_numbers(&mut table);
    println!("{}", table);
    println!();
}

fn print_history(history: &[OrderHistory]) {
    println!("{}", "Order history (orders per week)".bold());
    match history_table(history) {
        Some(table) => println!("{}", table),
        None => println!("  {}", "(none)".dimmed()),
    }
}

/// One row per product, one column per week
fn history_table(history: &[OrderHistory]) -> Option<Table> {
    let first = history.first()?;

    let mut table = create_table();
    let mut header = vec!["Product".to_string()];
    header.extend(first.weeks.iter().map(|w| w.week.clone()));
    table.set_header(header);

    for line in history {
        let mut cells = vec![Cell::new(&line.product)];
        cells.extend(line.weeks.iter().map(|w| Cell::new(w.orders)));
        table.add_row(cells);
    }
    align_numbers(&mut table);
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use salesdash_core::services::WeekCount;

    fn week(label: &str, day: u32, orders: usize) -> WeekCount {
        WeekCount {
            week: label.to_string(),
            week_start: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            orders,
        }
    }

    #[test]
    fn test_history_table_has_a_column_per_week() {
        let history = vec![
            OrderHistory {
                product: "Whole Bird".to_string(),
                weeks: vec![week("2025-W19", 5, 2), week("2025-W20", 12, 7)],
            },
            OrderHistory {
                product: "Wings".to_string(),
                weeks: vec![week("2025-W19", 5, 0), week("2025-W20", 12, 1)],
            },
        ];

        let table = history_table(&history).unwrap();
        let rendered = table.to_string();
        assert_eq!(table.row_iter().count(), 2);
        assert!(rendered.contains("2025-W20"));
        assert!(rendered.contains("Whole Bird"));
        assert!(rendered.contains('7'));
    }

    #[test]
    fn test_history_table_empty() {
        assert!(history_table(&[]).is_none());
    }
}
