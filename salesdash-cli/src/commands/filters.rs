//! Filters command - selectable values for the dashboards

use anyhow::Result;
use colored::Colorize;

use super::get_context;

fn print_list(title: &str, values: &[String]) {
    println!("{} ({})", title.bold(), values.len());
    if values.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for value in values {
        println!("  • {}", value);
    }
    println!();
}

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let options = ctx.filter_service.options()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let years: Vec<String> = options.years.iter().map(|y| y.to_string()).collect();
    let months: Vec<String> = options.months.iter().map(|m| m.to_string()).collect();
    print_list("Years", &years);
    print_list("Months", &months);
    print_list("Reps", &options.reps);
    print_list("Suppliers", &options.suppliers);
    print_list("Categories", &options.categories);
    print_list("Customers", &options.customers);

    Ok(())
}
