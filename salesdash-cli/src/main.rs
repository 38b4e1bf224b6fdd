//! Salesdash CLI - sales uploads, dashboards and daily reports in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use salesdash_core::services::{SortKey, SortOrder};
use salesdash_core::services::logging::events;
use salesdash_core::{GroupBy, LogEvent};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{aggregate, dashboard, filters, import, logs, notify, report, status, SelectionArgs};

/// Salesdash - sales reporting in your terminal
#[derive(Parser)]
#[command(name = "sd", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what the stored snapshot holds
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace stored sales with a CSV or Excel export
    Import {
        /// Path to a .csv, .xlsx, .xls, .xlsm or .ods file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grouped totals over a selection
    Aggregate {
        /// Grouping (product, customer, supplier, category, customer_group, total)
        #[arg(long, default_value = "total")]
        group_by: GroupBy,
        #[command(flatten)]
        selection: SelectionArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Role-based dashboard view
    Dashboard {
        /// Which dashboard to show
        #[arg(value_enum)]
        role: dashboard::Role,
        #[command(flatten)]
        selection: SelectionArgs,
        /// Sort key (name, sales_value, mass, sales_qty, customer_count, avg_price_per_kg, record_count)
        #[arg(long)]
        sort_by: Option<SortKey>,
        /// Sort order (asc, desc)
        #[arg(long)]
        sort_order: Option<SortOrder>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the daily report
    Report {
        #[command(flatten)]
        args: report::ReportArgs,
        /// Also send the report as an SMS notification
        #[arg(long)]
        notify: bool,
        /// Notification settings JSON (defaults to settings.json)
        #[arg(long)]
        sms_config: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send a report as an SMS notification
    Notify {
        #[command(flatten)]
        args: report::ReportArgs,
        /// Send a previously saved report (JSON) instead of building one
        #[arg(long)]
        report: Option<PathBuf>,
        /// Notification settings JSON (defaults to settings.json)
        #[arg(long)]
        sms_config: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List selectable filter values
    Filters {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Import { .. } => "import",
            Commands::Aggregate { .. } => "aggregate",
            Commands::Dashboard { .. } => "dashboard",
            Commands::Report { .. } => "report",
            Commands::Notify { .. } => "notify",
            Commands::Filters { .. } => "filters",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if !matches!(cli.command, Commands::Logs { .. }) {
        commands::log_event(
            &commands::get_logger(),
            LogEvent::new(events::COMMAND_EXECUTED).with_command(cli.command.name()),
        );
    }

    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Import { file, json } => import::run(file, json),
        Commands::Aggregate { group_by, selection, json } => aggregate::run(group_by, &selection, json),
        Commands::Dashboard { role, selection, sort_by, sort_order, json } => {
            dashboard::run(role, &selection, sort_by, sort_order, json)
        }
        Commands::Report { args, notify, sms_config, json } => report::run(&args, notify, sms_config, json),
        Commands::Notify { args, report, sms_config, json } => notify::run(&args, report, sms_config, json),
        Commands::Filters { json } => filters::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}
