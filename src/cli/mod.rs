//! Command-line parsing for the marketing dashboard.
//!
//! Argument parsing and command dispatch stay separate from the pipeline; the
//! parsed arguments are turned into a `DashConfig` by `app::config_from_report_args`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Period;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dash", version, about = "Marketing dashboard over a Google Sheets tab")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the sheet, print KPIs, charts and the detail table, optionally export.
    Report(ReportArgs),
    /// Launch the interactive TUI (the default when no subcommand is given).
    Tui(TuiArgs),
}

/// Where the data comes from.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Spreadsheet ID (the long token in the sheet URL).
    #[arg(long, env = "SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Tab (worksheet) name inside the spreadsheet.
    #[arg(long, env = "SHEET_NAME")]
    pub sheet_name: Option<String>,

    /// Read a local CSV export instead of fetching the sheet.
    #[arg(long, value_name = "PATH")]
    pub csv_file: Option<PathBuf>,
}

/// Initial filter choices; anything omitted selects everything.
#[derive(Debug, Args, Clone, Default)]
pub struct FilterArgs {
    /// Keep only this platform (repeatable).
    #[arg(long = "platform", value_name = "NAME")]
    pub platforms: Vec<String>,

    /// Keep only this campaign (repeatable).
    #[arg(long = "campaign", value_name = "NAME")]
    pub campaigns: Vec<String>,

    /// First month to include (MM/YYYY).
    #[arg(long, value_name = "MM/YYYY")]
    pub from: Option<Period>,

    /// Last month to include (MM/YYYY).
    #[arg(long, value_name = "MM/YYYY")]
    pub to: Option<Period>,
}

/// Options for the one-shot report.
#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Write the filtered rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Disable the terminal charts.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Trend chart height (rows).
    #[arg(long, default_value_t = 15)]
    pub height: usize,

    /// Show at most N rows of the detail table.
    #[arg(long, value_name = "N")]
    pub rows: Option<usize>,

    /// Also print every loaded row before filtering (shows rows whose period did not parse).
    #[arg(long)]
    pub raw: bool,
}

/// Options for the TUI.
#[derive(Debug, Args, Clone, Default)]
pub struct TuiArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filters: FilterArgs,
}
