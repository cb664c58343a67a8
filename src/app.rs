//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - resolves the data source and initial filters
//! - runs the report pipeline and prints it, or hands over to the TUI
//! - writes the optional CSV export

use clap::Parser;

use crate::cli::{Command, FilterArgs, ReportArgs, SourceArgs, TuiArgs};
use crate::data::open_source;
use crate::domain::{DashConfig, DataSource, SelectionOverrides, SheetRef};
use crate::error::AppError;

pub mod pipeline;

const MISSING_SOURCE_HINT: &str = "No spreadsheet configured. Pass --sheet-id and --sheet-name \
(or set SHEET_ID and SHEET_NAME, e.g. in .env), or point --csv-file at an exported CSV.";

/// Entry point for the `dash` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` is optional; real environment variables win.
    let _ = dotenvy::dotenv();

    // `dash` and `dash --sheet-id …` behave like `dash tui …`. Clap needs a
    // subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    crate::logging::init_stderr();

    let config = config_from_report_args(&args)?;
    let source = open_source(&config.source)?;
    let dataset = pipeline::load_dataset(source.as_ref())?;

    let selection = crate::report::resolve_selection(&dataset.records, &config.overrides);
    let report = pipeline::run_report(&dataset.records, &selection);

    println!("{}", crate::report::format_run_summary(&dataset, &report));
    if config.show_loaded {
        println!("{}", crate::report::format_loaded_table(&dataset.records, config.max_rows));
    }
    println!("{}", crate::report::format_metrics(&report.metrics));

    if config.plot {
        println!(
            "{}",
            crate::plot::render_trend_chart(&report.by_period, config.plot_width, config.plot_height)
        );
        println!("{}", crate::plot::render_leads_bars(&report.by_platform, config.plot_width / 2));
        println!("{}", crate::plot::render_share_bars(&report.by_platform, config.plot_width / 2));
    }

    println!("{}", crate::report::format_platform_table(&report.by_platform));
    println!("{}", crate::report::format_detail_table(&report.rows, config.max_rows));

    if let Some(path) = &config.export {
        crate::io::export::write_records_csv(path, &report.rows)?;
        println!("Exported {} rows to {}", report.rows.len(), path.display());
    }

    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let _log_guard = crate::logging::init_file();

    let source = source_from_args(&args.source)?;
    let overrides = overrides_from_args(&args.filters);
    crate::tui::run(open_source(&source)?, overrides)
}

pub fn config_from_report_args(args: &ReportArgs) -> Result<DashConfig, AppError> {
    Ok(DashConfig {
        source: source_from_args(&args.source)?,
        overrides: overrides_from_args(&args.filters),
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        max_rows: args.rows,
        show_loaded: args.raw,
        export: args.export.clone(),
    })
}

/// A local CSV wins over sheet coordinates; otherwise both id and tab name are required.
pub fn source_from_args(args: &SourceArgs) -> Result<DataSource, AppError> {
    if let Some(path) = &args.csv_file {
        return Ok(DataSource::File(path.clone()));
    }

    let non_blank = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
    match (non_blank(&args.sheet_id), non_blank(&args.sheet_name)) {
        (Some(sheet_id), Some(sheet_name)) => Ok(DataSource::Sheet(SheetRef { sheet_id, sheet_name })),
        _ => Err(AppError::new(2, MISSING_SOURCE_HINT)),
    }
}

pub fn overrides_from_args(args: &FilterArgs) -> SelectionOverrides {
    SelectionOverrides {
        platforms: args.platforms.iter().cloned().collect(),
        campaigns: args.campaigns.iter().cloned().collect(),
        period_start: args.from,
        period_end: args.to,
    }
}

/// Rewrite argv so `dash` defaults to `dash tui`.
///
/// Rules:
/// - `dash`                        -> `dash tui`
/// - `dash --sheet-id X ...`       -> `dash tui --sheet-id X ...`
/// - `dash --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "report" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
