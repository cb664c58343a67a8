//! Formatted terminal output for the `report` command.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use crate::app::pipeline::{Dataset, ReportOutput};
use crate::domain::{MetricSet, PlatformTotals, Record};

/// `R$ 1,234.56`
pub fn format_money(value: f64) -> String {
    format!("R$ {}", format_decimal(value, 2))
}

/// Fixed-point with `,` thousands separators (`1,234.56`).
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::new();
    // `-0.00` prints as `0.00`.
    if value < 0.0 && formatted.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Integer with `,` thousands separators.
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let grouped = group_thousands(&digits);
    if value < 0 { format!("-{grouped}") } else { grouped }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// One labelled KPI value, as shown in the tile row of both front-ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub label: &'static str,
    pub value: String,
}

/// KPI tiles: the four headline figures first, then the supporting totals.
pub fn metric_tiles(m: &MetricSet) -> Vec<Tile> {
    vec![
        Tile { label: "Investment", value: format_money(m.total_investment) },
        Tile { label: "Leads", value: format_count(m.total_leads) },
        Tile { label: "CPL", value: format_money(m.cost_per_lead) },
        Tile { label: "ROAS", value: format_decimal(m.return_on_ad_spend, 2) },
        Tile { label: "Sales", value: format_money(m.total_sales) },
        Tile { label: "Impressions", value: format_count(m.total_impressions) },
        Tile { label: "Clicks", value: format_count(m.total_clicks) },
        Tile { label: "CPC", value: format_money(m.avg_cost_per_click) },
    ]
}

/// Header block: source, row counts and the active selection.
pub fn format_run_summary(dataset: &Dataset, report: &ReportOutput) -> String {
    let mut out = String::new();
    let sel = &report.selection;

    out.push_str("=== dash - Marketing Dashboard ===\n");
    out.push_str(&format!("Source: {}\n", dataset.source));
    out.push_str(&format!(
        "Rows: loaded={} | without period={} | selected={}\n",
        dataset.records.len(),
        dataset.rows_without_period(),
        report.rows.len(),
    ));
    if sel.period_start <= sel.period_end {
        out.push_str(&format!("Period: {} → {}\n", sel.period_start, sel.period_end));
    } else {
        out.push_str("Period: (empty range)\n");
    }
    if super::selects_all(sel, &dataset.records) {
        out.push_str("Platforms: all\nCampaigns: all\n");
    } else {
        out.push_str(&format!("Platforms: {}\n", join_or_dash(sel.platforms.iter())));
        out.push_str(&format!("Campaigns: {}\n", join_or_dash(sel.campaigns.iter())));
    }
    out
}

fn join_or_dash<'a>(values: impl Iterator<Item = &'a String>) -> String {
    let joined = values
        .map(|v| if v.is_empty() { "(blank)" } else { v.as_str() })
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() { "-".to_string() } else { joined }
}

/// KPI tiles laid out four per line.
pub fn format_metrics(m: &MetricSet) -> String {
    let tiles = metric_tiles(m);
    let mut out = String::from("\nIndicators:\n");
    for chunk in tiles.chunks(4) {
        let line = chunk
            .iter()
            .map(|t| format!("{:<12}{:>16}", t.label, t.value))
            .collect::<Vec<_>>()
            .join("   ");
        out.push_str(&format!("  {line}\n"));
    }
    out
}

/// Per-platform leads, investment and investment share.
pub fn format_platform_table(groups: &[PlatformTotals]) -> String {
    let mut out = String::from("\nBy platform:\n");
    if groups.is_empty() {
        out.push_str("  (no rows selected)\n");
        return out;
    }

    let total: f64 = groups.iter().map(|g| g.total_investment).sum();
    let width = groups
        .iter()
        .map(|g| g.platform.chars().count())
        .max()
        .unwrap_or(0)
        .max("Platform".len());

    out.push_str(&format!(
        "  {:<width$}  {:>10}  {:>16}  {:>7}\n",
        "Platform", "Leads", "Investment", "Share"
    ));
    for g in groups {
        let share = if total == 0.0 { 0.0 } else { g.total_investment / total * 100.0 };
        out.push_str(&format!(
            "  {:<width$}  {:>10}  {:>16}  {:>6.1}%\n",
            g.platform,
            format_count(g.total_leads),
            format_money(g.total_investment),
            share,
        ));
    }
    out
}

const DETAIL_HEADERS: [&str; 8] = [
    "Platform",
    "Campaign",
    "Period",
    "Investment",
    "Leads",
    "Sales",
    "Impressions",
    "Clicks",
];

/// Cells of one detail-table row, formatted for display.
pub fn detail_cells(r: &Record) -> [String; 8] {
    [
        r.platform.clone(),
        r.campaign.clone(),
        r.period.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
        format_decimal(r.investment, 2),
        format_count(r.leads),
        format_decimal(r.sales, 2),
        format_count(r.impressions),
        format_count(r.clicks),
    ]
}

/// The detailed row table; text columns left-aligned, numbers right-aligned.
pub fn format_detail_table(rows: &[Record], max_rows: Option<usize>) -> String {
    format_table("Detailed data", rows, max_rows)
}

/// Every loaded row before filtering; undated rows show `-` as their period.
pub fn format_loaded_table(rows: &[Record], max_rows: Option<usize>) -> String {
    format_table("Loaded data (unfiltered)", rows, max_rows)
}

fn format_table(title: &str, rows: &[Record], max_rows: Option<usize>) -> String {
    let mut out = format!("\n{title}:\n");
    if rows.is_empty() {
        out.push_str("  (no rows selected)\n");
        return out;
    }

    let shown = max_rows.unwrap_or(rows.len()).min(rows.len());
    let cells: Vec<[String; 8]> = rows.iter().take(shown).map(detail_cells).collect();

    let mut widths = DETAIL_HEADERS.map(str::len);
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let render = |row: &[String]| -> String {
        let parts: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (cell, &w))| {
                if i < 3 {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect();
        format!("  {}\n", parts.join("  ").trim_end())
    };

    let headers = DETAIL_HEADERS.map(str::to_string);
    out.push_str(&render(&headers));
    for row in &cells {
        out.push_str(&render(row));
    }
    if shown < rows.len() {
        out.push_str(&format!("  … {} more rows (use --rows to show more)\n", rows.len() - shown));
    }
    out
}
