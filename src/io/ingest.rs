//! CSV ingest and normalization.
//!
//! This module is responsible for turning the spreadsheet's CSV export into typed
//! `Record`s that the report functions can sum safely.
//!
//! Design goals:
//! - **Strict schema** for the one column everything hangs on (`Mês/Ano`)
//! - **Lossy, explicit coercion** for metric cells: anything non-numeric reads as 0
//! - **No dropped rows**: a bad period becomes `None` and is filtered out later
//! - **Separation of concerns**: no filtering or aggregation here

use csv::StringRecord;

use crate::domain::{Period, RawTable, Record, columns};
use crate::error::PipelineError;

/// Parse CSV text (header row + data rows) into a raw table.
///
/// Rows may be ragged; short rows are padded with empty cells so every row has
/// one cell per header.
pub fn parse_csv(text: &str) -> Result<RawTable, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::Fetch(format!("failed to read CSV headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and CSV lines are 1-based.
        let line = idx + 2;
        let record = result
            .map_err(|e| PipelineError::Fetch(format!("CSV parse error on line {line}: {e}")))?;
        rows.push(pad_row(&record, headers.len()));
    }

    tracing::info!(columns = headers.len(), rows = rows.len(), "parsed CSV export");
    Ok(RawTable { headers, rows })
}

fn pad_row(record: &StringRecord, width: usize) -> Vec<String> {
    let mut row: Vec<String> = record.iter().map(str::to_string).collect();
    if row.len() < width {
        row.resize(width, String::new());
    }
    row
}

/// Require the period column; everything else is optional.
pub fn validate_schema(table: RawTable) -> Result<RawTable, PipelineError> {
    if !table.has_column(columns::PERIOD) {
        return Err(PipelineError::Schema(format!(
            "column `{}` was not found; check the sheet's header row",
            columns::PERIOD
        )));
    }
    Ok(table)
}

/// Column positions resolved once per table.
struct ColumnMap {
    platform: Option<usize>,
    campaign: Option<usize>,
    period: Option<usize>,
    investment: Option<usize>,
    leads: Option<usize>,
    sales: Option<usize>,
    impressions: Option<usize>,
    clicks: Option<usize>,
}

impl ColumnMap {
    fn resolve(table: &RawTable) -> Self {
        Self {
            platform: table.column_index(columns::PLATFORM),
            campaign: table.column_index(columns::CAMPAIGN),
            period: table.column_index(columns::PERIOD),
            investment: table.column_index(columns::INVESTMENT),
            leads: table.column_index(columns::LEADS),
            sales: table.column_index(columns::SALES),
            impressions: table.column_index(columns::IMPRESSIONS),
            clicks: table.column_index(columns::CLICKS),
        }
    }
}

/// Convert raw cells into typed records.
///
/// - numeric cells that do not parse become `0` (never dropped)
/// - integer columns accept integral decimals (`"12.0"`); fractions become `0`
/// - period cells that are not `MM/YYYY` become `None`
pub fn coerce(table: &RawTable) -> Vec<Record> {
    let cols = ColumnMap::resolve(table);
    let mut zero_filled = 0usize;
    let mut null_periods = 0usize;

    let records: Vec<Record> = table
        .rows
        .iter()
        .map(|row| {
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("");

            let mut decimal = |idx: Option<usize>| {
                let raw = cell(idx);
                parse_decimal(raw).unwrap_or_else(|| {
                    if !raw.trim().is_empty() {
                        zero_filled += 1;
                    }
                    0.0
                })
            };
            let investment = decimal(cols.investment);
            let sales = decimal(cols.sales);

            let mut integer = |idx: Option<usize>| {
                let raw = cell(idx);
                parse_integer(raw).unwrap_or_else(|| {
                    if !raw.trim().is_empty() {
                        zero_filled += 1;
                    }
                    0
                })
            };
            let leads = integer(cols.leads);
            let impressions = integer(cols.impressions);
            let clicks = integer(cols.clicks);

            let period = cell(cols.period).parse::<Period>().ok();
            if period.is_none() {
                null_periods += 1;
            }

            Record {
                platform: cell(cols.platform).to_string(),
                campaign: cell(cols.campaign).to_string(),
                period,
                investment,
                leads,
                sales,
                impressions,
                clicks,
            }
        })
        .collect();

    if zero_filled > 0 {
        tracing::debug!(cells = zero_filled, "non-numeric metric cells coerced to zero");
    }
    if null_periods > 0 {
        tracing::warn!(rows = null_periods, "rows with an unparseable period will be excluded by the period filter");
    }

    records
}

/// Parse a decimal cell; `None` for empty, non-numeric or non-finite text.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse an integer cell, accepting integral decimals such as `"12.0"`.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let v = parse_decimal(trimmed)?;
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
