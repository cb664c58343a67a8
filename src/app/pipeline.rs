//! Shared "report pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fetch -> schema check -> coercion -> filter -> metrics -> aggregation
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use crate::data::{SheetSource, read_table};
use crate::domain::{FilterSelection, MetricSet, PeriodTotals, PlatformTotals, Record};
use crate::error::PipelineError;
use crate::io::ingest::{coerce, validate_schema};
use crate::report::{compute_metrics, filter, group_by_platform, period_series};

/// A fetched, validated and coerced table.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Where the data came from (for status lines).
    pub source: String,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn rows_without_period(&self) -> usize {
        self.records.iter().filter(|r| r.period.is_none()).count()
    }
}

/// All computed outputs for one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutput {
    pub selection: FilterSelection,
    pub rows: Vec<Record>,
    pub metrics: MetricSet,
    pub by_platform: Vec<PlatformTotals>,
    pub by_period: Vec<PeriodTotals>,
}

/// Fetch, validate and coerce the table behind `source`.
pub fn load_dataset(source: &dyn SheetSource) -> Result<Dataset, PipelineError> {
    // 1) Fetch and parse the CSV export.
    let raw = read_table(source)?;

    // 2) The period column is the only hard requirement.
    let raw = validate_schema(raw)?;

    // 3) Coerce cells into typed records.
    let records = coerce(&raw);

    let dataset = Dataset {
        source: source.describe(),
        records,
    };
    tracing::info!(
        source = %dataset.source,
        rows = dataset.records.len(),
        without_period = dataset.rows_without_period(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Filter and aggregate an already loaded table.
pub fn run_report(records: &[Record], selection: &FilterSelection) -> ReportOutput {
    // 4) Apply the selection.
    let rows = filter(records, selection);

    // 5) KPIs and per-category totals over the filtered rows.
    let metrics = compute_metrics(&rows);
    let by_platform = group_by_platform(&rows);
    let by_period = period_series(&rows);

    tracing::debug!(selected = rows.len(), of = records.len(), "recomputed report");

    ReportOutput {
        selection: selection.clone(),
        rows,
        metrics,
        by_platform,
        by_period,
    }
}
