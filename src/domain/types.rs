//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the pipeline and both front-ends
//! - exported to CSV
//! - compared cheaply in tests (every computation is a pure function of them)

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Column headers of the source spreadsheet.
///
/// The sheet is maintained by hand in Portuguese, so these are matched verbatim.
pub mod columns {
    pub const PLATFORM: &str = "Plataforma";
    pub const CAMPAIGN: &str = "Campanha";
    pub const PERIOD: &str = "Mês/Ano";
    pub const INVESTMENT: &str = "Investimento";
    pub const LEADS: &str = "Leads";
    pub const SALES: &str = "Vendas";
    pub const IMPRESSIONS: &str = "Impressões";
    pub const CLICKS: &str = "Cliques";

    /// Header order used when writing records back out.
    pub const ALL: [&str; 8] = [
        PLATFORM,
        CAMPAIGN,
        PERIOD,
        INVESTMENT,
        LEADS,
        SALES,
        IMPRESSIONS,
        CLICKS,
    ];
}

/// A calendar month, the time axis of the dashboard.
///
/// Ordered by `(year, month)`. Parsed from and displayed as `MM/YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub const EARLIEST: Period = Period { year: 1, month: 1 };
    pub const LATEST: Period = Period { year: 9999, month: 12 };

    /// Build a period, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        // Going through chrono keeps the year range identical to the date type
        // used everywhere else.
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { year, month })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

/// Error returned when a string is not a valid `MM/YYYY` period.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid period '{0}' (expected MM/YYYY)")]
pub struct ParsePeriodError(pub String);

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePeriodError(s.to_string());
        let trimmed = s.trim();
        let (month, year) = trimmed.split_once('/').ok_or_else(err)?;

        // `%m/%Y` accepts one or two month digits and a four-digit year.
        if month.is_empty() || month.len() > 2 || year.len() != 4 {
            return Err(err());
        }
        if !month.bytes().all(|b| b.is_ascii_digit()) || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let month: u32 = month.parse().map_err(|_| err())?;
        let year: i32 = year.parse().map_err(|_| err())?;
        Period::new(year, month).ok_or_else(err)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A header row plus string cells, exactly as read from the CSV export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of the column whose header matches `name`.
    ///
    /// Headers are compared after trimming whitespace and a leading UTF-8 BOM.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| normalize_header_name(h) == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }
}

/// Google's CSV export (and Excel) sometimes prefix the first header with a BOM.
pub fn normalize_header_name(name: &str) -> &str {
    name.trim().trim_start_matches('\u{feff}').trim()
}

/// One coerced row of campaign data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub platform: String,
    pub campaign: String,
    /// `None` when the source cell did not parse as `MM/YYYY`.
    pub period: Option<Period>,
    pub investment: f64,
    pub leads: i64,
    pub sales: f64,
    pub impressions: i64,
    pub clicks: i64,
}

/// The caller's filter choices for a single computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub platforms: BTreeSet<String>,
    pub campaigns: BTreeSet<String>,
    pub period_start: Period,
    pub period_end: Period,
}

impl FilterSelection {
    /// Whether a record passes every filter.
    ///
    /// Membership is exact string match; rows without a period never match.
    pub fn matches(&self, record: &Record) -> bool {
        self.platforms.contains(&record.platform)
            && self.campaigns.contains(&record.campaign)
            && record
                .period
                .is_some_and(|p| p >= self.period_start && p <= self.period_end)
    }
}

/// Scalar KPIs over a filtered row set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSet {
    pub total_investment: f64,
    pub total_leads: i64,
    pub total_sales: f64,
    pub total_impressions: i64,
    pub total_clicks: i64,
    /// CPC: investment / clicks.
    pub avg_cost_per_click: f64,
    /// CPL: investment / leads.
    pub cost_per_lead: f64,
    /// `(sales × CPL) / investment`, reproduced as the sheet owners compute it.
    pub return_on_ad_spend: f64,
}

/// Per-platform sums used by the bar and share charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTotals {
    pub platform: String,
    pub total_leads: i64,
    pub total_investment: f64,
}

/// Per-month sums used by the trend chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub period: Period,
    pub total_leads: i64,
    pub total_investment: f64,
}

/// Which published tab to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub sheet_id: String,
    pub sheet_name: String,
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.sheet_id, self.sheet_name)
    }
}

/// Where the table comes from: a published sheet tab, or a local CSV export of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Sheet(SheetRef),
    File(PathBuf),
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Sheet(sheet) => write!(f, "sheet {sheet}"),
            DataSource::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// Optional overrides on top of the default (select-everything) filter.
///
/// Empty sets and `None` bounds mean "use the default for this part".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOverrides {
    pub platforms: BTreeSet<String>,
    pub campaigns: BTreeSet<String>,
    pub period_start: Option<Period>,
    pub period_end: Option<Period>,
}

/// Resolved configuration for one run of either front-end.
#[derive(Debug, Clone)]
pub struct DashConfig {
    pub source: DataSource,
    pub overrides: SelectionOverrides,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    /// Maximum number of detail rows printed by `report` (`None` = all).
    pub max_rows: Option<usize>,
    /// Print the unfiltered table too.
    pub show_loaded: bool,
    pub export: Option<PathBuf>,
}
