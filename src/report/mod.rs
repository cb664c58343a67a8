//! Reporting utilities: filtering, KPIs and per-category aggregates.
//!
//! Everything here is a pure function of a record slice (plus a selection), so
//! both front-ends can rerun the whole report on every filter change.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::domain::{
    FilterSelection, MetricSet, Period, PeriodTotals, PlatformTotals, Record, SelectionOverrides,
};

pub mod format;

pub use format::*;

/// Keep the records that pass every part of the selection, in input order.
pub fn filter(records: &[Record], selection: &FilterSelection) -> Vec<Record> {
    records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect()
}

/// Sum the metric columns and derive the zero-guarded ratios.
pub fn compute_metrics(records: &[Record]) -> MetricSet {
    let mut m = MetricSet::default();
    for r in records {
        m.total_investment += r.investment;
        // Counts saturate instead of overflowing on absurd sheet values.
        m.total_leads = m.total_leads.saturating_add(r.leads);
        m.total_sales += r.sales;
        m.total_impressions = m.total_impressions.saturating_add(r.impressions);
        m.total_clicks = m.total_clicks.saturating_add(r.clicks);
    }

    m.avg_cost_per_click = ratio(m.total_investment, m.total_clicks as f64);
    m.cost_per_lead = ratio(m.total_investment, m.total_leads as f64);
    // Not the usual revenue / spend: the sheet's owners multiply by CPL first.
    m.return_on_ad_spend = ratio(m.total_sales * m.cost_per_lead, m.total_investment);
    m
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Leads and investment per platform, ordered by platform name.
pub fn group_by_platform(records: &[Record]) -> Vec<PlatformTotals> {
    let mut groups: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
    for r in records {
        let entry = groups.entry(r.platform.as_str()).or_insert((0, 0.0));
        entry.0 = entry.0.saturating_add(r.leads);
        entry.1 += r.investment;
    }
    groups
        .into_iter()
        .map(|(platform, (total_leads, total_investment))| PlatformTotals {
            platform: platform.to_string(),
            total_leads,
            total_investment,
        })
        .collect()
}

/// Leads and investment per month, ascending; rows without a period are skipped.
pub fn period_series(records: &[Record]) -> Vec<PeriodTotals> {
    let mut groups: BTreeMap<Period, (i64, f64)> = BTreeMap::new();
    for r in records {
        let Some(period) = r.period else { continue };
        let entry = groups.entry(period).or_insert((0, 0.0));
        entry.0 = entry.0.saturating_add(r.leads);
        entry.1 += r.investment;
    }
    groups
        .into_iter()
        .map(|(period, (total_leads, total_investment))| PeriodTotals {
            period,
            total_leads,
            total_investment,
        })
        .collect()
}

/// Distinct platforms in first-seen order (the order filter controls list them).
pub fn distinct_platforms(records: &[Record]) -> Vec<String> {
    distinct_by(records, |r| &r.platform)
}

/// Distinct campaigns in first-seen order.
pub fn distinct_campaigns(records: &[Record]) -> Vec<String> {
    distinct_by(records, |r| &r.campaign)
}

fn distinct_by<'a>(records: &'a [Record], key: impl Fn(&'a Record) -> &'a String) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for r in records {
        let value = key(r);
        if seen.insert(value.as_str()) {
            out.push(value.clone());
        }
    }
    out
}

/// Earliest and latest non-null period.
pub fn period_bounds(records: &[Record]) -> Option<(Period, Period)> {
    let mut periods = records.iter().filter_map(|r| r.period);
    let first = periods.next()?;
    Some(periods.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
}

/// The select-everything default: every platform, every campaign, full period range.
///
/// With no valid period at all, the range collapses to an inverted one so that the
/// period test rejects every row (there is nothing to place on the time axis).
pub fn default_selection(records: &[Record]) -> FilterSelection {
    let (period_start, period_end) = period_bounds(records).unwrap_or((Period::LATEST, Period::EARLIEST));
    FilterSelection {
        platforms: records.iter().map(|r| r.platform.clone()).collect(),
        campaigns: records.iter().map(|r| r.campaign.clone()).collect(),
        period_start,
        period_end,
    }
}

/// Apply caller overrides on top of the default selection.
pub fn resolve_selection(records: &[Record], overrides: &SelectionOverrides) -> FilterSelection {
    let mut selection = default_selection(records);
    if !overrides.platforms.is_empty() {
        selection.platforms = overrides.platforms.clone();
    }
    if !overrides.campaigns.is_empty() {
        selection.campaigns = overrides.campaigns.clone();
    }
    if let Some(start) = overrides.period_start {
        selection.period_start = start;
    }
    if let Some(end) = overrides.period_end {
        selection.period_end = end;
    }
    selection
}

/// Whether a selection keeps every platform and campaign it was built from.
pub fn selects_all(selection: &FilterSelection, records: &[Record]) -> bool {
    let platforms: BTreeSet<&str> = records.iter().map(|r| r.platform.as_str()).collect();
    let campaigns: BTreeSet<&str> = records.iter().map(|r| r.campaign.as_str()).collect();
    platforms.iter().all(|p| selection.platforms.contains(*p))
        && campaigns.iter().all(|c| selection.campaigns.contains(*c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(platform: &str, campaign: &str, period: Option<(i32, u32)>, investment: f64, leads: i64) -> Record {
        Record {
            platform: platform.to_string(),
            campaign: campaign.to_string(),
            period: period.and_then(|(y, m)| Period::new(y, m)),
            investment,
            leads,
            sales: 0.0,
            impressions: 0,
            clicks: 0,
        }
    }

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    #[test]
    fn group_by_platform_is_lexical() {
        let rows = vec![
            rec("Meta", "A", Some((2024, 1)), 100.0, 10),
            rec("Google", "A", Some((2024, 1)), 50.0, 5),
        ];
        let groups = group_by_platform(&rows);
        assert_eq!(
            groups,
            vec![
                PlatformTotals {
                    platform: "Google".to_string(),
                    total_leads: 5,
                    total_investment: 50.0
                },
                PlatformTotals {
                    platform: "Meta".to_string(),
                    total_leads: 10,
                    total_investment: 100.0
                },
            ]
        );
    }

    #[test]
    fn group_by_platform_does_not_normalize_names() {
        let rows = vec![
            rec("Meta", "A", Some((2024, 1)), 1.0, 1),
            rec("meta", "A", Some((2024, 1)), 1.0, 1),
            rec("Meta ", "A", Some((2024, 1)), 1.0, 1),
        ];
        assert_eq!(group_by_platform(&rows).len(), 3);
    }

    #[test]
    fn metrics_sum_columns_and_derive_ratios() {
        let mut a = rec("Meta", "A", Some((2024, 1)), 100.0, 10);
        a.sales = 1000.0;
        a.clicks = 50;
        a.impressions = 2000;
        let mut b = rec("Google", "A", Some((2024, 2)), 100.0, 10);
        b.sales = 500.0;
        b.clicks = 50;
        b.impressions = 3000;

        let m = compute_metrics(&[a, b]);
        assert_eq!(m.total_investment, 200.0);
        assert_eq!(m.total_leads, 20);
        assert_eq!(m.total_sales, 1500.0);
        assert_eq!(m.total_impressions, 5000);
        assert_eq!(m.total_clicks, 100);
        assert_eq!(m.avg_cost_per_click, 2.0);
        assert_eq!(m.cost_per_lead, 10.0);
        // (1500 × 10) / 200
        assert_eq!(m.return_on_ad_spend, 75.0);
    }

    #[test]
    fn metrics_guard_zero_denominators() {
        let m = compute_metrics(&[rec("Meta", "A", Some((2024, 1)), 100.0, 0)]);
        assert_eq!(m.avg_cost_per_click, 0.0);
        assert_eq!(m.cost_per_lead, 0.0);

        let mut free = rec("Meta", "A", Some((2024, 1)), 0.0, 3);
        free.sales = 10.0;
        free.clicks = 4;
        let m = compute_metrics(&[free]);
        assert_eq!(m.return_on_ad_spend, 0.0);
        assert_eq!(m.avg_cost_per_click, 0.0);

        assert_eq!(compute_metrics(&[]), MetricSet::default());
    }

    #[test]
    fn huge_counts_saturate_instead_of_overflowing() {
        let mut a = rec("Meta", "A", Some((2024, 1)), 10.0, 5_000_000_000_000_000_000);
        a.clicks = i64::MAX;
        let b = a.clone();
        let rows = vec![a, b];

        let m = compute_metrics(&rows);
        assert_eq!(m.total_leads, i64::MAX);
        assert_eq!(m.total_clicks, i64::MAX);
        assert_eq!(group_by_platform(&rows)[0].total_leads, i64::MAX);
        assert_eq!(period_series(&rows)[0].total_leads, i64::MAX);
    }

    #[test]
    fn filter_applies_inclusive_period_range() {
        let rows = vec![
            rec("Meta", "A", Some((2023, 12)), 1.0, 1),
            rec("Meta", "A", Some((2024, 1)), 1.0, 1),
            rec("Meta", "A", Some((2024, 3)), 1.0, 1),
            rec("Meta", "A", Some((2024, 4)), 1.0, 1),
            rec("Meta", "A", None, 1.0, 1),
        ];
        let mut sel = default_selection(&rows);
        sel.period_start = p(2024, 1);
        sel.period_end = p(2024, 3);
        let out = filter(&rows, &sel);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].period, Some(p(2024, 1)));
        assert_eq!(out[1].period, Some(p(2024, 3)));
    }

    #[test]
    fn filter_uses_exact_membership() {
        let rows = vec![
            rec("Meta", "Verão", Some((2024, 1)), 1.0, 1),
            rec("meta", "Verão", Some((2024, 1)), 1.0, 1),
            rec("Google", "Inverno", Some((2024, 1)), 1.0, 1),
        ];
        let mut sel = default_selection(&rows);
        sel.platforms = ["Meta".to_string()].into();
        let out = filter(&rows, &sel);
        assert_eq!(out, vec![rows[0].clone()]);
    }

    #[test]
    fn default_selection_round_trips_full_table() {
        let rows = vec![
            rec("Meta", "A", Some((2024, 2)), 10.5, 1),
            rec("Google", "B", Some((2023, 11)), 20.0, 2),
            rec("Meta", "B", Some((2024, 6)), 0.0, 0),
        ];
        let sel = default_selection(&rows);
        assert_eq!(sel.period_start, p(2023, 11));
        assert_eq!(sel.period_end, p(2024, 6));
        assert_eq!(filter(&rows, &sel), rows);
        assert!(selects_all(&sel, &rows));
    }

    #[test]
    fn default_selection_without_periods_keeps_nothing() {
        let rows = vec![rec("Meta", "A", None, 1.0, 1)];
        let sel = default_selection(&rows);
        assert!(filter(&rows, &sel).is_empty());
        assert_eq!(period_bounds(&rows), None);
    }

    #[test]
    fn overrides_replace_only_what_they_name() {
        let rows = vec![
            rec("Meta", "A", Some((2024, 1)), 1.0, 1),
            rec("Google", "B", Some((2024, 5)), 1.0, 1),
        ];
        let overrides = SelectionOverrides {
            platforms: ["Google".to_string()].into(),
            period_start: Some(p(2024, 2)),
            ..SelectionOverrides::default()
        };
        let sel = resolve_selection(&rows, &overrides);
        assert_eq!(sel.platforms.len(), 1);
        assert_eq!(sel.campaigns.len(), 2);
        assert_eq!(sel.period_start, p(2024, 2));
        assert_eq!(sel.period_end, p(2024, 5));
        assert!(!selects_all(&sel, &rows));
    }

    #[test]
    fn period_series_sums_per_month() {
        let rows = vec![
            rec("Meta", "A", Some((2024, 2)), 10.0, 1),
            rec("Google", "A", Some((2024, 1)), 20.0, 2),
            rec("Meta", "B", Some((2024, 2)), 5.0, 3),
            rec("Meta", "B", None, 100.0, 100),
        ];
        let series = period_series(&rows);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].period, p(2024, 1));
        assert_eq!(series[0].total_leads, 2);
        assert_eq!(series[1].total_leads, 4);
        assert_eq!(series[1].total_investment, 15.0);
    }

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let rows = vec![
            rec("Meta", "Z", None, 0.0, 0),
            rec("Google", "A", None, 0.0, 0),
            rec("Meta", "Z", None, 0.0, 0),
        ];
        assert_eq!(distinct_platforms(&rows), vec!["Meta", "Google"]);
        assert_eq!(distinct_campaigns(&rows), vec!["Z", "A"]);
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            prop::sample::select(vec!["Meta", "Google", "TikTok", "meta"]),
            prop::sample::select(vec!["Verão", "Inverno", "Natal"]),
            prop::option::weighted(0.9, (2022i32..2026, 1u32..=12)),
            0.0f64..10_000.0,
            0i64..1_000,
        )
            .prop_map(|(platform, campaign, period, investment, leads)| {
                rec(platform, campaign, period, investment, leads)
            })
    }

    fn arb_selection() -> impl Strategy<Value = FilterSelection> {
        (
            prop::sample::subsequence(vec!["Meta", "Google", "TikTok", "meta"], 0..=4),
            prop::sample::subsequence(vec!["Verão", "Inverno", "Natal"], 0..=3),
            (2022i32..2026, 1u32..=12),
            (2022i32..2026, 1u32..=12),
        )
            .prop_map(|(platforms, campaigns, (y0, m0), (y1, m1))| FilterSelection {
                platforms: platforms.into_iter().map(str::to_string).collect(),
                campaigns: campaigns.into_iter().map(str::to_string).collect(),
                period_start: p(y0, m0),
                period_end: p(y1, m1),
            })
    }

    proptest! {
        #[test]
        fn prop_filter_output_is_a_matching_subset(
            rows in prop::collection::vec(arb_record(), 0..40),
            sel in arb_selection(),
        ) {
            let out = filter(&rows, &sel);
            prop_assert!(out.len() <= rows.len());
            for r in &out {
                prop_assert!(rows.contains(r));
                prop_assert!(sel.platforms.contains(&r.platform));
                prop_assert!(sel.campaigns.contains(&r.campaign));
                let period = r.period.unwrap();
                prop_assert!(period >= sel.period_start && period <= sel.period_end);
            }
        }

        #[test]
        fn prop_default_selection_keeps_every_dated_row(rows in prop::collection::vec(arb_record(), 0..40)) {
            let sel = default_selection(&rows);
            let out = filter(&rows, &sel);
            let dated: Vec<Record> = rows.iter().filter(|r| r.period.is_some()).cloned().collect();
            prop_assert_eq!(out, dated);
        }

        #[test]
        fn prop_group_totals_match_metrics(rows in prop::collection::vec(arb_record(), 0..40)) {
            let groups = group_by_platform(&rows);
            let m = compute_metrics(&rows);
            let leads: i64 = groups.iter().map(|g| g.total_leads).sum();
            let investment: f64 = groups.iter().map(|g| g.total_investment).sum();
            prop_assert_eq!(leads, m.total_leads);
            prop_assert!((investment - m.total_investment).abs() < 1e-6);
            prop_assert!(groups.windows(2).all(|w| w[0].platform < w[1].platform));
        }
    }
}
