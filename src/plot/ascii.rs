//! ASCII/Unicode charts for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Charts:
//! - trend: investment line `-` with `$` markers, leads line `.` with `L` markers
//! - leads per platform: horizontal `#` bars
//! - investment share per platform: horizontal `=` bars with percentages

use crate::domain::{PeriodTotals, PlatformTotals};

/// Render the monthly leads + investment trend on a shared y-axis.
pub fn render_trend_chart(series: &[PeriodTotals], width: usize, height: usize) -> String {
    let Some((first, last)) = series.first().zip(series.last()) else {
        return "Trend: (no dated rows selected)\n".to_string();
    };

    let width = width.max(2);
    let height = height.max(2);

    let leads: Vec<f64> = series.iter().map(|s| s.total_leads as f64).collect();
    let investment: Vec<f64> = series.iter().map(|s| s.total_investment).collect();
    let (y_min, y_max) = y_range(leads.iter().chain(investment.iter()).copied());

    let n = series.len();
    let to_cells = |values: &[f64]| -> Vec<(usize, usize)> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (map_x(i, n, width), map_y(v, y_min, y_max, height)))
            .collect()
    };
    let inv_cells = to_cells(&investment);
    let lead_cells = to_cells(&leads);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so markers overlay them; leads markers win ties.
    draw_polyline(&mut grid, &inv_cells, '-');
    draw_polyline(&mut grid, &lead_cells, '.');
    for &(x, y) in &inv_cells {
        grid[y][x] = '$';
    }
    for &(x, y) in &lead_cells {
        grid[y][x] = 'L';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Trend: leads (L) and investment ($) | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str(&format!("{} → {}\n", first.period, last.period));
    out
}

/// Render leads per platform as horizontal bars scaled to the largest group.
pub fn render_leads_bars(groups: &[PlatformTotals], width: usize) -> String {
    let mut out = String::from("Leads by platform:\n");
    if groups.is_empty() {
        out.push_str("  (no rows selected)\n");
        return out;
    }

    let label_w = label_width(groups);
    let max = groups.iter().map(|g| g.total_leads.max(0)).max().unwrap_or(0);
    for g in groups {
        let len = scaled_len(g.total_leads.max(0) as f64, max as f64, width);
        out.push_str(&format!(
            "  {:<label_w$} |{} {}\n",
            g.platform,
            "#".repeat(len),
            g.total_leads
        ));
    }
    out
}

/// Render each platform's share of total investment.
pub fn render_share_bars(groups: &[PlatformTotals], width: usize) -> String {
    let mut out = String::from("Investment share:\n");
    if groups.is_empty() {
        out.push_str("  (no rows selected)\n");
        return out;
    }

    let label_w = label_width(groups);
    let total: f64 = groups.iter().map(|g| g.total_investment.max(0.0)).sum();
    for g in groups {
        let share = if total > 0.0 { g.total_investment.max(0.0) / total } else { 0.0 };
        let len = scaled_len(share, 1.0, width);
        out.push_str(&format!(
            "  {:<label_w$} |{:<width$} {:>5.1}%\n",
            g.platform,
            "=".repeat(len),
            share * 100.0
        ));
    }
    out
}

fn label_width(groups: &[PlatformTotals]) -> usize {
    groups
        .iter()
        .map(|g| g.platform.chars().count())
        .max()
        .unwrap_or(0)
}

fn scaled_len(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || !value.is_finite() {
        return 0;
    }
    ((value / max).clamp(0.0, 1.0) * width as f64).round() as usize
}

/// The y-range always includes zero so bars and lines read as magnitudes.
fn y_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi > lo { (lo, hi) } else { (0.0, 1.0) }
}

fn map_x(i: usize, n: usize, width: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let u = i as f64 / (n as f64 - 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], cells: &[(usize, usize)], ch: char) {
    for pair in cells.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        draw_line(grid, x0, y0, x1, y1, ch);
    }
}

/// Integer line drawing (Bresenham-ish); only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
