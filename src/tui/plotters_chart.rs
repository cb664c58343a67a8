//! Plotters-powered trend chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call; x values are
/// month indices into `x_labels`.
pub struct TrendPlottersChart<'a> {
    /// Leads per month.
    pub leads: &'a [(f64, f64)],
    /// Investment per month.
    pub investment: &'a [(f64, f64)],
    /// `MM/YYYY` label for each month index.
    pub x_labels: &'a [String],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for TrendPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let label_count = self.x_labels.len().clamp(1, 6);

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(label_count)
                .y_labels(5)
                .x_label_formatter(&|v| month_label(self.x_labels, *v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let investment_color = RGBColor(0, 255, 255); // cyan
            let leads_color = RGBColor(255, 200, 0); // amber

            chart.draw_series(LineSeries::new(self.investment.iter().copied(), &investment_color))?;
            chart.draw_series(LineSeries::new(self.leads.iter().copied(), &leads_color))?;

            // Single-month selections have no line segment, so mark the points too.
            chart.draw_series(
                self.investment
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), investment_color)),
            )?;
            chart.draw_series(self.leads.iter().map(|&(x, y)| Pixel::new((x, y), leads_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Label for a (possibly fractional) tick position; off-grid ticks stay blank.
fn month_label(labels: &[String], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 0.25 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}
