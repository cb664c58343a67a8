//! Ratatui-based terminal dashboard.
//!
//! The UI is driven by an explicit event loop:
//!
//! key press -> `Action` -> new `DashState` snapshot -> `render(&state)` -> draw
//!
//! `DashState` is never mutated in place by drawing code, and `render` is a pure
//! function of it, so every frame is reproducible from the current filter choices.

use std::collections::BTreeSet;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, List, ListItem, Paragraph, Row, Table},
};

use crate::app::pipeline::{Dataset, load_dataset, run_report};
use crate::data::SheetSource;
use crate::domain::{FilterSelection, Period, PeriodTotals, PlatformTotals, Record, SelectionOverrides};
use crate::error::AppError;
use crate::report::{
    Tile, default_selection, detail_cells, distinct_campaigns, distinct_platforms, format_count,
    metric_tiles, period_bounds, resolve_selection,
};

mod plotters_chart;

use plotters_chart::TrendPlottersChart;

/// Rows drawn in the detail table; the terminal cannot show more anyway.
const MAX_TABLE_ROWS: usize = 500;

/// Start the TUI.
pub fn run(source: Box<dyn SheetSource>, overrides: SelectionOverrides) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(source, overrides);
    app.reload();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Filter panels, in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Platforms,
    Campaigns,
    PeriodStart,
    PeriodEnd,
}

impl Panel {
    const ALL: [Panel; 4] = [Panel::Platforms, Panel::Campaigns, Panel::PeriodStart, Panel::PeriodEnd];

    fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Which chart occupies the chart pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Trend,
    LeadsByPlatform,
    InvestmentShare,
}

impl ChartKind {
    fn next(self) -> Self {
        match self {
            ChartKind::Trend => ChartKind::LeadsByPlatform,
            ChartKind::LeadsByPlatform => ChartKind::InvestmentShare,
            ChartKind::InvestmentShare => ChartKind::Trend,
        }
    }

    fn title(self) -> &'static str {
        match self {
            ChartKind::Trend => "Leads and investment over time",
            ChartKind::LeadsByPlatform => "Leads by platform",
            ChartKind::InvestmentShare => "Investment share",
        }
    }
}

/// Which rows the table pane lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Rows passing the current filters.
    Selected,
    /// Every loaded row, including those without a valid period.
    Loaded,
}

impl TableKind {
    fn next(self) -> Self {
        match self {
            TableKind::Selected => TableKind::Loaded,
            TableKind::Loaded => TableKind::Selected,
        }
    }

    fn title(self) -> &'static str {
        match self {
            TableKind::Selected => "Detailed data",
            TableKind::Loaded => "Loaded data (unfiltered)",
        }
    }
}

/// User intents, decoupled from concrete key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Reload,
    FocusNext,
    FocusPrev,
    Left,
    Right,
    Toggle,
    SelectAll,
    SelectNone,
    Reset,
    NextChart,
    NextTable,
}

pub fn action_for_key(code: KeyCode) -> Option<Action> {
    Some(match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r') => Action::Reload,
        KeyCode::Down => Action::FocusNext,
        KeyCode::Up => Action::FocusPrev,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Char(' ') | KeyCode::Enter => Action::Toggle,
        KeyCode::Char('a') => Action::SelectAll,
        KeyCode::Char('n') => Action::SelectNone,
        KeyCode::Char('R') => Action::Reset,
        KeyCode::Tab => Action::NextChart,
        KeyCode::Char('t') => Action::NextTable,
        _ => return None,
    })
}

/// Immutable snapshot of everything the screen depends on.
#[derive(Debug, Clone)]
pub struct DashState {
    pub dataset: Option<Rc<Dataset>>,
    /// Filter options in first-seen order.
    pub platforms: Vec<String>,
    pub campaigns: Vec<String>,
    /// Distinct valid periods, ascending.
    pub periods: Vec<Period>,
    pub selection: Option<FilterSelection>,
    pub focus: Panel,
    pub platform_cursor: usize,
    pub campaign_cursor: usize,
    pub chart: ChartKind,
    pub table: TableKind,
    pub status: String,
}

impl Default for DashState {
    fn default() -> Self {
        Self {
            dataset: None,
            platforms: Vec::new(),
            campaigns: Vec::new(),
            periods: Vec::new(),
            selection: None,
            focus: Panel::Platforms,
            platform_cursor: 0,
            campaign_cursor: 0,
            chart: ChartKind::Trend,
            table: TableKind::Selected,
            status: "Loading...".to_string(),
        }
    }
}

impl DashState {
    /// State for a freshly loaded dataset.
    ///
    /// The first load starts from the overrides; a refetch keeps the current choices.
    pub fn with_dataset(&self, dataset: Dataset, overrides: &SelectionOverrides) -> Self {
        let mut periods: Vec<Period> = dataset.records.iter().filter_map(|r| r.period).collect();
        periods.sort();
        periods.dedup();

        let status = format!(
            "Loaded {} rows from {}{}",
            dataset.records.len(),
            dataset.source,
            match dataset.rows_without_period() {
                0 => String::new(),
                n => format!(" ({n} without a valid period)"),
            }
        );

        let selection = match (&self.dataset, &self.selection) {
            (Some(old), Some(current)) => carry_selection(current, &old.records, &dataset.records),
            _ => resolve_selection(&dataset.records, overrides),
        };
        let platforms = distinct_platforms(&dataset.records);
        let campaigns = distinct_campaigns(&dataset.records);

        Self {
            platform_cursor: self.platform_cursor.min(platforms.len().saturating_sub(1)),
            campaign_cursor: self.campaign_cursor.min(campaigns.len().saturating_sub(1)),
            platforms,
            campaigns,
            periods,
            selection: Some(selection),
            dataset: Some(Rc::new(dataset)),
            status,
            ..self.clone()
        }
    }

    /// Keep the current data but report a failure.
    pub fn with_status(&self, status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..self.clone()
        }
    }

    /// Apply one action, returning the next snapshot.
    ///
    /// `Quit` and `Reload` are handled by the event loop and leave the state as is.
    pub fn apply(&self, action: Action) -> Self {
        let mut next = self.clone();
        match action {
            Action::Quit | Action::Reload => {}
            Action::FocusNext => next.focus = self.focus.next(),
            Action::FocusPrev => next.focus = self.focus.prev(),
            Action::NextChart => next.chart = self.chart.next(),
            Action::NextTable => next.table = self.table.next(),
            Action::Left => next.step(-1),
            Action::Right => next.step(1),
            Action::Toggle => next.toggle_current(),
            Action::SelectAll => next.set_all(true),
            Action::SelectNone => next.set_all(false),
            Action::Reset => {
                if let Some(dataset) = &self.dataset {
                    next.selection = Some(default_selection(&dataset.records));
                    next.status = "Filters reset.".to_string();
                }
            }
        }
        next
    }

    fn step(&mut self, delta: isize) {
        match self.focus {
            Panel::Platforms => {
                self.platform_cursor = move_cursor(self.platform_cursor, delta, self.platforms.len());
            }
            Panel::Campaigns => {
                self.campaign_cursor = move_cursor(self.campaign_cursor, delta, self.campaigns.len());
            }
            Panel::PeriodStart | Panel::PeriodEnd => {
                let focus = self.focus;
                let periods = &self.periods;
                let Some(sel) = self.selection.as_mut() else { return };
                let bound = if focus == Panel::PeriodStart {
                    &mut sel.period_start
                } else {
                    &mut sel.period_end
                };
                if let Some(p) = step_period(periods, *bound, delta) {
                    *bound = p;
                }
            }
        }
    }

    fn toggle_current(&mut self) {
        let (options, cursor) = match self.focus {
            Panel::Platforms => (&self.platforms, self.platform_cursor),
            Panel::Campaigns => (&self.campaigns, self.campaign_cursor),
            Panel::PeriodStart | Panel::PeriodEnd => return,
        };
        let Some(value) = options.get(cursor).cloned() else { return };
        let focus = self.focus;
        let Some(sel) = self.selection.as_mut() else { return };
        let set = if focus == Panel::Platforms {
            &mut sel.platforms
        } else {
            &mut sel.campaigns
        };
        if !set.remove(&value) {
            set.insert(value);
        }
    }

    fn set_all(&mut self, on: bool) {
        let options = match self.focus {
            Panel::Platforms => self.platforms.clone(),
            Panel::Campaigns => self.campaigns.clone(),
            Panel::PeriodStart | Panel::PeriodEnd => return,
        };
        let focus = self.focus;
        let Some(sel) = self.selection.as_mut() else { return };
        let set = if focus == Panel::Platforms {
            &mut sel.platforms
        } else {
            &mut sel.campaigns
        };
        if on {
            set.extend(options);
        } else {
            set.clear();
        }
    }
}

/// Carry filter choices over to a refetched table.
///
/// A list with every old option ticked stays fully ticked, new values included;
/// otherwise values that no longer occur are dropped. Period bounds sitting on the
/// old data's edges follow the new edges.
fn carry_selection(current: &FilterSelection, old: &[Record], new: &[Record]) -> FilterSelection {
    let fresh = default_selection(new);

    let carry = |chosen: &BTreeSet<String>, old_values: Vec<String>, new_values: &BTreeSet<String>| {
        if old_values.iter().all(|v| chosen.contains(v)) {
            new_values.clone()
        } else {
            chosen.intersection(new_values).cloned().collect()
        }
    };

    let (period_start, period_end) = match period_bounds(old) {
        Some((lo, hi)) => (
            if current.period_start == lo { fresh.period_start } else { current.period_start },
            if current.period_end == hi { fresh.period_end } else { current.period_end },
        ),
        None => (fresh.period_start, fresh.period_end),
    };

    FilterSelection {
        platforms: carry(&current.platforms, distinct_platforms(old), &fresh.platforms),
        campaigns: carry(&current.campaigns, distinct_campaigns(old), &fresh.campaigns),
        period_start,
        period_end,
    }
}

fn move_cursor(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}

/// Move to the neighbouring available period, snapping to the list when the
/// current bound is not one of them.
fn step_period(periods: &[Period], current: Period, delta: isize) -> Option<Period> {
    if periods.is_empty() {
        return None;
    }
    let idx = match periods.binary_search(&current) {
        Ok(i) => i.saturating_add_signed(delta),
        // Between two entries: left goes to the lower one, right to the upper one.
        Err(i) if delta < 0 => i.saturating_sub(1),
        Err(i) => i,
    };
    periods.get(idx.min(periods.len() - 1)).copied()
}

/// One filter option as drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub label: String,
    pub checked: bool,
    pub under_cursor: bool,
}

/// Chart pane contents.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartView {
    Trend(Vec<PeriodTotals>),
    LeadsByPlatform(Vec<PlatformTotals>),
    InvestmentShare(Vec<PlatformTotals>),
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub header: String,
    pub tiles: Vec<Tile>,
    pub focus: Panel,
    pub platforms: Vec<OptionView>,
    pub campaigns: Vec<OptionView>,
    pub period_start: String,
    pub period_end: String,
    pub chart_title: &'static str,
    pub chart: ChartView,
    pub table_title: &'static str,
    pub table: Vec<[String; 8]>,
    pub hidden_rows: usize,
    pub status: String,
}

/// Build the UI description for a state snapshot.
pub fn render(state: &DashState) -> View {
    let (Some(dataset), Some(selection)) = (&state.dataset, &state.selection) else {
        return View {
            header: "dash - no data loaded".to_string(),
            tiles: Vec::new(),
            focus: state.focus,
            platforms: Vec::new(),
            campaigns: Vec::new(),
            period_start: "-".to_string(),
            period_end: "-".to_string(),
            chart_title: state.chart.title(),
            chart: ChartView::Trend(Vec::new()),
            table_title: state.table.title(),
            table: Vec::new(),
            hidden_rows: 0,
            status: state.status.clone(),
        };
    };

    let report = run_report(&dataset.records, selection);

    let options = |values: &[String], chosen: &std::collections::BTreeSet<String>, cursor: usize| {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| OptionView {
                label: if v.is_empty() { "(blank)".to_string() } else { v.clone() },
                checked: chosen.contains(v),
                under_cursor: i == cursor,
            })
            .collect::<Vec<_>>()
    };

    let chart = match state.chart {
        ChartKind::Trend => ChartView::Trend(report.by_period.clone()),
        ChartKind::LeadsByPlatform => ChartView::LeadsByPlatform(report.by_platform.clone()),
        ChartKind::InvestmentShare => ChartView::InvestmentShare(report.by_platform.clone()),
    };

    let table_rows: &[Record] = match state.table {
        TableKind::Selected => &report.rows,
        TableKind::Loaded => &dataset.records,
    };
    let shown = table_rows.len().min(MAX_TABLE_ROWS);

    View {
        header: format!(
            "dash - {} | {} of {} rows selected",
            dataset.source,
            report.rows.len(),
            dataset.records.len()
        ),
        tiles: metric_tiles(&report.metrics),
        focus: state.focus,
        platforms: options(&state.platforms, &selection.platforms, state.platform_cursor),
        campaigns: options(&state.campaigns, &selection.campaigns, state.campaign_cursor),
        period_start: selection.period_start.to_string(),
        period_end: selection.period_end.to_string(),
        chart_title: state.chart.title(),
        chart,
        table_title: state.table.title(),
        table: table_rows.iter().take(shown).map(detail_cells).collect(),
        hidden_rows: table_rows.len() - shown,
        status: state.status.clone(),
    }
}

struct App {
    source: Box<dyn SheetSource>,
    overrides: SelectionOverrides,
    state: DashState,
}

impl App {
    fn new(source: Box<dyn SheetSource>, overrides: SelectionOverrides) -> Self {
        Self {
            source,
            overrides,
            state: DashState::default(),
        }
    }

    /// Refetch; on failure keep whatever data is already on screen.
    fn reload(&mut self) {
        self.state = match load_dataset(self.source.as_ref()) {
            Ok(dataset) => self.state.with_dataset(dataset, &self.overrides),
            Err(err) => {
                tracing::warn!(error = %err, "reload failed");
                self.state.with_status(format!("Error: {err}"))
            }
        };
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                let view = render(&self.state);
                terminal
                    .draw(|f| draw(f, &view))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let Some(action) = action_for_key(key.code) else { continue };
                    match action {
                        Action::Quit => break,
                        Action::Reload => {
                            self.state = self.state.with_status("Fetching data...");
                            let view = render(&self.state);
                            terminal
                                .draw(|f| draw(f, &view))
                                .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                            self.reload();
                        }
                        other => self.state = self.state.apply(other),
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn draw(frame: &mut ratatui::Frame<'_>, view: &View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], view);
    draw_tiles(frame, chunks[1], view);
    draw_body(frame, chunks[2], view);
    draw_footer(frame, chunks[3], view);
}

fn draw_header(frame: &mut ratatui::Frame<'_>, area: Rect, view: &View) {
    let line = Line::from(vec![
        Span::styled("Marketing Dashboard", Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(view.header.clone(), Style::default().fg(Color::Gray)),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(p, area);
}

fn draw_tiles(frame: &mut ratatui::Frame<'_>, area: Rect, view: &View) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);

    for (row_area, tiles) in rows.iter().zip(view.tiles.chunks(4)) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(*row_area);
        for (col, tile) in cols.iter().zip(tiles) {
            let p = Paragraph::new(Span::styled(
                tile.value.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .block(Block::default().title(tile.label).borders(Borders::ALL));
            frame.render_widget(p, *col);
        }
    }
}

fn draw_body(frame: &mut ratatui::Frame<'_>, area: Rect, view: &View) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(area);

    draw_filters(frame, cols[0], view);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(cols[1]);
    draw_chart(frame, right[0], view);
    draw_table(frame, right[1], view);
}

fn draw_filters(frame: &mut ratatui::Frame<'_>, area: Rect, view: &View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Min(3), Constraint::Length(4)])
        .split(area);

    draw_option_list(frame, chunks[0], "Platforms", &view.platforms, view.focus == Panel::Platforms);
    draw_option_list(frame, chunks[1], "Campaigns", &view.campaigns, view.focus == Panel::Campaigns);

    let marker = |panel: Panel| if view.focus == panel { "» " } else { "  " };
    let focused = |panel: Panel| {
        if view.focus == panel {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default()
        }
    };
    let lines = vec![
        Line::from(Span::styled(
            format!("{}From: {}", marker(Panel::PeriodStart), view.period_start),
            focused(Panel::PeriodStart),
        )),
        Line::from(Span::styled(
            format!("{}To:   {}", marker(Panel::PeriodEnd), view.period_end),
            focused(Panel::PeriodEnd),
        )),
    ];
    let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Period").borders(Borders::ALL));
    frame.render_widget(p, chunks[2]);
}

fn draw_option_list(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, options: &[OptionView], focused: bool) {
    let items: Vec<ListItem> = options
        .iter()
        .map(|o| {
            let check = if o.checked { "[x]" } else { "[ ]" };
            ListItem::new(format!("{check} {}", o.label))
        })
        .collect();

    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL).border_style(border))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
        .highlight_symbol("» ");

    let mut state = ratatui::widgets::ListState::default();
    if focused {
        state.select(options.iter().position(|o| o.under_cursor));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, view: &View) {
    let block = Block::default().title(view.chart_title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    match &view.chart {
        ChartView::Trend(series) => draw_trend(frame, inner, series),
        ChartView::LeadsByPlatform(groups) => {
            if groups.is_empty() {
                frame.render_widget(no_rows(), inner);
                return;
            }
            let bars: Vec<Bar> = groups
                .iter()
                .map(|g| {
                    Bar::default()
                        .value(g.total_leads.max(0) as u64)
                        .label(Line::from(g.platform.clone()))
                        .text_value(format_count(g.total_leads))
                })
                .collect();
            let chart = BarChart::default()
                .data(BarGroup::default().bars(&bars))
                .bar_width(9)
                .bar_gap(2)
                .bar_style(Style::default().fg(Color::Cyan))
                .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
            frame.render_widget(chart, inner);
        }
        ChartView::InvestmentShare(groups) => {
            if groups.is_empty() {
                frame.render_widget(no_rows(), inner);
                return;
            }
            let width = (inner.width as usize).saturating_sub(label_len(groups) + 14).max(1);
            let text = crate::plot::render_share_bars(groups, width);
            // Skip the title line; the block already carries it.
            let lines: Vec<Line> = text.lines().skip(1).map(|l| Line::from(l.to_string())).collect();
            frame.render_widget(Paragraph::new(Text::from(lines)), inner);
        }
    }
}

fn label_len(groups: &[PlatformTotals]) -> usize {
    groups.iter().map(|g| g.platform.chars().count()).max().unwrap_or(0)
}

fn no_rows() -> Paragraph<'static> {
    Paragraph::new("No rows match the current filters.").style(Style::default().fg(Color::Yellow))
}

fn draw_trend(frame: &mut ratatui::Frame<'_>, area: Rect, series: &[PeriodTotals]) {
    if series.is_empty() {
        frame.render_widget(no_rows(), area);
        return;
    }

    let (leads, investment, labels, x_bounds, y_bounds) = trend_series(series);
    let widget = TrendPlottersChart {
        leads: &leads,
        investment: &investment,
        x_labels: &labels,
        x_bounds,
        y_bounds,
        fmt_y: fmt_axis_y,
    };
    frame.render_widget(widget, area);
}

/// Build chart series for Plotters: x is the month index.
fn trend_series(
    series: &[PeriodTotals],
) -> (Vec<(f64, f64)>, Vec<(f64, f64)>, Vec<String>, [f64; 2], [f64; 2]) {
    let leads: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, s)| (i as f64, s.total_leads as f64))
        .collect();
    let investment: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, s)| (i as f64, s.total_investment))
        .collect();
    let labels = series.iter().map(|s| s.period.to_string()).collect();

    let n = series.len() as f64;
    let x_bounds = if series.len() < 2 { [-0.5, 0.5] } else { [0.0, n - 1.0] };

    let (mut y_min, mut y_max) = (0.0_f64, f64::NEG_INFINITY);
    for &(_, y) in leads.iter().chain(investment.iter()) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_max.is_finite() || y_max <= y_min {
        y_max = y_min + 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    (leads, investment, labels, x_bounds, [y_min, y_max + pad])
}

fn fmt_axis_y(v: f64) -> String {
    if v.abs() >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v.abs() >= 1_000.0 {
        format!("{:.1}k", v / 1_000.0)
    } else {
        format!("{v:.0}")
    }
}

fn draw_table(frame: &mut ratatui::Frame<'_>, area: Rect, view: &View) {
    let header = Row::new(["Platform", "Campaign", "Period", "Investment", "Leads", "Sales", "Impr.", "Clicks"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = view.table.iter().map(|cells| Row::new(cells.clone())).collect();

    let widths = [
        Constraint::Min(8),
        Constraint::Min(10),
        Constraint::Length(7),
        Constraint::Length(13),
        Constraint::Length(8),
        Constraint::Length(13),
        Constraint::Length(11),
        Constraint::Length(9),
    ];
    let title = if view.hidden_rows > 0 {
        format!("{} (+{} rows not shown)", view.table_title, view.hidden_rows)
    } else {
        view.table_title.to_string()
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn draw_footer(frame: &mut ratatui::Frame<'_>, area: Rect, view: &View) {
    let help = "↑/↓ panel  ←/→ move  Space toggle  a all  n none  R reset  Tab chart  t table  r reload  q quit";
    let line = Line::from(vec![
        Span::styled(help, Style::default().fg(Color::Gray)),
        Span::raw(" | "),
        Span::styled(view.status.clone(), Style::default().fg(Color::Yellow)),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::testing::{SAMPLE, StaticCsv};

    fn loaded() -> DashState {
        let dataset = load_dataset(&StaticCsv(SAMPLE)).unwrap();
        DashState::default().with_dataset(dataset, &SelectionOverrides::default())
    }

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    #[test]
    fn render_without_data_shows_status() {
        let view = render(&DashState::default().with_status("Error: boom"));
        assert!(view.tiles.is_empty());
        assert_eq!(view.status, "Error: boom");
    }

    #[test]
    fn render_is_pure() {
        let state = loaded();
        assert_eq!(render(&state), render(&state));
    }

    #[test]
    fn loaded_state_lists_options_in_first_seen_order() {
        let state = loaded();
        assert_eq!(state.platforms, vec!["Meta", "Google", "TikTok"]);
        assert_eq!(state.campaigns, vec!["Verão", "Black Friday"]);
        assert_eq!(state.periods, vec![p(2024, 1), p(2024, 2), p(2024, 3)]);
        assert!(state.status.contains("1 without a valid period"));

        let view = render(&state);
        assert_eq!(view.table.len(), 5);
        assert!(view.platforms.iter().all(|o| o.checked));
        assert_eq!(view.tiles[0].value, "R$ 3,300.00");
    }

    #[test]
    fn toggling_a_platform_removes_its_rows() {
        // Cursor starts on "Meta".
        let state = loaded().apply(Action::Toggle);
        let view = render(&state);
        assert!(!view.platforms[0].checked);
        assert!(view.table.iter().all(|row| row[0] != "Meta"));
        assert_eq!(view.table.len(), 3);

        let back = state.apply(Action::Toggle);
        assert_eq!(render(&back).table.len(), 5);
    }

    #[test]
    fn select_none_then_all_on_campaigns() {
        let state = loaded().apply(Action::FocusNext).apply(Action::SelectNone);
        assert!(render(&state).table.is_empty());
        let state = state.apply(Action::SelectAll);
        assert_eq!(render(&state).table.len(), 5);
    }

    #[test]
    fn period_bounds_step_through_available_months() {
        let state = loaded()
            .apply(Action::FocusNext)
            .apply(Action::FocusNext)
            .apply(Action::Right);
        assert_eq!(state.focus, Panel::PeriodStart);
        let sel = state.selection.as_ref().unwrap();
        assert_eq!(sel.period_start, p(2024, 2));
        assert_eq!(render(&state).table.len(), 3);

        // Stepping past the last month clamps.
        let end = state.apply(Action::FocusNext).apply(Action::Right);
        assert_eq!(end.selection.as_ref().unwrap().period_end, p(2024, 3));
    }

    #[test]
    fn reset_restores_default_selection() {
        let state = loaded().apply(Action::Toggle).apply(Action::Reset);
        assert_eq!(render(&state).table.len(), 5);
        assert_eq!(state.status, "Filters reset.");
    }

    #[test]
    fn focus_and_chart_cycle() {
        let state = loaded().apply(Action::FocusPrev);
        assert_eq!(state.focus, Panel::PeriodEnd);
        let state = state.apply(Action::NextChart).apply(Action::NextChart);
        assert_eq!(state.chart, ChartKind::InvestmentShare);
        assert!(matches!(render(&state).chart, ChartView::InvestmentShare(ref g) if g.len() == 3));
    }

    #[test]
    fn cursor_is_clamped_to_options() {
        let state = loaded().apply(Action::Left);
        assert_eq!(state.platform_cursor, 0);
        let state = state.apply(Action::Right).apply(Action::Right).apply(Action::Right);
        assert_eq!(state.platform_cursor, 2);
    }

    #[test]
    fn step_period_snaps_to_available_months() {
        let periods = vec![p(2024, 1), p(2024, 3), p(2024, 5)];
        assert_eq!(step_period(&periods, p(2024, 2), 1), Some(p(2024, 3)));
        assert_eq!(step_period(&periods, p(2024, 2), -1), Some(p(2024, 1)));
        assert_eq!(step_period(&periods, p(2023, 1), -1), Some(p(2024, 1)));
        assert_eq!(step_period(&periods, p(2025, 1), 1), Some(p(2024, 5)));
        assert_eq!(step_period(&[], p(2024, 1), 1), None);
    }

    #[test]
    fn loaded_table_shows_every_row_including_undated() {
        let state = loaded().apply(Action::Toggle).apply(Action::NextTable);
        let view = render(&state);
        assert_eq!(view.table_title, "Loaded data (unfiltered)");
        assert_eq!(view.table.len(), 6);
        assert!(view.table.iter().any(|row| row[0] == "TikTok" && row[2] == "-"));
        // KPIs still follow the filters.
        assert_eq!(view.tiles[0].value, "R$ 800.00");

        let back = render(&state.apply(Action::NextTable));
        assert_eq!(back.table_title, "Detailed data");
        assert_eq!(back.table.len(), 3);
    }

    #[test]
    fn refetch_keeps_user_choices() {
        let state = loaded().apply(Action::Toggle);
        let again = load_dataset(&StaticCsv(SAMPLE)).unwrap();
        let state = state.with_dataset(again, &SelectionOverrides::default());

        let view = render(&state);
        assert!(!view.platforms[0].checked);
        assert_eq!(view.table.len(), 3);
    }

    #[test]
    fn refetch_drops_vanished_values_and_adopts_new_ones_in_full_lists() {
        let state = loaded().apply(Action::Toggle);
        let changed = load_dataset(&StaticCsv(
            "Plataforma,Campanha,Mês/Ano,Investimento,Leads,Vendas,Impressões,Cliques\n\
             Google,Verão,01/2024,10,1,0,0,0\n\
             LinkedIn,Natal,04/2024,20,2,0,0,0\n",
        ))
        .unwrap();
        let state = state.with_dataset(changed, &SelectionOverrides::default());
        let sel = state.selection.as_ref().unwrap();

        // Meta was unticked, so the platform list is carried as a partial choice.
        assert_eq!(sel.platforms.iter().collect::<Vec<_>>(), vec!["Google"]);
        // Every campaign was ticked, so the new one is too.
        assert!(sel.campaigns.contains("Natal"));
        // The end bound sat on the old last month and follows the new one.
        assert_eq!(sel.period_end, p(2024, 4));
        assert_eq!(state.platform_cursor, 0);
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(action_for_key(KeyCode::Char('q')), Some(Action::Quit));
        assert_eq!(action_for_key(KeyCode::Char(' ')), Some(Action::Toggle));
        assert_eq!(action_for_key(KeyCode::Tab), Some(Action::NextChart));
        assert_eq!(action_for_key(KeyCode::Char('t')), Some(Action::NextTable));
        assert_eq!(action_for_key(KeyCode::Char('z')), None);
    }

    #[test]
    fn trend_series_bounds() {
        let dataset = load_dataset(&StaticCsv(SAMPLE)).unwrap();
        let sel = default_selection(&dataset.records);
        let report = run_report(&dataset.records, &sel);
        let (leads, investment, labels, x, y) = trend_series(&report.by_period);
        assert_eq!(leads.len(), 3);
        assert_eq!(investment[1], (1.0, 1500.0));
        assert_eq!(labels, vec!["01/2024", "02/2024", "03/2024"]);
        assert_eq!(x, [0.0, 2.0]);
        assert_eq!(y[0], 0.0);
        assert!(y[1] > 1500.0);
    }
}
