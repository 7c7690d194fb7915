//! Application state and event loop

use std::cell::Cell;
use std::sync::mpsc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    DefaultTerminal, Frame,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::cli::{latest_line, Context};
use crate::services::aggregator::HOUR_MS;
use crate::services::{
    samples_from_history, ApiClient, ChartData, ChartOptions, TimeSeriesAggregator, ViewRange,
};
use crate::types::{AccountRc, Bucket, CostHistory, Sample, ScaleThresholds};

use super::theme::Theme;
use super::widgets::{
    account::{AccountStatus, AccountView},
    buckets::BucketTable,
    chart::CostChart,
    help::HelpPopup,
    spinner::{LoadingStage, Spinner},
    tabs::{Tab, TabBar},
};

/// Upper bound for the smoothing window set from the keyboard
const MAX_SMOOTHING: usize = 30;

/// Content wider than this is centered
const MAX_CONTENT_WIDTH: u16 = 120;

/// Bucket rows assumed visible before the first draw
const DEFAULT_TABLE_ROWS: usize = 20;

/// Application state
pub enum AppState {
    /// Loading data with spinner animation
    Loading {
        spinner_frame: usize,
        stage: LoadingStage,
    },
    /// Ready with loaded data
    Ready { data: Box<AppData> },
    /// Error state
    Error { message: String },
}

/// One successful fetch from the service
pub struct AppData {
    pub samples: Vec<Sample>,
    pub history: CostHistory,
    /// Reference instant for lookback windows
    pub loaded_at: DateTime<Utc>,
    /// `None` when no account was requested
    pub account: Option<Result<AccountRc, String>>,
}

/// Completion message from a background load
pub struct LoadResult {
    pub generation: u64,
    pub result: Result<Box<AppData>, String>,
}

/// Series derived from the loaded data for the current range and smoothing
struct View {
    chart: Result<ChartData, String>,
    /// Rows of the Buckets tab: hourly for the daily range, daily otherwise
    table: Vec<Bucket>,
}

/// Main application
pub struct App {
    state: AppState,
    should_quit: bool,
    current_tab: Tab,
    range: ViewRange,
    smoothing_window: usize,
    thresholds: ScaleThresholds,
    buckets_scroll: usize,
    /// Rows the Buckets table showed on the last draw
    table_rows: Cell<usize>,
    show_help: bool,
    theme: Theme,
    user: Option<String>,
    /// Generation of the load whose result will be accepted
    generation: u64,
    refresh_requested: bool,
    view: Option<View>,
}

impl App {
    pub fn new(options: ChartOptions, user: Option<String>, theme: Theme) -> Self {
        Self {
            state: AppState::Loading {
                spinner_frame: 0,
                stage: LoadingStage::Fetching,
            },
            should_quit: false,
            current_tab: Tab::default(),
            range: options.range,
            smoothing_window: options.smoothing_window.max(1),
            thresholds: options.thresholds,
            buckets_scroll: 0,
            table_rows: Cell::new(DEFAULT_TABLE_ROWS),
            show_help: false,
            theme,
            user,
            generation: 0,
            refresh_requested: false,
            view: None,
        }
    }

    /// Handle keyboard events
    pub fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            if key.kind != KeyEventKind::Press {
                return;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Char('?') => {
                    self.show_help = !self.show_help;
                }
                KeyCode::Tab => {
                    self.current_tab = self.current_tab.next();
                }
                KeyCode::BackTab => {
                    self.current_tab = self.current_tab.prev();
                }
                KeyCode::Char(c @ '1'..='3') => {
                    if let Some(tab) = Tab::from_number(c as u8 - b'0') {
                        self.current_tab = tab;
                    }
                }
                KeyCode::Char('d') => self.set_range(ViewRange::Daily),
                KeyCode::Char('w') => self.set_range(ViewRange::Weekly),
                KeyCode::Char('m') => self.set_range(ViewRange::Monthly),
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.set_smoothing(self.smoothing_window + 1);
                }
                KeyCode::Char('-') => {
                    self.set_smoothing(self.smoothing_window.saturating_sub(1));
                }
                KeyCode::Up | KeyCode::Char('k') => self.scroll_up(),
                KeyCode::Down | KeyCode::Char('j') => self.scroll_down(),
                KeyCode::Char('r') => {
                    self.refresh_requested = true;
                }
                _ => {}
            }
        }
    }

    /// Largest scroll offset that still fills the Buckets table
    fn max_buckets_scroll(&self) -> usize {
        let len = self.view.as_ref().map_or(0, |v| v.table.len());
        BucketTable::max_scroll_offset(len, self.table_rows.get())
    }

    fn scroll_up(&mut self) {
        if self.current_tab == Tab::Buckets {
            self.buckets_scroll = self.buckets_scroll.saturating_sub(1);
        }
    }

    fn scroll_down(&mut self) {
        if self.current_tab == Tab::Buckets {
            self.buckets_scroll = (self.buckets_scroll + 1).min(self.max_buckets_scroll());
        }
    }

    fn set_range(&mut self, range: ViewRange) {
        if self.range != range {
            self.range = range;
            self.buckets_scroll = 0;
            self.rebuild_view();
        }
    }

    fn set_smoothing(&mut self, window: usize) {
        let window = window.clamp(1, MAX_SMOOTHING);
        if self.smoothing_window != window {
            self.smoothing_window = window;
            self.rebuild_view();
        }
    }

    /// Recompute chart and table from the loaded samples
    fn rebuild_view(&mut self) {
        let AppState::Ready { data } = &self.state else {
            self.view = None;
            return;
        };

        let options = ChartOptions {
            range: self.range,
            smoothing_window: self.smoothing_window,
            thresholds: self.thresholds,
        };
        let chart = ChartData::prepare(&data.samples, data.loaded_at, &options)
            .map_err(|e| e.to_string());

        let table = match (&chart, self.range) {
            (Ok(_), ViewRange::Daily) => {
                let cutoff = data.loaded_at.timestamp_millis() - ViewRange::Daily.lookback_ms();
                let recent: Vec<Sample> = data
                    .samples
                    .iter()
                    .filter(|s| s.timestamp.timestamp_millis() >= cutoff)
                    .cloned()
                    .collect();
                TimeSeriesAggregator::bucket_by_interval(&recent, HOUR_MS, 0).unwrap_or_default()
            }
            (Ok(chart), _) => chart.buckets.clone(),
            (Err(_), _) => Vec::new(),
        };

        if let Err(e) = &chart {
            tracing::warn!(error = %e, "chart preparation failed");
        }
        self.view = Some(View { chart, table });
    }

    /// Start a new load: bumps the generation so any in-flight result is stale
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        let stage = match self.state {
            AppState::Ready { .. } | AppState::Error { .. } => LoadingStage::Refreshing,
            AppState::Loading { stage, .. } => stage,
        };
        self.state = AppState::Loading {
            spinner_frame: 0,
            stage,
        };
        self.view = None;
        self.generation
    }

    /// Apply a finished load. Returns false if it was superseded.
    pub fn apply_load(&mut self, load: LoadResult) -> bool {
        if load.generation != self.generation {
            tracing::debug!(
                stale = load.generation,
                current = self.generation,
                "discarding superseded load"
            );
            return false;
        }
        match load.result {
            Ok(data) => {
                self.state = AppState::Ready { data };
                self.buckets_scroll = 0;
                self.rebuild_view();
            }
            Err(message) => {
                tracing::error!(error = %message, "load failed");
                self.state = AppState::Error { message };
            }
        }
        true
    }

    /// Consume a pending refresh request
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Update spinner animation
    pub fn tick(&mut self) {
        if let AppState::Loading {
            spinner_frame,
            stage,
        } = &self.state
        {
            self.state = AppState::Loading {
                spinner_frame: Spinner::next_frame(*spinner_frame),
                stage: *stage,
            };
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Draw the application
    pub fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn account_status<'a>(&'a self, data: &'a AppData) -> AccountStatus<'a> {
        match (self.user.as_deref(), &data.account) {
            (Some(username), Some(Ok(account))) => AccountStatus::Loaded {
                username,
                account,
                estimate: data.history.most_recent_cost,
            },
            (Some(username), Some(Err(message))) => AccountStatus::Failed {
                username,
                message,
            },
            _ => AccountStatus::NotRequested,
        }
    }

    fn render_separator(&self, area: Rect, buf: &mut Buffer) {
        buf.set_string(
            area.x,
            area.y,
            "─".repeat(area.width as usize),
            Style::default().fg(self.theme.muted()),
        );
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer, data: &AppData) {
        let mut spans = Vec::new();
        for (key, range) in [
            ('d', ViewRange::Daily),
            ('w', ViewRange::Weekly),
            ('m', ViewRange::Monthly),
        ] {
            let style = if range == self.range {
                Style::default()
                    .fg(self.theme.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.muted())
            };
            spans.push(Span::styled(format!("{}:{}", key, range.label()), style));
            spans.push(Span::raw("  "));
        }
        if self.range.shows_band() {
            spans.push(Span::styled(
                format!("smooth: {}d", self.smoothing_window),
                Style::default().fg(self.theme.text()),
            ));
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            latest_line(&data.history),
            Style::default().fg(self.theme.date()),
        ));

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(area, buf);
    }

    fn render_keybindings(&self, area: Rect, buf: &mut Buffer) {
        let mut spans = Vec::new();
        for (i, (key, desc)) in [
            ("Tab", "Switch"),
            ("d/w/m", "Range"),
            ("+/-", "Smooth"),
            ("r", "Refresh"),
            ("?", "Help"),
            ("q", "Quit"),
        ]
        .iter()
        .enumerate()
        {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(*key, Style::default().fg(self.theme.accent())));
            spans.push(Span::styled(
                format!(": {}", desc),
                Style::default().fg(self.theme.muted()),
            ));
        }
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(area, buf);
    }

    fn render_ready(&self, area: Rect, buf: &mut Buffer, data: &AppData) {
        let width = area.width.min(MAX_CONTENT_WIDTH);
        let area = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            width,
            ..area
        };
        let chunks = Layout::vertical([
            Constraint::Length(1), // Top padding
            Constraint::Length(1), // Tabs
            Constraint::Length(1), // Separator
            Constraint::Length(1), // Range / smoothing / latest
            Constraint::Min(3),    // Content
            Constraint::Length(1), // Separator
            Constraint::Length(1), // Keybindings
        ])
        .split(area);

        TabBar::new(self.current_tab, self.theme).render(chunks[1], buf);
        self.render_separator(chunks[2], buf);
        self.render_status(chunks[3], buf, data);

        match (self.current_tab, &self.view) {
            (Tab::Account, _) => {
                AccountView::new(self.account_status(data), self.theme).render(chunks[4], buf)
            }
            (_, Some(View { chart: Err(e), .. })) => {
                Paragraph::new(Line::from(Span::styled(
                    format!("Error: {}", e),
                    Style::default().fg(self.theme.error()),
                )))
                .alignment(Alignment::Center)
                .render(chunks[4], buf);
            }
            (Tab::Chart, Some(View { chart: Ok(chart), .. })) => {
                CostChart::new(chart, self.theme).render(chunks[4], buf)
            }
            (Tab::Buckets, Some(View { table, .. })) => {
                self.table_rows.set(BucketTable::visible_rows(chunks[4].height));
                let scale = TimeSeriesAggregator::select_scale_with(table, &self.thresholds);
                BucketTable::new(table, scale, self.buckets_scroll, self.theme)
                    .render(chunks[4], buf)
            }
            (_, None) => {}
        }

        self.render_separator(chunks[5], buf);
        self.render_keybindings(chunks[6], buf);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match &self.state {
            AppState::Loading {
                spinner_frame,
                stage,
            } => {
                Spinner::new(*spinner_frame, *stage, self.theme).render(area, buf);
            }
            AppState::Ready { data } => {
                self.render_ready(area, buf, data);
            }
            AppState::Error { message } => {
                let lines = vec![
                    Line::from(Span::styled(
                        format!("Error: {}", message),
                        Style::default().fg(self.theme.error()),
                    )),
                    Line::from(Span::styled(
                        "Press r to retry or q to quit",
                        Style::default().fg(self.theme.muted()),
                    )),
                ];
                let y = area.y + area.height.saturating_sub(2) / 2;
                Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .render(Rect { y, height: area.height.min(2), ..area }, buf);
            }
        }

        if self.show_help {
            let popup_area = HelpPopup::centered_area(area);
            HelpPopup::new(self.theme).render(popup_area, buf);
        }
    }
}

/// Fetch the cost history and, if requested, the account's RC concurrently
async fn load_data(
    client: ApiClient,
    hours: u32,
    user: Option<String>,
) -> Result<Box<AppData>, String> {
    let (history, account) = match user.as_deref() {
        Some(username) => {
            let (history, account) =
                tokio::join!(client.cost_history(hours), client.account_rc(username));
            (history, Some(account.map_err(|e| e.to_string())))
        }
        None => (client.cost_history(hours).await, None),
    };

    let history = history.map_err(|e| e.to_string())?;
    let samples = samples_from_history(&history);
    tracing::info!(samples = samples.len(), "cost history loaded");

    Ok(Box::new(AppData {
        samples,
        history,
        loaded_at: Utc::now(),
        account,
    }))
}

/// Runs loads on the tokio runtime; starting a new one aborts the previous
struct Loader {
    handle: Handle,
    client: ApiClient,
    hours: u32,
    user: Option<String>,
    tx: mpsc::Sender<LoadResult>,
    in_flight: Option<JoinHandle<()>>,
}

impl Loader {
    fn start(&mut self, generation: u64) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        let client = self.client.clone();
        let hours = self.hours;
        let user = self.user.clone();
        let tx = self.tx.clone();
        tracing::debug!(generation, "starting load");
        self.in_flight = Some(self.handle.spawn(async move {
            let result = load_data(client, hours, user).await;
            // receiver is gone once the UI has exited
            let _ = tx.send(LoadResult { generation, result });
        }));
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

/// Run the TUI application
pub fn run(ctx: Context, user: Option<String>, handle: Handle) -> anyhow::Result<()> {
    // must happen before raw mode
    let theme = Theme::detect();
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, ctx, user, handle, theme);
    ratatui::restore();
    result
}

fn run_app(
    terminal: &mut DefaultTerminal,
    ctx: Context,
    user: Option<String>,
    handle: Handle,
    theme: Theme,
) -> anyhow::Result<()> {
    let options = ctx.config.chart_options(ctx.config.default_range);
    let mut app = App::new(options, user.clone(), theme);

    let (tx, rx) = mpsc::channel();
    let mut loader = Loader {
        handle,
        client: ctx.client,
        hours: ctx.config.history_hours,
        user,
        tx,
        in_flight: None,
    };
    loader.start(app.generation);

    loop {
        terminal.draw(|frame| app.draw(frame))?;

        if app.should_quit() {
            break;
        }

        if app.take_refresh_request() {
            let generation = app.begin_load();
            loader.start(generation);
        }

        while let Ok(load) = rx.try_recv() {
            app.apply_load(load);
        }

        // 100ms poll keeps the spinner moving
        if event::poll(Duration::from_millis(100))? {
            app.handle_event(event::read()?);
        } else {
            app.tick();
        }
    }

    Ok(())
}
