use anyhow::Result;
use book_distribution::{
    Dashboard, DistributionForm, DistributionService, LineOutcome, RecordStore, SeedData,
    SetupOrchestrator, SubmissionReport,
};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use tokio::runtime::Runtime;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Setup,
    Distribution,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Setup => Page::Distribution,
            Page::Distribution => Page::Setup,
        }
    }

    pub fn previous(&self) -> Self {
        // Two pages: same as next
        self.next()
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Setup => "Setup and Populate",
            Page::Distribution => "Distribution and Dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn color(&self) -> Color {
        match self {
            Level::Info => Color::Cyan,
            Level::Success => Color::Green,
            Level::Warning => Color::Yellow,
            Level::Error => Color::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

// ============================================================================
// APP STATE
// ============================================================================

/// Everything the screen shows. No remote calls happen in here.
pub struct App {
    pub current_page: Page,
    pub project_name: String,
    pub base_id: Option<String>,
    pub devotees: Vec<String>,
    pub devotee_index: usize,
    pub skus: Vec<String>,
    pub form: DistributionForm,
    /// 0 is the devotee selector, `n` is form line `n - 1`
    pub focus: usize,
    pub dashboard: Dashboard,
    pub inventory_state: TableState,
    pub setup_messages: Vec<Message>,
    pub distribution_messages: Vec<Message>,
}

impl App {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            current_page: Page::Distribution,
            project_name: project_name.into(),
            base_id: None,
            devotees: Vec::new(),
            devotee_index: 0,
            skus: Vec::new(),
            form: DistributionForm::new(""),
            focus: 0,
            dashboard: Dashboard::default(),
            inventory_state: TableState::default(),
            setup_messages: Vec::new(),
            distribution_messages: Vec::new(),
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn is_ready(&self) -> bool {
        !self.devotees.is_empty() && !self.skus.is_empty()
    }

    pub fn selected_devotee(&self) -> Option<&str> {
        self.devotees.get(self.devotee_index).map(String::as_str)
    }

    /// Replace the loaded lists; keeps the form unless the default SKU changed
    pub fn apply_distribution_data(&mut self, devotees: Vec<String>, skus: Vec<String>, dashboard: Dashboard) {
        let default_sku = skus.first().cloned().unwrap_or_default();
        if self.form.default_sku() != default_sku {
            self.form = DistributionForm::new(default_sku);
            self.focus = 0;
        }

        self.devotees = devotees;
        self.skus = skus;
        self.dashboard = dashboard;

        if self.devotee_index >= self.devotees.len() {
            self.devotee_index = 0;
        }
        let rows = self.dashboard.inventory.len();
        self.inventory_state
            .select(if rows == 0 { None } else { Some(self.inventory_state.selected().unwrap_or(0).min(rows - 1)) });
    }

    fn focus_slots(&self) -> usize {
        1 + self.form.len()
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.focus_slots();
    }

    pub fn focus_previous(&mut self) {
        let slots = self.focus_slots();
        self.focus = (self.focus + slots - 1) % slots;
    }

    fn focused_line(&self) -> Option<usize> {
        self.focus.checked_sub(1).filter(|i| *i < self.form.len())
    }

    /// ←/→ on the focused control: devotee or line SKU
    pub fn cycle(&mut self, forward: bool) {
        match self.focused_line() {
            None => {
                self.devotee_index = cycle_index(self.devotee_index, self.devotees.len(), forward);
            }
            Some(line) => {
                if self.skus.is_empty() {
                    return;
                }
                let current = self
                    .skus
                    .iter()
                    .position(|s| *s == self.form.lines()[line].sku)
                    .unwrap_or(0);
                let next = cycle_index(current, self.skus.len(), forward);
                self.form.set_sku(line, self.skus[next].clone());
            }
        }
    }

    /// Quantity never drops below 1
    pub fn adjust_quantity(&mut self, delta: i64) {
        if let Some(line) = self.focused_line() {
            let current = i64::from(self.form.lines()[line].quantity);
            let next = (current + delta).clamp(1, i64::from(u32::MAX));
            self.form.set_quantity(line, u32::try_from(next).unwrap_or(1));
        }
    }

    pub fn add_line(&mut self) {
        self.form.add_line();
        self.focus = self.form.len();
    }

    pub fn remove_focused_line(&mut self) {
        if let Some(line) = self.focused_line() {
            self.form.remove_line(line);
            self.focus = self.focus.min(self.form.len());
        }
    }

    pub fn next_inventory_row(&mut self) {
        let len = self.dashboard.inventory.len();
        if len == 0 {
            return;
        }
        let i = self.inventory_state.selected().map_or(0, |i| (i + 1) % len);
        self.inventory_state.select(Some(i));
    }

    pub fn previous_inventory_row(&mut self) {
        let len = self.dashboard.inventory.len();
        if len == 0 {
            return;
        }
        let i = self.inventory_state.selected().map_or(0, |i| (i + len - 1) % len);
        self.inventory_state.select(Some(i));
    }

    /// Record the resolved base id; announces it only when it changed
    pub fn set_base_id(&mut self, base_id: String) {
        if self.base_id.as_deref() == Some(base_id.as_str()) {
            return;
        }
        self.push_setup(
            Level::Success,
            format!("Connected to project {} (base {}).", self.project_name, base_id),
        );
        self.base_id = Some(base_id);
    }

    pub fn push_setup(&mut self, level: Level, text: impl Into<String>) {
        self.setup_messages.push(Message { level, text: text.into() });
    }

    pub fn push_distribution(&mut self, level: Level, text: impl Into<String>) {
        self.distribution_messages.push(Message { level, text: text.into() });
    }

    /// One message per failed line, then the summary
    pub fn record_submission(&mut self, report: &SubmissionReport) {
        self.distribution_messages.clear();

        for line in &report.lines {
            let level = match &line.outcome {
                LineOutcome::Success | LineOutcome::Skipped => continue,
                LineOutcome::InsufficientStock { .. } => Level::Warning,
                _ => Level::Error,
            };
            self.push_distribution(level, line.message());
        }

        let level = if report.failures() > 0 {
            Level::Error
        } else if report.successes() > 0 {
            Level::Success
        } else {
            Level::Info
        };
        self.push_distribution(level, report.summary());
        self.focus = 0;
    }
}

fn cycle_index(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        0
    } else if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    }
}

// ============================================================================
// CONTROLLER (remote actions, blocking)
// ============================================================================

pub struct Controller<'a, S: RecordStore + ?Sized> {
    runtime: &'a Runtime,
    store: &'a S,
    service: Option<DistributionService<'a, S>>,
}

impl<'a, S: RecordStore + ?Sized> Controller<'a, S> {
    pub fn new(runtime: &'a Runtime, store: &'a S) -> Self {
        Self {
            runtime,
            store,
            service: None,
        }
    }

    /// Resolve the base id through the store
    ///
    /// The store owns the lookup cache, so its TTL and invalidation apply here.
    /// `app.base_id` only mirrors the last answer for display.
    fn ensure_connected(&self, app: &mut App) -> Option<String> {
        let setup = SetupOrchestrator::new(self.store);
        match self.runtime.block_on(setup.connect(&app.project_name)) {
            Ok(base_id) => {
                app.set_base_id(base_id.clone());
                Some(base_id)
            }
            Err(e) => {
                error!(error = %e, "connect failed");
                app.base_id = None;
                let text = format!(
                    "Could not find Base ID for project: {}. Please check your project name and API token. ({})",
                    app.project_name, e
                );
                app.push_setup(Level::Error, text.clone());
                app.push_distribution(Level::Error, text);
                None
            }
        }
    }

    /// Drop the cached base id and resolve it again
    pub fn reconnect(&mut self, app: &mut App) {
        app.base_id = None;
        self.store.invalidate_caches();
        self.ensure_connected(app);
    }

    pub fn create_tables(&mut self, app: &mut App) {
        let Some(base_id) = self.ensure_connected(app) else { return };
        app.push_setup(Level::Info, "Creating tables...");

        let reports = self
            .runtime
            .block_on(SetupOrchestrator::new(self.store).provision_schema(&base_id));
        for report in &reports {
            let level = if report.is_success() { Level::Success } else { Level::Error };
            app.push_setup(level, report.message());
        }
        self.store.invalidate_caches();
    }

    pub fn populate(&mut self, app: &mut App) {
        let Some(base_id) = self.ensure_connected(app) else { return };

        let seeds = match SeedData::builtin() {
            Ok(seeds) => seeds,
            Err(e) => {
                app.push_setup(Level::Error, format!("Seed data is unreadable: {e:#}"));
                return;
            }
        };
        app.push_setup(Level::Info, "Populating tables...");

        let reports = self
            .runtime
            .block_on(SetupOrchestrator::new(self.store).seed_data(&base_id, &seeds));
        for report in &reports {
            let level = if report.appended_duplicates() {
                Level::Warning
            } else if report.is_success() {
                Level::Success
            } else {
                Level::Error
            };
            app.push_setup(level, report.message());
        }
        self.store.invalidate_caches();
    }

    /// Reload devotees, products and the dashboard
    pub fn refresh(&mut self, app: &mut App) {
        let Some(base_id) = self.ensure_connected(app) else { return };

        let loaded = self
            .runtime
            .block_on(DistributionService::load(self.store, &base_id));
        let service = match loaded {
            Ok(service) => service,
            Err(e) => {
                error!(error = %e, "loading distribution data failed");
                self.service = None;
                app.push_distribution(Level::Error, format!("Error fetching data: {e}"));
                return;
            }
        };

        let dashboard = Dashboard::from_products(service.products());
        app.apply_distribution_data(service.devotee_names(), service.skus(), dashboard);
        if !service.is_ready() {
            app.push_distribution(
                Level::Warning,
                "Could not load initial data (Devotees or Products). Please run the setup flow on the Setup page.",
            );
        }
        info!(devotees = app.devotees.len(), products = app.skus.len(), "view refreshed");
        self.service = Some(service);
    }

    pub fn submit(&mut self, app: &mut App) {
        let Some(service) = self.service.as_mut() else {
            app.push_distribution(Level::Error, "Nothing loaded yet. Press r to refresh.");
            return;
        };
        let devotee = app.selected_devotee().unwrap_or_default().to_string();

        let today = Local::now().date_naive();
        let result = self
            .runtime
            .block_on(service.submit(&mut app.form, &devotee, today));
        match result {
            Ok(report) => {
                app.record_submission(&report);
                self.refresh(app);
            }
            Err(e) => {
                app.distribution_messages.clear();
                app.push_distribution(Level::Error, e.to_string());
            }
        }
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui<S: RecordStore + ?Sized>(runtime: &Runtime, store: &S, app: &mut App) -> Result<()> {
    let mut controller = Controller::new(runtime, store);
    controller.refresh(app);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, &mut controller);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: RecordStore + ?Sized>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    controller: &mut Controller<'_, S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match (app.current_page, key.code) {
            (_, KeyCode::Char('q')) | (_, KeyCode::Esc) => return Ok(()),
            (_, KeyCode::Tab) => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    app.previous_page();
                } else {
                    app.next_page();
                }
            }
            (_, KeyCode::BackTab) => app.previous_page(),

            (Page::Setup, KeyCode::Char('t')) => controller.create_tables(app),
            (Page::Setup, KeyCode::Char('p')) => controller.populate(app),
            (Page::Setup, KeyCode::Char('r')) => controller.reconnect(app),
            (Page::Setup, KeyCode::Char('c')) => app.setup_messages.clear(),

            (Page::Distribution, KeyCode::Down) => app.focus_next(),
            (Page::Distribution, KeyCode::Up) => app.focus_previous(),
            (Page::Distribution, KeyCode::Left) => app.cycle(false),
            (Page::Distribution, KeyCode::Right) => app.cycle(true),
            (Page::Distribution, KeyCode::Char('+')) | (Page::Distribution, KeyCode::Char('=')) => {
                app.adjust_quantity(1)
            }
            (Page::Distribution, KeyCode::Char('-')) => app.adjust_quantity(-1),
            (Page::Distribution, KeyCode::Char('a')) => app.add_line(),
            (Page::Distribution, KeyCode::Char('d')) => app.remove_focused_line(),
            (Page::Distribution, KeyCode::Char('s')) | (Page::Distribution, KeyCode::Enter) => {
                controller.submit(app)
            }
            (Page::Distribution, KeyCode::Char('r')) => {
                app.distribution_messages.clear();
                controller.refresh(app);
            }
            (Page::Distribution, KeyCode::PageDown) | (Page::Distribution, KeyCode::Char('j')) => {
                app.next_inventory_row()
            }
            (Page::Distribution, KeyCode::PageUp) | (Page::Distribution, KeyCode::Char('k')) => {
                app.previous_inventory_row()
            }
            _ => {}
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Setup => render_setup(f, chunks[1], app),
        Page::Distribution => render_distribution(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Setup, Page::Distribution].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Project: {}", app.project_name),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    match &app.base_id {
        Some(_) => tab_spans.push(Span::styled("● connected", Style::default().fg(Color::Green))),
        None => tab_spans.push(Span::styled("○ not connected", Style::default().fg(Color::Red))),
    }
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Low stock: {}", app.dashboard.low_stock.len()),
        Style::default().fg(if app.dashboard.all_clear() { Color::Green } else { Color::Yellow }),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn message_lines(messages: &[Message]) -> Vec<Line<'static>> {
    messages
        .iter()
        .map(|m| Line::from(Span::styled(format!("  {}", m.text), Style::default().fg(m.level.color()))))
        .collect()
}

fn render_setup(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  1. Create Tables",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw("     Press "),
            key("t"),
            Span::raw(" to create Devotees, Books, Products and DistributionLog."),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  2. Populate Tables",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw("     Press "),
            key("p"),
            Span::raw(" to insert the initial devotees, books and products."),
        ]),
        Line::from(Span::styled(
            "     Populating twice appends duplicate rows.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
    ];
    content.extend(message_lines(&app.setup_messages));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Setup and Populate "),
    );

    f.render_widget(paragraph, area);
}

fn render_distribution(f: &mut Frame, area: Rect, app: &mut App) {
    let form_height = (app.form.len() as u16).saturating_add(4);
    let low_height = if app.dashboard.all_clear() {
        3
    } else {
        (app.dashboard.low_stock.len() as u16).saturating_add(3).min(12)
    };
    let message_height = (app.distribution_messages.len() as u16).saturating_add(2).clamp(3, 8);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(form_height),
            Constraint::Length(message_height),
            Constraint::Min(5),
            Constraint::Length(low_height),
        ])
        .split(area);

    render_form(f, chunks[0], app);

    let messages = Paragraph::new(message_lines(&app.distribution_messages))
        .block(Block::default().borders(Borders::ALL).title(" Messages "));
    f.render_widget(messages, chunks[1]);

    render_inventory(f, chunks[2], app);
    render_low_stock(f, chunks[3], app);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let focused = Style::default().fg(Color::Black).bg(Color::Yellow);
    let marker = |on: bool| if on { "→ " } else { "  " };

    let devotee = app.selected_devotee().unwrap_or("(no devotees loaded)");
    let mut content = vec![Line::from(vec![
        Span::raw(marker(app.focus == 0)),
        Span::styled("Devotee: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("◀ {} ▶", devotee),
            if app.focus == 0 { focused } else { Style::default() },
        ),
    ])];
    content.push(Line::from(""));

    for (i, line) in app.form.lines().iter().enumerate() {
        let on = app.focus == i + 1;
        let book = app
            .dashboard
            .inventory
            .iter()
            .find(|row| row.sku == line.sku)
            .map(|row| format!("{} ({}) stock {}", row.book, row.language, row.stock_quantity))
            .unwrap_or_default();

        content.push(Line::from(vec![
            Span::raw(marker(on)),
            Span::styled(format!("Book {}: ", i + 1), Style::default().fg(Color::Cyan)),
            Span::styled(format!("◀ {:<10} ▶", line.sku), if on { focused } else { Style::default() }),
            Span::raw("  qty "),
            Span::styled(format!("{:>3}", line.quantity), Style::default().fg(Color::White)),
            Span::styled(format!("   {}", book), Style::default().fg(Color::DarkGray)),
        ]));
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Log Book Distribution "),
    );
    f.render_widget(paragraph, area);
}

fn header_row<'a>(columns: &'a [&'a str]) -> Row<'a> {
    let cells = columns.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_inventory(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Inventory Dashboard ");

    if app.dashboard.inventory.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "  No product data found. Please populate the Products table on the Setup page.",
            Style::default().fg(Color::Yellow),
        ))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let rows = app.dashboard.inventory.iter().map(|row| {
        let style = if row.stock_quantity <= row.min_stock {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        Row::new(row.cells().into_iter().map(Cell::from)).style(style).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(22),
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&book_distribution::dashboard::INVENTORY_COLUMNS))
    .block(block)
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.inventory_state);
}

fn render_low_stock(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Low Stock Alert ");

    if app.dashboard.all_clear() {
        let ok = Paragraph::new(Span::styled(
            "  All items are sufficiently stocked.",
            Style::default().fg(Color::Green),
        ))
        .block(block);
        f.render_widget(ok, area);
        return;
    }

    let rows = app
        .dashboard
        .low_stock
        .iter()
        .map(|row| Row::new(row.cells().into_iter().map(Cell::from)).height(1));

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(22),
            Constraint::Length(7),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&book_distribution::dashboard::LOW_STOCK_COLUMNS))
    .block(block);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut status_spans = vec![key("Tab"), Span::raw(" Page | ")];
    match app.current_page {
        Page::Setup => status_spans.extend([
            key("t"),
            Span::raw(" Create tables | "),
            key("p"),
            Span::raw(" Populate | "),
            key("r"),
            Span::raw(" Reconnect | "),
            key("c"),
            Span::raw(" Clear | "),
        ]),
        Page::Distribution => status_spans.extend([
            key("↑/↓"),
            Span::raw(" Field | "),
            key("←/→"),
            Span::raw(" Choose | "),
            key("+/-"),
            Span::raw(" Qty | "),
            key("a"),
            Span::raw(" Add | "),
            key("d"),
            Span::raw(" Remove | "),
            key("s"),
            Span::raw(" Submit | "),
            key("r"),
            Span::raw(" Refresh | "),
        ]),
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use book_distribution::schema::TableDef;
    use book_distribution::{LineItem, LineResult, Product, Record, RecordId, StoreError, StoreResult};
    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Store whose project lookup answer can change between calls
    struct SwitchingStore {
        base_id: Mutex<String>,
        lookups: AtomicUsize,
    }

    impl SwitchingStore {
        fn new(base_id: &str) -> Self {
            Self {
                base_id: Mutex::new(base_id.to_string()),
                lookups: AtomicUsize::new(0),
            }
        }

        fn switch_to(&self, base_id: &str) {
            *self.base_id.lock().unwrap() = base_id.to_string();
        }
    }

    #[async_trait]
    impl RecordStore for SwitchingStore {
        async fn resolve_base_id(&self, _project_name: &str) -> StoreResult<String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.base_id.lock().unwrap().clone())
        }

        async fn create_table(&self, _base_id: &str, _table: &TableDef) -> StoreResult<()> {
            Ok(())
        }

        async fn resolve_table_id(&self, _base_id: &str, table_name: &str) -> StoreResult<String> {
            Err(StoreError::not_found("table", table_name))
        }

        async fn insert_records(&self, _table_id: &str, records: &[Record]) -> StoreResult<usize> {
            Ok(records.len())
        }

        async fn list_records(&self, _table_id: &str) -> StoreResult<Vec<Record>> {
            Ok(Vec::new())
        }

        async fn update_record(&self, _table_id: &str, _record_id: RecordId, _fields: Record) -> StoreResult<()> {
            Ok(())
        }

        fn invalidate_caches(&self) {}
    }

    fn product(sku: &str, stock: i64) -> Product {
        Product {
            id: 1,
            sku: sku.to_string(),
            language: "English".to_string(),
            book: "Gita".to_string(),
            cost_price: 40,
            selling_price: 60,
            stock_quantity: stock,
            min_stock: 5,
        }
    }

    fn loaded_app() -> App {
        let mut app = App::new("ISKMP");
        let products = [product("BG-EN-01", 20), product("BG-TA-01", 3)];
        app.apply_distribution_data(
            vec!["Bhakta Ashok".to_string(), "Patita Pavan dasa".to_string()],
            products.iter().map(|p| p.sku.clone()).collect(),
            Dashboard::from_products(&products),
        );
        app
    }

    #[test]
    fn test_page_navigation() {
        let mut app = App::new("ISKMP");
        assert_eq!(app.current_page, Page::Distribution);
        app.next_page();
        assert_eq!(app.current_page, Page::Setup);
        app.previous_page();
        assert_eq!(app.current_page, Page::Distribution);
    }

    #[test]
    fn test_loading_sets_default_form() {
        let app = loaded_app();
        assert!(app.is_ready());
        assert_eq!(app.form.lines(), &[LineItem::new("BG-EN-01", 1)]);
        assert_eq!(app.selected_devotee(), Some("Bhakta Ashok"));
        assert_eq!(app.dashboard.low_stock.len(), 1);
    }

    #[test]
    fn test_reload_keeps_form_in_progress() {
        let mut app = loaded_app();
        app.add_line();
        let products = [product("BG-EN-01", 19), product("BG-TA-01", 3)];
        app.apply_distribution_data(
            app.devotees.clone(),
            app.skus.clone(),
            Dashboard::from_products(&products),
        );
        assert_eq!(app.form.len(), 2);
    }

    #[test]
    fn test_cycle_devotee_and_sku() {
        let mut app = loaded_app();
        app.cycle(true);
        assert_eq!(app.selected_devotee(), Some("Patita Pavan dasa"));
        app.cycle(true);
        assert_eq!(app.selected_devotee(), Some("Bhakta Ashok"));

        app.focus_next();
        app.cycle(false);
        assert_eq!(app.form.lines()[0].sku, "BG-TA-01");
    }

    #[test]
    fn test_quantity_floor_is_one() {
        let mut app = loaded_app();
        app.focus_next();
        app.adjust_quantity(-1);
        assert_eq!(app.form.lines()[0].quantity, 1);
        app.adjust_quantity(1);
        app.adjust_quantity(1);
        assert_eq!(app.form.lines()[0].quantity, 3);
    }

    #[test]
    fn test_quantity_ignored_on_devotee_focus() {
        let mut app = loaded_app();
        app.adjust_quantity(5);
        assert_eq!(app.form.lines()[0].quantity, 1);
    }

    #[test]
    fn test_add_and_remove_lines_move_focus() {
        let mut app = loaded_app();
        app.add_line();
        assert_eq!(app.form.len(), 2);
        assert_eq!(app.focus, 2);

        app.remove_focused_line();
        assert_eq!(app.form.len(), 1);
        assert_eq!(app.focus, 1);

        app.focus = 0;
        app.remove_focused_line();
        assert_eq!(app.form.len(), 1, "devotee focus removes nothing");
    }

    #[test]
    fn test_focus_wraps() {
        let mut app = loaded_app();
        app.focus_previous();
        assert_eq!(app.focus, 1);
        app.focus_next();
        assert_eq!(app.focus, 0);
    }

    #[test]
    fn test_submission_messages() {
        let mut app = loaded_app();
        let report = SubmissionReport {
            submission_id: Uuid::new_v4(),
            devotee: "Bhakta Ashok".to_string(),
            distribution_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            lines: vec![
                LineResult {
                    sku: "BG-EN-01".to_string(),
                    quantity: 2,
                    outcome: LineOutcome::Success,
                },
                LineResult {
                    sku: "BG-TA-01".to_string(),
                    quantity: 9,
                    outcome: LineOutcome::InsufficientStock {
                        available: 3,
                        requested: 9,
                    },
                },
            ],
        };

        app.record_submission(&report);
        assert_eq!(app.distribution_messages.len(), 2);
        assert_eq!(app.distribution_messages[0].level, Level::Warning);
        assert!(app.distribution_messages[0].text.contains("Available: 3"));
        assert_eq!(app.distribution_messages[1].level, Level::Error);
    }

    #[test]
    fn test_base_id_announced_only_on_change() {
        let mut app = App::new("ISKMP");
        app.set_base_id("p_one".to_string());
        app.set_base_id("p_one".to_string());
        assert_eq!(app.setup_messages.len(), 1);

        app.set_base_id("p_two".to_string());
        assert_eq!(app.setup_messages.len(), 2);
        assert!(app.setup_messages[1].text.contains("base p_two"));
    }

    #[test]
    fn test_every_action_resolves_base_id_through_store() {
        let runtime = Runtime::new().unwrap();
        let store = SwitchingStore::new("p_one");
        let controller = Controller::new(&runtime, &store);
        let mut app = App::new("ISKMP");

        assert_eq!(controller.ensure_connected(&mut app).as_deref(), Some("p_one"));

        store.switch_to("p_two");
        assert_eq!(controller.ensure_connected(&mut app).as_deref(), Some("p_two"));
        assert_eq!(app.base_id.as_deref(), Some("p_two"));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_renders_both_pages() {
        let mut app = loaded_app();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        terminal.draw(|f| ui(f, &mut app)).unwrap();
        app.next_page();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
    }
}
