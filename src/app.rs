//! Main application logic and TUI event loop.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tracing::{info, warn};

use crate::analysis::{
    column_types, describe, handle_nulls, has_nulls, null_counts, run_analysis, ColumnSummary,
    NullStrategy, SalesAnalysis, SalesSummary,
};
use crate::cli::AppConfig;
use crate::data::{DataSource, Dataset, LoadReport, Loaded, Table, TableStatus};
use crate::ui::{
    chart::{SalesChart, SalesTable},
    inspect::{NullPanel, StatsPanel},
    table_view::DataGrid,
    widgets::{ColumnsPanel, LinkPopup, StatusBar, TableEntry, TableList},
    HelpOverlay, Theme,
};

/// Rows moved by PageUp/PageDown in the data grid
const PAGE_ROWS: usize = 10;

/// Which panel is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Tables,
    Data,
    Analysis,
}

impl FocusedPanel {
    fn next(self) -> Self {
        match self {
            FocusedPanel::Tables => FocusedPanel::Data,
            FocusedPanel::Data => FocusedPanel::Analysis,
            FocusedPanel::Analysis => FocusedPanel::Tables,
        }
    }

    fn prev(self) -> Self {
        match self {
            FocusedPanel::Tables => FocusedPanel::Analysis,
            FocusedPanel::Data => FocusedPanel::Tables,
            FocusedPanel::Analysis => FocusedPanel::Data,
        }
    }
}

/// Extra panel shown under the data grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectView {
    Hidden,
    Describe,
    Nulls,
}

/// Application state
pub struct App {
    // Configuration
    config: AppConfig,
    theme: Theme,

    // Data
    source: DataSource,
    tables: Vec<String>,
    dataset: Dataset,
    report: Option<LoadReport>,
    last_loaded: Option<DateTime<Local>>,

    // Views derived from the selected table
    columns: Vec<(String, String)>,
    summaries: Result<Vec<ColumnSummary>, String>,
    nulls: Vec<(String, usize)>,
    cleaned: Option<Result<Table, String>>,

    // Analysis
    analysis: SalesAnalysis,
    sales: Result<SalesSummary, String>,

    // UI State
    focused: FocusedPanel,
    selected_table: usize,
    row_offset: usize,
    inspect: InspectView,
    null_strategy: NullStrategy,
    show_help: bool,
    show_link: bool,

    // Exit flag
    should_quit: bool,

    // Error message to display (non-fatal)
    error_message: Option<String>,
}

impl App {
    /// Create an App over an already connected source and run the first load.
    ///
    /// A failed first load is shown in the status bar; `r` retries it.
    pub fn with_source(config: AppConfig, source: DataSource) -> Self {
        let mut app = App {
            config,
            theme: Theme::default(),
            tables: source.tables().to_vec(),
            source,
            dataset: Dataset::new(),
            report: None,
            last_loaded: None,
            columns: Vec::new(),
            summaries: Ok(Vec::new()),
            nulls: Vec::new(),
            cleaned: None,
            analysis: SalesAnalysis::ByStaffAndLocation,
            sales: Err("Not loaded".to_string()),
            focused: FocusedPanel::Tables,
            selected_table: 0,
            row_offset: 0,
            inspect: InspectView::Hidden,
            null_strategy: NullStrategy::default(),
            show_help: false,
            show_link: false,
            should_quit: false,
            error_message: None,
        };

        if let Err(e) = app.reload() {
            app.set_error(format!("Load error: {e:#}"));
        }
        app
    }

    /// Reload every table from the source, keeping the previous data on failure
    fn reload(&mut self) -> Result<()> {
        self.error_message = None;
        info!(source = %self.source.describe(), "reloading");

        let Loaded { dataset, report } = self
            .source
            .load()
            .with_context(|| format!("Failed to load from {}", self.source.describe()))?;
        info!(summary = %report.summary(), "reload complete");

        self.dataset = dataset;
        self.report = Some(report);
        self.last_loaded = Some(Local::now());

        if self.selected_table >= self.tables.len() {
            self.selected_table = self.tables.len().saturating_sub(1);
        }
        self.refresh_table_views();
        self.refresh_analysis();
        Ok(())
    }

    /// Set an error message to display (non-fatal)
    pub fn set_error(&mut self, message: String) {
        warn!("{message}");
        self.error_message = Some(message);
    }

    fn selected_name(&self) -> Option<&str> {
        self.tables.get(self.selected_table).map(String::as_str)
    }

    fn selected(&self) -> Option<&Table> {
        self.selected_name().and_then(|name| self.dataset.get(name))
    }

    /// Table shown in the grid: the cleaned copy while a null strategy is active
    fn displayed(&self) -> Option<&Table> {
        match (&self.inspect, &self.cleaned) {
            (InspectView::Nulls, Some(Ok(cleaned))) => Some(cleaned),
            _ => self.selected(),
        }
    }

    /// Recompute columns, statistics and null handling for the selected table
    fn refresh_table_views(&mut self) {
        let (columns, summaries, nulls, cleaned) = match self.selected() {
            Some(table) => {
                let active = self.null_strategy != NullStrategy::Keep && has_nulls(table);
                let cleaned = active.then(|| {
                    handle_nulls(table, self.null_strategy).map_err(|e| e.to_string())
                });
                (
                    column_types(table),
                    describe(table).map_err(|e| e.to_string()),
                    null_counts(table),
                    cleaned,
                )
            }
            None => (Vec::new(), Ok(Vec::new()), Vec::new(), None),
        };

        self.columns = columns;
        self.summaries = summaries;
        self.nulls = nulls;
        self.cleaned = cleaned;

        let rows = self.displayed().map(Table::num_rows).unwrap_or(0);
        if self.row_offset >= rows {
            self.row_offset = rows.saturating_sub(1);
        }
    }

    fn refresh_analysis(&mut self) {
        self.sales = run_analysis(self.analysis, &self.dataset).map_err(|e| e.to_string());
    }

    fn select_table(&mut self, idx: usize) {
        self.selected_table = idx;
        self.row_offset = 0;
        self.refresh_table_views();
    }

    fn scroll_rows(&mut self, delta: isize) {
        let rows = self.displayed().map(Table::num_rows).unwrap_or(0);
        let max = rows.saturating_sub(1);
        self.row_offset = self.row_offset.saturating_add_signed(delta).min(max);
    }

    fn table_entries(&self) -> Vec<TableEntry> {
        self.tables
            .iter()
            .map(|name| TableEntry {
                name: name.clone(),
                status: self
                    .report
                    .as_ref()
                    .map(|r| r.status_of(name))
                    .unwrap_or(TableStatus::Unknown),
                rows: self.dataset.get(name).map(Table::num_rows),
            })
            .collect()
    }

    /// Handle keyboard input
    fn handle_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> Result<()> {
        // Global shortcuts
        match key {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return Ok(());
            }
            KeyCode::Esc if self.show_help || self.show_link => {
                self.show_help = false;
                self.show_link = false;
                return Ok(());
            }
            KeyCode::Char('b') => {
                self.show_link = !self.show_link;
                return Ok(());
            }
            KeyCode::Char('r') => {
                self.reload()?;
                return Ok(());
            }
            KeyCode::Tab => {
                self.focused = self.focused.next();
                return Ok(());
            }
            KeyCode::BackTab => {
                self.focused = self.focused.prev();
                return Ok(());
            }
            _ => {}
        }

        // If a popup is shown, don't process other keys
        if self.show_help || self.show_link {
            return Ok(());
        }

        match key {
            KeyCode::Char('d') => {
                self.inspect = if self.inspect == InspectView::Describe {
                    InspectView::Hidden
                } else {
                    InspectView::Describe
                };
                return Ok(());
            }
            KeyCode::Char('n') => {
                self.inspect = if self.inspect == InspectView::Nulls {
                    InspectView::Hidden
                } else {
                    InspectView::Nulls
                };
                self.row_offset = 0;
                return Ok(());
            }
            KeyCode::Char('m') => {
                self.inspect = InspectView::Nulls;
                self.null_strategy = self.null_strategy.next();
                self.row_offset = 0;
                self.refresh_table_views();
                return Ok(());
            }
            KeyCode::Char('a') => {
                self.analysis = self.analysis.next();
                self.refresh_analysis();
                return Ok(());
            }
            _ => {}
        }

        // Panel-specific navigation
        match self.focused {
            FocusedPanel::Tables => self.handle_table_navigation(key),
            FocusedPanel::Data => self.handle_data_navigation(key),
            FocusedPanel::Analysis => self.handle_analysis_navigation(key),
        }

        Ok(())
    }

    fn handle_table_navigation(&mut self, key: KeyCode) {
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.tables.is_empty() {
                    self.select_table((self.selected_table + 1) % self.tables.len());
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !self.tables.is_empty() {
                    self.select_table(
                        self.selected_table
                            .checked_sub(1)
                            .unwrap_or(self.tables.len() - 1),
                    );
                }
            }
            KeyCode::Enter | KeyCode::Char('l') => {
                self.focused = FocusedPanel::Data;
            }
            _ => {}
        }
    }

    fn handle_data_navigation(&mut self, key: KeyCode) {
        match key {
            KeyCode::Down | KeyCode::Char('j') => self.scroll_rows(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_rows(-1),
            KeyCode::PageDown => self.scroll_rows(PAGE_ROWS as isize),
            KeyCode::PageUp => self.scroll_rows(-(PAGE_ROWS as isize)),
            KeyCode::Char('g') => self.row_offset = 0,
            KeyCode::Char('G') => self.scroll_rows(isize::MAX),
            KeyCode::Enter | KeyCode::Char('l') => {
                self.focused = FocusedPanel::Analysis;
            }
            KeyCode::Esc => {
                self.focused = FocusedPanel::Tables;
            }
            _ => {}
        }
    }

    fn handle_analysis_navigation(&mut self, key: KeyCode) {
        match key {
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Right | KeyCode::Enter => {
                self.analysis = self.analysis.next();
                self.refresh_analysis();
            }
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Left => {
                // Two steps forward around a cycle of three is one step back
                self.analysis = self.analysis.next().next();
                self.refresh_analysis();
            }
            KeyCode::Esc => {
                self.focused = FocusedPanel::Data;
            }
            _ => {}
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut ratatui::Frame) {
        let size = frame.area();

        // Main layout: body and status bar
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Body
                Constraint::Length(2), // Status bar
            ])
            .split(size);

        // Body layout: sidebar (left) and content (right)
        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(32), // Sidebar
                Constraint::Min(40),    // Content
            ])
            .split(main_chunks[0]);

        // Sidebar layout: tables, columns
        let sidebar_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(body_chunks[0]);

        // Content layout: data, analysis
        let content_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(body_chunks[1]);

        let entries = self.table_entries();
        TableList::new(&entries, self.selected_table, &self.theme).render(
            frame,
            sidebar_chunks[0],
            self.focused == FocusedPanel::Tables,
        );

        let table_name = self.selected_name().unwrap_or("");
        ColumnsPanel::new(table_name, &self.columns, &self.theme).render(frame, sidebar_chunks[1]);

        // Data grid, with the inspect panel below it when open
        let (grid_area, inspect_area) = if self.inspect == InspectView::Hidden {
            (content_chunks[0], None)
        } else {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(content_chunks[0]);
            (chunks[0], Some(chunks[1]))
        };

        let grid_title = match (&self.inspect, &self.cleaned) {
            (InspectView::Nulls, Some(Ok(_))) => format!("{table_name} ({})", self.null_strategy),
            _ => table_name.to_string(),
        };
        DataGrid::new(self.displayed(), grid_title, self.row_offset, &self.theme).render(
            frame,
            grid_area,
            self.focused == FocusedPanel::Data,
        );

        if let Some(area) = inspect_area {
            match self.inspect {
                InspectView::Describe => match &self.summaries {
                    Ok(summaries) => {
                        StatsPanel::new(summaries, "Describe", &self.theme).render(frame, area)
                    }
                    Err(e) => {
                        StatsPanel::new(&[], e, &self.theme).render(frame, area);
                    }
                },
                InspectView::Nulls => {
                    let shapes = match (self.selected(), &self.cleaned) {
                        (Some(table), Some(Ok(cleaned))) => Ok((
                            (table.num_rows(), table.num_columns()),
                            (cleaned.num_rows(), cleaned.num_columns()),
                        )),
                        (_, Some(Err(e))) => Err(e.clone()),
                        (Some(table), None) => {
                            let shape = (table.num_rows(), table.num_columns());
                            Ok((shape, shape))
                        }
                        (None, _) => Err("table not loaded".to_string()),
                    };
                    NullPanel::new(&self.nulls, self.null_strategy, shapes, &self.theme)
                        .render(frame, area);
                }
                InspectView::Hidden => {}
            }
        }

        // Analysis: ranked table and chart
        let analysis_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(content_chunks[1]);
        let analysis_focused = self.focused == FocusedPanel::Analysis;
        SalesTable::new(
            self.sales.as_ref().map_err(String::as_str),
            self.analysis,
            &self.theme,
        )
        .render(frame, analysis_chunks[0], analysis_focused);
        SalesChart::new(self.sales.as_ref().ok(), &self.theme).render(
            frame,
            analysis_chunks[1],
            analysis_focused,
        );

        // Render status bar
        let source = self.source.describe();
        let status_bar = StatusBar::new(
            &source,
            self.report.as_ref().map(LoadReport::summary),
            self.last_loaded,
            self.error_message.as_deref(),
            &self.theme,
        );
        status_bar.render(frame, main_chunks[1]);

        // Render overlays if active
        if self.show_link {
            LinkPopup::new(self.config.dashboard_url.as_deref(), &self.theme).render(frame, size);
        }
        if self.show_help {
            let help = HelpOverlay::new(&self.theme);
            help.render(frame, size);
        }
    }
}

/// Restore terminal to normal state
fn restore_terminal() {
    // Best effort cleanup - ignore errors since we may be in a panic
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Run the TUI application
pub fn run(config: AppConfig) -> Result<()> {
    // Connect before touching the terminal so configuration errors print normally
    let source = config.source.connect()?;

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        restore_terminal();
        return Err(e).context("Failed to setup terminal");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(t) => t,
        Err(e) => {
            restore_terminal();
            return Err(e).context("Failed to create terminal");
        }
    };

    let mut app = App::with_source(config, source);

    // Main loop - wrap in a closure to ensure cleanup
    let result = run_main_loop(&mut terminal, &mut app);

    // Always restore terminal, regardless of result
    restore_terminal();
    terminal.show_cursor().ok();

    result
}

/// Main application loop
fn run_main_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Render - if this fails, we should exit
        terminal.draw(|f| app.render(f))?;

        // Handle input with timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Err(e) = app.handle_input(key.code, key.modifiers) {
                        // Log error but don't crash
                        app.set_error(format!("{e:#}"));
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use parquet::arrow::ArrowWriter;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::cli::SourceConfig;
    use crate::data::{LoaderConfig, ObjectStoreSource, SnapshotLoader};

    fn staff_parquet() -> Bytes {
        let ids: ArrayRef = Arc::new(Int64Array::from(vec![1, 2, 3]));
        let names: ArrayRef = Arc::new(StringArray::from(vec![Some("Ann"), None, Some("Cy")]));
        let batch =
            RecordBatch::try_from_iter(vec![("staff_id", ids), ("first_name", names)]).unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        Bytes::from(buf)
    }

    fn test_app() -> App {
        let store = ObjectStoreSource::new(
            Arc::new(InMemory::new()),
            "memory://test",
            Duration::from_secs(5),
        )
        .unwrap();
        store
            .put("db/parquet_files/dim_staff.parquet", staff_parquet())
            .unwrap();

        let loader_config = LoaderConfig::s3("unused", "db/parquet_files")
            .with_tables(vec!["dim_staff".to_string(), "dim_currency".to_string()]);
        let config = AppConfig {
            source: SourceConfig::Snapshots(loader_config.clone()),
            dashboard_url: Some("https://bi.example.com/sales".to_string()),
            log_file: PathBuf::from("unused.log"),
        };
        let source = DataSource::Snapshots(SnapshotLoader::with_source(
            loader_config,
            Box::new(store),
        ));
        App::with_source(config, source)
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_input(key, KeyModifiers::NONE).unwrap();
    }

    #[test]
    fn test_focus_cycles() {
        let panel = FocusedPanel::Tables;
        assert_eq!(panel.next().next().next(), panel);
        assert_eq!(panel.prev(), FocusedPanel::Analysis);
        assert_eq!(panel.next().prev(), panel);
    }

    #[test]
    fn test_initial_load_populates_views() {
        let app = test_app();
        assert!(app.error_message.is_none());
        assert_eq!(app.selected_name(), Some("dim_staff"));
        assert_eq!(app.columns.len(), 2);
        assert_eq!(
            app.nulls,
            vec![("staff_id".to_string(), 0), ("first_name".to_string(), 1)]
        );

        let entries = app.table_entries();
        assert_eq!(entries[0].status, TableStatus::Loaded);
        assert_eq!(entries[0].rows, Some(3));
        assert_eq!(entries[1].status, TableStatus::Missing);
        // No fact table, so the analysis reports why
        assert!(app.sales.is_err());
    }

    #[test]
    fn test_table_navigation_wraps() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected_name(), Some("dim_currency"));
        assert!(app.columns.is_empty());
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_name(), Some("dim_staff"));
    }

    #[test]
    fn test_data_scroll_is_clamped() {
        let mut app = test_app();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.focused, FocusedPanel::Data);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.row_offset, 2);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.row_offset, 0);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.row_offset, 0);
    }

    #[test]
    fn test_null_strategy_cleans_displayed_table() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.inspect, InspectView::Nulls);
        assert_eq!(app.null_strategy, NullStrategy::DropRows);
        assert_eq!(app.displayed().map(Table::num_rows), Some(2));

        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.null_strategy, NullStrategy::DropColumns);
        assert_eq!(app.displayed().map(Table::num_columns), Some(1));

        // Closing the null view shows the raw table again
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.inspect, InspectView::Hidden);
        assert_eq!(app.displayed().map(Table::num_columns), Some(2));
    }

    #[test]
    fn test_popups_swallow_keys() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('b'));
        assert!(app.show_link);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.inspect, InspectView::Hidden);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_link);

        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_analysis_cycles_both_ways() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.analysis, SalesAnalysis::ByProductDesign);

        app.focused = FocusedPanel::Analysis;
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.analysis, SalesAnalysis::ByStaffAndLocation);
    }

    #[test]
    fn test_render_smoke() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('d'));
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("dim_staff"));
        assert!(text.contains("Describe"));
    }
}
