use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use tennis_odds::config::AppConfig;
use tennis_odds::export::{default_export_name, export_csv, export_xlsx};
use tennis_odds::state::{
    AppState, Delta, ExportFormat, ProviderCommand, RunPhase, Screen, apply_delta,
};
use tennis_odds::table::{Table, cell_text};
use tennis_odds::{logging, provider};

const MIN_COL_WIDTH: usize = 6;
const MAX_COL_WIDTH: usize = 28;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    export_dir: PathBuf,
}

impl App {
    fn new(cfg: &AppConfig, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        let export_dir = std::env::var("EXPORT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            state: AppState::new(cfg.provider, cfg.date_string(), cfg.bookmaker.clone()),
            should_quit: false,
            cmd_tx,
            export_dir,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') | KeyCode::Enter => self.request_run(),
            KeyCode::Char('p') => {
                if !self.state.is_running() {
                    self.state.provider = self.state.provider.toggle();
                    self.state
                        .push_log(format!("[INFO] Provider: {}", self.state.provider.label()));
                }
            }
            KeyCode::Char('e') => self.export(ExportFormat::Csv),
            KeyCode::Char('x') => self.export(ExportFormat::Xlsx),
            KeyCode::Char('v') => self.state.toggle_raw(),
            KeyCode::Char('j') | KeyCode::Down => match self.state.screen {
                Screen::Table => self.state.select_next(),
                Screen::Raw => self.state.raw_scroll = self.state.raw_scroll.saturating_add(1),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.state.screen {
                Screen::Table => self.state.select_prev(),
                Screen::Raw => self.state.raw_scroll = self.state.raw_scroll.saturating_sub(1),
            },
            KeyCode::Char('l') | KeyCode::Right => self.state.scroll_right(),
            KeyCode::Char('h') | KeyCode::Left => self.state.scroll_left(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => {
                self.state.help_overlay = false;
                self.state.screen = Screen::Table;
            }
            _ => {}
        }
    }

    fn request_run(&mut self) {
        if self.state.is_running() {
            self.state.push_log("[INFO] A query is already running");
            return;
        }
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Fetch unavailable");
            return;
        };
        let cmd = ProviderCommand::Run {
            provider: self.state.provider,
            bookmaker: self.state.bookmaker.clone(),
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Query request failed");
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let Some(table) = self.state.table().filter(|t| !t.is_empty()) else {
            self.state.push_log("[INFO] Nothing to export");
            return;
        };
        let name = default_export_name(&self.state.bookmaker, &self.state.date, format.extension());
        let path = self.export_dir.join(name);
        let result = match format {
            ExportFormat::Csv => export_csv(table, &path),
            ExportFormat::Xlsx => export_xlsx(table, &path),
        };
        match result {
            Ok(()) => self
                .state
                .push_log(format!("[INFO] Exported {}", path.display())),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let log_path = logging::init_file().ok().flatten();
    let cfg = AppConfig::from_env();
    tracing::info!(provider = cfg.provider.label(), date = %cfg.date, "starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    provider::spawn_provider(cfg.clone(), tx, cmd_rx);

    let mut app = App::new(&cfg, Some(cmd_tx));
    if let Some(path) = log_path {
        app.state
            .push_log(format!("[INFO] Logging to {}", path.display()));
    }
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Table => render_table(frame, chunks[1], &app.state),
        Screen::Raw => render_raw(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::TOP))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let book = if state.bookmaker.is_empty() {
        "any"
    } else {
        state.bookmaker.as_str()
    };
    let line1 = format!(
        "TENNIS ODDS | {} | {} | Book: {}",
        state.provider.label(),
        state.date,
        book
    );
    let line2 = state.status_line();
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Table => {
            "r Query | p Provider | j/k Rows | h/l Columns | e CSV | x XLSX | v Raw JSON | ? Help | q Quit".to_string()
        }
        Screen::Raw => "j/k Scroll | v/Esc Table | ? Help | q Quit".to_string(),
    }
}

fn render_table(frame: &mut Frame, area: Rect, state: &AppState) {
    let table = match state.table() {
        Some(table) if !table.is_empty() => table,
        _ => {
            let (msg, color) = empty_message(state);
            let empty = Paragraph::new(msg)
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, area);
            return;
        }
    };

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let widths = column_widths(table, state.column_offset);
    let constraints: Vec<Constraint> = widths
        .iter()
        .map(|(_, w)| Constraint::Length(*w as u16 + 1))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let header_style = Style::default().add_modifier(Modifier::BOLD);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints.clone())
        .split(sections[0]);
    for (slot, (col_idx, _)) in widths.iter().enumerate() {
        render_cell_text(frame, cols[slot], &table.columns[*col_idx], header_style);
    }

    let list_area = sections[1];
    if list_area.height == 0 {
        return;
    }
    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, table.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let selected = idx == state.selected;
        let row_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if selected {
            frame.render_widget(Block::default().style(row_style), row_area);
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints.clone())
            .split(row_area);
        let row = &table.rows[idx];
        for (slot, (col_idx, _)) in widths.iter().enumerate() {
            let text = row.get(*col_idx).map(cell_text).unwrap_or_default();
            render_cell_text(frame, cols[slot], &text, row_style);
        }
    }
}

fn empty_message(state: &AppState) -> (String, Color) {
    match &state.phase {
        RunPhase::Done(tennis_odds::pipeline::RunStatus::UpstreamFailed(err)) => (
            format!("Upstream call failed.\n{err}\n\nPress v for the raw response."),
            Color::Red,
        ),
        RunPhase::Done(_) => (
            "No odds matched the filters (check endpoint, permissions or bookmaker name).".to_string(),
            Color::Yellow,
        ),
        RunPhase::ConfigError(msg) => (format!("Configuration error: {msg}"), Color::Red),
        RunPhase::Running { .. } => ("Fetching…".to_string(), Color::DarkGray),
        RunPhase::Idle => ("Press r to query.".to_string(), Color::DarkGray),
    }
}

/// Visible columns from `offset`, sized to their content.
fn column_widths(table: &Table, offset: usize) -> Vec<(usize, usize)> {
    (offset..table.columns.len())
        .map(|col| {
            let content = table
                .rows
                .iter()
                .take(200)
                .filter_map(|row| row.get(col))
                .map(|v| cell_text(v).chars().count())
                .max()
                .unwrap_or(0);
            let width = content
                .max(table.columns[col].chars().count())
                .clamp(MIN_COL_WIDTH, MAX_COL_WIDTH);
            (col, width)
        })
        .collect()
}

fn render_raw(frame: &mut Frame, area: Rect, state: &AppState) {
    let text = state
        .report
        .as_ref()
        .and_then(|r| r.raw.as_ref())
        .map(|raw| serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string()))
        .unwrap_or_else(|| "No response yet".to_string());
    let raw = Paragraph::new(text)
        .block(Block::default().title("Raw JSON").borders(Borders::ALL))
        .scroll((state.raw_scroll, 0));
    frame.render_widget(raw, area);
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + (area.height / 2),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, text_area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(4)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Tennis Odds - Help",
        "",
        "  r / Enter    Run query",
        "  p            Toggle provider (SportDB / Sportradar)",
        "  j/k or ↑/↓   Move rows",
        "  h/l or ←/→   Scroll columns",
        "  e            Export CSV",
        "  x            Export XLSX",
        "  v            Raw JSON",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
