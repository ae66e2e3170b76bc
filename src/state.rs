use std::collections::VecDeque;

use crate::config::Provider;
use crate::pipeline::{RunReport, RunStatus};
use crate::table::Table;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Table,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunPhase {
    Idle,
    Running { current: usize, total: usize },
    Done(RunStatus),
    ConfigError(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Run {
        provider: Provider,
        bookmaker: String,
    },
}

#[derive(Debug, Clone)]
pub enum Delta {
    RunStarted(Provider),
    Progress {
        current: usize,
        total: usize,
        event_id: String,
    },
    RunFinished(Box<RunReport>),
    RunFailed(String),
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub provider: Provider,
    pub date: String,
    pub bookmaker: String,
    pub phase: RunPhase,
    pub report: Option<RunReport>,
    pub selected: usize,
    pub column_offset: usize,
    pub raw_scroll: u16,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(provider: Provider, date: String, bookmaker: String) -> Self {
        Self {
            screen: Screen::Table,
            provider,
            date,
            bookmaker,
            phase: RunPhase::Idle,
            report: None,
            selected: 0,
            column_offset: 0,
            raw_scroll: 0,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn table(&self) -> Option<&Table> {
        self.report.as_ref().map(|r| &r.table)
    }

    pub fn row_count(&self) -> usize {
        self.table().map(Table::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.table().map(|t| t.columns.len()).unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, RunPhase::Running { .. })
    }

    pub fn select_next(&mut self) {
        let total = self.row_count();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1).min(total - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn scroll_right(&mut self) {
        let total = self.column_count();
        if total > 0 {
            self.column_offset = (self.column_offset + 1).min(total - 1);
        }
    }

    pub fn scroll_left(&mut self) {
        self.column_offset = self.column_offset.saturating_sub(1);
    }

    pub fn toggle_raw(&mut self) {
        self.screen = match self.screen {
            Screen::Table => Screen::Raw,
            Screen::Raw => Screen::Table,
        };
        self.raw_scroll = 0;
    }

    pub fn status_line(&self) -> String {
        match &self.phase {
            RunPhase::Idle => "Press r to query".to_string(),
            RunPhase::Running { current, total } if *total > 0 => {
                format!("Fetching markets {current}/{total}")
            }
            RunPhase::Running { .. } => "Fetching…".to_string(),
            RunPhase::Done(status) => status.message(),
            RunPhase::ConfigError(msg) => format!("Configuration error: {msg}"),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::RunStarted(provider) => {
            state.provider = provider;
            state.phase = RunPhase::Running {
                current: 0,
                total: 0,
            };
            state.push_log(format!("[INFO] Querying {}", provider.label()));
        }
        Delta::Progress {
            current,
            total,
            event_id,
        } => {
            state.phase = RunPhase::Running { current, total };
            if current == 1 || current == total {
                state.push_log(format!("[INFO] Markets {current}/{total} ({event_id})"));
            }
        }
        Delta::RunFinished(report) => {
            for note in &report.notes {
                state.push_log(format!("[INFO] {note}"));
            }
            for (event_id, err) in &report.failures {
                state.push_log(format!("[WARN] {event_id}: {err}"));
            }
            let level = match report.status {
                RunStatus::UpstreamFailed(_) => "[WARN]",
                _ => "[INFO]",
            };
            state.push_log(format!("{level} {}", report.status.message()));
            state.phase = RunPhase::Done(report.status.clone());
            state.report = Some(*report);
            state.selected = 0;
            state.column_offset = 0;
            state.raw_scroll = 0;
        }
        Delta::RunFailed(msg) => {
            state.push_log(format!("[WARN] {msg}"));
            state.phase = RunPhase::ConfigError(msg);
        }
    }
}
