use anyhow::Result;
use serde_json::Value;

use crate::assemble::{AssembleConfig, AssembleProgress, assemble_rows};
use crate::config::{AppConfig, Provider};
use crate::fetch::{FetchError, FetchRequest, RawResponse, join_url};
use crate::filters::{filter_by_bookmaker, filter_tennis};
use crate::normalize::{detect_shape, normalize_any};
use crate::sportradar::{BookFilter, read_schedule};
use crate::table::Table;
use crate::time_sort::sort_by_time;

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Rows(usize),
    NoMatches,
    UpstreamFailed(FetchError),
}

impl RunStatus {
    pub fn message(&self) -> String {
        match self {
            RunStatus::Rows(n) => format!("{n} rows"),
            RunStatus::NoMatches => {
                "No odds matched the filters (check endpoint, permissions or bookmaker name)"
                    .to_string()
            }
            RunStatus::UpstreamFailed(err) => format!("Upstream call failed: {err}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub provider: Provider,
    pub status: RunStatus,
    pub table: Table,
    pub raw: Option<Value>,
    pub failures: Vec<(String, FetchError)>,
    pub notes: Vec<String>,
}

impl RunReport {
    fn finish(provider: Provider, table: Table, raw: Option<Value>, notes: Vec<String>) -> Self {
        let status = if table.is_empty() {
            RunStatus::NoMatches
        } else {
            RunStatus::Rows(table.len())
        };
        Self {
            provider,
            status,
            table,
            raw,
            failures: Vec::new(),
            notes,
        }
    }

    fn failed(provider: Provider, err: FetchError) -> Self {
        Self {
            provider,
            raw: Some(err.to_envelope()),
            status: RunStatus::UpstreamFailed(err),
            table: Table::default(),
            failures: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// Runs the configured provider against the live API.
pub fn run(cfg: &AppConfig, on_progress: impl FnMut(AssembleProgress)) -> Result<RunReport> {
    let api_key = cfg.api_key()?.to_string();
    let http = cfg.http.clone();
    let fetch = |req: &FetchRequest| http.get(req);
    let report = match cfg.provider {
        Provider::SportDb => run_generic(cfg, &api_key, fetch),
        Provider::Sportradar => run_sportradar(cfg, &api_key, fetch, on_progress),
    };
    tracing::info!(
        provider = report.provider.label(),
        status = %report.status.message(),
        failures = report.failures.len(),
        "pipeline finished"
    );
    Ok(report)
}

pub fn sportdb_request(cfg: &AppConfig, api_key: &str) -> FetchRequest {
    let url = join_url(&cfg.sportdb.base_url, &cfg.sportdb.endpoint);
    FetchRequest::new(url, cfg.sportdb.auth.clone(), api_key)
        .param("sport", "tennis")
        .param("date", &cfg.date_string())
}

/// fetch → normalize → tennis filter → bookmaker filter → time sort.
pub fn run_generic(
    cfg: &AppConfig,
    api_key: &str,
    mut fetch: impl FnMut(&FetchRequest) -> RawResponse,
) -> RunReport {
    let req = sportdb_request(cfg, api_key);
    let raw = match fetch(&req) {
        RawResponse::Failed(err) => return RunReport::failed(Provider::SportDb, err),
        other => other.to_json(),
    };
    if let Some(err) = FetchError::from_envelope(&raw) {
        tracing::warn!(error = %err, "payload is an error envelope");
        let mut report = RunReport::failed(Provider::SportDb, err);
        report.raw = Some(raw);
        return report;
    }

    let mut notes = vec![format!("payload shape: {}", detect_shape(&raw))];
    let table = normalize_any(&raw);
    notes.push(format!("normalized {} rows", table.len()));

    let sport = filter_tennis(table);
    notes.push(sport.describe("sport filter"));
    let book = filter_by_bookmaker(sport.into_table(), &cfg.bookmaker);
    notes.push(book.describe("bookmaker filter"));

    let sorted = sort_by_time(book.into_table());
    if let Some(column) = &sorted.column {
        notes.push(format!("sorted by {column}"));
    }

    RunReport::finish(Provider::SportDb, sorted.table, Some(raw), notes)
}

pub fn schedule_request(cfg: &AppConfig, api_key: &str) -> FetchRequest {
    let path = format!(
        "/sports/{}/schedules/{}/schedules.json",
        cfg.sportradar.sport_urn,
        cfg.date_string()
    );
    FetchRequest::new(
        join_url(&cfg.sportradar.base_url, &path),
        cfg.sportradar.auth.clone(),
        api_key,
    )
}

pub fn markets_request(cfg: &AppConfig, api_key: &str, event_id: &str) -> FetchRequest {
    let path = format!("/sport_events/{event_id}/sport_event_markets.json");
    FetchRequest::new(
        join_url(&cfg.sportradar.base_url, &path),
        cfg.sportradar.auth.clone(),
        api_key,
    )
}

/// schedule → per-event markets → Match Winner odds → rows.
pub fn run_sportradar(
    cfg: &AppConfig,
    api_key: &str,
    mut fetch: impl FnMut(&FetchRequest) -> RawResponse,
    on_progress: impl FnMut(AssembleProgress),
) -> RunReport {
    let schedule = match fetch(&schedule_request(cfg, api_key)) {
        RawResponse::Failed(err) => return RunReport::failed(Provider::Sportradar, err),
        other => other.to_json(),
    };
    let events = read_schedule(&schedule);
    let mut notes = vec![format!("schedule: {} events", events.len())];

    let assemble_cfg = AssembleConfig {
        max_events: cfg.sportradar.max_events,
        event_delay: cfg.sportradar.event_delay,
        filter: BookFilter {
            book_id: cfg.sportradar.book_id.clone(),
            name_substr: BookFilter::by_name(&cfg.bookmaker).name_substr,
        },
    };
    let assembled = assemble_rows(
        &events,
        &assemble_cfg,
        |event| fetch(&markets_request(cfg, api_key, &event.id)),
        on_progress,
    );
    notes.push(format!(
        "markets looked up for {} events, {} failed",
        assembled.events_seen,
        assembled.failures.len()
    ));

    let mut report = RunReport::finish(
        Provider::Sportradar,
        assembled.table,
        Some(schedule),
        notes,
    );
    report.failures = assembled.failures;
    report
}
