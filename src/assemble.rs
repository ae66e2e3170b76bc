use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Value, json};

use crate::fetch::{FetchError, RawResponse};
use crate::sportradar::{BookFilter, OddsRecord, ScheduledEvent, extract_match_winner};
use crate::table::Table;

pub const DEFAULT_MAX_EVENTS: usize = 60;
pub const DEFAULT_EVENT_DELAY_MS: u64 = 1100;

pub const ASSEMBLED_COLUMNS: [&str; 8] = [
    "match_id",
    "start_time",
    "competitor_1",
    "competitor_2",
    "bookmaker",
    "outcome",
    "decimal_odds",
    "american_odds",
];

/// Fixed minimum spacing between consecutive upstream calls.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    /// Blocks until `delay` has passed since the previous call. The first
    /// call returns immediately.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
pub struct AssembleConfig {
    pub max_events: usize,
    pub event_delay: Duration,
    pub filter: BookFilter,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            event_delay: Duration::from_millis(DEFAULT_EVENT_DELAY_MS),
            filter: BookFilter::default(),
        }
    }
}

pub struct AssembleProgress {
    pub current: usize,
    pub total: usize,
    pub event_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct AssembledRows {
    pub table: Table,
    pub failures: Vec<(String, FetchError)>,
    pub events_seen: usize,
}

/// One row per extracted odds record, or one placeholder per event.
///
/// Events are visited in schedule order, capped at `cfg.max_events`. A
/// failed market lookup is recorded in `failures` and the event still
/// gets its placeholder row.
pub fn assemble_rows(
    events: &[ScheduledEvent],
    cfg: &AssembleConfig,
    mut fetch_markets: impl FnMut(&ScheduledEvent) -> RawResponse,
    mut on_progress: impl FnMut(AssembleProgress),
) -> AssembledRows {
    let events = &events[..events.len().min(cfg.max_events)];
    let mut table = Table::new(ASSEMBLED_COLUMNS.iter().map(|c| c.to_string()).collect());
    let mut failures = Vec::new();
    let mut throttle = Throttle::new(cfg.event_delay);

    for (idx, event) in events.iter().enumerate() {
        on_progress(AssembleProgress {
            current: idx + 1,
            total: events.len(),
            event_id: event.id.clone(),
        });

        throttle.wait();
        let odds = match fetch_markets(event) {
            RawResponse::Json(payload) => extract_match_winner(&payload, &cfg.filter),
            RawResponse::Text(_) => Vec::new(),
            RawResponse::Failed(err) => {
                tracing::warn!(event = %event.id, error = %err, "markets lookup failed");
                failures.push((event.id.clone(), err));
                Vec::new()
            }
        };

        if odds.is_empty() {
            table.push_row(event_row(event, None));
        } else {
            for record in &odds {
                table.push_row(event_row(event, Some(record)));
            }
        }
    }

    AssembledRows {
        table,
        failures,
        events_seen: events.len(),
    }
}

fn event_row(event: &ScheduledEvent, odds: Option<&OddsRecord>) -> Vec<Value> {
    let text = |s: Option<&str>| s.map(|s| json!(s)).unwrap_or(Value::Null);
    let number = |n: Option<f64>| n.map(|n| json!(n)).unwrap_or(Value::Null);
    vec![
        json!(event.id),
        text(event.start_time.as_deref()),
        text(event.competitor(0)),
        text(event.competitor(1)),
        text(odds.map(|o| o.bookmaker.as_str())),
        text(odds.map(|o| o.outcome.as_str())),
        number(odds.and_then(|o| o.decimal_odds)),
        number(odds.and_then(|o| o.american_odds)),
    ]
}
