use serde::Serialize;
use serde_json::Value;

use crate::fetch::is_error_envelope;

/// Market name fragments that identify a Match Winner market.
pub const MATCH_WINNER_KEYS: [&str; 5] = ["match winner", "match_winner", "moneyline", "2way", "2 way"];

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub id: String,
    pub start_time: Option<String>,
    pub competitors: Vec<String>,
}

impl ScheduledEvent {
    pub fn competitor(&self, idx: usize) -> Option<&str> {
        self.competitors.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketRecord {
    pub name: String,
    pub books: Vec<BookRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub id: String,
    pub name: String,
    pub outcomes: Vec<OutcomeRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    pub name: String,
    pub decimal: Option<f64>,
    pub american: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddsRecord {
    pub bookmaker: String,
    pub outcome: String,
    pub decimal_odds: Option<f64>,
    pub american_odds: Option<f64>,
}

/// Optional bookmaker restrictions; an unset field does not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub book_id: Option<String>,
    pub name_substr: Option<String>,
}

impl BookFilter {
    /// Name needle used as given, like the bookmaker column filter; only
    /// an empty string disables it.
    pub fn by_name(name: &str) -> Self {
        Self {
            book_id: None,
            name_substr: (!name.is_empty()).then(|| name.to_string()),
        }
    }

    pub fn matches(&self, book: &BookRecord) -> bool {
        if let Some(id) = self.book_id.as_deref() {
            if book.id != id {
                return false;
            }
        }
        if let Some(needle) = self.name_substr.as_deref() {
            if !book.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

pub fn is_match_winner(market_name: &str) -> bool {
    let lower = market_name.to_lowercase();
    MATCH_WINNER_KEYS.iter().any(|key| lower.contains(key))
}

/// Match Winner odds from a per-event markets payload.
pub fn extract_match_winner(payload: &Value, filter: &BookFilter) -> Vec<OddsRecord> {
    if is_error_envelope(payload) {
        return Vec::new();
    }
    extract_from_markets(&read_markets(payload), filter)
}

pub fn extract_from_markets(markets: &[MarketRecord], filter: &BookFilter) -> Vec<OddsRecord> {
    let mut out = Vec::new();
    for market in markets.iter().filter(|m| is_match_winner(&m.name)) {
        for book in market.books.iter().filter(|b| filter.matches(b)) {
            for outcome in &book.outcomes {
                out.push(OddsRecord {
                    bookmaker: book.name.clone(),
                    outcome: outcome.name.clone(),
                    decimal_odds: outcome.decimal,
                    american_odds: outcome.american,
                });
            }
        }
    }
    out
}

/// Reads markets from `markets`, `sport_event.markets` or `sport_event_markets`.
pub fn read_markets(payload: &Value) -> Vec<MarketRecord> {
    if is_error_envelope(payload) {
        return Vec::new();
    }
    let list = payload
        .get("markets")
        .or_else(|| payload.get("sport_event").and_then(|v| v.get("markets")))
        .or_else(|| payload.get("sport_event_markets"))
        .and_then(Value::as_array);
    let Some(list) = list else {
        return Vec::new();
    };
    list.iter().map(parse_market).collect()
}

fn parse_market(value: &Value) -> MarketRecord {
    let books = value
        .get("books")
        .and_then(Value::as_array)
        .map(|books| books.iter().map(parse_book).collect())
        .unwrap_or_default();
    MarketRecord {
        name: pick_text(value, &["name"]).unwrap_or_default(),
        books,
    }
}

fn parse_book(value: &Value) -> BookRecord {
    let outcomes = value
        .get("outcomes")
        .and_then(Value::as_array)
        .map(|outcomes| outcomes.iter().map(parse_outcome).collect())
        .unwrap_or_default();
    BookRecord {
        id: pick_text(value, &["id"]).unwrap_or_default(),
        name: pick_text(value, &["name"]).unwrap_or_default(),
        outcomes,
    }
}

fn parse_outcome(value: &Value) -> OutcomeRecord {
    OutcomeRecord {
        name: pick_text(value, &["name", "type"]).unwrap_or_default(),
        decimal: odds_value(value, "decimal"),
        american: odds_value(value, "american"),
    }
}

/// `odds.<kind>`, then `<kind>`, then `odds_<kind>`.
fn odds_value(outcome: &Value, kind: &str) -> Option<f64> {
    let nested = outcome.get("odds").and_then(|odds| odds.get(kind));
    let flat = outcome.get(kind);
    let prefixed = outcome.get(format!("odds_{kind}").as_str());
    [nested, flat, prefixed]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .and_then(number_value)
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('+').parse::<f64>().ok(),
        _ => None,
    }
}

/// Events from `schedules[*].sport_event`, `sport_events` or a bare list.
pub fn read_schedule(payload: &Value) -> Vec<ScheduledEvent> {
    if is_error_envelope(payload) {
        return Vec::new();
    }
    let entries: Vec<&Value> = if let Some(list) = payload.get("schedules").and_then(Value::as_array) {
        list.iter()
            .map(|entry| entry.get("sport_event").unwrap_or(entry))
            .collect()
    } else if let Some(list) = payload.get("sport_events").and_then(Value::as_array) {
        list.iter().collect()
    } else if let Some(list) = payload.as_array() {
        list.iter()
            .map(|entry| entry.get("sport_event").unwrap_or(entry))
            .collect()
    } else {
        Vec::new()
    };

    entries.into_iter().filter_map(parse_event).collect()
}

fn parse_event(value: &Value) -> Option<ScheduledEvent> {
    let id = pick_text(value, &["id"]).and_then(|id| non_empty(&id).map(str::to_string))?;
    let competitors = value
        .get("competitors")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|c| pick_text(c, &["name"]))
                .collect()
        })
        .unwrap_or_default();
    Some(ScheduledEvent {
        id,
        start_time: pick_text(value, &["start_time", "scheduled"]),
        competitors,
    })
}

fn pick_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
