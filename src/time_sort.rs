use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::table::Table;

/// Time columns checked in priority order; the first that parses wins.
pub const TIME_COLUMNS: [&str; 6] = [
    "start_time",
    "kickoff",
    "commence_time",
    "event_time",
    "time",
    "start",
];

pub const NORMALIZED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Epoch values above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

// Time-only cells land on this date so a re-sort reads them back unchanged.
const TIME_ONLY_ANCHOR: (i32, u32, u32) = (1900, 1, 1);

#[derive(Debug, Clone, PartialEq)]
pub struct SortOutcome {
    pub table: Table,
    pub column: Option<String>,
}

/// Sorts rows ascending by the first parseable time column.
///
/// That column is rewritten to `YYYY-MM-DD HH:MM:SS` (UTC) and cells that
/// do not parse become null and sort last. Tables with no parseable time
/// column keep their order.
pub fn sort_by_time(table: Table) -> SortOutcome {
    for name in TIME_COLUMNS {
        let Some(idx) = table.column_index(name) else {
            continue;
        };
        let parsed: Vec<Option<NaiveDateTime>> = table
            .rows
            .iter()
            .map(|row| row.get(idx).and_then(parse_timestamp))
            .collect();
        if parsed.iter().all(Option::is_none) {
            continue;
        }

        let mut order: Vec<usize> = (0..table.rows.len()).collect();
        order.sort_by(|a, b| compare_nulls_last(parsed[*a], parsed[*b]));

        let Table { columns, rows } = table;
        let mut rows: Vec<Option<Vec<Value>>> = rows.into_iter().map(Some).collect();
        let sorted = order
            .into_iter()
            .filter_map(|i| {
                let mut row = rows[i].take()?;
                if let Some(cell) = row.get_mut(idx) {
                    *cell = parsed[i]
                        .map(|ts| Value::String(ts.format(NORMALIZED_FORMAT).to_string()))
                        .unwrap_or(Value::Null);
                }
                Some(row)
            })
            .collect();

        tracing::debug!(column = name, "sorted table by time column");
        return SortOutcome {
            table: Table {
                columns,
                rows: sorted,
            },
            column: Some(name.to_string()),
        };
    }

    SortOutcome {
        table,
        column: None,
    }
}

fn compare_nulls_last(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Parses a cell into a naive UTC timestamp.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(raw) => parse_timestamp_str(raw),
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Some(stripped) = raw.strip_suffix('Z') {
        if let Some(dt) = parse_naive(stripped, &NAIVE_FORMATS) {
            return Some(dt);
        }
    }
    if let Some(dt) = parse_naive(raw, &NAIVE_FORMATS) {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Some(date) = parse_compact_date(raw) {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Some(time) = ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
    {
        let (y, m, d) = TIME_ONLY_ANCHOR;
        return NaiveDate::from_ymd_opt(y, m, d).map(|date| date.and_time(time));
    }
    raw.parse::<f64>().ok().and_then(from_epoch)
}

/// `YYYYMMDD`, checked before the epoch fallback so it is not read as seconds.
fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = raw[0..4].parse().ok()?;
    let month = raw[4..6].parse().ok()?;
    let day = raw[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_naive(raw: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn from_epoch(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value > EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    DateTime::<Utc>::from_timestamp_millis(millis as i64).map(|dt| dt.naive_utc())
}
