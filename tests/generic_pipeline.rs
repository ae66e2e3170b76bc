use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Value, json};

use tennis_odds::config::{AppConfig, Provider, SportDbConfig, SportradarConfig};
use tennis_odds::fetch::{AuthMode, FetchError, HttpFetcher, RawResponse};
use tennis_odds::filters::{SkipReason, filter_by_bookmaker, filter_tennis};
use tennis_odds::normalize::normalize_any;
use tennis_odds::pipeline::{RunStatus, run_generic, sportdb_request};
use tennis_odds::time_sort::sort_by_time;

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be json")
}

fn test_config(bookmaker: &str) -> AppConfig {
    AppConfig {
        provider: Provider::SportDb,
        date: NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date"),
        bookmaker: bookmaker.to_string(),
        sportdb: SportDbConfig {
            api_key: Some("key".to_string()),
            base_url: "https://odds.test/".to_string(),
            endpoint: "api/odds".to_string(),
            auth: AuthMode::Bearer,
        },
        sportradar: SportradarConfig {
            api_key: None,
            base_url: "https://sr.test".to_string(),
            sport_urn: "sr:sport:5".to_string(),
            auth: AuthMode::Query("api_key".to_string()),
            max_events: 60,
            event_delay: Duration::ZERO,
            book_id: None,
        },
        http: HttpFetcher {
            timeout: Duration::from_secs(1),
            retries: 1,
            retry_sleep: Duration::ZERO,
            cache_ttl_secs: 0,
        },
    }
}

#[test]
fn list_payload_yields_one_row_per_element() {
    let payload = json!([{"a": 1}, {"b": {"c": 2}}, 3, null]);
    let table = normalize_any(&payload);
    assert_eq!(table.len(), 4);
    assert_eq!(table.columns, vec!["a", "b.c", "value"]);
}

#[test]
fn earliest_wrapper_key_wins() {
    let payload = json!({
        "odds": [{"n": 1}],
        "matches": [{"n": 2}, {"n": 3}],
        "fixtures": "not a list"
    });
    let table = normalize_any(&payload);
    assert_eq!(table.len(), 2);
    assert_eq!(table.cell_text(0, "n"), "2");
}

#[test]
fn plain_object_becomes_single_row() {
    let payload = json!({"status": "ok", "info": {"count": 0}});
    let table = normalize_any(&payload);
    assert_eq!(table.len(), 1);
    assert_eq!(table.columns, vec!["status", "info.count"]);
}

#[test]
fn bookmaker_filter_with_empty_needle_is_identity() {
    let table = normalize_any(&read_fixture("sportdb_odds.json"));
    let out = filter_by_bookmaker(table.clone(), "");
    assert_eq!(out.skip_reason(), Some(SkipReason::EmptyNeedle));
    assert_eq!(out.into_table(), table);
}

#[test]
fn sport_filter_fails_open_without_sport_column() {
    let table = normalize_any(&json!([{"home": "A", "bookmaker": "Caliente"}]));
    let out = filter_tennis(table.clone());
    assert_eq!(out.skip_reason(), Some(SkipReason::NoMatchingColumn));
    assert_eq!(out.into_table(), table);
}

#[test]
fn bookmaker_filter_fails_open_without_book_column() {
    let table = normalize_any(&json!([{"home": "A", "sport": "tennis"}]));
    let out = filter_by_bookmaker(table.clone(), "Caliente");
    assert_eq!(out.skip_reason(), Some(SkipReason::NoMatchingColumn));
    assert_eq!(out.into_table(), table);
}

#[test]
fn time_sort_is_idempotent() {
    let table = normalize_any(&json!([
        {"id": 1, "kickoff": "2026-10-15T18:00:00Z"},
        {"id": 2, "kickoff": "garbage"},
        {"id": 3, "kickoff": "2026-10-15T09:00:00+00:00"},
        {"id": 4, "kickoff": "2026-10-15T09:00:00Z"},
    ]));
    let once = sort_by_time(table);
    assert_eq!(once.column.as_deref(), Some("kickoff"));
    let ids: Vec<String> = (0..once.table.len())
        .map(|i| once.table.cell_text(i, "id"))
        .collect();
    assert_eq!(ids, vec!["3", "4", "1", "2"]);
    assert_eq!(once.table.cell(3, "kickoff"), Some(&Value::Null));

    let twice = sort_by_time(once.table.clone());
    assert_eq!(twice.table, once.table);
}

#[test]
fn time_sort_uses_first_parseable_candidate_only() {
    let table = normalize_any(&json!([
        {"start_time": "tbd", "time": "2026-10-15 20:00", "start": "2026-10-14"},
        {"start_time": "tbd", "time": "2026-10-15 08:00", "start": "2026-10-16"},
    ]));
    let out = sort_by_time(table);
    assert_eq!(out.column.as_deref(), Some("time"));
    assert_eq!(out.table.cell_text(0, "time"), "2026-10-15 08:00:00");
    assert_eq!(out.table.cell_text(0, "start"), "2026-10-16");
    assert_eq!(out.table.cell_text(0, "start_time"), "tbd");
}

#[test]
fn time_sort_without_time_column_keeps_order() {
    let table = normalize_any(&json!([{"id": 2}, {"id": 1}]));
    let out = sort_by_time(table.clone());
    assert!(out.column.is_none());
    assert_eq!(out.table, table);
}

#[test]
fn generic_pipeline_filters_and_sorts() {
    let cfg = test_config("caliente");
    let payload = read_fixture("sportdb_odds.json");
    let mut seen = Vec::new();
    let report = run_generic(&cfg, "key", |req| {
        seen.push(req.clone());
        RawResponse::Json(payload.clone())
    });

    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].url, "https://odds.test/api/odds");
    assert_eq!(
        seen[0].query,
        vec![
            ("sport".to_string(), "tennis".to_string()),
            ("date".to_string(), "2026-10-15".to_string()),
        ]
    );

    assert_eq!(report.status, RunStatus::Rows(2));
    assert_eq!(report.table.cell_text(0, "id"), "m-1");
    assert_eq!(report.table.cell_text(1, "id"), "m-3");
    assert_eq!(report.table.cell_text(0, "start_time"), "2026-10-15 09:30:00");
    assert_eq!(report.table.cell_text(0, "price.home"), "1.85");
}

#[test]
fn generic_pipeline_reports_no_matches_separately_from_failures() {
    let cfg = test_config("pinnacle");
    let payload = read_fixture("sportdb_odds.json");
    let report = run_generic(&cfg, "key", |_| RawResponse::Json(payload.clone()));
    assert_eq!(report.status, RunStatus::NoMatches);
    assert!(report.raw.is_some());

    let err = FetchError::Http {
        status: 401,
        reason: "Unauthorized".to_string(),
        body: "bad key".to_string(),
    };
    let report = run_generic(&cfg, "key", |_| RawResponse::Failed(err.clone()));
    assert_eq!(report.status, RunStatus::UpstreamFailed(err));
    assert!(report.table.is_empty());
    assert_eq!(
        report.raw.as_ref().and_then(|r| r.get("status")),
        Some(&json!(401))
    );
}

#[test]
fn error_envelope_payload_short_circuits() {
    let cfg = test_config("");
    let envelope = json!({"_http_error": true, "status": 500, "body": "tennis down"});
    let report = run_generic(&cfg, "key", |_| RawResponse::Json(envelope.clone()));
    assert_eq!(
        report.status,
        RunStatus::UpstreamFailed(FetchError::Http {
            status: 500,
            reason: String::new(),
            body: "tennis down".to_string(),
        })
    );
    assert!(report.table.is_empty());
    assert_eq!(report.raw, Some(envelope));
}

#[test]
fn non_json_body_is_wrapped_as_raw_text() {
    let cfg = test_config("");
    let report = run_generic(&cfg, "key", |_| RawResponse::Text("<html>".to_string()));
    assert_eq!(report.status, RunStatus::Rows(1));
    assert_eq!(report.table.cell_text(0, "_raw_text"), "<html>");
}

#[test]
fn sportdb_request_uses_configured_auth() {
    let mut cfg = test_config("");
    cfg.sportdb.auth = AuthMode::Query("apikey".to_string());
    let req = sportdb_request(&cfg, "secret");
    assert_eq!(req.auth, AuthMode::Query("apikey".to_string()));
    assert_eq!(req.api_key, "secret");
}
