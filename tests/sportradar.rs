use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Value, json};

use tennis_odds::assemble::{ASSEMBLED_COLUMNS, AssembleConfig, assemble_rows};
use tennis_odds::config::{AppConfig, Provider, SportDbConfig, SportradarConfig};
use tennis_odds::fetch::{AuthMode, FetchError, HttpFetcher, RawResponse};
use tennis_odds::pipeline::{RunStatus, markets_request, run_sportradar, schedule_request};
use tennis_odds::sportradar::{
    BookFilter, OddsRecord, ScheduledEvent, extract_match_winner, read_schedule,
};

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be json")
}

fn caliente_market() -> Value {
    json!({
        "markets": [{
            "name": "Match Winner",
            "books": [{
                "id": 7,
                "name": "Caliente",
                "outcomes": [{"name": "Player A", "odds": {"decimal": 1.85}}]
            }]
        }]
    })
}

fn event(id: &str) -> ScheduledEvent {
    ScheduledEvent {
        id: id.to_string(),
        start_time: Some("2026-10-15T10:00:00+00:00".to_string()),
        competitors: vec!["Player A".to_string(), "Player B".to_string()],
    }
}

fn no_delay() -> AssembleConfig {
    AssembleConfig {
        event_delay: Duration::ZERO,
        ..AssembleConfig::default()
    }
}

fn test_config(bookmaker: &str) -> AppConfig {
    AppConfig {
        provider: Provider::Sportradar,
        date: NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date"),
        bookmaker: bookmaker.to_string(),
        sportdb: SportDbConfig {
            api_key: None,
            base_url: "https://odds.test".to_string(),
            endpoint: "/api/odds".to_string(),
            auth: AuthMode::Bearer,
        },
        sportradar: SportradarConfig {
            api_key: Some("key".to_string()),
            base_url: "https://sr.test/v2/en/".to_string(),
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
fn extracts_match_winner_for_named_book() {
    let out = extract_match_winner(&caliente_market(), &BookFilter::by_name("Caliente"));
    assert_eq!(
        out,
        vec![OddsRecord {
            bookmaker: "Caliente".to_string(),
            outcome: "Player A".to_string(),
            decimal_odds: Some(1.85),
            american_odds: None,
        }]
    );
    let as_json = serde_json::to_value(&out).expect("serializable");
    assert_eq!(
        as_json,
        json!([{
            "bookmaker": "Caliente",
            "outcome": "Player A",
            "decimal_odds": 1.85,
            "american_odds": null
        }])
    );
}

#[test]
fn other_book_name_yields_nothing() {
    let out = extract_match_winner(&caliente_market(), &BookFilter::by_name("bet365"));
    assert!(out.is_empty());
}

#[test]
fn book_id_filter_is_exact() {
    let by_id = |id: &str| BookFilter {
        book_id: Some(id.to_string()),
        name_substr: None,
    };
    assert_eq!(extract_match_winner(&caliente_market(), &by_id("7")).len(), 1);
    assert!(extract_match_winner(&caliente_market(), &by_id("77")).is_empty());
}

#[test]
fn error_envelopes_short_circuit() {
    let filter = BookFilter::default();
    let mut payload = caliente_market();
    payload["_http_error"] = json!(true);
    assert!(extract_match_winner(&payload, &filter).is_empty());
    assert!(extract_match_winner(&json!({"_http_error": true, "status": 500}), &filter).is_empty());
    assert!(extract_match_winner(&json!({"_exception": true, "error": "timeout"}), &filter).is_empty());
}

#[test]
fn non_match_winner_markets_are_ignored() {
    let payload = read_fixture("sportradar_markets.json");
    let out = extract_match_winner(&payload, &BookFilter::default());
    assert_eq!(out.len(), 4);
    assert!(out.iter().all(|o| o.outcome != "over"));
    assert_eq!(out[0].decimal_odds, Some(1.85));
    assert_eq!(out[0].american_odds, Some(-118.0));
    assert_eq!(out[3].american_odds, Some(100.0));
}

#[test]
fn placeholder_row_for_event_without_odds() {
    let events = vec![event("e1"), event("e2")];
    let out = assemble_rows(
        &events,
        &no_delay(),
        |ev| {
            if ev.id == "e1" {
                RawResponse::Json(caliente_market())
            } else {
                RawResponse::Json(json!({"markets": []}))
            }
        },
        |_| {},
    );

    assert_eq!(out.table.columns, ASSEMBLED_COLUMNS.to_vec());
    assert!(out.failures.is_empty());
    let rows_for = |id: &str| {
        (0..out.table.len())
            .filter(|i| out.table.cell_text(*i, "match_id") == id)
            .count()
    };
    assert!(rows_for("e1") >= 1);
    assert_eq!(rows_for("e2"), 1);
    assert_eq!(out.table.cell_text(0, "bookmaker"), "Caliente");
    assert_eq!(out.table.cell_text(0, "competitor_2"), "Player B");
    assert_eq!(out.table.cell(1, "outcome"), Some(&Value::Null));
    assert_eq!(out.table.cell(1, "decimal_odds"), Some(&Value::Null));
}

#[test]
fn one_row_per_odds_record_in_schedule_order() {
    let events = vec![event("e1"), event("e2")];
    let markets = read_fixture("sportradar_markets.json");
    let out = assemble_rows(
        &events,
        &no_delay(),
        |_| RawResponse::Json(markets.clone()),
        |_| {},
    );
    let ids: Vec<String> = (0..out.table.len())
        .map(|i| out.table.cell_text(i, "match_id"))
        .collect();
    assert_eq!(ids, vec!["e1", "e1", "e1", "e1", "e2", "e2", "e2", "e2"]);
}

#[test]
fn failed_lookup_is_isolated_and_recorded() {
    let events = vec![event("e1"), event("e2"), event("e3")];
    let err = FetchError::Transport {
        error: "connection reset".to_string(),
    };
    let mut calls = Vec::new();
    let out = assemble_rows(
        &events,
        &no_delay(),
        |ev| {
            calls.push(ev.id.clone());
            if ev.id == "e2" {
                RawResponse::Failed(err.clone())
            } else {
                RawResponse::Json(caliente_market())
            }
        },
        |_| {},
    );
    assert_eq!(calls, vec!["e1", "e2", "e3"]);
    assert_eq!(out.failures, vec![("e2".to_string(), err)]);
    assert_eq!(out.table.len(), 3);
    assert_eq!(out.table.cell_text(1, "match_id"), "e2");
    assert_eq!(out.table.cell_text(1, "bookmaker"), "");
}

#[test]
fn event_cap_limits_lookups() {
    let events: Vec<ScheduledEvent> = (0..5).map(|i| event(&format!("e{i}"))).collect();
    let cfg = AssembleConfig {
        max_events: 2,
        ..no_delay()
    };
    let mut progress = Vec::new();
    let out = assemble_rows(
        &events,
        &cfg,
        |_| RawResponse::Json(json!({})),
        |p| progress.push((p.current, p.total)),
    );
    assert_eq!(out.events_seen, 2);
    assert_eq!(out.table.len(), 2);
    assert_eq!(progress, vec![(1, 2), (2, 2)]);
}

#[test]
fn sportradar_pipeline_end_to_end() {
    let cfg = test_config("caliente");
    let schedule = read_fixture("sportradar_schedule.json");
    let markets = read_fixture("sportradar_markets.json");
    assert_eq!(read_schedule(&schedule).len(), 3);

    let mut urls = Vec::new();
    let report = run_sportradar(
        &cfg,
        "key",
        |req| {
            urls.push(req.url.clone());
            if req.url.ends_with("schedules.json") {
                RawResponse::Json(schedule.clone())
            } else if req.url.contains("sr:sport_event:102") {
                RawResponse::Failed(FetchError::Http {
                    status: 429,
                    reason: "Too Many Requests".to_string(),
                    body: String::new(),
                })
            } else {
                RawResponse::Json(markets.clone())
            }
        },
        |_| {},
    );

    assert_eq!(
        urls[0],
        "https://sr.test/v2/en/sports/sr:sport:5/schedules/2026-10-15/schedules.json"
    );
    assert_eq!(urls.len(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "sr:sport_event:102");
    // two Caliente outcomes for 101, a placeholder for 102, two for 103
    assert_eq!(report.status, RunStatus::Rows(5));
    assert_eq!(report.table.cell_text(2, "match_id"), "sr:sport_event:102");
    assert_eq!(report.table.cell_text(2, "competitor_1"), "Player C");
    assert_eq!(report.table.cell_text(0, "decimal_odds"), "1.85");
}

#[test]
fn sportradar_schedule_failure_is_reported() {
    let cfg = test_config("");
    let err = FetchError::Transport {
        error: "dns".to_string(),
    };
    let report = run_sportradar(&cfg, "key", |_| RawResponse::Failed(err.clone()), |_| {});
    assert_eq!(report.status, RunStatus::UpstreamFailed(err));
}

#[test]
fn markets_request_path() {
    let cfg = test_config("");
    let req = markets_request(&cfg, "key", "sr:sport_event:1");
    assert_eq!(
        req.url,
        "https://sr.test/v2/en/sport_events/sr:sport_event:1/sport_event_markets.json"
    );
    assert_eq!(schedule_request(&cfg, "key").auth, AuthMode::Query("api_key".to_string()));
}
