use std::env;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};

use crate::assemble::{DEFAULT_EVENT_DELAY_MS, DEFAULT_MAX_EVENTS};
use crate::fetch::{AuthMode, HttpFetcher};
use crate::http_client::DEFAULT_TIMEOUT_SECS;

pub const DEFAULT_SPORTDB_BASE_URL: &str = "https://dashboard.sportdb.dev";
pub const DEFAULT_SPORTDB_ENDPOINT: &str = "/api/odds";
pub const DEFAULT_SPORTRADAR_BASE_URL: &str =
    "https://api.sportradar.com/oddscomparison-prematch/trial/v2/en";
pub const DEFAULT_SPORTRADAR_SPORT_URN: &str = "sr:sport:5";
pub const DEFAULT_BOOKMAKER: &str = "Caliente";

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_SLEEP_MS: u64 = 600;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    SportDb,
    Sportradar,
}

impl Provider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sportdb" | "generic" => Some(Provider::SportDb),
            "sportradar" => Some(Provider::Sportradar),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Provider::SportDb => "SportDB",
            Provider::Sportradar => "Sportradar",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Provider::SportDb => Provider::Sportradar,
            Provider::Sportradar => Provider::SportDb,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SportDbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub endpoint: String,
    pub auth: AuthMode,
}

#[derive(Debug, Clone)]
pub struct SportradarConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub sport_urn: String,
    pub auth: AuthMode,
    pub max_events: usize,
    pub event_delay: Duration,
    pub book_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: Provider,
    pub date: NaiveDate,
    pub bookmaker: String,
    pub sportdb: SportDbConfig,
    pub sportradar: SportradarConfig,
    pub http: HttpFetcher,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let provider = var("ODDS_PROVIDER")
            .and_then(|v| Provider::parse(&v))
            .unwrap_or(Provider::SportDb);
        let date = var("ODDS_DATE")
            .and_then(|v| parse_date(&v))
            .unwrap_or_else(|| Local::now().date_naive());
        let bookmaker = var("ODDS_BOOKMAKER").unwrap_or_else(|| DEFAULT_BOOKMAKER.to_string());

        let sportdb = SportDbConfig {
            api_key: opt("SPORTDB_API_KEY"),
            base_url: opt("SPORTDB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SPORTDB_BASE_URL.to_string()),
            endpoint: opt("SPORTDB_ODDS_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_SPORTDB_ENDPOINT.to_string()),
            auth: opt("SPORTDB_AUTH")
                .and_then(|v| AuthMode::parse(&v))
                .unwrap_or(AuthMode::Bearer),
        };

        let sportradar = SportradarConfig {
            api_key: opt("SPORTRADAR_API_KEY"),
            base_url: opt("SPORTRADAR_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SPORTRADAR_BASE_URL.to_string()),
            sport_urn: opt("SPORTRADAR_SPORT_URN")
                .unwrap_or_else(|| DEFAULT_SPORTRADAR_SPORT_URN.to_string()),
            auth: opt("SPORTRADAR_AUTH")
                .and_then(|v| AuthMode::parse(&v))
                .unwrap_or_else(|| AuthMode::Query("api_key".to_string())),
            max_events: parse_or(opt("SPORTRADAR_MAX_EVENTS"), DEFAULT_MAX_EVENTS).clamp(1, 500),
            event_delay: Duration::from_millis(parse_or(
                opt("SPORTRADAR_DELAY_MS"),
                DEFAULT_EVENT_DELAY_MS,
            )),
            book_id: opt("SPORTRADAR_BOOK_ID"),
        };

        let http = HttpFetcher {
            timeout: Duration::from_secs(
                parse_or(opt("HTTP_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS).max(1),
            ),
            retries: parse_or(opt("HTTP_RETRIES"), DEFAULT_RETRIES).clamp(1, 10),
            retry_sleep: Duration::from_millis(parse_or(
                opt("HTTP_RETRY_SLEEP_MS"),
                DEFAULT_RETRY_SLEEP_MS,
            )),
            cache_ttl_secs: parse_or(opt("HTTP_CACHE_TTL_SECS"), DEFAULT_CACHE_TTL_SECS),
        };

        Self {
            provider,
            date,
            bookmaker,
            sportdb,
            sportradar,
            http,
        }
    }

    /// API key for the active provider, or an error naming the variable.
    pub fn api_key(&self) -> Result<&str> {
        let (key, var) = match self.provider {
            Provider::SportDb => (self.sportdb.api_key.as_deref(), "SPORTDB_API_KEY"),
            Provider::Sportradar => (self.sportradar.api_key.as_deref(), "SPORTRADAR_API_KEY"),
        };
        key.ok_or_else(|| anyhow!("missing API key: set {var}"))
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Applies `--key=value` / `--key value` overrides.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(raw) = arg_value(args, "provider") {
            self.provider =
                Provider::parse(&raw).ok_or_else(|| anyhow!("unknown provider: {raw}"))?;
        }
        if let Some(raw) = arg_value(args, "date") {
            self.date = parse_date(&raw).ok_or_else(|| anyhow!("invalid date: {raw}"))?;
        }
        if let Some(raw) = arg_value(args, "book") {
            self.bookmaker = raw;
        }
        Ok(())
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Value of `--name=value` or `--name value`. An explicit empty value
/// counts, so `--book=` clears the bookmaker filter.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let flag = format!("--{name}");
    let prefix = format!("--{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.trim().to_string());
        }
        if *arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}
