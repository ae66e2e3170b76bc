use std::thread;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use thiserror::Error;

use crate::http_cache;
use crate::http_client::http_client;

pub const BODY_LIMIT: usize = 1200;
const TRUNCATED_SUFFIX: &str = "... [truncated]";

/// Upstream failure captured as data at the fetch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("http {status} {reason}: {body}")]
    Http {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("transport: {error}")]
    Transport { error: String },
}

impl FetchError {
    /// Legacy envelope shape, shown in the raw JSON panel.
    pub fn to_envelope(&self) -> Value {
        match self {
            FetchError::Http {
                status,
                reason,
                body,
            } => json!({
                "_http_error": true,
                "status": status,
                "reason": reason,
                "body": body,
            }),
            FetchError::Transport { error } => json!({
                "_exception": true,
                "error": error,
            }),
        }
    }

    /// Reads an error envelope that arrived as a payload.
    pub fn from_envelope(value: &Value) -> Option<Self> {
        let text = |key: &str| {
            value
                .get(key)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };
        let flag = |key: &str| value.get(key).is_some_and(truthy);
        if flag("_http_error") {
            let status = value
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or_default();
            return Some(FetchError::Http {
                status,
                reason: text("reason"),
                body: text("body"),
            });
        }
        if flag("_exception") {
            return Some(FetchError::Transport {
                error: text("error"),
            });
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Json(Value),
    Text(String),
    Failed(FetchError),
}

impl RawResponse {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => RawResponse::Json(value),
            Err(_) => RawResponse::Text(body.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RawResponse::Json(value) => value.clone(),
            RawResponse::Text(text) => json!({ "_raw_text": text }),
            RawResponse::Failed(err) => err.to_envelope(),
        }
    }

}

/// True for `{_http_error: true, ..}` or `{_exception: true, ..}` payloads.
pub fn is_error_envelope(value: &Value) -> bool {
    let flag = |key: &str| value.get(key).is_some_and(truthy);
    flag("_http_error") || flag("_exception")
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_LIMIT).collect();
    if chars.next().is_some() {
        format!("{head}{TRUNCATED_SUFFIX}")
    } else {
        head
    }
}

/// How the API key travels with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Bearer,
    Query(String),
    Header(String),
}

impl AuthMode {
    /// Parses `bearer`, `query:<name>` or `header:<name>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("bearer") {
            return Some(AuthMode::Bearer);
        }
        let (kind, name) = raw.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match kind.trim().to_ascii_lowercase().as_str() {
            "query" => Some(AuthMode::Query(name.to_string())),
            "header" => Some(AuthMode::Header(name.to_string())),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            AuthMode::Bearer => "bearer".to_string(),
            AuthMode::Query(name) => format!("query:{name}"),
            AuthMode::Header(name) => format!("header:{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub auth: AuthMode,
    pub api_key: String,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, auth: AuthMode, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            auth,
            api_key: api_key.into(),
        }
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }
}

/// `{base}{/endpoint}` with exactly one slash at the seam.
pub fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_sleep: Duration,
    pub cache_ttl_secs: u64,
}

impl HttpFetcher {
    /// GET with retry on transport failure. Never returns an `Err`.
    pub fn get(&self, req: &FetchRequest) -> RawResponse {
        let key = http_cache::request_key(&req.url, &req.query, &req.auth.label(), &req.api_key);
        if let Some(entry) = http_cache::lookup(&key, self.cache_ttl_secs) {
            tracing::debug!(url = %req.url, "http cache hit");
            return RawResponse::from_body(&entry.body);
        }

        let client = match http_client(self.timeout) {
            Ok(client) => client,
            Err(err) => {
                return RawResponse::Failed(FetchError::Transport {
                    error: format!("{err:#}"),
                });
            }
        };

        let attempts = self.retries.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            tracing::debug!(url = %req.url, attempt, "GET");
            match self.send_once(client, req) {
                Ok((200, body)) => {
                    http_cache::store(&key, &body, self.cache_ttl_secs);
                    return RawResponse::from_body(&body);
                }
                Ok((status, body)) => {
                    let reason = reqwest::StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or_default()
                        .to_string();
                    tracing::warn!(url = %req.url, status, "upstream returned an error status");
                    return RawResponse::Failed(FetchError::Http {
                        status,
                        reason,
                        body: truncate_body(&body),
                    });
                }
                Err(err) => {
                    tracing::warn!(url = %req.url, attempt, error = %err, "request failed");
                    last_error = Some(err);
                    thread::sleep(self.retry_sleep);
                }
            }
        }

        RawResponse::Failed(FetchError::Transport {
            error: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }

    fn send_once(
        &self,
        client: &reqwest::blocking::Client,
        req: &FetchRequest,
    ) -> Result<(u16, String), String> {
        let mut query = req.query.clone();
        let mut builder = client.get(&req.url);
        match &req.auth {
            AuthMode::Bearer => {
                builder = builder.header(AUTHORIZATION, format!("Bearer {}", req.api_key));
            }
            AuthMode::Query(name) => query.push((name.clone(), req.api_key.clone())),
            AuthMode::Header(name) => builder = builder.header(name.as_str(), req.api_key.as_str()),
        }
        let resp = builder
            .query(&query)
            .send()
            .map_err(|err| err.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|err| err.to_string())?;
        Ok((status, body))
    }
}
