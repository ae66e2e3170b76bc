use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CACHE_VERSION: u32 = 1;
pub const CACHE_DIR: &str = "tennis_odds";
const CACHE_FILE: &str = "http_cache.json";

static CACHE: Mutex<Option<HttpCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub body: String,
    pub fetched_at: u64,
}

/// Cache key for one request. The API key is hashed in, never stored.
pub fn request_key(url: &str, query: &[(String, String)], auth: &str, api_key: &str) -> String {
    let mut params: Vec<&(String, String)> = query.iter().collect();
    params.sort();

    let mut hasher = Sha256::new();
    hasher.update(b"GET\n");
    hasher.update(url.as_bytes());
    for (name, value) in params {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    hasher.update(b"\n");
    hasher.update(auth.as_bytes());
    hasher.update(b"\n");
    hasher.update(api_key.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Returns the cached body for `key` if it is younger than `ttl_secs`.
pub fn lookup(key: &str, ttl_secs: u64) -> Option<CacheEntry> {
    if ttl_secs == 0 {
        return None;
    }
    let now = now_secs();
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache
        .entries
        .get(key)
        .filter(|entry| is_fresh(entry.fetched_at, now, ttl_secs))
        .cloned()
}

pub fn store(key: &str, body: &str, ttl_secs: u64) {
    if ttl_secs == 0 {
        return;
    }
    let now = now_secs();
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache
        .entries
        .retain(|_, entry| is_fresh(entry.fetched_at, now, ttl_secs));
    cache.entries.insert(
        key.to_string(),
        CacheEntry {
            body: body.to_string(),
            fetched_at: now,
        },
    );
    if let Err(err) = save_cache_file(cache) {
        tracing::debug!(error = %err, "http cache not persisted");
    }
}

pub fn is_fresh(fetched_at: u64, now: u64, ttl_secs: u64) -> bool {
    now.saturating_sub(fetched_at) < ttl_secs
}

fn load_cache_file() -> HttpCacheFile {
    let Some(path) = cache_path() else {
        return HttpCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &HttpCacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join(CACHE_FILE))
}

/// `$XDG_CACHE_HOME/tennis_odds`, else `~/.cache/tennis_odds`.
pub fn cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
