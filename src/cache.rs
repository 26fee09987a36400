//! Caller-owned result cache.
//!
//! A computed value plus the moment it was computed. Staleness is an
//! explicit check against a ttl; nothing expires behind the caller's back.
//! Persisted as JSON so `show` can reuse the last refresh.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult<T> {
    pub value: T,
    pub computed_at: DateTime<Utc>,
}

impl<T> CachedResult<T> {
    pub fn new(value: T, computed_at: DateTime<Utc>) -> Self {
        CachedResult { value, computed_at }
    }

    /// True once `ttl` has fully elapsed since `computed_at`. A timestamp
    /// in the future (clock moved backwards) also counts as stale.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.computed_at);
        match age.to_std() {
            Ok(age) => age >= ttl,
            Err(_) => true,
        }
    }
}

impl<T: Serialize + DeserializeOwned> CachedResult<T> {
    /// Read a cache file. Missing or unparsable files read as no cache.
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&text) {
            Ok(cached) => Some(cached),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring unreadable cache");
                None
            }
        }
    }

    /// Write through a temp file and rename so readers never see half a file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        let tmp = temp_path(path);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
