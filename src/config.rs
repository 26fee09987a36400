//! Layered configuration: built-in defaults, then a TOML file, then CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::cli::Cli;
use crate::parse::{SelectorError, Selectors, DEFAULT_TITLE_SELECTOR, DEFAULT_VOTES_SELECTOR};
use crate::store::snapshot::default_db_path;

pub const DEFAULT_LISTING_URL: &str =
    "https://vam.golosza.ru/vote/list?page=&mo-search=бор&filter%5Baddress%5D%5B%5D=1&search=undefined";
pub const DEFAULT_PATH_PREFIX: &str = "/vote/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

const CACHE_FILE: &str = "last_refresh.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("could not determine data directory")]
    NoDataDir,
}

/// Shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listing_url: Option<String>,
    pub path_prefix: Option<String>,
    pub timeout: Option<String>,
    pub delay: Option<String>,
    pub cache_ttl: Option<String>,
    pub db_path: Option<PathBuf>,
    pub title_selector: Option<String>,
    pub votes_selector: Option<String>,
}

impl FileConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Read `path`. A missing file is only an error when `required`.
    pub fn read(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => FileConfig::from_toml(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(FileConfig::default()),
            Err(source) => Err(ConfigError::Read { path: path.to_path_buf(), source }),
        }
    }
}

pub struct Config {
    pub listing_url: Url,
    pub path_prefix: String,
    pub timeout: Duration,
    pub delay: Duration,
    pub cache_ttl: Duration,
    pub db_path: PathBuf,
    pub cache_path: PathBuf,
    pub selectors: Selectors,
    pub verbose: bool,
}

impl Config {
    /// Resolve configuration for a CLI invocation.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path, true)?,
            None => match default_config_path() {
                Some(path) => FileConfig::read(&path, false)?,
                None => FileConfig::default(),
            },
        };

        let mut config = Config::from_file(file)?;
        if let Some(db) = &cli.db {
            config.set_db_path(db.clone());
        }
        config.verbose = cli.verbose;
        Ok(config)
    }

    pub fn from_file(file: FileConfig) -> Result<Self, ConfigError> {
        let listing_url = file.listing_url.as_deref().unwrap_or(DEFAULT_LISTING_URL);
        let listing_url = Url::parse(listing_url)
            .map_err(|e| invalid("listing_url", format!("'{listing_url}': {e}")))?;
        if listing_url.scheme() != "http" && listing_url.scheme() != "https" {
            return Err(invalid("listing_url", format!("unsupported scheme '{}'", listing_url.scheme())));
        }

        let path_prefix = file.path_prefix.unwrap_or_else(|| DEFAULT_PATH_PREFIX.to_string());
        if !path_prefix.starts_with('/') || !path_prefix.ends_with('/') {
            return Err(invalid("path_prefix", format!("'{path_prefix}' must start and end with '/'")));
        }

        let selectors = Selectors::new(
            file.title_selector.as_deref().unwrap_or(DEFAULT_TITLE_SELECTOR),
            file.votes_selector.as_deref().unwrap_or(DEFAULT_VOTES_SELECTOR),
        )?;

        let db_path = match file.db_path {
            Some(path) => path,
            None => default_db_path().map_err(|_| ConfigError::NoDataDir)?,
        };

        let mut config = Config {
            listing_url,
            path_prefix,
            timeout: duration("timeout", file.timeout.as_deref(), DEFAULT_TIMEOUT)?,
            delay: duration("delay", file.delay.as_deref(), DEFAULT_DELAY)?,
            cache_ttl: duration("cache_ttl", file.cache_ttl.as_deref(), DEFAULT_CACHE_TTL)?,
            db_path: PathBuf::new(),
            cache_path: PathBuf::new(),
            selectors,
            verbose: false,
        };
        config.set_db_path(db_path);
        Ok(config)
    }

    /// The refresh cache always lives next to the database.
    pub fn set_db_path(&mut self, db_path: PathBuf) {
        self.cache_path = db_path.with_file_name(CACHE_FILE);
        self.db_path = db_path;
    }
}

/// ~/.config/votewatch/config.toml or platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "votewatch").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn duration(key: &'static str, value: Option<&str>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(s) => humantime::parse_duration(s.trim()).map_err(|e| invalid(key, format!("'{s}': {e}"))),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { key, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(toml: &str) -> FileConfig {
        FileConfig::from_toml(toml, Path::new("config.toml")).unwrap()
    }

    fn with_db(toml: &str) -> Result<Config, ConfigError> {
        Config::from_file(file(&format!("db_path = \"/tmp/vw/history.db\"\n{toml}")))
    }

    #[test]
    fn defaults_apply() {
        let config = with_db("").unwrap();
        assert_eq!(config.listing_url.host_str(), Some("vam.golosza.ru"));
        assert_eq!(config.listing_url.path(), "/vote/list");
        assert_eq!(config.path_prefix, "/vote/");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.delay, Duration::from_millis(200));
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.cache_path, PathBuf::from("/tmp/vw/last_refresh.json"));
    }

    #[test]
    fn file_values_override_defaults() {
        let config = with_db(
            r#"
            listing_url = "http://localhost:8080/p/list"
            path_prefix = "/p/"
            timeout = "3s"
            delay = "250ms"
            cache_ttl = "1h"
            title_selector = "h1"
            votes_selector = ".count"
            "#,
        )
        .unwrap();

        assert_eq!(config.listing_url.as_str(), "http://localhost:8080/p/list");
        assert_eq!(config.path_prefix, "/p/");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn bad_values_rejected() {
        assert!(matches!(with_db("timeout = \"soon\""), Err(ConfigError::Invalid { key: "timeout", .. })));
        assert!(matches!(with_db("listing_url = \"not a url\""), Err(ConfigError::Invalid { key: "listing_url", .. })));
        assert!(matches!(with_db("listing_url = \"ftp://x/list\""), Err(ConfigError::Invalid { key: "listing_url", .. })));
        assert!(matches!(with_db("path_prefix = \"vote\""), Err(ConfigError::Invalid { key: "path_prefix", .. })));
        assert!(matches!(with_db("title_selector = \"p..x\""), Err(ConfigError::Selector(e)) if e.selector == "p..x"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = FileConfig::from_toml("listing = \"x\"", Path::new("config.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_optional_unless_required() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(FileConfig::read(&path, false).is_ok());
        assert!(matches!(FileConfig::read(&path, true), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn db_override_moves_cache() {
        let mut config = with_db("").unwrap();
        config.set_db_path(PathBuf::from("/data/other.db"));
        assert_eq!(config.db_path, PathBuf::from("/data/other.db"));
        assert_eq!(config.cache_path, PathBuf::from("/data/last_refresh.json"));
    }
}
