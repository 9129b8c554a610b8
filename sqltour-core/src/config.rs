use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TourError};
use crate::schema::Dialect;

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Backing store settings for an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Pool size; in-memory SQLite always uses one connection
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Log every statement and its parameters at INFO
    #[serde(default)]
    pub echo: bool,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            echo: false,
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Load `~/.sqltour/config.toml` if present, then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| TourError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get config file path: ~/.sqltour/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sqltour/config.toml")
    }

    /// `SQLTOUR_DATABASE_URL` wins over `DATABASE_URL`, which wins over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env::var("SQLTOUR_DATABASE_URL")
            .ok()
            .or_else(|| env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
        {
            debug!("database_url overridden from environment");
            self.database_url = url;
        }
        self
    }

    pub fn store_url(&self) -> Result<StoreUrl> {
        StoreUrl::parse(&self.database_url)
    }
}

/// A store URL resolved to a dialect and a URL the sqlx drivers accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUrl {
    pub dialect: Dialect,
    pub url: String,
}

impl StoreUrl {
    /// Accepts sqlx-style URLs as well as `dialect+driver://` ones, where the
    /// driver suffix is dropped (`postgresql+asyncpg://` → `postgresql://`).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (scheme, rest) = raw
            .split_once(':')
            .ok_or_else(|| TourError::config(format!("store URL has no scheme: '{raw}'")))?;
        let dialect_name = scheme.split('+').next().unwrap_or(scheme);
        let dialect: Dialect = dialect_name.parse()?;

        let url = match dialect {
            Dialect::Sqlite => {
                let target = rest.trim_start_matches('/');
                if target.is_empty() || target == ":memory:" {
                    DEFAULT_DATABASE_URL.to_string()
                } else {
                    let path = format!("sqlite:{rest}");
                    // create the file on first use unless the caller chose a mode
                    if path.contains('?') {
                        path
                    } else {
                        format!("{path}?mode=rwc")
                    }
                }
            }
            Dialect::Postgres => format!("{dialect_name}:{rest}"),
        };

        Ok(Self { dialect, url })
    }

    pub fn is_memory(&self) -> bool {
        self.dialect == Dialect::Sqlite
            && (self.url.contains(":memory:") || self.url.contains("mode=memory"))
    }
}
