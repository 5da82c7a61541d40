use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use flowtalk_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_TRANSLATE_CONCURRENCY, MAX_CONTENT_CODEPOINTS,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    /// Directory holding the database file.
    pub database_url: PathBuf,
    /// Database file name (without extension).
    pub database_name: String,
    pub jwt_secret: String,
    pub translator_api_url: String,
    pub translator_api_key: Option<String>,
    /// Force the deterministic phrase-table fallback (degraded mode).
    pub translator_offline: bool,
    pub max_content_length: usize,
    pub translate_concurrency: usize,
    pub cache_max_entries: usize,
    pub cache_ttl: Duration,
    pub cache_cleanup_interval: Duration,
}

impl ServerConfig {
    /// Load the configuration from the environment. `JWT_SECRET` is the only
    /// required variable; everything else has a sensible default and invalid
    /// values fall back with a warning.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        let mut config = Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_url: PathBuf::from("./data"),
            database_name: "flowtalk".to_string(),
            jwt_secret,
            translator_api_url: "https://translate.example.com/translate".to_string(),
            translator_api_key: None,
            translator_offline: false,
            max_content_length: MAX_CONTENT_CODEPOINTS,
            translate_concurrency: DEFAULT_TRANSLATE_CONCURRENCY,
            cache_max_entries: 1000,
            cache_ttl: Duration::from_secs(3600),
            cache_cleanup_interval: Duration::from_secs(300),
        };

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = PathBuf::from(url);
        }

        if let Ok(name) = std::env::var("DATABASE_NAME") {
            if !name.is_empty() {
                config.database_name = name;
            }
        }

        if let Ok(url) = std::env::var("TRANSLATOR_API_URL") {
            config.translator_api_url = url;
        }

        if let Ok(key) = std::env::var("TRANSLATOR_API_KEY") {
            if !key.is_empty() {
                config.translator_api_key = Some(key);
            }
        }

        if let Ok(val) = std::env::var("TRANSLATOR_OFFLINE") {
            config.translator_offline = val != "false" && val != "0";
        }

        if let Ok(val) = std::env::var("MAX_CONTENT_LENGTH") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_content_length = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_CONTENT_LENGTH, using default"),
            }
        }

        if let Ok(val) = std::env::var("TRANSLATE_CONCURRENCY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.translate_concurrency = n,
                _ => tracing::warn!(value = %val, "Invalid TRANSLATE_CONCURRENCY, using default"),
            }
        }

        if let Ok(val) = std::env::var("CACHE_MAX_ENTRIES") {
            match val.parse::<usize>() {
                Ok(n) => config.cache_max_entries = n,
                _ => tracing::warn!(value = %val, "Invalid CACHE_MAX_ENTRIES, using default"),
            }
        }

        if let Ok(val) = std::env::var("CACHE_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(n) => config.cache_ttl = Duration::from_secs(n),
                _ => tracing::warn!(value = %val, "Invalid CACHE_TTL_SECS, using default"),
            }
        }

        if let Ok(val) = std::env::var("CACHE_CLEANUP_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.cache_cleanup_interval = Duration::from_secs(n),
                _ => tracing::warn!(value = %val, "Invalid CACHE_CLEANUP_SECS, using default"),
            }
        }

        Ok(config)
    }

    /// The full path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.database_url
            .join(format!("{}.db", self.database_name))
    }
}
