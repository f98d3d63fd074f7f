//! read configuration from code or a file

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Error;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Origin every request path is resolved against.
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sent with every request; per-request headers win on conflict.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Envelope codes that mark a refresh response as successful.
    #[serde(default = "default_refresh_ok_codes")]
    pub refresh_ok_codes: Vec<i64>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_refresh_ok_codes() -> Vec<i64> {
    vec![200]
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            default_headers: BTreeMap::new(),
            refresh_path: default_refresh_path(),
            refresh_ok_codes: default_refresh_ok_codes(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_refresh_ok_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.refresh_ok_codes = codes.into_iter().collect();
        self
    }

    /// Load a JSON config file. Missing optional fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse config '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL with a scheme and without a trailing slash.
    pub fn origin(&self) -> String {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let origin = self.origin();
        let url = reqwest::Url::parse(&origin)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", origin, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Base URL '{}' must use http or https",
                origin
            )));
        }
        if url.host_str().is_none() {
            return Err(Error::Config(format!("Base URL '{}' has no host", origin)));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("Timeout must be > 0".into()));
        }
        if !self.refresh_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Refresh path '{}' must start with '/'",
                self.refresh_path
            )));
        }
        if self.refresh_ok_codes.is_empty() {
            return Err(Error::Config("Refresh ok codes must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        let origin = self.origin();
        if path.starts_with('/') {
            format!("{origin}{path}")
        } else {
            format!("{origin}/{path}")
        }
    }
}
