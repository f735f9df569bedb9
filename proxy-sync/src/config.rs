//! Configuration for proxy-sync

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Sleep used when the configured interval is one second or less
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/config/config.yaml";

/// Default location of the append-only log file
pub const DEFAULT_LOG_FILE: &str = "/log/app.log";

/// Main sync configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Authoritative server
    pub source: ServerCredential,
    /// Servers converged towards the source
    #[serde(default)]
    pub destinations: Vec<ServerCredential>,
    /// Seconds between cycles (values <= 1 fall back to one hour)
    #[serde(default)]
    pub interval: i64,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Log file path (overridable from the command line)
    pub log_file: Option<String>,
    /// Extra record keys left out of the comparison
    #[serde(default)]
    pub ignore_fields: Vec<String>,
}

/// Address and login for one management API
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerCredential {
    /// Base URL (e.g., "http://npm.internal:81")
    pub address: String,
    /// Login identity
    pub username: String,
    /// Login secret
    pub password: String,
}

impl fmt::Debug for ServerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCredential")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ServerCredential {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Base address without a trailing slash
    pub fn base_url(&self) -> &str {
        self.address.trim_end_matches('/')
    }

    fn validate(&self, role: &str) -> Result<()> {
        let url = url::Url::parse(&self.address).map_err(|e| {
            SyncError::Config(format!("Invalid {} address '{}': {}", role, self.address, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::Config(format!(
                "Unsupported scheme for {} address '{}'",
                role, self.address
            )));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(SyncError::Config(format!(
                "Missing username or password for {} '{}'",
                role, self.address
            )));
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    30
}

impl SyncConfig {
    /// Load configuration from a YAML or TOML file, with `PROXY_SYNC__*` overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::ConfigNotFound(path.display().to_string()));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("PROXY_SYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to read config file: {}", e)))?;

        settings
            .try_deserialize()
            .map_err(|e| SyncError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.source.validate("source")?;

        for destination in &self.destinations {
            destination.validate("destination")?;
        }

        Ok(())
    }

    /// Interval actually slept between cycles
    pub fn effective_interval(&self) -> Duration {
        effective_interval(self.interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Coerce a configured interval: anything <= 1 second becomes one hour
pub fn effective_interval(configured: i64) -> Duration {
    if configured <= 1 {
        Duration::from_secs(DEFAULT_INTERVAL_SECS)
    } else {
        Duration::from_secs(configured as u64)
    }
}
