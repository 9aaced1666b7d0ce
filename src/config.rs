//! Data Source Configuration
//!
//! Settings are read from YAML. Each named entry under `data-source` describes
//! one Redis endpoint and its connection pool:
//!
//! ```yaml
//! data-source:
//!   primary:
//!     host: 10.0.0.5
//!     port: 6380
//!     password: s3cret
//!     database: 2
//!     pool:
//!       max-active: 16
//!       max-idle: 8
//!       min-idle: 2
//!       max-wait-ms: 500
//!       time-between-eviction-runs-ms: 30000
//!   reporting:
//!     database: 5
//! expiry:
//!   base-interval-ms: 50
//! ```
//!
//! Every field is optional; unspecified fields take the defaults below. The
//! `expiry` block configures the sweepers of in-memory stores (see
//! [`ExpiryConfig`]).

use crate::error::{Error, Result};
use crate::storage::ExpiryConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default Redis host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Redis port.
pub const DEFAULT_PORT: u16 = 6379;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_active() -> u32 {
    8
}

fn default_max_idle() -> u32 {
    8
}

/// Top-level settings: every configured data source, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RedisSettings {
    #[serde(default)]
    pub data_source: BTreeMap<String, DataSourceConfig>,

    #[serde(default)]
    pub expiry: ExpiryConfig,
}

impl RedisSettings {
    /// Parses settings from YAML text. Does not validate.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        debug!(
            data_sources = settings.data_source.len(),
            "Parsed data source settings"
        );
        Ok(settings)
    }

    /// Reads and parses a YAML settings file. Does not validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading data source settings");

        let yaml = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Checks every data source and the expiry block.
    pub fn validate(&self) -> Result<()> {
        if self.expiry.min_interval_ms == 0 {
            return Err(Error::Config(
                "expiry min-interval-ms must be at least 1".to_string(),
            ));
        }
        for (name, config) in &self.data_source {
            if name.trim().is_empty() {
                return Err(Error::Config(
                    "data source names must not be empty".to_string(),
                ));
            }
            config
                .validate()
                .map_err(|reason| Error::Config(format!("data source {:?}: {}", name, reason)))?;
        }
        Ok(())
    }
}

/// One Redis endpoint.
///
/// `Debug` output redacts the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataSourceConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Logical database index
    #[serde(default)]
    pub database: u32,

    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            database: 0,
            pool: PoolConfig::default(),
        }
    }
}

impl fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("pool", &self.pool)
            .finish()
    }
}

impl DataSourceConfig {
    /// Connection URL: `redis://[user[:pass]@]host:port/db`.
    ///
    /// A password without a username renders as `:pass@`.
    pub fn url(&self) -> String {
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (Some(user), None) => format!("{}@", user),
            (None, Some(pass)) => format!(":{}@", pass),
            (None, None) => String::new(),
        };
        format!(
            "redis://{}{}:{}/{}",
            credentials, self.host, self.port, self.database
        )
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be non-zero".to_string());
        }
        self.pool.validate()
    }
}

/// Connection pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PoolConfig {
    /// Upper bound on open connections
    #[serde(default = "default_max_active")]
    pub max_active: u32,

    /// Upper bound on idle connections
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,

    /// Idle connections kept open
    #[serde(default)]
    pub min_idle: u32,

    /// How long to wait for a free connection; unset waits indefinitely
    #[serde(default)]
    pub max_wait_ms: Option<u64>,

    /// Interval between idle-connection eviction runs; unset disables them
    #[serde(default)]
    pub time_between_eviction_runs_ms: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: default_max_active(),
            max_idle: default_max_idle(),
            min_idle: 0,
            max_wait_ms: None,
            time_between_eviction_runs_ms: None,
        }
    }
}

impl PoolConfig {
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }

    pub fn eviction_interval(&self) -> Option<Duration> {
        self.time_between_eviction_runs_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.max_active == 0 {
            return Err("pool max-active must be at least 1".to_string());
        }
        if self.max_idle > self.max_active {
            return Err(format!(
                "pool max-idle ({}) exceeds max-active ({})",
                self.max_idle, self.max_active
            ));
        }
        if self.min_idle > self.max_idle {
            return Err(format!(
                "pool min-idle ({}) exceeds max-idle ({})",
                self.min_idle, self.max_idle
            ));
        }
        Ok(())
    }
}
