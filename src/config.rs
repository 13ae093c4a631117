//! TOML configuration for sparkfetch.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration apart from the history server address itself.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SPARKFETCH_CONFIG";

const SYSTEM_CONFIG_PATH: &str = "/etc/sparkfetch/sparkfetch.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub probes: ProbeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FetcherConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded sparkfetch configuration");
        Ok(config)
    }

    /// Try, in order: the file named by `SPARKFETCH_CONFIG`, the system-wide
    /// file, then compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "SPARKFETCH_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// History server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Spark-style properties. The history server address is read from
    /// `spark.yarn.historyServer.address`.
    pub properties: HashMap<String, String>,
    /// Distribution classification (case-insensitive) that switches endpoint
    /// lookup to the discovery probe.
    pub alternate_distribution: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
            alternate_distribution: "emr".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout. Unset means the HTTP client's default.
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            connect_timeout_secs: None,
            user_agent: concat!("sparkfetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// Commands run by [`crate::endpoint::CommandProbe`], as argv vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub distribution_command: Vec<String>,
    pub discovery_command: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            distribution_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "test -f /mnt/var/lib/info/instance.json && echo emr || echo apache".to_string(),
            ],
            discovery_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "grep -o 'url.*' /etc/spark/conf/spark-defaults.conf | grep historyServer | head -n1 | awk '{print $2}'"
                    .to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
