//! History server endpoint resolution.
//!
//! The base address comes from one of two places depending on the cluster
//! distribution: the configured property map, or (on the alternate
//! distribution) the output of a discovery command. Both sources are run
//! through the same validation before they are accepted.

use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{HistoryConfig, ProbeConfig};

/// Property key holding the history server address.
pub const HISTORY_ADDRESS_KEY: &str = "spark.yarn.historyServer.address";

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("no history server address configured under '{key}'")]
    Missing { key: String },

    #[error("history server address '{address}' is invalid: {reason}")]
    Invalid { address: String, reason: String },

    #[error("{kind} probe failed: {reason}")]
    Probe { kind: ProbeKind, reason: String },

    #[error("'{segment}' cannot be used as a URL path segment")]
    InvalidSegment { segment: String },
}

/// The two questions the resolver may ask of its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Which cluster distribution is this host part of?
    Distribution,
    /// Where does the history server live? Only asked on the alternate distribution.
    Discovery,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Distribution => write!(f, "distribution"),
            ProbeKind::Discovery => write!(f, "discovery"),
        }
    }
}

/// Capability used by [`EndpointResolver`] to query the host environment.
pub trait Probe: Send + Sync {
    /// Return the raw text answer for `kind`. Implementations must not retry.
    fn probe(&self, kind: ProbeKind) -> Result<String, EndpointError>;
}

/// Probe that runs the configured shell commands.
pub struct CommandProbe {
    distribution: Vec<String>,
    discovery: Vec<String>,
}

impl CommandProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            distribution: config.distribution_command.clone(),
            discovery: config.discovery_command.clone(),
        }
    }
}

impl Probe for CommandProbe {
    fn probe(&self, kind: ProbeKind) -> Result<String, EndpointError> {
        let argv = match kind {
            ProbeKind::Distribution => &self.distribution,
            ProbeKind::Discovery => &self.discovery,
        };
        let (program, args) = argv.split_first().ok_or_else(|| EndpointError::Probe {
            kind,
            reason: "no command configured".to_string(),
        })?;

        debug!(%kind, %program, "running endpoint probe");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| EndpointError::Probe {
                kind,
                reason: format!("failed to spawn {}: {}", program, e),
            })?;

        if !output.status.success() {
            return Err(EndpointError::Probe {
                kind,
                reason: format!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Validated base address of the history server, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    url: Url,
}

impl Endpoint {
    /// Accept `address` only if it is an absolute http(s) URL with a host and
    /// nothing after the authority.
    pub fn parse(address: &str) -> Result<Self, EndpointError> {
        let invalid = |reason: &str| EndpointError::Invalid {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(address).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        // Url normalises an empty path to "/", so look at the raw text instead.
        let rest = address
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        if rest.contains(['/', '?', '#']) {
            return Err(invalid("path component must be empty"));
        }

        Ok(Self {
            address: address.to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// `{base}/api/v1/applications/{app_id}`, with `app_id` as one encoded segment.
    pub fn application_url(&self, app_id: &str) -> Result<Url, EndpointError> {
        append_segments(&self.url, &["api", "v1", "applications", app_id])
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

/// Append each of `segments` to the path of `base` as a single
/// percent-encoded segment. Empty, `.` and `..` segments are refused.
pub fn append_segments(base: &Url, segments: &[&str]) -> Result<Url, EndpointError> {
    if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
        return Err(EndpointError::InvalidSegment {
            segment: bad.to_string(),
        });
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| EndpointError::Invalid {
            address: base.to_string(),
            reason: "cannot be a base URL".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Clean up text returned by the discovery probe.
pub fn sanitize_discovered(raw: &str) -> String {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c.is_control());
    let fixed = match trimmed.strip_prefix("urlhttp") {
        Some(rest) => format!("http{}", rest),
        None => trimmed.to_string(),
    };
    fixed.trim_end_matches('/').to_string()
}

pub struct EndpointResolver {
    probe: Arc<dyn Probe>,
    properties: HashMap<String, String>,
    alternate_distribution: String,
}

impl EndpointResolver {
    pub fn new(probe: Arc<dyn Probe>, config: &HistoryConfig) -> Self {
        Self {
            probe,
            properties: config.properties.clone(),
            alternate_distribution: config.alternate_distribution.clone(),
        }
    }

    pub fn resolve(&self) -> Result<Endpoint, EndpointError> {
        let distribution = self.probe.probe(ProbeKind::Distribution)?;
        let distribution = distribution.trim();

        let address = if distribution.eq_ignore_ascii_case(&self.alternate_distribution) {
            let raw = self.probe.probe(ProbeKind::Discovery)?;
            let cleaned = sanitize_discovered(&raw);
            if cleaned != raw {
                warn!(raw = %raw.escape_debug(), %cleaned, "sanitized discovered history address");
            }
            cleaned
        } else {
            self.properties
                .get(HISTORY_ADDRESS_KEY)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| EndpointError::Missing {
                    key: HISTORY_ADDRESS_KEY.to_string(),
                })?
        };

        let endpoint = Endpoint::parse(&address)?;
        info!(%distribution, %endpoint, "resolved history server endpoint");
        Ok(endpoint)
    }
}
