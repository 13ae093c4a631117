//! Error taxonomy for application fetches.
//!
//! Each layer has its own error type. Only [`FetchError`] crosses the public
//! boundary of [`crate::client::HistoryClient`], and it is the single place
//! where a failure is classified into a [`Disposition`].

use thiserror::Error;

use crate::decode::DecodeError;
use crate::endpoint::EndpointError;
use crate::fetch::ResourceError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("history endpoint configuration error: {reason}")]
    Configuration { reason: String },

    #[error("connection to history server failed for {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("application {app_id} is no longer retained by the history server ({url})")]
    MissingHistory { app_id: String, url: String },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("application id '{app_id}' cannot be addressed on the history server")]
    InvalidApplicationId { app_id: String },

    #[error("unclassified failure while {context}: {source}")]
    Unclassified {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

/// What a caller should do with an application after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Transient; fetching the same application again may succeed.
    Retry,
    /// Permanent for this application id.
    Skip,
    /// Abort the whole run.
    Fail,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Retry => write!(f, "retry"),
            Disposition::Skip => write!(f, "skip"),
            Disposition::Fail => write!(f, "fail"),
        }
    }
}

impl FetchError {
    pub fn disposition(&self) -> Disposition {
        match self {
            FetchError::Connection { .. } => Disposition::Retry,
            FetchError::MissingHistory { .. }
            | FetchError::InvalidResponse { .. }
            | FetchError::InvalidApplicationId { .. } => Disposition::Skip,
            FetchError::Configuration { .. } | FetchError::Unclassified { .. } => {
                Disposition::Fail
            }
        }
    }

    /// Classify a lower-level failure observed while fetching `app_id`.
    pub(crate) fn from_resource(app_id: &str, err: ResourceError) -> Self {
        match err {
            ResourceError::Transport(TransportError::NotFound { url })
            | ResourceError::Decode(DecodeError::SoftNotFound { url }) => {
                FetchError::MissingHistory {
                    app_id: app_id.to_string(),
                    url,
                }
            }
            ResourceError::Transport(TransportError::Connection { url, reason }) => {
                FetchError::Connection { url, reason }
            }
            ResourceError::Decode(DecodeError::Malformed { url, reason }) => {
                FetchError::InvalidResponse { url, reason }
            }
        }
    }
}

impl From<EndpointError> for FetchError {
    fn from(err: EndpointError) -> Self {
        FetchError::Configuration {
            reason: err.to_string(),
        }
    }
}
