//! Per-resource fetchers for one application attempt.

use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::error;

use crate::decode::{DecodeError, ResponseDecoder};
use crate::endpoint::{append_segments, EndpointError};
use crate::model::{ExecutorRecord, JobRecord, StageRecord};
use crate::transport::{Transport, TransportError};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Jobs,
    Stages,
    Executors,
}

impl ResourceKind {
    pub fn segment(self) -> &'static str {
        match self {
            ResourceKind::Jobs => "jobs",
            ResourceKind::Stages => "stages",
            ResourceKind::Executors => "executors",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.segment())
    }
}

/// Whether the selected attempt is addressed by its own path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptMode {
    /// Cluster deployment: `{app}/{attemptId}/...`
    WithId(String),
    /// Client deployment: `{app}/...`
    WithoutId,
}

impl AttemptMode {
    pub fn from_attempt_id(id: Option<&str>) -> Self {
        match id {
            Some(id) => AttemptMode::WithId(id.to_string()),
            None => AttemptMode::WithoutId,
        }
    }
}

/// Attempt-scoped base URL that resource segments are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTarget {
    url: Url,
}

impl AttemptTarget {
    /// Fails if the attempt id cannot stand as a single path segment.
    pub fn new(application_url: &Url, mode: &AttemptMode) -> Result<Self, EndpointError> {
        let url = match mode {
            AttemptMode::WithId(id) => append_segments(application_url, &[id.as_str()])?,
            AttemptMode::WithoutId => application_url.clone(),
        };
        Ok(Self { url })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn resource_url(&self, kind: ResourceKind) -> String {
        let mut url = self.url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.push(kind.segment());
        }
        url.into()
    }
}

/// GET + decode for any history resource. Cheap to clone.
#[derive(Clone)]
pub struct ResourceFetcher {
    transport: Arc<dyn Transport>,
    decoder: ResponseDecoder,
}

impl ResourceFetcher {
    pub fn new(transport: Arc<dyn Transport>, decoder: ResponseDecoder) -> Self {
        Self { transport, decoder }
    }

    /// Fetch and decode a single URL.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ResourceError> {
        let raw = self.transport.get(url).await?;
        Ok(self.decoder.decode(&raw, url)?)
    }

    pub async fn fetch_jobs(&self, target: &AttemptTarget) -> Result<Vec<JobRecord>, ResourceError> {
        self.fetch_resource(target, ResourceKind::Jobs).await
    }

    pub async fn fetch_stages(
        &self,
        target: &AttemptTarget,
    ) -> Result<Vec<StageRecord>, ResourceError> {
        self.fetch_resource(target, ResourceKind::Stages).await
    }

    pub async fn fetch_executors(
        &self,
        target: &AttemptTarget,
    ) -> Result<Vec<ExecutorRecord>, ResourceError> {
        self.fetch_resource(target, ResourceKind::Executors).await
    }

    async fn fetch_resource<T: DeserializeOwned>(
        &self,
        target: &AttemptTarget,
        kind: ResourceKind,
    ) -> Result<Vec<T>, ResourceError> {
        let url = target.resource_url(kind);
        self.get(&url).await.map_err(|e| {
            error!(resource = %kind, %url, error = %e, "failed to fetch history resource");
            e
        })
    }
}
