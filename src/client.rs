//! Application-level orchestration: one call fetches everything the history
//! server knows about a single application run.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::{FetcherConfig, HistoryConfig};
use crate::decode::ResponseDecoder;
use crate::endpoint::{CommandProbe, Endpoint, EndpointResolver, Probe};
use crate::error::FetchError;
use crate::fetch::{AttemptMode, AttemptTarget, ResourceError, ResourceFetcher};
use crate::model::{AggregateResult, ApplicationSummary, ExecutorRecord, JobRecord, StageRecord};
use crate::transport::{HttpTransport, Transport};

enum Fetched {
    Jobs(Vec<JobRecord>),
    Stages(Vec<StageRecord>),
    Executors(Vec<ExecutorRecord>),
}

/// Long-lived client for one history server. Safe to share across tasks.
pub struct HistoryClient {
    resolver: Arc<EndpointResolver>,
    endpoint: OnceCell<Endpoint>,
    fetcher: ResourceFetcher,
    runtime: Option<Handle>,
}

impl HistoryClient {
    /// Build a client that talks HTTP and probes the host with shell commands.
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(&config.http).map_err(|e| FetchError::Configuration {
            reason: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self::with_parts(
            Arc::new(transport),
            Arc::new(CommandProbe::new(&config.probes)),
            &config.history,
        ))
    }

    pub fn with_parts(
        transport: Arc<dyn Transport>,
        probe: Arc<dyn Probe>,
        history: &HistoryConfig,
    ) -> Self {
        Self {
            resolver: Arc::new(EndpointResolver::new(probe, history)),
            endpoint: OnceCell::new(),
            fetcher: ResourceFetcher::new(transport, ResponseDecoder::new()),
            runtime: None,
        }
    }

    /// Run endpoint probes and resource fetches on `handle` instead of the
    /// caller's runtime.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Resolve the history endpoint. Succeeds at most once per client; a
    /// failed resolution is attempted again on the next call.
    ///
    /// Probes run external commands, so resolution happens on the blocking pool.
    pub async fn endpoint(&self) -> Result<&Endpoint, FetchError> {
        self.endpoint
            .get_or_try_init(|| async {
                let resolver = Arc::clone(&self.resolver);
                let resolve = move || resolver.resolve();
                let joined = match &self.runtime {
                    Some(handle) => handle.spawn_blocking(resolve).await,
                    None => tokio::task::spawn_blocking(resolve).await,
                };
                joined
                    .map_err(|e| FetchError::Unclassified {
                        context: "resolving the history endpoint".to_string(),
                        source: anyhow::Error::new(e),
                    })?
                    .map_err(FetchError::from)
            })
            .await
    }

    pub async fn fetch_application(&self, app_id: &str) -> Result<AggregateResult, FetchError> {
        let started = Instant::now();
        let app_url = self
            .endpoint()
            .await?
            .application_url(app_id)
            .map_err(|_| FetchError::InvalidApplicationId {
                app_id: app_id.to_string(),
            })?;
        info!(%app_id, url = %app_url, "fetching application history");

        let summary: ApplicationSummary = self
            .fetcher
            .get(app_url.as_str())
            .await
            .map_err(|e| FetchError::from_resource(app_id, e))?;

        let attempt = summary
            .latest_attempt()
            .ok_or_else(|| FetchError::InvalidResponse {
                url: app_url.to_string(),
                reason: "application summary lists no attempts".to_string(),
            })?;
        let mode = AttemptMode::from_attempt_id(attempt.attempt_id.as_deref());
        let target =
            AttemptTarget::new(&app_url, &mode).map_err(|e| FetchError::InvalidResponse {
                url: app_url.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%app_id, ?mode, target = %target.url(), "selected latest attempt");

        let (jobs, stages, executors) = self.fetch_resources(app_id, &target).await?;

        info!(
            %app_id,
            ?mode,
            jobs = jobs.len(),
            stages = stages.len(),
            executors = executors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched application history"
        );

        Ok(AggregateResult {
            summary,
            jobs,
            stages,
            executors,
        })
    }

    /// Fetch jobs, stages and executors concurrently. The first failure wins;
    /// the remaining tasks are aborted when the set is dropped.
    async fn fetch_resources(
        &self,
        app_id: &str,
        target: &AttemptTarget,
    ) -> Result<(Vec<JobRecord>, Vec<StageRecord>, Vec<ExecutorRecord>), FetchError> {
        let mut tasks = JoinSet::new();

        let (fetcher, t) = (self.fetcher.clone(), target.clone());
        self.spawn(&mut tasks, async move { fetcher.fetch_jobs(&t).await.map(Fetched::Jobs) });
        let (fetcher, t) = (self.fetcher.clone(), target.clone());
        self.spawn(&mut tasks, async move {
            fetcher.fetch_stages(&t).await.map(Fetched::Stages)
        });
        let (fetcher, t) = (self.fetcher.clone(), target.clone());
        self.spawn(&mut tasks, async move {
            fetcher.fetch_executors(&t).await.map(Fetched::Executors)
        });

        let (mut jobs, mut stages, mut executors) = (None, None, None);
        while let Some(joined) = tasks.join_next().await {
            let fetched = joined
                .map_err(|e| FetchError::Unclassified {
                    context: format!("fetching {}", app_id),
                    source: anyhow::Error::new(e),
                })?
                .map_err(|e| FetchError::from_resource(app_id, e))?;
            match fetched {
                Fetched::Jobs(v) => jobs = Some(v),
                Fetched::Stages(v) => stages = Some(v),
                Fetched::Executors(v) => executors = Some(v),
            }
        }

        match (jobs, stages, executors) {
            (Some(jobs), Some(stages), Some(executors)) => Ok((jobs, stages, executors)),
            _ => Err(FetchError::Unclassified {
                context: format!("fetching {}", app_id),
                source: anyhow::anyhow!("resource task finished without a result"),
            }),
        }
    }

    fn spawn<F>(&self, tasks: &mut JoinSet<Result<Fetched, ResourceError>>, fut: F)
    where
        F: Future<Output = Result<Fetched, ResourceError>> + Send + 'static,
    {
        match &self.runtime {
            Some(handle) => {
                tasks.spawn_on(fut, handle);
            }
            None => {
                tasks.spawn(fut);
            }
        }
    }
}
