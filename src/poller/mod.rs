//! Pet-store ingestion: fetch pets on a fixed interval and mirror each new
//! one into the local cache and the catalog API.

pub mod cache;
pub mod catalog;
pub mod models;
pub mod service;

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;

use models::{Pet, PollSummary, SaveOutcome, SinkFailure, SinkSource};
use service::IngestService;

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("can't decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{sink} sink: {message}")]
    Sink { sink: SinkSource, message: String },

    #[error("saving pet failed: {}", join_failures(.0))]
    Save(Vec<SinkFailure>),
}

impl PollerError {
    /// HTTP status of a non-2xx answer.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            PollerError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Worth retrying on a later tick: transport failures, timeouts, throttling
    /// and 5xx answers. Client errors and bad payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            PollerError::Fetch { .. } => true,
            PollerError::Status { status, .. } => {
                status.is_server_error()
                    || *status == reqwest::StatusCode::REQUEST_TIMEOUT
                    || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            PollerError::Decode { .. } | PollerError::Sink { .. } => false,
            PollerError::Save(failures) => failures.iter().any(|f| f.retryable),
        }
    }
}

fn join_failures(failures: &[SinkFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A write target for ingested pets.
#[async_trait]
pub trait PetSink: Send + Sync {
    async fn create(&self, pet: &Pet) -> Result<i64, PollerError>;
}

/// The local side of the dual write: a sink that also remembers what it has
/// stored.
pub trait PetCacheSink: PetSink {
    fn get_by_id(&self, id: i64) -> Option<Pet>;

    fn evict(&self, id: i64);

    /// Drop expired entries; returns how many went.
    fn purge_expired(&self) -> usize;
}

/// Where pets come from.
#[async_trait]
pub trait PetSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Pet>, PollerError>;
}

/// Reads the pet list with a single GET.
pub struct HttpPetSource {
    http: reqwest::Client,
    url: String,
}

impl HttpPetSource {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl PetSource for HttpPetSource {
    async fn fetch(&self) -> Result<Vec<Pet>, PollerError> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|source| PollerError::Fetch {
                url: self.url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PollerError::Status {
                url: self.url.clone(),
                status,
            });
        }

        resp.json()
            .await
            .map_err(|source| PollerError::Decode {
                url: self.url.clone(),
                source,
            })
    }
}

pub struct PetStorePoller {
    source: Arc<dyn PetSource>,
    ingest: IngestService,
    interval: Duration,
}

impl PetStorePoller {
    pub fn new(source: Arc<dyn PetSource>, ingest: IngestService, interval: Duration) -> Self {
        Self {
            source,
            ingest,
            interval,
        }
    }

    /// One tick: fetch, then save every record. A failing record is logged
    /// and does not stop the rest; a failing fetch aborts the tick.
    pub async fn poll_once(&self) -> Result<PollSummary, PollerError> {
        let pets = self.source.fetch().await?;
        tracing::info!(count = pets.len(), "fetched pets");

        let mut summary = PollSummary {
            fetched: pets.len(),
            ..Default::default()
        };

        for pet in &pets {
            match self.ingest.save(pet).await {
                Ok(SaveOutcome::Written) => summary.written += 1,
                Ok(SaveOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!(pet_id = pet.id, error = %e, "can't save pet");
                    summary.failed += 1;
                }
            }
        }

        let purged = self.ingest.cache().purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "expired cache entries dropped");
        }

        Ok(summary)
    }

    /// Poll on a fixed interval until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("poller stopping");
                    return;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(s) => tracing::info!(
                            fetched = s.fetched,
                            written = s.written,
                            skipped = s.skipped,
                            failed = s.failed,
                            "poll finished"
                        ),
                        Err(e) => tracing::warn!(error = %e, "poll failed"),
                    }
                }
            }
        }
    }
}
