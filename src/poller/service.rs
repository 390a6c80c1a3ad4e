use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::poller::{
    models::{Pet, SaveOutcome, SinkFailure, SinkResult, SinkSource},
    PetCacheSink, PetSink, PollerError,
};

/// Dual write of one pet: the local cache and the remote catalog are written
/// concurrently, and the call returns only after both have reported.
#[derive(Clone)]
pub struct IngestService {
    cache: Arc<dyn PetCacheSink>,
    catalog: Arc<dyn PetSink>,
}

impl IngestService {
    pub fn new(cache: Arc<dyn PetCacheSink>, catalog: Arc<dyn PetSink>) -> Self {
        Self { cache, catalog }
    }

    pub fn cache(&self) -> &dyn PetCacheSink {
        self.cache.as_ref()
    }

    pub async fn save(&self, pet: &Pet) -> Result<SaveOutcome, PollerError> {
        if self.cache.get_by_id(pet.id).is_some() {
            tracing::debug!(pet_id = pet.id, "pet already cached, skipping");
            return Ok(SaveOutcome::Skipped);
        }

        let (tx, mut rx) = mpsc::channel::<SinkResult>(2);
        let handles = [
            (
                SinkSource::Cache,
                spawn_sink(self.cache.clone(), SinkSource::Cache, pet.clone(), tx.clone()),
            ),
            (
                SinkSource::Catalog,
                spawn_sink(self.catalog.clone(), SinkSource::Catalog, pet.clone(), tx),
            ),
        ];

        let mut failures = Vec::new();
        for (source, handle) in handles {
            if let Err(e) = handle.await {
                failures.push(SinkFailure {
                    source,
                    message: format!("sink task aborted: {e}"),
                    retryable: false,
                });
            }
        }

        // Every sender is gone once both tasks have finished.
        while let Some(result) = rx.recv().await {
            if result.is_success() {
                tracing::debug!(
                    pet_id = pet.id,
                    sink = %result.source,
                    id = result.id,
                    "sink write ok"
                );
            } else {
                failures.push(SinkFailure {
                    source: result.source,
                    message: result.error.unwrap_or_default(),
                    retryable: result.retryable,
                });
            }
        }

        if failures.is_empty() {
            return Ok(SaveOutcome::Written);
        }

        // Only a transient catalog failure gets another attempt next tick; a
        // rejected pet stays cached until its entry expires.
        let catalog_retryable = failures
            .iter()
            .any(|f| f.source == SinkSource::Catalog && f.retryable);
        let cache_failed = failures.iter().any(|f| f.source == SinkSource::Cache);
        if catalog_retryable && !cache_failed {
            self.cache.evict(pet.id);
        }

        Err(PollerError::Save(failures))
    }
}

fn spawn_sink<S>(
    sink: Arc<S>,
    source: SinkSource,
    pet: Pet,
    tx: mpsc::Sender<SinkResult>,
) -> JoinHandle<()>
where
    S: PetSink + ?Sized + 'static,
{
    tokio::spawn(async move {
        let result = match sink.create(&pet).await {
            Ok(id) => SinkResult {
                id,
                error: None,
                source,
                retryable: false,
            },
            Err(e) => SinkResult {
                id: 0,
                retryable: e.is_transient(),
                error: Some(e.to_string()),
                source,
            },
        };
        let _ = tx.send(result).await;
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::{
        clock::ManualClock,
        poller::{cache::PetCache, models::PetCategory},
    };

    enum Outcome {
        Ok,
        Unavailable,
        Rejected,
    }

    struct CountingSink {
        calls: AtomicUsize,
        outcome: Outcome,
    }

    impl CountingSink {
        fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PetSink for CountingSink {
        async fn create(&self, pet: &Pet) -> Result<i64, PollerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Ok => Ok(pet.id * 10),
                Outcome::Unavailable => Err(PollerError::Status {
                    url: "http://catalog/api/v1/product".into(),
                    status: StatusCode::SERVICE_UNAVAILABLE,
                }),
                Outcome::Rejected => Err(PollerError::Sink {
                    sink: SinkSource::Catalog,
                    message: "category not created".into(),
                }),
            }
        }
    }

    struct PanickingSink;

    #[async_trait]
    impl PetSink for PanickingSink {
        async fn create(&self, _pet: &Pet) -> Result<i64, PollerError> {
            panic!("boom");
        }
    }

    /// A cache whose writes always fail and which never remembers anything.
    struct BrokenCache {
        evicted: AtomicUsize,
    }

    #[async_trait]
    impl PetSink for BrokenCache {
        async fn create(&self, pet: &Pet) -> Result<i64, PollerError> {
            Err(PollerError::Sink {
                sink: SinkSource::Cache,
                message: format!("pet {} not stored", pet.id),
            })
        }
    }

    impl PetCacheSink for BrokenCache {
        fn get_by_id(&self, _id: i64) -> Option<Pet> {
            None
        }

        fn evict(&self, _id: i64) {
            self.evicted.fetch_add(1, Ordering::SeqCst);
        }

        fn purge_expired(&self) -> usize {
            0
        }
    }

    fn pet(id: i64) -> Pet {
        Pet {
            id,
            category: PetCategory {
                id: 1,
                name: "cats".into(),
            },
            name: format!("pet-{id}"),
        }
    }

    fn service(catalog: Arc<dyn PetSink>) -> IngestService {
        let cache = Arc::new(PetCache::new(60, Arc::new(ManualClock::default())));
        IngestService::new(cache, catalog)
    }

    fn failures(result: Result<SaveOutcome, PollerError>) -> Vec<SinkFailure> {
        match result {
            Err(PollerError::Save(failures)) => failures,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_save_is_skipped() {
        let catalog = CountingSink::new(Outcome::Ok);
        let ingest = service(catalog.clone());

        assert_eq!(ingest.save(&pet(1)).await.unwrap(), SaveOutcome::Written);
        assert_eq!(ingest.save(&pet(1)).await.unwrap(), SaveOutcome::Skipped);
        assert_eq!(catalog.calls(), 1);
        assert!(ingest.cache().get_by_id(1).is_some());
    }

    #[tokio::test]
    async fn transient_catalog_failure_is_evicted_and_retried() {
        let catalog = CountingSink::new(Outcome::Unavailable);
        let ingest = service(catalog.clone());

        let failures = failures(ingest.save(&pet(2)).await);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source, SinkSource::Catalog);
        assert!(failures[0].retryable);
        assert!(ingest.cache().get_by_id(2).is_none());

        assert!(ingest.save(&pet(2)).await.is_err());
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn rejected_pet_stays_cached() {
        let catalog = CountingSink::new(Outcome::Rejected);
        let ingest = service(catalog.clone());

        let failures = failures(ingest.save(&pet(4)).await);
        assert_eq!(failures.len(), 1);
        assert!(!failures[0].retryable);
        assert!(ingest.cache().get_by_id(4).is_some());

        assert_eq!(ingest.save(&pet(4)).await.unwrap(), SaveOutcome::Skipped);
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn cache_failure_is_reported_when_catalog_succeeds() {
        let cache = Arc::new(BrokenCache {
            evicted: AtomicUsize::new(0),
        });
        let catalog = CountingSink::new(Outcome::Ok);
        let ingest = IngestService::new(cache.clone(), catalog.clone());

        let err = ingest.save(&pet(5)).await.unwrap_err();
        assert!(err.to_string().contains("cache: "), "{err}");
        let PollerError::Save(failures) = err else {
            panic!("expected a save error");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source, SinkSource::Cache);
        assert_eq!(catalog.calls(), 1);
        assert_eq!(cache.evicted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn both_sinks_failing_reports_both() {
        let cache = Arc::new(BrokenCache {
            evicted: AtomicUsize::new(0),
        });
        let ingest = IngestService::new(cache.clone(), CountingSink::new(Outcome::Unavailable));

        let mut sources: Vec<_> = failures(ingest.save(&pet(6)).await)
            .into_iter()
            .map(|f| f.source)
            .collect();
        sources.sort_by_key(|s| s.to_string());
        assert_eq!(sources, [SinkSource::Cache, SinkSource::Catalog]);
        assert_eq!(cache.evicted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_sink_counts_as_failure() {
        let ingest = service(Arc::new(PanickingSink));

        let err = ingest.save(&pet(3)).await.unwrap_err();
        assert!(err.to_string().contains("catalog"), "{err}");
        assert!(!err.is_transient());
    }
}
