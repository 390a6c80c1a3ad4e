//! In-memory typed cache with per-entry expiry, used by the poller to
//! remember which pets it has already written.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    clock::Clock,
    poller::{
        models::{Pet, SinkSource},
        PetCacheSink, PetSink, PollerError,
    },
};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// A live entry is already stored under the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("entry already present")]
pub struct Occupied;

pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Get a value if it exists and has not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Insert unless a live entry already holds the key. An expired entry is
    /// replaced.
    pub fn insert_new(&self, key: K, value: V) -> Result<(), Occupied> {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        if entries.get(&key).is_some_and(|entry| now < entry.expires_at) {
            return Err(Occupied);
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.remove(key).map(|entry| entry.value)
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.values().filter(|entry| now < entry.expires_at).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Local mirror of ingested pets, keyed by pet id.
pub struct PetCache {
    pets: TtlCache<i64, Pet>,
}

impl PetCache {
    pub fn new(ttl_minutes: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            pets: TtlCache::new(Duration::minutes(ttl_minutes), clock),
        }
    }

    pub fn len(&self) -> usize {
        self.pets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pets.is_empty()
    }
}

#[async_trait]
impl PetSink for PetCache {
    async fn create(&self, pet: &Pet) -> Result<i64, PollerError> {
        self.pets
            .insert_new(pet.id, pet.clone())
            .map_err(|_| PollerError::Sink {
                sink: SinkSource::Cache,
                message: format!("pet {} already cached", pet.id),
            })?;
        Ok(pet.id)
    }
}

impl PetCacheSink for PetCache {
    fn get_by_id(&self, id: i64) -> Option<Pet> {
        self.pets.get(&id)
    }

    fn evict(&self, id: i64) {
        self.pets.remove(&id);
    }

    fn purge_expired(&self) -> usize {
        self.pets.purge_expired()
    }
}
