//! Read-through orchestration.

use super::backend::{CacheStore, MemoryStore};
use super::flight::InFlight;
use super::key::{Fingerprint, FingerprintGenerator};
use super::producer::{Identity, Normalizer, Producer};
use crate::{Error, Result};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct ReadThroughConfig {
    /// Prefix for every fingerprint, so caches can share one store.
    pub namespace: Option<String>,
    /// Serialize overlapping calls for the same fingerprint so the producer
    /// runs once per burst instead of once per caller.
    pub single_flight: bool,
}

impl ReadThroughConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    fn fingerprint_generator(&self) -> FingerprintGenerator {
        match self.namespace {
            Some(ref ns) => FingerprintGenerator::new().with_namespace(ns.clone()),
            None => FingerprintGenerator::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadThroughStats {
    pub hits: u64,
    pub misses: u64,
    pub producer_calls: u64,
    pub producer_failures: u64,
    pub store_errors: u64,
    /// Calls that waited on another in-flight call for the same fingerprint.
    pub joined: u64,
}

impl ReadThroughStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    producer_calls: AtomicU64,
    producer_failures: AtomicU64,
    store_errors: AtomicU64,
    joined: AtomicU64,
}

impl AtomicStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
    fn to_stats(&self) -> ReadThroughStats {
        ReadThroughStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            producer_calls: self.producer_calls.load(Ordering::Relaxed),
            producer_failures: self.producer_failures.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
        }
    }
}

/// The three collaborators of a [`ReadThrough`], as one value.
pub struct ReadThroughParts<P, N, S> {
    pub producer: P,
    pub normalizer: N,
    pub store: S,
}

/// Read-through memoization in front of a [`Producer`].
///
/// Each call normalizes the request, fingerprints the normalized form, and
/// serves the stored value on a hit. On a miss the producer runs with the
/// original request, its result is stored, and the value is re-read from the
/// store before being returned, so callers always see what the store holds.
///
/// Producer errors are returned unchanged and never cached. Store and
/// fingerprinting failures reach the caller through `P::Error: From<Error>`.
///
/// Overlapping calls for the same fingerprint each miss and each run the
/// producer unless [`ReadThroughConfig::single_flight`] is enabled.
pub struct ReadThrough<Req, V, P, N = Identity, S = MemoryStore<V>> {
    producer: P,
    normalizer: N,
    store: S,
    config: ReadThroughConfig,
    fingerprints: FingerprintGenerator,
    in_flight: InFlight,
    stats: AtomicStats,
    _types: PhantomData<fn(Req) -> V>,
}

impl<Req, V, P> ReadThrough<Req, V, P, Identity, MemoryStore<V>> {
    /// Cache `producer` with the identity normalizer and a fresh memory store.
    pub fn new(producer: P) -> Self {
        Self::from_parts(ReadThroughParts {
            producer,
            normalizer: Identity,
            store: MemoryStore::new(),
        })
    }
}

impl<Req, V, P, N, S> ReadThrough<Req, V, P, N, S> {
    pub fn from_parts(parts: ReadThroughParts<P, N, S>) -> Self {
        let config = ReadThroughConfig::default();
        Self {
            producer: parts.producer,
            normalizer: parts.normalizer,
            store: parts.store,
            fingerprints: config.fingerprint_generator(),
            config,
            in_flight: InFlight::new(),
            stats: AtomicStats::default(),
            _types: PhantomData,
        }
    }

    pub fn with_normalizer<N2>(self, normalizer: N2) -> ReadThrough<Req, V, P, N2, S> {
        ReadThrough {
            producer: self.producer,
            normalizer,
            store: self.store,
            config: self.config,
            fingerprints: self.fingerprints,
            in_flight: self.in_flight,
            stats: self.stats,
            _types: PhantomData,
        }
    }

    pub fn with_store<S2>(self, store: S2) -> ReadThrough<Req, V, P, N, S2> {
        ReadThrough {
            producer: self.producer,
            normalizer: self.normalizer,
            store,
            config: self.config,
            fingerprints: self.fingerprints,
            in_flight: self.in_flight,
            stats: self.stats,
            _types: PhantomData,
        }
    }

    pub fn with_config(mut self, config: ReadThroughConfig) -> Self {
        self.fingerprints = config.fingerprint_generator();
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReadThroughConfig {
        &self.config
    }
    pub fn store(&self) -> &S {
        &self.store
    }
    pub fn stats(&self) -> ReadThroughStats {
        self.stats.to_stats()
    }
}

impl<Req, V, P, N, S> ReadThrough<Req, V, P, N, S>
where
    P: Producer<Req, V>,
    P::Error: From<Error>,
    N: Normalizer<Req>,
    S: CacheStore<V>,
{
    /// Normalize and fingerprint `request` without touching the store.
    pub fn fingerprint_of(&self, request: &Req) -> Result<Fingerprint> {
        let normalized = self.normalizer.normalize(request);
        self.fingerprints.fingerprint(&normalized)
    }

    pub async fn read_through(&self, request: Req) -> std::result::Result<V, P::Error> {
        let fingerprint = self.fingerprint_of(&request)?;
        if !self.config.single_flight {
            return self.lookup_or_produce(&fingerprint, request).await;
        }

        let slot = self.in_flight.enter(&fingerprint);
        let _guard = match slot.gate().try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                AtomicStats::bump(&self.stats.joined);
                debug!(%fingerprint, "joining in-flight computation");
                slot.gate().lock().await
            }
        };
        let result = self.lookup_or_produce(&fingerprint, request).await;
        result
    }

    async fn lookup_or_produce(
        &self,
        fingerprint: &Fingerprint,
        request: Req,
    ) -> std::result::Result<V, P::Error> {
        let store = self.store.name();
        if self.observe(self.store.contains(fingerprint).await)? {
            AtomicStats::bump(&self.stats.hits);
            debug!(%fingerprint, store, "cache hit");
            return Ok(self.fetch(fingerprint).await?);
        }

        AtomicStats::bump(&self.stats.misses);
        AtomicStats::bump(&self.stats.producer_calls);
        debug!(%fingerprint, store, "cache miss");
        let value = match self.producer.produce(request).await {
            Ok(value) => value,
            Err(e) => {
                AtomicStats::bump(&self.stats.producer_failures);
                warn!(%fingerprint, "producer failed, nothing cached");
                return Err(e);
            }
        };

        self.observe(self.store.put(fingerprint, value).await)?;
        Ok(self.fetch(fingerprint).await?)
    }

    async fn fetch(&self, fingerprint: &Fingerprint) -> Result<V> {
        match self.observe(self.store.get(fingerprint).await)? {
            Some(value) => Ok(value),
            None => self.observe(Err(Error::missing_entry(
                self.store.name(),
                fingerprint.as_str(),
            ))),
        }
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            AtomicStats::bump(&self.stats.store_errors);
            warn!(store = self.store.name(), error = %e, "cache store operation failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    /// Claims every key exists but never returns a value.
    struct PhantomHitStore;

    #[async_trait]
    impl CacheStore<String> for PhantomHitStore {
        async fn contains(&self, _: &Fingerprint) -> Result<bool> {
            Ok(true)
        }
        async fn get(&self, _: &Fingerprint) -> Result<Option<String>> {
            Ok(None)
        }
        async fn put(&self, _: &Fingerprint, _: String) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &'static str {
            "phantom"
        }
    }

    #[test]
    fn test_config_builder() {
        let config = ReadThroughConfig::new()
            .with_namespace("users")
            .with_single_flight(true);
        assert_eq!(config.namespace.as_deref(), Some("users"));
        assert!(config.single_flight);
        assert!(!ReadThroughConfig::default().single_flight);
    }

    #[test]
    fn test_hit_ratio() {
        let stats = ReadThroughStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_ratio(), 0.75);
        assert_eq!(ReadThroughStats::default().hit_ratio(), 0.0);
    }

    #[test]
    fn test_fingerprint_of_uses_namespace() {
        let producer = |_: serde_json::Value| async { Ok::<String, Error>(String::new()) };
        let plain: ReadThrough<serde_json::Value, String, _> = ReadThrough::new(producer);
        let scoped: ReadThrough<serde_json::Value, String, _> = ReadThrough::new(producer)
            .with_config(ReadThroughConfig::new().with_namespace("ns"));

        let request = json!({"q": "rust"});
        let plain_fp = plain.fingerprint_of(&request).unwrap();
        let scoped_fp = scoped.fingerprint_of(&request).unwrap();
        assert_eq!(scoped_fp.as_str(), format!("ns:{}", plain_fp));
    }

    #[tokio::test]
    async fn test_missing_entry_after_contains() {
        let cache: ReadThrough<String, String, _, _, _> =
            ReadThrough::new(|_: String| async { Ok::<String, Error>("hi".into()) })
                .with_store(PhantomHitStore);

        let err = cache.read_through("req".into()).await.unwrap_err();
        assert!(matches!(err, Error::MissingEntry { store: "phantom", .. }));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.producer_calls, 0);
        assert_eq!(stats.store_errors, 1);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache: ReadThrough<u32, u32, _> =
            ReadThrough::new(|n: u32| async move { Ok::<_, Error>(n + 1) });
        assert_eq!(cache.read_through(1).await.unwrap(), 2);
        assert_eq!(cache.read_through(1).await.unwrap(), 2);
        assert_eq!(cache.read_through(2).await.unwrap(), 3);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.producer_calls, 2);
        assert_eq!(cache.store().len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_single_flight_slot_released() {
        let cache: ReadThrough<u32, u32, _> =
            ReadThrough::new(|n: u32| async move { Ok::<_, Error>(n) })
                .with_config(ReadThroughConfig::new().with_single_flight(true));
        cache.read_through(9).await.unwrap();
        assert_eq!(cache.in_flight.len(), 0);
    }
}
