//! Cache store implementations.

use super::key::Fingerprint;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// Associative storage from [`Fingerprint`] to a previously produced value.
///
/// Implementations signal backend failures with [`Error::StoreUnavailable`];
/// an absent key is never an error. After `put` returns `Ok`, `contains`
/// must report the key and `get` must return a value equal to the one stored.
#[async_trait]
pub trait CacheStore<V>: Send + Sync {
    /// Whether `fingerprint` has a stored value; `Ok(false)` when absent.
    async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool>;
    /// The stored value, or `Ok(None)` when absent.
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<V>>;
    /// Stores `value`, inserting an absent key or overwriting an existing one.
    async fn put(&self, fingerprint: &Fingerprint, value: V) -> Result<()>;

    /// Label used in logs and store errors.
    fn name(&self) -> &'static str {
        "custom"
    }
}

#[async_trait]
impl<V, S> CacheStore<V> for Arc<S>
where
    V: Send + 'static,
    S: CacheStore<V> + ?Sized,
{
    async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool> {
        (**self).contains(fingerprint).await
    }
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<V>> {
        (**self).get(fingerprint).await
    }
    async fn put(&self, fingerprint: &Fingerprint, value: V) -> Result<()> {
        (**self).put(fingerprint, value).await
    }
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

fn poisoned(store: &'static str) -> Error {
    Error::store_unavailable(store, "lock poisoned")
}

/// Unbounded in-process store. Values are kept as-is and cloned out on `get`.
///
/// Each operation is individually synchronized; a `contains`/`get`/`put`
/// sequence is not atomic.
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(|_| poisoned("memory"))?.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let entries = self.entries.read().map_err(|_| poisoned("memory"))?;
        Ok(entries.contains_key(fingerprint.as_str()))
    }
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<V>> {
        let entries = self.entries.read().map_err(|_| poisoned("memory"))?;
        Ok(entries.get(fingerprint.as_str()).cloned())
    }
    async fn put(&self, fingerprint: &Fingerprint, value: V) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| poisoned("memory"))?
            .insert(fingerprint.as_str().to_string(), value);
        Ok(())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

/// In-process store that keeps values as serialized JSON.
///
/// Every hit is a fresh deserialization, so callers never share state with
/// what was stored.
pub struct JsonMemoryStore<V> {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    _value: PhantomData<fn() -> V>,
}

impl<V> JsonMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            _value: PhantomData,
        }
    }

    /// Size in bytes of the encoded entry, if present.
    pub fn encoded_len(&self, fingerprint: &Fingerprint) -> Result<Option<usize>> {
        let entries = self.entries.read().map_err(|_| poisoned("json_memory"))?;
        Ok(entries.get(fingerprint.as_str()).map(Vec::len))
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .map_err(|_| poisoned("json_memory"))?
            .len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<V> Default for JsonMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheStore<V> for JsonMemoryStore<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let entries = self.entries.read().map_err(|_| poisoned("json_memory"))?;
        Ok(entries.contains_key(fingerprint.as_str()))
    }
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<V>> {
        let entries = self.entries.read().map_err(|_| poisoned("json_memory"))?;
        match entries.get(fingerprint.as_str()) {
            Some(data) => Ok(Some(serde_json::from_slice(data)?)),
            None => Ok(None),
        }
    }
    async fn put(&self, fingerprint: &Fingerprint, value: V) -> Result<()> {
        let data = serde_json::to_vec(&value)?;
        self.entries
            .write()
            .map_err(|_| poisoned("json_memory"))?
            .insert(fingerprint.as_str().to_string(), data);
        Ok(())
    }
    fn name(&self) -> &'static str {
        "json_memory"
    }
}
