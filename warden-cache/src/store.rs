//! Storage backends for serialized authorization decisions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreResult;

/// Key/value backend holding serialized decision entries with per-key expiry.
///
/// Implementations must be safe to share across tasks. All operations take a
/// shared reference so a single instance can sit behind an `Arc`.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Fetches the value stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key` with the given time-to-live.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Deletes the given keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> StoreResult<u64>;

    /// Returns all live keys matching a glob pattern (`*` and `?` wildcards).
    async fn scan(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// Fetches several keys in one call, preserving order and per-key misses.
    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// Stores several entries in one call, returning how many were written.
    async fn set_many(&self, entries: &[(String, String, Duration)]) -> StoreResult<u64>;

    /// Reports whether the backend is reachable and serving.
    async fn ping(&self) -> bool;

    /// Number of entries the backend has dropped due to expiry, when tracked.
    async fn evictions(&self) -> u64 {
        0
    }
}

struct StoredEntry {
    value: String,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process [`DecisionStore`] backed by a `HashMap` with lazy expiry.
///
/// The reference backend for single-node deployments and tests. Expired
/// entries are dropped when a read or scan touches them.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    evicted: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries at all.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every expired entry immediately instead of waiting for reads.
    pub async fn purge_expired(&self) -> u64 {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = (before - entries.len()) as u64;
        self.evicted.fetch_add(purged, Ordering::Relaxed);
        purged
    }
}

#[async_trait]
impl DecisionStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // The entry expired; take the write lock to evict it.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let entry = StoredEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn scan(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .map(|key| match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
                _ => None,
            })
            .collect())
    }

    async fn set_many(&self, batch: &[(String, String, Duration)]) -> StoreResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        for (key, value, ttl) in batch {
            entries.insert(
                key.clone(),
                StoredEntry {
                    value: value.clone(),
                    expires_at: now + *ttl,
                },
            );
        }
        Ok(batch.len() as u64)
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn evictions(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

/// Matches `key` against a glob `pattern` supporting `*` and `?`.
fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    glob_match_at(&pattern, &key)
}

fn glob_match_at(pattern: &[char], key: &[char]) -> bool {
    match pattern.first() {
        None => key.is_empty(),
        Some('*') => {
            (0..=key.len()).any(|skip| glob_match_at(&pattern[1..], &key[skip..]))
        }
        Some('?') => !key.is_empty() && glob_match_at(&pattern[1..], &key[1..]),
        Some(ch) => key.first() == Some(ch) && glob_match_at(&pattern[1..], &key[1..]),
    }
}
