//! Generic keyed cache with per-entry absolute expiry.
//!
//! An entry is a hit while `now <= expires_at`. Expired entries are never
//! returned; they are removed lazily on the next lookup of their key, or in bulk
//! by [`TtlCache::purge_expired`]. All operations take `&self` and are safe to
//! call from any number of request tasks at once. There is no cross-key
//! atomicity.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::trace;

use warden_core::Clock;

/// Fixed policy default for cached principals: 5 minutes.
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

/// Namespace used for the principal cache unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "userCache";

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

/// Invalidation state of one key, captured before a slow read so the result is
/// only stored if nothing evicted the key meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    evictions: u64,
}

struct Slots<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Per-key eviction counters. Reset by `evict_all`, which bumps `epoch`.
    evictions: HashMap<String, u64>,
    epoch: u64,
}

impl<V> Slots<V> {
    fn generation(&self, key: &str) -> Generation {
        Generation {
            epoch: self.epoch,
            evictions: self.evictions.get(key).copied().unwrap_or(0),
        }
    }
}

pub struct TtlCache<V> {
    namespace: String,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: RwLock<Slots<V>>,
}

impl<V> core::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TtlCache")
            .field("namespace", &self.namespace)
            .field("default_ttl", &self.default_ttl)
            .field("entries", &self.slots.read().entries.len())
            .finish()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(namespace: impl Into<String>, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl,
            clock,
            slots: RwLock::new(Slots {
                entries: HashMap::new(),
                evictions: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();

        {
            let slots = self.slots.read();
            match slots.entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Stale. A concurrent put may have replaced it since the read lock was
        // dropped, so only remove what is still expired.
        let mut slots = self.slots.write();
        if slots.entries.get(key).is_some_and(|e| !e.is_live(now)) {
            slots.entries.remove(key);
            trace!(namespace = %self.namespace, key, "removed expired cache entry");
        }
        None
    }

    /// Store `value` under `key` with the default TTL.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    /// Store `value` with `expires_at = now + ttl`, replacing any existing entry.
    /// Expiry saturates at the representable bounds.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = expiry(self.clock.now(), ttl);
        self.slots
            .write()
            .entries
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Current invalidation state of `key`. Pair with [`TtlCache::put_if_unchanged`].
    pub fn generation(&self, key: &str) -> Generation {
        self.slots.read().generation(key)
    }

    /// Store `value` with the default TTL unless `key` was evicted since
    /// `generation` was taken. Returns whether the value was stored.
    pub fn put_if_unchanged(&self, key: impl Into<String>, generation: Generation, value: V) -> bool {
        let key = key.into();
        let expires_at = expiry(self.clock.now(), self.default_ttl);

        let mut slots = self.slots.write();
        if slots.generation(&key) != generation {
            trace!(namespace = %self.namespace, key = %key, "skipped write for invalidated key");
            return false;
        }
        slots.entries.insert(key, CacheEntry { value, expires_at });
        true
    }

    /// Remove `key`. Returns whether an entry (live or stale) was present.
    pub fn evict(&self, key: &str) -> bool {
        let mut slots = self.slots.write();
        let removed = slots.entries.remove(key).is_some();
        let counter = slots.evictions.entry(key.to_string()).or_insert(0);
        *counter = counter.wrapping_add(1);
        drop(slots);

        if removed {
            trace!(namespace = %self.namespace, key, "evicted cache entry");
        }
        removed
    }

    pub fn evict_all(&self) {
        let mut slots = self.slots.write();
        let dropped = slots.entries.len();
        slots.entries.clear();
        slots.evictions.clear();
        slots.epoch = slots.epoch.wrapping_add(1);
        drop(slots);

        trace!(namespace = %self.namespace, dropped, "evicted all cache entries");
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.write();
        let before = slots.entries.len();
        slots.entries.retain(|_, e| e.is_live(now));
        before - slots.entries.len()
    }

    /// Number of physically stored entries, including ones not yet purged.
    pub fn len(&self) -> usize {
        self.slots.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().entries.is_empty()
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(if ttl < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
