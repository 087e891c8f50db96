//! Named in-process cache entries with explicit expiry.
//!
//! Each entry stores `(value, expiry)`. An expired entry is treated as absent
//! and replaced by the next rebuild. Callers pass `now` in so expiry can be
//! tested without sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a cache entry stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Valid until the process exits or the entry is invalidated.
    Lifetime,
    For(Duration),
}

impl Ttl {
    pub fn secs(secs: u64) -> Self {
        Ttl::For(Duration::from_secs(secs))
    }

    fn expiry(self, now: Instant) -> Option<Instant> {
        match self {
            Ttl::Lifetime => None,
            Ttl::For(d) => Some(now + d),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live value for `name`, if any.
    pub fn get(&self, name: &str, now: Instant) -> Option<V> {
        self.entries
            .get(name)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    pub fn insert(&mut self, name: &str, value: V, ttl: Ttl, now: Instant) {
        self.entries.insert(
            name.to_string(),
            CacheEntry {
                value,
                expires_at: ttl.expiry(now),
            },
        );
    }

    /// Return the live value for `name`, or rebuild it with `build`.
    ///
    /// A failed rebuild leaves the cache untouched and returns the error.
    pub fn get_or_try_insert_with<E, F>(
        &mut self,
        name: &str,
        ttl: Ttl,
        now: Instant,
        build: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(v) = self.get(name, now) {
            return Ok(v);
        }
        let value = build()?;
        self.insert(name, value.clone(), ttl, now);
        Ok(value)
    }

    /// Drop an entry. Returns true if one was present.
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
