//! In-memory TTL cache for extracted recipes.
//!
//! Pure performance optimization: nothing persists across restarts and a
//! stale read up to the TTL is accepted. Keyed by a hash of the URL string;
//! a collision at this scale just means one harmless stale answer.

use crate::model::RecipeRecord;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Time source, injectable so TTL tests can advance time manually.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    record: RecipeRecord,
    inserted_at: Instant,
}

/// URL-keyed store of previously extracted recipes.
///
/// `get` treats an expired entry as absent and removes it; `set` sweeps
/// expired entries opportunistically so cleanup cost is amortized over
/// writes instead of needing a background task. Entries are never mutated;
/// a re-extraction overwrites.
pub struct RecipeCache {
    entries: RwLock<HashMap<u64, CacheEntry>>,
    ttl: Duration,
    clock: Box<dyn Clock>,
}

impl RecipeCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Box::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn key_of(url: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        hasher.finish()
    }

    pub fn get(&self, url: &str) -> Option<RecipeRecord> {
        let key = Self::key_of(url);
        let now = self.clock.now();

        {
            let entries = self.entries.read().unwrap();
            match entries.get(&key) {
                Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                    debug!("cache hit for {url}");
                    return Some(entry.record.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but is stale; drop it under the write lock.
        debug!("cache entry for {url} expired");
        self.entries.write().unwrap().remove(&key);
        None
    }

    pub fn set(&self, url: &str, record: RecipeRecord) {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, entry| now.duration_since(entry.inserted_at) < self.ttl);
        entries.insert(
            Self::key_of(url),
            CacheEntry {
                record,
                inserted_at: now,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}
