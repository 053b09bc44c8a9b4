use crate::aggregate::{QueryResult, Statistic};
use crate::options::ResultCacheConfig;
use crate::rowset::RowSet;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub statistic: Statistic,
    pub rows: RowSet,
}

impl CacheKey {
    pub fn new(statistic: Statistic, rows: RowSet) -> Self {
        Self { statistic, rows }
    }
}

struct CacheState {
    // `None` when caching is disabled.
    entries: Option<LruCache<CacheKey, QueryResult>>,
    stats: CacheStats,
}

/// Bounded LRU memo of formatted statistic results.
///
/// The map and its recency order live in one `LruCache` behind one lock, so a lookup promotes
/// its entry and an insert evicts the LRU entry as single steps.
pub struct ResultCache {
    state: Mutex<CacheState>,
}

impl ResultCache {
    pub fn new(config: ResultCacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: NonZeroUsize::new(config.max_entries).map(LruCache::new),
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().expect("result cache poisoned")
    }

    /// Return the cached result for `key`, or run `compute` and cache its result.
    ///
    /// `compute` runs without the lock held; errors are returned and not cached.
    pub fn get_or_compute<E>(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<QueryResult, E>,
    ) -> Result<QueryResult, E> {
        let mut state = self.lock();
        if let Some(hit) = state.entries.as_mut().and_then(|e| e.get(&key)).cloned() {
            state.stats.hits += 1;
            log::debug!("result cache hit: {} over {} rows", key.statistic.name(), key.rows.len());
            return Ok(hit);
        }
        state.stats.misses += 1;
        drop(state);

        let value = compute()?;

        let mut state = self.lock();
        let state = &mut *state;
        if let Some(entries) = state.entries.as_mut() {
            // `push` also hands back the old value when another caller raced us to this key.
            if let Some((evicted, _)) = entries.push(key.clone(), value.clone()) {
                if evicted != key {
                    state.stats.evictions += 1;
                    log::debug!(
                        "result cache evicted {} over {} rows",
                        evicted.statistic.name(),
                        evicted.rows.len()
                    );
                }
            }
        }
        Ok(value)
    }

    /// Whether `key` is cached, without touching its recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock()
            .entries
            .as_ref()
            .is_some_and(|e| e.contains(key))
    }

    /// Cached keys, most recently used first.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.lock()
            .entries
            .as_ref()
            .map(|e| e.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}
