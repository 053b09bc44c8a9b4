use crate::aggregate::{Aggregator, ExecutionMode, QueryResult, Statistic};
use crate::cache::{CacheKey, CacheStats, ResultCache};
use crate::error::QueryError;
use crate::filter::{FilterQuery, QueryFilter};
use crate::index::Indexes;
use crate::rowset::RowSet;
use crate::store::ColumnStore;

/// A loaded store, its indexes and the shared result cache.
///
/// Construction builds the indexes exactly once; afterwards every method takes `&self`, so one
/// engine can serve concurrent callers.
pub struct QueryEngine {
    store: ColumnStore,
    indexes: Indexes,
    cache: ResultCache,
}

impl QueryEngine {
    pub fn new(store: ColumnStore) -> Self {
        let indexes = Indexes::build(&store);
        let cache = ResultCache::new(store.options().cache);
        Self {
            store,
            indexes,
            cache,
        }
    }

    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    pub fn indexes(&self) -> &Indexes {
        &self.indexes
    }

    pub fn total_rows(&self) -> usize {
        self.store.total_rows()
    }

    pub fn is_compressed(&self) -> bool {
        self.store.is_compressed()
    }

    pub fn uses_memory_mapping(&self) -> bool {
        self.store.uses_memory_mapping()
    }

    /// Rows of `town` sold between `start_month` and `end_month` (inclusive, `YYYY-MM`) with a
    /// floor area of at least `min_area`.
    pub fn filter(
        &self,
        town: &str,
        start_month: &str,
        end_month: &str,
        min_area: f64,
    ) -> Result<RowSet, QueryError> {
        self.filter_query(&FilterQuery {
            town,
            start_month,
            end_month,
            min_area,
        })
    }

    pub fn filter_query(&self, query: &FilterQuery<'_>) -> Result<RowSet, QueryError> {
        QueryFilter::new(&self.store, &self.indexes, self.store.options().area_filter)
            .matching_rows(query)
    }

    /// Compute `statistic` over `rows`, memoized in the result cache.
    pub fn aggregate(
        &self,
        rows: &RowSet,
        statistic: Statistic,
    ) -> Result<QueryResult, QueryError> {
        let key = CacheKey::new(statistic, rows.clone());
        self.cache.get_or_compute(key, || {
            Aggregator::new(&self.store).compute(rows, statistic, self.execution_mode(rows.len()))
        })
    }

    /// Compute `statistic` with an explicit execution mode, bypassing the cache.
    pub fn aggregate_with_mode(
        &self,
        rows: &[usize],
        statistic: Statistic,
        mode: ExecutionMode,
    ) -> Result<QueryResult, QueryError> {
        Aggregator::new(&self.store).compute(rows, statistic, mode)
    }

    /// Parallel once the selection exceeds the configured threshold.
    pub fn execution_mode(&self, selected_rows: usize) -> ExecutionMode {
        if selected_rows > self.store.options().parallel_threshold {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
