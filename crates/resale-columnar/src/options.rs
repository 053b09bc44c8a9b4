use serde::Deserialize;

/// Area thresholds indexed by default, in square meters.
pub const DEFAULT_AREA_THRESHOLDS: [f64; 7] = [60.0, 70.0, 80.0, 90.0, 100.0, 120.0, 150.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResultCacheConfig {
    /// Maximum number of cached statistic results. `0` disables caching.
    pub max_entries: usize,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self { max_entries: 20 }
    }
}

/// How the minimum-area predicate uses the threshold index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaFilterMode {
    /// Use the floor threshold bitmap as a pre-filter, then drop rows below `min_area`.
    #[default]
    Exact,
    /// Intersect with the floor threshold bitmap only. Rows with an area between the floor
    /// threshold and `min_area` are kept.
    ThresholdFloor,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Rows per column chunk.
    pub chunk_rows: usize,
    pub cache: ResultCacheConfig,
    /// Aggregations over more than this many rows fan out across chunk buckets.
    pub parallel_threshold: usize,
    pub area_thresholds: Vec<f64>,
    pub area_filter: AreaFilterMode,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            chunk_rows: 100_000,
            cache: ResultCacheConfig::default(),
            parallel_threshold: 10_000,
            area_thresholds: DEFAULT_AREA_THRESHOLDS.to_vec(),
            area_filter: AreaFilterMode::default(),
        }
    }
}

impl StoreOptions {
    pub(crate) fn effective_chunk_rows(&self) -> usize {
        self.chunk_rows.max(1)
    }
}
