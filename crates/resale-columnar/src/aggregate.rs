use crate::error::QueryError;
use crate::parallel;
use crate::store::ColumnStore;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The aggregate functions the engine can compute over the price column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Statistic {
    MinimumPrice,
    AveragePrice,
    /// Population standard deviation of the price.
    StandardDeviation,
    MinPricePerSqm,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::MinimumPrice,
        Statistic::AveragePrice,
        Statistic::StandardDeviation,
        Statistic::MinPricePerSqm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statistic::MinimumPrice => "MINIMUM_PRICE",
            Statistic::AveragePrice => "AVERAGE_PRICE",
            Statistic::StandardDeviation => "STANDARD_DEVIATION",
            Statistic::MinPricePerSqm => "MIN_PRICE_PER_SQM",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Statistic::MinimumPrice => "Minimum Price",
            Statistic::AveragePrice => "Average Price",
            Statistic::StandardDeviation => "Standard Deviation of Price",
            Statistic::MinPricePerSqm => "Minimum Price per Square Meter",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Statistic {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Statistic::ALL
            .into_iter()
            .find(|stat| stat.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownStatistic(s.to_owned()))
    }
}

/// A formatted statistic: a number with two decimals, or [`QueryResult::NO_RESULT`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryResult(Arc<str>);

impl QueryResult {
    pub const NO_RESULT: &'static str = "No result";

    pub fn no_result() -> Self {
        Self(Arc::from(Self::NO_RESULT))
    }

    pub fn from_value(value: f64) -> Self {
        Self(Arc::from(format!("{value:.2}")))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_no_result(&self) -> bool {
        &*self.0 == Self::NO_RESULT
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Fold the chunk buckets in order on the calling thread.
    Sequential,
    /// Fold the chunk buckets across the worker pool.
    Parallel,
}

/// Selected local offsets within one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChunkBucket {
    pub(crate) chunk: usize,
    pub(crate) offsets: Vec<usize>,
}

/// Group global rows by chunk, preserving the order of rows within each chunk.
pub(crate) fn bucket_rows(rows: &[usize], chunk_rows: usize) -> Vec<ChunkBucket> {
    let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &row in rows {
        buckets
            .entry(row / chunk_rows)
            .or_default()
            .push(row % chunk_rows);
    }
    buckets
        .into_iter()
        .map(|(chunk, offsets)| ChunkBucket { chunk, offsets })
        .collect()
}

#[derive(Clone, Copy, Debug, Default)]
struct Sum {
    total: f64,
    count: usize,
}

impl Sum {
    fn merge(self, other: Sum) -> Sum {
        Sum {
            total: self.total + other.total,
            count: self.count + other.count,
        }
    }
}

/// Computes [`Statistic`]s over row sets of one store.
pub struct Aggregator<'a> {
    store: &'a ColumnStore,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a ColumnStore) -> Self {
        Self { store }
    }

    /// Format `statistic` over `rows`. An empty row set yields [`QueryResult::no_result`].
    pub fn compute(
        &self,
        rows: &[usize],
        statistic: Statistic,
        mode: ExecutionMode,
    ) -> Result<QueryResult, QueryError> {
        Ok(match self.compute_value(rows, statistic, mode)? {
            Some(value) => QueryResult::from_value(value),
            None => QueryResult::no_result(),
        })
    }

    /// The unformatted value, or `None` for an empty row set.
    pub fn compute_value(
        &self,
        rows: &[usize],
        statistic: Statistic,
        mode: ExecutionMode,
    ) -> Result<Option<f64>, QueryError> {
        let total_rows = self.store.total_rows();
        if let Some(&row) = rows.iter().find(|&&row| row >= total_rows) {
            return Err(QueryError::RowOutOfBounds { row, total_rows });
        }
        if rows.is_empty() {
            return Ok(None);
        }

        let buckets = bucket_rows(rows, self.store.chunk_rows());
        log::debug!(
            "{} over {} rows in {} chunk buckets ({:?})",
            statistic.name(),
            rows.len(),
            buckets.len(),
            mode
        );

        let prices = self.store.price_chunks();
        let areas = self.store.area_chunks();
        let value = match statistic {
            Statistic::MinimumPrice => fold(&buckets, mode, f64::INFINITY, f64::min, |b| {
                let chunk = &prices[b.chunk];
                b.offsets.iter().map(|&o| chunk[o]).fold(f64::INFINITY, f64::min)
            }),
            Statistic::AveragePrice => mean(&buckets, mode, prices),
            Statistic::StandardDeviation => {
                let avg = mean(&buckets, mode, prices);
                let squares = fold(&buckets, mode, Sum::default(), Sum::merge, |b| {
                    let chunk = &prices[b.chunk];
                    Sum {
                        total: b
                            .offsets
                            .iter()
                            .map(|&o| {
                                let diff = chunk[o] - avg;
                                diff * diff
                            })
                            .sum(),
                        count: b.offsets.len(),
                    }
                });
                (squares.total / squares.count as f64).sqrt()
            }
            Statistic::MinPricePerSqm => fold(&buckets, mode, f64::INFINITY, f64::min, |b| {
                let (price, area) = (&prices[b.chunk], &areas[b.chunk]);
                b.offsets
                    .iter()
                    .map(|&o| price[o] / area[o])
                    .fold(f64::INFINITY, f64::min)
            }),
        };
        Ok(Some(value))
    }
}

fn mean(buckets: &[ChunkBucket], mode: ExecutionMode, prices: &[Vec<f64>]) -> f64 {
    let sum = fold(buckets, mode, Sum::default(), Sum::merge, |b| {
        let chunk = &prices[b.chunk];
        Sum {
            total: b.offsets.iter().map(|&o| chunk[o]).sum(),
            count: b.offsets.len(),
        }
    });
    sum.total / sum.count as f64
}

/// Map each bucket to a partial result and combine them with an associative `reduce`.
///
/// Both modes run the same `map`/`reduce`; only the partitioning of buckets across threads
/// differs.
fn fold<T, M, R>(buckets: &[ChunkBucket], mode: ExecutionMode, identity: T, reduce: R, map: M) -> T
where
    T: Copy + Send + Sync,
    M: Fn(&ChunkBucket) -> T + Sync + Send,
    R: Fn(T, T) -> T + Sync + Send,
{
    match mode {
        ExecutionMode::Sequential => buckets.iter().map(map).fold(identity, reduce),
        ExecutionMode::Parallel => parallel::map_reduce(buckets, identity, map, reduce),
    }
}
