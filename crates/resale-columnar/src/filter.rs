use crate::bitmap::BitVec;
use crate::error::QueryError;
use crate::index::Indexes;
use crate::options::AreaFilterMode;
use crate::record::YearMonth;
use crate::rowset::RowSet;
use crate::store::ColumnStore;

/// The one supported filter shape: town equality, inclusive month range, minimum floor area.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterQuery<'a> {
    pub town: &'a str,
    pub start_month: &'a str,
    pub end_month: &'a str,
    pub min_area: f64,
}

/// Evaluates [`FilterQuery`]s against the bitmap indexes of a store.
pub struct QueryFilter<'a> {
    store: &'a ColumnStore,
    indexes: &'a Indexes,
    area_mode: AreaFilterMode,
}

impl<'a> QueryFilter<'a> {
    pub fn new(store: &'a ColumnStore, indexes: &'a Indexes, area_mode: AreaFilterMode) -> Self {
        Self {
            store,
            indexes,
            area_mode,
        }
    }

    /// Ascending global row indices matching `query`.
    ///
    /// An unknown town is an empty result, checked before the month bounds are parsed.
    pub fn matching_rows(&self, query: &FilterQuery<'_>) -> Result<RowSet, QueryError> {
        let Some(town_rows) = self.indexes.town(query.town) else {
            return Ok(RowSet::empty());
        };

        let start = parse_month(query.start_month)?;
        let end = parse_month(query.end_month)?;
        if query.min_area.is_nan() {
            return Err(QueryError::InvalidArea(query.min_area));
        }

        let mut result = town_rows.clone();
        result.and_inplace(&self.month_range(start, end));
        if result.count_ones() > 0 {
            self.apply_min_area(&mut result, query.min_area);
        }

        Ok(result.iter_ones().collect())
    }

    /// All rows, minus the rows of every indexed month outside `[start, end]`.
    fn month_range(&self, start: YearMonth, end: YearMonth) -> BitVec {
        let mut in_range = BitVec::with_len_all_true(self.store.total_rows());
        for entry in self.indexes.months() {
            if entry.month < start || entry.month > end {
                in_range.and_not_inplace(&entry.rows);
            }
        }
        in_range
    }

    fn apply_min_area(&self, result: &mut BitVec, min_area: f64) {
        match self.indexes.area_floor(min_area) {
            Some((threshold, at_least)) => {
                result.and_inplace(at_least);
                // The floor bitmap is `area >= threshold`; rows in [threshold, min_area) remain.
                if threshold < min_area && self.area_mode == AreaFilterMode::Exact {
                    self.clear_below(result, min_area);
                }
            }
            None => self.scan_clear_below(result, min_area),
        }
    }

    /// Refine an already-narrowed result by visiting only its selected rows.
    fn clear_below(&self, result: &mut BitVec, min_area: f64) {
        let chunk_rows = self.store.chunk_rows();
        let areas = self.store.area_chunks();
        let below: Vec<usize> = result
            .iter_ones()
            .filter(|&row| areas[row / chunk_rows][row % chunk_rows] < min_area)
            .collect();
        for row in below {
            result.set(row, false);
        }
    }

    /// Full scan of the area column, used when `min_area` is below every indexed threshold.
    fn scan_clear_below(&self, result: &mut BitVec, min_area: f64) {
        let chunk_rows = self.store.chunk_rows();
        for (chunk_idx, chunk) in self.store.area_chunks().iter().enumerate() {
            let base = chunk_idx * chunk_rows;
            for (offset, area) in chunk.iter().enumerate() {
                if *area < min_area {
                    result.set(base + offset, false);
                }
            }
        }
    }
}

fn parse_month(value: &str) -> Result<YearMonth, QueryError> {
    value
        .trim()
        .parse()
        .map_err(|_| QueryError::InvalidMonth(value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::StoreOptions;
    use crate::record::SaleRecord;

    fn fixture(mode: AreaFilterMode) -> (ColumnStore, Indexes, AreaFilterMode) {
        let rows = vec![
            SaleRecord::new("2022-01", "TAMPINES", 90.0, 500_000.0),
            SaleRecord::new("2022-01", "TAMPINES", 95.0, 600_000.0),
            SaleRecord::new("2022-02", "TAMPINES", 100.0, 650_000.0),
            SaleRecord::new("2022-01", "BEDOK", 90.0, 400_000.0),
            SaleRecord::new("2022-03", "TAMPINES", 55.0, 300_000.0),
        ];
        let options = StoreOptions {
            chunk_rows: 2,
            ..StoreOptions::default()
        };
        let store = ColumnStore::ingest(options, rows.into_iter().map(Ok)).unwrap();
        let indexes = Indexes::build(&store);
        (store, indexes, mode)
    }

    fn run(fx: &(ColumnStore, Indexes, AreaFilterMode), q: FilterQuery<'_>) -> Vec<usize> {
        QueryFilter::new(&fx.0, &fx.1, fx.2)
            .matching_rows(&q)
            .unwrap()
            .to_vec()
    }

    fn query<'a>(town: &'a str, start: &'a str, end: &'a str, min_area: f64) -> FilterQuery<'a> {
        FilterQuery {
            town,
            start_month: start,
            end_month: end,
            min_area,
        }
    }

    #[test]
    fn unknown_town_short_circuits_before_month_parsing() {
        let fx = fixture(AreaFilterMode::Exact);
        let rows = QueryFilter::new(&fx.0, &fx.1, fx.2)
            .matching_rows(&query("CLEMENTI", "garbage", "garbage", 80.0))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn malformed_month_is_an_error() {
        let fx = fixture(AreaFilterMode::Exact);
        let err = QueryFilter::new(&fx.0, &fx.1, fx.2)
            .matching_rows(&query("TAMPINES", "2022-1", "2022-02", 80.0))
            .unwrap_err();
        assert_eq!(err, QueryError::InvalidMonth("2022-1".to_owned()));
    }

    #[test]
    fn month_range_is_inclusive() {
        let fx = fixture(AreaFilterMode::Exact);
        assert_eq!(run(&fx, query("TAMPINES", "2022-01", "2022-02", 80.0)), vec![0, 1, 2]);
        assert_eq!(run(&fx, query("TAMPINES", "2022-02", "2022-03", 0.0)), vec![2, 4]);
        assert!(run(&fx, query("TAMPINES", "2022-03", "2022-01", 0.0)).is_empty());
    }

    #[test]
    fn area_below_every_threshold_scans() {
        let fx = fixture(AreaFilterMode::Exact);
        assert_eq!(run(&fx, query("TAMPINES", "2022-01", "2022-03", 56.0)), vec![0, 1, 2]);
        assert_eq!(run(&fx, query("TAMPINES", "2022-01", "2022-03", 55.0)), vec![0, 1, 2, 4]);
    }

    #[test]
    fn misaligned_min_area_differs_between_modes() {
        // 92 floors to the 90 threshold, which still admits the 90 sqm row.
        let exact = fixture(AreaFilterMode::Exact);
        let coarse = fixture(AreaFilterMode::ThresholdFloor);
        assert_eq!(run(&exact, query("TAMPINES", "2022-01", "2022-02", 92.0)), vec![1, 2]);
        assert_eq!(run(&coarse, query("TAMPINES", "2022-01", "2022-02", 92.0)), vec![0, 1, 2]);

        // Aligned with an indexed threshold, both modes agree.
        assert_eq!(run(&exact, query("TAMPINES", "2022-01", "2022-02", 100.0)), vec![2]);
        assert_eq!(run(&coarse, query("TAMPINES", "2022-01", "2022-02", 100.0)), vec![2]);
    }
}
