use crate::bitmap::BitVec;
use crate::parallel;
use crate::record::YearMonth;
use crate::store::{CodeChunk, ColumnStore};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Rows of one distinct month.
#[derive(Clone, Debug)]
pub struct MonthBitmap {
    pub month: YearMonth,
    pub rows: BitVec,
}

/// Bitmap and range indexes over an immutable [`ColumnStore`].
///
/// Built once after ingestion; every bitmap has one bit per global row.
#[derive(Clone, Debug)]
pub struct Indexes {
    towns: HashMap<Arc<str>, BitVec>,
    /// Keyed by the `YYYY-MM` label, so iteration is chronological.
    months: BTreeMap<Arc<str>, MonthBitmap>,
    /// `area >= threshold` per indexed threshold.
    areas: BTreeMap<OrderedFloat<f64>, BitVec>,
}

impl Indexes {
    /// Build the town, month and area indexes. The three passes only read the store and run
    /// concurrently on the worker pool.
    pub fn build(store: &ColumnStore) -> Self {
        let rows = store.total_rows();
        let chunk_rows = store.chunk_rows();
        let thresholds = normalized_thresholds(&store.options().area_thresholds);

        let ((town_bits, month_bits), areas) = parallel::join(
            || {
                parallel::join(
                    || code_bitmaps(store.town_chunks(), store.towns().len(), rows, chunk_rows),
                    || code_bitmaps(store.month_chunks(), store.months().len(), rows, chunk_rows),
                )
            },
            || threshold_bitmaps(store.area_chunks(), &thresholds, rows, chunk_rows),
        );

        let towns: HashMap<Arc<str>, BitVec> = store
            .towns()
            .iter()
            .map(|(_, name)| name.clone())
            .zip(town_bits)
            .collect();

        let mut months = BTreeMap::new();
        for ((code, label), bits) in store.months().iter().zip(month_bits) {
            // Every month code was validated on ingestion.
            if let Some(month) = store.month_key(code) {
                months.insert(label.clone(), MonthBitmap { month, rows: bits });
            }
        }

        log::info!(
            "built indexes over {} rows: {} town bitmaps, {} month bitmaps, {} area thresholds",
            rows,
            towns.len(),
            months.len(),
            areas.len()
        );

        Self {
            towns,
            months,
            areas,
        }
    }

    pub fn town(&self, town: &str) -> Option<&BitVec> {
        self.towns.get(town)
    }

    pub fn month(&self, month: &str) -> Option<&BitVec> {
        self.months.get(month).map(|m| &m.rows)
    }

    /// Month bitmaps in chronological order.
    pub fn months(&self) -> impl Iterator<Item = &MonthBitmap> + '_ {
        self.months.values()
    }

    /// Indexed area thresholds, ascending.
    pub fn area_thresholds(&self) -> impl Iterator<Item = f64> + '_ {
        self.areas.keys().map(|t| t.into_inner())
    }

    pub fn area_at_least(&self, threshold: f64) -> Option<&BitVec> {
        self.areas.get(&OrderedFloat(threshold))
    }

    /// The largest indexed threshold `<= min_area` and its bitmap.
    pub fn area_floor(&self, min_area: f64) -> Option<(f64, &BitVec)> {
        self.areas
            .range(..=OrderedFloat(min_area))
            .next_back()
            .map(|(t, bits)| (t.into_inner(), bits))
    }

    pub fn size_bytes(&self) -> usize {
        self.towns.values().map(BitVec::size_bytes).sum::<usize>()
            + self.months.values().map(|m| m.rows.size_bytes()).sum::<usize>()
            + self.areas.values().map(BitVec::size_bytes).sum::<usize>()
    }
}

fn normalized_thresholds(thresholds: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = thresholds.iter().copied().filter(|t| t.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

/// One bitmap per dictionary code, filled in a single pass over the code chunks.
fn code_bitmaps(
    chunks: &[CodeChunk],
    distinct: usize,
    rows: usize,
    chunk_rows: usize,
) -> Vec<BitVec> {
    let mut bitmaps = vec![BitVec::with_len_all_false(rows); distinct];
    for (chunk_idx, chunk) in chunks.iter().enumerate() {
        let base = chunk_idx * chunk_rows;
        chunk.for_each(|offset, code| {
            if let Some(bits) = bitmaps.get_mut(code as usize) {
                bits.set(base + offset, true);
            }
        });
    }
    bitmaps
}

fn threshold_bitmaps(
    chunks: &[Vec<f64>],
    thresholds: &[f64],
    rows: usize,
    chunk_rows: usize,
) -> BTreeMap<OrderedFloat<f64>, BitVec> {
    thresholds
        .iter()
        .map(|&threshold| {
            let mut bits = BitVec::with_len_all_false(rows);
            for (chunk_idx, chunk) in chunks.iter().enumerate() {
                let base = chunk_idx * chunk_rows;
                for (offset, area) in chunk.iter().enumerate() {
                    if *area >= threshold {
                        bits.set(base + offset, true);
                    }
                }
            }
            (OrderedFloat(threshold), bits)
        })
        .collect()
}
