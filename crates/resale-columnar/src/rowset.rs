use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// An immutable list of global row indices, as produced by the query filter.
///
/// Equality and hashing are by content: two lists built independently compare equal when they
/// hold the same indices in the same order. A fingerprint is computed once at construction so
/// hashing a large set (e.g. as a result-cache key) is O(1).
#[derive(Clone, Debug)]
pub struct RowSet {
    rows: Arc<[usize]>,
    fingerprint: u64,
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn fingerprint(rows: &[usize]) -> u64 {
    // FNV-1a over mixed row indices; stable across runs.
    let mut h: u64 = 0xcbf29ce484222325;
    for &row in rows {
        h ^= splitmix64(row as u64);
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

impl RowSet {
    pub fn new(rows: Vec<usize>) -> Self {
        let fingerprint = fingerprint(&rows);
        Self {
            rows: rows.into(),
            fingerprint,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Deref for RowSet {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.rows
    }
}

impl From<Vec<usize>> for RowSet {
    fn from(rows: Vec<usize>) -> Self {
        Self::new(rows)
    }
}

impl FromIterator<usize> for RowSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl PartialEq for RowSet {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.rows, &other.rows) {
            return true;
        }
        self.fingerprint == other.fingerprint && self.rows[..] == other.rows[..]
    }
}

impl Eq for RowSet {}

impl Hash for RowSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rows.len().hash(state);
        self.fingerprint.hash(state);
    }
}
