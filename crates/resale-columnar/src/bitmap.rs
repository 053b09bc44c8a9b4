/// A fixed-length bit vector with one bit per global row.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
///
/// Bits past `len` in the last word are always zero, so word-level operations can count ones
/// without masking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

fn word_count(bits: usize) -> usize {
    (bits + 63) / 64
}

fn tail_mask(bits: usize) -> u64 {
    match bits % 64 {
        0 => u64::MAX,
        rem => (1u64 << rem) - 1,
    }
}

impl BitVec {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            len: 0,
            ones: 0,
        }
    }

    /// A bitmap over `bits` rows with no row selected.
    pub fn with_len_all_false(bits: usize) -> Self {
        Self {
            words: vec![0u64; word_count(bits)],
            len: bits,
            ones: 0,
        }
    }

    /// A bitmap over `bits` rows with every row selected.
    pub fn with_len_all_true(bits: usize) -> Self {
        let mut words = vec![u64::MAX; word_count(bits)];
        if let Some(last) = words.last_mut() {
            *last = tail_mask(bits);
        }
        Self {
            words,
            len: bits,
            ones: bits,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word = &mut self.words[index / 64];
        let mask = 1u64 << (index % 64);
        let was_set = *word & mask != 0;
        if value && !was_set {
            *word |= mask;
            self.ones += 1;
        } else if !value && was_set {
            *word &= !mask;
            self.ones -= 1;
        }
    }

    /// `self &= other`
    pub fn and_inplace(&mut self, other: &BitVec) {
        self.combine(other, |a, b| a & b);
    }

    /// `self &= !other`: clears every row selected in `other`.
    pub fn and_not_inplace(&mut self, other: &BitVec) {
        self.combine(other, |a, b| a & !b);
    }

    fn combine(&mut self, other: &BitVec, op: impl Fn(u64, u64) -> u64) {
        debug_assert_eq!(self.len, other.len, "BitVec length mismatch");
        let mut ones = 0usize;
        for (i, w) in self.words.iter_mut().enumerate() {
            *w = op(*w, other.words.get(i).copied().unwrap_or(0));
            ones += w.count_ones() as usize;
        }
        if let Some(last) = self.words.last_mut() {
            let masked = *last & tail_mask(self.len);
            ones -= (*last ^ masked).count_ones() as usize;
            *last = masked;
        }
        self.ones = ones;
    }

    /// Iterate the positions of set bits in ascending order.
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Heap bytes held by the word buffer.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * std::mem::size_of::<u64>()
    }
}

impl Default for BitVec {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the set positions of a [`BitVec`].
pub struct Ones<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        // Clear the lowest set bit.
        self.current &= self.current - 1;
        Some(self.word_idx * 64 + bit)
    }
}
