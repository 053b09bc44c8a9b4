use crate::dictionary::Dictionary;
use crate::error::IngestError;
use crate::options::StoreOptions;
use crate::record::{SaleRecord, YearMonth};

/// Dictionary codes for one chunk of a categorical column.
///
/// Chunks start out as `U32` and are narrowed by [`ColumnStore::compress`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CodeChunk {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl CodeChunk {
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub(crate) fn get(&self, idx: usize) -> Option<u32> {
        match self {
            Self::U8(v) => v.get(idx).map(|c| u32::from(*c)),
            Self::U16(v) => v.get(idx).map(|c| u32::from(*c)),
            Self::U32(v) => v.get(idx).copied(),
        }
    }

    /// Call `f(local_offset, code)` for every row of the chunk.
    pub(crate) fn for_each(&self, mut f: impl FnMut(usize, u32)) {
        match self {
            Self::U8(v) => v.iter().enumerate().for_each(|(i, c)| f(i, u32::from(*c))),
            Self::U16(v) => v.iter().enumerate().for_each(|(i, c)| f(i, u32::from(*c))),
            Self::U32(v) => v.iter().enumerate().for_each(|(i, c)| f(i, *c)),
        }
    }

    /// Re-encode with the narrowest width able to hold `distinct` codes.
    fn narrowed(&self, distinct: usize) -> Self {
        let mut codes = Vec::with_capacity(self.len());
        self.for_each(|_, c| codes.push(c));
        if distinct <= usize::from(u8::MAX) + 1 {
            Self::U8(codes.into_iter().map(|c| c as u8).collect())
        } else if distinct <= usize::from(u16::MAX) + 1 {
            Self::U16(codes.into_iter().map(|c| c as u16).collect())
        } else {
            Self::U32(codes)
        }
    }

    fn size_bytes(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len() * 2,
            Self::U32(v) => v.len() * 4,
        }
    }
}

/// Immutable chunked column storage for the resale dataset.
///
/// Four logical columns (`month`, `town`, `floor_area`, `resale_price`) are stored as parallel
/// arenas of fixed-capacity chunks: chunk `k` of every column covers global rows
/// `[k * chunk_rows, k * chunk_rows + len)`.
#[derive(Clone, Debug)]
pub struct ColumnStore {
    options: StoreOptions,
    chunk_rows: usize,
    months: Dictionary,
    /// Parsed month per month-dictionary code.
    month_keys: Vec<YearMonth>,
    towns: Dictionary,
    month_chunks: Vec<CodeChunk>,
    town_chunks: Vec<CodeChunk>,
    area_chunks: Vec<Vec<f64>>,
    price_chunks: Vec<Vec<f64>>,
    rows: usize,
    compressed: bool,
    memory_mapped: bool,
}

impl ColumnStore {
    /// Load a row stream into a new store.
    ///
    /// The first error aborts ingestion; the partially built columns are dropped.
    pub fn ingest<I>(options: StoreOptions, rows: I) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = Result<SaleRecord, IngestError>>,
    {
        let mut builder = ColumnStoreBuilder::new(options);
        for row in rows {
            builder.append(&row?)?;
        }
        Ok(builder.finish())
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn total_rows(&self) -> usize {
        self.rows
    }

    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    pub fn chunk_count(&self) -> usize {
        self.price_chunks.len()
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn uses_memory_mapping(&self) -> bool {
        self.memory_mapped
    }

    pub fn months(&self) -> &Dictionary {
        &self.months
    }

    pub fn towns(&self) -> &Dictionary {
        &self.towns
    }

    /// Resolve a global row to `(chunk_index, local_offset)`.
    pub fn locate(&self, row: usize) -> Option<(usize, usize)> {
        (row < self.rows).then(|| (row / self.chunk_rows, row % self.chunk_rows))
    }

    pub fn month(&self, row: usize) -> Option<&str> {
        let (chunk, offset) = self.locate(row)?;
        let code = self.month_chunks.get(chunk)?.get(offset)?;
        self.months.decode(code)
    }

    pub fn town(&self, row: usize) -> Option<&str> {
        let (chunk, offset) = self.locate(row)?;
        let code = self.town_chunks.get(chunk)?.get(offset)?;
        self.towns.decode(code)
    }

    pub fn floor_area(&self, row: usize) -> Option<f64> {
        let (chunk, offset) = self.locate(row)?;
        self.area_chunks.get(chunk)?.get(offset).copied()
    }

    pub fn resale_price(&self, row: usize) -> Option<f64> {
        let (chunk, offset) = self.locate(row)?;
        self.price_chunks.get(chunk)?.get(offset).copied()
    }

    pub fn record(&self, row: usize) -> Option<SaleRecord> {
        Some(SaleRecord::new(
            self.month(row)?,
            self.town(row)?,
            self.floor_area(row)?,
            self.resale_price(row)?,
        ))
    }

    /// Narrow the stored dictionary codes to the smallest width that fits each dictionary.
    ///
    /// Query results are unaffected. Calling this more than once is a no-op.
    pub fn compress(&mut self) {
        if self.compressed {
            return;
        }

        let before = self.compressed_size_bytes();
        let (months, towns) = (self.months.len(), self.towns.len());
        for chunk in &mut self.month_chunks {
            *chunk = chunk.narrowed(months);
        }
        for chunk in &mut self.town_chunks {
            *chunk = chunk.narrowed(towns);
        }
        self.compressed = true;

        log::info!(
            "compressed code chunks: {} -> {} bytes",
            before,
            self.compressed_size_bytes()
        );
    }

    pub fn compressed_size_bytes(&self) -> usize {
        let dict_bytes = self.months.size_bytes() + self.towns.size_bytes();
        let code_bytes: usize = self
            .month_chunks
            .iter()
            .chain(&self.town_chunks)
            .map(CodeChunk::size_bytes)
            .sum();
        let value_bytes: usize = self
            .area_chunks
            .iter()
            .chain(&self.price_chunks)
            .map(|c| c.len() * std::mem::size_of::<f64>())
            .sum();
        dict_bytes + code_bytes + value_bytes
    }

    pub(crate) fn month_key(&self, code: u32) -> Option<YearMonth> {
        self.month_keys.get(code as usize).copied()
    }

    pub(crate) fn month_chunks(&self) -> &[CodeChunk] {
        &self.month_chunks
    }

    pub(crate) fn town_chunks(&self) -> &[CodeChunk] {
        &self.town_chunks
    }

    pub(crate) fn area_chunks(&self) -> &[Vec<f64>] {
        &self.area_chunks
    }

    pub(crate) fn price_chunks(&self) -> &[Vec<f64>] {
        &self.price_chunks
    }

    pub(crate) fn set_memory_mapped(&mut self, memory_mapped: bool) {
        self.memory_mapped = memory_mapped;
    }
}

/// Streaming builder that fills the current chunk of every column and seals it at capacity.
pub struct ColumnStoreBuilder {
    options: StoreOptions,
    chunk_rows: usize,
    months: Dictionary,
    month_keys: Vec<YearMonth>,
    towns: Dictionary,
    current_months: Vec<u32>,
    current_towns: Vec<u32>,
    current_areas: Vec<f64>,
    current_prices: Vec<f64>,
    month_chunks: Vec<CodeChunk>,
    town_chunks: Vec<CodeChunk>,
    area_chunks: Vec<Vec<f64>>,
    price_chunks: Vec<Vec<f64>>,
    rows: usize,
}

impl ColumnStoreBuilder {
    pub fn new(options: StoreOptions) -> Self {
        let chunk_rows = options.effective_chunk_rows();
        Self {
            options,
            chunk_rows,
            months: Dictionary::new(),
            month_keys: Vec::new(),
            towns: Dictionary::new(),
            current_months: Vec::with_capacity(chunk_rows),
            current_towns: Vec::with_capacity(chunk_rows),
            current_areas: Vec::with_capacity(chunk_rows),
            current_prices: Vec::with_capacity(chunk_rows),
            month_chunks: Vec::new(),
            town_chunks: Vec::new(),
            area_chunks: Vec::new(),
            price_chunks: Vec::new(),
            rows: 0,
        }
    }

    pub fn append(&mut self, record: &SaleRecord) -> Result<(), IngestError> {
        let month = match self.months.lookup(&record.month) {
            Some(code) => code,
            None => {
                let key: YearMonth = record.month.parse().map_err(|_| IngestError::InvalidMonth {
                    row: self.rows as u64 + 1,
                    value: record.month.clone(),
                })?;
                self.month_keys.push(key);
                self.months.encode(&record.month)
            }
        };
        let town = self.towns.encode(&record.town);

        self.current_months.push(month);
        self.current_towns.push(town);
        self.current_areas.push(record.floor_area);
        self.current_prices.push(record.resale_price);

        self.rows += 1;
        if self.rows % self.chunk_rows == 0 {
            self.seal();
        }
        Ok(())
    }

    fn seal(&mut self) {
        if self.current_prices.is_empty() {
            return;
        }

        let cap = self.chunk_rows;
        self.month_chunks.push(CodeChunk::U32(std::mem::replace(
            &mut self.current_months,
            Vec::with_capacity(cap),
        )));
        self.town_chunks.push(CodeChunk::U32(std::mem::replace(
            &mut self.current_towns,
            Vec::with_capacity(cap),
        )));
        self.area_chunks
            .push(std::mem::replace(&mut self.current_areas, Vec::with_capacity(cap)));
        self.price_chunks
            .push(std::mem::replace(&mut self.current_prices, Vec::with_capacity(cap)));
    }

    pub fn finish(mut self) -> ColumnStore {
        self.seal();
        // The trailing chunk buffers were allocated at full capacity.
        if let Some(last) = self.area_chunks.last_mut() {
            last.shrink_to_fit();
        }
        if let Some(last) = self.price_chunks.last_mut() {
            last.shrink_to_fit();
        }

        log::info!(
            "ingested {} rows into {} chunks ({} towns, {} months)",
            self.rows,
            self.price_chunks.len(),
            self.towns.len(),
            self.months.len()
        );

        ColumnStore {
            options: self.options,
            chunk_rows: self.chunk_rows,
            months: self.months,
            month_keys: self.month_keys,
            towns: self.towns,
            month_chunks: self.month_chunks,
            town_chunks: self.town_chunks,
            area_chunks: self.area_chunks,
            price_chunks: self.price_chunks,
            rows: self.rows,
            compressed: false,
            memory_mapped: false,
        }
    }
}
