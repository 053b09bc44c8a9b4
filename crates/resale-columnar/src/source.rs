//! Row sources that decode CSV text into [`SaleRecord`]s.
//!
//! Both sources parse with the `csv` crate and yield the same row stream for the same file; they
//! differ only in where the bytes come from (a buffered `io::Read`, or a memory-mapped region).

use crate::error::IngestError;
use crate::options::StoreOptions;
use crate::record::SaleRecord;
use crate::store::ColumnStore;
use csv::ByteRecord;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Field positions of the columns the store keeps.
///
/// Defaults match the HDB resale CSV layout:
/// `month,town,flat_type,block,street_name,storey_range,floor_area_sqm,flat_model,lease_commence_date,resale_price`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvLayout {
    pub delimiter: u8,
    pub has_header: bool,
    pub month: usize,
    pub town: usize,
    pub floor_area: usize,
    pub resale_price: usize,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            month: 0,
            town: 1,
            floor_area: 6,
            resale_price: 9,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    #[default]
    Buffered,
    MemoryMapped,
}

impl ColumnStore {
    /// Load a CSV file with the default [`CsvLayout`].
    pub fn load(
        path: impl AsRef<Path>,
        options: StoreOptions,
        mode: LoadMode,
    ) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let layout = CsvLayout::default();
        log::info!("loading {} ({:?})", path.display(), mode);

        match mode {
            LoadMode::Buffered => {
                let file = File::open(path)?;
                let source = CsvRowSource::new(BufReader::new(file), layout);
                ColumnStore::ingest(options, source)
            }
            LoadMode::MemoryMapped => {
                let source = MappedRowSource::open(path, layout)?;
                let mut store = ColumnStore::ingest(options, source.rows())?;
                store.set_memory_mapped(true);
                Ok(store)
            }
        }
    }
}

fn text_field<'a>(
    raw: Option<&'a [u8]>,
    line: u64,
    field: &'static str,
) -> Result<&'a str, IngestError> {
    let raw = raw.ok_or(IngestError::MissingField { line, field })?;
    let text = std::str::from_utf8(raw).map_err(|_| IngestError::Csv {
        line,
        reason: format!("invalid UTF-8 in field `{field}`"),
    })?;
    Ok(text.trim())
}

fn number_field(raw: Option<&[u8]>, line: u64, field: &'static str) -> Result<f64, IngestError> {
    let text = text_field(raw, line, field)?;
    text.parse::<f64>().map_err(|_| IngestError::InvalidNumber {
        line,
        field,
        value: text.to_owned(),
    })
}

fn decode_row<'a>(
    get: impl Fn(usize) -> Option<&'a [u8]>,
    layout: &CsvLayout,
    line: u64,
) -> Result<SaleRecord, IngestError> {
    Ok(SaleRecord {
        month: text_field(get(layout.month), line, "month")?.to_owned(),
        town: text_field(get(layout.town), line, "town")?.to_owned(),
        floor_area: number_field(get(layout.floor_area), line, "floor_area")?,
        resale_price: number_field(get(layout.resale_price), line, "resale_price")?,
    })
}

/// Buffered CSV rows from any reader.
pub struct CsvRowSource<R> {
    reader: csv::Reader<R>,
    layout: CsvLayout,
    record: ByteRecord,
}

impl<R: Read> CsvRowSource<R> {
    pub fn new(reader: R, layout: CsvLayout) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(layout.delimiter)
            .has_headers(layout.has_header)
            // Only a handful of positions are read; tolerate ragged rows.
            .flexible(true)
            .from_reader(reader);
        Self {
            reader,
            layout,
            record: ByteRecord::new(),
        }
    }
}

impl<R: Read> Iterator for CsvRowSource<R> {
    type Item = Result<SaleRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let line = self.record.position().map_or(0, |p| p.line());
                let record = &self.record;
                Some(decode_row(|i| record.get(i), &self.layout, line))
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                Some(Err(IngestError::Csv {
                    line,
                    reason: e.to_string(),
                }))
            }
        }
    }
}

/// CSV rows decoded straight out of a memory-mapped file.
pub struct MappedRowSource {
    // `None` for empty files, which cannot be mapped on every platform.
    mmap: Option<Mmap>,
    layout: CsvLayout,
}

impl MappedRowSource {
    #[allow(unsafe_code)]
    pub fn open(path: impl AsRef<Path>, layout: CsvLayout) -> Result<Self, IngestError> {
        let file = File::open(path)?;
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: the map is read-only and the store copies every value out of it during
            // ingestion. Truncating the file concurrently is outside the supported use.
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self { mmap, layout })
    }

    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    pub fn rows(&self) -> MappedRows<'_> {
        MappedRows::new(self.bytes(), &self.layout)
    }
}

/// Rows decoded from a borrowed byte region, with the same CSV rules as [`CsvRowSource`].
pub struct MappedRows<'a> {
    inner: CsvRowSource<&'a [u8]>,
}

impl<'a> MappedRows<'a> {
    pub fn new(bytes: &'a [u8], layout: &CsvLayout) -> Self {
        Self {
            inner: CsvRowSource::new(bytes, layout.clone()),
        }
    }
}

impl Iterator for MappedRows<'_> {
    type Item = Result<SaleRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
