//! Column-oriented analytics over HDB resale transactions.
//!
//! This crate focuses on:
//! - Chunked columnar storage with dictionary-encoded categorical columns.
//! - Streaming ingestion from CSV, buffered or memory-mapped.
//! - Bitmap (town) and range (month, floor-area threshold) indexes built once after load.
//! - Bitmap-based filtering followed by chunk-aware, optionally parallel aggregation.
//! - An LRU cache of formatted statistic results.
//!
//! ```no_run
//! use resale_columnar::{ColumnStore, LoadMode, QueryEngine, Statistic, StoreOptions};
//!
//! let store = ColumnStore::load("data/ResalePricesSingapore.csv", StoreOptions::default(), LoadMode::Buffered)?;
//! let engine = QueryEngine::new(store);
//! let rows = engine.filter("TAMPINES", "2022-01", "2022-02", 80.0)?;
//! println!("{}", engine.aggregate(&rows, Statistic::AveragePrice)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

mod aggregate;
mod bitmap;
mod cache;
mod dictionary;
mod engine;
mod error;
mod filter;
mod index;
mod options;
mod parallel;
mod record;
mod rowset;
mod source;
mod store;

pub use crate::aggregate::{Aggregator, ExecutionMode, QueryResult, Statistic};
pub use crate::bitmap::{BitVec, Ones};
pub use crate::cache::{CacheKey, CacheStats, ResultCache};
pub use crate::dictionary::Dictionary;
pub use crate::engine::QueryEngine;
pub use crate::error::{IngestError, QueryError};
pub use crate::filter::{FilterQuery, QueryFilter};
pub use crate::index::{Indexes, MonthBitmap};
pub use crate::options::{AreaFilterMode, ResultCacheConfig, StoreOptions, DEFAULT_AREA_THRESHOLDS};
pub use crate::parallel::worker_threads;
pub use crate::record::{ParseYearMonthError, SaleRecord, YearMonth};
pub use crate::rowset::RowSet;
pub use crate::source::{CsvLayout, CsvRowSource, LoadMode, MappedRowSource, MappedRows};
pub use crate::store::{ColumnStore, ColumnStoreBuilder};
