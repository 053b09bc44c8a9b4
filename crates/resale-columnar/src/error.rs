/// Failure while loading rows into a [`crate::ColumnStore`].
///
/// Ingestion is all-or-nothing: when any of these is returned no store is produced.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv parse error at line {line}: {reason}")]
    Csv { line: u64, reason: String },

    #[error("line {line}: missing field `{field}`")]
    MissingField { line: u64, field: &'static str },

    #[error("line {line}: invalid number `{value}` in field `{field}`")]
    InvalidNumber {
        line: u64,
        field: &'static str,
        value: String,
    },

    /// `row` is the 1-based position of the record in the ingested stream.
    #[error("row {row}: invalid month `{value}` (expected YYYY-MM)")]
    InvalidMonth { row: u64, value: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid month `{0}` (expected YYYY-MM)")]
    InvalidMonth(String),

    #[error("invalid minimum area: {0}")]
    InvalidArea(f64),

    #[error("row {row} out of bounds for a store with {total_rows} rows")]
    RowOutOfBounds { row: usize, total_rows: usize },

    #[error("unknown statistic: {0}")]
    UnknownStatistic(String),
}
