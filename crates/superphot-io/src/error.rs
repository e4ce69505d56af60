//! Errors raised while reading observation tables and writing results.

use std::path::PathBuf;

use superphot_classify::ClassifyError;

/// Failure reading a table, writing an output file, or round-tripping JSON.
///
/// Every file-level variant carries the path involved.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The input could not be opened or read.
    #[error("cannot read {path}")]
    FileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The csv parser rejected a record. `offset` is in bytes.
    #[error("malformed CSV record in {path} near byte {offset}")]
    CsvParse {
        path: PathBuf,
        offset: u64,
        source: csv::Error,
    },

    /// Header only, no observations.
    #[error("{path} has no data rows")]
    EmptyTable { path: PathBuf },

    #[error("{path} lacks the required column \"{column}\"")]
    MissingColumn { path: PathBuf, column: String },

    /// Every column was claimed as identifier, type or metadata.
    #[error("{path} has no feature columns left after identifiers and metadata")]
    NoFeatureColumns { path: PathBuf },

    /// Row indices count data rows from zero, header excluded.
    #[error("{path}: row {row_index} has {got} cells but the header has {expected}")]
    InconsistentRowLength {
        path: PathBuf,
        row_index: usize,
        expected: usize,
        got: usize,
    },

    /// A feature cell did not parse to a finite float.
    #[error("{path}: row {row_index} column \"{column}\" holds \"{raw}\", expected a finite number")]
    NonFiniteValue {
        path: PathBuf,
        row_index: usize,
        column: String,
        raw: String,
    },

    #[error("{path}: row id \"{row_id}\" appears at rows {first_row} and {second_row}")]
    DuplicateRowId {
        path: PathBuf,
        row_id: String,
        first_row: usize,
        second_row: usize,
    },

    /// A fixed-width results table did not follow the header/rule/rows layout.
    /// `line` is one-based.
    #[error("{path} line {line}: {reason}")]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("JSON error for {path}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot create directory {path}")]
    OutputDirCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Building a dataset from the table failed, e.g. on an unknown class name.
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}
