use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SurveyError {
    #[error("invalid metagenome id: {0:?}")]
    InvalidIdentifier(String),

    #[error("page size must be greater than zero")]
    InvalidPageSize,

    #[error("missing config file {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("min_avg_seq_length {min} exceeds max_avg_seq_length {max}")]
    InvalidThresholds { min: f64, max: f64 },

    #[error("MG-RAST request failed: {0}")]
    ApiHttp(String),

    #[error("MG-RAST returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("row {row}: column {column} is not numeric: {value:?}")]
    #[diagnostic(help("check the export for shifted columns or stray delimiters"))]
    TypeConversion {
        row: usize,
        column: String,
        value: String,
    },

    #[error("export is missing column: {0}")]
    MissingColumn(String),

    #[error("malformed export: {0}")]
    MalformedExport(String),

    #[error("export has no header row: {0}")]
    EmptyExport(PathBuf),

    #[error("metadata document is missing field: {0}")]
    MissingField(String),

    #[error("metagenome not cached: {0}")]
    CacheMiss(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
