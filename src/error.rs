//! Error types for the wwtp-abrg library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum AbrgError {
    #[error("Unknown dissimilarity metric '{0}'")]
    InvalidMetric(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Group '{level}' of column '{column}' has no samples")]
    EmptyGroup { column: String, level: String },

    #[error("Unknown test method '{0}'")]
    UnknownMethod(String),

    #[error("Unknown linkage method '{0}'")]
    InvalidLinkage(String),

    #[error("Column '{column}' has {found} distinct group(s); at least 2 are required")]
    SingleGroup { column: String, found: usize },

    #[error("Unknown annotation attribute '{0}'")]
    UnknownAttribute(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate identifier '{0}'")]
    DuplicateId(String),

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, AbrgError>;
