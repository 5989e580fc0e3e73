use thiserror::Error;

/// Fatal import failures. Any of these aborts the whole statement; no partial
/// bill set is returned.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unrecognized statement format: {0}")]
    Format(String),
    #[error("Duplicate transaction id: {0}")]
    Duplicate(String),
    #[error("Refund exceeds original amount: {0}")]
    Refund(String),
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("Invalid amount for {id}: '{value}'")]
    InvalidAmount { id: String, value: String },
}
