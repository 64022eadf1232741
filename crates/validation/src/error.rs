use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("validation was cancelled")]
    Cancelled,

    #[error("data validation failed: {0}")]
    Normalize(#[from] normalize::NormalizeError),
}
