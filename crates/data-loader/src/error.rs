use analysis_core::DetectionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<LoadError> for DetectionError {
    fn from(err: LoadError) -> Self {
        DetectionError::InvalidInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
