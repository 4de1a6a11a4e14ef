use thiserror::Error;

/// Result alias used across the detection engine.
pub type Result<T> = std::result::Result<T, DetectionError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// Malformed, empty or too-short series, non-finite values, bad indices.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Contradictory or missing parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Sampler produced non-finite draws or summaries.
    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    #[error("Unsupported cost model: {0}")]
    UnsupportedCostModel(String),

    #[error("Detection run cancelled")]
    Cancelled,
}

impl DetectionError {
    /// Short machine-readable kind, used by the HTTP layer and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionError::InvalidInput(_) => "invalid_input",
            DetectionError::InvalidConfiguration(_) => "invalid_configuration",
            DetectionError::NumericInstability(_) => "numeric_instability",
            DetectionError::UnsupportedCostModel(_) => "unsupported_cost_model",
            DetectionError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DetectionError::InvalidInput("series is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: series is empty");
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(DetectionError::Cancelled.to_string(), "Detection run cancelled");
    }
}
