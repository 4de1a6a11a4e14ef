use analysis_core::{DetectionError, Result};
use nalgebra::DMatrix;

/// Observations as an `n x d` matrix, one row per time step.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    data: DMatrix<f64>,
}

impl Signal {
    /// Reshape a 1-D series into an `n x 1` signal.
    pub fn from_series(values: &[f64]) -> Result<Self> {
        Self::from_matrix(DMatrix::from_column_slice(values.len(), 1, values))
    }

    pub fn from_matrix(data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(DetectionError::InvalidInput("signal is empty".to_string()));
        }
        if let Some((pos, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            // column-major storage; report the row
            return Err(DetectionError::InvalidInput(format!(
                "non-finite value {} at index {}",
                value,
                pos % data.nrows()
            )));
        }
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn dims(&self) -> usize {
        self.data.ncols()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn value(&self, row: usize, dim: usize) -> f64 {
        self.data[(row, dim)]
    }

    /// Squared Euclidean distance between two rows
    pub fn sq_distance(&self, a: usize, b: usize) -> f64 {
        (0..self.dims())
            .map(|d| (self.data[(a, d)] - self.data[(b, d)]).powi(2))
            .sum()
    }
}
