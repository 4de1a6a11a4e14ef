//! Segment cost models.
//!
//! A cost model scores how well one contiguous segment is explained by a
//! simplified model; lower is better. Segmentation searches minimise the
//! sum over segments.

use std::fmt;
use std::str::FromStr;

use analysis_core::{DetectionError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::Signal;

/// Longest series the kernel cost accepts; its prefix table is `(n+1)^2`.
pub const MAX_KERNEL_POINTS: usize = 10_000;

/// Points used to estimate the median pairwise distance for the RBF bandwidth.
const MEDIAN_SAMPLE_POINTS: usize = 1_000;

/// Pluggable within-segment cost.
///
/// `fit` precomputes whatever the model needs; afterwards `error(start, end)`
/// scores the half-open row range `start..end` and must be cheap, since the
/// searches call it for every candidate split.
pub trait CostModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Smallest segment length the model can score
    fn min_size(&self) -> usize {
        1
    }

    fn fit(&mut self, signal: &Signal) -> Result<()>;

    fn error(&self, start: usize, end: usize) -> f64;
}

/// Built-in cost models
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CostKind {
    /// Piecewise-constant mean, squared deviations
    #[serde(rename = "l2")]
    Quadratic,
    /// RBF kernel, distributional change
    #[default]
    #[serde(rename = "rbf")]
    KernelRbf,
}

impl CostKind {
    pub fn build(&self) -> Box<dyn CostModel> {
        match self {
            CostKind::Quadratic => Box::new(QuadraticCost::new()),
            CostKind::KernelRbf => Box::new(KernelRbfCost::new()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CostKind::Quadratic => "l2",
            CostKind::KernelRbf => "rbf",
        }
    }
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostKind {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "l2" | "quadratic" => Ok(CostKind::Quadratic),
            "rbf" | "kernel" | "kernel_rbf" => Ok(CostKind::KernelRbf),
            other => Err(DetectionError::UnsupportedCostModel(other.to_string())),
        }
    }
}

/// Sum of squared deviations from the segment mean, per dimension.
///
/// Prefix sums of `x` and `x^2` give O(1) queries.
#[derive(Debug, Clone, Default)]
pub struct QuadraticCost {
    dims: usize,
    // (n+1) x d, row-major
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl QuadraticCost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CostModel for QuadraticCost {
    fn name(&self) -> &'static str {
        "l2"
    }

    fn fit(&mut self, signal: &Signal) -> Result<()> {
        let (n, d) = (signal.len(), signal.dims());
        self.dims = d;
        self.sum = vec![0.0; (n + 1) * d];
        self.sum_sq = vec![0.0; (n + 1) * d];

        for i in 0..n {
            for k in 0..d {
                let x = signal.value(i, k);
                self.sum[(i + 1) * d + k] = self.sum[i * d + k] + x;
                self.sum_sq[(i + 1) * d + k] = self.sum_sq[i * d + k] + x * x;
            }
        }
        Ok(())
    }

    fn error(&self, start: usize, end: usize) -> f64 {
        if end <= start {
            return 0.0;
        }
        let m = (end - start) as f64;
        let d = self.dims;
        let total: f64 = (0..d)
            .map(|k| {
                let s = self.sum[end * d + k] - self.sum[start * d + k];
                let sq = self.sum_sq[end * d + k] - self.sum_sq[start * d + k];
                sq - s * s / m
            })
            .sum();
        total.max(0.0)
    }
}

/// Kernel cost with `k(x, y) = exp(-gamma * |x - y|^2)`.
///
/// `error(s, e) = m - (1/m) * sum_{i,j in s..e} k(x_i, x_j)`. A 2-D prefix
/// sum over the Gram matrix gives O(1) block sums. Without an explicit
/// `gamma`, the bandwidth is the inverse median pairwise squared distance.
#[derive(Debug, Clone, Default)]
pub struct KernelRbfCost {
    gamma: Option<f64>,
    fitted_gamma: f64,
    prefix: DMatrix<f64>,
}

impl KernelRbfCost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gamma(gamma: f64) -> Self {
        Self {
            gamma: Some(gamma),
            ..Self::default()
        }
    }

    /// Bandwidth used by the last `fit`
    pub fn gamma(&self) -> f64 {
        self.fitted_gamma
    }

    fn block_sum(&self, start: usize, end: usize) -> f64 {
        let p = &self.prefix;
        p[(end, end)] - p[(start, end)] - p[(end, start)] + p[(start, start)]
    }
}

impl CostModel for KernelRbfCost {
    fn name(&self) -> &'static str {
        "rbf"
    }

    fn fit(&mut self, signal: &Signal) -> Result<()> {
        let n = signal.len();
        if n > MAX_KERNEL_POINTS {
            return Err(DetectionError::InvalidInput(format!(
                "kernel cost supports at most {} points, got {}",
                MAX_KERNEL_POINTS, n
            )));
        }

        let gamma = match self.gamma {
            Some(g) if g.is_finite() && g > 0.0 => g,
            Some(g) => {
                return Err(DetectionError::InvalidConfiguration(format!(
                    "rbf gamma must be positive, got {}",
                    g
                )))
            }
            None => {
                let median = median_sq_distance(signal);
                if median > 0.0 {
                    median.recip()
                } else {
                    1.0
                }
            }
        };
        self.fitted_gamma = gamma;

        let mut prefix = DMatrix::<f64>::zeros(n + 1, n + 1);
        for j in 0..n {
            let mut column = 0.0;
            for i in 0..n {
                column += (-gamma * signal.sq_distance(i, j)).exp();
                prefix[(i + 1, j + 1)] = prefix[(i + 1, j)] + column;
            }
        }
        self.prefix = prefix;
        Ok(())
    }

    fn error(&self, start: usize, end: usize) -> f64 {
        if end <= start {
            return 0.0;
        }
        let m = (end - start) as f64;
        (m - self.block_sum(start, end) / m).max(0.0)
    }
}

/// Median of pairwise squared distances over an evenly strided subsample.
fn median_sq_distance(signal: &Signal) -> f64 {
    let n = signal.len();
    let stride = n.div_ceil(MEDIAN_SAMPLE_POINTS).max(1);
    let rows: Vec<usize> = (0..n).step_by(stride).collect();

    let mut distances = Vec::with_capacity(rows.len() * rows.len().saturating_sub(1) / 2);
    for (a, &i) in rows.iter().enumerate() {
        for &j in &rows[a + 1..] {
            distances.push(signal.sq_distance(i, j));
        }
    }
    if distances.is_empty() {
        return 0.0;
    }

    distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = distances.len() / 2;
    if distances.len() % 2 == 0 {
        (distances[mid - 1] + distances[mid]) / 2.0
    } else {
        distances[mid]
    }
}

/// Total cost of a partition given its boundaries (ending with `n`).
pub fn total_cost(cost: &dyn CostModel, boundaries: &[usize]) -> f64 {
    let mut start = 0;
    let mut total = 0.0;
    for &end in boundaries {
        total += cost.error(start, end);
        start = end;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fitted(kind: CostKind, values: &[f64]) -> Box<dyn CostModel> {
        let mut cost = kind.build();
        cost.fit(&Signal::from_series(values).unwrap()).unwrap();
        cost
    }

    #[test]
    fn test_quadratic_matches_rss() {
        let values = [1.0, 2.0, 3.0, 10.0, 12.0];
        let cost = fitted(CostKind::Quadratic, &values);

        // mean 2 -> 1 + 0 + 1
        assert_relative_eq!(cost.error(0, 3), 2.0, epsilon = 1e-12);
        // mean 11 -> 1 + 1
        assert_relative_eq!(cost.error(3, 5), 2.0, epsilon = 1e-12);
        assert_eq!(cost.error(2, 2), 0.0);
        assert_eq!(cost.error(4, 5), 0.0);
    }

    #[test]
    fn test_quadratic_multidimensional() {
        let matrix = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 2.0, 1.0, 4.0, 1.0]);
        let mut cost = QuadraticCost::new();
        cost.fit(&Signal::from_matrix(matrix).unwrap()).unwrap();
        // first column mean 2 -> 4 + 0 + 4, second column constant
        assert_relative_eq!(cost.error(0, 3), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kernel_cost_homogeneous_segment_is_zero() {
        let cost = fitted(CostKind::KernelRbf, &[5.0, 5.0, 5.0, 9.0, 9.0]);
        assert_relative_eq!(cost.error(0, 3), 0.0, epsilon = 1e-12);
        assert!(cost.error(0, 5) > 0.5);
    }

    #[test]
    fn test_kernel_block_sum_matches_direct() {
        let values = [0.3, 1.7, -0.4, 2.2, 0.9, 1.1];
        let mut cost = KernelRbfCost::with_gamma(0.5);
        cost.fit(&Signal::from_series(&values).unwrap()).unwrap();

        let (s, e) = (1, 5);
        let m = (e - s) as f64;
        let mut direct = 0.0;
        for i in s..e {
            for j in s..e {
                direct += (-0.5 * (values[i] - values[j]).powi(2)).exp();
            }
        }
        assert_relative_eq!(cost.error(s, e), m - direct / m, epsilon = 1e-9);
    }

    #[test]
    fn test_kernel_median_bandwidth() {
        // pairwise squared distances: 1, 4, 1 -> median 1
        let mut cost = KernelRbfCost::new();
        cost.fit(&Signal::from_series(&[0.0, 1.0, 2.0]).unwrap()).unwrap();
        assert_relative_eq!(cost.gamma(), 1.0);
    }

    #[test]
    fn test_kernel_rejects_bad_gamma() {
        let mut cost = KernelRbfCost::with_gamma(-1.0);
        let err = cost.fit(&Signal::from_series(&[0.0, 1.0]).unwrap()).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_kernel_rejects_oversized_series() {
        let values = vec![1.0; MAX_KERNEL_POINTS + 1];
        let mut cost = KernelRbfCost::new();
        let err = cost.fit(&Signal::from_series(&values).unwrap()).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn test_cost_kind_parsing() {
        assert_eq!("l2".parse::<CostKind>().unwrap(), CostKind::Quadratic);
        assert_eq!("RBF".parse::<CostKind>().unwrap(), CostKind::KernelRbf);
        assert_eq!(
            "l1".parse::<CostKind>().unwrap_err(),
            DetectionError::UnsupportedCostModel("l1".to_string())
        );
        assert_eq!(CostKind::default(), CostKind::KernelRbf);
    }

    #[test]
    fn test_total_cost_sums_segments() {
        let values = [1.0, 2.0, 3.0, 10.0, 12.0];
        let cost = fitted(CostKind::Quadratic, &values);
        assert_relative_eq!(total_cost(cost.as_ref(), &[3, 5]), 4.0, epsilon = 1e-12);
        assert!(total_cost(cost.as_ref(), &[5]) > 4.0);
    }
}
