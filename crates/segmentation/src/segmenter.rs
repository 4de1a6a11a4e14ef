use analysis_core::{CancelFlag, ChangePointDetector, ChangePointSet, DetectionError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binseg::binary_segmentation;
use crate::cost::{total_cost, CostKind, CostModel, KernelRbfCost};
use crate::pelt::pelt;
use crate::Signal;

/// Search parameters shared by both modes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    pub cost: CostKind,
    /// Shortest allowed segment
    pub min_size: usize,
    /// Only multiples of `jump` are breakpoint candidates
    pub jump: usize,
    /// Fixed RBF bandwidth; median heuristic when unset
    pub gamma: Option<f64>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            cost: CostKind::KernelRbf,
            min_size: 1,
            jump: 1,
            gamma: None,
        }
    }
}

impl SegmenterConfig {
    pub fn cost(mut self, cost: CostKind) -> Self {
        self.cost = cost;
        self
    }

    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn jump(mut self, jump: usize) -> Self {
        self.jump = jump;
        self
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 {
            return Err(DetectionError::InvalidConfiguration(
                "min_size must be at least 1".to_string(),
            ));
        }
        if self.jump == 0 {
            return Err(DetectionError::InvalidConfiguration(
                "jump must be at least 1".to_string(),
            ));
        }
        if self.gamma.is_some() && self.cost != CostKind::KernelRbf {
            return Err(DetectionError::InvalidConfiguration(format!(
                "gamma only applies to the rbf cost, not {}",
                self.cost
            )));
        }
        Ok(())
    }

    fn build_cost(&self) -> Box<dyn CostModel> {
        match (self.cost, self.gamma) {
            (CostKind::KernelRbf, Some(gamma)) => Box::new(KernelRbfCost::with_gamma(gamma)),
            (kind, _) => kind.build(),
        }
    }
}

/// How many breakpoints to place
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Exactly this many breakpoints (binary segmentation)
    Count(usize),
    /// Penalty per breakpoint (PELT)
    Penalty(f64),
}

impl SegmentationMode {
    /// Exactly one of the two options must be given.
    pub fn from_options(n_bkps: Option<usize>, penalty: Option<f64>) -> Result<Self> {
        let mode = match (n_bkps, penalty) {
            (Some(k), None) => SegmentationMode::Count(k),
            (None, Some(pen)) => SegmentationMode::Penalty(pen),
            (Some(_), Some(_)) => {
                return Err(DetectionError::InvalidConfiguration(
                    "give either a breakpoint count or a penalty, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(DetectionError::InvalidConfiguration(
                    "either a breakpoint count or a penalty is required".to_string(),
                ))
            }
        };
        mode.validate()?;
        Ok(mode)
    }

    fn validate(&self) -> Result<()> {
        match *self {
            SegmentationMode::Penalty(pen) if !pen.is_finite() || pen < 0.0 => {
                Err(DetectionError::InvalidConfiguration(format!(
                    "penalty must be finite and non-negative, got {}",
                    pen
                )))
            }
            _ => Ok(()),
        }
    }
}

/// One segment of a partition with its descriptive moments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub start: usize,
    pub end: usize,
    pub mean: f64,
    pub std: f64,
}

impl SegmentSummary {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Output of one segmentation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub change_points: ChangePointSet,
    pub mode: SegmentationMode,
    pub cost: CostKind,
    /// Sum of segment costs, penalty excluded
    pub total_cost: f64,
}

/// Offline multi change point segmentation over a pluggable cost model.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    mode: SegmentationMode,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig, mode: SegmentationMode) -> Self {
        Self { config, mode }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn mode(&self) -> SegmentationMode {
        self.mode
    }

    pub fn segment(&self, values: &[f64]) -> Result<Segmentation> {
        self.segment_with_cancel(values, &CancelFlag::new())
    }

    pub fn segment_with_cancel(&self, values: &[f64], cancel: &CancelFlag) -> Result<Segmentation> {
        if values.is_empty() {
            return Err(DetectionError::InvalidInput("series is empty".to_string()));
        }
        self.segment_signal(&Signal::from_series(values)?, cancel)
    }

    pub fn segment_signal(&self, signal: &Signal, cancel: &CancelFlag) -> Result<Segmentation> {
        self.config.validate()?;
        self.mode.validate()?;

        let n = signal.len();
        if n == 0 {
            return Err(DetectionError::InvalidInput("series is empty".to_string()));
        }
        if let SegmentationMode::Count(k) = self.mode {
            if k >= n {
                return Err(DetectionError::InvalidInput(format!(
                    "cannot place {} breakpoints in a series of length {}",
                    k, n
                )));
            }
        }

        let mut cost = self.config.build_cost();
        let min_size = self.config.min_size.max(cost.min_size());
        let jump = self.config.jump;
        debug!(
            "Fitting {} cost on {} points ({} dims)",
            cost.name(),
            n,
            signal.dims()
        );
        cost.fit(signal)?;

        let boundaries = match self.mode {
            SegmentationMode::Count(k) => {
                binary_segmentation(cost.as_ref(), n, k, min_size, jump, cancel)?
            }
            SegmentationMode::Penalty(pen) => pelt(cost.as_ref(), n, pen, min_size, jump, cancel)?,
        };

        let total = total_cost(cost.as_ref(), &boundaries);
        let change_points = ChangePointSet::from_boundaries(boundaries, n)?;
        info!(
            "Segmentation ({:?}, cost {}) found {} change points",
            self.mode,
            self.config.cost,
            change_points.len()
        );

        Ok(Segmentation {
            change_points,
            mode: self.mode,
            cost: self.config.cost,
            total_cost: total,
        })
    }
}

impl ChangePointDetector for Segmenter {
    fn name(&self) -> &'static str {
        "segmentation"
    }

    fn detect(&self, values: &[f64], cancel: &CancelFlag) -> Result<ChangePointSet> {
        Ok(self.segment_with_cancel(values, cancel)?.change_points)
    }
}

/// Mean and sample std of every segment the change points induce.
pub fn segment_summaries(
    values: &[f64],
    change_points: &ChangePointSet,
) -> Result<Vec<SegmentSummary>> {
    if let Some(&last) = change_points.indices().last() {
        if last >= values.len() {
            return Err(DetectionError::InvalidInput(format!(
                "change point {} out of range for series of length {}",
                last,
                values.len()
            )));
        }
    }

    let summaries = change_points
        .segments(values.len())
        .into_iter()
        .map(|(start, end)| {
            let segment = &values[start..end];
            let m = segment.len() as f64;
            let mean = if segment.is_empty() {
                f64::NAN
            } else {
                segment.iter().sum::<f64>() / m
            };
            let std = if segment.len() > 1 {
                (segment.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (m - 1.0)).sqrt()
            } else {
                0.0
            };
            SegmentSummary {
                start,
                end,
                mean,
                std,
            }
        })
        .collect();
    Ok(summaries)
}
