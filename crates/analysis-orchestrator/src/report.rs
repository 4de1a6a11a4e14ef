use analysis_core::{Link, PosteriorSample};
use bayesian_detector::PosteriorSummary;
use chrono::NaiveDate;
use segmentation::{SegmentSummary, Segmentation};
use serde::{Deserialize, Serialize};

/// Bayesian half of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianReport {
    pub change_point: usize,
    pub date: NaiveDate,
    pub summary: PosteriorSummary,
    pub link: Link,
    /// Retained draws; left out of serialized reports
    #[serde(skip)]
    pub samples: Vec<PosteriorSample>,
}

/// Segmentation half of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    #[serde(flatten)]
    pub segmentation: Segmentation,
    pub segments: Vec<SegmentSummary>,
    pub links: Vec<Link>,
}

/// Everything one detection run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub observations: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bayesian: BayesianReport,
    pub segmentation: SegmentationReport,
}

impl DetectionReport {
    pub fn bayesian_change_points(&self) -> Vec<usize> {
        vec![self.bayesian.change_point]
    }

    pub fn segmentation_change_points(&self) -> &[usize] {
        self.segmentation.segmentation.change_points.indices()
    }

    /// Bayesian link first, then segmentation links in index order
    pub fn links(&self) -> Vec<&Link> {
        std::iter::once(&self.bayesian.link)
            .chain(self.segmentation.links.iter())
            .collect()
    }
}
