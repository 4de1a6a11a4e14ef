use analysis_core::{
    CancelFlag, ChangePointDetector, DetectionError, EventCatalog, Link, Result, Series,
};
use bayesian_detector::BayesianDetector;
use event_linker::link_change_points;
use segmentation::{segment_summaries, Segmenter};
use tracing::info;

use crate::config::DetectionConfig;
use crate::report::{BayesianReport, DetectionReport, SegmentationReport};

/// Runs both detectors over one series and links their output to events.
pub struct DetectionPipeline {
    config: DetectionConfig,
    bayesian: BayesianDetector,
    segmenter: Segmenter,
}

impl DetectionPipeline {
    pub fn new(config: DetectionConfig) -> Self {
        let bayesian = BayesianDetector::new(config.sampler.clone());
        let segmenter = Segmenter::new(config.segmenter, config.mode);
        Self {
            config,
            bayesian,
            segmenter,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Cancel flag honouring the configured timeout
    pub fn cancel_flag(&self) -> CancelFlag {
        match self.config.timeout {
            Some(timeout) => CancelFlag::with_deadline(timeout),
            None => CancelFlag::new(),
        }
    }

    pub fn run(&self, series: &Series, catalog: &EventCatalog) -> Result<DetectionReport> {
        self.run_with_cancel(series, catalog, &self.cancel_flag())
    }

    /// Both detectors run side by side on the rayon pool; the report is only
    /// built once both have returned.
    pub fn run_with_cancel(
        &self,
        series: &Series,
        catalog: &EventCatalog,
        cancel: &CancelFlag,
    ) -> Result<DetectionReport> {
        let values = series.values();
        info!(
            "Detection run over {} observations ({} to {}), {} events",
            series.len(),
            series.first_date(),
            series.last_date(),
            catalog.len()
        );

        let (bayesian, segmentation) = rayon::join(
            || self.bayesian.detect_with_cancel(values, cancel),
            || self.segmenter.segment_with_cancel(values, cancel),
        );
        let bayesian = bayesian?;
        let segmentation = segmentation?;

        let window = self.config.linker.window_days;
        let timestamps = series.timestamps();

        let change_point = bayesian.point_estimate;
        let bayesian_link = link_change_points(&[change_point], timestamps, catalog, window)?
            .pop()
            .ok_or_else(|| DetectionError::InvalidInput("no link for change point".to_string()))?;
        let links = link_change_points(
            segmentation.change_points.indices(),
            timestamps,
            catalog,
            window,
        )?;
        let segments = segment_summaries(values, &segmentation.change_points)?;

        Ok(DetectionReport {
            observations: series.len(),
            start: series.first_date(),
            end: series.last_date(),
            bayesian: BayesianReport {
                change_point,
                date: bayesian_link.date,
                summary: bayesian.summary,
                link: bayesian_link,
                samples: bayesian.trace.samples,
            },
            segmentation: SegmentationReport {
                segmentation,
                segments,
                links,
            },
        })
    }
}

/// Run any detector and link what it finds.
pub fn detect_and_link(
    detector: &dyn ChangePointDetector,
    series: &Series,
    catalog: &EventCatalog,
    window_days: i64,
    cancel: &CancelFlag,
) -> Result<Vec<Link>> {
    let change_points = detector.detect(series.values(), cancel)?;
    info!(
        "{} detector found {} change points",
        detector.name(),
        change_points.len()
    );
    link_change_points(change_points.indices(), series.timestamps(), catalog, window_days)
}
