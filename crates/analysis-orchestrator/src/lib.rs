//! Per-run detection pipeline: Bayesian detector, segmenter and event
//! linker over one price series, combined into a [`DetectionReport`].

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{DataPaths, DetectionConfig, DEFAULT_N_BKPS};
pub use pipeline::{detect_and_link, DetectionPipeline};
pub use report::{BayesianReport, DetectionReport, SegmentationReport};
