//! Offline multiple change point segmentation.
//!
//! Two searches over a pluggable [`CostModel`]: binary segmentation for a
//! fixed breakpoint count and PELT for a per-breakpoint penalty. Both work on
//! boundary lists that end with the series length; [`Segmenter`] strips that
//! trailing entry before handing out a [`ChangePointSet`](analysis_core::ChangePointSet).

pub mod binseg;
pub mod cost;
pub mod pelt;
pub mod segmenter;
pub mod signal;

pub use binseg::binary_segmentation;
pub use cost::{total_cost, CostKind, CostModel, KernelRbfCost, QuadraticCost, MAX_KERNEL_POINTS};
pub use pelt::pelt;
pub use segmenter::{
    segment_summaries, SegmentSummary, Segmentation, SegmentationMode, Segmenter, SegmenterConfig,
};
pub use signal::Signal;
