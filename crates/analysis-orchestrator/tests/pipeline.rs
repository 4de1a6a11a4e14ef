use analysis_core::{Event, EventCatalog, Series};
use analysis_orchestrator::{DetectionConfig, DetectionPipeline};
use bayesian_detector::SamplerConfig;
use chrono::NaiveDate;
use segmentation::{CostKind, SegmentationMode, SegmenterConfig};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Three price regimes with a small deterministic wobble
fn regimes() -> Series {
    let start = date(1990, 6, 1);
    let values: Vec<f64> = (0..150)
        .map(|i| {
            let level = match i {
                0..=59 => 2.0,
                60..=109 => 4.5,
                _ => 3.0,
            };
            level + ((i * 7) % 5) as f64 * 0.05
        })
        .collect();
    Series::new(values, start.iter_days().take(150).collect()).unwrap()
}

fn catalog() -> EventCatalog {
    EventCatalog::new(vec![
        Event::new(date(1990, 8, 2), "Iraq invades Kuwait", "First Gulf War"),
        Event::new(date(1990, 9, 25), "Unrelated", ""),
    ])
}

fn config(mode: SegmentationMode) -> DetectionConfig {
    DetectionConfig {
        sampler: SamplerConfig::default().draws(400).tune(300).seed(2024),
        segmenter: SegmenterConfig::default().cost(CostKind::Quadratic),
        mode,
        ..DetectionConfig::default()
    }
}

#[test]
fn test_full_pipeline_count_mode() {
    let series = regimes();
    let report = DetectionPipeline::new(config(SegmentationMode::Count(2)))
        .run(&series, &catalog())
        .unwrap();

    assert_eq!(report.segmentation_change_points(), &[60, 110]);
    assert!(!report.segmentation_change_points().contains(&series.len()));

    // index 60 is 1990-07-31, two days before the invasion
    let first = &report.segmentation.links[0];
    assert_eq!(first.date, date(1990, 7, 31));
    assert_eq!(first.days, Some(2));
    assert_eq!(first.event.as_ref().unwrap().label, "Iraq invades Kuwait");

    let bayes = report.bayesian.change_point;
    assert!(bayes < series.len());
    assert_eq!(report.bayesian.date, series.date_at(bayes).unwrap());
}

#[test]
fn test_full_pipeline_penalty_mode() {
    let report = DetectionPipeline::new(config(SegmentationMode::Penalty(2.0)))
        .run(&regimes(), &EventCatalog::empty())
        .unwrap();

    assert_eq!(report.segmentation_change_points(), &[60, 110]);
    assert!(report.links().iter().all(|l| !l.is_matched()));
}

#[test]
fn test_report_serializes() {
    let report = DetectionPipeline::new(config(SegmentationMode::Count(2)))
        .run(&regimes(), &catalog())
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["segmentation"]["change_points"], serde_json::json!([60, 110]));
    assert_eq!(json["segmentation"]["cost"], "l2");
    assert_eq!(json["start"], "1990-06-01");
    assert!(json["bayesian"].get("samples").is_none());
    assert!(json["bayesian"]["summary"]["tau"]["mean"].is_number());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let series = regimes();
    let pipeline = DetectionPipeline::new(config(SegmentationMode::Count(2)));
    let a = pipeline.run(&series, &catalog()).unwrap();
    let b = pipeline.run(&series, &catalog()).unwrap();
    assert_eq!(a, b);
}
