//! data-loader: load a Brent price file, run change point detection and
//! print what was found.
//!
//! Usage:
//!   cargo run -p data-loader -- --prices data/BrentOilPrices.csv
//!   cargo run -p data-loader -- --prices prices.csv --events events.csv --n-bkps 7
//!   cargo run -p data-loader -- --prices prices.csv --cost l2 --penalty 50 --json

use std::path::PathBuf;

use analysis_core::Link;
use analysis_orchestrator::{DataPaths, DetectionConfig, DetectionPipeline, DetectionReport};
use anyhow::Context;
use quant_analysis::{detect_outliers, SeriesProfile};
use segmentation::SegmentationMode;
use serde::Serialize;

/// Daily moves above this absolute log return are reported as extreme
const OUTLIER_THRESHOLD: f64 = 0.1;

#[derive(Serialize)]
struct RunOutput<'a> {
    profile: &'a SeriesProfile,
    extreme_days: usize,
    report: &'a DetectionReport,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "data_loader=info,analysis_orchestrator=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let json = args.iter().any(|a| a == "--json");

    let mut paths = DataPaths::from_env();
    if let Some(p) = flag_value(&args, "--prices") {
        paths.prices = PathBuf::from(p);
    }
    if let Some(p) = flag_value(&args, "--events") {
        paths.events = Some(PathBuf::from(p));
    }

    let mut config = DetectionConfig::from_env()?;
    if let Some(v) = flag_value(&args, "--draws") {
        config.sampler.draws = v.parse().context("--draws")?;
    }
    if let Some(v) = flag_value(&args, "--tune") {
        config.sampler.tune = v.parse().context("--tune")?;
    }
    if let Some(v) = flag_value(&args, "--chains") {
        config.sampler.chains = v.parse().context("--chains")?;
    }
    if let Some(v) = flag_value(&args, "--seed") {
        config.sampler.seed = Some(v.parse().context("--seed")?);
    }
    if let Some(v) = flag_value(&args, "--cost") {
        config.segmenter.cost = v.parse()?;
    }
    if let Some(v) = flag_value(&args, "--window") {
        config.linker.window_days = v.parse().context("--window")?;
    }
    let n_bkps = flag_value(&args, "--n-bkps")
        .map(|v| v.parse::<usize>())
        .transpose()
        .context("--n-bkps")?;
    let penalty = flag_value(&args, "--penalty")
        .map(|v| v.parse::<f64>())
        .transpose()
        .context("--penalty")?;
    if n_bkps.is_some() || penalty.is_some() {
        config.mode = SegmentationMode::from_options(n_bkps, penalty)?;
    }

    let loaded = data_loader::load_prices(&paths.prices)?;
    let catalog = match &paths.events {
        Some(path) => data_loader::load_events(path)?,
        None => event_linker::key_events(),
    };

    let profile = SeriesProfile::from_series(&loaded.series, loaded.missing)?;
    let extreme_days = detect_outliers(&loaded.series, OUTLIER_THRESHOLD)?.len();
    tracing::info!(
        "Detected {} extreme return days (>{})",
        extreme_days,
        OUTLIER_THRESHOLD
    );

    let report = DetectionPipeline::new(config).run(&loaded.series, &catalog)?;

    if json {
        let output = RunOutput {
            profile: &profile,
            extreme_days,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&profile, extreme_days, &report);
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn print_summary(profile: &SeriesProfile, extreme_days: usize, report: &DetectionReport) {
    let s = &profile.summary;
    println!("Prices: {} observations, {} to {}", s.count, profile.start, profile.end);
    println!(
        "  mean {:.2}  std {:.2}  min {:.2}  25% {:.2}  50% {:.2}  75% {:.2}  max {:.2}",
        s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
    );
    println!(
        "  missing {}  max drawdown {:.1}%  extreme days {}",
        profile.missing, profile.max_drawdown, extreme_days
    );
    for (label, adf) in [
        ("prices", &profile.price_stationarity),
        ("log returns", &profile.returns_stationarity),
    ] {
        if let Some(adf) = adf {
            println!(
                "  ADF {}: statistic {:.3}, p-value {:.4}, {}",
                label,
                adf.statistic,
                adf.p_value,
                if adf.is_stationary() { "stationary" } else { "non-stationary" }
            );
        }
    }

    let b = &report.bayesian;
    println!();
    println!("Bayesian change point: index {} ({})", b.change_point, b.date);
    println!(
        "  mean before {:.2} (sd {:.2}), after {:.2} (sd {:.2})",
        b.summary.mean_1.mean, b.summary.std_1.mean, b.summary.mean_2.mean, b.summary.std_2.mean
    );
    println!(
        "  tau 94% interval [{:.0}, {:.0}], r_hat {:.3}",
        b.summary.tau.lower, b.summary.tau.upper, b.summary.tau.r_hat
    );
    println!("  {}", describe_link(&b.link));

    let seg = &report.segmentation;
    println!();
    println!(
        "Segmentation ({} cost): {} change points",
        seg.segmentation.cost,
        seg.segmentation.change_points.len()
    );
    for link in &seg.links {
        println!("  {:>6} {}  {}", link.index, link.date, describe_link(link));
    }
    for segment in &seg.segments {
        println!(
            "  segment {:>6}..{:<6} mean {:.2}  std {:.2}",
            segment.start, segment.end, segment.mean, segment.std
        );
    }
}

fn describe_link(link: &Link) -> String {
    match (&link.event, link.days) {
        (Some(event), Some(days)) => format!("{} ({} days): {}", event.label, days, event.description),
        _ => "no event within window".to_string(),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  data-loader --prices PATH [--events PATH] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --draws N       Retained draws per chain (default 3000)");
    eprintln!("  --tune N        Warm-up iterations per chain (default 1000)");
    eprintln!("  --chains N      Parallel chains (default 2)");
    eprintln!("  --seed N        Base seed for reproducible runs");
    eprintln!("  --cost NAME     Segment cost: rbf or l2 (default rbf)");
    eprintln!("  --n-bkps N      Number of breakpoints");
    eprintln!("  --penalty X     Penalty per breakpoint (instead of --n-bkps)");
    eprintln!("  --window DAYS   Event linking window (default 30)");
    eprintln!("  --json          Print the full report as JSON");
}
