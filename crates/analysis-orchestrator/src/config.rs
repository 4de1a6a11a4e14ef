use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bayesian_detector::SamplerConfig;
use event_linker::LinkerConfig;
use segmentation::{SegmentationMode, SegmenterConfig};
use serde::{Deserialize, Serialize};

/// Breakpoint count used when neither `SEGMENT_N_BKPS` nor
/// `SEGMENT_PENALTY` is set.
pub const DEFAULT_N_BKPS: usize = 5;

/// Parameters for one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub sampler: SamplerConfig,
    pub segmenter: SegmenterConfig,
    pub mode: SegmentationMode,
    pub linker: LinkerConfig,
    /// Abort the run after this long
    pub timeout: Option<Duration>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            segmenter: SegmenterConfig::default(),
            mode: SegmentationMode::Count(DEFAULT_N_BKPS),
            linker: LinkerConfig::default(),
            timeout: None,
        }
    }
}

impl DetectionConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_n_bkps(DEFAULT_N_BKPS)
    }

    /// Like [`from_env`](Self::from_env) with a caller-chosen fallback count.
    pub fn from_env_with_n_bkps(default_n_bkps: usize) -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok(), default_n_bkps)
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_vars<F>(var: F, default_n_bkps: usize) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            var(key).unwrap_or_else(|| default.to_string()).trim().to_string()
        };

        let sampler = SamplerConfig {
            draws: get("BAYES_DRAWS", "3000").parse().context("BAYES_DRAWS")?,
            tune: get("BAYES_TUNE", "1000").parse().context("BAYES_TUNE")?,
            chains: get("BAYES_CHAINS", "2").parse().context("BAYES_CHAINS")?,
            prior_scale: get("BAYES_PRIOR_SCALE", "1.0")
                .parse()
                .context("BAYES_PRIOR_SCALE")?,
            seed: var("BAYES_SEED")
                .map(|s| s.trim().parse())
                .transpose()
                .context("BAYES_SEED")?,
        };
        sampler.validate()?;

        let segmenter = SegmenterConfig {
            cost: get("SEGMENT_COST", "rbf").parse()?,
            ..SegmenterConfig::default()
        };

        let n_bkps: Option<usize> = var("SEGMENT_N_BKPS")
            .map(|s| s.trim().parse())
            .transpose()
            .context("SEGMENT_N_BKPS")?;
        let penalty: Option<f64> = var("SEGMENT_PENALTY")
            .map(|s| s.trim().parse())
            .transpose()
            .context("SEGMENT_PENALTY")?;
        let mode = match (n_bkps, penalty) {
            (None, None) => SegmentationMode::Count(default_n_bkps),
            (n, p) => SegmentationMode::from_options(n, p)?,
        };

        let linker = LinkerConfig {
            window_days: get("EVENT_WINDOW_DAYS", "30")
                .parse()
                .context("EVENT_WINDOW_DAYS")?,
        };

        let timeout = var("DETECTION_TIMEOUT_SECS")
            .map(|s| s.trim().parse::<u64>())
            .transpose()
            .context("DETECTION_TIMEOUT_SECS")?
            .map(Duration::from_secs);

        Ok(Self {
            sampler,
            segmenter,
            mode,
            linker,
            timeout,
        })
    }
}

/// Where the input files live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    pub prices: PathBuf,
    /// Built-in catalog when unset
    pub events: Option<PathBuf>,
}

impl DataPaths {
    pub fn from_env() -> Self {
        Self {
            prices: env::var("PRICE_DATA_PATH")
                .unwrap_or_else(|_| "data/BrentOilPrices.csv".to_string())
                .into(),
            events: env::var("EVENT_DATA_PATH").ok().map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segmentation::CostKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_vars() {
        let config = DetectionConfig::from_vars(lookup(&[]), 7).unwrap();
        assert_eq!(config.sampler, SamplerConfig::default());
        assert_eq!(config.segmenter.cost, CostKind::KernelRbf);
        assert_eq!(config.mode, SegmentationMode::Count(7));
        assert_eq!(config.linker.window_days, 30);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_overrides() {
        let config = DetectionConfig::from_vars(
            lookup(&[
                ("BAYES_DRAWS", "500"),
                ("BAYES_SEED", "42"),
                ("SEGMENT_COST", "l2"),
                ("SEGMENT_PENALTY", "3.5"),
                ("EVENT_WINDOW_DAYS", "10"),
                ("DETECTION_TIMEOUT_SECS", "60"),
            ]),
            DEFAULT_N_BKPS,
        )
        .unwrap();
        assert_eq!(config.sampler.draws, 500);
        assert_eq!(config.sampler.seed, Some(42));
        assert_eq!(config.segmenter.cost, CostKind::Quadratic);
        assert_eq!(config.mode, SegmentationMode::Penalty(3.5));
        assert_eq!(config.linker.window_days, 10);
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_count_and_penalty_conflict() {
        let result = DetectionConfig::from_vars(
            lookup(&[("SEGMENT_N_BKPS", "3"), ("SEGMENT_PENALTY", "1.0")]),
            DEFAULT_N_BKPS,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(DetectionConfig::from_vars(lookup(&[("BAYES_DRAWS", "many")]), 5).is_err());
        assert!(DetectionConfig::from_vars(lookup(&[("BAYES_CHAINS", "0")]), 5).is_err());
        assert!(DetectionConfig::from_vars(lookup(&[("SEGMENT_COST", "l1")]), 5).is_err());
    }
}
