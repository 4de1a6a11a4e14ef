use analysis_core::{
    CancelFlag, ChangePointDetector, ChangePointSet, DetectionError, PosteriorSample, Result,
    Trace,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diagnostics::{effective_sample_size, mode, quantile, split_r_hat};
use crate::sampler::{Chain, ChainOutput};
use crate::SamplerConfig;

/// R-hat above this value is reported as poor mixing.
const R_HAT_WARN: f64 = 1.1;

/// Lower/upper quantiles of the central credible interval (94%, as in
/// common posterior summaries).
const INTERVAL: (f64, f64) = (0.03, 0.97);

/// Posterior summary for one scalar parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub mean: f64,
    pub sd: f64,
    pub lower: f64,
    pub upper: f64,
    pub r_hat: f64,
    pub ess: f64,
}

impl ParameterSummary {
    fn from_chains(chains: &[Vec<f64>]) -> Self {
        let all: Vec<f64> = chains.iter().flatten().copied().collect();
        let n = all.len() as f64;
        let mean = all.iter().sum::<f64>() / n;
        let sd = if all.len() > 1 {
            (all.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Self {
            mean,
            sd,
            lower: quantile(&all, INTERVAL.0),
            upper: quantile(&all, INTERVAL.1),
            r_hat: if chains.len() > 1 { split_r_hat(chains) } else { f64::NAN },
            ess: chains.iter().map(|c| effective_sample_size(c)).sum(),
        }
    }
}

/// Summary of the full posterior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    pub tau: ParameterSummary,
    /// Most frequent tau draw
    pub tau_map: usize,
    pub mean_1: ParameterSummary,
    pub mean_2: ParameterSummary,
    pub std_1: ParameterSummary,
    pub std_2: ParameterSummary,
    /// Post-warm-up acceptance rate of the std proposals, per chain
    pub acceptance: Vec<[f64; 2]>,
}

impl PosteriorSummary {
    /// All split R-hat values at or below 1.1. Single-chain runs report
    /// `false` since mixing across chains cannot be assessed.
    pub fn converged(&self) -> bool {
        [self.tau, self.mean_1, self.mean_2, self.std_1, self.std_2]
            .iter()
            .all(|p| p.r_hat <= R_HAT_WARN)
    }
}

/// Output of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianResult {
    pub trace: Trace,
    /// Truncated posterior mean of tau
    pub point_estimate: usize,
    pub summary: PosteriorSummary,
}

/// Two-regime Gaussian change point model sampled by MCMC.
#[derive(Debug, Clone, Default)]
pub struct BayesianDetector {
    config: SamplerConfig,
}

impl BayesianDetector {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn detect(&self, data: &[f64]) -> Result<BayesianResult> {
        self.detect_with_cancel(data, &CancelFlag::new())
    }

    /// Run all chains in parallel and combine them once every chain has
    /// finished.
    pub fn detect_with_cancel(&self, data: &[f64], cancel: &CancelFlag) -> Result<BayesianResult> {
        validate_series(data)?;
        self.config.validate()?;

        let config = &self.config;
        let base_seed = config.seed.unwrap_or_else(rand::random);
        info!(
            "Sampling change point posterior: n={}, chains={}, draws={}, tune={}",
            data.len(),
            config.chains,
            config.draws,
            config.tune
        );

        let outputs: Vec<Result<ChainOutput>> = (0..config.chains)
            .into_par_iter()
            .map(|c| {
                let seed = base_seed.wrapping_add(c as u64);
                Chain::new(data, config, seed)?.run(c, config.chains, config, cancel)
            })
            .collect();
        let outputs = outputs.into_iter().collect::<Result<Vec<_>>>()?;

        let acceptance: Vec<[f64; 2]> = outputs.iter().map(|o| o.acceptance).collect();
        let samples: Vec<PosteriorSample> = outputs.into_iter().flat_map(|o| o.samples).collect();

        check_draws(&samples)?;

        let trace = Trace {
            chains: config.chains,
            draws_per_chain: config.draws,
            samples,
        };
        let summary = summarize(&trace, acceptance)?;

        let tau_mean = summary.tau.mean;
        if !tau_mean.is_finite() {
            return Err(DetectionError::NumericInstability(
                "posterior mean of tau is not finite".to_string(),
            ));
        }
        let point_estimate = (tau_mean.trunc().max(0.0) as usize).min(data.len() - 1);

        if config.chains > 1 && !summary.converged() {
            warn!(
                "Chains may not have mixed: r_hat tau={:.3}, mean_1={:.3}, mean_2={:.3}",
                summary.tau.r_hat, summary.mean_1.r_hat, summary.mean_2.r_hat
            );
        }
        info!(
            "Bayesian change point at index {} (tau mean {:.2}, map {})",
            point_estimate, tau_mean, summary.tau_map
        );
        debug!("Posterior summary: {:?}", summary);

        Ok(BayesianResult {
            trace,
            point_estimate,
            summary,
        })
    }
}

impl ChangePointDetector for BayesianDetector {
    fn name(&self) -> &'static str {
        "bayesian"
    }

    fn detect(&self, values: &[f64], cancel: &CancelFlag) -> Result<ChangePointSet> {
        let result = self.detect_with_cancel(values, cancel)?;
        ChangePointSet::new(vec![result.point_estimate], values.len())
    }
}

fn validate_series(data: &[f64]) -> Result<()> {
    if data.len() < 2 {
        return Err(DetectionError::InvalidInput(format!(
            "series needs at least 2 observations, got {}",
            data.len()
        )));
    }
    if let Some(pos) = data.iter().position(|x| !x.is_finite()) {
        return Err(DetectionError::InvalidInput(format!(
            "non-finite value {} at index {}",
            data[pos], pos
        )));
    }
    Ok(())
}

fn check_draws(samples: &[PosteriorSample]) -> Result<()> {
    match samples.iter().find(|s| !s.is_finite()) {
        Some(bad) => Err(DetectionError::NumericInstability(format!(
            "non-finite draw in chain {}: {:?}",
            bad.chain, bad
        ))),
        None => Ok(()),
    }
}

fn summarize(trace: &Trace, acceptance: Vec<[f64; 2]>) -> Result<PosteriorSummary> {
    let per_chain = |f: fn(&PosteriorSample) -> f64| -> Vec<Vec<f64>> {
        (0..trace.chains)
            .map(|c| trace.chain(c).iter().map(f).collect())
            .collect()
    };

    let taus: Vec<usize> = trace.samples.iter().map(|s| s.tau).collect();
    let tau_map = mode(&taus).ok_or_else(|| {
        DetectionError::NumericInstability("trace holds no tau draws".to_string())
    })?;

    let summary = PosteriorSummary {
        tau: ParameterSummary::from_chains(&per_chain(|s| s.tau as f64)),
        tau_map,
        mean_1: ParameterSummary::from_chains(&per_chain(|s| s.mean_1)),
        mean_2: ParameterSummary::from_chains(&per_chain(|s| s.mean_2)),
        std_1: ParameterSummary::from_chains(&per_chain(|s| s.std_1)),
        std_2: ParameterSummary::from_chains(&per_chain(|s| s.std_2)),
        acceptance,
    };

    for (name, p) in [
        ("mean_1", summary.mean_1),
        ("mean_2", summary.mean_2),
        ("std_1", summary.std_1),
        ("std_2", summary.std_2),
    ] {
        if !p.mean.is_finite() || !p.sd.is_finite() {
            return Err(DetectionError::NumericInstability(format!(
                "posterior summary of {} is not finite",
                name
            )));
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn step_series() -> Vec<f64> {
        let mut data = vec![0.0; 50];
        data.extend(vec![10.0; 50]);
        data
    }

    /// Two Gaussian regimes with Box-Muller noise
    fn noisy_regimes(n: usize, tau: usize, mu: (f64, f64), sd: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let u1: f64 = rng.gen_range(1e-12..1.0);
                let u2: f64 = rng.gen();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                let mean = if i < tau { mu.0 } else { mu.1 };
                mean + sd * z
            })
            .collect()
    }

    #[test]
    fn test_step_series_estimate() {
        let detector = BayesianDetector::new(SamplerConfig::default().seed(42));
        let result = detector.detect(&step_series()).unwrap();

        assert!(
            (45..=55).contains(&result.point_estimate),
            "estimate {}",
            result.point_estimate
        );
        assert_eq!(result.trace.len(), 2 * 3000);
        assert_eq!(result.trace.chains, 2);
        assert!((result.summary.mean_2.mean - 10.0).abs() < 0.5);
        assert!(result.summary.mean_1.mean.abs() < 0.5);
    }

    #[test]
    fn test_noisy_regimes_across_seeds() {
        let n = 200;
        let true_tau = 120;
        let tolerance = n / 20;

        for seed in [1u64, 2, 3] {
            let data = noisy_regimes(n, true_tau, (0.0, 3.0), 1.0, seed * 11);
            let detector =
                BayesianDetector::new(SamplerConfig::default().draws(800).tune(400).seed(seed));
            let result = detector.detect(&data).unwrap();

            let diff = result.point_estimate.abs_diff(true_tau);
            assert!(diff <= tolerance, "seed {seed}: estimate {}", result.point_estimate);
            assert!(result.summary.tau.lower <= result.summary.tau.upper);
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let data = step_series();
        let config = SamplerConfig::default().draws(100).tune(50).seed(5);
        let a = BayesianDetector::new(config.clone()).detect(&data).unwrap();
        let b = BayesianDetector::new(config).detect(&data).unwrap();
        assert_eq!(a.trace, b.trace);
        assert_eq!(a.point_estimate, b.point_estimate);
    }

    #[test]
    fn test_rejects_bad_input() {
        let detector = BayesianDetector::default();
        assert!(matches!(detector.detect(&[1.0]), Err(DetectionError::InvalidInput(_))));
        assert!(matches!(
            detector.detect(&[1.0, f64::NAN, 2.0]),
            Err(DetectionError::InvalidInput(_))
        ));
        assert!(matches!(
            detector.detect(&[1.0, f64::INFINITY]),
            Err(DetectionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_bad_config() {
        let detector = BayesianDetector::new(SamplerConfig::default().chains(0));
        assert!(matches!(
            detector.detect(&step_series()),
            Err(DetectionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_cancelled_run() {
        let detector = BayesianDetector::new(SamplerConfig::default().seed(1));
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert_eq!(
            detector.detect_with_cancel(&step_series(), &cancel).unwrap_err(),
            DetectionError::Cancelled
        );
    }

    #[test]
    fn test_trait_returns_single_index() {
        let detector = BayesianDetector::new(SamplerConfig::default().draws(300).tune(200).seed(9));
        let set = ChangePointDetector::detect(&detector, &step_series(), &CancelFlag::new()).unwrap();
        assert_eq!(set.len(), 1);
        assert!((45..=55).contains(&set.indices()[0]));
    }

    fn hand_trace(mean_1: f64) -> Trace {
        let samples = (0..4)
            .map(|i| PosteriorSample {
                chain: 0,
                tau: 10 + i,
                mean_1: if i == 2 { mean_1 } else { 1.0 },
                mean_2: 5.0,
                std_1: 0.5,
                std_2: 0.5,
            })
            .collect();
        Trace {
            chains: 1,
            draws_per_chain: 4,
            samples,
        }
    }

    #[test]
    fn test_non_finite_draws_are_rejected() {
        let trace = hand_trace(f64::NAN);
        assert!(matches!(
            check_draws(&trace.samples),
            Err(DetectionError::NumericInstability(_))
        ));
        assert!(matches!(
            summarize(&trace, vec![[0.4, 0.4]]),
            Err(DetectionError::NumericInstability(_))
        ));

        let trace = hand_trace(2.0);
        assert!(check_draws(&trace.samples).is_ok());
        let summary = summarize(&trace, vec![[0.4, 0.4]]).unwrap();
        assert_eq!(summary.tau_map, 10);
        assert!((summary.mean_1.mean - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_trace_has_no_summary() {
        let trace = Trace {
            chains: 1,
            draws_per_chain: 0,
            samples: Vec::new(),
        };
        assert!(matches!(
            summarize(&trace, vec![[0.0, 0.0]]),
            Err(DetectionError::NumericInstability(_))
        ));
    }

    #[test]
    fn test_minimal_series() {
        let detector = BayesianDetector::new(SamplerConfig::default().draws(50).tune(10).seed(3));
        let result = detector.detect(&[1.0, 2.0]).unwrap();
        assert!(result.point_estimate <= 1);
    }
}
