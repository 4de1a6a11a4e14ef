use analysis_core::{DetectionError, Result};
use serde::{Deserialize, Serialize};

/// Sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Retained draws per chain
    pub draws: usize,
    /// Warm-up iterations per chain, discarded. Proposal scales adapt here.
    pub tune: usize,
    /// Independent chains, run in parallel
    pub chains: usize,
    /// Scale of the N(0, s) mean priors and HalfNormal(s) std priors
    pub prior_scale: f64,
    /// Base seed; chain `c` uses `seed + c`. `None` draws a fresh seed.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            draws: 3000,
            tune: 1000,
            chains: 2,
            prior_scale: 1.0,
            seed: None,
        }
    }
}

impl SamplerConfig {
    pub fn draws(mut self, draws: usize) -> Self {
        self.draws = draws;
        self
    }

    pub fn tune(mut self, tune: usize) -> Self {
        self.tune = tune;
        self
    }

    pub fn chains(mut self, chains: usize) -> Self {
        self.chains = chains;
        self
    }

    pub fn prior_scale(mut self, scale: f64) -> Self {
        self.prior_scale = scale;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.draws == 0 {
            return Err(DetectionError::InvalidConfiguration(
                "draws must be at least 1".to_string(),
            ));
        }
        if self.chains == 0 {
            return Err(DetectionError::InvalidConfiguration(
                "chains must be at least 1".to_string(),
            ));
        }
        if !self.prior_scale.is_finite() || self.prior_scale <= 0.0 {
            return Err(DetectionError::InvalidConfiguration(format!(
                "prior scale must be positive and finite, got {}",
                self.prior_scale
            )));
        }
        Ok(())
    }
}
