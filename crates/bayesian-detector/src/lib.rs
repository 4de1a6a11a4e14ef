//! Bayesian single change point detection.
//!
//! Models a series as two Gaussian regimes split at an unknown index `tau`
//! and approximates the joint posterior over `(tau, mean_1, mean_2, std_1,
//! std_2)` with a Metropolis-within-Gibbs sampler. `tau` is drawn from its
//! exact discrete conditional each sweep, so the chain moves across the
//! whole index range instead of creeping along a step-shaped likelihood.

pub mod config;
pub mod detector;
pub mod diagnostics;
mod sampler;

pub use config::SamplerConfig;
pub use detector::{BayesianDetector, BayesianResult, ParameterSummary, PosteriorSummary};
pub use diagnostics::{effective_sample_size, quantile, split_r_hat};
