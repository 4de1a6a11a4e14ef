use analysis_core::{CancelFlag, DetectionError, PosteriorSample, Result};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;

use crate::SamplerConfig;

/// Target acceptance for the 1-D random-walk std updates.
const TARGET_ACCEPT: f64 = 0.44;

const INITIAL_LOG_STEP: f64 = -0.7;
const MIN_LOG_STEP: f64 = -12.0;
const MAX_LOG_STEP: f64 = 3.0;

/// Relative std floor; keeps constant segments from collapsing to zero.
const STD_FLOOR_REL: f64 = 1e-9;
const STD_FLOOR_ABS: f64 = 1e-12;

/// Retained draws and proposal statistics from one chain.
pub(crate) struct ChainOutput {
    pub samples: Vec<PosteriorSample>,
    pub acceptance: [f64; 2],
}

#[derive(Debug, Clone, Copy)]
struct ChainState {
    tau: usize,
    mean: [f64; 2],
    std: [f64; 2],
}

/// One Metropolis-within-Gibbs chain over `(tau, mean_k, std_k)`.
pub(crate) struct Chain<'a> {
    data: &'a [f64],
    prior_scale: f64,
    std_floor: f64,
    log_step: [f64; 2],
    std_normal: Normal,
    rng: StdRng,
    // Scratch buffer for the unnormalised log conditional of tau
    log_weights: Vec<f64>,
}

impl<'a> Chain<'a> {
    pub fn new(data: &'a [f64], config: &SamplerConfig, seed: u64) -> Result<Self> {
        let std_normal = Normal::new(0.0, 1.0)
            .map_err(|e| DetectionError::NumericInstability(format!("normal sampler: {e}")))?;

        let scale = data.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let std_floor = (scale * STD_FLOOR_REL).max(STD_FLOOR_ABS);

        Ok(Self {
            data,
            prior_scale: config.prior_scale,
            std_floor,
            log_step: [INITIAL_LOG_STEP; 2],
            std_normal,
            rng: StdRng::seed_from_u64(seed),
            log_weights: vec![0.0; data.len()],
        })
    }

    pub fn run(
        mut self,
        chain: usize,
        chains: usize,
        config: &SamplerConfig,
        cancel: &CancelFlag,
    ) -> Result<ChainOutput> {
        let n = self.data.len();
        // Spread starting points across the index range, one per chain
        let tau0 = ((chain + 1) * n / (chains + 1)).min(n - 1);
        let mut state = self.initial_state(tau0);

        let mut samples = Vec::with_capacity(config.draws);
        let mut accepted = [0usize; 2];

        for iter in 0..(config.tune + config.draws) {
            cancel.check()?;
            let warming_up = iter < config.tune;

            for k in 0..2 {
                let (start, end) = segment_bounds(k, state.tau, n);
                state.mean[k] = self.draw_mean(start, end, state.std[k]);

                let hit = self.update_std(&mut state, k, start, end);
                if warming_up {
                    self.adapt(k, hit, iter);
                } else if hit {
                    accepted[k] += 1;
                }
            }

            state.tau = self.draw_tau(&state)?;

            if !warming_up {
                samples.push(PosteriorSample {
                    chain,
                    tau: state.tau,
                    mean_1: state.mean[0],
                    mean_2: state.mean[1],
                    std_1: state.std[0],
                    std_2: state.std[1],
                });
            }
        }

        let draws = config.draws.max(1) as f64;
        Ok(ChainOutput {
            samples,
            acceptance: [accepted[0] as f64 / draws, accepted[1] as f64 / draws],
        })
    }

    fn initial_state(&self, tau: usize) -> ChainState {
        let n = self.data.len();
        let overall = sample_std(self.data).max(self.std_floor);

        let mut mean = [0.0; 2];
        let mut std = [overall; 2];
        for k in 0..2 {
            let (start, end) = segment_bounds(k, tau, n);
            let segment = &self.data[start..end];
            if !segment.is_empty() {
                mean[k] = segment.iter().sum::<f64>() / segment.len() as f64;
            }
            if segment.len() >= 2 {
                std[k] = sample_std(segment).max(self.std_floor);
            }
        }

        ChainState { tau, mean, std }
    }

    /// Conjugate Normal update given the segment and its current std.
    fn draw_mean(&mut self, start: usize, end: usize, std: f64) -> f64 {
        let m = (end - start) as f64;
        let sum: f64 = self.data[start..end].iter().sum();
        let var = std * std;

        let precision = 1.0 / (self.prior_scale * self.prior_scale) + m / var;
        let post_mean = (sum / var) / precision;
        let post_sd = precision.sqrt().recip();

        post_mean + post_sd * self.std_normal.sample(&mut self.rng)
    }

    /// Random-walk Metropolis step on `ln(std)`. Returns whether the proposal
    /// was accepted.
    fn update_std(&mut self, state: &mut ChainState, k: usize, start: usize, end: usize) -> bool {
        let mean = state.mean[k];
        let m = (end - start) as f64;
        let ss: f64 = self.data[start..end].iter().map(|x| (x - mean).powi(2)).sum();

        let current = state.std[k].ln();
        let step = self.log_step[k].exp();
        let proposal = current + step * self.std_normal.sample(&mut self.rng);
        if proposal < self.std_floor.ln() {
            return false;
        }

        let log_ratio = self.log_target(proposal, m, ss) - self.log_target(current, m, ss);
        if log_ratio >= 0.0 || self.rng.gen::<f64>().ln() < log_ratio {
            state.std[k] = proposal.exp();
            true
        } else {
            false
        }
    }

    /// Log density of `u = ln(std)`: half-normal prior, Gaussian likelihood
    /// over the segment, plus the log-Jacobian `u`.
    fn log_target(&self, u: f64, m: f64, ss: f64) -> f64 {
        let s2 = self.prior_scale * self.prior_scale;
        -(2.0 * u).exp() / (2.0 * s2) - m * u - 0.5 * ss * (-2.0 * u).exp() + u
    }

    /// Robbins-Monro step towards the target acceptance rate.
    fn adapt(&mut self, k: usize, accepted: bool, iter: usize) {
        let hit = if accepted { 1.0 } else { 0.0 };
        let rate = ((iter + 1) as f64).sqrt().recip();
        self.log_step[k] =
            (self.log_step[k] + rate * (hit - TARGET_ACCEPT)).clamp(MIN_LOG_STEP, MAX_LOG_STEP);
    }

    /// Exact draw from p(tau | means, stds, data) over `0..n`.
    ///
    /// `log_weights[t] = sum_{i<t} l1(i) + sum_{i>=t} l2(i)`. The suffix is
    /// accumulated backwards and the prefix forwards; neither pass subtracts,
    /// so huge per-point terms from a floored std do not cancel.
    fn draw_tau(&mut self, state: &ChainState) -> Result<usize> {
        let n = self.data.len();
        let log_density = |x: f64, k: usize| {
            let z = (x - state.mean[k]) / state.std[k];
            -state.std[k].ln() - 0.5 * z * z
        };

        let mut regime_2_tail = 0.0;
        for t in (0..n).rev() {
            regime_2_tail += log_density(self.data[t], 1);
            self.log_weights[t] = regime_2_tail;
        }

        let mut regime_1_head = 0.0;
        let mut max = f64::NEG_INFINITY;
        for t in 0..n {
            self.log_weights[t] += regime_1_head;
            max = max.max(self.log_weights[t]);
            regime_1_head += log_density(self.data[t], 0);
        }

        if !max.is_finite() {
            return Err(DetectionError::NumericInstability(
                "tau conditional has no finite mass".to_string(),
            ));
        }

        let mut total = 0.0;
        for w in self.log_weights.iter_mut() {
            *w = (*w - max).exp();
            total += *w;
        }

        let mut target = self.rng.gen::<f64>() * total;
        for (t, w) in self.log_weights.iter().enumerate() {
            target -= w;
            if target <= 0.0 {
                return Ok(t);
            }
        }
        Ok(n - 1)
    }
}

/// Segment of regime `k` (0 before tau, 1 from tau on) as a half-open range.
fn segment_bounds(k: usize, tau: usize, n: usize) -> (usize, usize) {
    if k == 0 {
        (0, tau)
    } else {
        (tau, n)
    }
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
