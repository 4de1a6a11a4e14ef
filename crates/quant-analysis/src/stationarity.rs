//! Augmented Dickey-Fuller unit root test with a constant term.
//!
//! `dy_t = a + g * y_{t-1} + sum_i b_i * dy_{t-i} + e_t`; the statistic is the
//! t-ratio of `g`. The lag order is picked by AIC over `0..=max_lag` on a
//! common sample, then the chosen model is refit on every usable row.
//! p-values follow MacKinnon (1994), critical values MacKinnon (2010).

use analysis_core::{DetectionError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Significance level behind `is_stationary`
pub const STATIONARITY_LEVEL: f64 = 0.05;

// Constant-only surface, one series
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// Response surface b0 + b1/T + b2/T^2 + b3/T^3
const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    #[serde(rename = "1%")]
    pub one: f64,
    #[serde(rename = "5%")]
    pub five: f64,
    #[serde(rename = "10%")]
    pub ten: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfTest {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    /// Rows in the final regression
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

impl AdfTest {
    /// Unit root rejected at the 5% level
    pub fn is_stationary(&self) -> bool {
        self.p_value < STATIONARITY_LEVEL
    }
}

/// Run the test on `values`. Without `max_lag` the upper bound is
/// `ceil(12 * (n / 100)^(1/4))`, capped at `n / 2 - 2`.
pub fn adf_test(values: &[f64], max_lag: Option<usize>) -> Result<AdfTest> {
    let n = values.len();
    if n < 6 {
        return Err(DetectionError::InvalidInput(format!(
            "ADF test needs at least 6 observations, got {}",
            n
        )));
    }
    if let Some(pos) = values.iter().position(|x| !x.is_finite()) {
        return Err(DetectionError::InvalidInput(format!(
            "non-finite value at index {}",
            pos
        )));
    }

    let cap = n / 2 - 2;
    let max_lag = match max_lag {
        Some(lag) if lag > cap => {
            return Err(DetectionError::InvalidInput(format!(
                "max_lag {} too large for {} observations (at most {})",
                lag, n, cap
            )))
        }
        Some(lag) => lag,
        None => ((12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize).min(cap),
    };

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let fit = fit_lag(values, &diffs, lag, max_lag)?;
        if best.map_or(true, |(_, aic)| fit.aic < aic) {
            best = Some((lag, fit.aic));
        }
    }
    let used_lag = best.map_or(0, |(lag, _)| lag);

    let fit = fit_lag(values, &diffs, used_lag, used_lag)?;
    if !fit.statistic.is_finite() {
        return Err(DetectionError::NumericInstability(
            "ADF statistic is not finite (constant series?)".to_string(),
        ));
    }

    Ok(AdfTest {
        statistic: fit.statistic,
        p_value: mackinnon_p_value(fit.statistic)?,
        used_lag,
        nobs: fit.nobs,
        critical_values: critical_values(fit.nobs),
    })
}

struct LagFit {
    statistic: f64,
    aic: f64,
    nobs: usize,
}

/// OLS of `diffs[t]` on `[1, y_t, diffs[t-1..=t-lag]]` for `t` in `start..`.
fn fit_lag(values: &[f64], diffs: &[f64], lag: usize, start: usize) -> Result<LagFit> {
    let nobs = diffs.len() - start;
    let k = 2 + lag;
    if nobs <= k {
        return Err(DetectionError::InvalidInput(format!(
            "{} rows cannot fit {} regressors",
            nobs, k
        )));
    }

    let x = DMatrix::from_fn(nobs, k, |r, c| {
        let t = start + r;
        match c {
            0 => 1.0,
            1 => values[t],
            _ => diffs[t - (c - 1)],
        }
    });
    let y = DVector::from_iterator(nobs, diffs[start..].iter().copied());

    let xtx_inv = (x.transpose() * &x).try_inverse().ok_or_else(|| {
        DetectionError::NumericInstability("singular ADF design matrix".to_string())
    })?;
    let beta = &xtx_inv * x.transpose() * &y;
    let rss = (&y - &x * &beta).norm_squared();

    let sigma2 = rss / (nobs - k) as f64;
    let se = (sigma2 * xtx_inv[(1, 1)]).sqrt();
    let m = nobs as f64;
    let log_likelihood = -m / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (rss / m).ln() + 1.0);

    Ok(LagFit {
        statistic: beta[1] / se,
        aic: -2.0 * log_likelihood + 2.0 * k as f64,
        nobs,
    })
}

/// MacKinnon approximate p-value for the constant-only test.
pub fn mackinnon_p_value(statistic: f64) -> Result<f64> {
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }
    let z = if statistic <= TAU_STAR {
        polynomial(&TAU_SMALL_P, statistic)
    } else {
        polynomial(&TAU_LARGE_P, statistic)
    };
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| DetectionError::NumericInstability(format!("normal cdf: {e}")))?;
    Ok(normal.cdf(z))
}

pub fn critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs as f64;
    let surface = |b: &[f64; 4]| b[0] + b[1] * inv + b[2] * inv * inv + b[3] * inv * inv * inv;
    CriticalValues {
        one: surface(&CRIT_1),
        five: surface(&CRIT_5),
        ten: surface(&CRIT_10),
    }
}

fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
