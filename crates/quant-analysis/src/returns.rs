//! Log returns, extreme-move detection and rolling windows.

use analysis_core::{DetectionError, Result, Series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// A day whose absolute log return exceeded the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    /// Series index of the day the move closed on
    pub index: usize,
    pub date: NaiveDate,
    pub log_return: f64,
}

/// `ln(p_t) - ln(p_{t-1})`, one element shorter than `prices`.
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
    if let Some(pos) = prices.iter().position(|&p| p <= 0.0 || !p.is_finite()) {
        return Err(DetectionError::InvalidInput(format!(
            "log returns need positive prices, got {} at index {}",
            prices[pos], pos
        )));
    }
    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Days with `|log return| > threshold`.
pub fn detect_outliers(series: &Series, threshold: f64) -> Result<Vec<Outlier>> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(DetectionError::InvalidConfiguration(format!(
            "outlier threshold must be finite and non-negative, got {}",
            threshold
        )));
    }

    let returns = log_returns(series.values())?;
    Ok(returns
        .iter()
        .enumerate()
        .filter(|(_, r)| r.abs() > threshold)
        .map(|(i, &r)| Outlier {
            index: i + 1,
            date: series.timestamps()[i + 1],
            log_return: r,
        })
        .collect())
}

/// Trailing mean over `window` values; `None` until the window has filled.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    rolling(values, window, 1, |w| w.mean())
}

/// Trailing sample standard deviation of returns; `None` until the window
/// has filled. Needs `window >= 2`.
pub fn rolling_volatility(returns: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    rolling(returns, window, 2, |w| w.std_dev())
}

fn rolling<F>(values: &[f64], window: usize, min_window: usize, stat: F) -> Result<Vec<Option<f64>>>
where
    F: Fn(&[f64]) -> f64,
{
    if window < min_window {
        return Err(DetectionError::InvalidConfiguration(format!(
            "rolling window must be at least {}, got {}",
            min_window, window
        )));
    }

    Ok((0..values.len())
        .map(|i| (i + 1 >= window).then(|| stat(&values[i + 1 - window..=i])))
        .collect())
}
