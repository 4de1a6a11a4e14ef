//! Descriptive statistics for a price series.

pub mod returns;
pub mod stationarity;

pub use returns::{detect_outliers, log_returns, rolling_mean, rolling_volatility, Outlier};
pub use stationarity::{adf_test, AdfTest, CriticalValues};

use analysis_core::{DetectionError, Result, Series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Count, moments and quartiles of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summary of a loaded price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesProfile {
    pub summary: SummaryStatistics,
    /// Rows dropped at load time for lack of a usable price
    pub missing: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Largest peak-to-trough decline, in percent
    pub max_drawdown: f64,
    /// ADF on price levels; `None` when the test cannot be run
    pub price_stationarity: Option<AdfTest>,
    /// ADF on daily log returns
    pub returns_stationarity: Option<AdfTest>,
}

impl SeriesProfile {
    pub fn from_series(series: &Series, missing: usize) -> Result<Self> {
        Ok(Self {
            summary: describe(series.values())?,
            missing,
            start: series.first_date(),
            end: series.last_date(),
            max_drawdown: max_drawdown(series.values()),
            price_stationarity: adf_test(series.values(), None).ok(),
            returns_stationarity: log_returns(series.values())
                .and_then(|returns| adf_test(&returns, None))
                .ok(),
        })
    }
}

/// Describe a sample; quartiles interpolate linearly between order statistics.
pub fn describe(values: &[f64]) -> Result<SummaryStatistics> {
    if values.is_empty() {
        return Err(DetectionError::InvalidInput("cannot describe an empty sample".to_string()));
    }
    if let Some(pos) = values.iter().position(|x| !x.is_finite()) {
        return Err(DetectionError::InvalidInput(format!(
            "non-finite value at index {}",
            pos
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(SummaryStatistics {
        count: values.len(),
        mean: values.mean(),
        std: if values.len() > 1 { values.std_dev() } else { f64::NAN },
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Maximum drawdown in percent
pub fn max_drawdown(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }

    let mut max_price = prices[0];
    let mut max_dd = 0.0;

    for &price in prices.iter() {
        if price > max_price {
            max_price = price;
        }

        let drawdown = (max_price - price) / max_price;
        if drawdown > max_dd {
            max_dd = drawdown;
        }
    }

    max_dd * 100.0
}
