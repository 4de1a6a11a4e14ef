use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DetectionError, Result};

/// Ordered observations with an aligned, strictly increasing date axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct Series {
    values: Vec<f64>,
    timestamps: Vec<NaiveDate>,
}

/// Unchecked wire form; deserialization goes through `Series::new`
#[derive(Deserialize)]
struct RawSeries {
    values: Vec<f64>,
    timestamps: Vec<NaiveDate>,
}

impl TryFrom<RawSeries> for Series {
    type Error = DetectionError;

    fn try_from(raw: RawSeries) -> Result<Self> {
        Series::new(raw.values, raw.timestamps)
    }
}

impl Series {
    pub fn new(values: Vec<f64>, timestamps: Vec<NaiveDate>) -> Result<Self> {
        if values.len() != timestamps.len() {
            return Err(DetectionError::InvalidInput(format!(
                "values and timestamps differ in length ({} vs {})",
                values.len(),
                timestamps.len()
            )));
        }
        if values.len() < 2 {
            return Err(DetectionError::InvalidInput(format!(
                "series needs at least 2 observations, got {}",
                values.len()
            )));
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(DetectionError::InvalidInput(format!(
                "timestamps not strictly increasing at index {} ({} -> {})",
                pos + 1,
                timestamps[pos],
                timestamps[pos + 1]
            )));
        }

        Ok(Self { values, timestamps })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.timestamps.get(index).copied()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.timestamps[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Row view used by the price-data endpoint and CSV round trips
    pub fn records(&self) -> Vec<PricePoint> {
        self.timestamps
            .iter()
            .zip(&self.values)
            .map(|(&date, &price)| PricePoint { date, price })
            .collect()
    }
}

/// One dated price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// A known external event (war, OPEC decision, crash...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub date: NaiveDate,
    #[serde(rename = "event")]
    pub label: String,
    pub description: String,
}

impl Event {
    pub fn new(date: NaiveDate, label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            date,
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Externally supplied event list. Order is significant: linking ties are
/// resolved in favour of the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Stable sort by date, so same-day events keep their relative order
    pub fn sorted_by_date(mut self) -> Self {
        self.events.sort_by_key(|e| e.date);
        self
    }

    /// Events dated within `[start, end]`, inclusive
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .collect()
    }
}

/// A change point paired with its nearest catalog event, if any fell
/// inside the tolerance window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub index: usize,
    pub date: NaiveDate,
    pub event: Option<Event>,
    pub days: Option<i64>,
}

impl Link {
    pub fn is_matched(&self) -> bool {
        self.event.is_some()
    }
}

/// Strictly increasing segment-start indices. The trailing series length is
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangePointSet {
    indices: Vec<usize>,
}

impl ChangePointSet {
    /// Build a set of indices into a series of length `n`.
    pub fn new(indices: Vec<usize>, n: usize) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(DetectionError::InvalidInput(format!(
                "change point {} out of range for series of length {}",
                bad, n
            )));
        }
        if indices.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DetectionError::InvalidInput(
                "change points must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { indices })
    }

    /// Convert native segmentation boundaries (always ending in `n`) into the
    /// public set by removing exactly that one trailing sentinel.
    pub fn from_boundaries(mut boundaries: Vec<usize>, n: usize) -> Result<Self> {
        match boundaries.last() {
            Some(&last) if last == n => {
                boundaries.pop();
            }
            _ => {
                return Err(DetectionError::InvalidInput(format!(
                    "segmentation boundaries must end with the series length {}",
                    n
                )))
            }
        }
        Self::new(boundaries, n)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Boundaries with the sentinel appended again, for cost evaluation
    pub fn to_boundaries(&self, n: usize) -> Vec<usize> {
        let mut bounds = self.indices.clone();
        bounds.push(n);
        bounds
    }

    /// `(start, end)` half-open ranges covering `0..n`
    pub fn segments(&self, n: usize) -> Vec<(usize, usize)> {
        let mut start = 0;
        let mut out = Vec::with_capacity(self.indices.len() + 1);
        for end in self.to_boundaries(n) {
            out.push((start, end));
            start = end;
        }
        out
    }
}

/// One retained draw of the two-regime model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSample {
    pub chain: usize,
    pub tau: usize,
    pub mean_1: f64,
    pub mean_2: f64,
    pub std_1: f64,
    pub std_2: f64,
}

impl PosteriorSample {
    pub fn is_finite(&self) -> bool {
        self.mean_1.is_finite()
            && self.mean_2.is_finite()
            && self.std_1.is_finite()
            && self.std_2.is_finite()
    }
}

/// Post-warm-up draws from every chain, stored chain by chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub chains: usize,
    pub draws_per_chain: usize,
    pub samples: Vec<PosteriorSample>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn chain(&self, chain: usize) -> &[PosteriorSample] {
        let start = chain * self.draws_per_chain;
        let end = (start + self.draws_per_chain).min(self.samples.len());
        &self.samples[start.min(end)..end]
    }

    pub fn tau_draws(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.tau as f64).collect()
    }

    /// Posterior mean of an arbitrary projection of the draws
    pub fn mean_of<F: Fn(&PosteriorSample) -> f64>(&self, f: F) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        self.samples.iter().map(f).sum::<f64>() / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn test_series_rejects_unsorted_dates() {
        let err = Series::new(vec![1.0, 2.0], vec![day(2), day(1)]).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));

        let err = Series::new(vec![1.0, 2.0], vec![day(1), day(1)]).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn test_series_rejects_short_or_mismatched() {
        assert!(Series::new(vec![1.0], vec![day(1)]).is_err());
        assert!(Series::new(vec![1.0, 2.0], vec![day(1)]).is_err());
    }

    #[test]
    fn test_series_deserialize_validates() {
        let series: Series = serde_json::from_str(
            r#"{"values": [1.0, 2.0], "timestamps": ["2020-01-01", "2020-01-02"]}"#,
        )
        .unwrap();
        assert_eq!(series.last_date(), day(2));

        assert!(serde_json::from_str::<Series>(r#"{"values": [], "timestamps": []}"#).is_err());
        assert!(serde_json::from_str::<Series>(
            r#"{"values": [1.0, 2.0], "timestamps": ["2020-01-02", "2020-01-01"]}"#
        )
        .is_err());
    }

    #[test]
    fn test_series_records() {
        let series = Series::new(vec![10.0, 11.5], vec![day(1), day(2)]).unwrap();
        let records = series.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].date, day(2));
        assert_eq!(records[1].price, 11.5);
    }

    #[test]
    fn test_from_boundaries_strips_sentinel() {
        let set = ChangePointSet::from_boundaries(vec![20, 50, 100], 100).unwrap();
        assert_eq!(set.indices(), &[20, 50]);
        assert!(!set.contains(100));
        assert_eq!(set.to_boundaries(100), vec![20, 50, 100]);
    }

    #[test]
    fn test_from_boundaries_requires_sentinel() {
        assert!(ChangePointSet::from_boundaries(vec![20, 50], 100).is_err());
        assert!(ChangePointSet::from_boundaries(vec![], 100).is_err());
        assert!(ChangePointSet::from_boundaries(vec![100], 100).unwrap().is_empty());
    }

    #[test]
    fn test_change_point_set_validation() {
        assert!(ChangePointSet::new(vec![5, 5], 10).is_err());
        assert!(ChangePointSet::new(vec![7, 3], 10).is_err());
        assert!(ChangePointSet::new(vec![10], 10).is_err());
    }

    #[test]
    fn test_segments_cover_series() {
        let set = ChangePointSet::new(vec![3, 7], 10).unwrap();
        assert_eq!(set.segments(10), vec![(0, 3), (3, 7), (7, 10)]);
    }

    #[test]
    fn test_catalog_sort_is_stable() {
        let catalog = EventCatalog::new(vec![
            Event::new(day(5), "b", ""),
            Event::new(day(3), "a", ""),
            Event::new(day(5), "c", ""),
        ])
        .sorted_by_date();
        let labels: Vec<&str> = catalog.events().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(catalog.between(day(4), day(5)).len(), 2);
    }

    #[test]
    fn test_event_serializes_label_as_event() {
        let json = serde_json::to_value(Event::new(day(1), "OPEC cut", "details")).unwrap();
        assert_eq!(json["event"], "OPEC cut");
        assert_eq!(json["date"], "2020-01-01");
    }

    #[test]
    fn test_trace_chain_slices() {
        let sample = |chain, tau| PosteriorSample {
            chain,
            tau,
            mean_1: 0.0,
            mean_2: 1.0,
            std_1: 1.0,
            std_2: 1.0,
        };
        let trace = Trace {
            chains: 2,
            draws_per_chain: 2,
            samples: vec![sample(0, 1), sample(0, 3), sample(1, 5), sample(1, 7)],
        };
        assert_eq!(trace.chain(1)[0].tau, 5);
        approx::assert_relative_eq!(trace.mean_of(|s| s.tau as f64), 4.0);
    }
}
