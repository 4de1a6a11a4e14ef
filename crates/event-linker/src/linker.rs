use analysis_core::{ChangePointSet, DetectionError, Event, EventCatalog, Link, Result, Series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Linking tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Largest day distance at which an event still counts as a match
    pub window_days: i64,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

impl LinkerConfig {
    pub fn window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }
}

/// Links change points against a fixed catalog.
#[derive(Debug, Clone, Default)]
pub struct EventLinker {
    catalog: EventCatalog,
    config: LinkerConfig,
}

impl EventLinker {
    pub fn new(catalog: EventCatalog, config: LinkerConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    pub fn link(&self, indices: &[usize], timestamps: &[NaiveDate]) -> Result<Vec<Link>> {
        link_change_points(indices, timestamps, &self.catalog, self.config.window_days)
    }

    /// Link every index of `change_points` against the dates of `series`.
    pub fn link_series(&self, change_points: &ChangePointSet, series: &Series) -> Result<Vec<Link>> {
        self.link(change_points.indices(), series.timestamps())
    }
}

/// Pair each change point with the catalog event closest in calendar days,
/// provided it lies within `window_days`. Equally close events resolve to the
/// one listed first. An empty catalog yields unmatched links.
pub fn link_change_points(
    indices: &[usize],
    timestamps: &[NaiveDate],
    catalog: &EventCatalog,
    window_days: i64,
) -> Result<Vec<Link>> {
    if window_days < 0 {
        return Err(DetectionError::InvalidConfiguration(format!(
            "window must be non-negative, got {} days",
            window_days
        )));
    }

    let links = indices
        .iter()
        .map(|&index| -> Result<Link> {
            let date = *timestamps.get(index).ok_or_else(|| {
                DetectionError::InvalidInput(format!(
                    "change point {} outside timestamps of length {}",
                    index,
                    timestamps.len()
                ))
            })?;

            let nearest = nearest_event(catalog.events(), date, window_days);
            if let Some((event, days)) = nearest {
                debug!("Change point {} ({}) -> {} ({} days)", index, date, event.label, days);
            }
            Ok(Link {
                index,
                date,
                event: nearest.map(|(e, _)| e.clone()),
                days: nearest.map(|(_, d)| d),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Linked {}/{} change points within {} days",
        links.iter().filter(|l| l.is_matched()).count(),
        links.len(),
        window_days
    );
    Ok(links)
}

fn nearest_event(events: &[Event], date: NaiveDate, window_days: i64) -> Option<(&Event, i64)> {
    events
        .iter()
        .map(|e| (e, (e.date - date).num_days().abs()))
        .filter(|&(_, days)| days <= window_days)
        .fold(None, |best, (e, days)| match best {
            Some((_, best_days)) if best_days <= days => best,
            _ => Some((e, days)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Consecutive days starting at 1990-07-01
    fn days(n: usize) -> Vec<NaiveDate> {
        date(1990, 7, 1).iter_days().take(n).collect()
    }

    fn catalog() -> EventCatalog {
        EventCatalog::new(vec![
            Event::new(date(1990, 8, 2), "Iraq invades Kuwait", "Gulf War"),
            Event::new(date(1990, 12, 1), "Later event", ""),
        ])
    }

    #[test]
    fn test_exact_date_is_distance_zero() {
        let timestamps = days(100);
        // 1990-08-02 is day 32
        let links = link_change_points(&[32], &timestamps, &catalog(), 30).unwrap();
        assert_eq!(links[0].days, Some(0));
        assert_eq!(links[0].event.as_ref().unwrap().label, "Iraq invades Kuwait");
        assert_eq!(links[0].date, date(1990, 8, 2));
    }

    #[test]
    fn test_outside_window_is_unmatched() {
        let timestamps = days(100);
        // 1990-10-08: 67 days after the invasion, 54 before the later event
        let links = link_change_points(&[99], &timestamps, &catalog(), 30).unwrap();
        assert!(!links[0].is_matched());
        assert_eq!(links[0].days, None);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let timestamps = days(100);
        // 1990-07-03 is exactly 30 days before the invasion
        let links = link_change_points(&[2], &timestamps, &catalog(), 30).unwrap();
        assert_eq!(links[0].days, Some(30));
        let links = link_change_points(&[1], &timestamps, &catalog(), 30).unwrap();
        assert!(!links[0].is_matched());
    }

    #[test]
    fn test_empty_catalog_gives_unmatched_links() {
        let timestamps = days(10);
        let links = link_change_points(&[3, 7], &timestamps, &EventCatalog::empty(), 30).unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.event.is_none() && l.days.is_none()));
        assert_eq!(links[1].index, 7);
    }

    #[test]
    fn test_tie_goes_to_first_listed_event() {
        let timestamps = days(20);
        let catalog = EventCatalog::new(vec![
            Event::new(date(1990, 7, 15), "after", ""),
            Event::new(date(1990, 7, 5), "before", ""),
        ]);
        // 1990-07-10 is 5 days from both
        let links = link_change_points(&[9], &timestamps, &catalog, 30).unwrap();
        assert_eq!(links[0].event.as_ref().unwrap().label, "after");
        assert_eq!(links[0].days, Some(5));
    }

    #[test]
    fn test_closest_event_wins() {
        let timestamps = days(20);
        let catalog = EventCatalog::new(vec![
            Event::new(date(1990, 7, 1), "far", ""),
            Event::new(date(1990, 7, 12), "near", ""),
        ]);
        let links = link_change_points(&[9], &timestamps, &catalog, 30).unwrap();
        assert_eq!(links[0].event.as_ref().unwrap().label, "near");
    }

    #[test]
    fn test_index_out_of_range() {
        let err = link_change_points(&[10], &days(10), &catalog(), 30).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn test_negative_window() {
        let err = link_change_points(&[0], &days(10), &catalog(), -1).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_linker_over_series() {
        let timestamps = days(60);
        let values = (0..60).map(|i| i as f64).collect();
        let series = Series::new(values, timestamps).unwrap();
        let set = ChangePointSet::new(vec![32], series.len()).unwrap();

        let linker = EventLinker::new(catalog(), LinkerConfig::default());
        let links = linker.link_series(&set, &series).unwrap();
        assert_eq!(links[0].days, Some(0));
        assert_eq!(linker.config().window_days, 30);
    }
}
