//! CSV ingestion for price and event files.

pub mod error;
pub mod events;
pub mod prices;

pub use error::{LoadError, Result};
pub use events::{load_events, parse_events};
pub use prices::{load_prices, parse_date, parse_prices, LoadedPrices};

use csv::StringRecord;

/// Position of the first header matching any of `names`, ignoring case.
pub(crate) fn column(headers: &StringRecord, names: &[&str]) -> Result<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        .ok_or_else(|| {
            LoadError::Validation(format!("missing column {}", names.join(" or ")))
        })
}

/// 1-based file line of a record, falling back to `fallback`.
pub(crate) fn line_of(record: &StringRecord, fallback: u64) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(fallback)
}
