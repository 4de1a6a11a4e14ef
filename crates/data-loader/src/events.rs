use std::io::Read;
use std::path::Path;

use analysis_core::{Event, EventCatalog};
use tracing::info;

use crate::prices::parse_date;
use crate::{column, line_of, LoadError, Result};

pub fn load_events(path: impl AsRef<Path>) -> Result<EventCatalog> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let catalog = parse_events(file)?;
    info!("Loaded {} events from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Read `Date,Event,Details` rows (`Description` is accepted for the last
/// column) into a catalog sorted by date.
pub fn parse_events<R: Read>(reader: R) -> Result<EventCatalog> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let date_col = column(&headers, &["Date"])?;
    let event_col = column(&headers, &["Event"])?;
    let details_col = column(&headers, &["Details", "Description"]).ok();

    let mut events = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let line = line_of(&record, i as u64 + 2);

        let raw_date = record.get(date_col).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| LoadError::Parse {
            line,
            message: format!("unrecognised date '{}'", raw_date.trim()),
        })?;
        let label = record.get(event_col).unwrap_or("").trim();
        if label.is_empty() {
            return Err(LoadError::Parse {
                line,
                message: "event name is empty".to_string(),
            });
        }
        let details = details_col
            .and_then(|c| record.get(c))
            .unwrap_or("")
            .trim();

        events.push(Event::new(date, label, details));
    }

    Ok(EventCatalog::new(events).sorted_by_date())
}
