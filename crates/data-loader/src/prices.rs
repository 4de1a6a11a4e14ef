use std::io::Read;
use std::path::Path;

use analysis_core::Series;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{column, line_of, LoadError, Result};

/// Date layouts seen in Brent price exports
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%y", "%b %d, %Y", "%m/%d/%Y"];

/// A price series plus the number of rows skipped for lack of a price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedPrices {
    pub series: Series,
    pub missing: usize,
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

pub fn load_prices(path: impl AsRef<Path>) -> Result<LoadedPrices> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let loaded = parse_prices(file)?;
    info!(
        "Loaded {} prices from {} ({} to {}, {} missing)",
        loaded.series.len(),
        path.display(),
        loaded.series.first_date(),
        loaded.series.last_date(),
        loaded.missing
    );
    Ok(loaded)
}

/// Read `Date,Price` rows, sort them by date and build a [`Series`].
pub fn parse_prices<R: Read>(reader: R) -> Result<LoadedPrices> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let date_col = column(&headers, &["Date"])?;
    let price_col = column(&headers, &["Price"])?;

    let mut rows: Vec<(NaiveDate, f64)> = Vec::new();
    let mut missing = 0;
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let line = line_of(&record, i as u64 + 2);

        let raw_date = record.get(date_col).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| LoadError::Parse {
            line,
            message: format!("unrecognised date '{}'", raw_date.trim()),
        })?;

        match record.get(price_col).and_then(|p| p.trim().parse::<f64>().ok()) {
            Some(price) if price.is_finite() => rows.push((date, price)),
            _ => missing += 1,
        }
    }

    if missing > 0 {
        warn!("Skipped {} rows without a usable price", missing);
    }

    rows.sort_by_key(|(date, _)| *date);
    if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(LoadError::Validation(format!("duplicate date {}", w[0].0)));
    }

    let (timestamps, values): (Vec<NaiveDate>, Vec<f64>) = rows.into_iter().unzip();
    let series =
        Series::new(values, timestamps).map_err(|e| LoadError::Validation(e.to_string()))?;

    Ok(LoadedPrices { series, missing })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("1987-05-20"), Some(date(1987, 5, 20)));
        assert_eq!(parse_date("20-May-87"), Some(date(1987, 5, 20)));
        assert_eq!(parse_date("Apr 22, 2020"), Some(date(2020, 4, 22)));
        assert_eq!(parse_date("04/22/2020"), Some(date(2020, 4, 22)));
        assert_eq!(parse_date(" 2020-01-02 "), Some(date(2020, 1, 2)));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_parse_prices_sorts_and_counts_missing() {
        let csv = "Date,Price\n21-May-87,18.45\n20-May-87,18.63\n22-May-87,\n26-May-87,18.60\n";
        let loaded = parse_prices(csv.as_bytes()).unwrap();

        assert_eq!(loaded.missing, 1);
        assert_eq!(loaded.series.values(), &[18.63, 18.45, 18.60]);
        assert_eq!(loaded.series.first_date(), date(1987, 5, 20));
        assert_eq!(loaded.series.last_date(), date(1987, 5, 26));
    }

    #[test]
    fn test_parse_prices_header_case_and_order() {
        let csv = "price,date\n10.0,2020-01-01\n11.0,2020-01-02\n";
        let loaded = parse_prices(csv.as_bytes()).unwrap();
        assert_eq!(loaded.series.values(), &[10.0, 11.0]);
    }

    #[test]
    fn test_parse_prices_rejects_duplicates() {
        let csv = "Date,Price\n2020-01-01,1.0\n2020-01-02,2.0\n2020-01-01,3.0\n";
        let err = parse_prices(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Validation(_)));
    }

    #[test]
    fn test_parse_prices_bad_date_reports_line() {
        let csv = "Date,Price\n2020-01-01,1.0\nnot-a-date,2.0\n";
        match parse_prices(csv.as_bytes()).unwrap_err() {
            LoadError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_prices_missing_column() {
        let csv = "Day,Close\n2020-01-01,1.0\n";
        assert!(matches!(
            parse_prices(csv.as_bytes()).unwrap_err(),
            LoadError::Validation(_)
        ));
    }

    #[test]
    fn test_parse_prices_too_short() {
        let csv = "Date,Price\n2020-01-01,1.0\n";
        assert!(matches!(
            parse_prices(csv.as_bytes()).unwrap_err(),
            LoadError::Validation(_)
        ));
    }
}
