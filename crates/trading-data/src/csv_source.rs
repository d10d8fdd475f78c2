//! CSV candle source.

use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use trading_core::error::DataError;
use trading_core::types::Bar;

/// CSV record format.
///
/// Only a timestamp and a close are required; missing open/high/low fall
/// back to the close and a missing volume to zero.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Timestamp", alias = "time", alias = "Time")]
    timestamp: i64,
    #[serde(alias = "Open", default)]
    open: Option<f64>,
    #[serde(alias = "High", default)]
    high: Option<f64>,
    #[serde(alias = "Low", default)]
    low: Option<f64>,
    #[serde(alias = "Close", alias = "price", alias = "value")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: Option<f64>,
}

impl CsvRecord {
    fn into_bar(self) -> Bar {
        Bar::new(
            normalize_timestamp(self.timestamp),
            self.open.unwrap_or(self.close),
            self.high.unwrap_or(self.close),
            self.low.unwrap_or(self.close),
            self.close,
            self.volume.unwrap_or(0.0),
        )
    }
}

/// Unix seconds or milliseconds to milliseconds.
fn normalize_timestamp(ts: i64) -> i64 {
    // Assume milliseconds if > 10 digits
    if ts > 10_000_000_000 {
        ts
    } else {
        ts * 1000
    }
}

/// CSV file of historical candles.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DataError::NoDataAvailable(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Load all bars, sorted by timestamp.
    pub fn load_all(&self) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        // Non-finite values pass through; the graph rejects them at `emit`.
        let mut bars = reader
            .deserialize::<CsvRecord>()
            .map(|result| {
                result
                    .map(CsvRecord::into_bar)
                    .map_err(|e| DataError::ParseError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Stable, so rows sharing a timestamp keep file order
        bars.sort_by_key(|b| b.timestamp);
        debug!(path = %self.path.display(), bars = bars.len(), "Loaded CSV");

        Ok(bars)
    }
}
