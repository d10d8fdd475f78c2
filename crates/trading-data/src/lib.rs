//! Historical candle sources for replaying into the indicator graph.

mod csv_source;

pub use csv_source::CsvDataSource;

use std::path::Path;
use trading_core::error::DataError;
use trading_core::types::Bar;

/// Load bars from a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    CsvDataSource::new(path)?.load_all()
}
