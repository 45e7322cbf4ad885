//! Data module - dataset download, CSV loading and processing

mod fetcher;
mod loader;
mod processor;

pub use fetcher::{DatasetFetcher, FetchError};
pub use loader::{DataLoader, LoadedData, LoaderError};
pub use processor::{
    export_file_name, CountrySeries, DataProcessor, ProcessorError, SeriesPoint, YearBounds,
};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Canonical column names of the raw and clean tables.
pub const COUNTRY: &str = "country";
pub const YEAR: &str = "year";
pub const CO2: &str = "co2_per_capita";

/// One dataset row. `(country, year)` pairs are not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub country: String,
    pub year: i64,
    pub co2_per_capita: Option<f64>,
}

impl Record {
    pub fn new(country: &str, year: i64, co2_per_capita: Option<f64>) -> Self {
        Self {
            country: country.to_string(),
            year,
            co2_per_capita,
        }
    }
}

/// Build a table with the canonical schema from records, keeping their order.
#[cfg(test)]
pub(crate) fn table_from_records(records: &[Record]) -> PolarsResult<DataFrame> {
    let countries: Vec<&str> = records.iter().map(|r| r.country.as_str()).collect();
    let years: Vec<i64> = records.iter().map(|r| r.year).collect();
    let values: Vec<Option<f64>> = records.iter().map(|r| r.co2_per_capita).collect();

    DataFrame::new(vec![
        Column::new(COUNTRY.into(), countries),
        Column::new(YEAR.into(), years),
        Column::new(CO2.into(), values),
    ])
}

/// Read a canonical table back into records.
pub fn records(df: &DataFrame) -> PolarsResult<Vec<Record>> {
    let countries = df.column(COUNTRY)?.str()?;
    let years = df.column(YEAR)?.i64()?;
    let values = df.column(CO2)?.f64()?;

    Ok(countries
        .into_iter()
        .zip(years)
        .zip(values)
        .filter_map(|((country, year), value)| {
            Some(Record {
                country: country?.to_string(),
                year: year?,
                co2_per_capita: value,
            })
        })
        .collect())
}
