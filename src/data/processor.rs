//! Data Processor Module
//! Year bounds, country listing and per-country time series with smoothing.

use super::{CO2, COUNTRY, YEAR};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Rolling window must be at least 1, got {0}")]
    InvalidWindow(usize),
}

/// Inclusive range of years present in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearBounds {
    pub min_year: i64,
    pub max_year: i64,
}

/// One point of a country series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year: i64,
    pub co2_per_capita: f64,
    /// Trailing mean over up to `window` points; only set when `window > 1`.
    pub rolling_mean: Option<f64>,
}

/// Year-ordered emissions of a single country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySeries {
    pub country: String,
    pub start_year: i64,
    pub end_year: i64,
    pub window: usize,
    pub points: Vec<SeriesPoint>,
}

impl CountrySeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Suggested download name for an exported series.
pub fn export_file_name(country: &str, start_year: i64, end_year: i64) -> String {
    format!("co2_{country}_{start_year}_{end_year}.csv")
}

/// Stateless helpers over the canonical clean table.
pub struct DataProcessor;

impl DataProcessor {
    /// Smallest and largest year, or `None` for an empty table.
    pub fn year_bounds(df: &DataFrame) -> Result<Option<YearBounds>, ProcessorError> {
        let years = df.column(YEAR)?.i64()?;
        Ok(years
            .min()
            .zip(years.max())
            .map(|(min_year, max_year)| YearBounds { min_year, max_year }))
    }

    /// Sorted unique country names.
    pub fn countries(df: &DataFrame) -> Result<Vec<String>, ProcessorError> {
        let mut countries: Vec<String> = df
            .column(COUNTRY)?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        countries.sort();
        countries.dedup();
        Ok(countries)
    }

    /// Rows of one country inside `[start_year, end_year]`, sorted by year.
    ///
    /// Rows with a null target are skipped. A `window` above 1 adds a trailing
    /// rolling mean with a minimum of one observation.
    pub fn country_series(
        df: &DataFrame,
        country: &str,
        start_year: i64,
        end_year: i64,
        window: usize,
    ) -> Result<CountrySeries, ProcessorError> {
        if window == 0 {
            return Err(ProcessorError::InvalidWindow(window));
        }

        let filtered = df
            .clone()
            .lazy()
            .filter(
                col(COUNTRY)
                    .eq(lit(country))
                    .and(col(YEAR).gt_eq(lit(start_year)))
                    .and(col(YEAR).lt_eq(lit(end_year)))
                    .and(col(CO2).is_not_null()),
            )
            .collect()?;

        let years = filtered.column(YEAR)?.i64()?;
        let values = filtered.column(CO2)?.f64()?;
        let mut pairs: Vec<(i64, f64)> = years
            .into_iter()
            .zip(values)
            .filter_map(|(y, v)| Some((y?, v?)))
            .collect();
        // stable: duplicate years keep file order
        pairs.sort_by_key(|(year, _)| *year);

        let rolling: Vec<Option<f64>> = if window > 1 {
            rolling_mean(pairs.iter().map(|(_, v)| *v), window)
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; pairs.len()]
        };

        let points = pairs
            .into_iter()
            .zip(rolling)
            .map(|((year, co2_per_capita), rolling_mean)| SeriesPoint {
                year,
                co2_per_capita,
                rolling_mean,
            })
            .collect();

        Ok(CountrySeries {
            country: country.to_string(),
            start_year,
            end_year,
            window,
            points,
        })
    }

    /// Render a series as comma-separated text with a header row.
    pub fn series_to_csv(series: &CountrySeries) -> Result<String, ProcessorError> {
        let n = series.points.len();
        let mut columns = vec![
            Column::new(COUNTRY.into(), vec![series.country.as_str(); n]),
            Column::new(
                YEAR.into(),
                series.points.iter().map(|p| p.year).collect::<Vec<_>>(),
            ),
            Column::new(
                CO2.into(),
                series
                    .points
                    .iter()
                    .map(|p| p.co2_per_capita)
                    .collect::<Vec<_>>(),
            ),
        ];
        if series.window > 1 {
            columns.push(Column::new(
                "rolling_mean".into(),
                series
                    .points
                    .iter()
                    .map(|p| p.rolling_mean)
                    .collect::<Vec<_>>(),
            ));
        }

        let mut df = DataFrame::new(columns)?;
        let mut buf: Vec<u8> = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut df)?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Trailing mean over up to `window` values, defined from the first value on.
fn rolling_mean(values: impl Iterator<Item = f64>, window: usize) -> Vec<f64> {
    let values: Vec<f64> = values.collect();
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}
