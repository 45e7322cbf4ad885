//! CSV Data Loader Module
//! Parses the local dataset file into a raw table and an NA-filtered clean table.

use super::{CO2, COUNTRY, YEAR};
use crate::config::{ColumnNames, DashboardConfig};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Target-column tokens read as missing, as pandas does by default.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Dataset file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Required column missing: {0}")]
    MissingColumn(String),
    #[error("Column {column:?} cannot be read as {expected}: {reason}")]
    InvalidColumn {
        column: String,
        expected: String,
        reason: String,
    },
    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// Result of a load: the clean table and the raw table it was derived from.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub clean: DataFrame,
    pub raw: DataFrame,
}

/// Reads the dataset with a fixed separator and column set.
#[derive(Debug, Clone)]
pub struct DataLoader {
    separator: u8,
    columns: ColumnNames,
}

impl DataLoader {
    pub fn new(separator: u8, columns: ColumnNames) -> Self {
        Self { separator, columns }
    }

    pub fn from_config(cfg: &DashboardConfig) -> Self {
        Self::new(cfg.separator_byte(), cfg.columns.clone())
    }

    /// Load the file at `path`.
    ///
    /// The raw table keeps file order and only the three required columns,
    /// renamed to `country`, `year` and `co2_per_capita`. With `drop_na` the
    /// clean table omits rows whose target value is null; otherwise it is a
    /// copy of the raw table.
    pub fn load(&self, path: &Path, drop_na: bool) -> Result<LoadedData, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let parsed = LazyCsvReader::new(path)
            .with_separator(self.separator)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        let raw = self.project(&parsed)?;
        let clean = if drop_na {
            raw.clone()
                .lazy()
                .filter(col(CO2).is_not_null())
                .collect()?
        } else {
            raw.clone()
        };

        info!(
            path = %path.display(),
            raw_rows = raw.height(),
            clean_rows = clean.height(),
            drop_na,
            "dataset loaded"
        );
        Ok(LoadedData { clean, raw })
    }

    /// Keep the required columns with their canonical names and types.
    fn project(&self, parsed: &DataFrame) -> Result<DataFrame, LoaderError> {
        let country = self.required(parsed, &self.columns.country, COUNTRY, &DataType::String)?;
        let year = self.required(parsed, &self.columns.year, YEAR, &DataType::Int64)?;
        let co2 = self.target(parsed)?;

        for (series, what) in [(&country, "country"), (&year, "year")] {
            if series.null_count() > 0 {
                let row = series
                    .is_null()
                    .into_iter()
                    .position(|v| v == Some(true))
                    .unwrap_or_default();
                return Err(LoaderError::MalformedRow {
                    row: row + 1,
                    reason: format!("missing {what}"),
                });
            }
        }

        debug!(columns = ?parsed.get_column_names(), "projected required columns");
        Ok(DataFrame::new(vec![
            Column::from(country),
            Column::from(year),
            Column::from(co2),
        ])?)
    }

    fn required(
        &self,
        parsed: &DataFrame,
        source: &str,
        target: &str,
        dtype: &DataType,
    ) -> Result<Series, LoaderError> {
        let column = parsed
            .column(source)
            .map_err(|_| LoaderError::MissingColumn(source.to_string()))?;
        let series = column
            .as_materialized_series()
            .strict_cast(dtype)
            .map_err(|e| LoaderError::InvalidColumn {
                column: source.to_string(),
                expected: dtype.to_string(),
                reason: e.to_string(),
            })?;
        Ok(series.with_name(target.into()))
    }

    /// The target column as nullable floats. NA tokens and NaN become null.
    fn target(&self, parsed: &DataFrame) -> Result<Series, LoaderError> {
        let source = &self.columns.co2;
        let column = parsed
            .column(source)
            .map_err(|_| LoaderError::MissingColumn(source.to_string()))?;

        let values: Vec<Option<f64>> = match column.dtype() {
            DataType::String => column
                .str()?
                .into_iter()
                .enumerate()
                .map(|(i, raw)| {
                    parse_target(raw).map_err(|reason| LoaderError::MalformedRow {
                        row: i + 1,
                        reason: format!("column {source:?}: {reason}"),
                    })
                })
                .collect::<Result<_, _>>()?,
            _ => {
                let cast = self.required(parsed, source, CO2, &DataType::Float64)?;
                cast.f64()?.into_iter().collect()
            }
        };

        let values: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Ok(Series::new(CO2.into(), values))
    }
}

fn parse_target(raw: Option<&str>) -> Result<Option<f64>, String> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };
    if NA_TOKENS.contains(&raw) {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("{raw:?} is not a number"))
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}
