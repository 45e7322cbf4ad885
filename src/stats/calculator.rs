//! Statistics Calculator Module
//! Missing-value counts, top-N country averages and descriptive summaries.

use crate::data::{CO2, COUNTRY, YEAR};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("top_n must be at least 1, got {0}")]
    InvalidTopN(i64),
    #[error("Table does not have the expected columns: {0}")]
    Schema(#[from] PolarsError),
}

/// Number of rows without a target value for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingCount {
    pub country: String,
    pub missing: usize,
}

/// Average target value of one country over a year window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmitterRow {
    pub country: String,
    pub mean_co2: f64,
}

/// Ranked result of a top-emitters query. Empty means no data in the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopEmitters {
    pub start_year: i64,
    pub end_year: i64,
    pub rows: Vec<EmitterRow>,
}

impl TopEmitters {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Two-column frame (`country`, `co2_per_capita`); same shape when empty.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let countries: Vec<&str> = self.rows.iter().map(|r| r.country.as_str()).collect();
        let means: Vec<f64> = self.rows.iter().map(|r| r.mean_co2).collect();
        DataFrame::new(vec![
            Column::new(COUNTRY.into(), countries),
            Column::new(CO2.into(), means),
        ])
    }
}

/// Descriptive statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl Default for NumericSummary {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            median: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Summary of the country column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub count: usize,
    pub unique: usize,
    /// Most frequent value; ties go to the value seen first.
    pub top: Option<String>,
    pub freq: usize,
}

/// Whole-table overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub country: CategorySummary,
    pub year: NumericSummary,
    pub co2_per_capita: NumericSummary,
}

/// Pure aggregation functions over canonical tables.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Count null (or NaN) targets per country.
    ///
    /// Countries without missing values are dropped. The result is sorted by
    /// count, largest first; equal counts keep first-encounter order.
    pub fn missing_counts(raw: &DataFrame) -> Result<Vec<MissingCount>, AggregateError> {
        let countries = raw.column(COUNTRY)?.str()?;
        let values = raw.column(CO2)?.f64()?;

        let mut order: Vec<MissingCount> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for (country, value) in countries.into_iter().zip(values) {
            let Some(country) = country else {
                continue;
            };
            let slot = *index.entry(country).or_insert_with(|| {
                order.push(MissingCount {
                    country: country.to_string(),
                    missing: 0,
                });
                order.len() - 1
            });
            if value.map_or(true, f64::is_nan) {
                order[slot].missing += 1;
            }
        }

        order.retain(|m| m.missing > 0);
        // sort_by is stable
        order.sort_by(|a, b| b.missing.cmp(&a.missing));
        Ok(order)
    }

    /// Average target per country over `[start_year, end_year]`, best `top_n`.
    ///
    /// Nulls and NaN are ignored in the mean; a country with no value in the window is
    /// left out. Equal means are ordered by country name.
    pub fn top_emitters(
        table: &DataFrame,
        start_year: i64,
        end_year: i64,
        top_n: i64,
    ) -> Result<TopEmitters, AggregateError> {
        if top_n <= 0 {
            return Err(AggregateError::InvalidTopN(top_n));
        }

        let countries = table.column(COUNTRY)?.str()?;
        let years = table.column(YEAR)?.i64()?;
        let values = table.column(CO2)?.f64()?;

        let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
        for ((country, year), value) in countries.into_iter().zip(years).zip(values) {
            let (Some(country), Some(year), Some(value)) = (country, year, value) else {
                continue;
            };
            if year < start_year || year > end_year || value.is_nan() {
                continue;
            }
            let acc = sums.entry(country).or_insert((0.0, 0));
            acc.0 += value;
            acc.1 += 1;
        }

        let mut rows: Vec<EmitterRow> = sums
            .into_iter()
            .map(|(country, (sum, n))| EmitterRow {
                country: country.to_string(),
                mean_co2: sum / n as f64,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.mean_co2
                .total_cmp(&a.mean_co2)
                .then_with(|| a.country.cmp(&b.country))
        });
        rows.truncate(usize::try_from(top_n).unwrap_or(usize::MAX));

        Ok(TopEmitters {
            start_year,
            end_year,
            rows,
        })
    }

    /// Summary of country, year and target columns of a table.
    pub fn describe(table: &DataFrame) -> Result<DatasetSummary, AggregateError> {
        let countries = table.column(COUNTRY)?.str()?;
        let years: Vec<f64> = table
            .column(YEAR)?
            .i64()?
            .into_iter()
            .flatten()
            .map(|y| y as f64)
            .collect();
        let values: Vec<f64> = table.column(CO2)?.f64()?.into_iter().flatten().collect();

        let mut freq: Vec<(&str, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut count = 0;
        for country in countries.into_iter().flatten() {
            count += 1;
            let slot = *index.entry(country).or_insert_with(|| {
                freq.push((country, 0));
                freq.len() - 1
            });
            freq[slot].1 += 1;
        }
        let top = freq
            .iter()
            .fold(None::<(&str, usize)>, |best, &(name, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((name, n)),
            });

        Ok(DatasetSummary {
            rows: table.height(),
            country: CategorySummary {
                count,
                unique: freq.len(),
                top: top.map(|(name, _)| name.to_string()),
                freq: top.map(|(_, n)| n).unwrap_or(0),
            },
            year: Self::compute_descriptive_stats(&years),
            co2_per_capita: Self::compute_descriptive_stats(&values),
        })
    }

    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> NumericSummary {
        let n = values.len();
        if n == 0 {
            return NumericSummary::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            f64::NAN
        };

        NumericSummary {
            count: n,
            mean,
            std: variance.sqrt(),
            min: sorted[0],
            p25: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            p75: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{table_from_records, Record};

    fn raw() -> DataFrame {
        table_from_records(&[
            Record::new("A", 2000, Some(1.0)),
            Record::new("A", 2001, None),
            Record::new("B", 2000, Some(3.0)),
        ])
        .unwrap()
    }

    fn clean() -> DataFrame {
        table_from_records(&[
            Record::new("A", 2000, Some(1.0)),
            Record::new("B", 2000, Some(3.0)),
        ])
        .unwrap()
    }

    fn row(country: &str, mean_co2: f64) -> EmitterRow {
        EmitterRow {
            country: country.to_string(),
            mean_co2,
        }
    }

    #[test]
    fn missing_counts_of_worked_example() {
        let counts = StatsCalculator::missing_counts(&raw()).unwrap();
        assert_eq!(
            counts,
            vec![MissingCount {
                country: "A".to_string(),
                missing: 1
            }]
        );
    }

    #[test]
    fn missing_counts_sorted_with_stable_ties() {
        let table = table_from_records(&[
            Record::new("C", 2000, None),
            Record::new("A", 2000, None),
            Record::new("B", 2000, None),
            Record::new("B", 2001, None),
            Record::new("D", 2000, Some(1.0)),
        ])
        .unwrap();

        let counts = StatsCalculator::missing_counts(&table).unwrap();
        let got: Vec<(&str, usize)> = counts.iter().map(|m| (m.country.as_str(), m.missing)).collect();
        assert_eq!(got, vec![("B", 2), ("C", 1), ("A", 1)]);
        assert_eq!(counts.iter().map(|m| m.missing).sum::<usize>(), 4);
    }

    #[test]
    fn top_emitters_of_worked_example() {
        let top = StatsCalculator::top_emitters(&clean(), 2000, 2001, 5).unwrap();
        assert_eq!(top.rows, vec![row("B", 3.0), row("A", 1.0)]);
    }

    #[test]
    fn empty_window_is_empty_not_error() {
        let top = StatsCalculator::top_emitters(&clean(), 2050, 2060, 5).unwrap();
        assert!(top.is_empty());

        let frame = top.to_dataframe().unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(frame.width(), 2);
        assert!(frame.column(COUNTRY).is_ok() && frame.column(CO2).is_ok());
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let err = StatsCalculator::top_emitters(&clean(), 2000, 2001, 0).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidTopN(0)));
        assert!(StatsCalculator::top_emitters(&clean(), 2000, 2001, -3).is_err());
    }

    #[test]
    fn ties_break_on_country_name_and_truncate() {
        let table = table_from_records(&[
            Record::new("Zed", 2000, Some(2.0)),
            Record::new("Bee", 2000, Some(2.0)),
            Record::new("Ant", 2000, Some(2.0)),
            Record::new("Cat", 2000, Some(5.0)),
        ])
        .unwrap();

        let top = StatsCalculator::top_emitters(&table, 2000, 2000, 3).unwrap();
        assert_eq!(top.rows, vec![row("Cat", 5.0), row("Ant", 2.0), row("Bee", 2.0)]);
    }

    #[test]
    fn window_bounds_are_inclusive_and_means_non_increasing() {
        let table = table_from_records(&[
            Record::new("A", 1999, Some(100.0)),
            Record::new("A", 2000, Some(2.0)),
            Record::new("A", 2002, Some(4.0)),
            Record::new("B", 2001, Some(1.0)),
            Record::new("C", 2002, Some(8.0)),
            Record::new("C", 2003, Some(100.0)),
        ])
        .unwrap();

        let top = StatsCalculator::top_emitters(&table, 2000, 2002, 10).unwrap();
        assert_eq!(top.rows, vec![row("C", 8.0), row("A", 3.0), row("B", 1.0)]);
        assert!(top.rows.windows(2).all(|w| w[0].mean_co2 >= w[1].mean_co2));
        assert!(top.len() <= 10);
    }

    #[test]
    fn disjoint_windows_agree_with_union() {
        let table = table_from_records(&[
            Record::new("A", 2000, Some(1.0)),
            Record::new("A", 2001, Some(3.0)),
            Record::new("A", 2010, Some(8.0)),
            Record::new("B", 2011, Some(6.0)),
        ])
        .unwrap();

        let early = StatsCalculator::top_emitters(&table, 2000, 2005, 10).unwrap();
        let late = StatsCalculator::top_emitters(&table, 2006, 2015, 10).unwrap();
        let all = StatsCalculator::top_emitters(&table, 2000, 2015, 10).unwrap();

        // A: (2 * 2.0 + 1 * 8.0) / 3
        let a_all = all.rows.iter().find(|r| r.country == "A").unwrap();
        assert!((a_all.mean_co2 - 4.0).abs() < 1e-12);
        assert_eq!(early.rows, vec![row("A", 2.0)]);

        // B only has rows in the late window
        let b_late = late.rows.iter().find(|r| r.country == "B").unwrap();
        let b_all = all.rows.iter().find(|r| r.country == "B").unwrap();
        assert_eq!(b_late, b_all);
    }

    #[test]
    fn describe_summarises_columns() {
        let summary = StatsCalculator::describe(&raw()).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.country.count, 3);
        assert_eq!(summary.country.unique, 2);
        assert_eq!(summary.country.top.as_deref(), Some("A"));
        assert_eq!(summary.country.freq, 2);
        assert_eq!(summary.co2_per_capita.count, 2);
        assert_eq!(summary.co2_per_capita.mean, 2.0);
        assert_eq!(summary.year.max, 2001.0);
    }

    #[test]
    fn percentiles_interpolate() {
        let stats = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.p25, 1.75);
        assert_eq!(stats.p75, 3.25);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn nan_values_count_as_missing_and_skip_means() {
        let table = table_from_records(&[
            Record::new("A", 2000, Some(1.0)),
            Record::new("A", 2001, Some(f64::NAN)),
            Record::new("B", 2000, Some(3.0)),
            Record::new("C", 2000, Some(f64::NAN)),
            Record::new("D", 2000, Some(2.0)),
        ])
        .unwrap();

        let top = StatsCalculator::top_emitters(&table, 2000, 2001, 10).unwrap();
        assert_eq!(top.rows, vec![row("B", 3.0), row("D", 2.0), row("A", 1.0)]);
        assert!(top.rows.windows(2).all(|w| w[0].mean_co2 >= w[1].mean_co2));

        let counts = StatsCalculator::missing_counts(&table).unwrap();
        let got: Vec<(&str, usize)> = counts.iter().map(|m| (m.country.as_str(), m.missing)).collect();
        assert_eq!(got, vec![("A", 1), ("C", 1)]);
    }

    #[test]
    fn huge_top_n_keeps_every_row() {
        let top = StatsCalculator::top_emitters(&clean(), 2000, 2001, i64::MAX).unwrap();
        assert_eq!(top.len(), 2);
    }
}
