//! Query Resolution Module
//! Turns untrusted request parameters into a clamped, ordered selection.

use crate::data::YearBounds;
use serde::Serialize;

/// Earliest default start year; older data is sparse.
pub const DEFAULT_START_FLOOR: i64 = 1950;
pub const DEFAULT_TOP_N: i64 = 10;
pub const MAX_TOP_N: i64 = 30;

/// Raw parameters as they arrive from a query string or form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub start_year: Option<String>,
    pub end_year: Option<String>,
    pub top_n: Option<String>,
    pub show_missing: Option<String>,
    pub show_raw: Option<String>,
}

/// Normalized selection, safe to pass to the aggregators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub start_year: i64,
    pub end_year: i64,
    pub top_n: i64,
    pub show_missing: bool,
    pub show_raw: bool,
}

impl QueryParams {
    /// Collect known keys from `key=value` pairs; unknown keys are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key {
                "start_year" => &mut params.start_year,
                "end_year" => &mut params.end_year,
                "top_n" => &mut params.top_n,
                "show_missing" => &mut params.show_missing,
                "show_raw" => &mut params.show_raw,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        params
    }

    /// Resolve against the years actually present in the data.
    ///
    /// Unparseable numbers fall back to their defaults, years are clamped to
    /// `bounds` and swapped when reversed, `top_n` is clamped to `1..=30`.
    /// Flags are on only for the literal `"1"`.
    pub fn resolve(&self, bounds: YearBounds) -> Selection {
        let YearBounds { min_year, max_year } = bounds;

        let mut start_year = int_param(
            self.start_year.as_deref(),
            min_year.max(DEFAULT_START_FLOOR),
            min_year,
            max_year,
        );
        let mut end_year = int_param(self.end_year.as_deref(), max_year, min_year, max_year);
        if start_year > end_year {
            std::mem::swap(&mut start_year, &mut end_year);
        }

        Selection {
            start_year,
            end_year,
            top_n: int_param(self.top_n.as_deref(), DEFAULT_TOP_N, 1, MAX_TOP_N),
            show_missing: flag(self.show_missing.as_deref()),
            show_raw: flag(self.show_raw.as_deref()),
        }
    }
}

fn int_param(raw: Option<&str>, default: i64, min: i64, max: i64) -> i64 {
    let value = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default);
    value.max(min).min(max)
}

fn flag(raw: Option<&str>) -> bool {
    raw == Some("1")
}
