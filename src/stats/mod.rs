//! Stats module - aggregations over the dataset tables

mod calculator;

pub use calculator::{
    AggregateError, CategorySummary, DatasetSummary, EmitterRow, MissingCount, NumericSummary,
    StatsCalculator, TopEmitters,
};
