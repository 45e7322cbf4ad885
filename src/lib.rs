//! CO2 Explorer - dataset access & aggregation service
//!
//! Downloads the CO2-per-capita CSV once, cleans it, and answers a fixed set
//! of aggregate queries through a time-bounded result cache.

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod query;
pub mod service;
pub mod stats;

pub use cache::{CacheParam, ResultCache};
pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult, ErrorKind};
pub use service::Co2Service;
