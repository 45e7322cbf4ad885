//! Dataset Configuration Module
//! Fixed source location, CSV layout and cache settings.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATA_URL: &str = "https://storage.googleapis.com/schoolofdata-datasets/Data-Analysis.Data-Visualization/CO2_per_capita.csv";
pub const DEFAULT_LOCAL_PATH: &str = "data/CO2_per_capita.csv";
pub const DEFAULT_SEPARATOR: char = ';';
pub const DEFAULT_COUNTRY_COLUMN: &str = "Country Name";
pub const DEFAULT_YEAR_COLUMN: &str = "Year";
pub const DEFAULT_CO2_COLUMN: &str = "CO2 Per Capita (metric tons)";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Names of the three columns every dataset file must carry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub country: String,
    pub year: String,
    pub co2: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            country: DEFAULT_COUNTRY_COLUMN.to_string(),
            year: DEFAULT_YEAR_COLUMN.to_string(),
            co2: DEFAULT_CO2_COLUMN.to_string(),
        }
    }
}

/// Everything the service needs to locate, parse and cache the dataset.
///
/// Values come from built-in defaults, then an optional JSON file, then
/// `CO2_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_url: String,
    pub local_path: PathBuf,
    pub separator: char,
    pub columns: ColumnNames,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_DATA_URL.to_string(),
            local_path: PathBuf::from(DEFAULT_LOCAL_PATH),
            separator: DEFAULT_SEPARATOR,
            columns: ColumnNames::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl DashboardConfig {
    /// Load configuration: optional JSON file first, then environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = match file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        cfg.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `CO2_*` overrides looked up through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CO2_DATA_URL") {
            self.data_url = url;
        }
        if let Some(path) = lookup("CO2_LOCAL_PATH") {
            self.local_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("CO2_CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse_secs("CO2_CACHE_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("CO2_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_secs("CO2_FETCH_TIMEOUT_SECS", &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// The separator as the single byte the CSV reader expects.
    pub fn separator_byte(&self) -> u8 {
        // validate() guarantees an ASCII separator
        self.separator as u8
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.separator.is_ascii() || self.separator == '"' {
            return Err(ConfigError::InvalidValue {
                key: "separator".to_string(),
                value: self.separator.to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
