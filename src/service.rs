//! Dashboard Service Module
//! Cached entry points used by presentation layers.

use crate::cache::{CacheParam, ResultCache};
use crate::config::DashboardConfig;
use crate::data::{
    records, CountrySeries, DataLoader, DataProcessor, DatasetFetcher, LoadedData,
    ProcessorError, Record, YearBounds,
};
use crate::error::DashboardResult;
use crate::stats::{DatasetSummary, MissingCount, StatsCalculator, TopEmitters};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const OP_LOAD: &str = "load_data";
const OP_MISSING: &str = "missing_counts";
const OP_TOP: &str = "top_emitters";
const OP_SUMMARY: &str = "summary";

/// Owns the configuration, the fetcher, the loader and the result cache.
///
/// Construct one per process and share it (it is `Send + Sync`). Nothing is
/// downloaded until a method needs the dataset.
pub struct Co2Service {
    config: DashboardConfig,
    fetcher: DatasetFetcher,
    loader: DataLoader,
    cache: Arc<ResultCache>,
}

impl Co2Service {
    pub fn new(config: DashboardConfig) -> DashboardResult<Self> {
        Self::with_cache(config, Arc::new(ResultCache::new()))
    }

    pub fn with_cache(config: DashboardConfig, cache: Arc<ResultCache>) -> DashboardResult<Self> {
        let fetcher = DatasetFetcher::new(config.fetch_timeout())?;
        let loader = DataLoader::from_config(&config);
        Ok(Self {
            config,
            fetcher,
            loader,
            cache,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Download the dataset if the local copy is missing.
    pub fn ensure_dataset(&self) -> DashboardResult<PathBuf> {
        Ok(self
            .fetcher
            .ensure_local(&self.config.data_url, &self.config.local_path)?)
    }

    /// Clean and raw tables, fetched on first use and cached per `drop_na`.
    pub fn load_data(&self, drop_na: bool) -> DashboardResult<LoadedData> {
        self.cache.get_or_compute(
            OP_LOAD,
            &[self.path_param(), drop_na.into()],
            self.config.cache_ttl(),
            || {
                let path = self.ensure_dataset()?;
                Ok(self.loader.load(&path, drop_na)?)
            },
        )
    }

    pub fn missing_counts(&self) -> DashboardResult<Vec<MissingCount>> {
        self.cache.get_or_compute(
            OP_MISSING,
            &[self.path_param()],
            self.config.cache_ttl(),
            || {
                let data = self.load_data(true)?;
                Ok(StatsCalculator::missing_counts(&data.raw)?)
            },
        )
    }

    pub fn top_emitters(
        &self,
        start_year: i64,
        end_year: i64,
        top_n: i64,
    ) -> DashboardResult<TopEmitters> {
        self.cache.get_or_compute(
            OP_TOP,
            &[
                self.path_param(),
                start_year.into(),
                end_year.into(),
                top_n.into(),
            ],
            self.config.cache_ttl(),
            || {
                let data = self.load_data(true)?;
                let top = StatsCalculator::top_emitters(&data.clean, start_year, end_year, top_n)?;
                debug!(start_year, end_year, top_n, rows = top.len(), "top emitters computed");
                Ok(top)
            },
        )
    }

    /// Summary statistics of the clean table.
    pub fn summary(&self) -> DashboardResult<DatasetSummary> {
        self.cache.get_or_compute(
            OP_SUMMARY,
            &[self.path_param()],
            self.config.cache_ttl(),
            || {
                let data = self.load_data(true)?;
                Ok(StatsCalculator::describe(&data.clean)?)
            },
        )
    }

    pub fn year_bounds(&self) -> DashboardResult<Option<YearBounds>> {
        let data = self.load_data(true)?;
        Ok(DataProcessor::year_bounds(&data.clean)?)
    }

    pub fn countries(&self) -> DashboardResult<Vec<String>> {
        let data = self.load_data(true)?;
        Ok(DataProcessor::countries(&data.clean)?)
    }

    pub fn country_series(
        &self,
        country: &str,
        start_year: i64,
        end_year: i64,
        window: usize,
    ) -> DashboardResult<CountrySeries> {
        let data = self.load_data(true)?;
        Ok(DataProcessor::country_series(
            &data.clean,
            country,
            start_year,
            end_year,
            window,
        )?)
    }

    /// First `rows` rows of the raw table, nulls included, in file order.
    pub fn raw_preview(&self, rows: usize) -> DashboardResult<Vec<Record>> {
        let data = self.load_data(true)?;
        Ok(records(&data.raw.head(Some(rows))).map_err(ProcessorError::from)?)
    }

    /// Forget every cached result; the local file is kept.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    fn path_param(&self) -> CacheParam {
        CacheParam::Text(self.config.local_path.to_string_lossy().into_owned())
    }
}
