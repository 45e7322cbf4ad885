//! End-to-end checks of the cached service over a local dataset file.

mod common;

use co2_explorer::cache::ManualClock;
use co2_explorer::data::Record;
use co2_explorer::query::QueryParams;
use co2_explorer::stats::EmitterRow;
use co2_explorer::{Co2Service, ErrorKind, ResultCache};
use common::{offline_config, TestServer, SAMPLE_CSV};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn service_with_file(tmp: &TempDir) -> Result<Co2Service, Box<dyn std::error::Error>> {
    let path = tmp.path().join("co2.csv");
    fs::write(&path, SAMPLE_CSV)?;
    Ok(Co2Service::new(offline_config(&path))?)
}

fn row(country: &str, mean_co2: f64) -> EmitterRow {
    EmitterRow {
        country: country.to_string(),
        mean_co2,
    }
}

#[test]
fn top_emitters_and_missing_counts() -> TestResult {
    let tmp = TempDir::new()?;
    let service = service_with_file(&tmp)?;

    let top = service.top_emitters(2000, 2001, 5)?;
    assert_eq!(top.rows, vec![row("C", 5.0), row("B", 3.0), row("A", 1.0)]);

    let missing = service.missing_counts()?;
    let got: Vec<(&str, usize)> = missing
        .iter()
        .map(|m| (m.country.as_str(), m.missing))
        .collect();
    assert_eq!(got, vec![("D", 2), ("A", 1)]);
    Ok(())
}

#[test]
fn empty_window_and_invalid_top_n() -> TestResult {
    let tmp = TempDir::new()?;
    let service = service_with_file(&tmp)?;

    assert!(service.top_emitters(2050, 2060, 5)?.is_empty());

    let err = service.top_emitters(2000, 2001, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[test]
fn results_are_cached_until_ttl() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("co2.csv");
    fs::write(&path, SAMPLE_CSV)?;

    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(ResultCache::with_clock(clock.clone()));
    let service = Co2Service::with_cache(offline_config(&path), cache)?;

    let before = service.top_emitters(2000, 2001, 5)?;

    // a changed file is not seen while the entries are fresh
    fs::write(&path, SAMPLE_CSV.replace("B;BBB;2000;3.0", "B;BBB;2000;30.0"))?;
    clock.advance(Duration::from_secs(599));
    assert_eq!(service.top_emitters(2000, 2001, 5)?, before);

    clock.advance(Duration::from_secs(1));
    let after = service.top_emitters(2000, 2001, 5)?;
    assert_eq!(after.rows[0], row("B", 30.0));
    Ok(())
}

#[test]
fn missing_file_with_unreachable_source_is_fetch_error() -> TestResult {
    let tmp = TempDir::new()?;
    let service = Co2Service::new(offline_config(&tmp.path().join("absent.csv")))?;

    let err = service.load_data(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(service.cache().is_empty());
    Ok(())
}

#[test]
fn first_load_downloads_through_service() -> TestResult {
    let server = TestServer::start(200, SAMPLE_CSV);
    let tmp = TempDir::new()?;
    let mut config = offline_config(&tmp.path().join("data").join("co2.csv"));
    config.data_url = server.url.clone();
    let service = Co2Service::new(config)?;

    assert_eq!(service.countries()?, vec!["A", "B", "C"]);
    service.invalidate();
    assert_eq!(service.load_data(false)?.clean.height(), 7);
    assert_eq!(server.hits(), 1);
    Ok(())
}

#[test]
fn helpers_over_clean_table() -> TestResult {
    let tmp = TempDir::new()?;
    let service = service_with_file(&tmp)?;

    let bounds = service.year_bounds()?.ok_or("no bounds")?;
    assert_eq!((bounds.min_year, bounds.max_year), (1990, 2001));

    let selection = QueryParams::from_pairs([("top_n", "2")]).resolve(bounds);
    assert_eq!((selection.start_year, selection.end_year), (1990, 2001));
    let top = service.top_emitters(selection.start_year, selection.end_year, selection.top_n)?;
    assert_eq!(top.rows, vec![row("C", 6.0), row("B", 3.0)]);

    let series = service.country_series("C", 1990, 2001, 2)?;
    let rolling: Vec<Option<f64>> = series.points.iter().map(|p| p.rolling_mean).collect();
    assert_eq!(rolling, vec![Some(7.0), Some(6.0)]);

    let summary = service.summary()?;
    assert_eq!(summary.rows, 4);
    assert_eq!(summary.country.unique, 3);

    assert_eq!(
        service.raw_preview(2)?,
        vec![Record::new("A", 2000, Some(1.0)), Record::new("A", 2001, None)]
    );
    Ok(())
}
