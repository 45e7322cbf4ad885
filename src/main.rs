//! CO2 Explorer - command line front end
//!
//! Thin composition layer: configure, make sure the dataset is on disk, then
//! answer one query and print it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use co2_explorer::data::{export_file_name, DataProcessor};
use co2_explorer::query::QueryParams;
use co2_explorer::{Co2Service, DashboardConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "co2_explorer", about = "Explore per-capita CO2 emissions")]
struct Cli {
    /// Optional JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Countries with the highest average CO2 per capita
    Top {
        #[arg(long)]
        start_year: Option<String>,
        #[arg(long)]
        end_year: Option<String>,
        #[arg(long)]
        top_n: Option<String>,
    },
    /// Countries with missing CO2 values
    Missing,
    /// Summary statistics of the clean table
    Summary,
    /// All countries in the dataset
    Countries,
    /// First rows of the raw table, missing values included
    Preview {
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
    /// Yearly values of one country
    Series {
        country: String,
        #[arg(long)]
        start_year: Option<i64>,
        #[arg(long)]
        end_year: Option<i64>,
        /// Rolling mean window in years
        #[arg(long, default_value_t = 1)]
        window: usize,
        /// Write the series as CSV into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let service = Co2Service::new(config).context("starting service")?;
    service.ensure_dataset().context("fetching dataset")?;

    match cli.command {
        Command::Top {
            start_year,
            end_year,
            top_n,
        } => {
            let bounds = service
                .year_bounds()?
                .context("dataset has no rows with CO2 values")?;
            let selection = QueryParams {
                start_year,
                end_year,
                top_n,
                ..QueryParams::default()
            }
            .resolve(bounds);
            let top = service.top_emitters(selection.start_year, selection.end_year, selection.top_n)?;
            if cli.json {
                return print_json(&top);
            }
            if top.is_empty() {
                println!("No data in the selected year range.");
            }
            for (rank, row) in top.rows.iter().enumerate() {
                println!("{:>3}. {:<40} {:>10.3}", rank + 1, row.country, row.mean_co2);
            }
        }
        Command::Missing => {
            let counts = service.missing_counts()?;
            if cli.json {
                return print_json(&counts);
            }
            if counts.is_empty() {
                println!("No missing CO2 values in dataset.");
            }
            for m in &counts {
                println!("{:<40} {:>6}", m.country, m.missing);
            }
        }
        Command::Summary => {
            let summary = service.summary()?;
            if cli.json {
                return print_json(&summary);
            }
            println!("rows: {}", summary.rows);
            println!(
                "countries: {} unique, most frequent {:?} ({} rows)",
                summary.country.unique, summary.country.top, summary.country.freq
            );
            let s = &summary.co2_per_capita;
            println!(
                "co2 per capita: mean {:.3} std {:.3} min {:.3} p25 {:.3} median {:.3} p75 {:.3} max {:.3}",
                s.mean, s.std, s.min, s.p25, s.median, s.p75, s.max
            );
        }
        Command::Countries => {
            let countries = service.countries()?;
            if cli.json {
                return print_json(&countries);
            }
            for c in &countries {
                println!("{c}");
            }
        }
        Command::Preview { rows } => {
            let preview = service.raw_preview(rows)?;
            if cli.json {
                return print_json(&preview);
            }
            for r in &preview {
                match r.co2_per_capita {
                    Some(v) => println!("{:<40} {} {:>10.3}", r.country, r.year, v),
                    None => println!("{:<40} {} {:>10}", r.country, r.year, "-"),
                }
            }
        }
        Command::Series {
            country,
            start_year,
            end_year,
            window,
            export_dir,
        } => {
            let bounds = service
                .year_bounds()?
                .context("dataset has no rows with CO2 values")?;
            let start = start_year.unwrap_or(bounds.min_year);
            let end = end_year.unwrap_or(bounds.max_year);
            let series = service.country_series(&country, start, end, window)?;

            if let Some(dir) = export_dir {
                if !series.is_empty() {
                    let path = dir.join(export_file_name(&country, start, end));
                    std::fs::write(&path, DataProcessor::series_to_csv(&series)?)
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!("wrote {}", path.display());
                }
            }
            if cli.json {
                return print_json(&series);
            }
            if series.is_empty() {
                println!("No data available for the selected filters.");
            }
            for p in &series.points {
                match p.rolling_mean {
                    Some(r) => println!("{} {:>10.3} {:>10.3}", p.year, p.co2_per_capita, r),
                    None => println!("{} {:>10.3}", p.year, p.co2_per_capita),
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
