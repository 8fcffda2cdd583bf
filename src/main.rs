mod aggregation;
mod config;
mod data_sources;
mod pipeline;
mod sinks;
mod utils;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use config::EtlConfig;
use data_sources::{read_cities, HttpGet, HttpJson, ReqwestHttp};
use log::{error, info};
use pipeline::{yesterday, FixedDelay, RunWindow, WeatherEtl};
use sinks::{BigQueryWarehouse, CsvSink, TableId};
use std::path::{Path, PathBuf};
use utils::RunLogger;

#[derive(Parser)]
#[command(name = "weather-etl")]
#[command(about = "Daily OpenWeather summaries per city, to CSV or BigQuery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a date range into a local CSV file
    Local {
        #[arg(long, value_enum)]
        mode: Mode,
        /// First day of a historical run (defaults to HISTORICAL_START_DATE)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of a historical run, inclusive (defaults to HISTORICAL_END_DATE)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Output CSV path (defaults depend on mode)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// City list CSV with city,state,country columns
        #[arg(long)]
        cities: Option<PathBuf>,
    },
    /// Replace yesterday's rows in the BigQuery table
    Warehouse {
        /// Opaque trigger payload from the scheduler, logged only
        #[arg(long)]
        trigger: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Daily,
    Historical,
}

/// Single-day entry point for scheduled invocation. Never fails; the returned
/// line says what happened.
async fn run_warehouse_day<H: HttpGet + HttpJson>(
    config: &EtlConfig,
    http: &H,
    date: NaiveDate,
    trigger: Option<&str>,
) -> String {
    if let Some(trigger) = trigger {
        let payload = serde_json::from_str::<serde_json::Value>(trigger)
            .unwrap_or_else(|_| serde_json::Value::String(trigger.to_string()));
        info!("Triggered with payload: {}", payload);
    }

    let table: TableId = match config.table_id.parse() {
        Ok(table) => table,
        Err(e) => {
            error!("{}", e);
            return e.to_string();
        }
    };

    let cities = match read_cities(Path::new(&config.cities_file)) {
        Ok(cities) => cities,
        Err(e) => {
            error!("{:#}", e);
            return format!("{:#}", e);
        }
    };

    let warehouse =
        BigQueryWarehouse::new(http, &config.bigquery_api_url, &config.bigquery_access_token);
    let etl = WeatherEtl::new(http, config);

    etl.run_single_day(&cities, date, &warehouse, &table)
        .await
        .to_string()
}

async fn run_local(
    config: &EtlConfig,
    mode: Mode,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<PathBuf>,
    cities: Option<PathBuf>,
) -> anyhow::Result<(RunWindow, String)> {
    let (window, default_output) = match mode {
        Mode::Historical => (
            RunWindow::new(
                start.unwrap_or(config.historical_start_date),
                end.unwrap_or(config.historical_end_date),
            )?,
            &config.historical_output_file,
        ),
        Mode::Daily => (
            RunWindow::single(yesterday(Local::now().date_naive())),
            &config.yesterday_output_file,
        ),
    };
    let output = output.unwrap_or_else(|| PathBuf::from(default_output));
    let cities_path = cities.unwrap_or_else(|| PathBuf::from(&config.cities_file));

    let mut sink = CsvSink::create(&output)?;
    let cities = read_cities(&cities_path)?;

    let http = ReqwestHttp::new();
    let etl = WeatherEtl::new(&http, config);
    let mut throttle = FixedDelay::new(config.api_sleep);

    let rows = etl
        .run_range(&cities, &window, &mut sink, &mut throttle)
        .await
        .with_context(|| format!("Failed writing {}", output.display()))?;
    sink.into_inner()?;

    info!("Saved to {}", output.display());
    Ok((window, format!("Saved {} rows to {}", rows, output.display())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EtlConfig::from_env();

    env_logger::Builder::from_default_env()
        .filter_level(config.log_filter())
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    let run_logger = RunLogger::new(&config.run_log_file);

    match cli.command {
        Commands::Local {
            mode,
            start,
            end,
            output,
            cities,
        } => {
            if let Err(e) = config.validate() {
                error!("{}", e);
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }

            let mode_name = format!("{:?}", mode).to_lowercase();
            info!("Running in {} mode", mode_name);
            match run_local(&config, mode, start, end, output, cities).await {
                Ok((window, outcome)) => {
                    run_logger.log_run(
                        &mode_name,
                        &window.start().to_string(),
                        &window.end().to_string(),
                        &outcome,
                    );
                    println!("{}", outcome);
                }
                Err(e) => {
                    run_logger.log_error(&mode_name, &e);
                    return Err(e);
                }
            }
        }
        Commands::Warehouse { trigger } => {
            let date = yesterday(Local::now().date_naive());
            info!("Running in warehouse mode for {}", date);
            let http = ReqwestHttp::new();
            let outcome = run_warehouse_day(&config, &http, date, trigger.as_deref()).await;
            let date = date.to_string();
            run_logger.log_run("warehouse", &date, &date, &outcome);
            println!("{}", outcome);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_sources::http::stub::StubHttp;

    const GEO: &str = "http://geo.test/direct";
    const WEATHER: &str = "http://weather.test/timemachine";
    const QUERY: &str = "http://bq.test/v2/projects/open-weather-project/queries";
    const INSERT: &str = "http://bq.test/v2/projects/open-weather-project/datasets/weather_data/tables/oc_weather_data_forecast/insertAll";

    fn config(cities_file: &Path) -> EtlConfig {
        EtlConfig {
            api_key: "test_key".to_string(),
            geocode_url: GEO.to_string(),
            historical_url: WEATHER.to_string(),
            cities_file: cities_file.display().to_string(),
            table_id: "open-weather-project.weather_data.oc_weather_data_forecast".to_string(),
            bigquery_api_url: "http://bq.test/v2".to_string(),
            bigquery_access_token: "secret".to_string(),
            ..EtlConfig::default()
        }
    }

    #[tokio::test]
    async fn warehouse_day_uses_the_given_date_throughout() {
        let dir = tempfile::tempdir().unwrap();
        let cities_file = dir.path().join("cities.csv");
        std::fs::write(&cities_file, "city,state,country\nGlasgow,Montana,US\n").unwrap();
        let http = StubHttp::default()
            .with(GEO, 200, r#"[{"lat":48.2,"lon":-106.6}]"#)
            .with(
                WEATHER,
                200,
                r#"{"data":[{"temp":2,"humidity":60,"weather":[{"main":"Rain"}]}]}"#,
            )
            .with(QUERY, 200, r#"{"jobComplete":true,"numDmlAffectedRows":"0"}"#)
            .with(INSERT, 200, "{}");
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();

        let outcome = run_warehouse_day(&config(&cities_file), &http, date, Some("{}")).await;

        assert_eq!(
            outcome,
            "Inserted 1 rows into open-weather-project.weather_data.oc_weather_data_forecast"
        );
        assert_eq!(
            http.last_body(QUERY)["queryParameters"][0]["parameterValue"]["value"],
            "2023-12-31"
        );
        assert!(http
            .last_params(WEATHER)
            .contains(&("dt".to_string(), "1703980800".to_string())));
        assert_eq!(http.last_body(INSERT)["rows"][0]["json"]["date"], "2023-12-31");
    }

    #[tokio::test]
    async fn warehouse_day_reports_missing_city_list() {
        let http = StubHttp::default();
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();

        let outcome = run_warehouse_day(
            &config(Path::new("/nonexistent/cities.csv")),
            &http,
            date,
            None,
        )
        .await;

        assert!(outcome.starts_with("Failed to open city list"));
        assert_eq!(http.calls_to(QUERY), 0);
    }
}
