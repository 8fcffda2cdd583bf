use crate::aggregation::{summarize_day, DailySummary};
use crate::config::EtlConfig;
use crate::data_sources::{City, CoordinateResolver, HistoricalWeatherFetcher, HttpGet};
use crate::pipeline::throttle::Throttle;
use crate::pipeline::window::RunWindow;
use crate::sinks::warehouse::{clear_date, load_batch};
use crate::sinks::{CsvSink, SinkOutcome, TableId, Warehouse};
use anyhow::Result;
use chrono::NaiveDate;
use log::{error, info};
use std::io::Write;

/// Drives resolve -> fetch -> summarize for every (city, date) of a run, one
/// pair at a time.
pub struct WeatherEtl<'a> {
    resolver: CoordinateResolver<'a>,
    fetcher: HistoricalWeatherFetcher<'a>,
}

impl<'a> WeatherEtl<'a> {
    pub fn new(http: &'a dyn HttpGet, config: &'a EtlConfig) -> Self {
        Self {
            resolver: CoordinateResolver::new(http, &config.geocode_url, &config.api_key),
            fetcher: HistoricalWeatherFetcher::new(http, &config.historical_url, &config.api_key),
        }
    }

    /// `None` when the city can't be located, the provider has no data, or no
    /// observation is usable. None of these stop the run.
    pub async fn process_city_date(&self, city: &City, date: NaiveDate) -> Option<DailySummary> {
        let coords = self.resolver.resolve(city).await?;

        let observations = self.fetcher.fetch(coords, date).await;
        if observations.is_empty() {
            info!("No weather data for {} on {}", city.name, date);
            return None;
        }

        summarize_day(city, date, &observations)
    }

    /// Warehouse mode: clears `date` from the table, summarizes every city for
    /// that date and loads the batch in one insert.
    pub async fn run_single_day(
        &self,
        cities: &[City],
        date: NaiveDate,
        warehouse: &dyn Warehouse,
        table: &TableId,
    ) -> SinkOutcome {
        if let Err(e) = clear_date(warehouse, table, date).await {
            error!("Failed to delete rows for {} from {}: {}", date, table, e);
            return SinkOutcome::DeleteFailed;
        }

        let mut rows = Vec::new();
        for (idx, city) in cities.iter().enumerate() {
            info!("[{}/{}] {} - {}", idx + 1, cities.len(), city.name, date);
            if let Some(summary) = self.process_city_date(city, date).await {
                rows.push(summary);
            }
        }

        load_batch(warehouse, table, &rows).await
    }

    /// File mode: every summary goes to `sink` as soon as it exists. The
    /// throttle runs after each (city, date) pair whether or not it produced a row.
    pub async fn run_range<W: Write + Send>(
        &self,
        cities: &[City],
        window: &RunWindow,
        sink: &mut CsvSink<W>,
        throttle: &mut dyn Throttle,
    ) -> Result<usize> {
        info!(
            "Processing {} cities from {} to {} ({} days)",
            cities.len(),
            window.start(),
            window.end(),
            window.len()
        );

        for city in cities {
            for date in window.days() {
                if let Some(summary) = self.process_city_date(city, date).await {
                    sink.write(&summary)?;
                    info!("{} - {}", city.name, date);
                }

                throttle.pause().await;
            }
        }

        Ok(sink.rows_written())
    }
}
