use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    // OpenWeather API Configuration
    pub api_key: String,
    pub geocode_url: String,
    pub historical_url: String,
    pub api_sleep: Duration,

    // Inputs and Outputs
    pub cities_file: String,
    pub historical_output_file: String,
    pub yesterday_output_file: String,
    pub historical_start_date: NaiveDate,
    pub historical_end_date: NaiveDate,

    // BigQuery Configuration
    pub table_id: String,
    pub bigquery_api_url: String,
    pub bigquery_access_token: String,

    // Logging Configuration
    pub log_level: String,
    pub run_log_file: String,
}

fn env_date(key: &str, fallback: NaiveDate) -> NaiveDate {
    env::var(key)
        .ok()
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
        .unwrap_or(fallback)
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
            geocode_url: env::var("OPENWEATHER_GEOCODE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org/geo/1.0/direct".to_string()),
            historical_url: env::var("OPENWEATHER_HISTORICAL_URL").unwrap_or_else(|_| {
                "https://api.openweathermap.org/data/3.0/onecall/timemachine".to_string()
            }),
            api_sleep: Duration::from_secs(
                env::var("API_SLEEP_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
            ),
            cities_file: env::var("CITIES_FILE").unwrap_or_else(|_| "cities.csv".to_string()),
            historical_output_file: env::var("HISTORICAL_OUTPUT_FILE")
                .unwrap_or_else(|_| "jan1_7_2024.csv".to_string()),
            yesterday_output_file: env::var("YESTERDAY_OUTPUT_FILE")
                .unwrap_or_else(|_| "yesterday_forecast.csv".to_string()),
            historical_start_date: env_date(
                "HISTORICAL_START_DATE",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            ),
            historical_end_date: env_date(
                "HISTORICAL_END_DATE",
                NaiveDate::from_ymd_opt(2024, 1, 7).unwrap_or_default(),
            ),
            table_id: env::var("BIGQUERY_TABLE_ID").unwrap_or_else(|_| {
                "open-weather-project.weather_data.oc_weather_data_forecast".to_string()
            }),
            bigquery_api_url: env::var("BIGQUERY_API_URL")
                .unwrap_or_else(|_| "https://bigquery.googleapis.com/bigquery/v2".to_string()),
            bigquery_access_token: env::var("GOOGLE_OAUTH_ACCESS_TOKEN").unwrap_or_default(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            run_log_file: env::var("RUN_LOG_FILE").unwrap_or_else(|_| "logs/runs.log".to_string()),
        }
    }
}

impl EtlConfig {
    pub fn from_env() -> Self {
        // config.env first, then .env as fallback
        dotenv::from_filename("config.env").ok();
        dotenv::dotenv().ok();
        Self::default()
    }

    /// Precondition for the local (file) entry point. The warehouse entry point
    /// does not call this.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("Env OPENWEATHER_API_KEY is missing.".to_string());
        }
        Ok(())
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
