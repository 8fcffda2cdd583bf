use crate::data_sources::geocoding::Coordinates;
use crate::data_sources::http::HttpGet;
use chrono::{NaiveDate, NaiveTime};
use log::{error, info};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
struct TimemachineResponse {
    #[serde(default)]
    data: Vec<Observation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub main: String,
}

/// One reading from the timemachine endpoint. Every field may be missing or null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Observation {
    #[serde(rename = "temp")]
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub weather: Vec<Condition>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Condition>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Condition>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Observation {
    /// Primary condition label, taken from the first `weather` entry.
    pub fn condition(&self) -> Option<&str> {
        self.weather
            .first()
            .map(|c| c.main.as_str())
            .filter(|main| !main.is_empty())
    }
}

/// Unix timestamp of UTC midnight on `date`.
pub fn utc_midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

pub struct HistoricalWeatherFetcher<'a> {
    http: &'a dyn HttpGet,
    url: &'a str,
    api_key: &'a str,
}

impl<'a> HistoricalWeatherFetcher<'a> {
    pub fn new(http: &'a dyn HttpGet, url: &'a str, api_key: &'a str) -> Self {
        Self { http, url, api_key }
    }

    /// Observations for the UTC day starting at midnight of `date`. Any failure
    /// degrades to an empty list.
    pub async fn fetch(&self, coords: Coordinates, date: NaiveDate) -> Vec<Observation> {
        let params = [
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("dt", utc_midnight_timestamp(date).to_string()),
            ("units", "metric".to_string()),
            ("appid", self.api_key.to_string()),
        ];

        let response = match self.http.get(self.url, &params).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error fetching weather data: {}", e);
                return Vec::new();
            }
        };

        if !response.is_success() {
            error!(
                "Error fetching weather data: {}, {}",
                response.status, response.body
            );
            return Vec::new();
        }

        match serde_json::from_str::<TimemachineResponse>(&response.body) {
            Ok(parsed) => {
                info!(
                    "  Fetched {} observations at ({}, {}) for {}",
                    parsed.data.len(),
                    coords.lat,
                    coords.lon,
                    date
                );
                parsed.data
            }
            Err(e) => {
                error!("Failed to parse API response: {}", e);
                Vec::new()
            }
        }
    }
}
