use crate::data_sources::cities::City;
use crate::data_sources::http::HttpGet;
use log::{info, warn};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    lat: f64,
    lon: f64,
}

pub struct CoordinateResolver<'a> {
    http: &'a dyn HttpGet,
    url: &'a str,
    api_key: &'a str,
}

impl<'a> CoordinateResolver<'a> {
    pub fn new(http: &'a dyn HttpGet, url: &'a str, api_key: &'a str) -> Self {
        Self { http, url, api_key }
    }

    /// Looks up the best match for a city. A miss (bad status, no candidates,
    /// unreadable body, transport error) is `None`, never an error.
    pub async fn resolve(&self, city: &City) -> Option<Coordinates> {
        let params = [
            ("q", city.location_query()),
            ("limit", "1".to_string()),
            ("appid", self.api_key.to_string()),
        ];

        let response = match self.http.get(self.url, &params).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to get coordinates for {}: {}", city.name, e);
                return None;
            }
        };

        if !response.is_success() {
            warn!(
                "Failed to get coordinates for {} (status {})",
                city.name, response.status
            );
            return None;
        }

        let candidates: Vec<GeocodeCandidate> = match serde_json::from_str(&response.body) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Failed to get coordinates for {}: {}", city.name, e);
                return None;
            }
        };

        match candidates.into_iter().next() {
            Some(best) => {
                info!("Coordinates for {}: ({}, {})", city.name, best.lat, best.lon);
                Some(Coordinates {
                    lat: best.lat,
                    lon: best.lon,
                })
            }
            None => {
                warn!("Failed to get coordinates for {}", city.name);
                None
            }
        }
    }
}
