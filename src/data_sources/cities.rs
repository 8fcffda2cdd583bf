use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(rename = "city")]
    pub name: String,
    #[serde(default)]
    pub state: String,
    pub country: String,
}

impl City {
    pub fn new(name: &str, state: &str, country: &str) -> Self {
        Self {
            name: name.to_string(),
            state: state.to_string(),
            country: country.to_string(),
        }
    }

    /// Free-text geocoding query: `city,state,country`, or `city,country` when
    /// the state is empty.
    pub fn location_query(&self) -> String {
        if self.state.is_empty() {
            format!("{},{}", self.name, self.country)
        } else {
            format!("{},{},{}", self.name, self.state, self.country)
        }
    }
}

pub fn read_cities(path: &Path) -> Result<Vec<City>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open city list {}", path.display()))?;
    let cities = parse_cities(file)?;
    info!("Loaded {} cities from {}", cities.len(), path.display());
    Ok(cities)
}

pub fn parse_cities<R: Read>(reader: R) -> Result<Vec<City>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut cities = Vec::new();
    for row in reader.deserialize() {
        let city: City = row.context("Malformed row in city list")?;
        cities.push(city);
    }
    Ok(cities)
}
