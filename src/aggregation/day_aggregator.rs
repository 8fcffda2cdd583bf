use crate::data_sources::{City, Observation};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One city's weather for one calendar day. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub city: String,
    pub state: String,
    pub country: String,
    pub date: NaiveDate,
    pub avg_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_humidity: f64,
    pub dominant_weather: String,
}

/// Condition label counts in first-seen order.
#[derive(Debug, Default)]
pub struct ConditionTally {
    counts: Vec<(String, u32)>,
}

impl ConditionTally {
    pub fn record(&mut self, label: &str) {
        match self.counts.iter_mut().find(|(seen, _)| seen == label) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((label.to_string(), 1)),
        }
    }

    pub fn count(&self, label: &str) -> u32 {
        self.counts
            .iter()
            .find(|(seen, _)| seen == label)
            .map_or(0, |(_, count)| *count)
    }

    /// The first label recorded, whatever its count. Empty when nothing was recorded.
    pub fn dominant(&self) -> String {
        self.counts
            .first()
            .map(|(label, _)| label.clone())
            .unwrap_or_default()
    }
}

/// Two decimal places, half-to-even on the exact binary value.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Reduces a day of observations to a summary. Temperature and humidity stats
/// use only observations carrying both; the condition tally uses every
/// observation with a label. `None` when no observation qualifies.
pub fn summarize_day(
    city: &City,
    date: NaiveDate,
    observations: &[Observation],
) -> Option<DailySummary> {
    let mut temps = Vec::with_capacity(observations.len());
    let mut humidities = Vec::with_capacity(observations.len());
    let mut tally = ConditionTally::default();

    for observation in observations {
        if let (Some(temp), Some(humidity)) = (observation.temperature, observation.humidity) {
            temps.push(temp);
            humidities.push(humidity);
        }
        if let Some(label) = observation.condition() {
            tally.record(label);
        }
    }

    if temps.is_empty() || humidities.is_empty() {
        info!(
            "No usable observations for {} on {} ({} received)",
            city.name,
            date,
            observations.len()
        );
        return None;
    }

    let min_temp = temps.iter().copied().fold(f64::INFINITY, f64::min);
    let max_temp = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let summary = DailySummary {
        city: city.name.clone(),
        state: city.state.clone(),
        country: city.country.clone(),
        date,
        avg_temp: round2(mean(&temps)),
        min_temp: round2(min_temp),
        max_temp: round2(max_temp),
        avg_humidity: round2(mean(&humidities)),
        dominant_weather: tally.dominant(),
    };

    debug!(
        "Summary for {} on {}: avg={:.2} min={:.2} max={:.2} humidity={:.2} weather={} ({}/{})",
        summary.city,
        summary.date,
        summary.avg_temp,
        summary.min_temp,
        summary.max_temp,
        summary.avg_humidity,
        summary.dominant_weather,
        tally.count(&summary.dominant_weather),
        observations.len()
    );

    Some(summary)
}
