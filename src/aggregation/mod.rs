pub mod day_aggregator;

pub use day_aggregator::{summarize_day, DailySummary};
