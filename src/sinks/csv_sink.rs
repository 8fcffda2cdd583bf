use crate::aggregation::DailySummary;
use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 9] = [
    "city",
    "state",
    "country",
    "date",
    "avg_temp",
    "min_temp",
    "max_temp",
    "avg_humidity",
    "dominant_weather",
];

/// Write-as-you-go CSV output. Every row is flushed as soon as it is written so
/// an interrupted run keeps what it already produced.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        info!("Writing summaries to {}", path.display());
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write(&mut self, summary: &DailySummary) -> Result<()> {
        self.writer.serialize(summary)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to finish output file: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(city: &str, day: u32) -> DailySummary {
        DailySummary {
            city: city.to_string(),
            state: "Montana".to_string(),
            country: "US".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            avg_temp: 4.0,
            min_temp: 2.0,
            max_temp: 6.5,
            avg_humidity: 60.33,
            dominant_weather: "Rain".to_string(),
        }
    }

    #[test]
    fn header_only_when_nothing_written() {
        let sink = CsvSink::new(Vec::new()).unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();

        assert_eq!(
            out,
            "city,state,country,date,avg_temp,min_temp,max_temp,avg_humidity,dominant_weather\n"
        );
    }

    #[test]
    fn rows_follow_header_in_write_order() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.write(&summary("Glasgow", 1)).unwrap();
        sink.write(&summary("Bismarck", 2)).unwrap();
        assert_eq!(sink.rows_written(), 2);

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Glasgow,Montana,US,2024-01-01,4.0,2.0,6.5,60.33,Rain");
        assert_eq!(lines[2], "Bismarck,Montana,US,2024-01-02,4.0,2.0,6.5,60.33,Rain");
    }

    #[test]
    fn rows_are_on_disk_before_the_sink_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.write(&summary("Glasgow", 1)).unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.lines().count(), 2);
        assert!(on_disk.contains("Glasgow,Montana,US,2024-01-01"));
    }
}
