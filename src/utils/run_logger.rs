use chrono::Utc;
use log::{error, info};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Appends one JSON line per finished run to an audit file next to the
/// regular log output.
pub struct RunLogger {
    path: PathBuf,
}

impl RunLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn log_run(&self, mode: &str, start: &str, end: &str, outcome: &str) {
        let run_data = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "mode": mode,
            "start": start,
            "end": end,
            "outcome": outcome,
        });

        info!("RUN COMPLETE: {}", run_data);
        self.append(&run_data);
    }

    pub fn log_error(&self, mode: &str, err: &anyhow::Error) {
        let error_data = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "mode": mode,
            "error": format!("{:#}", err),
        });

        error!("RUN FAILED: {}", error_data);
        self.append(&error_data);
    }

    fn append(&self, record: &serde_json::Value) {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(dir) {
                error!("Error creating {}: {}", dir.display(), e);
                return;
            }
        }

        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", record) {
                    error!("Error writing to {}: {}", self.path.display(), e);
                }
            }
            Err(e) => error!("Error opening {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("runs.log");
        let logger = RunLogger::new(&path);

        logger.log_run("historical", "2024-01-01", "2024-01-07", "Saved 14 rows");
        logger.log_error("daily", &anyhow::anyhow!("Failed to open city list"));

        let contents = fs::read_to_string(&path).unwrap();
        let records: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["mode"], "historical");
        assert_eq!(records[0]["outcome"], "Saved 14 rows");
        assert_eq!(records[1]["error"], "Failed to open city list");
    }
}
