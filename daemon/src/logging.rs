use std::fs::OpenOptions;
use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::Serialize;
use anyhow::Result;

#[derive(Serialize)]
struct EventRow {
    timestamp: DateTime<Utc>,
    event_type: String, // "add", "remove", "set_time", "reset_time", "theme"
    detail: String,
    location_count: usize,
}

/// Appends user intents to a CSV history file in the data directory.
pub struct EventLogger {
    file_path: PathBuf,
}

impl EventLogger {
    pub fn new() -> Self {
        let path = dirs::data_dir()
            .unwrap_or(PathBuf::from("/tmp"))
            .join("worldclock_history.csv");

        Self { file_path: path }
    }

    pub fn log(&self, event_type: &str, detail: &str, location_count: usize) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(file.metadata()?.len() == 0) // Write headers if empty
            .from_writer(file);

        wtr.serialize(EventRow {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            detail: detail.to_string(),
            location_count,
        })?;

        wtr.flush()?;
        Ok(())
    }
}
