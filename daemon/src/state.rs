use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use tracing::{error, info};

/// Persisted preferences. Only the theme survives restarts; everything else
/// about a session is deliberately in-memory.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct StoredPrefs {
    theme: String,
    last_updated: chrono::DateTime<chrono::Utc>,
}

pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new() -> Self {
        let path = dirs::data_dir()
            .unwrap_or(PathBuf::from("/tmp"))
            .join("worldclock_prefs.json");
        Self { path }
    }

    /// Stored theme, or `None` when no preference was ever saved (follow
    /// the configured default in that case).
    pub fn load(&self) -> Option<bool> {
        if !self.path.exists() {
            return None;
        }
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<StoredPrefs>(&content) {
                Ok(prefs) => {
                    info!("restored theme preference: {}", prefs.theme);
                    Some(prefs.theme == "dark")
                }
                Err(e) => {
                    error!("Failed to parse preference file: {}", e);
                    None
                }
            },
            Err(e) => {
                error!("Failed to read preference file: {}", e);
                None
            }
        }
    }

    pub fn save(&self, dark: bool) {
        let prefs = StoredPrefs {
            theme: if dark { "dark" } else { "light" }.to_string(),
            last_updated: chrono::Utc::now(),
        };
        match serde_json::to_string(&prefs) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    error!("Failed to write preference file: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize preferences: {}", e),
        }
    }
}
