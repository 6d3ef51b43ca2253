//! User settings stored as settings.json in the app data directory

use crate::constants::*;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// How photos are distributed over the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowType {
    /// Every row newest first
    Newest,
    /// Every row from one shuffled list
    Random,
    /// First row newest, the rest shuffled from what is left
    #[default]
    #[serde(alias = "wife")]
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Dropbox
    pub access_token: Option<String>,
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub folder: String,
    pub extensions: Vec<String>,
    pub api_base_url: String,
    pub content_base_url: String,

    // Layout
    pub images_per_row: usize,
    pub images_margin: u32,
    pub number_of_rows: usize,
    pub row_type: RowType,

    // Polling
    pub refresh_interval_secs: u64,
    pub update_interval_secs: u64,
    pub initial_load_delay_secs: u64,

    // Paths
    pub cache_dir: Option<String>,

    // Window geometry
    pub window_w: Option<f32>,
    pub window_h: Option<f32>,
    pub fullscreen: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            access_token: None,
            app_key: None,
            app_secret: None,
            folder: String::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            api_base_url: DROPBOX_API_URL.to_string(),
            content_base_url: DROPBOX_CONTENT_URL.to_string(),
            images_per_row: 4,
            images_margin: 10,
            number_of_rows: 2,
            row_type: RowType::Hybrid,
            refresh_interval_secs: 6 * 60 * 60,
            update_interval_secs: 5 * 60,
            initial_load_delay_secs: 0,
            cache_dir: None,
            window_w: None,
            window_h: None,
            fullscreen: false,
        }
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let settings = match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<Settings>(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        };
        settings.normalized()
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join(SETTINGS_FILE);
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }

    /// Clamp values that have an obvious safe fallback
    fn normalized(mut self) -> Self {
        if self.number_of_rows < 1 {
            warn!(rows = self.number_of_rows, "number_of_rows below 1, showing one row");
            self.number_of_rows = 1;
        }
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.images_per_row == 0 {
            return Err(SyncError::Config("images_per_row must be at least 1".into()));
        }
        if self.refresh_interval_secs == 0 || self.update_interval_secs == 0 {
            return Err(SyncError::Config("polling intervals must be non-zero".into()));
        }
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(SyncError::Config("at least one file extension is required".into()));
        }
        Ok(())
    }

    /// Folder as Dropbox expects it: lowercase, rooted, empty for the root
    pub fn folder_path(&self) -> String {
        let path = self.folder.trim().to_lowercase();
        if path.is_empty() || path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn initial_load_delay(&self) -> Duration {
        Duration::from_secs(self.initial_load_delay_secs)
    }

    pub fn cache_dir_or_default(&self, data_dir: &Path) -> PathBuf {
        self.cache_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(CACHE_DIR_NAME))
    }
}
