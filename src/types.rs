//! Common types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digits in a millisecond epoch up to the year 2286
const TIME_TAKEN_WIDTH: usize = 13;

/// Capture time as a zero-padded millisecond epoch.
///
/// Every value has the same width, so string order equals chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeTaken(String);

impl TimeTaken {
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("{:0width$}", millis.max(0), width = TIME_TAKEN_WIDTH))
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TimeTaken {
    fn default() -> Self {
        Self::from_millis(0)
    }
}

impl fmt::Display for TimeTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One remote photo known to the sync pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub path: String, // lowercase remote path
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub time_taken: TimeTaken,
    pub orientation: u8,
    /// Base64 thumbnail, held only between fetch and save
    #[serde(skip)]
    pub thumbnail: Option<String>,
    pub loaded: bool,
    pub saved: bool,
    pub error: bool,
}

impl FileRecord {
    pub fn new(id: String, name: String, path: String, size: u64, modified: &DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            path,
            size,
            width: 0,
            height: 0,
            latitude: 0.0,
            longitude: 0.0,
            time_taken: TimeTaken::from_datetime(modified),
            orientation: 1,
            thumbnail: None,
            loaded: false,
            saved: false,
            error: false,
        }
    }

    /// Drop out of the pipeline until the next index refresh
    pub fn exclude(&mut self) {
        self.loaded = false;
        self.error = true;
        self.thumbnail = None;
    }

    /// Saved to the cache with known dimensions
    pub fn is_displayable(&self) -> bool {
        self.saved && self.width > 0 && self.height > 0
    }
}

/// Events sent from the sync task to the display
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Full snapshot of the known files after a save pass
    Files(Vec<FileRecord>),
    /// Nothing could be found; shown to the user
    Error(String),
}

/// Requests sent from the display to the sync task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    /// Rebuild the index now instead of waiting for the refresh timer
    Refresh,
}
