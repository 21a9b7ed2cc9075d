//! Once-per-period announcement throttle and its persisted record.
//!
//! The record is one `YYYY-MM-DD` string per period, stored as a small JSON
//! object at ~/.calibra-voice/announcements.json by default.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::status::Period;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write announcement record {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode announcement record")]
    Encode(#[from] serde_json::Error),
}

/// Key-value store holding the last announced date per period.
pub trait AnnouncementStore: Send + Sync {
    fn last_announced(&self, period: Period) -> Option<String>;
    fn set_last_announced(&self, period: Period, date: &str) -> Result<(), StoreError>;
}

/// Non-persistent store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<Period, String>>,
}

impl AnnouncementStore for MemoryStore {
    fn last_announced(&self, period: Period) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&period)
            .cloned()
    }

    fn set_last_announced(&self, period: Period, date: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(period, date.to_string());
        Ok(())
    }
}

/// Write-through JSON file store.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".calibra-voice")
            .join("announcements.json")
    }

    /// Open the record at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!("Announcement record {} has {} entries", path.display(), entries.len());
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temporary sibling written before being renamed over the record.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("announcements.json");
        self.path
            .with_file_name(format!(".{name}.tmp.{}", std::process::id()))
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)?;
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        // A crash mid-write must never leave a truncated record behind.
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp).map_err(write_err)?;
            file.write_all(json.as_bytes()).map_err(write_err)?;
            file.sync_all().map_err(write_err)?;
        }
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!("Failed to read {}: {e}, starting empty", path.display());
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to parse {}: {e}, starting empty", path.display());
            BTreeMap::new()
        }
    }
}

impl AnnouncementStore for JsonFileStore {
    fn last_announced(&self, period: Period) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(period.store_key())
            .cloned()
    }

    fn set_last_announced(&self, period: Period, date: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(period.store_key().to_string(), date.to_string());
        self.persist(&entries)
    }
}

/// Gate deciding whether an announcement may be spoken now.
#[derive(Clone)]
pub struct Throttle {
    store: Arc<dyn AnnouncementStore>,
}

impl Throttle {
    pub fn new(store: Arc<dyn AnnouncementStore>) -> Self {
        Self { store }
    }

    /// `force` always allows; otherwise allowed once per (period, day).
    pub fn should_announce(&self, period: Period, today: NaiveDate, force: bool) -> bool {
        if force {
            return true;
        }
        match self.store.last_announced(period) {
            Some(last) if last == today.to_string() => {
                debug!("Already announced in the {period} of {today}");
                false
            }
            _ => true,
        }
    }

    /// Call only after the announcement actually reached the speech sink.
    pub fn record_announced(&self, period: Period, today: NaiveDate) -> Result<(), StoreError> {
        self.store.set_last_announced(period, &today.to_string())?;
        info!("Recorded {period} announcement for {today}");
        Ok(())
    }

    pub fn last_announced(&self, period: Period) -> Option<String> {
        self.store.last_announced(period)
    }
}
