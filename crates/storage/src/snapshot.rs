//! Immutable dataset snapshots with atomic replacement on reload.
//!
//! Readers clone the current `Arc<Snapshot>` and keep using it for the whole
//! request; a reload builds a fresh snapshot and swaps the pointer, so
//! in-flight searches never observe a partially loaded dataset.

use cadop_core::Dataset;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::loader::{self, CsvOptions, Encoding};

#[derive(Debug, Clone)]
pub struct Snapshot {
    dataset: Arc<Dataset>,
    source: PathBuf,
    fingerprint: Option<String>,
    encoding: Option<Encoding>,
    loaded_at: DateTime<Utc>,
    error: Option<String>,
}

impl Snapshot {
    fn failed(source: &Path, err: &LoadError) -> Self {
        Self {
            dataset: Arc::new(Dataset::default()),
            source: source.to_path_buf(),
            fingerprint: None,
            encoding: None,
            loaded_at: Utc::now(),
            error: Some(err.to_string()),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Error from the most recent load attempt, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_available(&self) -> bool {
        !self.dataset.is_empty()
    }

    pub fn status(&self) -> StatusReport {
        let csv_status = match (&self.error, self.is_available()) {
            (None, true) => "loaded".to_string(),
            (Some(e), true) => format!("loaded (last reload failed: {})", e),
            (Some(e), false) => format!("not loaded: {}", e),
            (None, false) => "not loaded".to_string(),
        };
        StatusReport {
            status: "ok".to_string(),
            csv_status,
            records_count: self.dataset.len(),
            source: self.source.display().to_string(),
            encoding: self.encoding,
            fingerprint: self.fingerprint.clone(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Health summary shared by the HTTP status route and the `check` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: String,
    pub csv_status: String,
    pub records_count: usize,
    pub source: String,
    pub encoding: Option<Encoding>,
    pub fingerprint: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Unchanged,
    Replaced { records: usize },
    /// The file changed again while it was being read; a later event retries.
    Unsettled,
    Failed(String),
}

pub struct DatasetStore {
    path: PathBuf,
    options: CsvOptions,
    current: RwLock<Arc<Snapshot>>,
    reloading: Mutex<()>,
}

impl DatasetStore {
    /// Performs the initial load. A failure is recorded on the snapshot
    /// rather than returned, so a server can start before the file exists.
    pub fn open(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        let path = path.into();
        let snapshot = match loader::load_csv(&path, &options) {
            Ok(loaded) => Snapshot {
                dataset: Arc::new(loaded.dataset),
                source: path.clone(),
                fingerprint: Some(loaded.fingerprint),
                encoding: Some(loaded.encoding),
                loaded_at: Utc::now(),
                error: None,
            },
            Err(e) => {
                warn!("Initial dataset load failed: {}", e);
                Snapshot::failed(&path, &e)
            }
        };
        Self {
            path,
            options,
            current: RwLock::new(Arc::new(snapshot)),
            reloading: Mutex::new(()),
        }
    }

    /// Wraps an already built dataset. `reload` still reads from `path`.
    pub fn from_dataset(path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        let path = path.into();
        let snapshot = Snapshot {
            dataset: Arc::new(dataset),
            source: path.clone(),
            fingerprint: None,
            encoding: None,
            loaded_at: Utc::now(),
            error: None,
        };
        Self {
            path,
            options: CsvOptions::default(),
            current: RwLock::new(Arc::new(snapshot)),
            reloading: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Re-reads the source file. On failure the previous dataset stays in
    /// place and only the recorded error changes.
    pub fn reload(&self) -> ReloadOutcome {
        let _guard = self.reloading.lock();
        let previous = self.snapshot();
        match loader::read_source(&self.path) {
            Ok(bytes) => self.apply(&previous, &bytes),
            Err(e) => self.record_failure(&previous, e),
        }
    }

    /// Like `reload`, but reads the file twice `settle` apart and only swaps
    /// when both reads agree, so a writer caught mid-write is not published.
    pub fn reload_settled(&self, settle: Duration) -> ReloadOutcome {
        let _guard = self.reloading.lock();
        let previous = self.snapshot();

        let first = match loader::read_source(&self.path) {
            Ok(b) => b,
            Err(e) => return self.record_failure(&previous, e),
        };
        std::thread::sleep(settle);
        let bytes = match loader::read_source(&self.path) {
            Ok(b) => b,
            Err(e) => return self.record_failure(&previous, e),
        };
        if loader::fingerprint(&first) != loader::fingerprint(&bytes) {
            debug!("{} still changing, deferring reload", self.path.display());
            return ReloadOutcome::Unsettled;
        }
        self.apply(&previous, &bytes)
    }

    fn apply(&self, previous: &Snapshot, bytes: &[u8]) -> ReloadOutcome {
        let fingerprint = loader::fingerprint(bytes);
        if previous.error.is_none() && previous.fingerprint.as_deref() == Some(fingerprint.as_str())
        {
            return ReloadOutcome::Unchanged;
        }

        let loaded = match loader::load_bytes(bytes, &self.options) {
            Ok(l) if l.dataset.is_empty() => {
                return self.record_failure(previous, LoadError::Empty(self.path.clone()))
            }
            Ok(l) => l,
            Err(e) => return self.record_failure(previous, e),
        };

        let records = loaded.dataset.len();
        let next = Snapshot {
            dataset: Arc::new(loaded.dataset),
            source: self.path.clone(),
            fingerprint: Some(loaded.fingerprint),
            encoding: Some(loaded.encoding),
            loaded_at: Utc::now(),
            error: None,
        };
        *self.current.write() = Arc::new(next);
        info!("Dataset reloaded: {} records from {}", records, self.path.display());
        ReloadOutcome::Replaced { records }
    }

    fn record_failure(&self, previous: &Snapshot, err: LoadError) -> ReloadOutcome {
        warn!("Dataset reload failed, keeping previous snapshot: {}", err);
        let message = err.to_string();
        let next = Snapshot {
            error: Some(message.clone()),
            ..previous.clone()
        };
        *self.current.write() = Arc::new(next);
        ReloadOutcome::Failed(message)
    }
}
