//! Storage layer: loads the operator registry from disk and holds the
//! current immutable snapshot served to searches.

pub mod error;
pub mod loader;
pub mod snapshot;

pub use error::LoadError;
pub use loader::{load_csv, CsvOptions, Encoding, LoadedDataset};
pub use snapshot::{DatasetStore, ReloadOutcome, Snapshot, StatusReport};
