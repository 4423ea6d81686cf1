//! Core library: dataset model, relevance engine, result formatting, config.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod models;
pub mod weights;

pub use engine::{score, search, MAX_RESULTS, MIN_QUERY_CHARS};
pub use error::{DatasetError, SearchError};
pub use models::{Dataset, Number, Record, ScoredRecord, Value};
