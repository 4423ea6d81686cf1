use cadop_core::DatasetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset {} has no data rows", .0.display())]
    Empty(PathBuf),
    #[error(transparent)]
    Schema(#[from] DatasetError),
}
