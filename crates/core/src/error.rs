use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Client-side problem with the query; maps to a 400.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// No dataset to search; maps to a 500.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
}

impl SearchError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::InvalidQuery(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("row {row} has {found} fields, header has {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}
