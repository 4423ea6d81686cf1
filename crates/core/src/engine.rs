//! Relevance scoring and top-k search over an in-memory dataset.
//!
//! Each present field is compared against the lowercased query and assigned
//! the strongest matching tier; the tier points are multiplied by the field
//! weight and summed per record.

use tracing::debug;

use crate::error::SearchError;
use crate::models::{Dataset, Record, ScoredRecord};
use crate::weights;

pub const MAX_RESULTS: usize = 20;
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Prefix,
    Substring,
    /// Number of query tokens found inside the value.
    Words(usize),
}

impl MatchTier {
    pub fn points(self) -> u64 {
        match self {
            MatchTier::Exact => 10,
            MatchTier::Prefix => 7,
            MatchTier::Substring => 5,
            MatchTier::Words(n) => 2 * n as u64,
        }
    }
}

/// Both arguments must already be lowercased.
pub fn classify(value: &str, query: &str) -> Option<MatchTier> {
    if value == query {
        return Some(MatchTier::Exact);
    }
    if value.starts_with(query) {
        return Some(MatchTier::Prefix);
    }
    if value.contains(query) {
        return Some(MatchTier::Substring);
    }
    let hits = query
        .split_whitespace()
        .filter(|token| value.contains(*token))
        .count();
    (hits > 0).then_some(MatchTier::Words(hits))
}

pub fn score(record: &Record, query: &str) -> u64 {
    score_lowered(record, &query.to_lowercase())
}

fn score_lowered(record: &Record, query: &str) -> u64 {
    record
        .fields()
        .filter_map(|(name, value)| {
            let text = value.as_text()?.to_lowercase();
            let tier = classify(&text, query)?;
            Some(tier.points() * weights::weight(name))
        })
        .sum()
}

pub fn validate_query(query: &str) -> Result<(), SearchError> {
    if query.is_empty() {
        return Err(SearchError::InvalidQuery("query is empty".to_string()));
    }
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(SearchError::InvalidQuery(format!(
            "query too short, minimum {} characters",
            MIN_QUERY_CHARS
        )));
    }
    Ok(())
}

/// Returns at most [`MAX_RESULTS`] records with a positive score, best first.
/// Records with equal scores keep their dataset order.
pub fn search(dataset: &Dataset, query: &str) -> Result<Vec<ScoredRecord>, SearchError> {
    validate_query(query)?;
    if dataset.is_empty() {
        return Err(SearchError::DataUnavailable(
            "dataset is empty or failed to load".to_string(),
        ));
    }

    let lowered = query.to_lowercase();
    let mut hits: Vec<(usize, u64)> = dataset
        .records()
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            let relevance = score_lowered(record, &lowered);
            (relevance > 0).then_some((idx, relevance))
        })
        .collect();
    debug!("{} of {} records matched", hits.len(), dataset.len());

    // sort_by is stable, so ties keep dataset order.
    hits.sort_by(|a, b| b.1.cmp(&a.1));
    hits.truncate(MAX_RESULTS);

    Ok(hits
        .into_iter()
        .map(|(idx, relevance)| ScoredRecord {
            record: dataset.records()[idx].clone(),
            relevance,
        })
        .collect())
}
