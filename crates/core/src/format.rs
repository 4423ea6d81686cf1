//! Wire formatting for search results.
//!
//! Identifier-like columns are normalized here and nowhere else; scoring
//! always sees the values exactly as loaded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::SearchError;
use crate::models::{Number, ScoredRecord, Value};

/// Columns holding codes that must travel as plain digit strings.
pub const IDENTIFIER_FIELDS: &[&str] = &["Telefone", "DDD", "CEP", "Registro_ANS", "CNPJ"];

pub fn is_identifier(field: &str) -> bool {
    IDENTIFIER_FIELDS.contains(&field)
}

pub fn normalize_value(field: &str, value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        _ if is_identifier(field) => normalize_identifier(value),
        Value::Number(Number::Float(x)) => match whole_to_i64(*x) {
            Some(i) => Json::from(i),
            None => float_json(*x),
        },
        Value::Number(Number::Int(i)) => Json::from(*i),
        Value::String(s) => Json::String(s.clone()),
    }
}

fn normalize_identifier(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Number(Number::Int(i)) => Json::String(i.to_string()),
        Value::Number(Number::Float(x)) if x.is_finite() => {
            Json::String((x.trunc() as i64).to_string())
        }
        Value::Number(Number::Float(x)) => float_json(*x),
        Value::String(s) => Json::String(strip_decimal(s)),
    }
}

/// "11987654321.0" -> "11987654321". Anything that is not a decimal number
/// is returned unchanged.
pub fn strip_decimal(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    match s.trim().parse::<f64>() {
        Ok(x) if x.is_finite() => (x.trunc() as i64).to_string(),
        _ => s.to_string(),
    }
}

fn whole_to_i64(x: f64) -> Option<i64> {
    let in_range = x >= i64::MIN as f64 && x <= i64::MAX as f64;
    (x.is_finite() && x.fract() == 0.0 && in_range).then(|| x as i64)
}

fn float_json(x: f64) -> Json {
    serde_json::Number::from_f64(x)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

pub fn format_result(result: &ScoredRecord) -> Json {
    let mut obj = Map::new();
    for (name, value) in result.record.fields() {
        obj.insert(name.to_string(), normalize_value(name, value));
    }
    obj.insert("relevance".to_string(), Json::from(result.relevance));
    Json::Object(obj)
}

pub fn format_results(results: &[ScoredRecord]) -> Vec<Json> {
    results.iter().map(format_result).collect()
}

/// Response body: either a result list or an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Results { results: Vec<Json> },
    Error { error: String },
}

impl Envelope {
    pub fn results(results: &[ScoredRecord]) -> Self {
        Envelope::Results {
            results: format_results(results),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error {
            error: message.into(),
        }
    }

    pub fn from_outcome(outcome: &Result<Vec<ScoredRecord>, SearchError>) -> Self {
        match outcome {
            Ok(results) => Envelope::results(results),
            Err(e) => Envelope::error(e.to_string()),
        }
    }
}
