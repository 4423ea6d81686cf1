//! Dataset, record and value types shared by the loader, engine and formatter.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

/// A single cell. `Null` marks a missing value and is skipped by scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(Number),
    Null,
}

impl Value {
    /// Text used for matching, or `None` for a missing value.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One row. Field names are shared with every other record of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == field)
            .map(|i| &self.values[i])
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered, immutable collection of records with a common header.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Arc<[String]>,
    records: Vec<Record>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            columns: Arc::from(Vec::<String>::new()),
            records: Vec::new(),
        }
    }
}

impl Dataset {
    /// Builds a dataset, rejecting rows whose width differs from the header.
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, DatasetError> {
        let columns: Arc<[String]> = columns.into();
        let mut records = Vec::with_capacity(rows.len());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != columns.len() {
                return Err(DatasetError::RowWidth {
                    row,
                    expected: columns.len(),
                    found: values.len(),
                });
            }
            records.push(Record {
                columns: Arc::clone(&columns),
                values,
            });
        }
        Ok(Self { columns, records })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A record paired with its relevance for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: Record,
    pub relevance: u64,
}
