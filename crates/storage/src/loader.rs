//! Reads a delimited operator registry into a [`Dataset`].
//!
//! The first row is the header. Text is decoded as UTF-8 and falls back to
//! Latin-1 when that fails. Empty cells and the usual NA spellings become
//! `Value::Null`; each column is then typed as integer, float or text.

use cadop_core::{Dataset, Value};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use crate::error::LoadError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Cell spellings treated as missing values.
pub const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf-8"),
            Encoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub encoding: Encoding,
    pub fingerprint: String,
}

pub fn read_source(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn load_csv(path: &Path, options: &CsvOptions) -> Result<LoadedDataset, LoadError> {
    let bytes = read_source(path)?;
    let loaded = load_bytes(&bytes, options)?;
    if loaded.dataset.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    info!(
        "Loaded {} records ({} columns, {}) from {}",
        loaded.dataset.len(),
        loaded.dataset.columns().len(),
        loaded.encoding,
        path.display()
    );
    Ok(loaded)
}

pub fn load_bytes(bytes: &[u8], options: &CsvOptions) -> Result<LoadedDataset, LoadError> {
    let (text, encoding) = decode(bytes);
    if encoding == Encoding::Latin1 {
        debug!("input is not valid utf-8, decoded as latin-1");
    }
    Ok(LoadedDataset {
        dataset: parse(&text, options)?,
        encoding,
        fingerprint: fingerprint(bytes),
    })
}

pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, Encoding) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => (Cow::Borrowed(s), Encoding::Utf8),
        // Latin-1 maps every byte straight to the code point of the same value.
        Err(_) => (
            Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Latin1,
        ),
    }
}

pub fn parse(text: &str, options: &CsvOptions) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut cells: Vec<Vec<Option<String>>> = Vec::new();
    for row in reader.records() {
        let row = row?;
        cells.push(
            row.iter()
                .map(|c| (!is_null_token(c)).then(|| c.to_string()))
                .collect(),
        );
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|col| ColumnKind::infer(cells.iter().filter_map(|row| row.get(col)?.as_deref())))
        .collect();

    let rows = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&kinds)
                .map(|(cell, kind)| cell.map_or(Value::Null, |c| kind.convert(c)))
                .collect()
        })
        .collect();

    Ok(Dataset::from_rows(columns, rows)?)
}

pub fn is_null_token(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}

impl ColumnKind {
    /// Picks the narrowest type every present cell parses as. Columns with
    /// zero-padded numbers stay text so codes keep their leading zeros.
    pub fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut kind = ColumnKind::Int;
        let mut seen = false;
        for cell in cells {
            seen = true;
            if has_leading_zero(cell) {
                return ColumnKind::Text;
            }
            if kind == ColumnKind::Int && cell.parse::<i64>().is_err() {
                kind = ColumnKind::Float;
            }
            if kind == ColumnKind::Float && !cell.parse::<f64>().map_or(false, f64::is_finite) {
                return ColumnKind::Text;
            }
        }
        if seen {
            kind
        } else {
            ColumnKind::Text
        }
    }

    fn convert(self, cell: String) -> Value {
        match self {
            ColumnKind::Int => cell.parse::<i64>().map_or(Value::String(cell), Value::from),
            ColumnKind::Float => match cell.parse::<f64>() {
                Ok(x) => Value::from(x),
                Err(_) => Value::String(cell),
            },
            ColumnKind::Text => Value::String(cell),
        }
    }
}

fn has_leading_zero(cell: &str) -> bool {
    let digits = cell.strip_prefix('-').unwrap_or(cell);
    digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.")
}
