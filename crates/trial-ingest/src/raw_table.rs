//! Raw rows as they come off disk, before synonym resolution.

use std::borrow::Cow;

/// Header and rows of one batch (or one whole spreadsheet) with the source's
/// own column set. Never outlives the ingestor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalizes a header cell for synonym lookup: BOM and outer whitespace
/// removed, inner whitespace collapsed, lower-cased. Empty headers become
/// `unnamed: <index>` so the merger can recognise and drop them.
pub fn normalize_header(raw: &str, index: usize) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    if normalized.is_empty() {
        return format!("unnamed: {index}");
    }
    normalized.to_lowercase()
}

pub fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Decodes one field, replacing invalid UTF-8 instead of rejecting the file.
/// The flag reports whether a replacement happened.
pub fn decode_field(bytes: &[u8]) -> (String, bool) {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => (normalize_cell(text), false),
        Cow::Owned(text) => (normalize_cell(&text), true),
    }
}

pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|value| value.trim().is_empty())
}
