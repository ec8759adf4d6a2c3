//! Categorical vocabulary: stable dense codes per column, persisted as JSON.
//!
//! Codes are assigned from the sorted distinct values of a column, so fitting
//! the same input twice yields the same codes. After fitting, a column may
//! grow only by appending the reserved `Unknown` class; assigned codes never
//! change.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use trial_model::columns::{CATEGORICAL_COLUMNS, FEATURE_ORDER, MISSING, UNKNOWN};
use trial_model::{PipelineError, PreparedRecord, Result, TrialFeatures};

/// File name of the persisted vocabulary.
pub const VOCABULARY_FILE: &str = "label_encoders.json";
/// File name of the plain-text vocabulary dump.
pub const VOCABULARY_REPORT_FILE: &str = "label_encoders_output.txt";

const VOCABULARY_SCHEMA: &str = "trial-prep.label-vocabulary";
const VOCABULARY_SCHEMA_VERSION: u32 = 1;

/// Code assigned to one class.
pub type Code = u32;

/// Bidirectional mapping for one column. Position in `classes` is the code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnVocabulary {
    classes: Vec<String>,
    index: BTreeMap<String, Code>,
}

impl ColumnVocabulary {
    /// Sorted distinct values, code = rank.
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        let classes = distinct.into_iter().map(str::to_string).collect();
        Self::from_ordered(classes)
    }

    fn from_ordered(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code as Code))
            .collect();
        Self { classes, index }
    }

    /// Rebuilds a column from a persisted class list. Duplicates are rejected
    /// because they would make the reverse index ambiguous.
    pub fn from_classes(classes: Vec<String>) -> std::result::Result<Self, String> {
        let vocabulary = Self::from_ordered(classes);
        if vocabulary.index.len() != vocabulary.classes.len() {
            return Err("duplicate class in persisted column".to_string());
        }
        Ok(vocabulary)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn code(&self, value: &str) -> Option<Code> {
        self.index.get(value).copied()
    }

    pub fn value(&self, code: Code) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    /// Appends `Unknown` with the next code if it is not already a class.
    pub fn reserve_unknown(&mut self) -> Code {
        if let Some(code) = self.code(UNKNOWN) {
            return code;
        }
        let code = self.classes.len() as Code;
        self.classes.push(UNKNOWN.to_string());
        self.index.insert(UNKNOWN.to_string(), code);
        code
    }

    /// Encodes a value, rendering a missing value as `Missing` first and
    /// falling back to the reserved `Unknown` code for unseen values.
    pub fn encode_or_unknown(&mut self, value: Option<&str>) -> Code {
        let value = value.unwrap_or(MISSING);
        match self.code(value) {
            Some(code) => code,
            None => self.reserve_unknown(),
        }
    }
}

/// Vocabulary for every categorical column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelVocabulary {
    columns: BTreeMap<String, ColumnVocabulary>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VocabularyPayload {
    schema: String,
    schema_version: u32,
    generated_at: String,
    columns: Vec<ColumnPayload>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnPayload {
    name: String,
    classes: Vec<String>,
}

impl LabelVocabulary {
    /// Fits every categorical column over the prepared records.
    pub fn fit(records: &[PreparedRecord]) -> Self {
        let columns = CATEGORICAL_COLUMNS
            .iter()
            .map(|&column| {
                let values = records
                    .iter()
                    .filter_map(|record| record.features.text(column));
                (column.to_string(), ColumnVocabulary::fit(values))
            })
            .collect();
        let vocabulary = Self { columns };
        debug!(
            columns = vocabulary.columns.len(),
            classes = vocabulary.total_classes(),
            "vocabulary fitted"
        );
        vocabulary
    }

    pub fn column(&self, name: &str) -> Option<&ColumnVocabulary> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn total_classes(&self) -> usize {
        self.columns.values().map(ColumnVocabulary::len).sum()
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut ColumnVocabulary> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| PipelineError::configuration(format!("no vocabulary for column '{name}'")))
    }

    /// Strict lookup; `None` for unseen values or unknown columns.
    pub fn encode(&self, column: &str, value: &str) -> Option<Code> {
        self.column(column)?.code(value)
    }

    pub fn reserve_unknown(&mut self, column: &str) -> Result<Code> {
        Ok(self.column_mut(column)?.reserve_unknown())
    }

    pub fn encode_or_unknown(&mut self, column: &str, value: Option<&str>) -> Result<Code> {
        Ok(self.column_mut(column)?.encode_or_unknown(value))
    }

    /// Columns in feature order first, then any others by name.
    fn ordered_columns(&self) -> Vec<(&str, &ColumnVocabulary)> {
        let mut ordered: Vec<(&str, &ColumnVocabulary)> = CATEGORICAL_COLUMNS
            .iter()
            .filter_map(|&name| self.columns.get(name).map(|column| (name, column)))
            .collect();
        for (name, column) in &self.columns {
            if !CATEGORICAL_COLUMNS.contains(&name.as_str()) {
                ordered.push((name.as_str(), column));
            }
        }
        ordered
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let payload = VocabularyPayload {
            schema: VOCABULARY_SCHEMA.to_string(),
            schema_version: VOCABULARY_SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            columns: self
                .ordered_columns()
                .into_iter()
                .map(|(name, column)| ColumnPayload {
                    name: name.to_string(),
                    classes: column.classes.clone(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&payload)
    }

    /// Parses a persisted vocabulary; `origin` is used in error messages.
    pub fn from_json(json: &str, origin: &Path) -> Result<Self> {
        let payload: VocabularyPayload =
            serde_json::from_str(json).map_err(|error| PipelineError::parse(origin, error))?;
        if payload.schema != VOCABULARY_SCHEMA {
            return Err(PipelineError::parse(
                origin,
                format!("unexpected schema '{}'", payload.schema),
            ));
        }
        if payload.schema_version != VOCABULARY_SCHEMA_VERSION {
            return Err(PipelineError::parse(
                origin,
                format!("unsupported schema_version: {}", payload.schema_version),
            ));
        }
        let mut columns = BTreeMap::new();
        for column in payload.columns {
            let vocabulary = ColumnVocabulary::from_classes(column.classes)
                .map_err(|message| PipelineError::parse(origin, format!("{}: {message}", column.name)))?;
            columns.insert(column.name, vocabulary);
        }
        Ok(Self { columns })
    }

    /// Writes `label_encoders.json` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|error| PipelineError::io(dir, error))?;
        let path = dir.join(VOCABULARY_FILE);
        let json = self
            .to_json()
            .map_err(|error| PipelineError::persist(&path, error))?;
        fs::write(&path, format!("{json}\n")).map_err(|error| PipelineError::io(&path, error))?;
        info!(path = %path.display(), classes = self.total_classes(), "vocabulary saved");
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|error| PipelineError::io(path, error))?;
        Self::from_json(&contents, path)
    }

    /// Plain-text listing of every column's classes in code order.
    pub fn render_report(&self) -> String {
        let mut out = String::from("Label Encoders Information:\n");
        for (name, column) in self.ordered_columns() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Column: {name} ({} classes)", column.len());
            for (code, class) in column.classes.iter().enumerate() {
                let _ = writeln!(out, "  {code}: {class}");
            }
        }
        out
    }

    /// Writes `label_encoders_output.txt` into `dir`.
    pub fn write_report(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|error| PipelineError::io(dir, error))?;
        let path = dir.join(VOCABULARY_REPORT_FILE);
        fs::write(&path, self.render_report()).map_err(|error| PipelineError::io(&path, error))?;
        Ok(path)
    }
}

/// One model input row in feature order. Categorical columns hold codes;
/// enrollment holds the number.
pub type FeatureVector = [f64; FEATURE_ORDER.len()];

/// Encodes one record for inference: missing text becomes `Missing`, unseen
/// values map to `Unknown`, reserving it when needed.
pub fn encode_features(
    vocabulary: &mut LabelVocabulary,
    features: &TrialFeatures,
) -> Result<FeatureVector> {
    let mut vector = [0.0; FEATURE_ORDER.len()];
    for (slot, &column) in vector.iter_mut().zip(FEATURE_ORDER.iter()) {
        *slot = match features.text(column) {
            Some(text) => {
                let value = if text.trim().is_empty() { None } else { Some(text) };
                f64::from(vocabulary.encode_or_unknown(column, value)?)
            }
            None => features.enrollment,
        };
    }
    Ok(vector)
}
