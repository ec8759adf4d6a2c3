//! Record types flowing between the pipeline stages.
//!
//! Each stage consumes the previous representation by value:
//! [`TrialRecord`] (unified source row) → [`MergedRecord`] (one per trial) →
//! [`ExpandedRecord`] (one per exploded value) → [`PreparedRecord`]
//! (enrollment imputed, ready for encoding).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::columns;

/// Binary outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStatus {
    Completed,
    NotCompleted,
}

impl StudyStatus {
    pub const ALL: [StudyStatus; 2] = [StudyStatus::Completed, StudyStatus::NotCompleted];

    pub fn as_str(self) -> &'static str {
        match self {
            StudyStatus::Completed => "completed",
            StudyStatus::NotCompleted => "not_completed",
        }
    }

    /// Parses the canonical label text written to the label tables.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == label)
    }
}

impl fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a merged row's status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusOrigin {
    /// The source file carried a status column.
    Reported,
    /// The source had no status column; `not_completed` was assigned.
    Defaulted,
}

/// Canonical columns a source file may provide after synonym resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    NctId,
    StudyStatus,
    StudyTitle,
    StudyDesign,
    Criteria,
    Enrollment,
    Condition,
    Intervention,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::NctId,
        CanonicalField::StudyStatus,
        CanonicalField::StudyTitle,
        CanonicalField::StudyDesign,
        CanonicalField::Criteria,
        CanonicalField::Enrollment,
        CanonicalField::Condition,
        CanonicalField::Intervention,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::NctId => columns::NCT_ID,
            CanonicalField::StudyStatus => columns::STUDY_STATUS,
            CanonicalField::StudyTitle => columns::STUDY_TITLE,
            CanonicalField::StudyDesign => columns::STUDY_DESIGN,
            CanonicalField::Criteria => columns::CRITERIA,
            CanonicalField::Enrollment => columns::ENROLLMENT,
            CanonicalField::Condition => columns::CONDITION,
            CanonicalField::Intervention => columns::INTERVENTION,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Fields stored in [`TrialFields`] (everything except the key and the label).
    pub fn is_descriptive(self) -> bool {
        !matches!(self, CanonicalField::NctId | CanonicalField::StudyStatus)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptive values of one trial row. `None` means the source did not
/// provide the column or the cell was empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialFields {
    pub study_title: Option<String>,
    pub study_design: Option<String>,
    pub criteria: Option<String>,
    pub enrollment: Option<String>,
    pub condition: Option<String>,
    pub intervention: Option<String>,
    /// Columns that matched no synonym, keyed by lower-cased header.
    pub passthrough: BTreeMap<String, String>,
}

impl TrialFields {
    fn slot(&mut self, field: CanonicalField) -> Option<&mut Option<String>> {
        match field {
            CanonicalField::StudyTitle => Some(&mut self.study_title),
            CanonicalField::StudyDesign => Some(&mut self.study_design),
            CanonicalField::Criteria => Some(&mut self.criteria),
            CanonicalField::Enrollment => Some(&mut self.enrollment),
            CanonicalField::Condition => Some(&mut self.condition),
            CanonicalField::Intervention => Some(&mut self.intervention),
            CanonicalField::NctId | CanonicalField::StudyStatus => None,
        }
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        let value = match field {
            CanonicalField::StudyTitle => &self.study_title,
            CanonicalField::StudyDesign => &self.study_design,
            CanonicalField::Criteria => &self.criteria,
            CanonicalField::Enrollment => &self.enrollment,
            CanonicalField::Condition => &self.condition,
            CanonicalField::Intervention => &self.intervention,
            CanonicalField::NctId | CanonicalField::StudyStatus => return None,
        };
        value.as_deref()
    }

    /// Stores a descriptive value. Key and label fields are ignored.
    pub fn set(&mut self, field: CanonicalField, value: Option<String>) {
        if let Some(slot) = self.slot(field) {
            *slot = value;
        }
    }

    /// Copies every value `other` has and `self` lacks. Returns how many were filled.
    pub fn fill_missing_from(&mut self, other: &TrialFields) -> usize {
        let mut filled = 0usize;
        for field in CanonicalField::ALL
            .into_iter()
            .filter(|field| field.is_descriptive())
        {
            let Some(value) = other.get(field) else {
                continue;
            };
            if let Some(slot) = self.slot(field)
                && slot.is_none()
            {
                *slot = Some(value.to_string());
                filled += 1;
            }
        }
        for (name, value) in &other.passthrough {
            if !self.passthrough.contains_key(name) {
                self.passthrough.insert(name.clone(), value.clone());
                filled += 1;
            }
        }
        filled
    }
}

/// A source row after synonym resolution and status normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub nct_id: Option<String>,
    pub study_status: Option<StudyStatus>,
    pub fields: TrialFields,
}

/// Which columns a source provided. Presence is a property of the file,
/// independent of whether individual cells are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    pub fields: BTreeSet<CanonicalField>,
    pub passthrough: Vec<String>,
}

impl SourceSchema {
    pub fn has(&self, field: CanonicalField) -> bool {
        self.fields.contains(&field)
    }

    pub fn has_key(&self) -> bool {
        self.has(CanonicalField::NctId)
    }

    pub fn has_status(&self) -> bool {
        self.has(CanonicalField::StudyStatus)
    }
}

/// All unified rows of one source file.
#[derive(Debug, Clone, Default)]
pub struct UnifiedTable {
    /// Display name of the source (file name).
    pub source: String,
    pub schema: SourceSchema,
    pub records: Vec<TrialRecord>,
    /// Rows removed because their status value was outside the known table.
    pub dropped_status_rows: usize,
}

impl UnifiedTable {
    pub fn new(source: impl Into<String>, schema: SourceSchema) -> Self {
        Self {
            source: source.into(),
            schema,
            records: Vec::new(),
            dropped_status_rows: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One row of the merged dataset; the key and the status are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub nct_id: String,
    pub study_status: StudyStatus,
    pub status_origin: StatusOrigin,
    pub fields: TrialFields,
}

/// Union of all sources, exactly one row per trial identifier.
#[derive(Debug, Clone, Default)]
pub struct MergedDataset {
    pub records: Vec<MergedRecord>,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, nct_id: &str) -> Option<&MergedRecord> {
        self.records.iter().find(|record| record.nct_id == nct_id)
    }

    pub fn status_counts(&self) -> BTreeMap<StudyStatus, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.study_status).or_insert(0) += 1;
        }
        counts
    }
}

/// The four sub-fields extracted from the composite study-design text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFields {
    pub allocation: String,
    pub intervention_model: String,
    pub masking: String,
    pub primary_purpose: String,
}

impl Default for DesignFields {
    fn default() -> Self {
        Self {
            allocation: columns::UNKNOWN.to_string(),
            intervention_model: columns::UNKNOWN.to_string(),
            masking: columns::UNKNOWN.to_string(),
            primary_purpose: columns::UNKNOWN.to_string(),
        }
    }
}

/// One row after design extraction and multi-value explosion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRecord {
    /// Ordering anchor for imputation, assigned once expansion is complete.
    pub seq: usize,
    pub nct_id: String,
    pub study_status: StudyStatus,
    pub study_title: String,
    pub criteria: String,
    pub design: DesignFields,
    pub intervention: String,
    pub condition: String,
    /// Raw enrollment text; the imputer turns it into a number.
    pub enrollment: Option<String>,
}

/// Model features of one row, in text form before encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialFeatures {
    pub study_title: String,
    pub criteria: String,
    pub enrollment: f64,
    pub design: DesignFields,
    pub intervention: String,
    pub condition: String,
}

impl TrialFeatures {
    /// Text value of a categorical feature column.
    pub fn text(&self, column: &str) -> Option<&str> {
        let value = match column {
            columns::STUDY_TITLE => &self.study_title,
            columns::CRITERIA => &self.criteria,
            columns::ALLOCATION => &self.design.allocation,
            columns::INTERVENTION_MODEL => &self.design.intervention_model,
            columns::MASKING => &self.design.masking,
            columns::PRIMARY_PURPOSE => &self.design.primary_purpose,
            columns::INTERVENTION => &self.intervention,
            columns::CONDITION => &self.condition,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// A fully repaired row: features plus label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRecord {
    pub nct_id: String,
    pub study_status: StudyStatus,
    pub features: TrialFeatures,
}
