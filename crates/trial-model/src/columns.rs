//! Canonical column names shared by every stage and by the external
//! model-fitting and prediction collaborators.

pub const NCT_ID: &str = "nct_id";
pub const STUDY_STATUS: &str = "study_status";
pub const STUDY_TITLE: &str = "study_title";
pub const STUDY_DESIGN: &str = "study_design";
pub const CRITERIA: &str = "criteria";
pub const ENROLLMENT: &str = "enrollment";
pub const CONDITION: &str = "condition";
pub const INTERVENTION: &str = "intervention";

pub const ALLOCATION: &str = "Allocation";
pub const INTERVENTION_MODEL: &str = "Intervention_Model";
pub const MASKING: &str = "Masking";
pub const PRIMARY_PURPOSE: &str = "Primary_Purpose";

/// Label column of the split tables.
pub const LABEL_COLUMN: &str = STUDY_STATUS;

/// Placeholder for absent text values and for categories never seen while fitting.
pub const UNKNOWN: &str = "Unknown";

/// Rendering of a missing value at inference time, before the unknown fallback.
pub const MISSING: &str = "Missing";

/// Feature column order of `X_train.csv` / `X_test.csv`.
///
/// The fitted model and the prediction service index features by position,
/// so this order is part of the output contract.
pub const FEATURE_ORDER: [&str; 9] = [
    STUDY_TITLE,
    CRITERIA,
    ENROLLMENT,
    ALLOCATION,
    INTERVENTION_MODEL,
    MASKING,
    PRIMARY_PURPOSE,
    INTERVENTION,
    CONDITION,
];

/// Columns that receive integer codes: every text feature, i.e. all features
/// except enrollment. The label is kept as text.
pub const CATEGORICAL_COLUMNS: [&str; 8] = [
    STUDY_TITLE,
    CRITERIA,
    ALLOCATION,
    INTERVENTION_MODEL,
    MASKING,
    PRIMARY_PURPOSE,
    INTERVENTION,
    CONDITION,
];

/// Delimiter between values of the multi-valued text fields and between
/// sub-fields of the composite design text.
pub const MULTI_VALUE_DELIMITER: char = '|';

pub fn is_categorical(column: &str) -> bool {
    CATEGORICAL_COLUMNS.contains(&column)
}
