//! Tests for trial-model types.

use trial_model::columns::{CATEGORICAL_COLUMNS, FEATURE_ORDER, UNKNOWN, is_categorical};
use trial_model::{
    CanonicalField, DesignFields, MergedDataset, MergedRecord, PipelineError, SourceIssue,
    SourceSchema, StatusOrigin, StudyStatus, TrialFeatures, TrialFields,
};

#[test]
fn feature_order_matches_prediction_contract() {
    assert_eq!(
        FEATURE_ORDER,
        [
            "study_title",
            "criteria",
            "enrollment",
            "Allocation",
            "Intervention_Model",
            "Masking",
            "Primary_Purpose",
            "intervention",
            "condition",
        ]
    );
}

#[test]
fn every_feature_except_enrollment_is_categorical() {
    for column in FEATURE_ORDER {
        assert_eq!(is_categorical(column), column != "enrollment", "{column}");
    }
    assert!(!is_categorical("study_status"));
    assert_eq!(CATEGORICAL_COLUMNS.len(), FEATURE_ORDER.len() - 1);
}

#[test]
fn canonical_field_names_resolve() {
    for field in CanonicalField::ALL {
        assert_eq!(CanonicalField::from_name(field.name()), Some(field));
    }
    assert!(!CanonicalField::NctId.is_descriptive());
    assert!(!CanonicalField::StudyStatus.is_descriptive());
    assert!(CanonicalField::Enrollment.is_descriptive());
}

#[test]
fn trial_fields_ignore_key_and_label() {
    let mut fields = TrialFields::default();
    fields.set(CanonicalField::NctId, Some("NCT1".to_string()));
    fields.set(CanonicalField::Condition, Some("Asthma".to_string()));
    assert_eq!(fields.get(CanonicalField::NctId), None);
    assert_eq!(fields.get(CanonicalField::Condition), Some("Asthma"));
}

#[test]
fn fill_missing_copies_passthrough_columns() {
    let mut winner = TrialFields::default();
    let mut later = TrialFields::default();
    later
        .passthrough
        .insert("city".to_string(), "Oslo".to_string());
    assert_eq!(winner.fill_missing_from(&later), 1);
    assert_eq!(winner.passthrough.get("city").map(String::as_str), Some("Oslo"));
}

#[test]
fn schema_reports_key_and_status_presence() {
    let mut schema = SourceSchema::default();
    assert!(!schema.has_key());
    schema.fields.insert(CanonicalField::NctId);
    assert!(schema.has_key());
    assert!(!schema.has_status());
}

#[test]
fn merged_dataset_counts_statuses() {
    let record = |id: &str, status| MergedRecord {
        nct_id: id.to_string(),
        study_status: status,
        status_origin: StatusOrigin::Reported,
        fields: TrialFields::default(),
    };
    let dataset = MergedDataset {
        records: vec![
            record("NCT1", StudyStatus::Completed),
            record("NCT2", StudyStatus::NotCompleted),
            record("NCT3", StudyStatus::Completed),
        ],
    };
    let counts = dataset.status_counts();
    assert_eq!(counts.get(&StudyStatus::Completed), Some(&2));
    assert_eq!(counts.get(&StudyStatus::NotCompleted), Some(&1));
    assert_eq!(dataset.get("NCT2").map(|r| r.study_status), Some(StudyStatus::NotCompleted));
}

#[test]
fn features_expose_text_by_column() {
    let features = TrialFeatures {
        study_title: "Title".to_string(),
        criteria: "Adults".to_string(),
        enrollment: 12.0,
        design: DesignFields::default(),
        intervention: "Drug A".to_string(),
        condition: "Asthma".to_string(),
    };
    assert_eq!(features.text("Masking"), Some(UNKNOWN));
    assert_eq!(features.text("condition"), Some("Asthma"));
    assert_eq!(features.text("enrollment"), None);
}

#[test]
fn status_serializes_as_snake_case() {
    let json = serde_json::to_string(&StudyStatus::NotCompleted).expect("serialize status");
    assert_eq!(json, "\"not_completed\"");
}

#[test]
fn error_messages_are_descriptive() {
    let issue = SourceIssue::MissingSource {
        path: "data/raw/facilities.txt".into(),
    };
    assert_eq!(
        issue.to_string(),
        "source file not found: data/raw/facilities.txt"
    );
    let error = PipelineError::configuration("label column 'study_status' not found");
    assert_eq!(
        error.to_string(),
        "invalid configuration: label column 'study_status' not found"
    );
}
