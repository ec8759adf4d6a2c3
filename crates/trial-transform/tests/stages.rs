//! Tests for the merge, expansion, imputation, encoding and split stages.

use std::collections::BTreeSet;
use std::fs;

use proptest::prelude::*;

use trial_ingest::{RawTable, normalize_header, unify_table};
use trial_model::columns::{LABEL_COLUMN, UNKNOWN};
use trial_model::{
    DesignFields, PipelineError, PreparedRecord, StatusOrigin, StudyStatus, TrialFeatures,
    UnifiedTable, default_column_hints,
};
use trial_transform::{
    LabelVocabulary, SplitOptions, VOCABULARY_FILE, build_encoded_frame, column_value_string,
    encode_features, expand_dataset, impute_enrollment, merge_datasets, stratified_split,
    write_split,
};

fn table(source: &str, headers: &[&str], rows: &[&[&str]]) -> UnifiedTable {
    let headers = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| normalize_header(name, idx))
        .collect();
    let mut raw = RawTable::new(headers);
    for row in rows {
        raw.rows.push(row.iter().map(|cell| cell.to_string()).collect());
    }
    unify_table(source, raw, &default_column_hints())
}

fn prepared(title: &str, status: StudyStatus) -> PreparedRecord {
    PreparedRecord {
        nct_id: title.to_string(),
        study_status: status,
        features: TrialFeatures {
            study_title: title.to_string(),
            criteria: "Adults".to_string(),
            enrollment: 10.0,
            design: DesignFields::default(),
            intervention: "Drug".to_string(),
            condition: "Flu".to_string(),
        },
    }
}

#[test]
fn two_table_example_end_to_end() {
    let a = table(
        "usecase_3_.csv",
        &["NCT Number", "Study Status", "Study Design"],
        &[&["NCT1", "Completed", "Allocation: Randomized|Masking: None"]],
    );
    let b = table(
        "drop_withdrawals.txt",
        &["nct_id", "enrollment"],
        &[&["NCT1", "50"], &["NCT2", "Unknown"]],
    );

    let outcome = merge_datasets(vec![b, a]).expect("merge");
    let dataset = outcome.dataset;
    assert_eq!(dataset.len(), 2);

    let nct1 = dataset.get("NCT1").expect("NCT1");
    assert_eq!(nct1.study_status, StudyStatus::Completed);
    assert_eq!(nct1.status_origin, StatusOrigin::Reported);
    assert_eq!(nct1.fields.enrollment.as_deref(), Some("50"));
    let nct2 = dataset.get("NCT2").expect("NCT2");
    assert_eq!(nct2.study_status, StudyStatus::NotCompleted);
    assert_eq!(nct2.status_origin, StatusOrigin::Defaulted);

    let (rows, report) = expand_dataset(dataset);
    assert_eq!(report.rows_after_condition, 2);
    let design = &rows[0].design;
    assert_eq!(design.allocation, "Randomized");
    assert_eq!(design.masking, "None");
    assert_eq!(design.intervention_model, UNKNOWN);
    assert_eq!(design.primary_purpose, UNKNOWN);
    assert_eq!(rows[1].design, DesignFields::default());
    assert_eq!(rows[1].intervention, UNKNOWN);

    let (records, imputation) = impute_enrollment(rows);
    assert_eq!(imputation.known, 1);
    assert_eq!(records[0].features.enrollment, 50.0);
    assert_eq!(records[1].features.enrollment, 50.0);
}

#[test]
fn merge_without_any_rows_is_empty_result() {
    let keyless = table("facilities.txt", &["city"], &[&["Oslo"]]);
    let error = merge_datasets(vec![keyless]).unwrap_err();
    assert!(matches!(error, PipelineError::EmptyResult { .. }));
    assert!(matches!(
        merge_datasets(Vec::new()),
        Err(PipelineError::EmptyResult { .. })
    ));
}

#[test]
fn merge_reports_excluded_and_duplicate_rows() {
    let keyless = table("facilities.txt", &["city"], &[&["Oslo"]]);
    let dupes = table(
        "eligibilities.txt",
        &["nct_id", "criteria"],
        &[&["NCT1", "a"], &["NCT1", "b"], &["NCT2", "c"]],
    );
    let outcome = merge_datasets(vec![keyless, dupes]).expect("merge");
    assert_eq!(outcome.report.excluded_sources(), vec!["facilities.txt"]);
    assert_eq!(outcome.report.tables[1].duplicates_dropped, 1);
    assert_eq!(
        outcome.dataset.get("NCT1").and_then(|r| r.fields.criteria.as_deref()),
        Some("a")
    );
}

#[test]
fn expansion_multiplies_sequentially() {
    let source = table(
        "usecase_3_.csv",
        &["nct_id", "study_status", "interventions", "conditions", "criteria"],
        &[&["NCT1", "completed", "A|B", "X|Y|Z", "* Adults - only"]],
    );
    let merged = merge_datasets(vec![source]).expect("merge").dataset;
    let (rows, report) = expand_dataset(merged);
    assert_eq!(report.rows_after_intervention, 2);
    assert_eq!(report.rows_after_condition, 6);
    assert!(rows.iter().all(|row| row.criteria == "Adults  only"));
    let seqs: Vec<usize> = rows.iter().map(|row| row.seq).collect();
    assert_eq!(seqs, (0..6).collect::<Vec<_>>());
}

#[test]
fn encoding_is_stable_across_runs() {
    let records = vec![
        prepared("Gamma", StudyStatus::Completed),
        prepared("Alpha", StudyStatus::NotCompleted),
        prepared("Beta", StudyStatus::Completed),
    ];
    let first = LabelVocabulary::fit(&records);
    let second = LabelVocabulary::fit(&records);
    assert_eq!(first, second);
    assert_eq!(first.encode("study_title", "Alpha"), Some(0));
    assert_eq!(first.encode("study_title", "Gamma"), Some(2));
}

#[test]
fn unseen_values_map_to_reserved_unknown() {
    let records = vec![prepared("Alpha", StudyStatus::Completed)];
    let mut vocabulary = LabelVocabulary::fit(&records);
    let mut features = records[0].features.clone();
    features.condition = "Never seen".to_string();
    features.intervention = String::new();

    let vector = encode_features(&mut vocabulary, &features).expect("encode");
    // study_title, criteria, enrollment, ...
    assert_eq!(vector[0], 0.0);
    assert_eq!(vector[2], 10.0);
    let condition = vocabulary.column("condition").expect("condition");
    assert_eq!(condition.classes(), ["Flu", "Unknown"]);
    assert_eq!(vector[8], 1.0);
    let intervention = vocabulary.column("intervention").expect("intervention");
    assert_eq!(intervention.code(UNKNOWN), Some(1));
    assert_eq!(vector[7], 1.0);
    // Existing codes are untouched.
    assert_eq!(vocabulary.encode("condition", "Flu"), Some(0));
}

#[test]
fn vocabulary_round_trips_through_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let records = vec![
        prepared("Beta", StudyStatus::Completed),
        prepared("Alpha", StudyStatus::NotCompleted),
    ];
    let mut vocabulary = LabelVocabulary::fit(&records);
    vocabulary.reserve_unknown("masking_missing").unwrap_err();
    vocabulary.reserve_unknown("Masking").expect("reserve");

    let path = vocabulary.save(dir.path()).expect("save");
    assert_eq!(path, dir.path().join(VOCABULARY_FILE));
    let json = fs::read_to_string(&path).expect("read");
    assert!(json.contains("\"schema\": \"trial-prep.label-vocabulary\""));
    assert!(json.contains("\"generated_at\""));

    let loaded = LabelVocabulary::load(&path).expect("load");
    assert_eq!(loaded, vocabulary);
    assert_eq!(loaded.encode("study_title", "Beta"), Some(1));
}

#[test]
fn corrupt_vocabulary_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(VOCABULARY_FILE);
    fs::write(&path, "{\"schema\": \"other\"}").expect("write");
    assert!(matches!(
        LabelVocabulary::load(&path),
        Err(PipelineError::Parse { .. })
    ));
}

#[test]
fn vocabulary_report_lists_classes() {
    let vocabulary = LabelVocabulary::fit(&[prepared("Alpha", StudyStatus::Completed)]);
    insta::assert_snapshot!(vocabulary.render_report(), @r"
    Label Encoders Information:

    Column: study_title (1 classes)
      0: Alpha

    Column: criteria (1 classes)
      0: Adults

    Column: Allocation (1 classes)
      0: Unknown

    Column: Intervention_Model (1 classes)
      0: Unknown

    Column: Masking (1 classes)
      0: Unknown

    Column: Primary_Purpose (1 classes)
      0: Unknown

    Column: intervention (1 classes)
      0: Drug

    Column: condition (1 classes)
      0: Flu
    ");
}

fn labelled_records(completed: usize, not_completed: usize) -> Vec<PreparedRecord> {
    let mut records = Vec::new();
    for idx in 0..completed {
        records.push(prepared(&format!("C{idx:03}"), StudyStatus::Completed));
    }
    for idx in 0..not_completed {
        records.push(prepared(&format!("N{idx:03}"), StudyStatus::NotCompleted));
    }
    records
}

#[test]
fn split_is_stratified_and_disjoint() {
    let records = labelled_records(70, 30);
    let vocabulary = LabelVocabulary::fit(&records);
    let df = build_encoded_frame(&vocabulary, &records).expect("frame");

    let (tables, report) =
        stratified_split(&df, LABEL_COLUMN, &SplitOptions::default()).expect("split");
    assert_eq!(report.test_rows, 20);
    assert_eq!(report.train_rows, 80);
    assert_eq!(tables.x_test.height(), 20);
    assert_eq!(tables.y_train.height(), 80);
    assert_eq!(report.classes[0].label, "completed");
    assert_eq!(report.classes[0].test, 14);
    assert_eq!(report.classes[1].test, 6);

    let titles = |frame: &polars::prelude::DataFrame| -> BTreeSet<String> {
        (0..frame.height())
            .map(|idx| column_value_string(frame, "study_title", idx))
            .collect()
    };
    let train = titles(&tables.x_train);
    let test = titles(&tables.x_test);
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), 100);
    assert!(tables.x_train.column(LABEL_COLUMN).is_err());
    assert_eq!(tables.y_test.width(), 1);
}

#[test]
fn split_is_reproducible_for_a_seed() {
    let records = labelled_records(12, 8);
    let vocabulary = LabelVocabulary::fit(&records);
    let df = build_encoded_frame(&vocabulary, &records).expect("frame");
    let options = SplitOptions::default();
    let (first, _) = stratified_split(&df, LABEL_COLUMN, &options).expect("split");
    let (second, _) = stratified_split(&df, LABEL_COLUMN, &options).expect("split");
    assert!(first.x_test.equals(&second.x_test));
}

#[test]
fn split_requires_label_and_rows() {
    let records = labelled_records(1, 0);
    let vocabulary = LabelVocabulary::fit(&records);
    let df = build_encoded_frame(&vocabulary, &records).expect("frame");
    assert!(matches!(
        stratified_split(&df, LABEL_COLUMN, &SplitOptions::default()),
        Err(PipelineError::Configuration { .. })
    ));

    let records = labelled_records(3, 3);
    let df = build_encoded_frame(&LabelVocabulary::fit(&records), &records).expect("frame");
    assert!(matches!(
        stratified_split(&df, "outcome", &SplitOptions::default()),
        Err(PipelineError::Configuration { .. })
    ));
}

#[test]
fn split_tables_are_written() {
    let dir = tempfile::tempdir().expect("temp dir");
    let records = labelled_records(4, 6);
    let df = build_encoded_frame(&LabelVocabulary::fit(&records), &records).expect("frame");
    let (mut tables, _) =
        stratified_split(&df, LABEL_COLUMN, &SplitOptions::default()).expect("split");
    let paths = write_split(&mut tables, dir.path()).expect("write");

    let x_train = fs::read_to_string(&paths.x_train).expect("read");
    let header = x_train.lines().next().expect("header");
    assert_eq!(
        header,
        "study_title,criteria,enrollment,Allocation,Intervention_Model,Masking,Primary_Purpose,intervention,condition"
    );
    let y_test = fs::read_to_string(&paths.y_test).expect("read");
    let mut lines = y_test.lines();
    assert_eq!(lines.next(), Some("study_status"));
    assert_eq!(lines.count(), 2);
}

fn status_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("completed"), Just("Complete"), Just("terminated")]
}

proptest! {
    #[test]
    fn merge_keeps_one_row_per_identifier(
        status_ids in prop::collection::vec(0u8..20, 0..30),
        default_ids in prop::collection::vec(0u8..20, 0..30),
        status_value in status_strategy(),
    ) {
        let with_status: Vec<Vec<String>> = status_ids
            .iter()
            .map(|id| vec![format!("NCT{id}"), status_value.to_string()])
            .collect();
        let without_status: Vec<Vec<String>> = default_ids
            .iter()
            .map(|id| vec![format!("NCT{id}")])
            .collect();

        let mut a = RawTable::new(vec!["nct_id".into(), "study_status".into()]);
        a.rows = with_status;
        let mut b = RawTable::new(vec!["nct_id".into()]);
        b.rows = without_status;
        let hints = default_column_hints();
        let tables = vec![unify_table("b", b, &hints), unify_table("a", a, &hints)];

        let distinct: BTreeSet<String> = status_ids
            .iter()
            .chain(&default_ids)
            .map(|id| format!("NCT{id}"))
            .collect();
        match merge_datasets(tables) {
            Ok(outcome) => {
                let ids: Vec<&str> = outcome
                    .dataset
                    .records
                    .iter()
                    .map(|record| record.nct_id.as_str())
                    .collect();
                let unique: BTreeSet<&str> = ids.iter().copied().collect();
                prop_assert_eq!(ids.len(), unique.len());
                prop_assert_eq!(unique.len(), distinct.len());
                let expected = if status_value != "terminated" {
                    StudyStatus::Completed
                } else {
                    StudyStatus::NotCompleted
                };
                for id in &status_ids {
                    let record = outcome.dataset.get(&format!("NCT{id}")).unwrap();
                    prop_assert_eq!(record.status_origin, StatusOrigin::Reported);
                    prop_assert_eq!(record.study_status, expected);
                }
            }
            Err(error) => {
                prop_assert!(distinct.is_empty());
                prop_assert!(
                    matches!(error, PipelineError::EmptyResult { .. }),
                    "unexpected error: {}",
                    error
                );
            }
        }
    }
}
