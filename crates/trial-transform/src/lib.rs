//! Transformation stages for clinical-trial records.
//!
//! - **merge**: one row per trial identifier, reported status before defaulted
//! - **expand**: design sub-fields, multi-value explosion, criteria cleanup
//! - **impute**: local-window median imputation of enrollment
//! - **vocabulary**: categorical codes with a persisted vocabulary
//! - **frame**: encoded polars frame in feature order
//! - **split**: stratified train/test split and CSV output

pub mod expand;
pub mod frame;
pub mod impute;
pub mod merge;
pub mod split;
pub mod vocabulary;

pub use expand::{
    ExpansionReport, MultiValueField, clean_criteria, expand_dataset, explode, extract_design,
};
pub use frame::{build_encoded_frame, column_value_string};
pub use impute::{ImputationReport, impute_enrollment, impute_values, median, parse_enrollment};
pub use merge::{MergeOutcome, MergeReport, TableMergeSummary, merge_datasets};
pub use split::{
    ClassAllocation, SplitOptions, SplitPaths, SplitReport, SplitTables, allocate_test_rows,
    stratified_split, write_split,
};
pub use vocabulary::{
    Code, ColumnVocabulary, FeatureVector, LabelVocabulary, VOCABULARY_FILE,
    VOCABULARY_REPORT_FILE, encode_features,
};
