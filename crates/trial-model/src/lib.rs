pub mod columns;
pub mod error;
pub mod options;
pub mod record;

pub use error::{PipelineError, Result, SourceIssue};
pub use options::{
    ColumnHints, ColumnType, PipelineOptions, SourceFormat, SourceSpec, default_column_hints,
    default_sources,
};
pub use record::{
    CanonicalField, DesignFields, ExpandedRecord, MergedDataset, MergedRecord, PreparedRecord,
    SourceSchema, StatusOrigin, StudyStatus, TrialFeatures, TrialFields, TrialRecord,
    UnifiedTable,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for status in StudyStatus::ALL {
            assert_eq!(StudyStatus::from_label(status.as_str()), Some(status));
        }
        assert_eq!(StudyStatus::from_label("not completed"), None);
    }

    #[test]
    fn fill_missing_keeps_existing_values() {
        let mut winner = TrialFields {
            criteria: Some("Inclusion".to_string()),
            ..TrialFields::default()
        };
        let later = TrialFields {
            criteria: Some("Other".to_string()),
            enrollment: Some("50".to_string()),
            ..TrialFields::default()
        };
        assert_eq!(winner.fill_missing_from(&later), 1);
        assert_eq!(winner.criteria.as_deref(), Some("Inclusion"));
        assert_eq!(winner.enrollment.as_deref(), Some("50"));
    }

    #[test]
    fn options_serialize() {
        let options = PipelineOptions::default().with_seed(7);
        let json = serde_json::to_string(&options).expect("serialize options");
        let round: PipelineOptions = serde_json::from_str(&json).expect("deserialize options");
        assert_eq!(round.seed, 7);
        assert_eq!(round.sources.len(), 5);
        assert_eq!(round.column_hints.get("enrollment"), Some(&ColumnType::Numeric));
    }
}
