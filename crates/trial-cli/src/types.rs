use std::collections::BTreeMap;
use std::path::PathBuf;

use trial_model::{SourceIssue, StudyStatus};
use trial_transform::{ExpansionReport, ImputationReport, MergeReport, SplitPaths, SplitReport};

/// What happened to one configured source.
#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub file_name: String,
    /// Rows kept after unification, when the source loaded.
    pub rows: Option<usize>,
    pub dropped_status_rows: usize,
    pub issue: Option<SourceIssue>,
}

impl SourceSummary {
    pub fn loaded(&self) -> bool {
        self.issue.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub vocabulary: PathBuf,
    pub vocabulary_report: PathBuf,
    pub split: SplitPaths,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub processed_dir: PathBuf,
    pub sources: Vec<SourceSummary>,
    pub merged_trials: usize,
    pub status_counts: BTreeMap<StudyStatus, usize>,
    pub merge: MergeReport,
    pub expansion: ExpansionReport,
    pub imputation: ImputationReport,
    pub vocabulary_classes: usize,
    pub split: SplitReport,
    pub outputs: OutputPaths,
}
