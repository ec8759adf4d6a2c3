//! Data preparation pipeline with explicit stages.
//!
//! The pipeline follows these stages in order:
//! 1. **Ingest**: Read every configured source into a unified table
//! 2. **Merge**: One row per trial identifier, reported status first
//! 3. **Expand**: Design sub-fields, multi-value explosion, criteria cleanup
//! 4. **Impute**: Fill missing enrollment values
//! 5. **Encode**: Fit the vocabulary and build the encoded frame
//! 6. **Split**: Stratified train/test partition
//! 7. **Output**: Write the vocabulary, its text dump and the four tables
//!
//! Nothing is written before stage 6 has succeeded.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span};

use trial_ingest::load_sources;
use trial_model::columns::LABEL_COLUMN;
use trial_model::{MergedDataset, PipelineError, PipelineOptions, PreparedRecord, UnifiedTable};
use trial_transform::{
    ExpansionReport, ImputationReport, LabelVocabulary, MergeOutcome, SplitOptions, SplitReport,
    SplitTables, build_encoded_frame, expand_dataset, impute_enrollment, merge_datasets,
    stratified_split, write_split,
};

use crate::types::{OutputPaths, RunResult, SourceSummary};

// ============================================================================
// Stage 1: Ingest
// ============================================================================

/// Result of the ingest stage.
#[derive(Debug)]
pub struct IngestResult {
    /// Unified tables of the sources that loaded, in configured order.
    pub tables: Vec<UnifiedTable>,
    pub sources: Vec<SourceSummary>,
}

/// Reads every configured source. Missing or unreadable files are recorded
/// and skipped; the stage fails only when no source yields data.
pub fn ingest(options: &PipelineOptions) -> Result<IngestResult> {
    let span = info_span!("ingest", raw_dir = %options.raw_dir.display());
    let _guard = span.enter();
    let start = Instant::now();

    let mut tables = Vec::new();
    let mut sources = Vec::new();
    for load in load_sources(options) {
        match load.outcome {
            Ok(table) => {
                sources.push(SourceSummary {
                    file_name: load.spec.file_name,
                    rows: Some(table.len()),
                    dropped_status_rows: table.dropped_status_rows,
                    issue: None,
                });
                tables.push(table);
            }
            Err(issue) => sources.push(SourceSummary {
                file_name: load.spec.file_name,
                rows: None,
                dropped_status_rows: 0,
                issue: Some(issue),
            }),
        }
    }

    if tables.is_empty() {
        return Err(anyhow::Error::new(PipelineError::empty("no source file yielded data"))
            .context(format!("ingest sources from {}", options.raw_dir.display())));
    }
    info!(
        loaded = tables.len(),
        skipped = sources.len() - tables.len(),
        duration_ms = start.elapsed().as_millis(),
        "ingest complete"
    );
    Ok(IngestResult { tables, sources })
}

// ============================================================================
// Stages 2-4: Merge, expand, impute
// ============================================================================

pub fn merge(tables: Vec<UnifiedTable>) -> Result<MergeOutcome> {
    merge_datasets(tables).context("merge datasets")
}

/// Result of the expand and impute stages.
#[derive(Debug)]
pub struct RepairResult {
    pub records: Vec<PreparedRecord>,
    pub expansion: ExpansionReport,
    pub imputation: ImputationReport,
}

pub fn repair(dataset: MergedDataset) -> RepairResult {
    let (rows, expansion) = expand_dataset(dataset);
    let (records, imputation) = impute_enrollment(rows);
    debug!(
        rows = records.len(),
        imputed = imputation.imputed_from_neighbours + imputation.imputed_from_column,
        "repair complete"
    );
    RepairResult {
        records,
        expansion,
        imputation,
    }
}

// ============================================================================
// Stage 5: Encode
// ============================================================================

#[derive(Debug)]
pub struct EncodeResult {
    pub vocabulary: LabelVocabulary,
    pub frame: DataFrame,
}

pub fn encode(records: &[PreparedRecord]) -> Result<EncodeResult> {
    let span = info_span!("encode", rows = records.len());
    let _guard = span.enter();
    let vocabulary = LabelVocabulary::fit(records);
    let frame = build_encoded_frame(&vocabulary, records).context("build encoded frame")?;
    info!(
        rows = frame.height(),
        classes = vocabulary.total_classes(),
        "encoding complete"
    );
    Ok(EncodeResult { vocabulary, frame })
}

// ============================================================================
// Stage 6: Split
// ============================================================================

pub fn split(frame: &DataFrame, options: &SplitOptions) -> Result<(SplitTables, SplitReport)> {
    stratified_split(frame, LABEL_COLUMN, options).context("split dataset")
}

// ============================================================================
// Stage 7: Output
// ============================================================================

pub fn output(
    vocabulary: &LabelVocabulary,
    tables: &mut SplitTables,
    dir: &Path,
) -> Result<OutputPaths> {
    let span = info_span!("output", dir = %dir.display());
    let _guard = span.enter();
    let vocabulary_path = vocabulary
        .save(dir)
        .with_context(|| format!("save vocabulary to {}", dir.display()))?;
    let report_path = vocabulary
        .write_report(dir)
        .with_context(|| format!("write vocabulary report to {}", dir.display()))?;
    let split = write_split(tables, dir)
        .with_context(|| format!("write split tables to {}", dir.display()))?;
    Ok(OutputPaths {
        vocabulary: vocabulary_path,
        vocabulary_report: report_path,
        split,
    })
}

/// Runs every stage and persists the outputs.
pub fn run_pipeline(options: &PipelineOptions) -> Result<RunResult> {
    let span = info_span!("pipeline");
    let _guard = span.enter();
    let start = Instant::now();

    let split_options = SplitOptions::from_pipeline(options);
    split_options.validate().context("validate options")?;

    let IngestResult { tables, sources } = ingest(options)?;
    let MergeOutcome {
        dataset,
        report: merge_report,
    } = merge(tables)?;
    let merged_trials = dataset.len();
    let status_counts = dataset.status_counts();

    let repaired = repair(dataset);
    let encoded = encode(&repaired.records)?;
    let (mut tables, split_report) = split(&encoded.frame, &split_options)?;
    let outputs = output(&encoded.vocabulary, &mut tables, &options.processed_dir)?;

    info!(
        trials = merged_trials,
        rows = split_report.rows,
        duration_ms = start.elapsed().as_millis(),
        "pipeline complete"
    );
    Ok(RunResult {
        processed_dir: options.processed_dir.clone(),
        sources,
        merged_trials,
        status_counts,
        merge: merge_report,
        expansion: repaired.expansion,
        imputation: repaired.imputation,
        vocabulary_classes: encoded.vocabulary.total_classes(),
        split: split_report,
        outputs,
    })
}
