//! Merging of unified source tables into one dataset keyed by trial identifier.
//!
//! Status-bearing tables are concatenated ahead of status-lacking ones, so the
//! first-row-wins dedup on the final pass never lets a defaulted status replace
//! a reported one.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use trial_model::{
    MergedDataset, MergedRecord, PipelineError, Result, StatusOrigin, StudyStatus, TrialRecord,
    UnifiedTable,
};

/// Prefix of pass-through columns that are artifacts of an index column.
const UNNAMED_PREFIX: &str = "unnamed";

/// What happened to one input table during the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMergeSummary {
    pub source: String,
    pub rows_in: usize,
    /// Rows kept after the per-table dedup.
    pub rows_kept: usize,
    pub duplicates_dropped: usize,
    /// Rows without an identifier value.
    pub missing_key_rows: usize,
    pub dropped_columns: Vec<String>,
    /// `None` when the table was excluded for lacking the key column.
    pub status_origin: Option<StatusOrigin>,
}

impl TableMergeSummary {
    pub fn excluded(&self) -> bool {
        self.status_origin.is_none()
    }
}

/// Counts reported by the merger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub tables: Vec<TableMergeSummary>,
    /// Rows removed by the cross-table dedup.
    pub cross_table_duplicates: usize,
    /// Field values copied from later duplicates onto winning rows.
    pub coalesced_values: usize,
}

impl MergeReport {
    pub fn excluded_sources(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|summary| summary.excluded())
            .map(|summary| summary.source.as_str())
            .collect()
    }
}

/// Merge result plus the report of soft drops.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub dataset: MergedDataset,
    pub report: MergeReport,
}

/// Combines every unified table into one dataset with exactly one row per
/// trial identifier.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyResult`] when no table contributes a row.
pub fn merge_datasets(tables: Vec<UnifiedTable>) -> Result<MergeOutcome> {
    let span = info_span!("merge", tables = tables.len());
    let _guard = span.enter();

    let mut report = MergeReport::default();
    let mut with_status: Vec<Vec<MergedRecord>> = Vec::new();
    let mut without_status: Vec<Vec<MergedRecord>> = Vec::new();

    for (idx, table) in tables.into_iter().enumerate() {
        let (records, summary) = prepare_table(idx, table);
        match summary.status_origin {
            Some(StatusOrigin::Reported) => with_status.push(records),
            Some(StatusOrigin::Defaulted) => without_status.push(records),
            None => {}
        }
        report.tables.push(summary);
    }

    let mut merged: Vec<MergedRecord> = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    for record in with_status.into_iter().chain(without_status).flatten() {
        match positions.get(&record.nct_id) {
            Some(&pos) => {
                report.cross_table_duplicates += 1;
                report.coalesced_values += merged[pos].fields.fill_missing_from(&record.fields);
            }
            None => {
                positions.insert(record.nct_id.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    if merged.is_empty() {
        return Err(PipelineError::empty("merging resulted in no data"));
    }
    info!(
        records = merged.len(),
        cross_table_duplicates = report.cross_table_duplicates,
        coalesced_values = report.coalesced_values,
        "initialized merged dataset"
    );
    Ok(MergeOutcome {
        dataset: MergedDataset { records: merged },
        report,
    })
}

/// Applies the per-table rules: drop index artifacts, require the key,
/// dedup first-wins, and resolve the status origin.
fn prepare_table(idx: usize, table: UnifiedTable) -> (Vec<MergedRecord>, TableMergeSummary) {
    let UnifiedTable {
        source,
        schema,
        records,
        ..
    } = table;
    let rows_in = records.len();
    let dropped_columns: Vec<String> = schema
        .passthrough
        .iter()
        .filter(|name| name.starts_with(UNNAMED_PREFIX))
        .cloned()
        .collect();

    let mut summary = TableMergeSummary {
        source,
        rows_in,
        rows_kept: 0,
        duplicates_dropped: 0,
        missing_key_rows: 0,
        dropped_columns,
        status_origin: None,
    };

    if !schema.has_key() {
        warn!(
            dataset = idx + 1,
            source_file = %summary.source,
            "dataset is missing 'nct_id' column; excluded from merge"
        );
        return (Vec::new(), summary);
    }

    let origin = if schema.has_status() {
        StatusOrigin::Reported
    } else {
        StatusOrigin::Defaulted
    };
    summary.status_origin = Some(origin);

    let mut seen = BTreeSet::new();
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        let Some(merged) = into_merged(record, origin, &summary.dropped_columns) else {
            summary.missing_key_rows += 1;
            continue;
        };
        if seen.insert(merged.nct_id.clone()) {
            kept.push(merged);
        } else {
            summary.duplicates_dropped += 1;
        }
    }
    summary.rows_kept = kept.len();

    if summary.duplicates_dropped > 0 {
        info!(
            dataset = idx + 1,
            source_file = %summary.source,
            duplicates = summary.duplicates_dropped,
            "dropped duplicates in dataset"
        );
    }
    if summary.missing_key_rows > 0 {
        warn!(
            dataset = idx + 1,
            source_file = %summary.source,
            rows = summary.missing_key_rows,
            "dropped rows without an identifier"
        );
    }
    debug!(
        source_file = %summary.source,
        rows_in,
        rows_kept = summary.rows_kept,
        status_origin = ?origin,
        "table prepared"
    );
    (kept, summary)
}

fn into_merged(
    record: TrialRecord,
    origin: StatusOrigin,
    dropped_columns: &[String],
) -> Option<MergedRecord> {
    let nct_id = record.nct_id?.trim().to_string();
    if nct_id.is_empty() {
        return None;
    }
    let study_status = match origin {
        StatusOrigin::Reported => record.study_status?,
        StatusOrigin::Defaulted => StudyStatus::NotCompleted,
    };
    let mut fields = record.fields;
    for name in dropped_columns {
        fields.passthrough.remove(name);
    }
    Some(MergedRecord {
        nct_id,
        study_status,
        status_origin: origin,
        fields,
    })
}
