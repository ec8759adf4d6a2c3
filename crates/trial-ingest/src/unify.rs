//! Schema unification: column synonyms and study-status normalization.
//!
//! The unifier is deterministic and stateless. A [`HeaderPlan`] is computed
//! once per source from its header row and then applied to every batch.

use trial_model::{
    CanonicalField, ColumnHints, ColumnType, SourceSchema, StudyStatus, TrialRecord,
    UnifiedTable,
};

use crate::polars_utils::{format_numeric, parse_f64};
use crate::raw_table::RawTable;

/// Resolves a lower-cased header to its canonical field.
///
/// Canonical names resolve to themselves; anything else passes through.
pub fn resolve_synonym(header: &str) -> Option<CanonicalField> {
    let field = match header {
        "nct_id" | "nct id" | "nct number" | "nctnumber" => CanonicalField::NctId,
        "study_status" | "study status" | "studystatus" => CanonicalField::StudyStatus,
        "study_design" | "study design" => CanonicalField::StudyDesign,
        "study_title" | "study title" => CanonicalField::StudyTitle,
        "criteria" => CanonicalField::Criteria,
        "enrollment" => CanonicalField::Enrollment,
        "condition" | "conditions" => CanonicalField::Condition,
        "intervention" | "interventions" => CanonicalField::Intervention,
        _ => return None,
    };
    Some(field)
}

/// Maps a raw status value to the binary label. Values outside the table
/// (including empty ones) make the status non-inferable.
pub fn normalize_status(raw: &str) -> Option<StudyStatus> {
    match raw.trim().to_lowercase().as_str() {
        "complete" | "completed" => Some(StudyStatus::Completed),
        "terminated" | "withdrawn" | "suspended" => Some(StudyStatus::NotCompleted),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnTarget {
    Canonical(CanonicalField),
    Passthrough(String),
}

/// Per-source column resolution.
#[derive(Debug, Clone)]
pub struct HeaderPlan {
    targets: Vec<(ColumnTarget, Option<ColumnType>)>,
    schema: SourceSchema,
}

impl HeaderPlan {
    /// Builds the plan from normalized (lower-cased) headers. When several
    /// headers resolve to the same field the first one wins and the others are
    /// kept as pass-through columns.
    pub fn new(headers: &[String], hints: &ColumnHints) -> Self {
        let mut schema = SourceSchema::default();
        let mut targets = Vec::with_capacity(headers.len());
        for header in headers {
            let target = match resolve_synonym(header) {
                Some(field) if schema.fields.insert(field) => ColumnTarget::Canonical(field),
                Some(field) => {
                    tracing::debug!(
                        header = %header,
                        field = %field,
                        "duplicate synonym kept as pass-through column"
                    );
                    ColumnTarget::Passthrough(header.clone())
                }
                None => ColumnTarget::Passthrough(header.clone()),
            };
            if let ColumnTarget::Passthrough(name) = &target {
                schema.passthrough.push(name.clone());
            }
            let hint_key = match &target {
                ColumnTarget::Canonical(field) => field.name(),
                ColumnTarget::Passthrough(name) => name.as_str(),
            };
            targets.push((target.clone(), hints.get(hint_key).copied()));
        }
        Self { targets, schema }
    }

    pub fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    /// Unifies one raw row. Returns `None` when the source has a status column
    /// and the row's status is outside the known value table.
    pub fn unify_row(&self, row: &[String]) -> Option<TrialRecord> {
        let mut record = TrialRecord::default();
        let mut status_seen = false;
        for (idx, (target, hint)) in self.targets.iter().enumerate() {
            let raw = row.get(idx).map(String::as_str).unwrap_or("");
            match target {
                ColumnTarget::Canonical(CanonicalField::StudyStatus) => {
                    status_seen = true;
                    record.study_status = normalize_status(raw);
                }
                ColumnTarget::Canonical(CanonicalField::NctId) => {
                    record.nct_id = apply_hint(raw, *hint);
                }
                ColumnTarget::Canonical(field) => {
                    record.fields.set(*field, apply_hint(raw, *hint));
                }
                ColumnTarget::Passthrough(name) => {
                    if let Some(value) = apply_hint(raw, *hint) {
                        record.fields.passthrough.insert(name.clone(), value);
                    }
                }
            }
        }
        if status_seen && record.study_status.is_none() {
            return None;
        }
        Some(record)
    }

    /// Unifies a batch into `table`, counting rows dropped for their status.
    pub fn unify_into(&self, rows: Vec<Vec<String>>, table: &mut UnifiedTable) {
        table.records.reserve(rows.len());
        for row in rows {
            match self.unify_row(&row) {
                Some(record) => table.records.push(record),
                None => table.dropped_status_rows += 1,
            }
        }
    }
}

fn apply_hint(raw: &str, hint: Option<ColumnType>) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match hint {
        Some(ColumnType::Numeric) => match parse_f64(raw) {
            Some(value) => Some(format_numeric(value)),
            None => Some(raw.to_string()),
        },
        Some(ColumnType::Text) | None => Some(raw.to_string()),
    }
}

/// Unifies a whole raw table in one go.
pub fn unify_table(source: &str, raw: RawTable, hints: &ColumnHints) -> UnifiedTable {
    let plan = HeaderPlan::new(&raw.headers, hints);
    let mut table = UnifiedTable::new(source, plan.schema().clone());
    plan.unify_into(raw.rows, &mut table);
    table
}
