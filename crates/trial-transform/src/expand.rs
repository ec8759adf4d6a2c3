//! Column expansion: design sub-field extraction, multi-value explosion and
//! criteria cleanup.
//!
//! Explosion happens one column at a time: `intervention` first, then
//! `condition` on the already-exploded rows. The resulting cardinality is the
//! product of both value counts only because the second pass sees the first
//! pass's output; this is not a cross join and must stay sequential.

use serde::Serialize;
use tracing::{debug, info_span};

use trial_model::columns::{MULTI_VALUE_DELIMITER, UNKNOWN};
use trial_model::{DesignFields, ExpandedRecord, MergedDataset, MergedRecord};

/// Sub-field names inside the composite design text, in output order.
pub const DESIGN_SUBFIELDS: [&str; 4] = [
    "Allocation",
    "Intervention Model",
    "Masking",
    "Primary Purpose",
];

/// Characters removed from eligibility criteria text.
pub const CRITERIA_STRIP_CHARS: [char; 6] = ['~', '-', '#', '^', '*', '`'];

/// Multi-valued text columns that explode into one row per value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiValueField {
    Intervention,
    Condition,
}

impl MultiValueField {
    fn value_mut(self, record: &mut ExpandedRecord) -> &mut String {
        match self {
            MultiValueField::Intervention => &mut record.intervention,
            MultiValueField::Condition => &mut record.condition,
        }
    }

    fn value(self, record: &ExpandedRecord) -> &str {
        match self {
            MultiValueField::Intervention => &record.intervention,
            MultiValueField::Condition => &record.condition,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpansionReport {
    pub trials: usize,
    pub rows_after_intervention: usize,
    pub rows_after_condition: usize,
}

/// Captures `"<name>: <value up to the next '|'>"` from a design text.
fn capture_subfield<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("{name}: ");
    let start = text.find(&marker)? + marker.len();
    let rest = &text[start..];
    let end = rest.find(MULTI_VALUE_DELIMITER).unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() { None } else { Some(value) }
}

/// Extracts the four design sub-fields; anything not found is `Unknown`.
pub fn extract_design(text: &str) -> DesignFields {
    let field = |name: &str| {
        capture_subfield(text, name)
            .unwrap_or(UNKNOWN)
            .to_string()
    };
    DesignFields {
        allocation: field(DESIGN_SUBFIELDS[0]),
        intervention_model: field(DESIGN_SUBFIELDS[1]),
        masking: field(DESIGN_SUBFIELDS[2]),
        primary_purpose: field(DESIGN_SUBFIELDS[3]),
    }
}

/// Removes markup characters from criteria text and trims it.
pub fn clean_criteria(text: &str) -> String {
    text.chars()
        .filter(|ch| !CRITERIA_STRIP_CHARS.contains(ch))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Projects a merged row onto the working columns. Absent text becomes
/// `Unknown`; enrollment stays raw for the imputer.
pub fn project(record: MergedRecord) -> ExpandedRecord {
    let MergedRecord {
        nct_id,
        study_status,
        fields,
        ..
    } = record;
    let text = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());
    let design = fields
        .study_design
        .as_deref()
        .map(extract_design)
        .unwrap_or_default();
    ExpandedRecord {
        seq: 0,
        nct_id,
        study_status,
        study_title: text(fields.study_title),
        criteria: text(fields.criteria),
        design,
        intervention: text(fields.intervention),
        condition: text(fields.condition),
        enrollment: fields.enrollment,
    }
}

/// Splits one column on `|` and emits one row per value, copying every other
/// column. Values are trimmed after splitting.
pub fn explode(rows: Vec<ExpandedRecord>, field: MultiValueField) -> Vec<ExpandedRecord> {
    let mut exploded = Vec::with_capacity(rows.len());
    for mut row in rows {
        let mut values: Vec<String> = field
            .value(&row)
            .split(MULTI_VALUE_DELIMITER)
            .map(|value| value.trim().to_string())
            .collect();
        // `split` yields at least one piece; the last one reuses the row.
        let last = values.pop().unwrap_or_default();
        for value in values {
            let mut copy = row.clone();
            *field.value_mut(&mut copy) = value;
            exploded.push(copy);
        }
        *field.value_mut(&mut row) = last;
        exploded.push(row);
    }
    exploded
}

/// Runs design extraction, both explosions and criteria cleanup.
pub fn expand_dataset(dataset: MergedDataset) -> (Vec<ExpandedRecord>, ExpansionReport) {
    let span = info_span!("expand", trials = dataset.len());
    let _guard = span.enter();
    let mut report = ExpansionReport {
        trials: dataset.len(),
        ..ExpansionReport::default()
    };

    let rows: Vec<ExpandedRecord> = dataset.records.into_iter().map(project).collect();
    let rows = explode(rows, MultiValueField::Intervention);
    report.rows_after_intervention = rows.len();
    let mut rows = explode(rows, MultiValueField::Condition);
    report.rows_after_condition = rows.len();

    for (seq, row) in rows.iter_mut().enumerate() {
        row.seq = seq;
        row.criteria = clean_criteria(&row.criteria);
    }
    debug!(
        trials = report.trials,
        rows_after_intervention = report.rows_after_intervention,
        rows_after_condition = report.rows_after_condition,
        "expansion complete"
    );
    (rows, report)
}
