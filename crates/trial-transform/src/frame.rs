//! DataFrame construction for encoded records.

use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, PolarsError, Series};

use trial_ingest::any_to_string;
use trial_model::columns::{ENROLLMENT, FEATURE_ORDER, LABEL_COLUMN};
use trial_model::{PipelineError, PreparedRecord, Result};

use crate::vocabulary::LabelVocabulary;

pub(crate) fn frame_error(error: PolarsError) -> PipelineError {
    PipelineError::Frame(error.to_string())
}

/// Builds the encoded table: feature columns in fixed order, categorical
/// values replaced by their codes, followed by the text label column.
///
/// Every categorical value must already be in the vocabulary; the vocabulary
/// is fitted on the same records before this is called.
pub fn build_encoded_frame(
    vocabulary: &LabelVocabulary,
    records: &[PreparedRecord],
) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(FEATURE_ORDER.len() + 1);
    for &name in &FEATURE_ORDER {
        if name == ENROLLMENT {
            let values: Vec<f64> = records
                .iter()
                .map(|record| record.features.enrollment)
                .collect();
            columns.push(Series::new(name.into(), values).into_column());
            continue;
        }
        let mut codes: Vec<u32> = Vec::with_capacity(records.len());
        for record in records {
            let text = record.features.text(name).unwrap_or_default();
            let code = vocabulary.encode(name, text).ok_or_else(|| {
                PipelineError::configuration(format!(
                    "value '{text}' of column '{name}' is not in the vocabulary"
                ))
            })?;
            codes.push(code);
        }
        columns.push(Series::new(name.into(), codes).into_column());
    }
    let labels: Vec<&str> = records
        .iter()
        .map(|record| record.study_status.as_str())
        .collect();
    columns.push(Series::new(LABEL_COLUMN.into(), labels).into_column());
    DataFrame::new(columns).map_err(frame_error)
}

/// Renders one cell as text; missing columns and nulls become empty.
pub fn column_value_string(df: &DataFrame, column: &str, idx: usize) -> String {
    df.column(column)
        .ok()
        .and_then(|col| col.get(idx).ok())
        .map(any_to_string)
        .unwrap_or_default()
}
