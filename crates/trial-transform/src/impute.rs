//! Enrollment imputation.
//!
//! Each row gets a sequence index before any repair happens. Missing values are
//! filled in index order with the median of up to [`WINDOW`] known values on
//! either side; a value filled earlier counts as known for the rows after it.
//! Whatever remains is filled with the median of the whole column.

use serde::Serialize;
use tracing::{debug, info_span, warn};

use trial_ingest::parse_f64;
use trial_model::columns::UNKNOWN;
use trial_model::{ExpandedRecord, PreparedRecord, TrialFeatures};

/// Neighbours considered on each side of a missing value.
pub const WINDOW: usize = 3;

/// Value used when the column has no known value at all.
pub const EMPTY_COLUMN_FALLBACK: f64 = 0.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImputationReport {
    pub rows: usize,
    pub known: usize,
    /// Non-empty values that did not parse as numbers.
    pub unparsable: usize,
    pub imputed_from_neighbours: usize,
    pub imputed_from_column: usize,
    /// Column median used by the final pass, if one was needed.
    pub column_median: Option<f64>,
    /// True when the column had no known value and the fallback was used.
    pub used_fallback: bool,
}

/// Classifies a raw enrollment cell. `Unknown`, empty and unparsable text are
/// all missing; the flag reports whether the text was unparsable.
pub fn parse_enrollment(raw: Option<&str>) -> (Option<f64>, bool) {
    let Some(text) = raw.map(str::trim) else {
        return (None, false);
    };
    if text.is_empty() || text.eq_ignore_ascii_case(UNKNOWN) {
        return (None, false);
    }
    match parse_f64(text) {
        Some(value) => (Some(value), false),
        None => (None, true),
    }
}

/// Median of a non-empty slice; `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Known values within the window around `anchor`, excluding the anchor itself.
fn neighbours(values: &[Option<f64>], anchor: usize) -> Vec<f64> {
    let start = anchor.saturating_sub(WINDOW);
    let end = (anchor + WINDOW + 1).min(values.len());
    (start..end)
        .filter(|&idx| idx != anchor)
        .filter_map(|idx| values[idx])
        .collect()
}

/// Fills every missing slot in place. `values` must already be in sequence order.
pub fn impute_values(values: &mut [Option<f64>]) -> ImputationReport {
    let mut report = ImputationReport {
        rows: values.len(),
        known: values.iter().filter(|value| value.is_some()).count(),
        ..ImputationReport::default()
    };

    for anchor in 0..values.len() {
        if values[anchor].is_some() {
            continue;
        }
        if let Some(value) = median(&neighbours(values, anchor)) {
            values[anchor] = Some(value);
            report.imputed_from_neighbours += 1;
        }
    }

    let remaining = values.iter().filter(|value| value.is_none()).count();
    if remaining == 0 {
        return report;
    }
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let fill = match median(&present) {
        Some(value) => value,
        None => {
            report.used_fallback = true;
            EMPTY_COLUMN_FALLBACK
        }
    };
    report.column_median = Some(fill);
    for slot in values.iter_mut().filter(|value| value.is_none()) {
        *slot = Some(fill);
        report.imputed_from_column += 1;
    }
    report
}

/// Imputes enrollment for every row and converts the rows into prepared
/// records. Rows are walked and returned in `seq` order regardless of the
/// order they arrive in.
pub fn impute_enrollment(
    mut rows: Vec<ExpandedRecord>,
) -> (Vec<PreparedRecord>, ImputationReport) {
    let span = info_span!("impute", rows = rows.len());
    let _guard = span.enter();

    rows.sort_by_key(|row| row.seq);

    let mut unparsable = 0usize;
    let mut values: Vec<Option<f64>> = rows
        .iter()
        .map(|row| {
            let (value, bad) = parse_enrollment(row.enrollment.as_deref());
            if bad {
                unparsable += 1;
            }
            value
        })
        .collect();

    let mut report = impute_values(&mut values);
    report.unparsable = unparsable;
    if report.used_fallback {
        warn!(
            rows = report.rows,
            fallback = EMPTY_COLUMN_FALLBACK,
            "enrollment column has no known values"
        );
    }
    if unparsable > 0 {
        warn!(unparsable, "non-numeric enrollment values treated as missing");
    }
    debug!(
        known = report.known,
        imputed_from_neighbours = report.imputed_from_neighbours,
        imputed_from_column = report.imputed_from_column,
        "enrollment imputed"
    );

    let prepared = rows
        .into_iter()
        .zip(values)
        .map(|(row, value)| PreparedRecord {
            nct_id: row.nct_id,
            study_status: row.study_status,
            features: TrialFeatures {
                study_title: row.study_title,
                criteria: row.criteria,
                enrollment: value.unwrap_or(EMPTY_COLUMN_FALLBACK),
                design: row.design,
                intervention: row.intervention,
                condition: row.condition,
            },
        })
        .collect();
    (prepared, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use trial_model::{DesignFields, StudyStatus};

    fn expanded(seq: usize, enrollment: Option<&str>) -> ExpandedRecord {
        ExpandedRecord {
            seq,
            nct_id: format!("NCT{seq}"),
            study_status: StudyStatus::Completed,
            study_title: "Title".to_string(),
            criteria: "Adults".to_string(),
            design: DesignFields::default(),
            intervention: "Drug".to_string(),
            condition: "Asthma".to_string(),
            enrollment: enrollment.map(str::to_string),
        }
    }

    #[test]
    fn parse_classifies_values() {
        assert_eq!(parse_enrollment(Some(" 120 ")), (Some(120.0), false));
        assert_eq!(parse_enrollment(Some("unknown")), (None, false));
        assert_eq!(parse_enrollment(Some("")), (None, false));
        assert_eq!(parse_enrollment(None), (None, false));
        assert_eq!(parse_enrollment(Some("about 40")), (None, true));
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn local_window_is_used() {
        let mut values = vec![
            Some(1.0),
            Some(2.0),
            Some(3.0),
            None,
            Some(5.0),
            Some(6.0),
            Some(7.0),
            Some(1000.0),
        ];
        let report = impute_values(&mut values);
        // Window covers indices 0..=6; the outlier at 7 is out of reach.
        assert_eq!(values[3], Some(4.0));
        assert_eq!(report.imputed_from_neighbours, 1);
        assert_eq!(report.imputed_from_column, 0);
    }

    #[test]
    fn earlier_imputations_count_as_known() {
        let mut values = vec![Some(10.0), None, None, None, None, None];
        impute_values(&mut values);
        assert!(values.iter().all(|value| *value == Some(10.0)));
    }

    #[test]
    fn isolated_gap_uses_column_median() {
        let mut values = vec![None, None, None, None, None, Some(20.0), Some(40.0)];
        let report = impute_values(&mut values);
        // Rows 0 and 1 have no known value within reach.
        assert_eq!(report.imputed_from_neighbours, 3);
        assert_eq!(report.imputed_from_column, 2);
        assert_eq!(report.column_median, Some(20.0));
        assert!(values.iter().all(Option::is_some));
        assert!(!report.used_fallback);
    }

    #[test]
    fn empty_column_falls_back() {
        let mut values = vec![None, None];
        let report = impute_values(&mut values);
        assert!(report.used_fallback);
        assert_eq!(values, vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn container_order_does_not_change_imputation() {
        let enrollments = [
            Some("10"),
            None,
            Some("30"),
            Some("Unknown"),
            None,
            Some("90"),
            None,
            None,
            None,
            None,
            Some("400"),
        ];
        let rows: Vec<ExpandedRecord> = enrollments
            .iter()
            .enumerate()
            .map(|(seq, value)| expanded(seq, *value))
            .collect();
        let (expected, expected_report) = impute_enrollment(rows.clone());

        let mut reversed = rows.clone();
        reversed.reverse();
        let mut shuffled = rows;
        shuffled.shuffle(&mut StdRng::seed_from_u64(7));

        for reordered in [reversed, shuffled] {
            let (prepared, report) = impute_enrollment(reordered);
            assert_eq!(prepared, expected);
            assert_eq!(report, expected_report);
        }
        let ids: Vec<&str> = expected.iter().map(|row| row.nct_id.as_str()).collect();
        assert_eq!(ids[..3], ["NCT0", "NCT1", "NCT2"]);
        // Known neighbours of seq 1 are 10 and 30.
        assert_eq!(expected[1].features.enrollment, 20.0);
    }

    proptest! {
        #[test]
        fn imputed_values_stay_within_known_range(
            raw in prop::collection::vec(prop::option::of(0u32..10_000), 1..60)
        ) {
            let mut values: Vec<Option<f64>> =
                raw.iter().map(|value| value.map(f64::from)).collect();
            let known: Vec<f64> = values.iter().flatten().copied().collect();
            impute_values(&mut values);
            prop_assert!(values.iter().all(Option::is_some));
            if let (Some(min), Some(max)) = (
                known.iter().copied().reduce(f64::min),
                known.iter().copied().reduce(f64::max),
            ) {
                for value in values.iter().flatten() {
                    prop_assert!(*value >= min && *value <= max);
                }
            }
        }

        #[test]
        fn known_values_are_untouched(
            raw in prop::collection::vec(prop::option::of(0u32..500), 1..40)
        ) {
            let mut values: Vec<Option<f64>> =
                raw.iter().map(|value| value.map(f64::from)).collect();
            let before = values.clone();
            impute_values(&mut values);
            for (old, new) in before.iter().zip(&values) {
                if old.is_some() {
                    prop_assert_eq!(old, new);
                }
            }
        }
    }
}
