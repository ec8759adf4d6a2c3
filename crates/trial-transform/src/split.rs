//! Stratified train/test split and persistence of the four tables.
//!
//! The test size is `ceil(n * fraction)`. Each class gets
//! `floor(n_class * n_test / n)` test rows and the leftover slots go to the
//! classes with the largest remainders (ties: larger class, then label order).
//! Members of each class are shuffled with one seeded generator, visited in
//! label order, so a given seed always produces the same split.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::{BooleanChunked, CsvWriter, DataFrame, NewChunkedArray, SerWriter};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, info_span};

use trial_model::options::{DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use trial_model::{PipelineError, PipelineOptions, Result};

use crate::frame::{column_value_string, frame_error};

pub const X_TRAIN_FILE: &str = "X_train.csv";
pub const X_TEST_FILE: &str = "X_test.csv";
pub const Y_TRAIN_FILE: &str = "y_train.csv";
pub const Y_TEST_FILE: &str = "y_test.csv";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitOptions {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

impl SplitOptions {
    pub fn from_pipeline(options: &PipelineOptions) -> Self {
        Self {
            test_fraction: options.test_fraction,
            seed: options.seed,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::configuration(format!(
                "test fraction must be between 0 and 1 (exclusive), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Test allocation for one label value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassAllocation {
    pub label: String,
    pub total: usize,
    pub test: usize,
}

impl ClassAllocation {
    pub fn train(&self) -> usize {
        self.total - self.test
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplitReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub classes: Vec<ClassAllocation>,
}

/// Features and labels for both partitions.
#[derive(Debug, Clone)]
pub struct SplitTables {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: DataFrame,
    pub y_test: DataFrame,
}

/// Paths of the persisted split tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitPaths {
    pub x_train: PathBuf,
    pub x_test: PathBuf,
    pub y_train: PathBuf,
    pub y_test: PathBuf,
}

/// Distributes `n_test` slots over classes of the given sizes.
pub fn allocate_test_rows(class_sizes: &[(String, usize)], n_test: usize) -> Vec<usize> {
    let total: usize = class_sizes.iter().map(|(_, size)| size).sum();
    if total == 0 {
        return vec![0; class_sizes.len()];
    }
    let mut counts: Vec<usize> = class_sizes
        .iter()
        .map(|(_, size)| size * n_test / total)
        .collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..class_sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let rem_a = class_sizes[a].1 * n_test % total;
        let rem_b = class_sizes[b].1 * n_test % total;
        rem_b
            .cmp(&rem_a)
            .then(class_sizes[b].1.cmp(&class_sizes[a].1))
            .then(class_sizes[a].0.cmp(&class_sizes[b].0))
    });
    for &idx in order.iter().take(n_test.saturating_sub(assigned)) {
        counts[idx] += 1;
    }
    counts
}

/// Splits `df` into train and test partitions stratified by `label`.
///
/// # Errors
///
/// [`PipelineError::Configuration`] when the label column is absent, the
/// table has fewer than two rows, or the test fraction is out of range.
pub fn stratified_split(
    df: &DataFrame,
    label: &str,
    options: &SplitOptions,
) -> Result<(SplitTables, SplitReport)> {
    let span = info_span!("split", rows = df.height(), label);
    let _guard = span.enter();

    options.validate()?;
    if df.column(label).is_err() {
        return Err(PipelineError::configuration(format!(
            "label column '{label}' not found in data"
        )));
    }
    let n = df.height();
    if n < 2 {
        return Err(PipelineError::configuration(format!(
            "need at least 2 rows to split, got {n}"
        )));
    }
    // Guard against products like 35 * 0.2 = 7.000000000000001.
    let n_test = ((n as f64 * options.test_fraction - 1e-9).ceil() as usize).clamp(1, n - 1);

    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for idx in 0..n {
        groups
            .entry(column_value_string(df, label, idx))
            .or_default()
            .push(idx);
    }
    let sizes: Vec<(String, usize)> = groups
        .iter()
        .map(|(value, members)| (value.clone(), members.len()))
        .collect();
    let allocation = allocate_test_rows(&sizes, n_test);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut is_test = vec![false; n];
    let mut report = SplitReport {
        rows: n,
        ..SplitReport::default()
    };
    for ((value, mut members), test) in groups.into_iter().zip(allocation) {
        members.shuffle(&mut rng);
        for &idx in members.iter().take(test) {
            is_test[idx] = true;
        }
        report.classes.push(ClassAllocation {
            label: value,
            total: members.len(),
            test,
        });
    }
    report.test_rows = is_test.iter().filter(|&&flag| flag).count();
    report.train_rows = n - report.test_rows;

    let test_mask = BooleanChunked::from_slice("test".into(), &is_test);
    let train_mask = !&test_mask;
    let test = df.filter(&test_mask).map_err(frame_error)?;
    let train = df.filter(&train_mask).map_err(frame_error)?;

    let tables = SplitTables {
        x_train: train.drop(label).map_err(frame_error)?,
        x_test: test.drop(label).map_err(frame_error)?,
        y_train: train.select([label]).map_err(frame_error)?,
        y_test: test.select([label]).map_err(frame_error)?,
    };
    debug!(
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        classes = report.classes.len(),
        "split complete"
    );
    Ok((tables, report))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|error| PipelineError::io(path, error))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|error| PipelineError::persist(path, error))
}

/// Writes the four tables under `dir`.
pub fn write_split(tables: &mut SplitTables, dir: &Path) -> Result<SplitPaths> {
    std::fs::create_dir_all(dir).map_err(|error| PipelineError::io(dir, error))?;
    let paths = SplitPaths {
        x_train: dir.join(X_TRAIN_FILE),
        x_test: dir.join(X_TEST_FILE),
        y_train: dir.join(Y_TRAIN_FILE),
        y_test: dir.join(Y_TEST_FILE),
    };
    write_csv(&mut tables.x_train, &paths.x_train)?;
    write_csv(&mut tables.x_test, &paths.x_test)?;
    write_csv(&mut tables.y_train, &paths.y_train)?;
    write_csv(&mut tables.y_test, &paths.y_test)?;
    info!(dir = %dir.display(), "split tables written");
    Ok(paths)
}
