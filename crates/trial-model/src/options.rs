//! Configuration options for the data-preparation pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::columns;

pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_PROCESSED_DIR: &str = "data/processed";
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// How a source file is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Delimited text, scanned in bounded row batches.
    Delimited { delimiter: u8 },
    /// Workbook (xlsx/xls/ods); read whole, first worksheet only.
    Spreadsheet,
}

/// One configured input file, relative to the raw directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub file_name: String,
    pub format: SourceFormat,
}

impl SourceSpec {
    pub fn delimited(file_name: impl Into<String>, delimiter: u8) -> Self {
        Self {
            file_name: file_name.into(),
            format: SourceFormat::Delimited { delimiter },
        }
    }

    pub fn path_in(&self, raw_dir: &Path) -> PathBuf {
        raw_dir.join(&self.file_name)
    }
}

/// The fixed input catalogue of the registry export.
pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::delimited("eligibilities.txt", b'|'),
        SourceSpec::delimited("drop_withdrawals.txt", b'|'),
        SourceSpec::delimited("facilities.txt", b'|'),
        SourceSpec::delimited("reported_events.txt", b'|'),
        SourceSpec::delimited("usecase_3_.csv", b','),
    ]
}

/// Type hint for a canonical column while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Keep the text verbatim (identifiers with leading zeros, codes).
    Text,
    /// Re-render parseable numbers canonically; leave other text for later stages.
    Numeric,
}

/// Column-type hints keyed by canonical column name.
pub type ColumnHints = BTreeMap<String, ColumnType>;

pub fn default_column_hints() -> ColumnHints {
    let mut hints = BTreeMap::new();
    hints.insert(columns::NCT_ID.to_string(), ColumnType::Text);
    hints.insert(columns::ENROLLMENT.to_string(), ColumnType::Numeric);
    hints
}

/// Options controlling one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Directory holding the source files.
    pub raw_dir: PathBuf,
    /// Directory receiving the vocabulary and the split tables.
    pub processed_dir: PathBuf,
    /// Rows per batch when scanning delimited text.
    pub chunk_size: usize,
    /// Fraction of rows assigned to the test split.
    pub test_fraction: f64,
    /// Seed for the split shuffle.
    pub seed: u64,
    pub sources: Vec<SourceSpec>,
    pub column_hints: ColumnHints,
    /// Show per-file progress bars.
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            processed_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            sources: default_sources(),
            column_hints: default_column_hints(),
            show_progress: true,
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = dir.into();
        self
    }

    pub fn with_processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_dir = dir.into();
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sources(mut self, sources: Vec<SourceSpec>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }
}
