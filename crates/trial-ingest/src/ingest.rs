//! File ingestion with bounded memory.
//!
//! Delimited text is scanned in fixed-size row batches. Each batch is unified
//! as soon as it is full and the raw rows are dropped before the next batch is
//! read, so peak memory follows the chunk size rather than the file size.
//! Workbooks are read whole.
//!
//! Missing or unreadable files are reported as [`SourceIssue`] values; the
//! caller decides whether to continue with the remaining sources.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use calamine::{Reader, open_workbook_auto};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use trial_model::{
    ColumnHints, PipelineOptions, SourceFormat, SourceIssue, SourceSpec, UnifiedTable,
    default_column_hints,
};

use crate::progress::{count_lines, create_chunk_progress_bar, expected_batches};
use crate::raw_table::{RawTable, decode_field, is_blank_row, normalize_cell, normalize_header};
use crate::unify::{HeaderPlan, unify_table};

/// Options for reading one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Rows per batch for delimited text.
    pub chunk_size: usize,
    /// Column-type hints keyed by canonical column name.
    pub column_hints: ColumnHints,
    /// Draw progress bars.
    pub show_progress: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: trial_model::options::DEFAULT_CHUNK_SIZE,
            column_hints: default_column_hints(),
            show_progress: false,
        }
    }
}

impl IngestOptions {
    pub fn from_pipeline(options: &PipelineOptions) -> Self {
        Self {
            chunk_size: options.chunk_size.max(1),
            column_hints: options.column_hints.clone(),
            show_progress: options.show_progress,
        }
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}

/// Outcome of reading one configured source.
pub type IngestOutcome = Result<UnifiedTable, SourceIssue>;

/// Reads heterogeneous source files into unified tables.
#[derive(Debug, Clone, Default)]
pub struct FileIngestor {
    options: IngestOptions,
}

impl FileIngestor {
    pub fn new(options: IngestOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Reads one file in the given format.
    pub fn ingest(&self, path: &Path, format: SourceFormat) -> IngestOutcome {
        if !path.exists() {
            return Err(SourceIssue::MissingSource {
                path: path.to_path_buf(),
            });
        }
        let source = source_name(path);
        let span = info_span!("ingest_file", source_file = %source);
        let _guard = span.enter();
        let start = Instant::now();

        let table = match format {
            SourceFormat::Delimited { delimiter } => self.read_delimited(path, delimiter, &source),
            SourceFormat::Spreadsheet => self.read_spreadsheet(path, &source),
        }?;

        if table.is_empty() {
            return Err(SourceIssue::NoValidRows {
                path: path.to_path_buf(),
            });
        }
        info!(
            source_file = %source,
            rows = table.len(),
            dropped_status_rows = table.dropped_status_rows,
            duration_ms = start.elapsed().as_millis(),
            "loaded source"
        );
        Ok(table)
    }

    fn read_delimited(&self, path: &Path, delimiter: u8, source: &str) -> IngestOutcome {
        let chunk_size = self.options.chunk_size.max(1);
        let batches = if self.options.show_progress {
            count_lines(path)
                .map(|lines| expected_batches(lines, chunk_size))
                .unwrap_or(1)
        } else {
            1
        };
        let file = File::open(path).map_err(|error| SourceIssue::unreadable(path, error))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut record = csv::ByteRecord::new();
        let mut lossy_cells = 0usize;
        let headers = loop {
            let has_row = reader
                .read_byte_record(&mut record)
                .map_err(|error| SourceIssue::unreadable(path, error))?;
            if !has_row {
                return Err(SourceIssue::NoValidRows {
                    path: path.to_path_buf(),
                });
            }
            let row = decode_record(&record, &mut lossy_cells);
            if !is_blank_row(&row) {
                break row
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| normalize_header(name, idx))
                    .collect::<Vec<_>>();
            }
        };

        let plan = HeaderPlan::new(&headers, &self.options.column_hints);
        let mut table = UnifiedTable::new(source, plan.schema().clone());
        let pb = create_chunk_progress_bar(
            batches,
            &format!("Processing {source}"),
            self.options.show_progress,
        );

        let mut rows_read = 0usize;
        let mut batch_count = 0usize;
        let mut batch: Vec<Vec<String>> = Vec::with_capacity(chunk_size);
        loop {
            let has_row = reader
                .read_byte_record(&mut record)
                .map_err(|error| SourceIssue::unreadable(path, error))?;
            if has_row {
                let row = decode_record(&record, &mut lossy_cells);
                if is_blank_row(&row) {
                    continue;
                }
                batch.push(row);
                rows_read += 1;
                if batch.len() < chunk_size {
                    continue;
                }
            }
            if !batch.is_empty() {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(chunk_size));
                plan.unify_into(full, &mut table);
                batch_count += 1;
                pb.inc(1);
                debug!(
                    source_file = %source,
                    batch = batch_count,
                    rows_read,
                    rows_kept = table.len(),
                    "batch unified"
                );
            }
            if !has_row {
                break;
            }
        }
        drop(batch);
        pb.finish_and_clear();

        if lossy_cells > 0 {
            warn!(
                source_file = %source,
                lossy_cells,
                "invalid UTF-8 replaced while decoding"
            );
        }
        Ok(table)
    }

    fn read_spreadsheet(&self, path: &Path, source: &str) -> IngestOutcome {
        let mut workbook =
            open_workbook_auto(path).map_err(|error| SourceIssue::unreadable(path, error))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(Ok(range)) => range,
            Some(Err(error)) => return Err(SourceIssue::unreadable(path, error)),
            None => {
                return Err(SourceIssue::NoValidRows {
                    path: path.to_path_buf(),
                });
            }
        };

        let mut rows = range
            .rows()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| normalize_cell(&cell.to_string()))
                    .collect::<Vec<_>>()
            })
            .filter(|row| !is_blank_row(row));
        let Some(header_row) = rows.next() else {
            return Err(SourceIssue::NoValidRows {
                path: path.to_path_buf(),
            });
        };
        let headers = header_row
            .iter()
            .enumerate()
            .map(|(idx, name)| normalize_header(name, idx))
            .collect();
        let mut raw = RawTable::new(headers);
        raw.rows.extend(rows);
        debug!(source_file = %source, rows = raw.len(), "worksheet read");
        Ok(unify_table(source, raw, &self.options.column_hints))
    }
}

fn decode_record(record: &csv::ByteRecord, lossy_cells: &mut usize) -> Vec<String> {
    record
        .iter()
        .map(|field| {
            let (value, lossy) = decode_field(field);
            if lossy {
                *lossy_cells += 1;
            }
            value
        })
        .collect()
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result of reading one configured source.
#[derive(Debug)]
pub struct SourceLoad {
    pub spec: SourceSpec,
    pub outcome: IngestOutcome,
}

/// Reads every configured source under the raw directory. Soft issues are
/// logged and kept in the returned list; nothing here aborts the run.
pub fn load_sources(options: &PipelineOptions) -> Vec<SourceLoad> {
    let ingestor = FileIngestor::new(IngestOptions::from_pipeline(options));
    options
        .sources
        .iter()
        .map(|spec| {
            let path = spec.path_in(&options.raw_dir);
            let outcome = ingestor.ingest(&path, spec.format);
            if let Err(issue) = &outcome {
                warn!(source_file = %spec.file_name, "{issue}");
            }
            SourceLoad {
                spec: spec.clone(),
                outcome,
            }
        })
        .collect()
}
