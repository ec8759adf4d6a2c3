pub mod ingest;
pub mod polars_utils;
pub mod progress;
pub mod raw_table;
pub mod unify;

pub use ingest::{FileIngestor, IngestOptions, IngestOutcome, SourceLoad, load_sources};
pub use polars_utils::{any_to_string, format_numeric, parse_f64};
pub use raw_table::{RawTable, normalize_cell, normalize_header};
pub use unify::{HeaderPlan, normalize_status, resolve_synonym, unify_table};
