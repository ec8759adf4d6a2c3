//! CLI argument definitions for trial-prep.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use trial_model::PipelineOptions;

#[derive(Parser)]
#[command(
    name = "trial-prep",
    version,
    about = "Prepare clinical-trial records for outcome modelling",
    long_about = "Merge heterogeneous clinical-trial record files into one dataset,\n\
                  repair and expand it, encode categorical fields and write a\n\
                  stratified train/test split.\n\n\
                  Running without a subcommand runs the full pipeline."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline (the default when no subcommand is given).
    Run(RunArgs),

    /// Print the persisted vocabulary.
    Vocabulary(VocabularyArgs),
}

#[derive(Args, Clone, Default)]
pub struct RunArgs {
    /// Directory holding the raw source files.
    #[arg(long = "raw-dir", value_name = "DIR")]
    pub raw_dir: Option<PathBuf>,

    /// Directory receiving the vocabulary and split tables.
    #[arg(long = "processed-dir", value_name = "DIR")]
    pub processed_dir: Option<PathBuf>,

    /// Rows per batch when reading delimited text.
    #[arg(long = "chunk-size", value_name = "ROWS")]
    pub chunk_size: Option<usize>,

    /// Share of rows placed in the test split.
    #[arg(long = "test-fraction", value_name = "FRACTION")]
    pub test_fraction: Option<f64>,

    /// Seed for the split shuffle.
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Hide progress bars.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

impl RunArgs {
    /// Applies the flags that were given on top of the defaults.
    pub fn to_options(&self) -> PipelineOptions {
        let mut options = PipelineOptions::default().with_progress(!self.no_progress);
        if let Some(dir) = &self.raw_dir {
            options = options.with_raw_dir(dir);
        }
        if let Some(dir) = &self.processed_dir {
            options = options.with_processed_dir(dir);
        }
        if let Some(size) = self.chunk_size {
            options = options.with_chunk_size(size);
        }
        if let Some(fraction) = self.test_fraction {
            options = options.with_test_fraction(fraction);
        }
        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }
        options
    }
}

#[derive(Args)]
pub struct VocabularyArgs {
    /// Vocabulary file (default: <processed-dir>/label_encoders.json).
    #[arg(value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// Directory holding the vocabulary.
    #[arg(long = "processed-dir", value_name = "DIR")]
    pub processed_dir: Option<PathBuf>,

    /// Print every class instead of the per-column summary.
    #[arg(long = "classes")]
    pub classes: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
