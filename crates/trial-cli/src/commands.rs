use std::path::PathBuf;

use anyhow::{Context, Result};

use trial_cli::pipeline::run_pipeline;
use trial_cli::types::RunResult;
use trial_model::options::DEFAULT_PROCESSED_DIR;
use trial_transform::{LabelVocabulary, VOCABULARY_FILE};

use crate::cli::{RunArgs, VocabularyArgs};
use crate::summary::print_vocabulary;

pub fn run_prepare(args: &RunArgs) -> Result<RunResult> {
    let options = args.to_options();
    run_pipeline(&options)
}

pub fn run_vocabulary(args: &VocabularyArgs) -> Result<()> {
    let path = args.path.clone().unwrap_or_else(|| {
        args.processed_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROCESSED_DIR))
            .join(VOCABULARY_FILE)
    });
    let vocabulary = LabelVocabulary::load(&path)
        .with_context(|| format!("load vocabulary from {}", path.display()))?;
    if args.classes {
        print!("{}", vocabulary.render_report());
    } else {
        println!("Vocabulary: {}", path.display());
        print_vocabulary(&vocabulary);
    }
    Ok(())
}
