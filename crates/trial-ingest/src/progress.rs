//! Progress reporting for chunked file scans.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

/// Template for the per-file batch progress bar.
pub const CHUNK_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches {msg}";

/// Creates the batch progress bar for one file. Hidden when disabled, so the
/// caller can drive it unconditionally.
pub fn create_chunk_progress_bar(batches: u64, description: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(batches.max(1));
    if let Ok(style) = ProgressStyle::default_bar().template(CHUNK_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(description.to_string());
    pb
}

/// Counts newline bytes without holding more than one buffer in memory.
pub fn count_lines(path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; 64 * 1024];
    let mut lines = 0u64;
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        lines += buffer[..read].iter().filter(|byte| **byte == b'\n').count() as u64;
    }
    Ok(lines)
}

/// Number of batches a file with `lines` lines produces at `chunk_size`.
pub fn expected_batches(lines: u64, chunk_size: usize) -> u64 {
    let chunk = chunk_size.max(1) as u64;
    lines.saturating_sub(1).div_ceil(chunk).max(1)
}
