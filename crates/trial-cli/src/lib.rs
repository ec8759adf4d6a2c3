//! CLI library components for trial-prep.

pub mod logging;
pub mod pipeline;
pub mod types;
