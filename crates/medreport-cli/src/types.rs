use std::path::PathBuf;

use medreport_core::BatchReport;

/// Outcome of a `generate` run.
#[derive(Debug)]
pub struct GenerateResult {
    /// Language of the rule file actually used.
    pub language: String,
    pub batch: BatchReport,
    pub output: Option<PathBuf>,
    pub audit: Option<PathBuf>,
}
