//! Batch extraction over many files.

use crate::error::CodeintelError;
use crate::parser::Registry;
use crate::types::FileAnalysis;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Progress callback for scans.
/// Called with (current, total, path) before each file is parsed.
pub type ScanProgressCallback<'a> = dyn Fn(usize, usize, &Path) + 'a;

/// A file that could not be read or parsed.
#[derive(Debug)]
pub struct ScanFailure {
    /// File that failed.
    pub path: PathBuf,
    /// Why it failed.
    pub error: CodeintelError,
}

/// Result of scanning a set of files.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Successful analyses, in input order.
    pub analyses: Vec<FileAnalysis>,
    /// Files that failed, in input order.
    pub failures: Vec<ScanFailure>,
}

/// Aggregate counts for a [`ScanReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Files attempted.
    pub files: usize,
    /// Files that produced an analysis.
    pub analyzed: usize,
    /// Files that failed.
    pub failed: usize,
    /// Top-level symbols plus members.
    pub symbols: usize,
    /// Relationships across all files.
    pub relationships: usize,
    /// Analyzed files per language tag.
    pub languages: BTreeMap<String, usize>,
}

impl ScanReport {
    /// Counts across the report.
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary {
            files: self.analyses.len() + self.failures.len(),
            analyzed: self.analyses.len(),
            failed: self.failures.len(),
            ..ScanSummary::default()
        };
        for analysis in &self.analyses {
            summary.symbols += analysis.symbol_count();
            summary.relationships += analysis.relationships.len();
            *summary.languages.entry(analysis.language.clone()).or_default() += 1;
        }
        summary
    }

    /// Whether every file was analyzed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read and parse every path through `registry`.
///
/// One file failing never stops the scan; the failure is recorded and the
/// next file is attempted.
pub fn scan_files<P: AsRef<Path>>(registry: &Registry, paths: &[P]) -> ScanReport {
    scan_files_with_progress(registry, paths, None)
}

/// [`scan_files`] with a progress callback.
pub fn scan_files_with_progress<P: AsRef<Path>>(
    registry: &Registry,
    paths: &[P],
    progress: Option<&ScanProgressCallback<'_>>,
) -> ScanReport {
    let mut report = ScanReport::default();
    let total = paths.len();

    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        if let Some(cb) = progress {
            cb(i, total, path);
        }

        let result = std::fs::read(path)
            .map_err(CodeintelError::from)
            .and_then(|content| registry.parse(&content, path));
        match result {
            Ok(analysis) => {
                debug!(path = %path.display(), language = %analysis.language, symbols = analysis.symbol_count(), "Analyzed file");
                report.analyses.push(analysis);
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Failed to analyze file");
                report.failures.push(ScanFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    if let Some(cb) = progress {
        cb(total, total, Path::new(""));
    }
    report
}
