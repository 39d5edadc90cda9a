// src/lib.rs
pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod estimators;
pub mod fastq;
pub mod pool;
pub mod report;
pub mod tally;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;

pub use crate::analysis::{analyze_and_aggregate, analyze_file, aggregate, AnalysisKind};
pub use crate::config::EngineConfig;
pub use crate::error::{AnalysisError, Result};
pub use crate::fastq::{validate_fastq, FastqReader, ValidationReport};
pub use crate::types::{Confidence, FastqRecord, MetricRecord, QualityAssessment, Strandedness};

use crate::pool::parallel_map_files;
use crate::report::{flagged_csv, metrics_csv, summary_text};

/// Per-file records of one batch run, with report text generated on demand.
#[derive(Debug)]
pub struct BatchResults {
    /// Driver that produced the records
    pub kind: AnalysisKind,

    /// One record per input file, sorted by file name
    pub records: Vec<MetricRecord>,

    /// Settings the batch ran with; the flag thresholds come from here
    pub config: EngineConfig,
}

impl BatchResults {
    /// Metrics table as CSV text
    pub fn get_report_csv(&self) -> Result<String> {
        metrics_csv(&self.records)
    }

    /// Metrics table plus the `quality_flags` column
    pub fn get_flagged_csv(&self) -> Result<String> {
        flagged_csv(&self.records, &self.config)
    }

    /// Human-readable batch summary
    pub fn get_summary(&self) -> Result<String> {
        summary_text(&self.records, self.kind, &self.config)
    }

    /// Records that carry an error
    pub fn failed(&self) -> impl Iterator<Item = &MetricRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }

    /// Write every report for this batch under `out_dir`.
    pub fn write_reports(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        report::write_reports(&self.records, self.kind, &self.config, out_dir)
    }
}

fn is_fastq_gz(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .is_some_and(|n| n.ends_with(".fastq.gz") || n.ends_with(".fq.gz"))
}

/// Every `*.fastq.gz` / `*.fq.gz` file below `root`, sorted by path.
pub fn find_fastq_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| AnalysisError::io(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| AnalysisError::io(&dir, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_fastq_gz(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    log::info!("Found {} FASTQ file(s) under {}", found.len(), root.display());
    Ok(found)
}

/// Run one driver over `paths` on the worker pool.
///
/// Every input yields exactly one record; a file that cannot be analysed
/// becomes a failed row instead of aborting the batch.
pub fn run_batch(
    paths: &[PathBuf],
    kind: AnalysisKind,
    cfg: &EngineConfig,
    progress: Option<&ProgressBar>,
) -> Result<BatchResults> {
    // 1. Check settings
    cfg.validate()?;
    if paths.is_empty() {
        return Err(AnalysisError::NoInputFiles(PathBuf::new()));
    }

    // 2. Analyse each file independently
    log::info!(
        "Starting {} analysis of {} file(s) with {} worker(s)",
        kind,
        paths.len(),
        cfg.workers
    );
    let results = parallel_map_files(paths, cfg.workers, progress, |path| {
        analyze_and_aggregate(path, kind, cfg)
    })?;

    // 3. Collect
    let records: Vec<MetricRecord> = results.into_iter().map(|(_, rec)| rec).collect();
    let failed = records.iter().filter(|r| r.is_failed()).count();
    log::info!(
        "{} analysis finished: {} succeeded, {} failed",
        kind,
        records.len() - failed,
        failed
    );

    Ok(BatchResults {
        kind,
        records,
        config: cfg.clone(),
    })
}

/// Discover the gzip FASTQ files under `root` and run one driver over them.
pub fn analyze_directory(
    root: &Path,
    kind: AnalysisKind,
    cfg: &EngineConfig,
    progress: Option<&ProgressBar>,
) -> Result<BatchResults> {
    let paths = find_fastq_files(root)?;
    if paths.is_empty() {
        return Err(AnalysisError::NoInputFiles(root.to_path_buf()));
    }
    if let Some(pb) = progress {
        pb.set_length(paths.len() as u64);
    }
    run_batch(&paths, kind, cfg, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_fastq_files_recurses_and_filters() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("SRR1").join("run");
        fs::create_dir_all(&nested).unwrap();
        for p in [
            dir.path().join("a.fastq.gz"),
            nested.join("b.FQ.GZ"),
            dir.path().join("c.fastq"),
            dir.path().join("notes.txt"),
        ] {
            fs::write(p, b"").unwrap();
        }

        let found = find_fastq_files(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found.len(), 2);
        assert!(names.contains(&"a.fastq.gz".to_string()));
        assert!(names.contains(&"b.FQ.GZ".to_string()));
    }

    #[test]
    fn test_empty_directory_is_no_input() {
        let dir = TempDir::new().unwrap();
        let err = analyze_directory(dir.path(), AnalysisKind::Full, &EngineConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoInputFiles(p) if p == dir.path()));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = find_fastq_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn test_bad_config_is_rejected_before_work() {
        let cfg = EngineConfig {
            workers: 0,
            ..EngineConfig::default()
        };
        let err = run_batch(&[PathBuf::from("x.fastq.gz")], AnalysisKind::Full, &cfg, None)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }
}
