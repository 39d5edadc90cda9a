// src/analysis/mod.rs

pub mod complexity;
pub mod contamination;
pub mod strand;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};
use crate::fastq::FastqReader;
use crate::tally::SequenceTally;
use crate::types::MetricRecord;

pub use complexity::fill_complexity;
pub use contamination::fill_contamination;
pub use strand::fill_strand;

/// Which driver to run over each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    /// Duplication, entropy, GC, quality, Chao1, Good's coverage.
    Complexity,
    /// K-mer complexity contamination proxy.
    Contamination,
    /// Composition-skew strandedness over the first sampled reads.
    Strand,
    /// All three drivers in a single pass.
    Full,
}

impl AnalysisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Complexity => "complexity",
            AnalysisKind::Contamination => "contamination",
            AnalysisKind::Strand => "strand",
            AnalysisKind::Full => "full",
        }
    }

    /// Only the structures this driver reads from are allocated.
    pub fn new_tally(self, cfg: &EngineConfig) -> SequenceTally {
        match self {
            AnalysisKind::Complexity => SequenceTally::new(),
            AnalysisKind::Contamination => {
                SequenceTally::new().without_sequences().with_kmers(cfg.kmer_size)
            }
            AnalysisKind::Strand => SequenceTally::new()
                .without_sequences()
                .with_skew(cfg.strand_sample_size),
            AnalysisKind::Full => SequenceTally::new()
                .with_kmers(cfg.kmer_size)
                .with_skew(cfg.strand_sample_size),
        }
    }

    pub fn includes_complexity(self) -> bool {
        matches!(self, AnalysisKind::Complexity | AnalysisKind::Full)
    }

    pub fn includes_contamination(self) -> bool {
        matches!(self, AnalysisKind::Contamination | AnalysisKind::Full)
    }

    pub fn includes_strand(self) -> bool {
        matches!(self, AnalysisKind::Strand | AnalysisKind::Full)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name used as the record key: the file name, or the full path if it has none.
pub fn file_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Stream one file through the engine and derive its metrics.
///
/// Reads the whole file once; the strand driver alone stops after
/// `strand_sample_size` reads.
pub fn analyze_file(path: &Path, kind: AnalysisKind, cfg: &EngineConfig) -> Result<MetricRecord> {
    let file = file_key(path);
    log::info!("Running {} analysis on {}", kind, file);

    // 1. Tally
    let mut reader = FastqReader::open(path, cfg)?;
    let mut tally = kind.new_tally(cfg);
    let stop_early = kind == AnalysisKind::Strand;
    for rec in reader.by_ref() {
        tally.add(&rec?);
        if stop_early && tally.skew().is_some_and(|s| s.is_full()) {
            break;
        }
    }

    // 2. Validation gate
    let validation = reader.into_validation();
    if !validation.valid {
        log::warn!(
            "FASTQ validation failed for {} ({} problem(s))",
            file,
            validation.error_count
        );
        if cfg.require_valid_format {
            return Err(AnalysisError::InvalidFormat {
                path: path.to_path_buf(),
                errors: validation.errors,
            });
        }
    }
    log::debug!(
        "{}: {} reads, {} distinct sequences, {} distinct k-mers",
        file,
        tally.total_reads,
        tally.unique_sequences(),
        tally.kmers().map_or(0, |k| k.unique())
    );

    // 3. Estimate + classify
    let mut rec = MetricRecord {
        file,
        format_valid: validation.valid,
        ..MetricRecord::default()
    };
    if kind.includes_complexity() {
        fill_complexity(&mut rec, &tally, cfg);
    }
    if kind.includes_contamination() {
        fill_contamination(&mut rec, &tally, cfg);
    }
    if kind.includes_strand() {
        fill_strand(&mut rec, &tally, cfg);
    }
    Ok(rec)
}

/// Turn a per-file result into exactly one record; failures become a
/// zeroed row carrying the error message.
pub fn aggregate(path: &Path, result: Result<MetricRecord>) -> MetricRecord {
    match result {
        Ok(rec) => rec,
        Err(e) => {
            log::error!("Error analysing {}: {}", path.display(), e);
            MetricRecord::failed(file_key(path), e.to_string())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one file's analysis, turning a panic into an error for that file only.
pub fn catch_file_panic<F>(f: F) -> Result<MetricRecord>
where
    F: FnOnce() -> Result<MetricRecord>,
{
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(AnalysisError::Panicked(panic_message(payload.as_ref()))))
}

/// [`analyze_file`] followed by [`aggregate`]; never fails, never unwinds.
pub fn analyze_and_aggregate(path: &Path, kind: AnalysisKind, cfg: &EngineConfig) -> MetricRecord {
    aggregate(path, catch_file_panic(|| analyze_file(path, kind, cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QualityAssessment, Strandedness};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fastq(dir: &TempDir, name: &str, seqs: &[&str]) -> PathBuf {
        let mut body = String::new();
        for (i, s) in seqs.iter().enumerate() {
            body.push_str(&format!("@read{}\n{}\n+\n{}\n", i, s, "I".repeat(s.len())));
        }
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_full_analysis_fills_every_section() {
        let dir = TempDir::new().unwrap();
        let path = fastq(&dir, "s1.fastq", &["ACGT", "ACGT", "TTTT", "GGCC"]);
        let cfg = EngineConfig {
            kmer_size: 3,
            ..EngineConfig::default()
        };
        let rec = analyze_file(&path, AnalysisKind::Full, &cfg).unwrap();

        assert_eq!(rec.file, "s1.fastq");
        assert!(rec.format_valid);
        assert_eq!(rec.unique_sequences, 3);
        assert_eq!(rec.quality_assessment, QualityAssessment::High);
        assert_eq!(rec.total_kmers, 8);
        assert_ne!(rec.strandedness, Strandedness::Unknown);
    }

    #[test]
    fn test_strand_only_leaves_complexity_untouched() {
        let dir = TempDir::new().unwrap();
        let path = fastq(&dir, "s2.fastq", &["ACGT", "GGCC"]);
        let rec = analyze_file(&path, AnalysisKind::Strand, &EngineConfig::default()).unwrap();
        assert_eq!(rec.unique_sequences, 0);
        assert_eq!(rec.quality_assessment, QualityAssessment::Unknown);
        assert_eq!(rec.total_reads, 2);
    }

    #[test]
    fn test_strand_stops_at_sample_size() {
        let dir = TempDir::new().unwrap();
        let seqs = vec!["ACGT"; 50];
        let path = fastq(&dir, "s3.fastq", &seqs);
        let cfg = EngineConfig {
            strand_sample_size: 10,
            ..EngineConfig::default()
        };
        let rec = analyze_file(&path, AnalysisKind::Strand, &cfg).unwrap();
        assert_eq!(rec.total_reads, 10);
    }

    #[test]
    fn test_invalid_format_is_rejected_then_aggregated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.fastq");
        std::fs::write(&path, "read0\nACGT\n+\nIIII\n").unwrap();

        let err = analyze_file(&path, AnalysisKind::Complexity, &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidFormat { .. }));

        let rec = analyze_and_aggregate(&path, AnalysisKind::Complexity, &EngineConfig::default());
        assert_eq!(rec.file, "bad.fastq");
        assert!(rec.is_failed());
        assert!(!rec.format_valid);
        assert_eq!(rec.total_reads, 0);
        assert_eq!(rec.quality_assessment, QualityAssessment::Unknown);
    }

    #[test]
    fn test_invalid_format_allowed_when_configured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lenient.fastq");
        std::fs::write(&path, "read0\nACGT\n+\nIIII\n").unwrap();
        let cfg = EngineConfig {
            require_valid_format: false,
            ..EngineConfig::default()
        };
        let rec = analyze_file(&path, AnalysisKind::Complexity, &cfg).unwrap();
        assert!(!rec.format_valid);
        assert_eq!(rec.total_reads, 1);
    }

    #[test]
    fn test_missing_file_aggregates_to_failed_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.fastq.gz");
        let rec = analyze_and_aggregate(&path, AnalysisKind::Full, &EngineConfig::default());
        assert_eq!(rec.file, "missing.fastq.gz");
        assert!(rec.error.as_deref().unwrap().contains("I/O error"));
    }

    #[test]
    fn test_panic_in_one_file_becomes_failed_row() {
        let path = PathBuf::from("boom.fastq.gz");
        let result = catch_file_panic(|| panic!("index out of range"));
        assert!(matches!(&result, Err(AnalysisError::Panicked(m)) if m == "index out of range"));

        let rec = aggregate(&path, result);
        assert_eq!(rec.file, "boom.fastq.gz");
        assert_eq!(rec.error.as_deref(), Some("Analysis panicked: index out of range"));

        let ok = catch_file_panic(|| Ok(MetricRecord::default()));
        assert!(ok.is_ok());
    }
}
