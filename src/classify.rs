//src/classify.rs

use crate::config::EngineConfig;
use crate::types::{Confidence, MetricRecord, QualityAssessment, QualityFlag, Strandedness};

/// Label written for a record with no flags.
pub const PASS_LABEL: &str = "PASS";

/// Bucket a mean Phred score; `None` (no scores seen) is `Unknown`.
pub fn assess_quality(mean_quality: Option<f64>, cfg: &EngineConfig) -> QualityAssessment {
    match mean_quality {
        None => QualityAssessment::Unknown,
        Some(q) if q >= cfg.high_quality_threshold => QualityAssessment::High,
        Some(q) if q >= cfg.medium_quality_threshold => QualityAssessment::Medium,
        Some(_) => QualityAssessment::Low,
    }
}

/// Low k-mer complexity means repetitive or low-diversity content.
pub fn is_potential_contamination(kmer_complexity: f64, cfg: &EngineConfig) -> bool {
    kmer_complexity < cfg.kmer_complexity_threshold
}

/// Strandedness call from GC skew magnitude.
pub fn infer_strandedness(gc_skew: f64, cfg: &EngineConfig) -> (Strandedness, Confidence) {
    let magnitude = gc_skew.abs();
    if magnitude > cfg.stranded_skew_threshold {
        let confidence = if magnitude > cfg.stranded_high_confidence_skew {
            Confidence::High
        } else {
            Confidence::Medium
        };
        (Strandedness::Stranded, confidence)
    } else {
        let confidence = if magnitude < cfg.unstranded_high_confidence_skew {
            Confidence::High
        } else {
            Confidence::Medium
        };
        (Strandedness::Unstranded, confidence)
    }
}

/// Every flag that applies to `rec`, in a fixed order. Empty means pass.
pub fn quality_flags(rec: &MetricRecord, cfg: &EngineConfig) -> Vec<QualityFlag> {
    let mut flags = Vec::new();

    if rec.duplication_rate > cfg.high_duplication_rate {
        flags.push(QualityFlag::HighDuplication);
    } else if rec.duplication_rate > cfg.moderate_duplication_rate {
        flags.push(QualityFlag::ModerateDuplication);
    }
    if rec.complexity_score < cfg.min_complexity_score {
        flags.push(QualityFlag::LowComplexity);
    }
    if rec.gc_content < cfg.min_gc_content || rec.gc_content > cfg.max_gc_content {
        flags.push(QualityFlag::AbnormalGcContent);
    }
    if rec.coverage_estimate < cfg.min_coverage {
        flags.push(QualityFlag::LowCoverage);
    }
    flags
}

/// `PASS`, or the flags joined with `|`.
pub fn flag_label(flags: &[QualityFlag]) -> String {
    if flags.is_empty() {
        PASS_LABEL.to_string()
    } else {
        flags
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}
