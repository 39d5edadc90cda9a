//src/types.rs

use std::fmt;

use serde::Serialize;

/// One sequencing read, with quality already decoded to Phred scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub id: String,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

/// Mean-quality bucket of a library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityAssessment {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

/// Strandedness inferred from composition skew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strandedness {
    Stranded,
    Unstranded,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl QualityAssessment {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityAssessment::High => "high",
            QualityAssessment::Medium => "medium",
            QualityAssessment::Low => "low",
            QualityAssessment::Unknown => "unknown",
        }
    }
}

impl Strandedness {
    pub fn as_str(self) -> &'static str {
        match self {
            Strandedness::Stranded => "stranded",
            Strandedness::Unstranded => "unstranded",
            Strandedness::Unknown => "unknown",
        }
    }
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for QualityAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Strandedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch-level QC flag. Several may apply to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityFlag {
    HighDuplication,
    ModerateDuplication,
    LowComplexity,
    AbnormalGcContent,
    LowCoverage,
}

impl QualityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityFlag::HighDuplication => "HIGH_DUPLICATION",
            QualityFlag::ModerateDuplication => "MODERATE_DUPLICATION",
            QualityFlag::LowComplexity => "LOW_COMPLEXITY",
            QualityFlag::AbnormalGcContent => "ABNORMAL_GC_CONTENT",
            QualityFlag::LowCoverage => "LOW_COVERAGE",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flat, per-file row of metrics.
///
/// Fields a driver does not compute stay at their default (zero / `unknown`).
/// Percentages are on the 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricRecord {
    pub file: String,

    // library complexity
    pub total_reads: u64,
    pub unique_sequences: u64,
    pub duplicate_reads: u64,
    pub duplication_rate: f64,
    pub complexity_score: f64,
    pub entropy: f64,
    pub gc_content: f64,
    pub mean_quality: f64,
    pub quality_assessment: QualityAssessment,
    pub singletons: u64,
    pub doubletons: u64,
    pub chao1_estimate: f64,
    pub coverage_estimate: f64,

    // contamination
    pub total_kmers: u64,
    pub unique_kmers: u64,
    pub duplicate_kmers: u64,
    pub kmer_complexity: f64,
    pub potential_contamination: bool,

    // strand specificity
    pub strandedness: Strandedness,
    pub gc_skew: f64,
    pub at_skew: f64,
    pub confidence: Confidence,

    pub format_valid: bool,
    pub error: Option<String>,
}

impl MetricRecord {
    /// The zeroed / `unknown` row emitted for a file that could not be analysed.
    pub fn failed(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
