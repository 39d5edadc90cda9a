//src/config.rs

use std::env;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};

/// Default k-mer length used for contamination screening.
pub const DEFAULT_KMER_SIZE: usize = 31;

/// Reads sampled for the composition-skew strand inference.
pub const DEFAULT_STRAND_SAMPLE_SIZE: usize = 100_000;

/// Default width of the file-level worker pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Explicit engine configuration, passed into every entry point.
///
/// Percent thresholds are on the 0-100 scale, ratio thresholds on 0-1.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub kmer_size: usize,
    pub strand_sample_size: usize,
    pub workers: usize,

    // quality assessment (mean Phred)
    pub high_quality_threshold: f64,
    pub medium_quality_threshold: f64,

    // contamination
    pub kmer_complexity_threshold: f64,

    // strandedness (|gc_skew|)
    pub stranded_skew_threshold: f64,
    pub stranded_high_confidence_skew: f64,
    pub unstranded_high_confidence_skew: f64,

    // batch quality flags
    pub high_duplication_rate: f64,
    pub moderate_duplication_rate: f64,
    pub min_complexity_score: f64,
    pub min_gc_content: f64,
    pub max_gc_content: f64,
    pub min_coverage: f64,

    /// Stop with `InvalidFormat` when the reader saw structural errors.
    pub require_valid_format: bool,
    /// How many validation messages are kept per file.
    pub max_reported_errors: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kmer_size: DEFAULT_KMER_SIZE,
            strand_sample_size: DEFAULT_STRAND_SAMPLE_SIZE,
            workers: DEFAULT_WORKERS,
            high_quality_threshold: 30.0,
            medium_quality_threshold: 20.0,
            kmer_complexity_threshold: 0.7,
            stranded_skew_threshold: 0.1,
            stranded_high_confidence_skew: 0.2,
            unstranded_high_confidence_skew: 0.05,
            high_duplication_rate: 20.0,
            moderate_duplication_rate: 10.0,
            min_complexity_score: 50.0,
            min_gc_content: 40.0,
            max_gc_content: 60.0,
            min_coverage: 80.0,
            require_valid_format: true,
            max_reported_errors: 10,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with the pipeline's environment variables.
    ///
    /// Unset variables keep their default; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        // KMER_SIZE and QC_MAX_WORKERS are this tool's own; the rest match the pipeline
        override_from(&lookup, "KMER_SIZE", &mut cfg.kmer_size)?;
        override_from(&lookup, "STRAND_DETECT_SAMPLE_SIZE", &mut cfg.strand_sample_size)?;
        override_from(&lookup, "QC_MAX_WORKERS", &mut cfg.workers)?;
        override_fraction_from(&lookup, "MIN_COMPLEXITY_SCORE", &mut cfg.min_complexity_score)?;
        override_fraction_from(&lookup, "MAX_DUPLICATION_RATE", &mut cfg.high_duplication_rate)?;
        override_from(&lookup, "KMER_COMPLEXITY_THRESHOLD", &mut cfg.kmer_complexity_threshold)?;
        override_from(&lookup, "MIN_GC_CONTENT_PERCENT", &mut cfg.min_gc_content)?;
        override_from(&lookup, "MAX_GC_CONTENT_PERCENT", &mut cfg.max_gc_content)?;
        override_from(&lookup, "FORWARD_STRAND_THRESHOLD", &mut cfg.stranded_skew_threshold)?;
        override_from(
            &lookup,
            "REVERSE_STRAND_THRESHOLD",
            &mut cfg.stranded_high_confidence_skew,
        )?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 {
            return Err(AnalysisError::Config("kmer_size must be >= 1".into()));
        }
        if self.workers == 0 {
            return Err(AnalysisError::Config("workers must be >= 1".into()));
        }
        if self.min_gc_content > self.max_gc_content {
            return Err(AnalysisError::Config(format!(
                "min_gc_content ({}) is above max_gc_content ({})",
                self.min_gc_content, self.max_gc_content
            )));
        }
        if self.medium_quality_threshold > self.high_quality_threshold {
            return Err(AnalysisError::Config(format!(
                "medium_quality_threshold ({}) is above high_quality_threshold ({})",
                self.medium_quality_threshold, self.high_quality_threshold
            )));
        }
        Ok(())
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|_| {
            AnalysisError::Config(format!("{key}={raw:?} is not a valid value"))
        })?;
    }
    Ok(())
}

/// Pipeline variables given as a 0-1 fraction land on a 0-100 field.
fn override_fraction_from<F>(lookup: &F, key: &str, slot: &mut f64) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if lookup(key).is_some() {
        let mut fraction = 0.0_f64;
        override_from(lookup, key, &mut fraction)?;
        *slot = fraction * 100.0;
    }
    Ok(())
}
