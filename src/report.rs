//src/report.rs

use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::Serialize;

use crate::analysis::AnalysisKind;
use crate::classify::{flag_label, quality_flags};
use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{Confidence, MetricRecord, QualityAssessment, Strandedness};

// -----------------------
// Summary statistics
// -----------------------

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1); undefined below two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(values.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(x) => format!("{:.*}", precision, x),
        None => "n/a".to_string(),
    }
}

fn fmt_range(v: Option<(f64, f64)>, precision: usize) -> String {
    match v {
        Some((lo, hi)) => format!("[{:.*}, {:.*}]", precision, lo, precision, hi),
        None => "n/a".to_string(),
    }
}

// -----------------------
// CSV
// -----------------------

/// One row of the flagged table: the metric columns plus `quality_flags`.
#[derive(Serialize)]
struct FlaggedRow<'a> {
    file: &'a str,
    total_reads: u64,
    unique_sequences: u64,
    duplicate_reads: u64,
    duplication_rate: f64,
    complexity_score: f64,
    entropy: f64,
    gc_content: f64,
    mean_quality: f64,
    quality_assessment: QualityAssessment,
    singletons: u64,
    doubletons: u64,
    chao1_estimate: f64,
    coverage_estimate: f64,
    total_kmers: u64,
    unique_kmers: u64,
    duplicate_kmers: u64,
    kmer_complexity: f64,
    potential_contamination: bool,
    strandedness: Strandedness,
    gc_skew: f64,
    at_skew: f64,
    confidence: Confidence,
    format_valid: bool,
    error: Option<&'a str>,
    quality_flags: String,
}

impl<'a> FlaggedRow<'a> {
    fn new(r: &'a MetricRecord, quality_flags: String) -> Self {
        Self {
            file: &r.file,
            total_reads: r.total_reads,
            unique_sequences: r.unique_sequences,
            duplicate_reads: r.duplicate_reads,
            duplication_rate: r.duplication_rate,
            complexity_score: r.complexity_score,
            entropy: r.entropy,
            gc_content: r.gc_content,
            mean_quality: r.mean_quality,
            quality_assessment: r.quality_assessment,
            singletons: r.singletons,
            doubletons: r.doubletons,
            chao1_estimate: r.chao1_estimate,
            coverage_estimate: r.coverage_estimate,
            total_kmers: r.total_kmers,
            unique_kmers: r.unique_kmers,
            duplicate_kmers: r.duplicate_kmers,
            kmer_complexity: r.kmer_complexity,
            potential_contamination: r.potential_contamination,
            strandedness: r.strandedness,
            gc_skew: r.gc_skew,
            at_skew: r.at_skew,
            confidence: r.confidence,
            format_valid: r.format_valid,
            error: r.error.as_deref(),
            quality_flags,
        }
    }
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| AnalysisError::Report(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AnalysisError::Report(e.to_string()))
}

/// One CSV row per record, header included.
pub fn metrics_csv(records: &[MetricRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for rec in records {
        wtr.serialize(rec)?;
    }
    into_string(wtr)
}

/// Same as [`metrics_csv`] plus a `quality_flags` column.
pub fn flagged_csv(records: &[MetricRecord], cfg: &EngineConfig) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for rec in records {
        wtr.serialize(FlaggedRow::new(rec, record_flag_label(rec, cfg)))?;
    }
    into_string(wtr)
}

/// Flag label for one record; failed files are labelled `FAILED`.
pub fn record_flag_label(rec: &MetricRecord, cfg: &EngineConfig) -> String {
    if rec.is_failed() {
        "FAILED".to_string()
    } else {
        flag_label(&quality_flags(rec, cfg))
    }
}

// -----------------------
// Human-readable summary
// -----------------------

fn distribution<'a, I>(out: &mut String, labels: I, total: usize) -> fmt::Result
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for l in labels {
        *counts.entry(l).or_insert(0) += 1;
    }
    // Most frequent first, ties by name
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (label, count) in counts {
        let pct = 100.0 * count as f64 / total.max(1) as f64;
        writeln!(out, "  {}: {} ({:.1}%)", label, count, pct)?;
    }
    Ok(())
}

fn column(records: &[&MetricRecord], f: impl Fn(&MetricRecord) -> f64) -> Vec<f64> {
    records.iter().map(|r| f(*r)).collect()
}

/// Plain-text batch summary for the sections `kind` computes.
///
/// Statistics are taken over successfully analysed files; failed files are
/// counted and listed separately.
pub fn summary_text(
    records: &[MetricRecord],
    kind: AnalysisKind,
    cfg: &EngineConfig,
) -> Result<String> {
    let ok: Vec<&MetricRecord> = records.iter().filter(|r| !r.is_failed()).collect();
    let failed: Vec<&MetricRecord> = records.iter().filter(|r| r.is_failed()).collect();
    let n = ok.len();

    let mut out = String::new();
    let rule = "=".repeat(80);
    writeln!(out, "{rule}")?;
    writeln!(out, "RNA-SEQ QC REPORT ({})", kind.as_str().to_uppercase())?;
    writeln!(out, "{rule}\n")?;
    writeln!(out, "Total samples analyzed: {}", records.len())?;
    writeln!(out, "Samples failed: {}\n", failed.len())?;

    if kind.includes_complexity() {
        let reads = column(&ok, |r| r.total_reads as f64);
        writeln!(out, "Read Statistics:")?;
        writeln!(out, "  Total reads (mean): {}", fmt_opt(mean(&reads), 0))?;
        writeln!(out, "  Total reads (median): {}", fmt_opt(median(&reads), 0))?;
        writeln!(out, "  Total reads (range): {}\n", fmt_range(min_max(&reads), 0))?;

        let dup = column(&ok, |r| r.duplication_rate);
        writeln!(out, "Duplication Metrics:")?;
        writeln!(out, "  Mean duplication rate: {}%", fmt_opt(mean(&dup), 1))?;
        writeln!(out, "  Median duplication rate: {}%", fmt_opt(median(&dup), 1))?;
        writeln!(
            out,
            "  Samples with <5% duplication: {}",
            dup.iter().filter(|&&d| d < 5.0).count()
        )?;
        writeln!(
            out,
            "  Samples with 5-10% duplication: {}",
            dup.iter().filter(|&&d| (5.0..10.0).contains(&d)).count()
        )?;
        writeln!(
            out,
            "  Samples with >10% duplication: {}\n",
            dup.iter().filter(|&&d| d >= 10.0).count()
        )?;

        let cx = column(&ok, |r| r.complexity_score);
        let ent = column(&ok, |r| r.entropy);
        writeln!(out, "Complexity Metrics:")?;
        writeln!(out, "  Mean complexity score: {}%", fmt_opt(mean(&cx), 1))?;
        writeln!(out, "  Median complexity score: {}%", fmt_opt(median(&cx), 1))?;
        writeln!(out, "  Mean entropy: {}", fmt_opt(mean(&ent), 2))?;
        writeln!(out, "  Median entropy: {}\n", fmt_opt(median(&ent), 2))?;

        let gc = column(&ok, |r| r.gc_content);
        writeln!(out, "GC Content:")?;
        writeln!(out, "  Mean GC%: {}%", fmt_opt(mean(&gc), 1))?;
        writeln!(out, "  Median GC%: {}%", fmt_opt(median(&gc), 1))?;
        writeln!(out, "  Std Dev: {}%\n", fmt_opt(std_dev(&gc), 1))?;

        let chao = column(&ok, |r| r.chao1_estimate);
        writeln!(out, "Library Size Estimates (Chao1):")?;
        writeln!(out, "  Mean: {}", fmt_opt(mean(&chao), 0))?;
        writeln!(out, "  Median: {}", fmt_opt(median(&chao), 0))?;
        writeln!(out, "  Range: {}\n", fmt_range(min_max(&chao), 0))?;

        let cov = column(&ok, |r| r.coverage_estimate);
        writeln!(out, "Coverage Estimates:")?;
        writeln!(out, "  Mean coverage: {}%", fmt_opt(mean(&cov), 1))?;
        writeln!(out, "  Median coverage: {}%\n", fmt_opt(median(&cov), 1))?;

        writeln!(out, "Quality Assessment Distribution:")?;
        distribution(&mut out, ok.iter().map(|r| r.quality_assessment.as_str()), n)?;

        writeln!(out, "\nQuality Flags:")?;
        let labels: Vec<String> = ok.iter().map(|r| record_flag_label(r, cfg)).collect();
        distribution(&mut out, labels.iter().map(String::as_str), n)?;
        writeln!(out)?;
    }

    if kind.includes_contamination() {
        let kc = column(&ok, |r| r.kmer_complexity);
        writeln!(out, "K-mer Complexity Statistics (k={}):", cfg.kmer_size)?;
        writeln!(out, "  Mean: {}", fmt_opt(mean(&kc), 3))?;
        writeln!(out, "  Median: {}", fmt_opt(median(&kc), 3))?;
        writeln!(
            out,
            "  Samples with low complexity: {}",
            ok.iter().filter(|r| r.potential_contamination).count()
        )?;
        for r in ok.iter().filter(|r| r.potential_contamination) {
            writeln!(out, "    {} ({:.3})", r.file, r.kmer_complexity)?;
        }
        writeln!(out)?;
    }

    if kind.includes_strand() {
        writeln!(out, "Strandedness Distribution:")?;
        distribution(&mut out, ok.iter().map(|r| r.strandedness.as_str()), n)?;
        writeln!(out, "\nConfidence Distribution:")?;
        distribution(&mut out, ok.iter().map(|r| r.confidence.as_str()), n)?;

        let skew = column(&ok, |r| r.gc_skew);
        writeln!(out, "\nGC Skew Statistics:")?;
        writeln!(out, "  Mean: {}", fmt_opt(mean(&skew), 4))?;
        writeln!(out, "  Median: {}", fmt_opt(median(&skew), 4))?;
        writeln!(out, "  Std Dev: {}", fmt_opt(std_dev(&skew), 4))?;
        writeln!(out, "  Range: {}\n", fmt_range(min_max(&skew), 4))?;
    }

    if !failed.is_empty() {
        writeln!(out, "Failed Samples:")?;
        writeln!(out, "{}", "-".repeat(80))?;
        for r in &failed {
            writeln!(
                out,
                "  {}: {}",
                r.file,
                r.error.as_deref().unwrap_or("unknown error")
            )?;
        }
    }

    Ok(out)
}

// -----------------------
// Files on disk
// -----------------------

/// File names used for each driver's outputs: (metrics csv, flagged csv, summary).
pub fn report_file_names(kind: AnalysisKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        AnalysisKind::Complexity => (
            "library_complexity_report.csv",
            "library_complexity_with_flags.csv",
            "LIBRARY_COMPLEXITY_SUMMARY.txt",
        ),
        AnalysisKind::Contamination => (
            "contamination_report.csv",
            "contamination_with_flags.csv",
            "CONTAMINATION_SUMMARY.txt",
        ),
        AnalysisKind::Strand => (
            "strand_specificity_report.csv",
            "strand_specificity_with_flags.csv",
            "STRAND_SPECIFICITY_SUMMARY.txt",
        ),
        AnalysisKind::Full => (
            "qc_metrics_report.csv",
            "qc_metrics_with_flags.csv",
            "QC_SUMMARY.txt",
        ),
    }
}

/// Write the batch outputs under `out_dir`; returns the paths written.
///
/// The flagged table is only written when complexity metrics were computed,
/// since every flag is derived from them.
pub fn write_reports(
    records: &[MetricRecord],
    kind: AnalysisKind,
    cfg: &EngineConfig,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).map_err(|e| AnalysisError::io(out_dir, e))?;
    let (metrics_name, flagged_name, summary_name) = report_file_names(kind);
    let mut written = Vec::new();

    let mut put = |name: &str, body: String| -> Result<()> {
        let path = out_dir.join(name);
        fs::write(&path, body).map_err(|e| AnalysisError::io(&path, e))?;
        log::info!("Report saved to {}", path.display());
        written.push(path);
        Ok(())
    };

    put(metrics_name, metrics_csv(records)?)?;
    if kind.includes_complexity() {
        put(flagged_name, flagged_csv(records, cfg)?)?;
    }
    put(summary_name, summary_text(records, kind, cfg)?)?;

    Ok(written)
}
