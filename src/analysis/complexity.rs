// src/analysis/complexity.rs

use crate::classify::assess_quality;
use crate::config::EngineConfig;
use crate::estimators::{
    chao1, complexity_score, duplication_rate, gc_content, goods_coverage, mean_quality,
    shannon_entropy, FrequencyOfFrequencies,
};
use crate::tally::SequenceTally;
use crate::types::MetricRecord;

/// Library complexity and richness metrics from the exact-sequence counts.
pub fn fill_complexity(rec: &mut MetricRecord, tally: &SequenceTally, cfg: &EngineConfig) {
    let total = tally.total_reads;
    let unique = tally.unique_sequences();

    // Sorted so the float sum is the same on every run.
    let mut counts: Vec<u64> = tally
        .sequence_counts()
        .map(|m| m.values().copied().collect())
        .unwrap_or_default();
    counts.sort_unstable();

    rec.total_reads = total;
    rec.unique_sequences = unique;
    rec.duplicate_reads = total.saturating_sub(unique);
    rec.duplication_rate = duplication_rate(total, unique);
    rec.complexity_score = complexity_score(total, unique);
    rec.entropy = shannon_entropy(counts.iter().copied(), total);
    rec.gc_content = gc_content(tally.gc_bases, tally.total_bases);

    let mean_q = mean_quality(tally.quality_sum, tally.quality_count);
    rec.mean_quality = mean_q.unwrap_or(0.0);
    rec.quality_assessment = assess_quality(mean_q, cfg);

    let fof = FrequencyOfFrequencies::from_counts(counts);
    rec.singletons = fof.singletons();
    rec.doubletons = fof.doubletons();
    rec.chao1_estimate = chao1(unique, rec.singletons, rec.doubletons);
    rec.coverage_estimate = goods_coverage(rec.singletons, total);

    log::info!(
        "Complexity calculation complete for {}: {:.1}% unique, Chao1={:.0}",
        rec.file,
        rec.complexity_score,
        rec.chao1_estimate
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FastqRecord, QualityAssessment};

    fn tally_of(seqs: &[&str], q: u8) -> SequenceTally {
        let mut t = SequenceTally::new();
        for s in seqs {
            t.add(&FastqRecord {
                id: "r".into(),
                sequence: s.as_bytes().to_vec(),
                quality: vec![q; s.len()],
            });
        }
        t
    }

    #[test]
    fn test_four_read_scenario() {
        let t = tally_of(&["ACGT", "ACGT", "TTTT", "GGCC"], 40);
        let mut rec = MetricRecord::default();
        fill_complexity(&mut rec, &t, &EngineConfig::default());

        assert_eq!(rec.total_reads, 4);
        assert_eq!(rec.unique_sequences, 3);
        assert_eq!(rec.duplicate_reads, 1);
        assert_eq!(rec.duplication_rate, 25.0);
        assert_eq!(rec.complexity_score, 75.0);
        assert!((rec.entropy - 1.5).abs() < 1e-12);
        assert_eq!(rec.gc_content, 50.0);
        assert_eq!(rec.quality_assessment, QualityAssessment::High);
        // counts {2,1,1}: F1=2, F2=1 -> 3 + 4/2
        assert_eq!(rec.singletons, 2);
        assert_eq!(rec.doubletons, 1);
        assert_eq!(rec.chao1_estimate, 5.0);
        assert_eq!(rec.coverage_estimate, 50.0);
    }

    #[test]
    fn test_empty_tally_is_all_zero_and_unknown() {
        let t = SequenceTally::new();
        let mut rec = MetricRecord::default();
        fill_complexity(&mut rec, &t, &EngineConfig::default());
        assert_eq!(rec.total_reads, 0);
        assert_eq!(rec.duplication_rate, 0.0);
        assert_eq!(rec.complexity_score, 0.0);
        assert_eq!(rec.entropy, 0.0);
        assert_eq!(rec.gc_content, 0.0);
        assert_eq!(rec.coverage_estimate, 0.0);
        assert_eq!(rec.chao1_estimate, 0.0);
        assert_eq!(rec.quality_assessment, QualityAssessment::Unknown);
    }

    #[test]
    fn test_k_distinct_sequences_repeated() {
        let seqs = ["AAAA", "CCCC", "GGGG", "TTTT", "ACAC"];
        let reads: Vec<&str> = seqs.iter().cycle().take(40).copied().collect();
        let t = tally_of(&reads, 25);
        let mut rec = MetricRecord::default();
        fill_complexity(&mut rec, &t, &EngineConfig::default());

        assert_eq!(rec.unique_sequences, 5);
        assert_eq!(rec.duplication_rate, (40.0 - 5.0) / 40.0 * 100.0);
        assert!((rec.entropy - (5f64).log2()).abs() < 1e-12);
        assert_eq!(rec.quality_assessment, QualityAssessment::Medium);
        // no singletons or doubletons: chao1 == observed
        assert_eq!(rec.chao1_estimate, 5.0);
        assert_eq!(rec.coverage_estimate, 100.0);
    }
}
