// src/analysis/contamination.rs

use crate::classify::is_potential_contamination;
use crate::config::EngineConfig;
use crate::estimators::kmer_complexity;
use crate::tally::SequenceTally;
use crate::types::MetricRecord;

/// K-mer complexity and the contamination proxy flag.
pub fn fill_contamination(rec: &mut MetricRecord, tally: &SequenceTally, cfg: &EngineConfig) {
    if rec.total_reads == 0 {
        rec.total_reads = tally.total_reads;
    }

    let (total, unique, duplicated) = tally
        .kmers()
        .map(|k| (k.total, k.unique(), k.duplicated()))
        .unwrap_or((0, 0, 0));

    rec.total_kmers = total;
    rec.unique_kmers = unique;
    rec.duplicate_kmers = duplicated;
    rec.kmer_complexity = kmer_complexity(unique, total);
    rec.potential_contamination = is_potential_contamination(rec.kmer_complexity, cfg);

    if rec.potential_contamination {
        log::warn!(
            "Low k-mer complexity detected in {}: {:.3}",
            rec.file,
            rec.kmer_complexity
        );
    }
    log::info!(
        "K-mer analysis complete for {}: {} unique, {:.3} complexity",
        rec.file,
        unique,
        rec.kmer_complexity
    );
}
