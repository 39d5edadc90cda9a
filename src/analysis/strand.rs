// src/analysis/strand.rs
//
// Composition-skew strandedness. The forward/reverse split is by read parity,
// so a call of "stranded" here is a heuristic, not evidence of strand origin.

use crate::classify::infer_strandedness;
use crate::config::EngineConfig;
use crate::estimators::skew;
use crate::tally::SequenceTally;
use crate::types::MetricRecord;

pub fn fill_strand(rec: &mut MetricRecord, tally: &SequenceTally, cfg: &EngineConfig) {
    if rec.total_reads == 0 {
        rec.total_reads = tally.total_reads;
    }

    let Some(s) = tally.skew() else {
        return;
    };
    rec.gc_skew = skew(s.forward_gc, s.reverse_gc);
    rec.at_skew = skew(s.forward_at, s.reverse_at);

    let (strandedness, confidence) = infer_strandedness(rec.gc_skew, cfg);
    rec.strandedness = strandedness;
    rec.confidence = confidence;

    log::info!(
        "Strandedness inference complete for {}: {} (skew: {:.3}, {} reads sampled)",
        rec.file,
        rec.strandedness,
        rec.gc_skew,
        s.sampled
    );
}
