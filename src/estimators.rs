//src/estimators.rs
//
// Pure functions from tally outputs to metrics. Percentages are on 0-100.

use ahash::AHashMap;

/// `count value -> number of distinct sequences observed that many times`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyOfFrequencies(AHashMap<u64, u64>);

impl FrequencyOfFrequencies {
    pub fn from_counts<I: IntoIterator<Item = u64>>(counts: I) -> Self {
        let mut map = AHashMap::new();
        for c in counts {
            *map.entry(c).or_insert(0) += 1;
        }
        Self(map)
    }

    pub fn get(&self, count: u64) -> u64 {
        self.0.get(&count).copied().unwrap_or(0)
    }

    /// F1: sequences seen exactly once.
    pub fn singletons(&self) -> u64 {
        self.get(1)
    }

    /// F2: sequences seen exactly twice.
    pub fn doubletons(&self) -> u64 {
        self.get(2)
    }
}

pub fn duplication_rate(total_reads: u64, unique_sequences: u64) -> f64 {
    if total_reads == 0 {
        return 0.0;
    }
    let duplicates = total_reads.saturating_sub(unique_sequences);
    duplicates as f64 / total_reads as f64 * 100.0
}

pub fn complexity_score(total_reads: u64, unique_sequences: u64) -> f64 {
    if total_reads == 0 {
        return 0.0;
    }
    unique_sequences as f64 / total_reads as f64 * 100.0
}

/// Shannon entropy in bits over the distinct-sequence distribution.
pub fn shannon_entropy<I: IntoIterator<Item = u64>>(counts: I, total_reads: u64) -> f64 {
    if total_reads == 0 {
        return 0.0;
    }
    let total = total_reads as f64;
    let mut entropy = 0.0;
    for c in counts {
        if c == 0 {
            continue;
        }
        let p = c as f64 / total;
        entropy -= p * p.log2();
    }
    // -0.0 when there is a single sequence
    entropy.max(0.0)
}

pub fn gc_content(gc_bases: u64, total_bases: u64) -> f64 {
    if total_bases == 0 {
        return 0.0;
    }
    gc_bases as f64 / total_bases as f64 * 100.0
}

/// Arithmetic mean of all quality scores, `None` if there were none.
pub fn mean_quality(quality_sum: u64, quality_count: u64) -> Option<f64> {
    if quality_count == 0 {
        None
    } else {
        Some(quality_sum as f64 / quality_count as f64)
    }
}

/// Chao1 richness: classic form when F2 > 0, bias-corrected form when F2 = 0.
pub fn chao1(observed: u64, singletons: u64, doubletons: u64) -> f64 {
    let s = observed as f64;
    let f1 = singletons as f64;
    if doubletons > 0 {
        s + (f1 * f1) / (2.0 * doubletons as f64)
    } else {
        s + f1 * (f1 - 1.0) / 2.0
    }
}

/// Good's coverage, `(1 - F1/N) * 100`.
pub fn goods_coverage(singletons: u64, total_reads: u64) -> f64 {
    if total_reads == 0 {
        return 0.0;
    }
    (1.0 - singletons as f64 / total_reads as f64) * 100.0
}

pub fn kmer_complexity(unique_kmers: u64, total_kmers: u64) -> f64 {
    if total_kmers == 0 {
        return 0.0;
    }
    unique_kmers as f64 / total_kmers as f64
}

/// `(forward - reverse) / (forward + reverse)`, 0 when both are 0.
pub fn skew(forward: u64, reverse: u64) -> f64 {
    let denom = forward + reverse;
    if denom == 0 {
        return 0.0;
    }
    (forward as f64 - reverse as f64) / denom as f64
}
