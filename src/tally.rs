//src/tally.rs

use ahash::AHashMap;

use crate::types::FastqRecord;

/// Exact occurrence counts keyed by byte string (whole reads or k-mers).
pub type CountMap = AHashMap<Box<[u8]>, u64>;

#[inline]
fn bump(map: &mut CountMap, key: &[u8]) {
    if let Some(c) = map.get_mut(key) {
        *c += 1;
    } else {
        map.insert(key.into(), 1);
    }
}

/// Overlapping k-mer counts for one file.
#[derive(Debug, Clone)]
pub struct KmerTally {
    pub k: usize,
    pub counts: CountMap,
    /// Every extracted k-mer, duplicates included.
    pub total: u64,
}

impl KmerTally {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            counts: CountMap::default(),
            total: 0,
        }
    }

    /// Count every overlapping window of length `k`. Shorter sequences add nothing.
    pub fn add(&mut self, seq: &[u8]) {
        if self.k == 0 || seq.len() < self.k {
            return;
        }
        for kmer in seq.windows(self.k) {
            bump(&mut self.counts, kmer);
            self.total += 1;
        }
    }

    pub fn unique(&self) -> u64 {
        self.counts.len() as u64
    }

    /// Distinct k-mers seen more than once.
    pub fn duplicated(&self) -> u64 {
        self.counts.values().filter(|&&c| c > 1).count() as u64
    }
}

/// G+C / A+T totals split into two read partitions for the skew heuristic.
///
/// The partition is by read parity in encounter order (1-based ordinal: even
/// goes to `forward`, odd to `reverse`), over the first `cap` reads only. This
/// says nothing about which strand a read came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkewTally {
    pub cap: usize,
    pub sampled: usize,
    pub forward_gc: u64,
    pub reverse_gc: u64,
    pub forward_at: u64,
    pub reverse_at: u64,
}

impl SkewTally {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            ..Self::default()
        }
    }

    pub fn is_full(&self) -> bool {
        self.sampled >= self.cap
    }

    /// `seq` must already be upper-cased.
    pub fn add(&mut self, seq: &[u8]) {
        if self.is_full() {
            return;
        }
        self.sampled += 1;
        let (gc, at) = seq.iter().fold((0u64, 0u64), |(gc, at), &b| match b {
            b'G' | b'C' => (gc + 1, at),
            b'A' | b'T' => (gc, at + 1),
            _ => (gc, at),
        });
        if self.sampled % 2 == 0 {
            self.forward_gc += gc;
            self.forward_at += at;
        } else {
            self.reverse_gc += gc;
            self.reverse_at += at;
        }
    }
}

/// Everything accumulated in one streaming pass over a FASTQ file.
///
/// Memory grows with the number of distinct reads and distinct k-mers, not
/// with the number of reads. On deep, diverse libraries that is the dominant
/// cost of the whole engine.
#[derive(Debug, Clone)]
pub struct SequenceTally {
    pub total_reads: u64,
    pub total_bases: u64,
    pub gc_bases: u64,
    /// Running sum / count of decoded Phred scores; the mean is taken at the end.
    pub quality_sum: u64,
    pub quality_count: u64,
    sequences: Option<CountMap>,
    kmers: Option<KmerTally>,
    skew: Option<SkewTally>,
}

impl Default for SequenceTally {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceTally {
    /// A tally that counts exact sequences, bases and quality.
    pub fn new() -> Self {
        Self {
            total_reads: 0,
            total_bases: 0,
            gc_bases: 0,
            quality_sum: 0,
            quality_count: 0,
            sequences: Some(CountMap::default()),
            kmers: None,
            skew: None,
        }
    }

    /// Also count overlapping k-mers of length `k`.
    pub fn with_kmers(mut self, k: usize) -> Self {
        self.kmers = Some(KmerTally::new(k));
        self
    }

    /// Also feed the composition-skew partitions for the first `cap` reads.
    pub fn with_skew(mut self, cap: usize) -> Self {
        self.skew = Some(SkewTally::new(cap));
        self
    }

    /// Skip the exact-sequence map when only k-mers or skew are wanted.
    pub fn without_sequences(mut self) -> Self {
        self.sequences = None;
        self
    }

    pub fn add(&mut self, rec: &FastqRecord) {
        let seq = rec.sequence.to_ascii_uppercase();

        self.total_reads += 1;
        if let Some(map) = self.sequences.as_mut() {
            bump(map, &seq);
        }
        if let Some(kmers) = self.kmers.as_mut() {
            kmers.add(&seq);
        }

        self.total_bases += seq.len() as u64;
        self.gc_bases += seq.iter().filter(|&&b| b == b'G' || b == b'C').count() as u64;

        self.quality_sum += rec.quality.iter().map(|&q| q as u64).sum::<u64>();
        self.quality_count += rec.quality.len() as u64;

        if let Some(skew) = self.skew.as_mut() {
            skew.add(&seq);
        }
    }

    pub fn sequence_counts(&self) -> Option<&CountMap> {
        self.sequences.as_ref()
    }

    pub fn unique_sequences(&self) -> u64 {
        self.sequences.as_ref().map_or(0, |m| m.len() as u64)
    }

    pub fn kmers(&self) -> Option<&KmerTally> {
        self.kmers.as_ref()
    }

    pub fn skew(&self) -> Option<&SkewTally> {
        self.skew.as_ref()
    }
}
