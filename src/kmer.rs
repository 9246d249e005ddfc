//! Cyclic k-mer extraction.
//!
//! A barcode read's barcode window is "circularized" by prepending a
//! sentinel (`$`, outside the DNA alphabet) and appending its own `k-1`
//! prefix, so the set of k-mers drawn from it traces a cycle in the De
//! Bruijn graph built from the barcode-read population. Exactly one k-mer
//! per read begins with the sentinel — the seed k-mer identifying that
//! read's candidate cell of origin.

use bytes::Bytes;

/// Sentinel byte marking the origin of a circularized barcode sequence. Not
/// a valid DNA base, so it can never collide with a real k-mer.
pub const SENTINEL: u8 = b'$';

/// Base used to pad a barcode window that runs past the end of its read.
/// Fixed (rather than random) so extraction stays a pure, reproducible
/// function of its inputs.
const PAD_BASE: u8 = b'A';

/// A k-mer paired with its aligned quality string, both drawn from a
/// circularized barcode (or quality) sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CyclicKmer {
    pub kmer: Bytes,
    pub quality: Bytes,
}

impl CyclicKmer {
    #[must_use]
    pub fn is_seed(&self) -> bool {
        self.kmer.first() == Some(&SENTINEL)
    }
}

/// Builds the circularized sequence `core · core[0..k-1)`, where
/// `core = $ · data[lo..hi]`, padding `data` with `PAD_BASE` first if `hi`
/// runs past its end.
///
/// The wrap re-reads `core` (not the raw barcode), so it reproduces the
/// sentinel at its head — the walk that later traces this sequence's k-mers
/// through the De Bruijn graph returns to the same `$`-prefixed node it
/// started from, closing the cycle.
fn circularize(data: &[u8], k: usize, lo: usize, hi: usize) -> Vec<u8> {
    let mut padded = data.to_vec();
    let hi = if hi >= padded.len() {
        padded.push(PAD_BASE);
        padded.len() - 1
    } else {
        hi
    };
    let lo = lo.min(padded.len());
    let hi = hi.max(lo);

    let mut core = Vec::with_capacity(1 + (hi - lo));
    core.push(SENTINEL);
    core.extend_from_slice(&padded[lo..hi]);

    let wrap_len = k.saturating_sub(1).min(core.len());
    let mut out = core.clone();
    out.extend_from_slice(&core[..wrap_len]);
    out
}

/// Extracts the cyclic k-mer/quality tuples for one barcode read.
///
/// `sequence` and `quality` must be the same length. `start`/`end` bound the
/// barcode window within them. When `indel` is set, two additional
/// circularizations — barcode truncated by one base, barcode extended by
/// one base — are emitted to tolerate a single indel.
///
/// This is a pure function: it never fails, and an empty `sequence` yields
/// an empty list.
#[must_use]
pub fn extract_cyclic_kmers(
    sequence: &[u8],
    quality: &[u8],
    k: usize,
    start: usize,
    end: usize,
    indel: bool,
) -> Vec<CyclicKmer> {
    if k == 0 || sequence.is_empty() {
        return Vec::new();
    }

    let mut kmers = Vec::new();
    let mut push_variant = |lo: usize, hi: usize| {
        let seq_variant = circularize(sequence, k, lo, hi);
        let qual_variant = circularize(quality, k, lo, hi);
        for (k_win, q_win) in seq_variant.windows(k).zip(qual_variant.windows(k)) {
            kmers.push(CyclicKmer {
                kmer: Bytes::copy_from_slice(k_win),
                quality: Bytes::copy_from_slice(q_win),
            });
        }
    };

    push_variant(start, end);

    if indel {
        if end > start {
            push_variant(start, end - 1);
        }
        push_variant(start, end + 1);
    }

    kmers
}

/// The `k-1`-length prefix of a k-mer — its left De Bruijn-graph node.
#[must_use]
pub fn prefix(kmer: &[u8]) -> &[u8] {
    &kmer[..kmer.len() - 1]
}

/// The `k-1`-length suffix of a k-mer — its right De Bruijn-graph node.
#[must_use]
pub fn suffix(kmer: &[u8]) -> &[u8] {
    &kmer[1..]
}
