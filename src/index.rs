//! K-mer index: a map from k-mer bytes to the barcode-file offsets of every
//! read that produced that k-mer.
//!
//! The index is built in parallel over chunks of the barcode file (see
//! [`crate::run`]) and discarded once path discovery has finished; it is
//! never persisted to disk (`SPEC_FULL.md` §10).

use std::hash::BuildHasherDefault;

use dashmap::DashMap;
use rustc_hash::FxHasher;

use crate::fastq::MmappedFastq;
use crate::kmer::extract_cyclic_kmers;

/// A `DashMap` keyed by k-mer bytes, hashed with `FxHasher` — the same
/// custom-hasher pattern used throughout this crate for k-mer-keyed maps.
pub type KmerMap<V> = DashMap<Vec<u8>, V, BuildHasherDefault<FxHasher>>;

/// Maps each observed k-mer to the barcode-file offsets of the reads that
/// produced it. A single read may contribute more than one offset entry for
/// the same k-mer (e.g. via indel variants); all are retained.
#[derive(Default)]
pub struct KmerIndex {
    buckets: KmerMap<Vec<u64>>,
    reads_indexed: std::sync::atomic::AtomicUsize,
}

impl KmerIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes one batch (chunk) of barcode reads, stopping early once
    /// `cap` reads total have been indexed across all batches.
    ///
    /// Returns the number of reads actually indexed from this batch (may be
    /// fewer than `offsets.len()` if the cap was reached partway through).
    pub fn index_batch(
        &self,
        fastq: &MmappedFastq,
        offsets: &[u64],
        kmer_size: usize,
        barcode_start: usize,
        barcode_end: usize,
        indel_tolerant: bool,
        cap: usize,
    ) -> usize {
        let mut indexed = 0;
        for &offset in offsets {
            let already = self.reads_indexed.load(std::sync::atomic::Ordering::Relaxed);
            if already >= cap {
                break;
            }

            let Ok(record) = fastq.record_at(offset) else {
                continue;
            };
            let kmers = extract_cyclic_kmers(
                record.sequence,
                record.quality,
                kmer_size,
                barcode_start,
                barcode_end,
                indel_tolerant,
            );
            for cyclic in kmers {
                self.buckets
                    .entry(cyclic.kmer.to_vec())
                    .or_default()
                    .push(offset);
            }

            self.reads_indexed
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            indexed += 1;
        }
        indexed
    }

    /// All distinct k-mers currently in the index.
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.buckets.iter().map(|entry| entry.key().clone()).collect()
    }

    /// The offsets associated with `kmer`, or an empty slice if unseen.
    #[must_use]
    pub fn lookup(&self, kmer: &[u8]) -> Vec<u64> {
        self.buckets
            .get(kmer)
            .map(|bucket| bucket.clone())
            .unwrap_or_default()
    }

    /// Number of offsets recorded for `kmer`.
    #[must_use]
    pub fn count(&self, kmer: &[u8]) -> usize {
        self.buckets.get(kmer).map_or(0, |bucket| bucket.len())
    }

    /// Total number of reads that have contributed to the index.
    #[must_use]
    pub fn reads_indexed(&self) -> usize {
        self.reads_indexed.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Whether the index has reached its read cap.
    #[must_use]
    pub fn is_full(&self, cap: usize) -> bool {
        self.reads_indexed() >= cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fastq(records: &[(&str, &str)]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for (seq, qual) in records {
            writeln!(file, "@r\n{seq}\n+\n{qual}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn index_batch_records_every_kmer_offset() {
        let file = write_fastq(&[("ACGTACGTACGT", "IIIIIIIIIIII")]);
        let fastq = MmappedFastq::open(file.path()).unwrap();
        let offsets: Vec<u64> = fastq.iter_records().map(|(offset, _)| offset).collect();

        let index = KmerIndex::new();
        index.index_batch(&fastq, &offsets, 7, 0, 12, false, usize::MAX);

        let keys = index.keys();
        assert!(!keys.is_empty());
        for key in &keys {
            assert_eq!(index.count(key), index.lookup(key).len());
        }
    }

    #[test]
    fn index_batch_respects_cap() {
        let file = write_fastq(&[
            ("ACGTACGTACGT", "IIIIIIIIIIII"),
            ("TTTTTTTTTTTT", "IIIIIIIIIIII"),
        ]);
        let fastq = MmappedFastq::open(file.path()).unwrap();
        let offsets: Vec<u64> = fastq.iter_records().map(|(offset, _)| offset).collect();

        let index = KmerIndex::new();
        index.index_batch(&fastq, &offsets, 7, 0, 12, false, 1);

        assert_eq!(index.reads_indexed(), 1);
        assert!(index.is_full(1));
    }
}
