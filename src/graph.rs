//! Weighted directed multigraph over `(k-1)`-length De Bruijn nodes.
//!
//! Nodes are `k-1`-length byte strings (including the sentinel). Each
//! extracted k-mer `ab...c` contributes one edge from its `k-1`-prefix node
//! to its `k-1`-suffix node, weighted by the number of times that k-mer was
//! observed in the subgraph's source reads.

use std::collections::HashMap;

use crate::fastq::MmappedFastq;
use crate::kmer::{extract_cyclic_kmers, prefix, suffix};

/// One edge of the graph: the k-mer that generated it, its observed count
/// within this subgraph, and the (prefix, suffix) node pair it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub label: Vec<u8>,
    pub weight: u64,
    pub from: Vec<u8>,
    pub to: Vec<u8>,
}

/// A subgraph built from the reads referenced by one seed k-mer's offset
/// bucket.
#[derive(Debug, Default)]
pub struct Subgraph {
    /// Outgoing edges indexed by source node, in insertion order.
    adjacency: HashMap<Vec<u8>, Vec<Edge>>,
}

impl Subgraph {
    /// Builds a subgraph from the barcode reads at `offsets`, re-reading
    /// each record by random access and extracting its cyclic k-mers. Edge
    /// weight is local k-mer multiplicity across exactly these reads.
    #[must_use]
    pub fn build(
        fastq: &MmappedFastq,
        offsets: &[u64],
        kmer_size: usize,
        barcode_start: usize,
        barcode_end: usize,
        indel_tolerant: bool,
    ) -> Self {
        let mut counts: HashMap<Vec<u8>, u64> = HashMap::new();
        for &offset in offsets {
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
                *counts.entry(cyclic.kmer.to_vec()).or_insert(0) += 1;
            }
        }

        let mut adjacency: HashMap<Vec<u8>, Vec<Edge>> = HashMap::new();
        for (kmer, weight) in counts {
            let from = prefix(&kmer).to_vec();
            let to = suffix(&kmer).to_vec();
            adjacency.entry(from.clone()).or_default().push(Edge {
                label: kmer,
                weight,
                from,
                to,
            });
        }

        Self { adjacency }
    }

    /// Outgoing edges from `node`, in no particular order; callers that need
    /// determinism (the cycle enumerator) sort these themselves.
    #[must_use]
    pub fn edges_from(&self, node: &[u8]) -> &[Edge] {
        self.adjacency.get(node).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}
