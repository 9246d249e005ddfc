//! Bounded, deterministic cyclic-path enumeration over a [`Subgraph`].
//!
//! At each node the walk prefers the highest-weight outgoing edge, breaking
//! ties by a fixed lexicographic order on edge labels. Cycles are produced
//! in the order a greedy-then-backtrack depth-first search discovers them,
//! which is exactly the "non-increasing first distinguishing edge-weight"
//! order the driver relies on for depth ranking.

use crate::graph::{Edge, Subgraph};
use crate::kmer::SENTINEL;

/// One candidate cycle returned by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The cycle sequence with overlaps collapsed and the leading sentinel
    /// stripped — a fixed-length barcode string.
    pub sequence: Vec<u8>,
    /// The minimum edge weight along the cycle (bottleneck / capacity).
    pub weight: u64,
    /// 1-based rank among cycles found for this seed, in discovery order.
    pub depth_rank: usize,
    /// The k-mer (edge) labels making up the cycle, in walk order.
    pub edge_labels: Vec<Vec<u8>>,
}

/// Enumerates at most `max_cycles` cycles of edge-count `target_len`
/// starting with the fixed edge `first_edge` (from `start` to
/// `first_edge.to`) and returning to `start`.
///
/// Returns an empty vector if no such cycle exists.
#[must_use]
pub fn enumerate_cycles(
    graph: &Subgraph,
    start: &[u8],
    first_edge: &Edge,
    target_len: usize,
    max_cycles: usize,
) -> Vec<Candidate> {
    let mut found = Vec::new();
    if target_len == 0 || max_cycles == 0 {
        return found;
    }

    let mut labels = vec![first_edge.label.clone()];
    let mut weights = vec![first_edge.weight];
    walk(
        graph,
        start,
        &first_edge.to,
        target_len.saturating_sub(1),
        &mut labels,
        &mut weights,
        max_cycles,
        &mut found,
    );

    for (rank, candidate) in found.iter_mut().enumerate() {
        candidate.depth_rank = rank + 1;
    }
    found
}

#[allow(clippy::too_many_arguments)]
fn walk(
    graph: &Subgraph,
    start: &[u8],
    current: &[u8],
    remaining: usize,
    labels: &mut Vec<Vec<u8>>,
    weights: &mut Vec<u64>,
    max_cycles: usize,
    found: &mut Vec<Candidate>,
) {
    if found.len() >= max_cycles {
        return;
    }

    if remaining == 0 {
        if current == start {
            found.push(Candidate {
                sequence: assemble_sequence(labels),
                weight: weights.iter().copied().min().unwrap_or(0),
                depth_rank: 0,
                edge_labels: labels.clone(),
            });
        }
        return;
    }

    let mut options: Vec<&Edge> = graph.edges_from(current).iter().collect();
    options.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.label.cmp(&b.label)));

    for edge in options {
        if found.len() >= max_cycles {
            break;
        }
        labels.push(edge.label.clone());
        weights.push(edge.weight);
        walk(graph, start, &edge.to, remaining - 1, labels, weights, max_cycles, found);
        labels.pop();
        weights.pop();
    }
}

/// Concatenates a walk's edge labels, collapsing their `k-1`-length
/// overlaps, then strips the leading sentinel.
///
/// A closed cycle of `labels.len()` edges over a circularized barcode
/// revisits its own head once the walk wraps around (the circularization
/// re-reads the sentinel-prefixed node to close the loop, per
/// [`crate::kmer::circularize`]), so the naive overlap-collapsed
/// concatenation is longer than the cycle's distinct node count by `k - 1`
/// trailing characters that just repeat the start. Truncating to
/// `labels.len()` characters keeps only the distinct walk — exactly the
/// `$`-prefixed barcode — before the sentinel is stripped.
fn assemble_sequence(labels: &[Vec<u8>]) -> Vec<u8> {
    let mut sequence = labels[0].clone();
    for label in &labels[1..] {
        if let Some(&last) = label.last() {
            sequence.push(last);
        }
    }
    sequence.truncate(labels.len());
    if sequence.first() == Some(&SENTINEL) {
        sequence.remove(0);
    }
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(label: &[u8], weight: u64) -> Edge {
        Edge {
            label: label.to_vec(),
            weight,
            from: label[..label.len() - 1].to_vec(),
            to: label[1..].to_vec(),
        }
    }

    /// Builds a subgraph from `copies` identical reads carrying `barcode`.
    fn repeated_barcode_graph(barcode: &str, copies: usize, k: usize) -> Subgraph {
        use crate::fastq::MmappedFastq;
        use std::io::Write;
        use tempfile::NamedTempFile;

        let qual = "I".repeat(barcode.len());
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..copies {
            writeln!(file, "@r{i}\n{barcode}\n+\n{qual}").unwrap();
        }
        file.flush().unwrap();
        let fastq = MmappedFastq::open(file.path()).unwrap();
        let offsets: Vec<u64> = fastq.iter_records().map(|(o, _)| o).collect();
        Subgraph::build(&fastq, &offsets, k, 0, barcode.len(), false)
    }

    /// The seed k-mer and its `k-1`-length start node for a bare barcode,
    /// found by running the same extractor the pipeline uses.
    fn seed_and_start(barcode: &[u8], k: usize) -> (Vec<u8>, Vec<u8>) {
        let qual = vec![b'I'; barcode.len()];
        let kmers = crate::kmer::extract_cyclic_kmers(barcode, &qual, k, 0, barcode.len(), false);
        let seed = kmers.iter().find(|km| km.is_seed()).expect("one seed kmer per read");
        let seed_kmer = seed.kmer.to_vec();
        let start_node = crate::kmer::prefix(&seed_kmer).to_vec();
        (seed_kmer, start_node)
    }

    #[test]
    fn no_cycle_yields_empty_sequence() {
        let edges = [edge(b"$ACG", 5)];
        let graph = Subgraph::default();
        let found = enumerate_cycles(&graph, b"$AC", &edges[0], 4, 3);
        assert!(found.is_empty());
    }

    #[test]
    fn enumerate_cycles_finds_the_barcode_for_a_real_subgraph() {
        let barcode = b"ACGTACGTACGT";
        let k = 7;
        let graph = repeated_barcode_graph("ACGTACGTACGT", 50, k);
        let (seed_kmer, start_node) = seed_and_start(barcode, k);

        let first_edge = graph
            .edges_from(&start_node)
            .iter()
            .find(|e| e.label == seed_kmer)
            .cloned()
            .expect("seed edge present in subgraph");

        let target_len = barcode.len() + 1;
        let found = enumerate_cycles(&graph, &start_node, &first_edge, target_len, 3);

        assert!(!found.is_empty(), "enumerator must close the cycle back to the seed node");
        assert!(found.iter().any(|c| c.sequence == barcode));
    }

    #[test]
    fn depth_ranks_are_assigned_consecutively_from_one() {
        let barcode = b"ACGTACG";
        let k = 3;
        let graph = repeated_barcode_graph("ACGTACG", 1, k);
        let (seed_kmer, start_node) = seed_and_start(barcode, k);

        let first_edge = graph
            .edges_from(&start_node)
            .iter()
            .find(|e| e.label == seed_kmer)
            .cloned()
            .expect("seed edge present in subgraph");

        let target_len = barcode.len() + 1;
        let found = enumerate_cycles(&graph, &start_node, &first_edge, target_len, 5);

        assert!(!found.is_empty());
        for (i, candidate) in found.iter().enumerate() {
            assert_eq!(candidate.depth_rank, i + 1);
        }
    }

    #[test]
    fn assemble_sequence_strips_leading_sentinel() {
        // The full cyclic walk over circularize(b"ACGT", k=3, 0, 4): each
        // edge's label overlaps the next by k-1=2 characters, and the walk
        // closes by revisiting the sentinel-prefixed start node.
        let labels = vec![
            b"$AC".to_vec(),
            b"ACG".to_vec(),
            b"CGT".to_vec(),
            b"GT$".to_vec(),
            b"T$A".to_vec(),
        ];
        let sequence = assemble_sequence(&labels);
        assert_eq!(sequence, b"ACGT");
    }
}
