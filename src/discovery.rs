//! Path discovery driver: turns the k-mer index into a pool of candidate
//! cyclic barcode paths.
//!
//! Seeds are the top-`breadth` most frequent k-mers beginning with the
//! sentinel. Each seed is explored independently — subgraph build, then
//! cycle enumeration — in its own unit of work on the worker pool; the
//! driver only merges the resulting candidate lists.

use rayon::prelude::*;

use crate::config::RunConfig;
use crate::cycles::{enumerate_cycles, Candidate};
use crate::error::PipelineError;
use crate::fastq::MmappedFastq;
use crate::graph::Subgraph;
use crate::index::KmerIndex;
use crate::kmer::SENTINEL;

/// Ranks indexed k-mers by global frequency and returns the top `breadth`
/// seeds that begin with the sentinel.
fn select_seeds(index: &KmerIndex, breadth: usize) -> Vec<Vec<u8>> {
    let mut seeds: Vec<(Vec<u8>, usize)> = index
        .keys()
        .into_iter()
        .filter(|kmer| kmer.first() == Some(&SENTINEL))
        .map(|kmer| {
            let count = index.count(&kmer);
            (kmer, count)
        })
        .collect();

    seeds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    seeds.truncate(breadth);
    seeds.into_iter().map(|(kmer, _)| kmer).collect()
}

/// Runs the discovery driver: selects seeds, and for each one builds its
/// subgraph and enumerates up to `config.depth` cycles, returning the
/// flattened candidate pool.
///
/// # Errors
///
/// Returns `PipelineError::InsufficientData` if no seed k-mer begins with
/// the sentinel.
pub fn discover(
    index: &KmerIndex,
    fastq: &MmappedFastq,
    config: &RunConfig,
) -> Result<Vec<Candidate>, PipelineError> {
    let seeds = select_seeds(index, config.breadth);
    if seeds.is_empty() {
        return Err(PipelineError::insufficient_data(
            "discovery",
            "no seed k-mer begins with the sentinel",
        ));
    }

    let target_len = config.target_cycle_length();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| PipelineError::WorkerFailure(e.to_string()))?;

    let candidates: Vec<Candidate> = pool.install(|| {
        seeds
            .par_iter()
            .flat_map_iter(|seed| {
                let offsets = index.lookup(seed);
                let graph = Subgraph::build(
                    fastq,
                    &offsets,
                    config.kmer_size,
                    config.barcode_start,
                    config.barcode_end,
                    config.indel_tolerant,
                );

                let start_node = crate::kmer::prefix(seed).to_vec();
                graph
                    .edges_from(&start_node)
                    .iter()
                    .find(|edge| edge.label == *seed)
                    .cloned()
                    .map(|first_edge| {
                        enumerate_cycles(&graph, &start_node, &first_edge, target_len, config.depth)
                    })
                    .unwrap_or_default()
            })
            .collect()
    });

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_seeds_only_returns_sentinel_prefixed_kmers() {
        let index = KmerIndex::new();
        // lookup/keys exercised indirectly via index_batch in index.rs tests;
        // here we only need to verify the sentinel filter on an empty index.
        let seeds = select_seeds(&index, 10);
        assert!(seeds.is_empty());
    }
}
