//! Read assignment: maps every record pair to the accepted barcode path it
//! most likely came from, or `unassigned`.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxHasher;

use crate::config::RunConfig;
use crate::cycles::Candidate;
use crate::fastq::MmappedFastq;
use crate::kmer::extract_cyclic_kmers;

/// A path's identity for assignment purposes: its index among the accepted
/// candidates passed to [`build_kmer_to_paths`].
pub type PathId = usize;

/// Sentinel bucket id for pairs that could not be confidently assigned.
pub const UNASSIGNED: Option<PathId> = None;

type KmerPathMap = DashMap<Vec<u8>, Vec<PathId>, BuildHasherDefault<FxHasher>>;

/// Builds the k-mer → accepted-path-id multimap from each accepted path's
/// edge labels. A k-mer may map to more than one path.
#[must_use]
pub fn build_kmer_to_paths(accepted: &[Candidate]) -> KmerPathMap {
    let map: KmerPathMap = DashMap::default();
    for (path_id, candidate) in accepted.iter().enumerate() {
        for label in &candidate.edge_labels {
            map.entry(label.clone()).or_default().push(path_id);
        }
    }
    map
}

/// Per-path buckets of `(rna_offset, barcode_offset)` pairs, plus the
/// `unassigned` bucket.
#[derive(Debug, Default)]
pub struct AssignmentIndex {
    pub assigned: HashMap<PathId, Vec<(u64, u64)>>,
    pub unassigned: Vec<(u64, u64)>,
}

/// Assigns every `(barcode_offset, rna_offset)` pair in `pairs` to the
/// accepted path its barcode read's k-mers most strongly support.
///
/// Ties — including zero matches — are assigned to `unassigned`.
/// Assignment runs as a parallel map over chunks of `pairs`; per-chunk
/// results are merged serially on this function's return path.
#[must_use]
pub fn assign_all(
    fastq: &MmappedFastq,
    pairs: &[(u64, u64)],
    kmer_to_paths: &KmerPathMap,
    config: &RunConfig,
) -> AssignmentIndex {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().unwrap());

    let chunk_results: Vec<AssignmentIndex> = pool.install(|| {
        pairs
            .par_chunks(1024)
            .map(|chunk| {
                let mut local = AssignmentIndex::default();
                for &(barcode_offset, rna_offset) in chunk {
                    let assignment = assign_one(fastq, barcode_offset, kmer_to_paths, config);
                    match assignment {
                        Some(path_id) => local
                            .assigned
                            .entry(path_id)
                            .or_default()
                            .push((rna_offset, barcode_offset)),
                        None => local.unassigned.push((rna_offset, barcode_offset)),
                    }
                }
                local
            })
            .collect()
    });

    let mut merged = AssignmentIndex::default();
    for chunk in chunk_results {
        for (path_id, mut bucket) in chunk.assigned {
            merged.assigned.entry(path_id).or_default().append(&mut bucket);
        }
        merged.unassigned.extend(chunk.unassigned);
    }
    merged
}

fn assign_one(
    fastq: &MmappedFastq,
    barcode_offset: u64,
    kmer_to_paths: &KmerPathMap,
    config: &RunConfig,
) -> Option<PathId> {
    let record = fastq.record_at(barcode_offset).ok()?;
    let kmers = extract_cyclic_kmers(
        record.sequence,
        record.quality,
        config.kmer_size,
        config.barcode_start,
        config.barcode_end,
        config.indel_tolerant,
    );

    let mut tally: HashMap<PathId, usize> = HashMap::new();
    for cyclic in &kmers {
        if let Some(paths) = kmer_to_paths.get(cyclic.kmer.as_ref()) {
            for &path_id in paths.value() {
                *tally.entry(path_id).or_insert(0) += 1;
            }
        }
    }

    let mut best: Option<(PathId, usize)> = None;
    let mut tie = false;
    for (path_id, count) in tally {
        match best {
            None => best = Some((path_id, count)),
            Some((_, best_count)) if count > best_count => {
                best = Some((path_id, count));
                tie = false;
            }
            Some((_, best_count)) if count == best_count => tie = true,
            _ => {}
        }
    }

    if tie {
        UNASSIGNED
    } else {
        best.map(|(path_id, _)| path_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;

    fn config() -> RunConfig {
        RunConfig::new("b", "r", "out", 0, 12, 12, 20, 7, 3, 1000, 2, 5_000_000, 3, false).unwrap()
    }

    #[test]
    fn empty_tally_is_unassigned() {
        let map: KmerPathMap = DashMap::default();
        let file = tempfile_fastq();
        let fastq = MmappedFastq::open(file.path()).unwrap();
        let config = config();
        let assignment = assign_one(&fastq, 0, &map, &config);
        assert_eq!(assignment, None);
    }

    fn tempfile_fastq() -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "@r\nACGTACGTACGT\n+\nIIIIIIIIIIII").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn build_kmer_to_paths_registers_every_edge_label() {
        let candidate = Candidate {
            sequence: b"ACGT".to_vec(),
            weight: 10,
            depth_rank: 1,
            edge_labels: vec![b"$ACGTAC".to_vec(), b"ACGTACG".to_vec()],
        };
        let map = build_kmer_to_paths(&[candidate]);
        assert_eq!(map.get(b"$ACGTAC".as_slice()).unwrap().value(), &vec![0]);
        assert_eq!(map.get(b"ACGTACG".as_slice()).unwrap().value(), &vec![0]);
    }
}
