//! Pipeline configuration.
//!
//! `RunConfig` is the single immutable value threaded through every stage of
//! the pipeline. There is no global mutable state (see the design notes in
//! `SPEC_FULL.md` §9): every component takes a `&RunConfig` rather than
//! reading ambient argument globals.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Default cap on the number of barcode reads used to build the k-mer index.
pub const DEFAULT_INDEX_CAP: usize = 5_000_000;

/// Default Hamming-distance cutoff used by the merger to fold near-duplicate
/// cycles into their heavier representative.
pub const DEFAULT_MERGE_DISTANCE: usize = 3;

/// Validated, immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the barcode-read FASTQ file (already decompressed).
    pub barcodes_path: PathBuf,
    /// Path to the RNA-read FASTQ file (already decompressed).
    pub reads_path: PathBuf,
    /// Directory under which all outputs are written.
    pub output_dir: PathBuf,
    /// Start of the barcode window within the barcode read (inclusive).
    pub barcode_start: usize,
    /// End of the barcode window within the barcode read (exclusive).
    pub barcode_end: usize,
    /// Start of the UMI window within the barcode read (inclusive).
    pub umi_start: usize,
    /// End of the UMI window within the barcode read (exclusive).
    pub umi_end: usize,
    /// K-mer size used to build the De Bruijn graph.
    pub kmer_size: usize,
    /// Maximum number of cycles enumerated per seed (the "depth").
    pub depth: usize,
    /// Number of seed k-mers explored (the "breadth").
    pub breadth: usize,
    /// Size of the worker pool used for parallel stages.
    pub threads: usize,
    /// Cap on the number of barcode reads used to build the k-mer index.
    pub index_cap: usize,
    /// Hamming-distance cutoff used by the merger.
    pub merge_distance: usize,
    /// Whether to emit indel-tolerant k-mer variants (truncated/extended).
    pub indel_tolerant: bool,
}

impl RunConfig {
    /// Builds a validated configuration, resolving gzip inputs is the
    /// caller's responsibility (see `gzip::ensure_uncompressed`) — this
    /// constructor only validates numeric parameters and paths.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidConfig` if any window is empty or
    /// inverted, or if `kmer_size` is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        barcodes_path: impl Into<PathBuf>,
        reads_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        barcode_start: usize,
        barcode_end: usize,
        umi_start: usize,
        umi_end: usize,
        kmer_size: usize,
        depth: usize,
        breadth: usize,
        threads: usize,
        index_cap: usize,
        merge_distance: usize,
        indel_tolerant: bool,
    ) -> Result<Self, PipelineError> {
        if barcode_end <= barcode_start {
            return Err(PipelineError::InvalidConfig(format!(
                "barcode_end ({barcode_end}) must be greater than barcode_start ({barcode_start})"
            )));
        }
        if umi_end < umi_start {
            return Err(PipelineError::InvalidConfig(format!(
                "umi_end ({umi_end}) must be at least umi_start ({umi_start})"
            )));
        }
        if kmer_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "kmer_size must be at least 1".to_string(),
            ));
        }
        if kmer_size > barcode_end - barcode_start + 1 {
            return Err(PipelineError::InvalidConfig(format!(
                "kmer_size ({kmer_size}) cannot exceed the circularized barcode length"
            )));
        }
        if depth == 0 {
            return Err(PipelineError::InvalidConfig(
                "depth must be at least 1".to_string(),
            ));
        }
        if breadth == 0 {
            return Err(PipelineError::InvalidConfig(
                "breadth must be at least 1".to_string(),
            ));
        }
        if threads == 0 {
            return Err(PipelineError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            barcodes_path: barcodes_path.into(),
            reads_path: reads_path.into(),
            output_dir: output_dir.into(),
            barcode_start,
            barcode_end,
            umi_start,
            umi_end,
            kmer_size,
            depth,
            breadth,
            threads,
            index_cap,
            merge_distance,
            indel_tolerant,
        })
    }

    /// Length of the barcode window, i.e. the cell barcode length.
    #[must_use]
    pub const fn barcode_len(&self) -> usize {
        self.barcode_end - self.barcode_start
    }

    /// Target cycle length the enumerator must find: the sentinel adds one
    /// node to the barcode's own length.
    #[must_use]
    pub const fn target_cycle_length(&self) -> usize {
        self.barcode_len() + 1
    }

    #[must_use]
    pub fn run_log_path(&self) -> PathBuf {
        self.output_dir.join("run_log.txt")
    }

    #[must_use]
    pub fn split_dir(&self) -> PathBuf {
        self.output_dir.join("reads_split")
    }

    #[must_use]
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[must_use]
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> (usize, usize, usize, usize, usize) {
        // (barcode_start, barcode_end, umi_start, umi_end, kmer_size)
        (0, 12, 12, 20, 7)
    }

    #[test]
    fn rejects_inverted_barcode_window() {
        let result = RunConfig::new(
            "b.fastq", "r.fastq", "out", 12, 0, 12, 20, 7, 3, 1000, 32, 5_000_000, 3, true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_kmer_size() {
        let (bs, be, us, ue, _) = base_args();
        let result = RunConfig::new(
            "b.fastq", "r.fastq", "out", bs, be, us, ue, 0, 3, 1000, 32, 5_000_000, 3, true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn accepts_valid_config() {
        let (bs, be, us, ue, k) = base_args();
        let config = RunConfig::new(
            "b.fastq", "r.fastq", "out", bs, be, us, ue, k, 3, 1000, 32, 5_000_000, 3, true,
        )
        .unwrap();
        assert_eq!(config.barcode_len(), 12);
        assert_eq!(config.target_cycle_length(), 13);
    }

    #[test]
    fn is_gzip_detects_extension() {
        assert!(is_gzip(Path::new("reads.fastq.gz")));
        assert!(!is_gzip(Path::new("reads.fastq")));
    }
}
