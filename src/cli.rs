//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{RunConfig, DEFAULT_INDEX_CAP, DEFAULT_MERGE_DISTANCE};
use crate::error::PipelineError;

/// Discovers droplet cell barcodes directly from reads and demultiplexes
/// read pairs by discovered cell — no barcode whitelist required.
///
/// # Examples
///
/// ```bash
/// sircel --barcodes barcodes.fastq --reads reads.fastq --output-dir out/
///
/// # gzipped input, wider seed search
/// sircel --barcodes barcodes.fastq.gz --reads reads.fastq.gz \
///        --output-dir out/ --breadth 2000
/// ```
#[derive(Parser, Debug)]
#[command(name = "sircel")]
#[command(version, author, about, long_about = None)]
pub struct Args {
    /// Barcode-read FASTQ file (plain or gzipped).
    #[arg(long)]
    pub barcodes: PathBuf,

    /// RNA-read FASTQ file (plain or gzipped), pair-aligned with `barcodes`.
    #[arg(long)]
    pub reads: PathBuf,

    /// Directory to write outputs into; created if missing.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Start position of the barcode window within the barcode read.
    #[arg(long, default_value_t = 0)]
    pub barcode_start: usize,

    /// End position of the barcode window within the barcode read.
    #[arg(long, default_value_t = 12)]
    pub barcode_end: usize,

    /// Start position of the UMI window within the barcode read.
    #[arg(long, default_value_t = 12)]
    pub umi_start: usize,

    /// End position of the UMI window within the barcode read.
    #[arg(long, default_value_t = 20)]
    pub umi_end: usize,

    /// K-mer size used to build the De Bruijn graph.
    #[arg(long, default_value_t = 7)]
    pub kmer_size: usize,

    /// Maximum number of cycles enumerated per seed.
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Number of seed k-mers explored.
    #[arg(long, default_value_t = 1000)]
    pub breadth: usize,

    /// Size of the worker pool used for parallel stages.
    #[arg(long, default_value_t = 32)]
    pub threads: usize,

    /// Cap on the number of barcode reads used to build the k-mer index.
    #[arg(long, default_value_t = DEFAULT_INDEX_CAP)]
    pub index_cap: usize,

    /// Hamming-distance cutoff used by the merger.
    #[arg(long, default_value_t = DEFAULT_MERGE_DISTANCE)]
    pub merge_distance: usize,

    /// Disable emission of indel-tolerant k-mer variants.
    #[arg(long)]
    pub no_indel_tolerance: bool,

    /// Suppress informational output (stage progress is still logged to
    /// `run_log.txt`).
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Validates arguments into a `RunConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidConfig` if any parameter is out of
    /// range.
    pub fn into_config(self) -> Result<RunConfig, PipelineError> {
        RunConfig::new(
            self.barcodes,
            self.reads,
            self.output_dir,
            self.barcode_start,
            self.barcode_end,
            self.umi_start,
            self.umi_end,
            self.kmer_size,
            self.depth,
            self.breadth,
            self.threads,
            self.index_cap,
            self.merge_distance,
            !self.no_indel_tolerance,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let args = Args::parse_from([
            "sircel",
            "--barcodes",
            "b.fastq",
            "--reads",
            "r.fastq",
            "--output-dir",
            "out",
        ]);
        assert_eq!(args.barcode_start, 0);
        assert_eq!(args.barcode_end, 12);
        assert_eq!(args.umi_start, 12);
        assert_eq!(args.umi_end, 20);
        assert_eq!(args.kmer_size, 7);
        assert_eq!(args.depth, 3);
        assert_eq!(args.breadth, 1000);
        assert_eq!(args.threads, 32);
        assert_eq!(args.index_cap, DEFAULT_INDEX_CAP);
        assert_eq!(args.merge_distance, DEFAULT_MERGE_DISTANCE);
    }

    #[test]
    fn into_config_validates() {
        let args = Args::parse_from([
            "sircel",
            "--barcodes",
            "b.fastq",
            "--reads",
            "r.fastq",
            "--output-dir",
            "out",
            "--barcode-end",
            "0",
        ]);
        assert!(args.into_config().is_err());
    }
}
