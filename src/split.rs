//! Splitter: writes per-cell demultiplexed FASTQ output plus the UMI
//! extraction file and run manifest.
//!
//! Output layout under `<output_dir>/reads_split/`:
//! - `cell_<name>_reads.fastq.gz` — RNA reads assigned to the cell
//! - `cell_<name>_barcodes.fastq.gz` — barcode reads assigned to the cell
//! - `cell_<name>.umi.txt` — one UMI per line, plaintext
//! - `batch.txt` — `cell_name\tumi_path\treads_path` per cell

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::assign::{AssignmentIndex, PathId};
use crate::config::RunConfig;
use crate::cycles::Candidate;
use crate::error::PipelineError;
use crate::fastq::MmappedFastq;

/// One manifest line: the cell name and the paths to its UMI and reads
/// files.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub cell_name: String,
    pub umi_path: PathBuf,
    pub reads_path: PathBuf,
}

fn cell_name_for(candidate: &Candidate) -> String {
    format!("cell_{}", String::from_utf8_lossy(&candidate.sequence))
}

/// Rewrites a FASTQ header the way the original splitter did: append the
/// cell name (colon-joined, since the header may already contain spaces),
/// then replace every remaining space with an underscore.
fn rewrite_header(header: &[u8], cell_name: &str) -> Vec<u8> {
    let mut rewritten = header.to_vec();
    rewritten.push(b' ');
    rewritten.extend_from_slice(cell_name.replace('_', ":").as_bytes());
    rewritten.iter_mut().for_each(|b| {
        if *b == b' ' {
            *b = b'_';
        }
    });
    rewritten
}

fn write_record(
    writer: &mut impl Write,
    header: &[u8],
    sequence: &[u8],
    separator: &[u8],
    quality: &[u8],
) -> io::Result<()> {
    writer.write_all(header)?;
    writer.write_all(b"\n")?;
    writer.write_all(sequence)?;
    writer.write_all(b"\n")?;
    writer.write_all(separator)?;
    writer.write_all(b"\n")?;
    writer.write_all(quality)?;
    writer.write_all(b"\n")
}

/// Writes every accepted cell's split output and the `batch.txt` manifest.
///
/// Iteration order over cells follows the order their path id first appears
/// in `assignment.assigned` — deterministic, but not a correctness property
/// (see `SPEC_FULL.md` §4.9).
///
/// # Errors
///
/// Returns `PipelineError::Io` if any output file cannot be created or
/// written.
pub fn write_split_fastqs(
    reads: &MmappedFastq,
    barcodes: &MmappedFastq,
    accepted: &[Candidate],
    assignment: &AssignmentIndex,
    config: &RunConfig,
) -> Result<Vec<BatchEntry>, PipelineError> {
    let split_dir = config.split_dir();
    fs::create_dir_all(&split_dir).map_err(|e| PipelineError::io(&split_dir, e))?;

    let batch_path = split_dir.join("batch.txt");
    let mut batch_file =
        File::create(&batch_path).map_err(|e| PipelineError::io(&batch_path, e))?;

    let mut manifest = Vec::new();
    let mut path_ids: Vec<PathId> = assignment.assigned.keys().copied().collect();
    path_ids.sort_unstable();

    for path_id in path_ids {
        let Some(candidate) = accepted.get(path_id) else {
            continue;
        };
        let Some(offsets) = assignment.assigned.get(&path_id) else {
            continue;
        };

        let cell_name = cell_name_for(candidate);
        let reads_path = split_dir.join(format!("{cell_name}_reads.fastq.gz"));
        let barcodes_path = split_dir.join(format!("{cell_name}_barcodes.fastq.gz"));
        let umi_path = split_dir.join(format!("{cell_name}.umi.txt"));

        let mut reads_writer = GzEncoder::new(
            File::create(&reads_path).map_err(|e| PipelineError::io(&reads_path, e))?,
            Compression::default(),
        );
        let mut barcodes_writer = GzEncoder::new(
            File::create(&barcodes_path).map_err(|e| PipelineError::io(&barcodes_path, e))?,
            Compression::default(),
        );
        let mut umi_writer =
            File::create(&umi_path).map_err(|e| PipelineError::io(&umi_path, e))?;

        for &(rna_offset, barcode_offset) in offsets {
            let Ok(read_record) = reads.record_at(rna_offset) else {
                continue;
            };
            let Ok(barcode_record) = barcodes.record_at(barcode_offset) else {
                continue;
            };

            let read_header = rewrite_header(read_record.header, &cell_name);
            let barcode_header = rewrite_header(barcode_record.header, &cell_name);

            write_record(
                &mut reads_writer,
                &read_header,
                read_record.sequence,
                read_record.separator,
                read_record.quality,
            )
            .map_err(|e| PipelineError::io(&reads_path, e))?;
            write_record(
                &mut barcodes_writer,
                &barcode_header,
                barcode_record.sequence,
                barcode_record.separator,
                barcode_record.quality,
            )
            .map_err(|e| PipelineError::io(&barcodes_path, e))?;

            let umi = barcode_record.umi(config.umi_start, config.umi_end);
            umi_writer
                .write_all(umi)
                .and_then(|()| umi_writer.write_all(b"\n"))
                .map_err(|e| PipelineError::io(&umi_path, e))?;
        }

        reads_writer.finish().map_err(|e| PipelineError::io(&reads_path, e))?;
        barcodes_writer.finish().map_err(|e| PipelineError::io(&barcodes_path, e))?;

        writeln!(
            batch_file,
            "{}\t{}\t{}",
            cell_name,
            umi_path.display(),
            reads_path.display()
        )
        .map_err(|e| PipelineError::io(&batch_path, e))?;

        manifest.push(BatchEntry {
            cell_name,
            umi_path,
            reads_path,
        });
    }

    Ok(manifest)
}
