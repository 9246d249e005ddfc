//! Tab-separated report writers for the candidate-path and fit tables the
//! pipeline leaves behind under the output directory: `all_paths.txt`,
//! `merged_paths.txt`, and `fits.txt`.

use std::io::Write;

use crate::cycles::Candidate;
use crate::error::PipelineError;
use crate::threshold::RankFit;

/// Writes one candidate per line: `sequence\tweight\tdepth_rank\tlabels`,
/// where `labels` is the comma-joined list of the cycle's edge k-mers.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the file cannot be created or written.
pub fn write_candidates(path: &std::path::Path, candidates: &[Candidate]) -> Result<(), PipelineError> {
    let mut file = std::fs::File::create(path).map_err(|e| PipelineError::io(path, e))?;
    for candidate in candidates {
        let sequence = String::from_utf8_lossy(&candidate.sequence);
        let labels = candidate
            .edge_labels
            .iter()
            .map(|label| String::from_utf8_lossy(label).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(
            file,
            "{sequence}\t{}\t{}\t{labels}",
            candidate.weight, candidate.depth_rank
        )
        .map_err(|e| PipelineError::io(path, e))?;
    }
    Ok(())
}

/// Writes one line per depth-rank fit: `depth\tamplitude\tmean\tstdev\tthreshold`.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the file cannot be created or written.
pub fn write_fits(path: &std::path::Path, fits: &[RankFit]) -> Result<(), PipelineError> {
    let mut file = std::fs::File::create(path).map_err(|e| PipelineError::io(path, e))?;
    for fit in fits {
        writeln!(
            file,
            "{}\t{}\t{}\t{}\t{}",
            fit.depth_rank, fit.amplitude, fit.mean, fit.stdev, fit.cutoff_weight
        )
        .map_err(|e| PipelineError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(sequence: &[u8], weight: u64, depth_rank: usize, labels: &[&[u8]]) -> Candidate {
        Candidate {
            sequence: sequence.to_vec(),
            weight,
            depth_rank,
            edge_labels: labels.iter().map(|l| l.to_vec()).collect(),
        }
    }

    #[test]
    fn write_candidates_produces_tab_separated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_paths.txt");
        let candidates = vec![candidate(b"ACGT", 42, 1, &[b"$ACG", b"ACGT"])];
        write_candidates(&path, &candidates).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "ACGT\t42\t1\t$ACG,ACGT\n");
    }

    #[test]
    fn write_fits_produces_tab_separated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fits.txt");
        let fits = vec![RankFit {
            depth_rank: 1,
            amplitude: 100.0,
            mean: 25.0,
            stdev: 10.0,
            cutoff_bin: 55,
            cutoff_weight: 1000.0,
        }];
        write_fits(&path, &fits).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "1\t100\t25\t10\t1000\n");
    }

    #[test]
    fn empty_candidate_list_still_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_paths.txt");
        write_candidates(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
