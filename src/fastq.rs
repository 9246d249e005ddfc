//! Memory-mapped, offset-addressed FASTQ access.
//!
//! The engine identifies reads by byte offset into a (decompressed) FASTQ
//! file and must be able to re-read an arbitrary record later (the subgraph
//! builder and splitter both do this). The file is modeled as an owned
//! memory-mapped region for the engine's lifetime, and an "offset" is a byte
//! index into that region, per `SPEC_FULL.md` §9.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::PipelineError;

/// A single FASTQ record borrowed from a memory-mapped file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastqRecord<'a> {
    pub header: &'a [u8],
    pub sequence: &'a [u8],
    pub separator: &'a [u8],
    pub quality: &'a [u8],
}

impl<'a> FastqRecord<'a> {
    /// A well-formed record has: line 1 starting with `@`, line 3 a single
    /// character, and lines 2 and 4 of equal length.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.header.first() == Some(&b'@')
            && self.separator.len() == 1
            && self.sequence.len() == self.quality.len()
    }

    /// The UMI substring within `[start, end)`. A short read simply yields a
    /// short (possibly empty) UMI — unlike barcode-window extraction, the
    /// UMI is never padded.
    #[must_use]
    pub fn umi(&self, start: usize, end: usize) -> &'a [u8] {
        let start = start.min(self.sequence.len());
        let end = end.min(self.sequence.len()).max(start);
        &self.sequence[start..end]
    }
}

/// Finds the next `\n`-terminated line starting at `pos`.
///
/// Returns the byte range of the line (excluding the newline) and the
/// position immediately after the newline (or end of data for a final,
/// unterminated line). Returns `None` once `pos` is at or past the end.
fn next_line(data: &[u8], pos: usize) -> Option<(std::ops::Range<usize>, usize)> {
    if pos >= data.len() {
        return None;
    }
    match data[pos..].iter().position(|&b| b == b'\n') {
        Some(rel) => Some((pos..pos + rel, pos + rel + 1)),
        None => Some((pos..data.len(), data.len())),
    }
}

/// Parses exactly four lines starting at `start` into a `FastqRecord`.
///
/// Returns `None` if four lines cannot be read (EOF) or the result fails
/// validation. Does not attempt recovery by skipping lines — callers that
/// need that (arbitrary, untrusted offsets) should use
/// [`scan_forward_record`].
#[must_use]
pub fn parse_record_at(data: &[u8], start: usize) -> Option<(FastqRecord<'_>, usize)> {
    let (l1, p1) = next_line(data, start)?;
    let (l2, p2) = next_line(data, p1)?;
    let (l3, p3) = next_line(data, p2)?;
    let (l4, p4) = next_line(data, p3)?;
    let record = FastqRecord {
        header: &data[l1],
        sequence: &data[l2],
        separator: &data[l3],
        quality: &data[l4],
    };
    record.is_well_formed().then_some((record, p4))
}

/// Scans forward from `start`, skipping one line at a time, until a
/// well-formed record is found or the data is exhausted.
///
/// This mirrors the original tool's random-offset recovery: an arbitrary
/// seek position may land inside a quality line (which can itself start
/// with `@`), so the scanner must be willing to discard partial lines.
#[must_use]
pub fn scan_forward_record(data: &[u8], mut start: usize) -> Option<(FastqRecord<'_>, usize)> {
    loop {
        if let Some(found) = parse_record_at(data, start) {
            return Some(found);
        }
        let (_, next) = next_line(data, start)?;
        if next == start {
            return None;
        }
        start = next;
    }
}

/// A memory-mapped FASTQ file, addressed by byte offset.
pub struct MmappedFastq {
    mmap: Mmap,
    path: PathBuf,
}

impl MmappedFastq {
    /// Opens and memory-maps a FASTQ file.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the file cannot be opened or mapped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| PipelineError::io(path.clone(), e))?;
        // SAFETY: the caller owns this mapping for the engine's lifetime and
        // is required not to modify the underlying file while it is mapped.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| PipelineError::io(path.clone(), e))?;
        Ok(Self { mmap, path })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Reads the well-formed record starting exactly at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MalformedInput` if the bytes at `offset` do
    /// not form a well-formed four-line record.
    pub fn record_at(&self, offset: u64) -> Result<FastqRecord<'_>, PipelineError> {
        parse_record_at(self.as_bytes(), offset as usize)
            .map(|(record, _)| record)
            .ok_or_else(|| {
                PipelineError::malformed(self.path.clone(), offset, "not a well-formed record")
            })
    }

    /// Iterates over every well-formed record in file order, yielding its
    /// starting offset alongside it.
    #[must_use]
    pub fn iter_records(&self) -> FastqRecordIter<'_> {
        FastqRecordIter {
            data: self.as_bytes(),
            pos: 0,
        }
    }
}

/// Sequential iterator over the records of a [`MmappedFastq`].
pub struct FastqRecordIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for FastqRecordIter<'a> {
    type Item = (u64, FastqRecord<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (record, next_pos) = parse_record_at(self.data, self.pos)?;
        let offset = self.pos as u64;
        self.pos = next_pos;
        Some((offset, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fastq(records: &[(&str, &str, &str, &str)]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for (h, s, sep, q) in records {
            writeln!(file, "{h}\n{s}\n{sep}\n{q}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn parses_single_record() {
        let file = write_fastq(&[("@r1", "ACGT", "+", "IIII")]);
        let mmap = MmappedFastq::open(file.path()).unwrap();
        let record = mmap.record_at(0).unwrap();
        assert_eq!(record.header, b"@r1");
        assert_eq!(record.sequence, b"ACGT");
        assert_eq!(record.quality, b"IIII");
    }

    #[test]
    fn rejects_malformed_header() {
        let file = write_fastq(&[("r1", "ACGT", "+", "IIII")]);
        let mmap = MmappedFastq::open(file.path()).unwrap();
        assert!(mmap.record_at(0).is_err());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let file = write_fastq(&[("@r1", "ACGT", "+", "III")]);
        let mmap = MmappedFastq::open(file.path()).unwrap();
        assert!(mmap.record_at(0).is_err());
    }

    #[test]
    fn iterates_multiple_records_in_order() {
        let file = write_fastq(&[
            ("@r1", "ACGT", "+", "IIII"),
            ("@r2", "TTTT", "+", "JJJJ"),
            ("@r3", "GGGG", "-", "KKKK"),
        ]);
        let mmap = MmappedFastq::open(file.path()).unwrap();
        let records: Vec<_> = mmap.iter_records().collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].1.header, b"@r1");
        assert_eq!(records[2].1.separator, b"-");
        // offsets should be strictly increasing and match record_at lookups
        for (offset, record) in &records {
            assert_eq!(mmap.record_at(*offset).unwrap().sequence, record.sequence);
        }
    }

    #[test]
    fn scan_forward_recovers_from_bad_offset() {
        let file = write_fastq(&[("@r1", "ACGT", "+", "IIII"), ("@r2", "TTTT", "+", "JJJJ")]);
        let mmap = MmappedFastq::open(file.path()).unwrap();
        // offset 1 lands mid-header; scan_forward should find @r2 next.
        let (record, _) = scan_forward_record(mmap.as_bytes(), 1).unwrap();
        assert_eq!(record.header, b"@r2");
    }

    #[test]
    fn umi_extracts_window() {
        let file = write_fastq(&[("@r1", "ACGTACGTACGTTTTTGGGG", "+", "IIIIIIIIIIIIIIIIIIII")]);
        let mmap = MmappedFastq::open(file.path()).unwrap();
        let record = mmap.record_at(0).unwrap();
        assert_eq!(record.umi(12, 20), b"TTTTGGGG");
    }
}
