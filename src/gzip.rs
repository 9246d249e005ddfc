//! Gzip decompression collaborator.
//!
//! The rest of the pipeline memory-maps its inputs (see [`crate::fastq`]),
//! which requires a plain, uncompressed file on disk. Gzipped inputs are
//! decompressed once, up front, into a temporary file; everything downstream
//! only ever sees an ordinary FASTQ path.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::config::is_gzip;
use crate::error::PipelineError;

/// Resolves `path` to a plain-text FASTQ path, decompressing it into a
/// temporary file first if it is gzipped.
///
/// Returns `Cow::Borrowed` for inputs that are already plain-text, avoiding
/// any copy. The temporary file, when created, lives for the returned
/// guard's lifetime — callers that need the path to outlive this call should
/// keep the returned [`DecompressedInput`] alive rather than cloning the
/// path out of it.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the input cannot be opened, the gzip
/// stream is corrupt, or the temporary file cannot be written.
pub fn ensure_uncompressed(path: &Path) -> Result<DecompressedInput, PipelineError> {
    if !is_gzip(path) {
        return Ok(DecompressedInput::Plain(path.to_path_buf()));
    }

    let source = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(source));

    let temp = NamedTempFile::new().map_err(|e| PipelineError::io(path, e))?;
    {
        let mut writer = BufWriter::new(temp.reopen().map_err(|e| PipelineError::io(path, e))?);
        io::copy(&mut decoder, &mut writer).map_err(|e| PipelineError::io(path, e))?;
    }

    Ok(DecompressedInput::Decompressed(temp))
}

/// The resolved, plain-text location of an input that may have started out
/// gzipped. Dropping this removes any temporary file it owns.
pub enum DecompressedInput {
    Plain(std::path::PathBuf),
    Decompressed(NamedTempFile),
}

impl DecompressedInput {
    #[must_use]
    pub fn path(&self) -> Cow<'_, Path> {
        match self {
            Self::Plain(path) => Cow::Borrowed(path.as_path()),
            Self::Decompressed(temp) => Cow::Borrowed(temp.path()),
        }
    }
}
