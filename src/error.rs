//! Error types for the barcode discovery and demultiplexing engine.
//!
//! This module provides exhaustive, strongly-typed errors for every stage of
//! the pipeline, so a fatal failure always names which stage produced it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A FASTQ record failed validation, or an offset did not resolve to one.
    #[error("malformed FASTQ record in '{path}' at offset {offset}: {details}")]
    MalformedInput {
        path: PathBuf,
        offset: u64,
        details: String,
    },

    /// A stage needed more data than it was given and cannot proceed safely.
    #[error("insufficient data at stage '{stage}': {details}")]
    InsufficientData {
        stage: &'static str,
        details: String,
    },

    /// The Gaussian fit used for thresholding did not converge.
    #[error("gaussian fit failed to converge at depth-rank {depth_rank}: {details}")]
    FitFailure {
        depth_rank: usize,
        details: String,
    },

    /// A worker thread produced a failure that must abort the whole pipeline.
    #[error("worker failure: {0}")]
    WorkerFailure(String),

    /// The run configuration was invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to memory-map or otherwise read an input file.
    #[error("failed to read '{path}': {source}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl PipelineError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, offset: u64, details: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            offset,
            details: details.into(),
        }
    }

    #[must_use]
    pub fn insufficient_data(stage: &'static str, details: impl Into<String>) -> Self {
        Self::InsufficientData {
            stage,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_display() {
        let err = PipelineError::malformed("barcodes.fastq", 128, "line 1 does not start with @");
        assert!(err.to_string().contains("offset 128"));
        assert!(err.to_string().contains("barcodes.fastq"));
    }

    #[test]
    fn insufficient_data_names_stage() {
        let err =
            PipelineError::insufficient_data("thresholder", "fewer than two ranks populated");
        assert!(err.to_string().contains("thresholder"));
    }

    #[test]
    fn fit_failure_names_depth_rank() {
        let err = PipelineError::FitFailure {
            depth_rank: 2,
            details: "did not converge".to_string(),
        };
        assert!(err.to_string().contains("depth-rank 2"));
    }
}
