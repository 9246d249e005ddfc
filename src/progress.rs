//! Stage logging: structured progress output duplicated to `run_log.txt`.
//!
//! Set `RUST_LOG=sircel=debug` for verbose console output; the file layer
//! always runs at `info` regardless of the environment filter, so
//! `run_log.txt` carries a stable record of every run.

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// A pipeline stage, used to tag log lines with which part of the run they
/// belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Index,
    Discovery,
    Merge,
    Threshold,
    Assign,
    Split,
}

impl Stage {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Discovery => "discovery",
            Self::Merge => "merge",
            Self::Threshold => "threshold",
            Self::Assign => "assign",
            Self::Split => "split",
        }
    }
}

/// Emits one stage-progress log line, visible on the console (subject to
/// `RUST_LOG` and `--quiet`) and always written to `run_log.txt`.
pub fn log_stage(stage: Stage, message: &str) {
    info!(stage = stage.name(), "{message}");
}

/// Installs the global tracing subscriber: a console layer honoring
/// `RUST_LOG` (suppressed entirely under `--quiet`), and a file layer that
/// always writes `run_log.txt` at `info` level.
///
/// The returned `WorkerGuard` must be kept alive for the duration of the
/// run — dropping it flushes and stops the non-blocking file writer.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn init(run_log_path: &Path, quiet: bool) -> std::io::Result<WorkerGuard> {
    let file = std::fs::File::create(run_log_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false);

    let console_layer = (!quiet).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_lowercase_and_distinct() {
        let names = [
            Stage::Index,
            Stage::Discovery,
            Stage::Merge,
            Stage::Threshold,
            Stage::Assign,
            Stage::Split,
        ]
        .map(Stage::name);
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        for name in names {
            assert_eq!(name, name.to_lowercase());
        }
    }
}
