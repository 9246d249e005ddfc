//! Weight thresholding: separates real barcodes from spurious cycles.
//!
//! Surviving candidates are grouped by depth-rank. For each rank, a
//! log-spaced weight histogram is built and a single Gaussian is fit to it;
//! the fitted curve's `mean + 3·|stdev|` gives that rank's cut-off. Rank 2's
//! cut-off is used as the active threshold — rank 1 tends to include the
//! heaviest spurious cycles, while rank 2's noise distribution separates
//! more cleanly.

use std::collections::BTreeMap;

use crate::cycles::Candidate;
use crate::error::PipelineError;

/// Number of log-spaced bins spanning the histogram.
const BIN_COUNT: usize = 50;
/// Histogram spans weights from 10^0 to 10^8.
const LOG_MIN: f64 = 0.0;
const LOG_MAX: f64 = 8.0;

/// Depth-rank whose cut-off becomes the pipeline's active threshold.
const ACTIVE_RANK: usize = 2;

/// Initial Gauss-Newton parameter guess `(amplitude, mean, stdev)`, matching
/// the values that gave stable convergence over the bin-index domain.
const INITIAL_GUESS: (f64, f64, f64) = (100.0, 25.0, 10.0);

/// Fitted Gaussian plus the cut-off derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankFit {
    pub depth_rank: usize,
    pub amplitude: f64,
    pub mean: f64,
    pub stdev: f64,
    pub cutoff_bin: usize,
    pub cutoff_weight: f64,
}

/// Edges of the 50 log-spaced bins from 10^0 to 10^8 (51 edges).
fn bin_edges() -> Vec<f64> {
    (0..=BIN_COUNT)
        .map(|i| {
            let exponent = LOG_MIN + (LOG_MAX - LOG_MIN) * (i as f64) / (BIN_COUNT as f64);
            10f64.powf(exponent)
        })
        .collect()
}

/// Counts how many weights fall in each of the 50 bins.
fn histogram(weights: &[u64]) -> Vec<f64> {
    let edges = bin_edges();
    let mut counts = vec![0.0; BIN_COUNT];
    for &weight in weights {
        let weight = weight as f64;
        let bin = edges
            .windows(2)
            .position(|w| weight >= w[0] && weight < w[1])
            .unwrap_or_else(|| if weight >= *edges.last().unwrap() { BIN_COUNT - 1 } else { 0 });
        counts[bin] += 1.0;
    }
    counts
}

fn gaussian(x: f64, amplitude: f64, mean: f64, stdev: f64) -> f64 {
    if stdev.abs() < f64::EPSILON {
        return 0.0;
    }
    amplitude * (-0.5 * ((x - mean) / stdev).powi(2)).exp()
}

/// Fits `(amplitude, mean, stdev)` to `(bin_index, count)` pairs via
/// Gauss-Newton least squares, analogous to `scipy.optimize.curve_fit`.
///
/// Returns `None` if the fit fails to converge within a bounded number of
/// iterations or a step produces a non-finite parameter.
fn fit_gaussian(counts: &[f64]) -> Option<(f64, f64, f64)> {
    let (mut amplitude, mut mean, mut stdev) = INITIAL_GUESS;
    let xs: Vec<f64> = (0..counts.len()).map(|i| i as f64).collect();

    for _ in 0..200 {
        let mut jt_j = [[0.0_f64; 3]; 3];
        let mut jt_r = [0.0_f64; 3];

        for (&x, &y) in xs.iter().zip(counts) {
            let predicted = gaussian(x, amplitude, mean, stdev);
            let residual = y - predicted;

            let safe_stdev = if stdev.abs() < f64::EPSILON { f64::EPSILON } else { stdev };
            let exponent = (-0.5 * ((x - mean) / safe_stdev).powi(2)).exp();
            let d_amp = exponent;
            let d_mean = amplitude * exponent * (x - mean) / safe_stdev.powi(2);
            let d_stdev = amplitude * exponent * (x - mean).powi(2) / safe_stdev.powi(3);
            let grad = [d_amp, d_mean, d_stdev];

            for row in 0..3 {
                jt_r[row] += grad[row] * residual;
                for col in 0..3 {
                    jt_j[row][col] += grad[row] * grad[col];
                }
            }
        }

        // Levenberg-Marquardt damping keeps the normal equations solvable
        // even when the Jacobian is near-singular (flat or empty bins).
        for i in 0..3 {
            jt_j[i][i] += 1e-6;
        }

        let step = solve_3x3(jt_j, jt_r)?;
        if step.iter().any(|v| !v.is_finite()) {
            return None;
        }

        amplitude += step[0];
        mean += step[1];
        stdev += step[2];

        if step.iter().all(|v| v.abs() < 1e-8) {
            break;
        }
    }

    (amplitude.is_finite() && mean.is_finite() && stdev.is_finite()).then_some((amplitude, mean, stdev))
}

/// Solves a 3x3 linear system via Cramer's rule. Returns `None` if the
/// system is singular.
fn solve_3x3(m: [[f64; 3]; 3], b: [f64; 3]) -> Option<[f64; 3]> {
    let det = determinant(m);
    if det.abs() < 1e-12 {
        return None;
    }
    let mut result = [0.0; 3];
    for col in 0..3 {
        let mut replaced = m;
        for row in 0..3 {
            replaced[row][col] = b[row];
        }
        result[col] = determinant(replaced) / det;
    }
    Some(result)
}

fn determinant(m: [[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Fits a Gaussian for each populated depth-rank and derives the active
/// threshold (rank 2's cut-off).
///
/// # Errors
///
/// Returns `PipelineError::InsufficientData` if fewer than two ranks are
/// populated, or `PipelineError::FitFailure` if a rank's fit does not
/// converge.
pub fn compute_threshold(candidates: &[Candidate]) -> Result<(Vec<RankFit>, f64), PipelineError> {
    let mut by_rank: BTreeMap<usize, Vec<u64>> = BTreeMap::new();
    for candidate in candidates {
        by_rank.entry(candidate.depth_rank).or_default().push(candidate.weight);
    }

    if by_rank.len() < 2 {
        return Err(PipelineError::insufficient_data(
            "threshold",
            "fewer than two depth-ranks are populated",
        ));
    }

    let edges = bin_edges();
    let mut fits = Vec::new();
    for (&depth_rank, weights) in &by_rank {
        let counts = histogram(weights);
        let (amplitude, mean, stdev) = fit_gaussian(&counts).ok_or_else(|| PipelineError::FitFailure {
            depth_rank,
            details: "gauss-newton iteration did not converge".to_string(),
        })?;

        let raw_bin = (mean + 3.0 * stdev.abs()).floor();
        let cutoff_bin = (raw_bin.max(0.0) as usize).min(BIN_COUNT - 1);
        let cutoff_weight = edges[cutoff_bin];

        fits.push(RankFit {
            depth_rank,
            amplitude,
            mean,
            stdev,
            cutoff_bin,
            cutoff_weight,
        });
    }

    let active = fits
        .iter()
        .find(|fit| fit.depth_rank == ACTIVE_RANK)
        .map(|fit| fit.cutoff_weight)
        .ok_or_else(|| {
            PipelineError::insufficient_data("threshold", "depth-rank 2 is not populated")
        })?;

    Ok((fits, active))
}

/// Accepted candidates are those with weight strictly greater than the
/// active threshold.
#[must_use]
pub fn accept(candidates: Vec<Candidate>, active_threshold: f64) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| (c.weight as f64) > active_threshold)
        .collect()
}
