use std::path::Path;

use ffs_core::errors::{ErrorInfo, FfsError};
use ffs_store::{load_results, ResultsLog};
use serde::{Deserialize, Serialize};

/// Conditional crossing statistics for one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEstimate {
    /// Interface being reached from the one below.
    pub interface: usize,
    /// Seeds whose chain attempted this stage.
    pub cycles: usize,
    /// Crossings summed over those seeds.
    pub successes: u64,
    /// Shooting attempts made towards this interface.
    pub trials: u64,
    /// `successes / trials`, absent when the stage was never attempted.
    pub probability: Option<f64>,
}

/// Rate estimate assembled from the results log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEstimate {
    /// Per-interface crossing estimates, from interface 2 upwards.
    pub stages: Vec<StageEstimate>,
    /// Flux out of the basin per unit time.
    pub flux: f64,
    /// `flux * Π P(λ_{k+1} | λ_k)`.
    pub rate: f64,
}

fn row_width(log: &ResultsLog) -> Result<usize, FfsError> {
    let Some(first) = log.rows.first() else {
        return Ok(0);
    };
    if let Some((index, row)) = log
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != first.len())
    {
        return Err(FfsError::Data(
            ErrorInfo::new("results-shape", "results rows differ in length")
                .with_context("row", index.to_string())
                .with_context("expected", first.len().to_string())
                .with_context("actual", row.len().to_string()),
        ));
    }
    Ok(first.len())
}

/// Estimates `P(λ_k | λ_{k-1})` for every interface `k >= 2`.
///
/// Each row holds one seed's global successes. Stage 2 is attempted by every
/// seed; stage `k > 2` only by seeds with successes at `k - 1`. Every attempted
/// stage costs `shots_per_point` attempts on each of `replicas` walkers.
pub fn crossing_probabilities(
    log: &ResultsLog,
    shots_per_point: usize,
    replicas: usize,
) -> Result<Vec<StageEstimate>, FfsError> {
    let width = row_width(log)?;
    let per_cycle = (shots_per_point * replicas) as u64;
    let mut stages = Vec::new();
    for interface in 2..width {
        let attempted: Vec<&Vec<u64>> = log
            .rows
            .iter()
            .filter(|row| interface == 2 || row[interface - 1] > 0)
            .collect();
        let successes: u64 = attempted.iter().map(|row| row[interface]).sum();
        let trials = attempted.len() as u64 * per_cycle;
        stages.push(StageEstimate {
            interface,
            cycles: attempted.len(),
            successes,
            trials,
            probability: (trials > 0).then(|| successes as f64 / trials as f64),
        });
    }
    Ok(stages)
}

/// Combines the flux counter with the crossing probabilities.
pub fn rate_estimate(
    log: &ResultsLog,
    shots_per_point: usize,
    replicas: usize,
    elapsed_time: f64,
) -> Result<RateEstimate, FfsError> {
    if !(elapsed_time.is_finite() && elapsed_time > 0.0) {
        return Err(FfsError::Config(
            ErrorInfo::new("rate-time", "elapsed time must be positive and finite")
                .with_context("elapsed_time", elapsed_time.to_string()),
        ));
    }
    let flux_out = log.flux_out.ok_or_else(|| {
        FfsError::Data(
            ErrorInfo::new("results-flux", "results log carries no flux-out line")
                .with_hint("the run has not been finalized yet"),
        )
    })?;
    let stages = crossing_probabilities(log, shots_per_point, replicas)?;
    let flux = flux_out as f64 / elapsed_time;
    let rate = stages
        .iter()
        .map(|stage| stage.probability.unwrap_or(0.0))
        .fold(flux, |acc, p| acc * p);
    Ok(RateEstimate { stages, flux, rate })
}

/// Loads a results log from disk and estimates the rate.
pub fn rate_from_results(
    path: &Path,
    shots_per_point: usize,
    replicas: usize,
    elapsed_time: f64,
) -> Result<RateEstimate, FfsError> {
    let log = load_results(path)?;
    rate_estimate(&log, shots_per_point, replicas, elapsed_time)
}
