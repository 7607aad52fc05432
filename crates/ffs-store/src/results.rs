use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ffs_core::errors::{ErrorInfo, FfsError};
use serde::{Deserialize, Serialize};

/// Parsed content of a results log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsLog {
    /// Global success counts per interface, one row per completed cycle.
    pub rows: Vec<Vec<u64>>,
    /// Last reported flux-in counter.
    pub flux_in: Option<u64>,
    /// Last reported flux-out counter.
    pub flux_out: Option<u64>,
}

fn malformed(line: &str) -> FfsError {
    FfsError::Data(
        ErrorInfo::new("results-line", "results line is neither a count row nor a flux line")
            .with_context("line", line.to_string()),
    )
}

fn parse_flux(value: &str, line: &str) -> Result<u64, FfsError> {
    value.trim().parse().map_err(|_| malformed(line))
}

/// Parses results text. Flux lines may repeat across resumed sessions; the last
/// one wins.
pub fn parse_results(text: &str) -> Result<ResultsLog, FfsError> {
    let mut log = ResultsLog::default();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(value) = trimmed.strip_prefix("flux in:") {
            log.flux_in = Some(parse_flux(value, line)?);
        } else if let Some(value) = trimmed.strip_prefix("flux out:") {
            log.flux_out = Some(parse_flux(value, line)?);
        } else {
            let row = trimmed
                .split_whitespace()
                .map(|token| token.parse::<u64>().map_err(|_| malformed(line)))
                .collect::<Result<Vec<_>, _>>()?;
            log.rows.push(row);
        }
    }
    Ok(log)
}

/// Loads a results log; a missing file reads as empty.
pub fn load_results(path: &Path) -> Result<ResultsLog, FfsError> {
    match fs::read_to_string(path) {
        Ok(text) => parse_results(&text),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(ResultsLog::default()),
        Err(err) => Err(FfsError::io("results-read", path, err)),
    }
}
