use std::fs;
use std::path::Path;

use ffs_core::errors::{ErrorInfo, FfsError};
use serde::{Deserialize, Serialize};

use crate::phase::RunPhase;

/// Structured summary written by the bookkeeping rank when a run shuts down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Phase the walker was in at shutdown.
    pub phase: RunPhase,
    /// Number of classified shooting steps.
    pub iteration: u64,
    /// Library position of the next seed.
    pub cursor: usize,
    /// Number of library seeds.
    pub library_size: usize,
    /// Hex SHA-256 of the library log content.
    pub library_digest: String,
    /// Flux-in counter written to the results log.
    pub flux_in: u64,
    /// Flux-out counter written to the results log.
    pub flux_out: u64,
    /// Master seed of the shooting-point draw.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Whether the run ended through the fatal path.
    pub aborted: bool,
    /// RFC 3339 time of shutdown.
    pub finished_at: String,
}

impl RunSummary {
    /// Writes the summary to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), FfsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| FfsError::io("summary-mkdir", parent, err))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            FfsError::Serde(
                ErrorInfo::new("summary-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| FfsError::io("summary-write", path, err))
    }

    /// Loads a summary from disk.
    pub fn load(path: &Path) -> Result<Self, FfsError> {
        let contents =
            fs::read_to_string(path).map_err(|err| FfsError::io("summary-read", path, err))?;
        serde_json::from_str(&contents).map_err(|err| {
            FfsError::Serde(
                ErrorInfo::new("summary-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> RunSummary {
        RunSummary {
            phase: RunPhase::Library,
            iteration: 12,
            cursor: 3,
            library_size: 4,
            library_digest: "00".into(),
            flux_in: 5,
            flux_out: 6,
            master_seed: 7,
            seed_label: None,
            aborted: false,
            finished_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn filesystem_failures_are_io_errors() {
        let dir = tempdir().unwrap();
        let missing = RunSummary::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, FfsError::Io(_)));
        assert_eq!(missing.info().code, "summary-read");

        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = sample().write(&blocker.join("summary.json")).unwrap_err();
        assert!(matches!(err, FfsError::Io(_)));
        assert_eq!(err.info().code, "summary-mkdir");
    }

    #[test]
    fn malformed_json_stays_a_serde_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        fs::write(&path, "{").unwrap();
        let err = RunSummary::load(&path).unwrap_err();
        assert!(matches!(err, FfsError::Serde(_)));
        assert_eq!(err.info().code, "summary-parse");
    }
}
