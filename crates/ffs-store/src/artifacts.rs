use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ffs_core::errors::FfsError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::Library;
use crate::record::{format_index, ConfigRecord};

/// How the logs are opened at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    /// Fresh run: existing content is discarded.
    Truncate,
    /// Resumed run: new content is appended.
    Append,
}

/// Locations of the three run logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Every crossing record, flushed once per cycle.
    pub index: PathBuf,
    /// Success-count rows and final flux counters.
    pub results: PathBuf,
    /// The frozen library.
    pub library: PathBuf,
}

#[derive(Debug)]
struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogFile {
    fn open(path: &Path, mode: OpenMode) -> Result<Self, FfsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| FfsError::io("log-mkdir", parent, err))?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            OpenMode::Truncate => options.write(true).truncate(true),
            OpenMode::Append => options.append(true),
        };
        let file = options
            .open(path)
            .map_err(|err| FfsError::io("log-open", path, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn write_text(&mut self, text: &str) -> Result<(), FfsError> {
        self.writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|err| FfsError::io("log-write", &self.path, err))
    }
}

/// Open handles on the index, results and library logs.
///
/// Only the bookkeeping rank holds one. Every write is flushed immediately so a
/// population abort loses nothing already reported.
#[derive(Debug)]
pub struct RunArtifacts {
    paths: ArtifactPaths,
    index: LogFile,
    results: LogFile,
    library: LogFile,
}

impl RunArtifacts {
    /// Opens all three logs with the given mode.
    pub fn open(paths: &ArtifactPaths, mode: OpenMode) -> Result<Self, FfsError> {
        debug!(?mode, index = %paths.index.display(), "opening run logs");
        Ok(Self {
            paths: paths.clone(),
            index: LogFile::open(&paths.index, mode)?,
            results: LogFile::open(&paths.results, mode)?,
            library: LogFile::open(&paths.library, mode)?,
        })
    }

    /// Paths the logs were opened at.
    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Appends records to the index log.
    pub fn append_index(&mut self, records: &[ConfigRecord]) -> Result<(), FfsError> {
        if records.is_empty() {
            return Ok(());
        }
        self.index.write_text(&format_index(records))
    }

    /// Appends one row of per-interface success counts.
    pub fn append_results_row(&mut self, row: &[u64]) -> Result<(), FfsError> {
        let line = row
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        self.results.write_text(&format!("{line}\n"))
    }

    /// Writes the frozen library.
    pub fn write_library(&mut self, library: &Library) -> Result<(), FfsError> {
        self.library.write_text(&library.to_text())
    }

    /// Appends the final flux counters to the results log.
    pub fn write_flux(&mut self, flux_in: u64, flux_out: u64) -> Result<(), FfsError> {
        self.results
            .write_text(&format!("flux in: {flux_in}\nflux out: {flux_out}\n"))
    }

    /// Flushes and closes every log.
    pub fn close(mut self) -> Result<(), FfsError> {
        for log in [&mut self.index, &mut self.results, &mut self.library] {
            log.writer
                .flush()
                .map_err(|err| FfsError::io("log-close", &log.path, err))?;
        }
        Ok(())
    }
}
