use std::collections::HashMap;
use std::fmt::{self, Display};

use ffs_core::errors::{ErrorInfo, FfsError};
use serde::{Deserialize, Serialize};

/// Parent name recorded for configurations produced by the unbiased flux run.
pub const ORIGIN: &str = "Origin";

/// One saved phase-space snapshot and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Interface the walker had reached when the snapshot was taken.
    pub interface: usize,
    /// Dump file holding the snapshot.
    pub filename: String,
    /// Dump file the trajectory was shot from, or [`ORIGIN`].
    pub parent: String,
}

impl ConfigRecord {
    /// Creates a record.
    pub fn new(interface: usize, filename: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            interface,
            filename: filename.into(),
            parent: parent.into(),
        }
    }

    /// Parses one index line `<interface> <filename> <parent>`.
    pub fn parse_line(line: &str) -> Result<Self, FfsError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let malformed = |message: &str| {
            FfsError::Data(
                ErrorInfo::new("index-line", message.to_string())
                    .with_context("line", line.to_string()),
            )
        };
        let [interface, filename, parent] = tokens.as_slice() else {
            return Err(malformed("index lines hold exactly three tokens"));
        };
        let interface = interface
            .parse::<usize>()
            .map_err(|_| malformed("interface index is not a non-negative integer"))?;
        Ok(Self::new(interface, *filename, *parent))
    }
}

impl Display for ConfigRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.interface, self.filename, self.parent)
    }
}

/// Parses index text, skipping blank lines.
pub fn parse_index(text: &str) -> Result<Vec<ConfigRecord>, FfsError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(ConfigRecord::parse_line)
        .collect()
}

/// Serializes records as newline-terminated index lines.
pub fn format_index(records: &[ConfigRecord]) -> String {
    let mut text = String::new();
    for record in records {
        text.push_str(&record.to_string());
        text.push('\n');
    }
    text
}

/// Records at `interface`, in their original relative order.
///
/// Returns `None` when nothing has been recorded there, which callers treat
/// as a distinct condition from a malformed ledger.
pub fn extract_records(interface: usize, records: &[ConfigRecord]) -> Option<Vec<ConfigRecord>> {
    let matching: Vec<ConfigRecord> = records
        .iter()
        .filter(|record| record.interface == interface)
        .cloned()
        .collect();
    (!matching.is_empty()).then_some(matching)
}

/// Text flavour of [`extract_records`]; malformed lines are errors.
pub fn extract_records_from_text(
    interface: usize,
    text: &str,
) -> Result<Option<Vec<ConfigRecord>>, FfsError> {
    let records = parse_index(text)?;
    Ok(extract_records(interface, &records))
}

/// Records at `interface` whose parent chain leads back to `root`.
///
/// Chains that reach [`ORIGIN`], an unknown parent or a cycle are dropped.
pub fn descendants_at(interface: usize, records: &[ConfigRecord], root: &str) -> Vec<ConfigRecord> {
    let parents: HashMap<&str, &str> = records
        .iter()
        .map(|record| (record.filename.as_str(), record.parent.as_str()))
        .collect();
    records
        .iter()
        .filter(|record| record.interface == interface)
        .filter(|record| {
            let mut parent = record.parent.as_str();
            for _ in 0..parents.len() {
                if parent == root {
                    return true;
                }
                match parents.get(parent) {
                    Some(next) => parent = next,
                    None => return false,
                }
            }
            false
        })
        .cloned()
        .collect()
}
