use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use ffs_core::errors::{ErrorInfo, FfsError};
use ffs_core::{Snapshot, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::ledger::IndexLedger;
use crate::record::ConfigRecord;

const DUMP_TOKENS: usize = 7;

/// Position and velocity of one atom as stored in a dump line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomState {
    /// Atom identifier.
    pub id: u64,
    /// Cartesian position.
    pub position: Vec3,
    /// Cartesian velocity.
    pub velocity: Vec3,
}

fn corrupt(code: &str, message: &str, source: &str, line: &str) -> FfsError {
    error!(source, line, "{message}");
    FfsError::Data(
        ErrorInfo::new(code, message)
            .with_context("source", source.to_string())
            .with_context("line", line.to_string()),
    )
}

/// Renders every atom as `id px py pz vx vy vz`, one line per atom.
///
/// Floats use the shortest representation that parses back to the same bits.
pub fn format_configuration(snapshot: &Snapshot) -> String {
    let mut text = String::with_capacity(snapshot.len() * 96);
    let atoms = snapshot
        .atom_ids()
        .iter()
        .zip(snapshot.positions())
        .zip(snapshot.velocities());
    for ((id, p), v) in atoms {
        // Writing into a String cannot fail.
        let _ = writeln!(
            text,
            "{id} {} {} {} {} {} {}",
            p[0], p[1], p[2], v[0], v[1], v[2]
        );
    }
    text
}

/// Parses dump text. Blank lines are skipped; anything else must hold
/// exactly seven tokens.
pub fn parse_configuration(source: &str, text: &str) -> Result<Vec<AtomState>, FfsError> {
    Ok(parse_lines(source, text)?
        .into_iter()
        .map(|(_, atom)| atom)
        .collect())
}

fn parse_lines<'t>(source: &str, text: &'t str) -> Result<Vec<(&'t str, AtomState)>, FfsError> {
    let mut atoms = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != DUMP_TOKENS {
            return Err(corrupt(
                "dump-token-count",
                "configuration line does not hold 7 tokens",
                source,
                line,
            ));
        }
        let id = tokens[0]
            .parse::<u64>()
            .map_err(|_| corrupt("dump-atom-id", "atom id is not an integer", source, line))?;
        let mut values = [0.0f64; 6];
        for (slot, token) in values.iter_mut().zip(&tokens[1..]) {
            *slot = token.parse::<f64>().map_err(|_| {
                corrupt("dump-number", "coordinate is not a number", source, line)
            })?;
        }
        atoms.push((
            line,
            AtomState {
                id,
                position: [values[0], values[1], values[2]],
                velocity: [values[3], values[4], values[5]],
            },
        ));
    }
    Ok(atoms)
}

/// Overwrites positions and velocities from dump text named `source`.
///
/// Every line is validated and matched to an atom before the snapshot is
/// touched. On success forces are zeroed and the snapshot tag becomes `source`.
pub fn apply_configuration(
    snapshot: &mut Snapshot,
    source: &str,
    text: &str,
) -> Result<(), FfsError> {
    let atoms = parse_lines(source, text)?;
    let mut slots = Vec::with_capacity(atoms.len());
    for (line, atom) in &atoms {
        let slot = snapshot.index_of(atom.id).ok_or_else(|| {
            corrupt(
                "dump-unknown-atom",
                "atom id from dump is not present in the snapshot",
                source,
                line,
            )
        })?;
        slots.push(slot);
    }
    for ((_, atom), slot) in atoms.iter().zip(slots) {
        snapshot.positions_mut()[slot] = atom.position;
        snapshot.velocities_mut()[slot] = atom.velocity;
    }
    snapshot.clear_forces();
    snapshot.set_tag(source);
    debug!(source, atoms = atoms.len(), "applied configuration");
    Ok(())
}

/// Reads a dump file and applies it onto the snapshot.
pub fn read_configuration(path: &Path, snapshot: &mut Snapshot) -> Result<(), FfsError> {
    let text = fs::read_to_string(path).map_err(|err| FfsError::io("dump-read", path, err))?;
    apply_configuration(snapshot, &path.display().to_string(), &text)
}

/// Writes the snapshot to the file named by its tag and appends the matching
/// record to the ledger.
pub fn write_configuration(
    snapshot: &Snapshot,
    interface: usize,
    parent: &str,
    ledger: &mut IndexLedger,
) -> Result<ConfigRecord, FfsError> {
    let filename = snapshot.tag();
    if filename.is_empty() || filename.chars().any(char::is_whitespace) {
        return Err(FfsError::Config(
            ErrorInfo::new("dump-name", "dump names must be non-empty and free of whitespace")
                .with_context("name", filename.to_string()),
        ));
    }
    let path = Path::new(filename);
    fs::write(path, format_configuration(snapshot))
        .map_err(|err| FfsError::io("dump-write", path, err))?;
    let record = ConfigRecord::new(interface, filename, parent);
    debug!(interface, file = filename, parent, "wrote configuration");
    ledger.record(record.clone());
    Ok(record)
}
