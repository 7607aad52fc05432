//! Per-step view of the host simulation state.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, FfsError};

/// Cartesian vector used for positions, velocities, forces and gradients.
pub type Vec3 = [f64; 3];

/// Phase-space snapshot of a single walker.
///
/// The host engine owns integration; the coordinator reads positions to
/// evaluate the order parameter and overwrites positions and velocities when
/// rewinding to a stored configuration. The `tag` names the configuration the
/// state descends from, or the dump about to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    atom_ids: Vec<u64>,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    forces: Vec<Vec3>,
    tag: String,
}

impl Snapshot {
    /// Creates a snapshot with zeroed velocities and forces.
    pub fn new(atom_ids: Vec<u64>, positions: Vec<Vec3>) -> Result<Self, FfsError> {
        let velocities = vec![[0.0; 3]; positions.len()];
        Self::with_velocities(atom_ids, positions, velocities)
    }

    /// Creates a snapshot from explicit positions and velocities.
    pub fn with_velocities(
        atom_ids: Vec<u64>,
        positions: Vec<Vec3>,
        velocities: Vec<Vec3>,
    ) -> Result<Self, FfsError> {
        if atom_ids.len() != positions.len() || atom_ids.len() != velocities.len() {
            return Err(FfsError::Config(
                ErrorInfo::new("snapshot-shape", "per-atom arrays differ in length")
                    .with_context("atoms", atom_ids.len().to_string())
                    .with_context("positions", positions.len().to_string())
                    .with_context("velocities", velocities.len().to_string()),
            ));
        }
        let forces = vec![[0.0; 3]; atom_ids.len()];
        Ok(Self {
            atom_ids,
            positions,
            velocities,
            forces,
            tag: String::new(),
        })
    }

    /// Number of atoms in the snapshot.
    pub fn len(&self) -> usize {
        self.atom_ids.len()
    }

    /// Whether the snapshot holds no atoms.
    pub fn is_empty(&self) -> bool {
        self.atom_ids.is_empty()
    }

    /// Atom identifiers in storage order.
    pub fn atom_ids(&self) -> &[u64] {
        &self.atom_ids
    }

    /// Atom positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Mutable atom positions.
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    /// Atom velocities.
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Mutable atom velocities.
    pub fn velocities_mut(&mut self) -> &mut [Vec3] {
        &mut self.velocities
    }

    /// Atom forces.
    pub fn forces(&self) -> &[Vec3] {
        &self.forces
    }

    /// Mutable atom forces.
    pub fn forces_mut(&mut self) -> &mut [Vec3] {
        &mut self.forces
    }

    /// Zeroes every force component.
    pub fn clear_forces(&mut self) {
        self.forces.iter_mut().for_each(|force| *force = [0.0; 3]);
    }

    /// Identity tag naming the snapshot's provenance.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Replaces the identity tag.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// Storage slot of an atom, found by linear scan.
    pub fn index_of(&self, atom_id: u64) -> Option<usize> {
        self.atom_ids.iter().position(|&id| id == atom_id)
    }
}
