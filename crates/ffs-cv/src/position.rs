use ffs_core::errors::FfsError;
use ffs_core::{OrderParameter, Snapshot, Vec3};
use serde::{Deserialize, Serialize};

use crate::locate_atom;

/// Distance of one atom from a fixed point, over the selected dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomPositionCv {
    atom_id: u64,
    point: Vec3,
    dimensions: [bool; 3],
    #[serde(skip)]
    value: f64,
    #[serde(skip)]
    gradient: Vec<Vec3>,
}

impl AtomPositionCv {
    /// Distance over all three dimensions.
    pub fn new(atom_id: u64, point: Vec3) -> Self {
        Self::with_dimensions(atom_id, point, [true; 3])
    }

    /// Distance over the dimensions flagged `true`.
    pub fn with_dimensions(atom_id: u64, point: Vec3, dimensions: [bool; 3]) -> Self {
        Self {
            atom_id,
            point,
            dimensions,
            value: 0.0,
            gradient: Vec::new(),
        }
    }
}

impl OrderParameter for AtomPositionCv {
    fn initialize(&mut self, snapshot: &Snapshot) -> Result<(), FfsError> {
        locate_atom(snapshot, self.atom_id)?;
        self.gradient = vec![[0.0; 3]; snapshot.len()];
        Ok(())
    }

    fn evaluate(&mut self, snapshot: &Snapshot) -> Result<(), FfsError> {
        let slot = locate_atom(snapshot, self.atom_id)?;
        if self.gradient.len() != snapshot.len() {
            self.gradient = vec![[0.0; 3]; snapshot.len()];
        }
        self.gradient.iter_mut().for_each(|g| *g = [0.0; 3]);

        let position = snapshot.positions()[slot];
        let mut delta = [0.0; 3];
        for axis in 0..3 {
            if self.dimensions[axis] {
                delta[axis] = position[axis] - self.point[axis];
            }
        }
        self.value = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
        if self.value > 0.0 {
            self.gradient[slot] = [
                delta[0] / self.value,
                delta[1] / self.value,
                delta[2] / self.value,
            ];
        }
        Ok(())
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn gradient(&self) -> &[Vec3] {
        &self.gradient
    }
}
