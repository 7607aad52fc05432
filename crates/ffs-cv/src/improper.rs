use std::f64::consts::PI;

use ffs_core::errors::{ErrorInfo, FfsError};
use ffs_core::{OrderParameter, Periodicity, Snapshot, Vec3};
use serde::{Deserialize, Serialize};

use crate::locate_atom;
use crate::vector::{cross, dot, norm, scale, sub};

/// Dihedral angle defined by four atoms `i-j-k-l`, in `(-π, π]`.
///
/// With `r_ij = x_i - x_j`, `r_kj = x_k - x_j`, `r_kl = x_k - x_l`,
/// `m = r_ij × r_kj` and `n = r_kj × r_kl`, the angle is
/// `atan2(|r_kj| r_ij·n, m·n)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImproperCv {
    atoms: [u64; 4],
    #[serde(skip)]
    value: f64,
    #[serde(skip)]
    gradient: Vec<Vec3>,
}

impl ImproperCv {
    /// Creates the angle over atoms `i, j, k, l`.
    pub fn new(atoms: [u64; 4]) -> Self {
        Self {
            atoms,
            value: 0.0,
            gradient: Vec::new(),
        }
    }
}

impl OrderParameter for ImproperCv {
    fn initialize(&mut self, snapshot: &Snapshot) -> Result<(), FfsError> {
        for atom in self.atoms {
            locate_atom(snapshot, atom)?;
        }
        self.gradient = vec![[0.0; 3]; snapshot.len()];
        Ok(())
    }

    fn evaluate(&mut self, snapshot: &Snapshot) -> Result<(), FfsError> {
        let mut slots = [0usize; 4];
        for (slot, atom) in slots.iter_mut().zip(self.atoms) {
            *slot = locate_atom(snapshot, atom)?;
        }
        let pos = snapshot.positions();
        let [i, j, k, l] = slots;

        let rij = sub(pos[i], pos[j]);
        let rkj = sub(pos[k], pos[j]);
        let rkl = sub(pos[k], pos[l]);
        let m = cross(rij, rkj);
        let n = cross(rkj, rkl);
        let norm_kj = norm(rkj);
        let m2 = dot(m, m);
        let n2 = dot(n, n);
        if norm_kj == 0.0 || m2 == 0.0 || n2 == 0.0 {
            return Err(FfsError::Data(
                ErrorInfo::new("cv-collinear", "dihedral undefined for collinear atoms")
                    .with_context("atoms", format!("{:?}", self.atoms)),
            ));
        }

        self.value = (norm_kj * dot(rij, n)).atan2(dot(m, n));

        let grad_i = scale(m, norm_kj / m2);
        let grad_l = scale(n, -norm_kj / n2);
        let p = dot(rij, rkj) / (norm_kj * norm_kj);
        let q = dot(rkl, rkj) / (norm_kj * norm_kj);
        let grad_j = sub(scale(grad_i, p - 1.0), scale(grad_l, q));
        let grad_k = sub(scale(grad_l, q - 1.0), scale(grad_i, p));

        if self.gradient.len() != snapshot.len() {
            self.gradient = vec![[0.0; 3]; snapshot.len()];
        }
        self.gradient.iter_mut().for_each(|g| *g = [0.0; 3]);
        self.gradient[i] = grad_i;
        self.gradient[j] = grad_j;
        self.gradient[k] = grad_k;
        self.gradient[l] = grad_l;
        Ok(())
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn gradient(&self) -> &[Vec3] {
        &self.gradient
    }

    fn periodicity(&self) -> Option<Periodicity> {
        Some(Periodicity::new(-PI, PI))
    }
}
