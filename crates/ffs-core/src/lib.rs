#![deny(missing_docs)]
#![doc = "Core traits and data types for the forward-flux sampling coordinator."]

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod ladder;
pub mod rng;
pub mod snapshot;

pub use errors::{ErrorInfo, FfsError};
pub use ladder::{InterfaceLadder, FIRST_INTERFACE};
pub use rng::{derive_substream_seed, RngHandle};
pub use snapshot::{Snapshot, Vec3};

/// Periodic domain of an order parameter that wraps (angles, for example).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Periodicity {
    /// Lower edge of the fundamental domain.
    pub lower: f64,
    /// Upper edge of the fundamental domain.
    pub upper: f64,
}

impl Periodicity {
    /// Creates a periodic domain `[lower, upper)`.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Length of the fundamental domain.
    pub fn period(&self) -> f64 {
        self.upper - self.lower
    }

    /// Maps a value into the fundamental domain.
    pub fn wrap(&self, value: f64) -> f64 {
        let period = self.period();
        self.lower + (value - self.lower).rem_euclid(period)
    }

    /// Minimum-image difference `a - b`, in `[-period/2, period/2)`.
    pub fn difference(&self, a: f64, b: f64) -> f64 {
        let period = self.period();
        let half = 0.5 * period;
        (a - b + half).rem_euclid(period) - half
    }
}

/// Supplier of the scalar order parameter that drives the interface ladder.
///
/// Exactly one supplier is attached to a run. The coordinator calls
/// [`OrderParameter::evaluate`] once per step before reading the value.
pub trait OrderParameter: Send {
    /// Prepares internal buffers for the given snapshot layout.
    fn initialize(&mut self, _snapshot: &Snapshot) -> Result<(), FfsError> {
        Ok(())
    }

    /// Recomputes value and gradient from the snapshot.
    fn evaluate(&mut self, snapshot: &Snapshot) -> Result<(), FfsError>;

    /// Value computed by the last evaluation.
    fn value(&self) -> f64;

    /// Per-atom gradient computed by the last evaluation.
    fn gradient(&self) -> &[Vec3];

    /// Periodic domain, if the quantity wraps.
    fn periodicity(&self) -> Option<Periodicity> {
        None
    }

    /// Signed distance from the current value to `target`, honouring periodicity.
    fn difference(&self, target: f64) -> f64 {
        match self.periodicity() {
            Some(domain) => domain.difference(self.value(), target),
            None => self.value() - target,
        }
    }
}
