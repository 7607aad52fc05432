//! Interface ladder partitioning order-parameter space.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, FfsError};

/// Interface whose crossings form the library of shooting seeds.
pub const FIRST_INTERFACE: usize = 1;

/// Ordered boundary values delimiting the interfaces `0..N`.
///
/// Index 0 bounds the initial basin and index `N - 1` is the target state.
/// The ladder is validated once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct InterfaceLadder {
    boundaries: Vec<f64>,
}

impl InterfaceLadder {
    /// Builds a ladder from strictly increasing, finite boundaries.
    pub fn new(boundaries: Vec<f64>) -> Result<Self, FfsError> {
        if boundaries.len() < 2 {
            return Err(FfsError::Config(
                ErrorInfo::new("ladder-too-short", "at least two interfaces are required")
                    .with_context("interfaces", boundaries.len().to_string()),
            ));
        }
        if let Some(position) = boundaries.iter().position(|value| !value.is_finite()) {
            return Err(FfsError::Config(
                ErrorInfo::new("ladder-non-finite", "interface boundaries must be finite")
                    .with_context("index", position.to_string()),
            ));
        }
        for (index, pair) in boundaries.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(FfsError::Config(
                    ErrorInfo::new("ladder-unordered", "interface boundaries must strictly increase")
                        .with_context("index", (index + 1).to_string())
                        .with_context("previous", pair[0].to_string())
                        .with_context("value", pair[1].to_string()),
                ));
            }
        }
        Ok(Self { boundaries })
    }

    /// Number of interfaces on the ladder.
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Always false; a valid ladder holds at least two interfaces.
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Index of the target-state interface.
    pub fn last(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Boundary value of an interface.
    pub fn boundary(&self, interface: usize) -> Option<f64> {
        self.boundaries.get(interface).copied()
    }

    /// Borrowed view over all boundaries.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Interface the value currently sits at.
    ///
    /// Returns the largest `i >= 1` with `value >= b_i`, or 0 while the value
    /// is still below the first interface.
    pub fn locate(&self, value: f64) -> usize {
        self.boundaries[1..]
            .iter()
            .take_while(|&&boundary| value >= boundary)
            .count()
    }
}

impl TryFrom<Vec<f64>> for InterfaceLadder {
    type Error = FfsError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InterfaceLadder> for Vec<f64> {
    fn from(value: InterfaceLadder) -> Self {
        value.boundaries
    }
}
