#![deny(missing_docs)]

//! Order-parameter suppliers implementing [`ffs_core::OrderParameter`].

mod improper;
mod position;
mod vector;

pub use improper::ImproperCv;
pub use position::AtomPositionCv;

use ffs_core::errors::{ErrorInfo, FfsError};
use ffs_core::Snapshot;

fn locate_atom(snapshot: &Snapshot, atom_id: u64) -> Result<usize, FfsError> {
    snapshot.index_of(atom_id).ok_or_else(|| {
        FfsError::Config(
            ErrorInfo::new("cv-atom", "order parameter references an unknown atom")
                .with_context("atom_id", atom_id.to_string()),
        )
    })
}
