use std::sync::atomic::{AtomicBool, Ordering};

use ffs_core::errors::{ErrorInfo, FfsError};

use crate::Communicator;

/// Group of exactly one rank. Collectives return the caller's own payload.
#[derive(Debug, Default)]
pub struct SoloComm {
    aborted: AtomicBool,
}

impl SoloComm {
    /// Creates a single-rank group.
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self) -> Result<(), FfsError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(FfsError::Comm(ErrorInfo::new(
                "group-aborted",
                "collective called on an aborted group",
            )));
        }
        Ok(())
    }
}

impl Communicator for SoloComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather_bytes(&self, local: Vec<u8>) -> Result<Vec<Vec<u8>>, FfsError> {
        self.check()?;
        Ok(vec![local])
    }

    fn broadcast_bytes(&self, root: usize, payload: Option<Vec<u8>>) -> Result<Vec<u8>, FfsError> {
        self.check()?;
        if root != 0 {
            return Err(FfsError::Comm(
                ErrorInfo::new("broadcast-root", "root rank outside the group")
                    .with_context("root", root.to_string())
                    .with_context("size", "1"),
            ));
        }
        payload.ok_or_else(|| {
            FfsError::Comm(ErrorInfo::new(
                "broadcast-missing-payload",
                "root rank did not supply a payload",
            ))
        })
    }

    fn abort(&self, code: i32) {
        tracing::error!(code, "aborting single-rank group");
        self.aborted.store(true, Ordering::SeqCst);
    }
}
