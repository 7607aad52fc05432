#![deny(missing_docs)]

//! Collective operations shared by every walker of a forward-flux run.
//!
//! The [`Communicator`] trait exposes two byte-level primitives, all-gather and
//! broadcast. Typed reductions in [`CommExt`] are built on top of them with
//! `bincode` payloads, so reductions operate on structured values and text only
//! appears at the file boundary.

use std::sync::Arc;

use ffs_core::errors::{ErrorInfo, FfsError};
use serde::de::DeserializeOwned;
use serde::Serialize;

mod local;
mod solo;

pub use local::{LocalComm, LocalGroup};
pub use solo::SoloComm;

/// Blocking collective primitives over a fixed group of ranks.
///
/// Every rank of the group must call the same collective in the same order;
/// a missing participant blocks the others until it arrives or the group is
/// aborted.
pub trait Communicator: Send + Sync {
    /// Rank of the caller within the group.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Gathers every rank's payload, ordered by rank, on every rank.
    fn all_gather_bytes(&self, local: Vec<u8>) -> Result<Vec<Vec<u8>>, FfsError>;

    /// Distributes the root's payload to every rank. Non-root ranks pass `None`.
    fn broadcast_bytes(&self, root: usize, payload: Option<Vec<u8>>) -> Result<Vec<u8>, FfsError>;

    /// Tears down the group; blocked and future collectives fail.
    fn abort(&self, code: i32);
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FfsError> {
    bincode::serialize(value)
        .map_err(|err| FfsError::Serde(ErrorInfo::new("comm-encode", err.to_string())))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FfsError> {
    bincode::deserialize(bytes)
        .map_err(|err| FfsError::Serde(ErrorInfo::new("comm-decode", err.to_string())))
}

/// Typed collectives layered over [`Communicator`].
pub trait CommExt: Communicator {
    /// Gathers a typed value from every rank, ordered by rank.
    fn all_gather<T: Serialize + DeserializeOwned>(&self, value: &T) -> Result<Vec<T>, FfsError> {
        self.all_gather_bytes(encode(value)?)?
            .iter()
            .map(|bytes| decode(bytes))
            .collect()
    }

    /// Sum-reduces a counter across all ranks.
    fn all_reduce_sum(&self, local: u64) -> Result<u64, FfsError> {
        Ok(self.all_gather(&local)?.into_iter().sum())
    }

    /// Element-wise sum of equally sized vectors across all ranks.
    fn all_reduce_sum_vec(&self, local: &[u64]) -> Result<Vec<u64>, FfsError> {
        let gathered: Vec<Vec<u64>> = self.all_gather(&local.to_vec())?;
        let mut total = vec![0u64; local.len()];
        for (rank, part) in gathered.iter().enumerate() {
            if part.len() != total.len() {
                return Err(FfsError::Comm(
                    ErrorInfo::new("reduce-shape", "ranks contributed vectors of different length")
                        .with_context("rank", rank.to_string())
                        .with_context("expected", total.len().to_string())
                        .with_context("actual", part.len().to_string()),
                ));
            }
            for (slot, value) in total.iter_mut().zip(part) {
                *slot += value;
            }
        }
        Ok(total)
    }

    /// Concatenation-reduce: every rank receives all ranks' items in rank order.
    fn all_reduce_concat<T: Serialize + DeserializeOwned + Clone>(
        &self,
        local: &[T],
    ) -> Result<Vec<T>, FfsError> {
        let gathered: Vec<Vec<T>> = self.all_gather(&local.to_vec())?;
        Ok(gathered.into_iter().flatten().collect())
    }

    /// Broadcasts a typed value from `root`. Non-root ranks pass `None`.
    fn broadcast<T: Serialize + DeserializeOwned>(
        &self,
        root: usize,
        value: Option<&T>,
    ) -> Result<T, FfsError> {
        let payload = match value {
            Some(value) if self.rank() == root => Some(encode(value)?),
            _ => None,
        };
        decode(&self.broadcast_bytes(root, payload)?)
    }
}

impl<C: Communicator + ?Sized> CommExt for C {}

/// World and replica communicators held by one walker.
///
/// The world group spans every process of the run. The replica group spans the
/// processes that jointly integrate one trajectory; its rank 0 is the only
/// process allowed to write configuration dumps.
#[derive(Clone)]
pub struct WalkerComms {
    /// Communicator over all walkers.
    pub world: Arc<dyn Communicator>,
    /// Communicator over the processes of this walker's replica.
    pub replica: Arc<dyn Communicator>,
}

impl WalkerComms {
    /// Bundles world and replica communicators.
    pub fn new(world: Arc<dyn Communicator>, replica: Arc<dyn Communicator>) -> Self {
        Self { world, replica }
    }

    /// Single-process walker: both groups contain only the caller.
    pub fn solo() -> Self {
        Self::new(Arc::new(SoloComm::new()), Arc::new(SoloComm::new()))
    }

    /// Whether this process performs the run-wide bookkeeping writes.
    pub fn is_bookkeeper(&self) -> bool {
        self.world.rank() == 0
    }

    /// Whether this process writes dumps for its replica.
    pub fn is_replica_writer(&self) -> bool {
        self.replica.rank() == 0
    }
}

impl std::fmt::Debug for WalkerComms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkerComms")
            .field("world_rank", &self.world.rank())
            .field("world_size", &self.world.size())
            .field("replica_rank", &self.replica.rank())
            .field("replica_size", &self.replica.size())
            .finish()
    }
}
