use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use ffs_core::errors::{ErrorInfo, FfsError};

use crate::{Communicator, WalkerComms};

#[derive(Debug)]
struct Rendezvous {
    generation: u64,
    arrived: usize,
    slots: Vec<Option<Vec<u8>>>,
    result: Option<Arc<Vec<Vec<u8>>>>,
    aborted: Option<i32>,
}

#[derive(Debug)]
struct Shared {
    size: usize,
    state: Mutex<Rendezvous>,
    ready: Condvar,
}

fn poisoned<T>(_: PoisonError<T>) -> FfsError {
    FfsError::Comm(ErrorInfo::new(
        "group-poisoned",
        "a rank panicked while holding the rendezvous lock",
    ))
}

fn aborted(code: i32) -> FfsError {
    FfsError::Comm(
        ErrorInfo::new("group-aborted", "the walker population was aborted")
            .with_context("code", code.to_string()),
    )
}

/// Factory for in-process groups whose ranks live on separate threads.
#[derive(Debug)]
pub struct LocalGroup;

impl LocalGroup {
    /// Creates `size` connected handles, one per rank, ordered by rank.
    pub fn create(size: usize) -> Vec<LocalComm> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            size,
            state: Mutex::new(Rendezvous {
                generation: 0,
                arrived: 0,
                slots: vec![None; size],
                result: None,
                aborted: None,
            }),
            ready: Condvar::new(),
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Builds world and replica groups for `world_size` processes split into
    /// consecutive replicas of `replica_size` processes each.
    pub fn walkers(world_size: usize, replica_size: usize) -> Result<Vec<WalkerComms>, FfsError> {
        if replica_size == 0 || world_size == 0 || world_size % replica_size != 0 {
            return Err(FfsError::Config(
                ErrorInfo::new("replica-split", "world size must be a multiple of replica size")
                    .with_context("world_size", world_size.to_string())
                    .with_context("replica_size", replica_size.to_string()),
            ));
        }
        let world = LocalGroup::create(world_size);
        let mut replicas = Vec::with_capacity(world_size);
        for _ in 0..world_size / replica_size {
            replicas.extend(LocalGroup::create(replica_size));
        }
        Ok(world
            .into_iter()
            .zip(replicas)
            .map(|(world, replica)| WalkerComms::new(Arc::new(world), Arc::new(replica)))
            .collect())
    }
}

/// One rank of an in-process group built by [`LocalGroup`].
#[derive(Debug, Clone)]
pub struct LocalComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl LocalComm {
    fn lock(&self) -> Result<MutexGuard<'_, Rendezvous>, FfsError> {
        self.shared.state.lock().map_err(poisoned)
    }

    /// Blocks until every rank contributed, then hands each rank all payloads.
    fn exchange(&self, local: Vec<u8>) -> Result<Arc<Vec<Vec<u8>>>, FfsError> {
        let mut state = self.lock()?;
        if let Some(code) = state.aborted {
            return Err(aborted(code));
        }
        let generation = state.generation;
        state.slots[self.rank] = Some(local);
        state.arrived += 1;

        if state.arrived == self.shared.size {
            let gathered: Vec<Vec<u8>> = state
                .slots
                .iter_mut()
                .map(|slot| slot.take().unwrap_or_default())
                .collect();
            let gathered = Arc::new(gathered);
            state.result = Some(Arc::clone(&gathered));
            state.arrived = 0;
            state.generation += 1;
            self.shared.ready.notify_all();
            return Ok(gathered);
        }

        loop {
            state = self.shared.ready.wait(state).map_err(poisoned)?;
            if state.generation != generation {
                // The next generation cannot complete without this rank, so the
                // stored result still belongs to `generation`.
                return state.result.clone().ok_or_else(|| {
                    FfsError::Comm(ErrorInfo::new(
                        "rendezvous-result",
                        "collective completed without a result",
                    ))
                });
            }
            if let Some(code) = state.aborted {
                return Err(aborted(code));
            }
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_gather_bytes(&self, local: Vec<u8>) -> Result<Vec<Vec<u8>>, FfsError> {
        let gathered = self.exchange(local)?;
        Ok(gathered.as_ref().clone())
    }

    fn broadcast_bytes(&self, root: usize, payload: Option<Vec<u8>>) -> Result<Vec<u8>, FfsError> {
        if root >= self.shared.size {
            return Err(FfsError::Comm(
                ErrorInfo::new("broadcast-root", "root rank outside the group")
                    .with_context("root", root.to_string())
                    .with_context("size", self.shared.size.to_string()),
            ));
        }
        // Leading byte flags whether the contributor supplied a payload.
        let framed = match payload {
            Some(mut bytes) if self.rank == root => {
                bytes.insert(0, 1);
                bytes
            }
            _ => vec![0],
        };
        let gathered = self.exchange(framed)?;
        match gathered[root].split_first() {
            Some((1, body)) => Ok(body.to_vec()),
            _ => Err(FfsError::Comm(
                ErrorInfo::new(
                    "broadcast-missing-payload",
                    "root rank did not supply a payload",
                )
                .with_context("root", root.to_string()),
            )),
        }
    }

    fn abort(&self, code: i32) {
        tracing::error!(rank = self.rank, code, "aborting in-process group");
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.aborted.get_or_insert(code);
        self.shared.ready.notify_all();
    }
}
