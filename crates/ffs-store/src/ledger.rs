use ffs_comm::{CommExt, Communicator};
use ffs_core::errors::FfsError;
use ffs_core::FIRST_INTERFACE;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::record::{extract_records, format_index, ConfigRecord};

/// Sum-reduces a local count across every walker.
pub fn merge_counts(comm: &dyn Communicator, local: u64) -> Result<u64, FfsError> {
    comm.all_reduce_sum(local)
}

/// Concatenation-reduces local records across every walker, in rank order.
pub fn merge_records(
    comm: &dyn Communicator,
    local: &[ConfigRecord],
) -> Result<Vec<ConfigRecord>, FfsError> {
    comm.all_reduce_concat(local)
}

/// Serial counterpart of [`merge_records`] over already collected parts.
pub fn merge_record_sets<I>(parts: I) -> Vec<ConfigRecord>
where
    I: IntoIterator<Item = Vec<ConfigRecord>>,
{
    parts.into_iter().flatten().collect()
}

/// Append-only record buffer of one walker.
///
/// `pending` holds records written since the last flush. `carried` holds
/// records of the current seed that are already in the index log, either
/// checkpointed after an advanced cycle or reloaded on a mid-shot resume; they
/// only take part in shooting-point selection.
#[derive(Debug, Clone, Default)]
pub struct IndexLedger {
    pending: Vec<ConfigRecord>,
    carried: Vec<ConfigRecord>,
}

impl IndexLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a freshly written record.
    pub fn record(&mut self, record: ConfigRecord) {
        self.pending.push(record);
    }

    /// Records written locally since the last flush.
    pub fn pending(&self) -> &[ConfigRecord] {
        &self.pending
    }

    /// Number of local pending records at `interface`.
    pub fn count_at(&self, interface: usize) -> usize {
        self.pending
            .iter()
            .filter(|record| record.interface == interface)
            .count()
    }

    /// Adds persisted records that shooting-point selection may draw from.
    pub fn carry(&mut self, records: Vec<ConfigRecord>) {
        self.carried.extend(records);
    }

    /// Carried records followed by every walker's pending records.
    pub fn merged(&self, comm: &dyn Communicator) -> Result<Vec<ConfigRecord>, FfsError> {
        let global = merge_records(comm, &self.pending)?;
        Ok(merge_record_sets([self.carried.clone(), global]))
    }

    /// Global pending records, which move to the carried set so that
    /// selection still sees them. The caller persists the returned records.
    pub fn checkpoint(&mut self, comm: &dyn Communicator) -> Result<Vec<ConfigRecord>, FfsError> {
        let global = merge_records(comm, &self.pending)?;
        self.pending.clear();
        self.carried.extend(global.iter().cloned());
        Ok(global)
    }

    /// Global pending records; local pending and carried records are cleared.
    pub fn flush(&mut self, comm: &dyn Communicator) -> Result<Vec<ConfigRecord>, FfsError> {
        let global = merge_records(comm, &self.pending)?;
        debug!(
            local = self.pending.len(),
            global = global.len(),
            "flushed ledger"
        );
        self.pending.clear();
        self.carried.clear();
        Ok(global)
    }
}

/// Frozen pool of first-interface configurations seeding shooting cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    records: Vec<ConfigRecord>,
}

impl Library {
    /// Snapshots the first-interface records out of a merged ledger.
    pub fn build(records: &[ConfigRecord]) -> Self {
        Self {
            records: extract_records(FIRST_INTERFACE, records).unwrap_or_default(),
        }
    }

    /// Number of seeds.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no seed is available.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Seed at a cursor position.
    pub fn get(&self, cursor: usize) -> Option<&ConfigRecord> {
        self.records.get(cursor)
    }

    /// All seeds in library order.
    pub fn records(&self) -> &[ConfigRecord] {
        &self.records
    }

    /// Index-format text of the library.
    pub fn to_text(&self) -> String {
        format_index(&self.records)
    }

    /// Hex SHA-256 of the library text.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_text().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffs_comm::SoloComm;

    #[test]
    fn library_keeps_first_interface_in_order() {
        let records = vec![
            ConfigRecord::new(1, "a", "Origin"),
            ConfigRecord::new(2, "b", "a"),
            ConfigRecord::new(1, "c", "Origin"),
        ];
        let library = Library::build(&records);
        assert_eq!(library.len(), 2);
        assert_eq!(library.get(1).unwrap().filename, "c");
        assert_eq!(library.to_text(), "1 a Origin\n1 c Origin\n");
        assert_eq!(library.digest().len(), 64);
    }

    #[test]
    fn flush_clears_pending_and_carried() {
        let comm = SoloComm::new();
        let mut ledger = IndexLedger::new();
        ledger.carry(vec![ConfigRecord::new(2, "old", "seed")]);
        ledger.record(ConfigRecord::new(2, "new", "seed"));
        assert_eq!(ledger.count_at(2), 1);
        assert_eq!(ledger.merged(&comm).unwrap().len(), 2);
        let flushed = ledger.flush(&comm).unwrap();
        assert_eq!(flushed, vec![ConfigRecord::new(2, "new", "seed")]);
        assert!(ledger.pending().is_empty());
        assert!(ledger.merged(&comm).unwrap().is_empty());
    }

    #[test]
    fn checkpoint_keeps_records_selectable() {
        let comm = SoloComm::new();
        let mut ledger = IndexLedger::new();
        ledger.record(ConfigRecord::new(2, "x", "seed"));
        let persisted = ledger.checkpoint(&comm).unwrap();
        assert_eq!(persisted, vec![ConfigRecord::new(2, "x", "seed")]);
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.merged(&comm).unwrap(), persisted);

        ledger.record(ConfigRecord::new(3, "y", "x"));
        assert_eq!(ledger.flush(&comm).unwrap(), vec![ConfigRecord::new(3, "y", "x")]);
        assert!(ledger.merged(&comm).unwrap().is_empty());
    }
}
