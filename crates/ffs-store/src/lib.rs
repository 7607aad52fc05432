#![deny(missing_docs)]

//! Durable state of a forward-flux run: configuration dumps, the index ledger
//! of crossing records, the frozen seed library and the text logs that persist
//! them.

/// Index, results and library log files.
pub mod artifacts;
/// Per-atom configuration dumps.
pub mod dump;
/// Ledger accumulation, global merges and the seed library.
pub mod ledger;
/// Crossing records and the index line format.
pub mod record;
/// Parsing of the results log.
pub mod results;

pub use artifacts::{ArtifactPaths, OpenMode, RunArtifacts};
pub use dump::{
    apply_configuration, format_configuration, parse_configuration, read_configuration,
    write_configuration, AtomState,
};
pub use ledger::{merge_counts, merge_record_sets, merge_records, IndexLedger, Library};
pub use record::{
    descendants_at, extract_records, extract_records_from_text, format_index, parse_index,
    ConfigRecord, ORIGIN,
};
pub use results::{load_results, parse_results, ResultsLog};
