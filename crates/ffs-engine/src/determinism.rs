use ffs_core::{derive_substream_seed, RngHandle};

const PICK_STREAM: u64 = 0x0FF5_5EED;

/// Seed of the shooting-point draw, optionally salted by the policy label.
pub fn pick_seed(master_seed: u64, label: Option<&str>) -> u64 {
    let salt = label
        .map(|label| {
            label
                .bytes()
                .fold(0u64, |acc, byte| derive_substream_seed(acc, byte as u64))
        })
        .unwrap_or(0);
    derive_substream_seed(master_seed ^ salt, PICK_STREAM)
}

/// Generator used by the bookkeeping rank to pick shooting points.
pub fn pick_rng(master_seed: u64, label: Option<&str>) -> RngHandle {
    RngHandle::from_seed(pick_seed(master_seed, label))
}

/// Name of the `counter`-th dump written by `replica` at `interface`.
pub fn dump_name(interface: usize, replica: usize, counter: u64) -> String {
    format!("dump_{interface}_{replica}_{counter}.dump")
}
