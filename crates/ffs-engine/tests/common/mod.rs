#![allow(dead_code)]

use std::fs;
use std::path::Path;

use ffs_core::{OrderParameter, Snapshot};
use ffs_cv::AtomPositionCv;
use ffs_engine::{ForwardFlux, OutputConfig, RunConfig, StepReport};
use ffs_store::format_configuration;

/// Two atoms; the order parameter is the x coordinate of atom 1.
pub fn snapshot_at(x: f64) -> Snapshot {
    Snapshot::with_velocities(
        vec![1, 2],
        vec![[x, 0.0, 0.0], [5.0, 5.0, 5.0]],
        vec![[0.1, -0.2, 0.3], [0.0, 0.0, 0.0]],
    )
    .unwrap()
}

pub fn set_x(snapshot: &mut Snapshot, x: f64) {
    snapshot.positions_mut()[0][0] = x;
}

pub fn x_of(snapshot: &Snapshot) -> f64 {
    snapshot.positions()[0][0]
}

pub fn distance_cv() -> Vec<Box<dyn OrderParameter>> {
    vec![Box::new(AtomPositionCv::with_dimensions(
        1,
        [0.0; 3],
        [true, false, false],
    ))]
}

pub fn config(dir: &Path, interfaces: Vec<f64>, shots: usize, required: usize) -> RunConfig {
    RunConfig {
        interfaces,
        shots_per_point: shots,
        required_configs: required,
        flux_sync_interval: 1,
        output: OutputConfig {
            run_directory: Some(dir.to_path_buf()),
            ..OutputConfig::default()
        },
        ..RunConfig::default()
    }
}

pub fn step(ffs: &mut ForwardFlux, snapshot: &mut Snapshot, x: f64) -> StepReport {
    set_x(snapshot, x);
    ffs.post_integration(snapshot).unwrap()
}

/// Writes a dump of `snapshot_at(x)` under `dir` and returns its path text.
pub fn write_dump(dir: &Path, name: &str, x: f64) -> String {
    let path = dir.join(name);
    fs::write(&path, format_configuration(&snapshot_at(x))).unwrap();
    path.display().to_string()
}

pub fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap_or_default()
}
