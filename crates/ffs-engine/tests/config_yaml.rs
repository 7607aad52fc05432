use std::path::PathBuf;

use ffs_engine::{RestartMode, RunConfig};
use tempfile::tempdir;

#[test]
fn yaml_fills_defaults() {
    let config = RunConfig::from_yaml_str("interfaces: [-1.0, 0.0, 0.5, 2.0]\n").unwrap();
    assert_eq!(config.shots_per_point, 10);
    assert_eq!(config.required_configs, 100);
    assert_eq!(config.flux_sync_interval, 1);
    assert_eq!(config.restart, RestartMode::Fresh);
    assert_eq!(config.output.index_file, PathBuf::from("ffs_index.dat"));
    let ladder = config.validate().unwrap();
    assert_eq!(ladder.len(), 4);
}

#[test]
fn yaml_reads_mid_shot_restart_and_output_layout() {
    let yaml = r#"
interfaces: [0.0, 1.0, 2.0, 3.0]
shots_per_point: 4
required_configs: 20
flux_sync_interval: 50
restart:
  mode: mid-shot
  interface: 2
seed_policy:
  master_seed: 7
  label: calibration
output:
  run_directory: runs/a
  dump_dir: configs
"#;
    let config = RunConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.restart, RestartMode::MidShot { interface: 2 });
    assert_eq!(config.seed_policy.label.as_deref(), Some("calibration"));
    assert_eq!(config.output.dump_directory(), PathBuf::from("runs/a/configs"));
    assert_eq!(
        config.output.artifact_paths().library,
        PathBuf::from("runs/a/library_input.dat")
    );
    config.validate().unwrap();
}

#[test]
fn load_reports_parse_failures_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.yaml");
    std::fs::write(&path, "interfaces: nope\n").unwrap();
    let err = RunConfig::load(&path).unwrap_err();
    assert_eq!(err.info().code, "config-parse");
    assert!(err.info().context.contains_key("path"));
}

#[test]
fn validation_rejects_bad_runs() {
    let base = RunConfig {
        interfaces: vec![0.0, 1.0, 2.0],
        ..RunConfig::default()
    };

    let unordered = RunConfig {
        interfaces: vec![0.0, 2.0, 1.0],
        ..base.clone()
    };
    assert_eq!(unordered.validate().unwrap_err().info().code, "ladder-unordered");

    let two_rungs = RunConfig {
        interfaces: vec![0.0, 1.0],
        ..base.clone()
    };
    assert_eq!(
        two_rungs.validate().unwrap_err().info().code,
        "ladder-too-short-for-shooting"
    );
    assert!(RunConfig::default().validate().is_ok());

    let no_shots = RunConfig {
        shots_per_point: 0,
        ..base.clone()
    };
    assert_eq!(no_shots.validate().unwrap_err().info().code, "shots-zero");

    let no_sync = RunConfig {
        flux_sync_interval: 0,
        ..base.clone()
    };
    assert_eq!(no_sync.validate().unwrap_err().info().code, "sync-zero");

    let at_target = RunConfig {
        restart: RestartMode::MidShot { interface: 2 },
        ..base.clone()
    };
    assert_eq!(at_target.validate().unwrap_err().info().code, "restart-interface");

    let mut spaced = base;
    spaced.output.dump_dir = PathBuf::from("my dumps");
    assert_eq!(spaced.validate().unwrap_err().info().code, "dump-dir-whitespace");
}
