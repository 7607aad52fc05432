mod common;

use std::fs;

use ffs_comm::WalkerComms;
use ffs_engine::{CycleOutcome, ForwardFlux, RestartMode, RunPhase, StepAction};
use ffs_store::{parse_index, parse_results};
use tempfile::tempdir;

use common::{config, distance_cv, read, snapshot_at, step, write_dump, x_of};

#[test]
fn library_resume_continues_after_completed_seeds() {
    let dir = tempdir().unwrap();
    let a = write_dump(dir.path(), "seed_a.dump", 1.1);
    let b = write_dump(dir.path(), "seed_b.dump", 1.7);
    fs::write(
        dir.path().join("library_input.dat"),
        format!("1 {a} Origin\n1 {b} Origin\n"),
    )
    .unwrap();
    fs::write(dir.path().join("ffs_results.dat"), "0 0 2 0\n").unwrap();

    let mut cfg = config(dir.path(), vec![0.0, 1.0, 2.0, 3.0], 2, 5);
    cfg.restart = RestartMode::Library;
    let mut ffs = ForwardFlux::new(cfg, WalkerComms::solo(), distance_cv()).unwrap();
    let mut snap = snapshot_at(0.0);
    ffs.pre_simulation(&snap).unwrap();
    assert_eq!(ffs.phase(), RunPhase::Library);
    assert_eq!(ffs.cursor(), 1);

    let report = step(&mut ffs, &mut snap, 0.0);
    assert_eq!(
        report.action,
        StepAction::Seeded {
            filename: b,
            cursor: 1
        }
    );
    assert_eq!(x_of(&snap), 1.7);
    let results = parse_results(&read(dir.path(), "ffs_results.dat")).unwrap();
    assert_eq!(results.rows, vec![vec![0, 0, 2, 0]]);
}

#[test]
fn mid_shot_resume_picks_from_reloaded_records() {
    let dir = tempdir().unwrap();
    let a = write_dump(dir.path(), "seed_a.dump", 1.1);
    let c = write_dump(dir.path(), "cross_c.dump", 2.4);
    fs::write(dir.path().join("library_input.dat"), format!("1 {a} Origin\n")).unwrap();
    fs::write(
        dir.path().join("ffs_index.dat"),
        format!("1 {a} Origin\n2 {c} {a}\n"),
    )
    .unwrap();
    fs::write(dir.path().join("ffs_results.dat"), "flux in: 3\nflux out: 4\n").unwrap();

    let mut cfg = config(dir.path(), vec![0.0, 1.0, 2.0, 3.0], 2, 5);
    cfg.restart = RestartMode::MidShot { interface: 2 };
    let mut ffs = ForwardFlux::new(cfg, WalkerComms::solo(), distance_cv()).unwrap();
    let mut snap = snapshot_at(0.0);
    ffs.pre_simulation(&snap).unwrap();
    assert_eq!(ffs.phase(), RunPhase::NewConfig);
    assert_eq!(ffs.flux_counts(), (3, 4));
    assert_eq!(ffs.cursor(), 1);

    let report = step(&mut ffs, &mut snap, 0.0);
    assert_eq!(
        report.action,
        StepAction::ShootingPoint {
            filename: c,
            interface: 2
        }
    );
    assert_eq!(x_of(&snap), 2.4);

    // The interrupted seed is consumed: the library of one is now exhausted.
    step(&mut ffs, &mut snap, 0.2);
    let resolved = step(&mut ffs, &mut snap, 0.2);
    assert_eq!(resolved.phase, RunPhase::Library);
    assert_eq!(step(&mut ffs, &mut snap, 0.0).action, StepAction::Terminated);
    let results = parse_results(&read(dir.path(), "ffs_results.dat")).unwrap();
    assert_eq!(results.rows, vec![vec![0, 0, 0, 0]]);
    assert_eq!(results.flux_in, Some(3));
}

#[test]
fn resuming_without_a_library_is_fatal() {
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path(), vec![0.0, 1.0, 2.0], 2, 5);
    cfg.restart = RestartMode::Library;
    let mut ffs = ForwardFlux::new(cfg, WalkerComms::solo(), distance_cv()).unwrap();
    let mut snap = snapshot_at(0.0);
    ffs.pre_simulation(&snap).unwrap();

    let err = ffs.post_integration(&mut snap).unwrap_err();
    assert!(matches!(err, ffs_core::FfsError::Exhausted(_)));
    assert_eq!(err.info().code, "library-empty");
    assert_eq!(err.abort_code(), 4);
    let results = parse_results(&read(dir.path(), "ffs_results.dat")).unwrap();
    assert_eq!(results.flux_out, Some(0));
}

#[test]
fn fresh_start_truncates_previous_logs() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("ffs_results.dat"), "9 9 9\n").unwrap();
    let cfg = config(dir.path(), vec![0.0, 1.0, 2.0], 2, 5);
    let mut ffs = ForwardFlux::new(cfg, WalkerComms::solo(), distance_cv()).unwrap();
    ffs.pre_simulation(&snapshot_at(0.0)).unwrap();
    assert_eq!(ffs.phase(), RunPhase::New);
    assert_eq!(read(dir.path(), "ffs_results.dat"), "");
}

#[test]
fn interrupted_chain_resumes_from_its_own_crossing() {
    let dir = tempdir().unwrap();
    let crossing = {
        let cfg = config(dir.path(), vec![0.0, 1.0, 2.0, 3.0], 1, 1);
        let mut ffs = ForwardFlux::new(cfg, WalkerComms::solo(), distance_cv()).unwrap();
        let mut snap = snapshot_at(0.5);
        ffs.pre_simulation(&snap).unwrap();
        assert_eq!(
            step(&mut ffs, &mut snap, 1.2).action,
            StepAction::LibraryBuilt { size: 1 }
        );
        step(&mut ffs, &mut snap, 0.0);
        let resolved = step(&mut ffs, &mut snap, 2.5);
        assert_eq!(
            resolved.action,
            StepAction::Resolved {
                outcome: CycleOutcome::Advanced { interface: 2 },
                successes: 1
            }
        );
        assert_eq!(resolved.phase, RunPhase::NewConfig);
        ffs.finalize().unwrap();
        snap.tag().to_string()
    };

    let index = parse_index(&read(dir.path(), "ffs_index.dat")).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index[1].filename, crossing);
    assert_eq!(index[1].interface, 2);

    let mut cfg = config(dir.path(), vec![0.0, 1.0, 2.0, 3.0], 1, 1);
    cfg.restart = RestartMode::MidShot { interface: 2 };
    let mut ffs = ForwardFlux::new(cfg, WalkerComms::solo(), distance_cv()).unwrap();
    let mut snap = snapshot_at(0.0);
    ffs.pre_simulation(&snap).unwrap();
    assert_eq!(ffs.phase(), RunPhase::NewConfig);
    assert_eq!(ffs.flux_counts(), (0, 1));

    let report = step(&mut ffs, &mut snap, 0.0);
    assert_eq!(
        report.action,
        StepAction::ShootingPoint {
            filename: crossing,
            interface: 2
        }
    );
    assert_eq!(x_of(&snap), 2.5);
}
