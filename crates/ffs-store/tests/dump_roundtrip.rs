use ffs_core::Snapshot;
use ffs_store::{
    apply_configuration, parse_configuration, read_configuration, write_configuration,
    IndexLedger, ORIGIN,
};
use tempfile::tempdir;

fn sample_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::with_velocities(
        vec![11, 4, 27],
        vec![
            [0.1, -2.5, 3.0e-7],
            [1.0 / 3.0, 2.0, -0.0],
            [1234.5678, f64::MIN_POSITIVE, -9.75],
        ],
        vec![[0.01, 0.02, 0.03], [-1.5, 0.0, 2.25], [1e10, -1e-10, 7.0]],
    )
    .unwrap();
    for force in snapshot.forces_mut() {
        *force = [5.0, 6.0, 7.0];
    }
    snapshot
}

#[test]
fn written_dump_reads_back_identically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dump_1_0_0.dump");
    let mut original = sample_snapshot();
    original.set_tag(path.display().to_string());

    let mut ledger = IndexLedger::new();
    let record = write_configuration(&original, 1, ORIGIN, &mut ledger).unwrap();
    assert_eq!(record.interface, 1);
    assert_eq!(record.parent, ORIGIN);
    assert_eq!(ledger.pending(), &[record.clone()]);

    let mut restored = Snapshot::new(vec![27, 11, 4], vec![[0.0; 3]; 3]).unwrap();
    for force in restored.forces_mut() {
        *force = [1.0, 1.0, 1.0];
    }
    read_configuration(&path, &mut restored).unwrap();

    for (slot, id) in original.atom_ids().iter().enumerate() {
        let target = restored.index_of(*id).unwrap();
        assert_eq!(restored.positions()[target], original.positions()[slot]);
        assert_eq!(restored.velocities()[target], original.velocities()[slot]);
    }
    assert!(restored.forces().iter().all(|force| *force == [0.0; 3]));
    assert_eq!(restored.tag(), record.filename);
}

#[test]
fn wrong_token_count_is_corruption() {
    let mut snapshot = sample_snapshot();
    let err = apply_configuration(&mut snapshot, "bad.dump", "11 0 0 0 0 0\n").unwrap_err();
    assert_eq!(err.info().code, "dump-token-count");
    assert_eq!(err.info().context["line"], "11 0 0 0 0 0");
    assert_eq!(err.info().context["source"], "bad.dump");
}

#[test]
fn unknown_atom_is_corruption_and_leaves_snapshot_untouched() {
    let mut snapshot = sample_snapshot();
    let before = snapshot.clone();
    let text = "11 9 9 9 9 9 9\n99 1 2 3 4 5 6\n";
    let err = apply_configuration(&mut snapshot, "stray.dump", text).unwrap_err();
    assert_eq!(err.info().code, "dump-unknown-atom");
    assert_eq!(err.info().context["line"], "99 1 2 3 4 5 6");
    assert_eq!(snapshot, before);
}

#[test]
fn blank_lines_are_ignored() {
    let atoms = parse_configuration("x", "\n4 1 2 3 4 5 6\n\n").unwrap();
    assert_eq!(atoms.len(), 1);
    assert_eq!(atoms[0].velocity, [4.0, 5.0, 6.0]);
}

#[test]
fn whitespace_in_dump_name_is_rejected() {
    let mut snapshot = sample_snapshot();
    snapshot.set_tag("bad name.dump");
    let mut ledger = IndexLedger::new();
    assert!(write_configuration(&snapshot, 1, ORIGIN, &mut ledger).is_err());
    assert!(ledger.pending().is_empty());
}
