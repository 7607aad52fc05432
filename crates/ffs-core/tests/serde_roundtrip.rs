use ffs_core::errors::{ErrorInfo, FfsError};
use ffs_core::{InterfaceLadder, Snapshot};

#[test]
fn ladder_round_trips_as_plain_list() {
    let ladder = InterfaceLadder::new(vec![-1.0, 0.5, 2.0]).expect("ladder");
    let json = serde_json::to_string(&ladder).expect("serialize");
    assert_eq!(json, "[-1.0,0.5,2.0]");
    let decoded: InterfaceLadder = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, ladder);
}

#[test]
fn unordered_ladder_fails_to_deserialize() {
    let result: Result<InterfaceLadder, _> = serde_json::from_str("[1.0,0.0]");
    assert!(result.is_err());
}

#[test]
fn error_round_trips_json() {
    let err = FfsError::Data(
        ErrorInfo::new("dump-token-count", "expected 7 tokens").with_context("line", "1 2 3"),
    );
    let json = serde_json::to_string_pretty(&err).expect("serialize");
    let decoded: FfsError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn snapshot_round_trips_json() {
    let mut snapshot =
        Snapshot::with_velocities(vec![3, 9], vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]], vec![[0.5; 3]; 2])
            .expect("snapshot");
    snapshot.set_tag("dump_1_0_0.dump");
    let json = serde_json::to_string(&snapshot).expect("serialize");
    let decoded: Snapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, snapshot);
}
