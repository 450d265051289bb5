//! Integration tests against the fake gdb fixture, one per scenario named
//! in the module's testable-properties list (spawn/query, tokenized
//! send/recv, newline rejection, error rendering, stuck-debugger shutdown,
//! dynamic binding collisions).

use std::time::{Duration, Instant};

use gdbctl::{ControllerConfig, RecvTimeout, SyncController};

fn fixture_path() -> String {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fake_gdb.sh").to_string()
}

fn spawned() -> SyncController {
    let mut ctrl = SyncController::new(&ControllerConfig::default()).unwrap();
    ctrl.spawn(Some(&fixture_path()), None, &[], true).unwrap();
    ctrl
}

#[test]
fn s1_spawn_and_basic_query() {
    let mut ctrl = spawned();

    let batch = ctrl
        .execute("-gdb-version", RecvTimeout::Inherit, false, true)
        .unwrap()
        .unwrap();

    assert!(batch.iter().any(|r| r.is_stream(&[gdbctl::StreamChannel::Console])));
    assert!(matches!(
        batch.last(),
        Some(r) if r.is_result(Some(gdbctl::ResultClass::Done))
    ));

    ctrl.shutdown();
}

#[test]
fn s2_tokenized_send_recv() {
    let mut ctrl = spawned();

    let token = ctrl.send("-list-features", None).unwrap();
    assert_eq!(token, "87362");

    let batch = ctrl.recv_all(RecvTimeout::Inherit, false).unwrap();
    let result = batch
        .iter()
        .find(|r| r.is_result(None))
        .expect("a result record arrived");
    assert_eq!(result.token(), Some("87362"));

    ctrl.shutdown();
}

#[test]
fn s3_newline_rejection() {
    let mut ctrl = spawned();

    let err = ctrl.send("-exec-run\n", None).unwrap_err();
    assert_eq!(err.error_code(), "invalid_command");

    ctrl.shutdown();
}

#[test]
fn s5_shutdown_of_a_stuck_debugger() {
    std::env::set_var("FAKE_GDB_STUCK", "1");
    let mut ctrl = spawned();

    let start = Instant::now();
    ctrl.shutdown();
    let elapsed = start.elapsed();

    assert!(!ctrl.is_spawned());
    assert!(elapsed < Duration::from_secs(7), "shutdown took {elapsed:?}");

    std::env::remove_var("FAKE_GDB_STUCK");
}

#[test]
fn s6_dynamic_binding_collision_is_callable() {
    let mut ctrl = spawned();
    ctrl.bind_commands().unwrap();

    let direct = ctrl
        .execute("send hello", RecvTimeout::Inherit, false, true)
        .unwrap()
        .unwrap();
    let via_bound = ctrl.call("zsend", &["hello".to_string()]).unwrap();

    assert_eq!(direct.len(), via_bound.len());
    assert!(via_bound
        .iter()
        .any(|r| r.is_result(Some(gdbctl::ResultClass::Done))));

    ctrl.shutdown();
}
