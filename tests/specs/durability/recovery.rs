//! Startup recovery specs
//!
//! Verify that a restarted daemon serves exactly the state its log
//! describes, and refuses to start over a log it cannot trust.

use crate::prelude::*;
use similar_asserts::assert_eq;
use std::collections::BTreeMap;

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn restart_restores_example_session() {
    let log = LogDir::new();
    let daemon = log.start().await;
    let app = daemon.state.app_state();
    put(&app, "a", "1").await;
    put(&app, "b", "2").await;
    delete(&app, "a").await;
    daemon.state.shutdown().await.unwrap();

    let daemon = log.start().await;
    let app = daemon.state.app_state();

    assert_eq!(daemon.state.store.snapshot(), map(&[("b", "2")]));
    assert_eq!(get(&app, "a").await, None);
    assert_eq!(get(&app, "b").await, Some("2".to_string()));
    daemon.state.shutdown().await.unwrap();
}

#[tokio::test]
async fn restart_matches_state_before_shutdown() {
    let log = LogDir::new();
    let daemon = log.start().await;
    let app = daemon.state.app_state();
    let ops: [(&str, Option<&str>); 8] = [
        ("k1", Some("one")),
        ("k2", Some("two")),
        ("k1", Some("uno")),
        ("k3", Some("three")),
        ("k2", None),
        ("k4", None),
        ("k3", Some("tres")),
        ("k5", Some("with spaces and = signs")),
    ];
    for (key, value) in ops {
        match value {
            Some(value) => put(&app, key, value).await,
            None => delete(&app, key).await,
        }
    }
    let before = daemon.state.store.snapshot();
    daemon.state.shutdown().await.unwrap();

    let daemon = log.start().await;

    assert_eq!(daemon.state.store.snapshot(), before);
    assert_eq!(daemon.state.replay.events, 8);
    daemon.state.shutdown().await.unwrap();
}

#[tokio::test]
async fn out_of_order_log_refuses_to_start() {
    let log = LogDir::new();
    log.write("1\t2\ta\t1\n3\t2\tb\t2\n2\t2\tc\t3\n");

    let err = log.start_err().await;

    assert!(
        err.to_string().contains("out of sequence"),
        "unexpected error: {err}"
    );
    // Nothing was appended while failing
    assert_eq!(log.contents().as_str(), "1\t2\ta\t1\n3\t2\tb\t2\n2\t2\tc\t3\n");
}

#[tokio::test]
async fn torn_final_record_refuses_to_start() {
    let log = LogDir::new();
    log.write("1\t2\ta\t1\n2\t2\tb\tpart");

    let err = log.start_err().await;

    assert!(err.to_string().contains("torn write"), "unexpected error: {err}");
}

#[tokio::test]
async fn unknown_event_type_refuses_to_start() {
    let log = LogDir::new();
    log.write("1\t0\ta\t1\n");

    let err = log.start_err().await;

    assert!(
        err.to_string().contains("position 1"),
        "unexpected error: {err}"
    );
}
