//! Transaction log sequencing specs
//!
//! Verify that records are numbered 1, 2, 3, ... in submission order and
//! that numbering continues across restarts.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn example_session_writes_three_numbered_records() {
    let log = LogDir::new();

    let daemon = log.start().await;
    let app = daemon.state.app_state();
    put(&app, "a", "1").await;
    put(&app, "b", "2").await;
    delete(&app, "a").await;
    daemon.state.shutdown().await.unwrap();

    assert_eq!(log.contents().as_str(), "1\t2\ta\t1\n2\t2\tb\t2\n3\t1\ta\t\n");
}

#[tokio::test]
async fn numbering_continues_after_restart() {
    let log = LogDir::new();
    log.write("1\t2\tx\t1\n2\t2\ty\t2\n3\t1\tx\t\n");

    let daemon = log.start().await;
    assert_eq!(daemon.state.replay.last_sequence, 3);
    let app = daemon.state.app_state();
    for i in 0..5 {
        put(&app, &format!("n{i}"), "v").await;
    }
    daemon.state.shutdown().await.unwrap();

    let sequences: Vec<u64> = log
        .lines()
        .iter()
        .map(|line| line.split('\t').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(sequences, (1..=8).collect::<Vec<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_drains_concurrent_writes() {
    let log = LogDir::new();
    let daemon = log.start().await;
    let app = daemon.state.app_state();

    let mut clients = Vec::new();
    for client in 0..10 {
        let app = app.clone();
        clients.push(tokio::spawn(async move {
            for i in 0..100 {
                put(&app, &format!("c{client}-{i}"), &i.to_string()).await;
            }
        }));
    }
    for client in clients {
        client.await.unwrap();
    }
    drop(app);
    let report = daemon.state.shutdown().await.unwrap();

    assert_eq!(report.last_sequence, 1000);
    let lines = log.lines();
    assert_eq!(lines.len(), 1000);
    for (i, line) in lines.iter().enumerate() {
        assert!(
            line.starts_with(&format!("{}\t2\t", i + 1)),
            "line {} is {line:?}",
            i + 1
        );
    }

    let daemon = log.start().await;
    assert_eq!(daemon.state.store.len(), 1000);
    daemon.state.shutdown().await.unwrap();
}
