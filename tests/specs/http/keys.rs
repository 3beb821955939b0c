//! HTTP key specs
//!
//! Verify the key-value endpoints and their status codes.

use crate::prelude::*;
use similar_asserts::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn read_your_write() {
    let log = LogDir::new();
    let daemon = log.start().await;
    let app = daemon.state.app_state();

    put(&app, "colour", "blue").await;
    assert_eq!(get(&app, "colour").await, Some("blue".to_string()));

    put(&app, "colour", "green").await;
    assert_eq!(get(&app, "colour").await, Some("green".to_string()));

    daemon.state.shutdown().await.unwrap();
}

#[tokio::test]
async fn delete_of_absent_key_succeeds() {
    let log = LogDir::new();
    let daemon = log.start().await;
    let app = daemon.state.app_state();

    delete(&app, "never-written").await;
    delete(&app, "never-written").await;

    assert_eq!(get(&app, "never-written").await, None);
    daemon.state.shutdown().await.unwrap();
}

#[tokio::test]
async fn key_with_tab_is_rejected_and_not_logged() {
    let log = LogDir::new();
    let daemon = log.start().await;
    let app = daemon.state.app_state();

    let (status, _) = send(&app, Method::PUT, "/v1/bad%09key", "v").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    daemon.state.shutdown().await.unwrap();
    assert_eq!(log.contents().as_str(), "");
}

#[tokio::test]
async fn serves_over_tcp() {
    let log = LogDir::new();
    let daemon = log.start().await;
    let addr = daemon.local_addr().unwrap();
    let shutdown = daemon.state.shutdown_handle();
    let server = tokio::spawn(daemon.serve());

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: kvd\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got {response}");
    assert!(response.ends_with("Hello World!"), "got {response}");

    shutdown.request();
    let report = server.await.unwrap().unwrap();
    assert_eq!(report.last_sequence, 0);
}
