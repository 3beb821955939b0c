//! Shared helpers for the behavioral specs

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::Request;
use std::net::SocketAddr;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

pub use axum::http::{Method, StatusCode};
pub use kv_daemon::{router, startup, AppState, BackendConfig, Config, Daemon, LifecycleError};

/// A scratch directory holding one transaction log
pub struct LogDir {
    dir: TempDir,
}

impl LogDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("transaction.log")
    }

    /// Daemon config over this log, listening on an ephemeral port
    pub fn config(&self) -> Config {
        Config {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            backend: BackendConfig::File(kv_daemon::config::FileConfig {
                path: self.path(),
                fsync: true,
            }),
            ..Config::default()
        }
    }

    pub fn contents(&self) -> String {
        std::fs::read_to_string(self.path()).unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn write(&self, contents: &str) {
        std::fs::write(self.path(), contents).unwrap();
    }

    pub async fn start(&self) -> Daemon {
        startup(&self.config()).await.unwrap()
    }

    pub async fn start_err(&self) -> LifecycleError {
        match startup(&self.config()).await {
            Ok(_) => panic!("daemon started over {}", self.path().display()),
            Err(e) => e,
        }
    }
}

/// Send one request through the router
pub async fn send(app: &AppState, method: Method, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router(app.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn put(app: &AppState, key: &str, value: &str) {
    let (status, body) = send(app, Method::PUT, &format!("/v1/{key}"), value).await;
    assert_eq!(status, StatusCode::CREATED, "PUT {key}: {body}");
}

pub async fn delete(app: &AppState, key: &str) {
    let (status, body) = send(app, Method::DELETE, &format!("/v1/{key}"), "").await;
    assert_eq!(status, StatusCode::OK, "DELETE {key}: {body}");
}

pub async fn get(app: &AppState, key: &str) -> Option<String> {
    match send(app, Method::GET, &format!("/v1/{key}"), "").await {
        (StatusCode::OK, body) => Some(body),
        (StatusCode::NOT_FOUND, _) => None,
        (status, body) => panic!("GET {key}: unexpected {status}: {body}"),
    }
}
