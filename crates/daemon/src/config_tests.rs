// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use yare::parameterized;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn empty_file_uses_defaults() {
    let config = Config::from_toml("").unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
    assert_eq!(config.queue_capacity, 16);
    assert_eq!(config.on_append_error, AppendErrorPolicy::Shutdown);
    assert_eq!(
        config.backend,
        BackendConfig::File(FileConfig {
            path: PathBuf::from("transaction.log"),
            fsync: true,
        })
    );
}

#[test]
fn parses_file_backend() {
    let config = Config::from_toml(
        r#"
        bind = "0.0.0.0:9000"
        log_file = "/var/log/kvd.log"
        queue_capacity = 64
        on_append_error = "log"

        [backend]
        kind = "file"
        path = "/var/lib/kvd/transaction.log"
        fsync = false
        "#,
    )
    .unwrap();

    assert_eq!(config.bind.port(), 9000);
    assert_eq!(config.log_file, Some(PathBuf::from("/var/log/kvd.log")));
    assert_eq!(config.queue_capacity, 64);
    assert_eq!(config.on_append_error, AppendErrorPolicy::Log);
    assert_eq!(
        config.backend,
        BackendConfig::File(FileConfig {
            path: PathBuf::from("/var/lib/kvd/transaction.log"),
            fsync: false,
        })
    );
}

#[test]
fn postgres_backend_fills_missing_fields_with_defaults() {
    let config = Config::from_toml(
        r#"
        [backend]
        kind = "postgres"
        host = "db.internal"
        password = "secret"
        "#,
    )
    .unwrap();

    let BackendConfig::Postgres(pg) = &config.backend else {
        panic!("expected postgres backend, got {:?}", config.backend);
    };
    let params = PgParams::from(pg);
    assert_eq!(params.host, "db.internal");
    assert_eq!(params.password, "secret");
    assert_eq!(params.port, 5432);
    assert_eq!(params.table, "transactions");
}

#[parameterized(
    unknown_backend = { "[backend]\nkind = \"s3\"" },
    missing_kind = { "[backend]\npath = \"x.log\"" },
    unknown_policy = { "on_append_error = \"retry\"" },
    bad_bind = { "bind = \"localhost\"" },
    unknown_field = { "listen = \"127.0.0.1:1\"" },
)]
fn rejects_invalid_file(text: &str) {
    let err = Config::from_toml(text).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
}

#[test]
fn env_overrides_apply() {
    let mut config = Config::default();

    config
        .apply_env(env(&[
            (ENV_BIND, "127.0.0.1:9999"),
            (ENV_LOG_FILE, "kvd.log"),
            (ENV_WAL_PATH, "/tmp/wal.log"),
        ]))
        .unwrap();

    assert_eq!(config.bind.port(), 9999);
    assert_eq!(config.log_file, Some(PathBuf::from("kvd.log")));
    assert_eq!(
        config.backend,
        BackendConfig::File(FileConfig {
            path: PathBuf::from("/tmp/wal.log"),
            fsync: true,
        })
    );
}

#[test]
fn wal_path_override_leaves_postgres_backend_alone() {
    let mut config = Config {
        backend: BackendConfig::Postgres(PostgresConfig::default()),
        ..Config::default()
    };

    config.apply_env(env(&[(ENV_WAL_PATH, "/tmp/wal.log")])).unwrap();

    assert_eq!(
        config.backend,
        BackendConfig::Postgres(PostgresConfig::default())
    );
}

#[test]
fn invalid_bind_override_is_rejected() {
    let mut config = Config::default();

    let err = config.apply_env(env(&[(ENV_BIND, "nope")])).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidBind(ref s) if s == "nope"));
}

#[test]
fn zero_queue_capacity_is_invalid() {
    let config = Config::from_toml("queue_capacity = 0").unwrap();

    assert!(matches!(config.validate(), Err(ConfigError::InvalidCapacity)));
}

#[test]
fn load_without_path_uses_defaults() {
    assert_eq!(Config::load(None).unwrap(), Config::default());
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kvd.toml");
    std::fs::write(&path, "queue_capacity = 4\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.queue_capacity, 4);
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::load(Some(&path)).unwrap_err();

    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.toml"));
}
