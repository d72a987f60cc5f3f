// ABOUTME: Tests for loading server configuration from process environment variables
// ABOUTME: Serialized because every test mutates the shared process environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;
use std::path::PathBuf;

use pierre_training_analytics::config::{DatabaseUrl, ServerConfig};
use serial_test::serial;

const KEYS: &[&str] = &[
    "DATABASE_URL",
    "HTTP_PORT",
    "AGGREGATION_WORKERS",
    "AGGREGATION_MAX_ATTEMPTS",
    "AGGREGATION_RETRY_BASE_MS",
    "REQUEST_TIMEOUT_SECS",
    "ADHERENCE_TARGET_SESSIONS",
    "BACKFILL_BATCH_SIZE",
    "CATALOG_PATH",
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_unset_environment_uses_defaults() {
    clear_env();

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config, ServerConfig::default());
    assert!(config.catalog_path.is_none());
}

#[test]
#[serial]
fn test_environment_overrides_every_section() {
    clear_env();
    env::set_var("DATABASE_URL", "sqlite:./data/test_analytics.db");
    env::set_var("HTTP_PORT", "8181");
    env::set_var("AGGREGATION_WORKERS", "2");
    env::set_var("AGGREGATION_MAX_ATTEMPTS", "7");
    env::set_var("AGGREGATION_RETRY_BASE_MS", "50");
    env::set_var("REQUEST_TIMEOUT_SECS", "9");
    env::set_var("ADHERENCE_TARGET_SESSIONS", "4");
    env::set_var("BACKFILL_BATCH_SIZE", "25");
    env::set_var("CATALOG_PATH", "/srv/catalog.json");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(
        config.database_url,
        DatabaseUrl::SQLite {
            path: PathBuf::from("./data/test_analytics.db")
        }
    );
    assert_eq!(config.http_port, 8181);
    assert_eq!(config.aggregation.workers, 2);
    assert_eq!(config.aggregation.max_attempts, 7);
    assert_eq!(config.aggregation.retry_base_ms, 50);
    assert_eq!(config.query.request_timeout_secs, 9);
    assert_eq!(config.query.adherence_target_sessions, 4);
    assert_eq!(config.backfill_batch_size, 25);
    assert_eq!(config.catalog_path, Some(PathBuf::from("/srv/catalog.json")));
    assert!(config.summary().contains("8181"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_environment_values_fail_loading() {
    clear_env();

    env::set_var("BACKFILL_BATCH_SIZE", "0");
    assert!(ServerConfig::from_env().is_err());
    env::remove_var("BACKFILL_BATCH_SIZE");

    env::set_var("REQUEST_TIMEOUT_SECS", "soon");
    assert!(ServerConfig::from_env().is_err());

    clear_env();
}

#[test]
#[serial]
fn test_blank_catalog_path_is_ignored() {
    clear_env();
    env::set_var("CATALOG_PATH", "   ");

    let config = ServerConfig::from_env().unwrap();
    assert!(config.catalog_path.is_none());

    clear_env();
}
