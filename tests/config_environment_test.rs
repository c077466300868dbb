// ABOUTME: Tests for environment-driven service configuration and analysis threshold overrides
// ABOUTME: Validates defaults, range checks, database URL parsing, and file-backed persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tatami_core::constants::windows::DEFAULT_ANALYSIS_WINDOW_DAYS;
use tatami_insights::config::environment::{
    DatabaseUrl, Environment, ServerConfig, DEFAULT_TRANSACTION_MAX_RETRIES,
};
use tatami_insights::config::{ConfigError, IntelligenceConfig};
use tatami_insights::database::Database;

const SERVER_VARS: [&str; 4] = [
    "ENVIRONMENT",
    "DATABASE_URL",
    "ANALYSIS_WINDOW_DAYS",
    "TRANSACTION_MAX_RETRIES",
];

fn clear_server_vars() {
    for key in SERVER_VARS {
        env::remove_var(key);
    }
}

#[test]
fn test_environment_parsing() {
    assert_eq!(Environment::from_str_or_default("prod"), Environment::Production);
    assert_eq!(Environment::from_str_or_default("TEST"), Environment::Testing);
    assert_eq!(Environment::from_str_or_default("staging"), Environment::Development);
    assert!(Environment::Production.is_production());
    assert_eq!(Environment::Testing.to_string(), "testing");
}

#[test]
fn test_database_url_parsing() {
    let memory = DatabaseUrl::parse_url("sqlite::memory:");
    assert!(memory.is_memory());
    assert_eq!(memory.to_connection_string(), "sqlite::memory:");

    let file = DatabaseUrl::parse_url("sqlite:./data/tatami.db");
    assert_eq!(
        file,
        DatabaseUrl::SQLite {
            path: PathBuf::from("./data/tatami.db")
        }
    );
    assert_eq!(file.to_connection_string(), "sqlite:./data/tatami.db");

    // Bare paths are accepted too
    let bare = DatabaseUrl::parse_url("/var/lib/tatami.db");
    assert_eq!(bare.to_connection_string(), "sqlite:/var/lib/tatami.db");
}

#[test]
#[serial]
fn test_server_config_defaults() {
    clear_server_vars();

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.environment, Environment::Development);
    assert!(!config.database_url.is_memory());
    assert_eq!(config.analysis_window_days, DEFAULT_ANALYSIS_WINDOW_DAYS);
    assert_eq!(config.transaction_max_retries, DEFAULT_TRANSACTION_MAX_RETRIES);
}

#[test]
#[serial]
fn test_server_config_overrides() {
    clear_server_vars();
    env::set_var("ENVIRONMENT", "production");
    env::set_var("DATABASE_URL", "sqlite::memory:");
    env::set_var("ANALYSIS_WINDOW_DAYS", "14");
    env::set_var("TRANSACTION_MAX_RETRIES", "5");

    let config = ServerConfig::from_env().unwrap();
    assert!(config.environment.is_production());
    assert!(config.database_url.is_memory());
    assert_eq!(config.analysis_window_days, 14);
    assert_eq!(config.transaction_max_retries, 5);

    let summary = config.summary();
    assert!(summary.contains("SQLite (in-memory)"));
    assert!(summary.contains("14 days"));

    clear_server_vars();
}

#[test]
#[serial]
fn test_server_config_rejects_out_of_range_values() {
    clear_server_vars();

    for days in ["0", "400"] {
        env::set_var("ANALYSIS_WINDOW_DAYS", days);
        assert!(ServerConfig::from_env().is_err(), "window {days} accepted");
    }
    env::set_var("ANALYSIS_WINDOW_DAYS", "thirty");
    assert!(ServerConfig::from_env().is_err());
    env::remove_var("ANALYSIS_WINDOW_DAYS");

    env::set_var("TRANSACTION_MAX_RETRIES", "0");
    assert!(ServerConfig::from_env().is_err());

    clear_server_vars();
}

#[test]
#[serial]
fn test_intelligence_overrides_from_environment() {
    env::set_var("TATAMI_MIN_RECORDS", "5");
    env::set_var("TATAMI_ANOMALY_BASELINE_DAYS", "60");

    let config = IntelligenceConfig::load().unwrap();
    assert_eq!(config.windows.min_records, 5);
    assert_eq!(config.windows.anomaly_baseline_days, 60);

    env::remove_var("TATAMI_MIN_RECORDS");
    env::remove_var("TATAMI_ANOMALY_BASELINE_DAYS");
}

#[test]
#[serial]
fn test_intelligence_overrides_are_validated() {
    env::set_var("TATAMI_SUBSTITUTE_LIMIT", "many");
    assert!(matches!(
        IntelligenceConfig::load(),
        Err(ConfigError::Parse(_))
    ));
    env::remove_var("TATAMI_SUBSTITUTE_LIMIT");

    // Alert threshold above the critical one
    env::set_var("TATAMI_ANOMALY_ALERT_Z", "4.0");
    assert!(matches!(
        IntelligenceConfig::load(),
        Err(ConfigError::InvalidRange(_))
    ));

    let server = ServerConfig::default();
    assert!(server.init_all_configs().is_err());
    env::remove_var("TATAMI_ANOMALY_ALERT_Z");

    assert!(server.init_all_configs().is_ok());
}

#[tokio::test]
#[serial]
async fn test_file_database_survives_reconnect() -> anyhow::Result<()> {
    common::init_test_logging();
    let temp_dir = tempfile::tempdir()?;
    let url = DatabaseUrl::SQLite {
        path: temp_dir.path().join("tatami.db"),
    };

    let first = Database::new(&url.to_connection_string()).await?;
    let athlete = common::seed_athlete(&first, 7, "Noa").await?;
    drop(first);

    // Migrations are idempotent on an existing file
    let second = Database::new(&url.to_connection_string()).await?;
    let reloaded = second.get_athlete(athlete.id).await?.unwrap();
    assert_eq!(reloaded.display_name, "Noa");
    Ok(())
}
