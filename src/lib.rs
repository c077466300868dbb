// ABOUTME: Main library entry point for Tatami Insights athlete performance analysis
// ABOUTME: Wires data access, analysis, rule evaluation, and the human-approved recommendation workflow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

#![deny(unsafe_code)]

//! # Tatami Insights
//!
//! Analyses an athlete's recorded exercise performance, turns the findings
//! into training recommendations, and routes every recommendation through a
//! human review workflow before it changes the athlete's plan.
//!
//! ## Architecture
//!
//! - **`tatami-core`**: errors, identifiers, and domain models
//! - **`tatami-intelligence`**: pure trend, anomaly, problem, pattern, and rule logic
//! - **Database**: `SQLite` persistence and the read trait used by analysis
//! - **Intelligence**: the async analysis engine over stored data
//! - **Workflow**: PENDING -> `IN_REVIEW` -> FULFILLED | REJECTED | AMENDED
//! - **Services**: the facade used by the CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tatami_insights::config::environment::ServerConfig;
//! use tatami_insights::database::Database;
//! use tatami_insights::services::InsightsService;
//! use tatami_core::models::AthleteId;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let db = Database::new(&config.database_url.to_connection_string()).await?;
//!     let service = InsightsService::from_server_config(db, &config);
//!
//!     let outcome = service
//!         .generate_recommendations(AthleteId::new(1), config.analysis_window_days, None)
//!         .await?;
//!     println!("{} recommendations awaiting review", outcome.created.len());
//!     Ok(())
//! }
//! ```

/// Environment configuration and analysis thresholds
pub mod config;

/// `SQLite` persistence, transactions, and the analysis data provider
pub mod database;

/// Unified error handling re-exported from `tatami-core`
pub mod errors;

/// Async analysis engine and substitute selection
pub mod intelligence;

/// Structured logging setup
pub mod logging;

/// Plan approval notification dispatch
pub mod notifications;

/// Service facade over analysis and review
pub mod services;

/// Recommendation review state machine
pub mod workflow;
