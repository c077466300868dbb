// ABOUTME: SQLite storage for athletes, exercises, sessions, performances, and recommendations
// ABOUTME: Owns the connection pool, runs migrations, and hands out transaction guards
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! # Database Management
//!
//! Repository methods are split by table group into `impl Database` blocks in
//! the submodules. Reads used by the analysis engine are exposed through the
//! [`provider::AnalysisDataProvider`] trait so the engine can run against other
//! stores in tests.

mod athletes;
mod exercises;
mod performance;
/// Read-side trait consumed by the analysis engine
pub mod provider;
mod recommendations;
mod sessions;
/// Transaction guard and retry helpers
pub mod transactions;

pub use athletes::{NewAthlete, NewInjury};
pub use exercises::NewExercise;
pub use performance::NewPerformance;
pub use provider::AnalysisDataProvider;
pub use recommendations::{NewHistoryEntry, NewRecommendation};
pub use sessions::NewSession;
pub use transactions::{retry_transaction, SqliteTransactionGuard, TransactionGuard};

use crate::errors::{AppError, AppResult};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

/// Storage date format for session dates
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database manager for analysis inputs and the recommendation workflow
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// In-memory databases use a single connection, otherwise every pooled
    /// connection would see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect(database_url)
                .await?
        } else {
            // Ensure SQLite creates the database file if it doesn't exist
            let connection_options = if database_url.starts_with("sqlite:") {
                format!("{database_url}?mode=rwc")
            } else {
                database_url.to_owned()
            };
            SqlitePool::connect(&connection_options).await?
        };

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any table or index cannot be created
    pub async fn migrate(&self) -> Result<()> {
        // Athletes, injuries, fitness tests
        self.migrate_athletes().await?;
        // Exercise catalog
        self.migrate_exercises().await?;
        // Cycles and sessions
        self.migrate_sessions().await?;
        // Exercise performances
        self.migrate_performance().await?;
        // Recommendations and audit history
        self.migrate_recommendations().await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Begin a transaction wrapped in a rollback-on-drop guard
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be acquired
    pub async fn begin(&self) -> AppResult<SqliteTransactionGuard<'static>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        Ok(TransactionGuard::new(tx))
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid stored timestamp '{value}': {e}")))
}

fn parse_optional_timestamp(value: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| AppError::database(format!("Invalid stored date '{value}': {e}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
