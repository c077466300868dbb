// ABOUTME: Database operations for athletes, their injuries, and fitness tests
// ABOUTME: Supplies identity for notifications and injury/score inputs for substitute selection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::{format_timestamp, parse_timestamp, Database};
use crate::errors::{AppError, AppResult};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tatami_core::constants::ratings::{MAX_RATING, MIN_RATING};
use tatami_core::models::{Athlete, AthleteId, FitnessTestSummary, Injury, UserId};

/// Fields needed to register an athlete
#[derive(Debug, Clone)]
pub struct NewAthlete {
    /// Login account of the athlete
    pub user_id: UserId,
    /// Display name
    pub display_name: String,
    /// Assigned trainer, if any
    pub trainer_user_id: Option<UserId>,
}

/// Fields needed to report an injury
#[derive(Debug, Clone)]
pub struct NewInjury {
    /// Affected body zone
    pub zone: String,
    /// Injury type
    pub injury_type: String,
}

impl Database {
    pub(super) async fn migrate_athletes(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS athletes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                display_name TEXT NOT NULL,
                trainer_user_id INTEGER,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS injuries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                zone TEXT NOT NULL,
                injury_type TEXT NOT NULL,
                resolved INTEGER NOT NULL DEFAULT 0,
                reported_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS fitness_tests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                score REAL NOT NULL CHECK (score >= 0 AND score <= 10),
                tested_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_injuries_athlete ON injuries(athlete_id, resolved)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_fitness_tests_athlete ON fitness_tests(athlete_id, tested_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Register an athlete
    ///
    /// # Errors
    ///
    /// Returns an error if the display name is blank or the insert fails
    pub async fn create_athlete(&self, athlete: &NewAthlete) -> AppResult<Athlete> {
        let display_name = athlete.display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::invalid_input("Athlete display name must not be empty"));
        }

        let result = sqlx::query(
            r"
            INSERT INTO athletes (user_id, display_name, trainer_user_id, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(athlete.user_id.as_i64())
        .bind(display_name)
        .bind(athlete.trainer_user_id.map(UserId::as_i64))
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create athlete: {e}")))?;

        Ok(Athlete {
            id: AthleteId::new(result.last_insert_rowid()),
            user_id: athlete.user_id,
            display_name: display_name.to_owned(),
            trainer_user_id: athlete.trainer_user_id,
        })
    }

    /// Look up an athlete by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_athlete(&self, athlete_id: AthleteId) -> AppResult<Option<Athlete>> {
        let row = sqlx::query(
            "SELECT id, user_id, display_name, trainer_user_id FROM athletes WHERE id = $1",
        )
        .bind(athlete_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get athlete: {e}")))?;

        Ok(row.as_ref().map(row_to_athlete))
    }

    /// Report a new injury; returns its storage key
    ///
    /// # Errors
    ///
    /// Returns an error if the zone is blank or the insert fails
    pub async fn create_injury(&self, athlete_id: AthleteId, injury: &NewInjury) -> AppResult<i64> {
        if injury.zone.trim().is_empty() {
            return Err(AppError::invalid_input("Injury zone must not be empty"));
        }

        let result = sqlx::query(
            r"
            INSERT INTO injuries (athlete_id, zone, injury_type, resolved, reported_at)
            VALUES ($1, $2, $3, 0, $4)
            ",
        )
        .bind(athlete_id.as_i64())
        .bind(injury.zone.trim())
        .bind(injury.injury_type.trim())
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create injury: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Mark an injury as recovered; `false` when no such injury exists
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn resolve_injury(&self, injury_id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE injuries SET resolved = 1 WHERE id = $1")
            .bind(injury_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to resolve injury: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Injuries the athlete has not recovered from
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_active_injuries(&self, athlete_id: AthleteId) -> AppResult<Vec<Injury>> {
        let rows = sqlx::query(
            r"
            SELECT zone, injury_type FROM injuries
            WHERE athlete_id = $1 AND resolved = 0
            ORDER BY reported_at DESC, id DESC
            ",
        )
        .bind(athlete_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get active injuries: {e}")))?;

        Ok(rows
            .iter()
            .map(|row| Injury {
                zone: row.get("zone"),
                injury_type: row.get("injury_type"),
            })
            .collect())
    }

    /// Store a fitness test result on the 0-10 scale
    ///
    /// # Errors
    ///
    /// Returns an error if the score is out of range or the insert fails
    pub async fn record_fitness_test(
        &self,
        athlete_id: AthleteId,
        score: f64,
        tested_at: DateTime<Utc>,
    ) -> AppResult<i64> {
        if !(MIN_RATING..=MAX_RATING).contains(&score) {
            return Err(AppError::invalid_input(format!(
                "Fitness test score {score} is outside {MIN_RATING}-{MAX_RATING}"
            )));
        }

        let result = sqlx::query(
            "INSERT INTO fitness_tests (athlete_id, score, tested_at) VALUES ($1, $2, $3)",
        )
        .bind(athlete_id.as_i64())
        .bind(score)
        .bind(format_timestamp(tested_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record fitness test: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent fitness test, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored timestamp is malformed
    pub async fn get_latest_fitness_test(
        &self,
        athlete_id: AthleteId,
    ) -> AppResult<Option<FitnessTestSummary>> {
        let row = sqlx::query(
            r"
            SELECT score, tested_at FROM fitness_tests
            WHERE athlete_id = $1
            ORDER BY tested_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(athlete_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get fitness test: {e}")))?;

        row.map(|row| {
            let tested_at: String = row.get("tested_at");
            Ok(FitnessTestSummary {
                score: row.get("score"),
                tested_at: parse_timestamp(&tested_at)?,
            })
        })
        .transpose()
    }
}

fn row_to_athlete(row: &SqliteRow) -> Athlete {
    let trainer: Option<i64> = row.get("trainer_user_id");
    Athlete {
        id: AthleteId::new(row.get("id")),
        user_id: UserId::new(row.get("user_id")),
        display_name: row.get("display_name"),
        trainer_user_id: trainer.map(UserId::new),
    }
}
