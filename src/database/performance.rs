// ABOUTME: Database operations for per-exercise performance records
// ABOUTME: Window queries join session dates and exercise metadata for the analysis engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::{format_date, format_timestamp, parse_date, parse_timestamp, Database};
use crate::errors::{AppError, AppResult};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tatami_core::constants::ratings::{MAX_RATING, MIN_RATING};
use tatami_core::models::{
    AthleteId, ExerciseCategory, ExerciseId, PerformanceRecord, SessionId,
};

/// One exercise outcome to store
#[derive(Debug, Clone)]
pub struct NewPerformance {
    /// Session the exercise was assigned in
    pub session_id: SessionId,
    /// Exercise performed
    pub exercise_id: ExerciseId,
    /// Trainer rating 0-10, if rated
    pub rating: Option<f64>,
    /// Whether the athlete completed the exercise
    pub completed: bool,
    /// When the record was entered
    pub recorded_at: DateTime<Utc>,
}

impl Database {
    pub(super) async fn migrate_performance(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exercise_performances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES training_sessions(id) ON DELETE CASCADE,
                exercise_id INTEGER NOT NULL REFERENCES exercises(id),
                rating REAL CHECK (rating IS NULL OR (rating >= 0 AND rating <= 10)),
                completed INTEGER NOT NULL DEFAULT 1,
                recorded_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_performances_session ON exercise_performances(session_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_performances_exercise ON exercise_performances(exercise_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store an exercise outcome
    ///
    /// # Errors
    ///
    /// Returns an error if the rating is outside 0-10 or the insert fails
    pub async fn record_performance(&self, performance: &NewPerformance) -> AppResult<i64> {
        if let Some(rating) = performance.rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(AppError::invalid_input(format!(
                    "Rating {rating} is outside {MIN_RATING}-{MAX_RATING}"
                )));
            }
        }

        let result = sqlx::query(
            r"
            INSERT INTO exercise_performances (session_id, exercise_id, rating, completed, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(performance.session_id.as_i64())
        .bind(performance.exercise_id.as_i64())
        .bind(performance.rating)
        .bind(performance.completed)
        .bind(format_timestamp(performance.recorded_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record performance: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Records whose session date falls in `[start, end]`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is malformed
    pub async fn list_performance_records(
        &self,
        athlete_id: AthleteId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<PerformanceRecord>> {
        let rows = sqlx::query(
            r"
            SELECT p.exercise_id, e.name AS exercise_name, e.category, e.difficulty,
                   p.session_id, s.session_date, p.rating, p.completed, p.recorded_at
            FROM exercise_performances p
            JOIN training_sessions s ON s.id = p.session_id
            JOIN exercises e ON e.id = p.exercise_id
            WHERE s.athlete_id = $1 AND s.session_date >= $2 AND s.session_date <= $3
            ORDER BY s.session_date ASC, p.id ASC
            ",
        )
        .bind(athlete_id.as_i64())
        .bind(format_date(start))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list performance records: {e}")))?;

        rows.iter().map(row_to_record).collect()
    }

    /// Rated values of one category with session date in `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_category_ratings(
        &self,
        athlete_id: AthleteId,
        category: ExerciseCategory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<f64>> {
        sqlx::query_scalar(
            r"
            SELECT p.rating
            FROM exercise_performances p
            JOIN training_sessions s ON s.id = p.session_id
            JOIN exercises e ON e.id = p.exercise_id
            WHERE s.athlete_id = $1 AND e.category = $2 AND p.rating IS NOT NULL
              AND s.session_date >= $3 AND s.session_date <= $4
            ORDER BY s.session_date ASC, p.id ASC
            ",
        )
        .bind(athlete_id.as_i64())
        .bind(category.as_str())
        .bind(format_date(start))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list category ratings: {e}")))
    }
}

fn row_to_record(row: &SqliteRow) -> AppResult<PerformanceRecord> {
    let category_str: String = row.get("category");
    let difficulty: i64 = row.get("difficulty");
    let session_date: String = row.get("session_date");
    let recorded_at: String = row.get("recorded_at");

    Ok(PerformanceRecord {
        exercise_id: ExerciseId::new(row.get("exercise_id")),
        exercise_name: row.get("exercise_name"),
        category: ExerciseCategory::parse(&category_str).ok_or_else(|| {
            AppError::database(format!("Unknown exercise category '{category_str}'"))
        })?,
        difficulty: u8::try_from(difficulty)
            .map_err(|_| AppError::database(format!("Invalid difficulty {difficulty}")))?,
        session_id: SessionId::new(row.get("session_id")),
        session_date: parse_date(&session_date)?,
        rating: row.get("rating"),
        completed: row.get("completed"),
        recorded_at: parse_timestamp(&recorded_at)?,
    })
}
