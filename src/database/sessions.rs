// ABOUTME: Database operations for training cycles and sessions
// ABOUTME: Includes in-transaction helpers used by the approval workflow to approve, adjust, or delete sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::{format_date, format_timestamp, parse_date, Database};
use crate::errors::{AppError, AppResult};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tatami_core::models::{
    AthleteId, CycleId, SessionAdjustments, SessionId, SessionStatus, TrainingSession,
};

/// Fields needed to plan a session
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// Athlete the session belongs to
    pub athlete_id: AthleteId,
    /// Training cycle, if any
    pub cycle_id: Option<CycleId>,
    /// Calendar date
    pub session_date: NaiveDate,
    /// Initial status
    pub status: SessionStatus,
    /// Planned duration in minutes
    pub duration_minutes: Option<u32>,
    /// Planned volume
    pub volume: Option<f64>,
    /// Planned intensity
    pub intensity: Option<f64>,
    /// Warm-up content
    pub warmup: Option<String>,
    /// Main block content
    pub main_block: Option<String>,
    /// Cool-down content
    pub cooldown: Option<String>,
    /// Trainer notes
    pub notes: Option<String>,
}

impl Database {
    pub(super) async fn migrate_sessions(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS training_cycles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                code TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS training_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                cycle_id INTEGER REFERENCES training_cycles(id) ON DELETE SET NULL,
                session_date TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'approved')),
                duration_minutes INTEGER,
                volume REAL,
                intensity REAL,
                warmup TEXT,
                main_block TEXT,
                cooldown TEXT,
                notes TEXT,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_athlete_date ON training_sessions(athlete_id, session_date)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Open a training cycle with a human-readable code
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_cycle(&self, athlete_id: AthleteId, code: &str) -> AppResult<CycleId> {
        let result = sqlx::query(
            "INSERT INTO training_cycles (athlete_id, code, created_at) VALUES ($1, $2, $3)",
        )
        .bind(athlete_id.as_i64())
        .bind(code)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create cycle: {e}")))?;

        Ok(CycleId::new(result.last_insert_rowid()))
    }

    /// Code of a training cycle, if it exists
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_cycle_code(&self, cycle_id: CycleId) -> AppResult<Option<String>> {
        sqlx::query_scalar("SELECT code FROM training_cycles WHERE id = $1")
            .bind(cycle_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get cycle: {e}")))
    }

    /// Plan a session
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_session(&self, session: &NewSession) -> AppResult<TrainingSession> {
        let result = sqlx::query(
            r"
            INSERT INTO training_sessions (
                athlete_id, cycle_id, session_date, status, duration_minutes, volume,
                intensity, warmup, main_block, cooldown, notes, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(session.athlete_id.as_i64())
        .bind(session.cycle_id.map(CycleId::as_i64))
        .bind(format_date(session.session_date))
        .bind(session.status.as_str())
        .bind(session.duration_minutes.map(i64::from))
        .bind(session.volume)
        .bind(session.intensity)
        .bind(session.warmup.as_deref())
        .bind(session.main_block.as_deref())
        .bind(session.cooldown.as_deref())
        .bind(session.notes.as_deref())
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create session: {e}")))?;

        Ok(TrainingSession {
            id: SessionId::new(result.last_insert_rowid()),
            athlete_id: session.athlete_id,
            cycle_id: session.cycle_id,
            session_date: session.session_date,
            status: session.status,
            duration_minutes: session.duration_minutes,
            volume: session.volume,
            intensity: session.intensity,
            warmup: session.warmup.clone(),
            main_block: session.main_block.clone(),
            cooldown: session.cooldown.clone(),
            notes: session.notes.clone(),
        })
    }

    /// Look up a session by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored row is malformed
    pub async fn get_session(&self, session_id: SessionId) -> AppResult<Option<TrainingSession>> {
        let row = sqlx::query(
            r"
            SELECT id, athlete_id, cycle_id, session_date, status, duration_minutes, volume,
                   intensity, warmup, main_block, cooldown, notes
            FROM training_sessions WHERE id = $1
            ",
        )
        .bind(session_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get session: {e}")))?;

        row.as_ref().map(row_to_session).transpose()
    }

    /// Mark a session approved inside a transaction; `false` when it does not exist
    pub(crate) async fn approve_session_in(
        conn: &mut SqliteConnection,
        session_id: SessionId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE training_sessions SET status = 'approved', updated_at = $1 WHERE id = $2",
        )
        .bind(format_timestamp(Utc::now()))
        .bind(session_id.as_i64())
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to approve session: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply provided adjustments and approve, inside a transaction
    ///
    /// Fields left `None` keep their stored value.
    pub(crate) async fn adjust_session_in(
        conn: &mut SqliteConnection,
        session_id: SessionId,
        adjustments: &SessionAdjustments,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE training_sessions SET
                duration_minutes = COALESCE($1, duration_minutes),
                volume = COALESCE($2, volume),
                intensity = COALESCE($3, intensity),
                warmup = COALESCE($4, warmup),
                main_block = COALESCE($5, main_block),
                cooldown = COALESCE($6, cooldown),
                notes = COALESCE($7, notes),
                status = 'approved',
                updated_at = $8
            WHERE id = $9
            ",
        )
        .bind(adjustments.duration_minutes.map(i64::from))
        .bind(adjustments.volume)
        .bind(adjustments.intensity)
        .bind(adjustments.warmup.as_deref())
        .bind(adjustments.main_block.as_deref())
        .bind(adjustments.cooldown.as_deref())
        .bind(adjustments.notes.as_deref())
        .bind(format_timestamp(Utc::now()))
        .bind(session_id.as_i64())
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to adjust session: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a session inside a transaction; returns the number of rows removed
    pub(crate) async fn delete_session_in(
        conn: &mut SqliteConnection,
        session_id: SessionId,
    ) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM training_sessions WHERE id = $1")
            .bind(session_id.as_i64())
            .execute(conn)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete session: {e}")))?;

        Ok(result.rows_affected())
    }
}

fn row_to_session(row: &SqliteRow) -> AppResult<TrainingSession> {
    let session_date: String = row.get("session_date");
    let status: String = row.get("status");
    let cycle_id: Option<i64> = row.get("cycle_id");
    let duration: Option<i64> = row.get("duration_minutes");

    Ok(TrainingSession {
        id: SessionId::new(row.get("id")),
        athlete_id: AthleteId::new(row.get("athlete_id")),
        cycle_id: cycle_id.map(CycleId::new),
        session_date: parse_date(&session_date)?,
        status: SessionStatus::parse(&status),
        duration_minutes: duration
            .map(u32::try_from)
            .transpose()
            .map_err(|e| AppError::database(format!("Invalid session duration: {e}")))?,
        volume: row.get("volume"),
        intensity: row.get("intensity"),
        warmup: row.get("warmup"),
        main_block: row.get("main_block"),
        cooldown: row.get("cooldown"),
        notes: row.get("notes"),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::database::NewAthlete;
    use tatami_core::models::UserId;

    #[tokio::test]
    async fn test_adjustments_only_touch_provided_fields() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let athlete = db
            .create_athlete(&NewAthlete {
                user_id: UserId::new(1),
                display_name: "Yui".into(),
                trainer_user_id: None,
            })
            .await
            .unwrap();
        let session = db
            .create_session(&NewSession {
                athlete_id: athlete.id,
                session_date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
                duration_minutes: Some(90),
                intensity: Some(80.0),
                warmup: Some("Ukemi".into()),
                ..NewSession::default()
            })
            .await
            .unwrap();

        let mut guard = db.begin().await.unwrap();
        let adjusted = Database::adjust_session_in(
            guard.executor().unwrap(),
            session.id,
            &SessionAdjustments {
                intensity: Some(65.0),
                ..SessionAdjustments::default()
            },
        )
        .await
        .unwrap();
        guard.commit().await.unwrap();
        assert!(adjusted);

        let stored = db.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Approved);
        assert_eq!(stored.duration_minutes, Some(90));
        assert_eq!(stored.intensity, Some(65.0));
        assert_eq!(stored.warmup.as_deref(), Some("Ukemi"));
    }

    #[tokio::test]
    async fn test_deleting_missing_session_removes_nothing() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let mut guard = db.begin().await.unwrap();
        let removed = Database::delete_session_in(guard.executor().unwrap(), SessionId::new(77))
            .await
            .unwrap();
        guard.rollback().await.unwrap();
        assert_eq!(removed, 0);
    }
}
