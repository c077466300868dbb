// ABOUTME: Database operations for recommendations and their append-only audit history
// ABOUTME: State updates are conditional on the expected current state so concurrent reviewers cannot both win
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, Database};
use crate::errors::{AppError, AppResult};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tatami_core::models::{
    Amendments, AnalysisPayload, AthleteId, CycleId, FeedbackEntry, HistoryAction, HistoryEntry,
    PriorityCounts, Recommendation, RecommendationId, RecommendationPriority, RecommendationState,
    RecommendationType, SessionId, StateCounts, SuggestedChanges, UserId,
};

const RECOMMENDATION_COLUMNS: &str = r"
    id, athlete_id, cycle_id, recommendation_type, priority, title, message, suggested_action,
    analysis, suggested_changes, state, reviewer_id, reviewed_at, review_comment, applied_by,
    applied_at, amendments, generated_session_id, affected_session_ids, created_at, updated_at
";

/// Open recommendations sort most urgent first
const PRIORITY_RANK: &str = r"
    CASE priority WHEN 'CRITICAL' THEN 0 WHEN 'HIGH' THEN 1 WHEN 'MEDIUM' THEN 2 ELSE 3 END
";

/// A recommendation about to be persisted in state PENDING
#[derive(Debug, Clone)]
pub struct NewRecommendation {
    /// Athlete concerned
    pub athlete_id: AthleteId,
    /// Affected training cycle
    pub cycle_id: Option<CycleId>,
    /// Kind of advice
    pub recommendation_type: RecommendationType,
    /// Urgency
    pub priority: RecommendationPriority,
    /// Short title
    pub title: String,
    /// Explanation
    pub message: String,
    /// What the reviewer is asked to do
    pub suggested_action: String,
    /// Audit payload
    pub analysis: AnalysisPayload,
    /// Suggested plan changes
    pub suggested_changes: SuggestedChanges,
    /// Session generated for this recommendation
    pub generated_session_id: Option<SessionId>,
    /// Existing sessions affected
    pub affected_session_ids: Vec<SessionId>,
}

/// One audit row to append
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    /// Recommendation that changed state
    pub recommendation_id: RecommendationId,
    /// State before
    pub previous_state: RecommendationState,
    /// State after
    pub new_state: RecommendationState,
    /// Who acted
    pub actor_id: UserId,
    /// What was done
    pub action: HistoryAction,
    /// Free-text comment
    pub comment: Option<String>,
    /// Forensic data
    pub extra_data: Option<Map<String, Value>>,
}

impl Database {
    pub(super) async fn migrate_recommendations(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                athlete_id INTEGER NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
                cycle_id INTEGER,
                recommendation_type TEXT NOT NULL,
                priority TEXT NOT NULL CHECK (priority IN ('LOW', 'MEDIUM', 'HIGH', 'CRITICAL')),
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                suggested_action TEXT NOT NULL,
                analysis TEXT NOT NULL,
                suggested_changes TEXT NOT NULL DEFAULT '{}',
                state TEXT NOT NULL DEFAULT 'PENDING'
                    CHECK (state IN ('PENDING', 'IN_REVIEW', 'FULFILLED', 'REJECTED', 'AMENDED')),
                reviewer_id INTEGER,
                reviewed_at TEXT,
                review_comment TEXT,
                applied_by INTEGER,
                applied_at TEXT,
                amendments TEXT,
                generated_session_id INTEGER,
                affected_session_ids TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recommendation_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recommendation_id INTEGER NOT NULL REFERENCES recommendations(id) ON DELETE CASCADE,
                previous_state TEXT NOT NULL,
                new_state TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                comment TEXT,
                extra_data TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_recommendations_state ON recommendations(state, priority)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_recommendations_athlete ON recommendations(athlete_id, state)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_recommendation ON recommendation_history(recommendation_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a recommendation
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored row is malformed
    pub async fn get_recommendation(
        &self,
        recommendation_id: RecommendationId,
    ) -> AppResult<Option<Recommendation>> {
        let row = sqlx::query(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE id = $1"
        ))
        .bind(recommendation_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get recommendation: {e}")))?;

        row.as_ref().map(row_to_recommendation).transpose()
    }

    /// PENDING and `IN_REVIEW` recommendations, most urgent then oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is malformed
    pub async fn list_open_recommendations(
        &self,
        athlete_id: Option<AthleteId>,
    ) -> AppResult<Vec<Recommendation>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {RECOMMENDATION_COLUMNS} FROM recommendations
            WHERE state IN ('PENDING', 'IN_REVIEW') AND ($1 IS NULL OR athlete_id = $1)
            ORDER BY {PRIORITY_RANK}, created_at ASC, id ASC
            "
        ))
        .bind(athlete_id.map(AthleteId::as_i64))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list recommendations: {e}")))?;

        rows.iter().map(row_to_recommendation).collect()
    }

    /// Audit trail of one recommendation, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is malformed
    pub async fn list_recommendation_history(
        &self,
        recommendation_id: RecommendationId,
    ) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, recommendation_id, previous_state, new_state, actor_id, action, comment,
                   extra_data, created_at
            FROM recommendation_history
            WHERE recommendation_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(recommendation_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list history: {e}")))?;

        rows.iter().map(row_to_history).collect()
    }

    /// Append one audit row
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the insert fails
    pub async fn insert_history(&self, entry: &NewHistoryEntry) -> AppResult<HistoryEntry> {
        let created_at = Utc::now();
        let extra_data = entry
            .extra_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r"
            INSERT INTO recommendation_history (
                recommendation_id, previous_state, new_state, actor_id, action, comment,
                extra_data, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(entry.recommendation_id.as_i64())
        .bind(entry.previous_state.as_str())
        .bind(entry.new_state.as_str())
        .bind(entry.actor_id.as_i64())
        .bind(entry.action.as_str())
        .bind(entry.comment.as_deref())
        .bind(extra_data)
        .bind(format_timestamp(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert history entry: {e}")))?;

        Ok(HistoryEntry {
            id: result.last_insert_rowid(),
            recommendation_id: entry.recommendation_id,
            previous_state: entry.previous_state,
            new_state: entry.new_state,
            actor_id: entry.actor_id,
            action: entry.action,
            comment: entry.comment.clone(),
            extra_data: entry.extra_data.clone(),
            created_at,
        })
    }

    /// Recommendation counts per state
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count_recommendations_by_state(&self) -> AppResult<StateCounts> {
        let rows = sqlx::query("SELECT state, COUNT(*) AS count FROM recommendations GROUP BY state")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count recommendations: {e}")))?;

        let mut counts = StateCounts::default();
        for row in &rows {
            let state: String = row.get("state");
            let count: i64 = row.get("count");
            let state = RecommendationState::parse(&state)
                .ok_or_else(|| AppError::database(format!("Unknown recommendation state '{state}'")))?;
            counts.add(state, u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }

    /// Open recommendation counts per priority
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count_open_recommendations_by_priority(&self) -> AppResult<PriorityCounts> {
        let rows = sqlx::query(
            r"
            SELECT priority, COUNT(*) AS count FROM recommendations
            WHERE state IN ('PENDING', 'IN_REVIEW')
            GROUP BY priority
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count priorities: {e}")))?;

        let mut counts = PriorityCounts::default();
        for row in &rows {
            let priority: String = row.get("priority");
            let count: i64 = row.get("count");
            let priority = RecommendationPriority::parse(&priority).ok_or_else(|| {
                AppError::database(format!("Unknown recommendation priority '{priority}'"))
            })?;
            counts.add(priority, u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }

    /// Most recently rejected recommendations carrying feedback
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is malformed
    pub async fn list_rejection_feedback(&self, limit: u32) -> AppResult<Vec<FeedbackEntry>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {RECOMMENDATION_COLUMNS} FROM recommendations
            WHERE state = 'REJECTED'
            ORDER BY updated_at DESC, id DESC
            LIMIT $1
            "
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list feedback: {e}")))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let recommendation = row_to_recommendation(row)?;
            if let Some(feedback) = recommendation.analysis.feedback {
                entries.push(FeedbackEntry {
                    recommendation_id: recommendation.id,
                    athlete_id: recommendation.athlete_id,
                    recommendation_type: recommendation.recommendation_type,
                    rule: recommendation.analysis.rule,
                    title: recommendation.title,
                    feedback,
                });
            }
        }
        Ok(entries)
    }

    /// Whether an open recommendation with the same type and title exists
    pub(crate) async fn has_open_duplicate_in(
        conn: &mut SqliteConnection,
        athlete_id: AthleteId,
        recommendation_type: RecommendationType,
        title: &str,
    ) -> AppResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar(
            r"
            SELECT id FROM recommendations
            WHERE athlete_id = $1 AND recommendation_type = $2 AND title = $3
              AND state IN ('PENDING', 'IN_REVIEW')
            LIMIT 1
            ",
        )
        .bind(athlete_id.as_i64())
        .bind(recommendation_type.as_str())
        .bind(title)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to check duplicates: {e}")))?;

        Ok(existing.is_some())
    }

    /// Insert a PENDING recommendation inside a transaction
    pub(crate) async fn insert_recommendation_in(
        conn: &mut SqliteConnection,
        recommendation: &NewRecommendation,
        now: DateTime<Utc>,
    ) -> AppResult<RecommendationId> {
        let timestamp = format_timestamp(now);
        let result = sqlx::query(
            r"
            INSERT INTO recommendations (
                athlete_id, cycle_id, recommendation_type, priority, title, message,
                suggested_action, analysis, suggested_changes, state, generated_session_id,
                affected_session_ids, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'PENDING', $10, $11, $12, $13)
            ",
        )
        .bind(recommendation.athlete_id.as_i64())
        .bind(recommendation.cycle_id.map(CycleId::as_i64))
        .bind(recommendation.recommendation_type.as_str())
        .bind(recommendation.priority.as_str())
        .bind(&recommendation.title)
        .bind(&recommendation.message)
        .bind(&recommendation.suggested_action)
        .bind(serde_json::to_string(&recommendation.analysis)?)
        .bind(serde_json::to_string(&recommendation.suggested_changes)?)
        .bind(recommendation.generated_session_id.map(SessionId::as_i64))
        .bind(serde_json::to_string(&recommendation.affected_session_ids)?)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to create recommendation: {e}")))?;

        Ok(RecommendationId::new(result.last_insert_rowid()))
    }

    /// Read a recommendation inside a transaction
    pub(crate) async fn get_recommendation_in(
        conn: &mut SqliteConnection,
        recommendation_id: RecommendationId,
    ) -> AppResult<Option<Recommendation>> {
        let row = sqlx::query(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE id = $1"
        ))
        .bind(recommendation_id.as_i64())
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to get recommendation: {e}")))?;

        row.as_ref().map(row_to_recommendation).transpose()
    }

    /// PENDING -> `IN_REVIEW`; `false` when the row was not PENDING
    pub(crate) async fn mark_in_review_in(
        conn: &mut SqliteConnection,
        recommendation_id: RecommendationId,
        reviewer_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let timestamp = format_timestamp(now);
        let result = sqlx::query(
            r"
            UPDATE recommendations
            SET state = 'IN_REVIEW', reviewer_id = $1, reviewed_at = $2, updated_at = $3
            WHERE id = $4 AND state = 'PENDING'
            ",
        )
        .bind(reviewer_id.as_i64())
        .bind(&timestamp)
        .bind(&timestamp)
        .bind(recommendation_id.as_i64())
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to start review: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    /// `IN_REVIEW` -> FULFILLED; a missing comment keeps the stored one
    pub(crate) async fn mark_fulfilled_in(
        conn: &mut SqliteConnection,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let timestamp = format_timestamp(now);
        let result = sqlx::query(
            r"
            UPDATE recommendations
            SET state = 'FULFILLED', applied_by = $1, applied_at = $2,
                review_comment = COALESCE($3, review_comment), updated_at = $4
            WHERE id = $5 AND state = 'IN_REVIEW'
            ",
        )
        .bind(actor_id.as_i64())
        .bind(&timestamp)
        .bind(comment)
        .bind(&timestamp)
        .bind(recommendation_id.as_i64())
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to approve recommendation: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    /// `IN_REVIEW` -> REJECTED with feedback stored in the analysis payload; session references are cleared
    pub(crate) async fn mark_rejected_in(
        conn: &mut SqliteConnection,
        recommendation_id: RecommendationId,
        reason: Option<&str>,
        analysis: &AnalysisPayload,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE recommendations
            SET state = 'REJECTED', review_comment = $1, analysis = $2,
                generated_session_id = NULL, affected_session_ids = '[]', updated_at = $3
            WHERE id = $4 AND state = 'IN_REVIEW'
            ",
        )
        .bind(reason)
        .bind(serde_json::to_string(analysis)?)
        .bind(format_timestamp(now))
        .bind(recommendation_id.as_i64())
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to reject recommendation: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    /// `IN_REVIEW` -> AMENDED with amendments stored verbatim
    pub(crate) async fn mark_amended_in(
        conn: &mut SqliteConnection,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        amendments: &Amendments,
        justification: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let timestamp = format_timestamp(now);
        let result = sqlx::query(
            r"
            UPDATE recommendations
            SET state = 'AMENDED', applied_by = $1, applied_at = $2, amendments = $3,
                review_comment = $4, updated_at = $5
            WHERE id = $6 AND state = 'IN_REVIEW'
            ",
        )
        .bind(actor_id.as_i64())
        .bind(&timestamp)
        .bind(serde_json::to_string(amendments)?)
        .bind(justification)
        .bind(&timestamp)
        .bind(recommendation_id.as_i64())
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to amend recommendation: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}

fn row_to_recommendation(row: &SqliteRow) -> AppResult<Recommendation> {
    let recommendation_type: String = row.get("recommendation_type");
    let priority: String = row.get("priority");
    let state: String = row.get("state");
    let analysis_json: String = row.get("analysis");
    let changes_json: String = row.get("suggested_changes");
    let amendments_json: Option<String> = row.get("amendments");
    let affected_json: String = row.get("affected_session_ids");
    let cycle_id: Option<i64> = row.get("cycle_id");
    let reviewer_id: Option<i64> = row.get("reviewer_id");
    let applied_by: Option<i64> = row.get("applied_by");
    let generated_session_id: Option<i64> = row.get("generated_session_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Recommendation {
        id: RecommendationId::new(row.get("id")),
        athlete_id: AthleteId::new(row.get("athlete_id")),
        cycle_id: cycle_id.map(CycleId::new),
        recommendation_type: RecommendationType::parse(&recommendation_type).ok_or_else(|| {
            AppError::database(format!("Unknown recommendation type '{recommendation_type}'"))
        })?,
        priority: RecommendationPriority::parse(&priority)
            .ok_or_else(|| AppError::database(format!("Unknown priority '{priority}'")))?,
        title: row.get("title"),
        message: row.get("message"),
        suggested_action: row.get("suggested_action"),
        analysis: serde_json::from_str(&analysis_json)?,
        suggested_changes: serde_json::from_str(&changes_json)?,
        state: RecommendationState::parse(&state)
            .ok_or_else(|| AppError::database(format!("Unknown recommendation state '{state}'")))?,
        reviewer_id: reviewer_id.map(UserId::new),
        reviewed_at: parse_optional_timestamp(row.get("reviewed_at"))?,
        review_comment: row.get("review_comment"),
        applied_by: applied_by.map(UserId::new),
        applied_at: parse_optional_timestamp(row.get("applied_at"))?,
        amendments: amendments_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        generated_session_id: generated_session_id.map(SessionId::new),
        affected_session_ids: serde_json::from_str(&affected_json)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_history(row: &SqliteRow) -> AppResult<HistoryEntry> {
    let previous_state: String = row.get("previous_state");
    let new_state: String = row.get("new_state");
    let action: String = row.get("action");
    let extra_data: Option<String> = row.get("extra_data");
    let created_at: String = row.get("created_at");

    let parse_state = |value: &str| {
        RecommendationState::parse(value)
            .ok_or_else(|| AppError::database(format!("Unknown recommendation state '{value}'")))
    };

    Ok(HistoryEntry {
        id: row.get("id"),
        recommendation_id: RecommendationId::new(row.get("recommendation_id")),
        previous_state: parse_state(&previous_state)?,
        new_state: parse_state(&new_state)?,
        actor_id: UserId::new(row.get("actor_id")),
        action: HistoryAction::parse(&action)
            .ok_or_else(|| AppError::database(format!("Unknown history action '{action}'")))?,
        comment: row.get("comment"),
        extra_data: extra_data.as_deref().map(serde_json::from_str).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    })
}
