// ABOUTME: Recommendation approval workflow: PENDING -> IN_REVIEW -> FULFILLED | REJECTED | AMENDED
// ABOUTME: Each transition is one transaction with session side effects, followed by an audit entry and notification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! # Recommendation Workflow
//!
//! Every state-changing operation runs as a unit of work:
//!
//! 1. open a transaction and read the recommendation
//! 2. validate the transition against the state table
//! 3. apply a conditional `UPDATE ... WHERE state = <expected>` plus session side effects
//! 4. commit
//! 5. append exactly one history entry
//! 6. for approvals and amendments, notify athlete and trainer (best-effort)
//!
//! The conditional update makes concurrent reviewers safe across processes:
//! only one of them can move a recommendation out of a given state.

use crate::config::environment::DEFAULT_TRANSACTION_MAX_RETRIES;
use crate::database::{
    retry_transaction, Database, NewHistoryEntry, NewRecommendation, SqliteTransactionGuard,
};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::notifications::{LoggingDispatcher, NotificationDispatcher, PlanApprovedNotice};
use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::SqliteConnection;
use std::sync::Arc;
use std::time::Instant;
use tatami_core::constants::workflow::MAX_FEEDBACK_LIMIT;
use tatami_core::models::{
    Amendments, AthleteId, CycleId, FeedbackEntry, HistoryAction, HistoryEntry, Recommendation,
    RecommendationId, RecommendationState, RecommendationStats, RejectionFeedback, SessionId,
    UserId,
};
use tatami_intelligence::RecommendationDraft;
use tracing::{debug, error, info, instrument, warn};

/// Where submitted drafts attach in the athlete's plan
#[derive(Debug, Clone, Default)]
pub struct SubmissionContext {
    /// Affected training cycle
    pub cycle_id: Option<CycleId>,
    /// Draft session generated alongside the recommendations
    pub generated_session_id: Option<SessionId>,
    /// Existing sessions the recommendations affect
    pub affected_session_ids: Vec<SessionId>,
}

/// A reviewer's amendment of a recommendation
#[derive(Debug, Clone, Default)]
pub struct AmendRequest {
    /// Changes stored verbatim on the recommendation
    pub amendments: Amendments,
    /// Why the reviewer amended instead of approving
    pub justification: String,
    /// Extra comment for the audit trail
    pub comment: Option<String>,
}

/// Outcome of a committed unit of work, used for the audit entry
struct Committed {
    previous_state: RecommendationState,
    extra_data: Option<Map<String, Value>>,
}

/// State machine over persisted recommendations
#[derive(Clone)]
pub struct RecommendationWorkflow {
    db: Database,
    notifier: Arc<dyn NotificationDispatcher>,
    max_retries: u32,
}

impl RecommendationWorkflow {
    /// Workflow notifying through the log
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self::with_notifier(db, Arc::new(LoggingDispatcher))
    }

    /// Workflow with a custom notification dispatcher
    #[must_use]
    pub fn with_notifier(db: Database, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            db,
            notifier,
            max_retries: DEFAULT_TRANSACTION_MAX_RETRIES,
        }
    }

    /// Attempts per unit of work on lock contention
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = if max_retries == 0 { 1 } else { max_retries };
        self
    }

    /// Persist drafts as PENDING recommendations in one transaction
    ///
    /// Drafts duplicating an open recommendation (same athlete, type, and
    /// title) are skipped. Returns only the recommendations created.
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` for an unknown athlete or a database error
    #[instrument(skip_all, fields(athlete_id = %athlete_id, drafts = drafts.len()))]
    pub async fn submit_drafts(
        &self,
        athlete_id: AthleteId,
        drafts: &[RecommendationDraft],
        context: &SubmissionContext,
    ) -> AppResult<Vec<Recommendation>> {
        if self.db.get_athlete(athlete_id).await?.is_none() {
            return Err(AppError::not_found(format!("Athlete {athlete_id}")));
        }
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let created = retry_transaction(
            || self.submit_once(athlete_id, drafts, context),
            self.max_retries,
        )
        .await?;
        AppLogger::log_database_operation(
            "insert",
            "recommendations",
            true,
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        );

        let mut recommendations = Vec::with_capacity(created.len());
        for id in created {
            recommendations.push(self.get(id).await?);
        }
        info!(
            created = recommendations.len(),
            skipped = drafts.len() - recommendations.len(),
            "Recommendation drafts submitted"
        );
        Ok(recommendations)
    }

    async fn submit_once(
        &self,
        athlete_id: AthleteId,
        drafts: &[RecommendationDraft],
        context: &SubmissionContext,
    ) -> AppResult<Vec<RecommendationId>> {
        let mut guard = self.db.begin().await?;
        let now = Utc::now();
        let mut created = Vec::new();

        for draft in drafts {
            if Database::has_open_duplicate_in(
                guard.executor()?,
                athlete_id,
                draft.recommendation_type,
                &draft.title,
            )
            .await?
            {
                debug!(title = %draft.title, rule = %draft.rule, "Skipping duplicate of open recommendation");
                continue;
            }

            let recommendation = NewRecommendation {
                athlete_id,
                cycle_id: context.cycle_id,
                recommendation_type: draft.recommendation_type,
                priority: draft.priority,
                title: draft.title.clone(),
                message: draft.message.clone(),
                suggested_action: draft.suggested_action.clone(),
                analysis: draft.analysis.clone(),
                suggested_changes: draft.suggested_changes.clone(),
                generated_session_id: context.generated_session_id,
                affected_session_ids: context.affected_session_ids.clone(),
            };
            created.push(
                Database::insert_recommendation_in(guard.executor()?, &recommendation, now).await?,
            );
        }

        guard.commit().await?;
        Ok(created)
    }

    /// Load one recommendation
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` when the id does not resolve
    pub async fn get(&self, recommendation_id: RecommendationId) -> AppResult<Recommendation> {
        self.db
            .get_recommendation(recommendation_id)
            .await?
            .ok_or_else(|| not_found(recommendation_id))
    }

    /// Open recommendations, most urgent first
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn list_open(&self, athlete_id: Option<AthleteId>) -> AppResult<Vec<Recommendation>> {
        self.db.list_open_recommendations(athlete_id).await
    }

    /// PENDING -> `IN_REVIEW`, stamping the reviewer
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `INVALID_TRANSITION`, or a database error
    #[instrument(skip_all, fields(recommendation_id = %recommendation_id, actor_id = %reviewer_id))]
    pub async fn start_review(
        &self,
        recommendation_id: RecommendationId,
        reviewer_id: UserId,
    ) -> AppResult<Recommendation> {
        let committed = retry_transaction(
            || self.start_review_once(recommendation_id, reviewer_id),
            self.max_retries,
        )
        .await?;

        self.finish(
            recommendation_id,
            RecommendationState::InReview,
            HistoryAction::InReview,
            reviewer_id,
            None,
            committed,
        )
        .await
    }

    async fn start_review_once(
        &self,
        recommendation_id: RecommendationId,
        reviewer_id: UserId,
    ) -> AppResult<Committed> {
        let target = RecommendationState::InReview;
        let mut guard = self.db.begin().await?;
        let current = load_for_transition(guard.executor()?, recommendation_id, target).await?;

        if !Database::mark_in_review_in(guard.executor()?, recommendation_id, reviewer_id, Utc::now())
            .await?
        {
            return Err(lost_race(guard.executor()?, recommendation_id, &current, target).await);
        }

        guard.commit().await?;
        Ok(Committed {
            previous_state: current.state,
            extra_data: None,
        })
    }

    /// `IN_REVIEW` -> FULFILLED, approving every referenced session
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` (recommendation or referenced session),
    /// `INVALID_TRANSITION`, or a database error
    #[instrument(skip_all, fields(recommendation_id = %recommendation_id, actor_id = %actor_id))]
    pub async fn approve(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        comment: Option<String>,
    ) -> AppResult<Recommendation> {
        let committed = retry_transaction(
            || self.approve_once(recommendation_id, actor_id, comment.as_deref()),
            self.max_retries,
        )
        .await?;

        let recommendation = self
            .finish(
                recommendation_id,
                RecommendationState::Fulfilled,
                HistoryAction::Approved,
                actor_id,
                comment,
                committed,
            )
            .await?;
        self.notify_plan_approved(&recommendation).await;
        Ok(recommendation)
    }

    async fn approve_once(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        comment: Option<&str>,
    ) -> AppResult<Committed> {
        let target = RecommendationState::Fulfilled;
        let mut guard = self.db.begin().await?;
        let current = load_for_transition(guard.executor()?, recommendation_id, target).await?;

        if !Database::mark_fulfilled_in(
            guard.executor()?,
            recommendation_id,
            actor_id,
            comment,
            Utc::now(),
        )
        .await?
        {
            return Err(lost_race(guard.executor()?, recommendation_id, &current, target).await);
        }

        let sessions = current.session_references();
        for session_id in &sessions {
            if !Database::approve_session_in(guard.executor()?, *session_id).await? {
                return Err(missing_session(guard, recommendation_id, *session_id).await);
            }
        }

        guard.commit().await?;
        Ok(Committed {
            previous_state: current.state,
            extra_data: Some(object(json!({ "approvedSessionCount": sessions.len() }))),
        })
    }

    /// `IN_REVIEW` -> REJECTED, deleting referenced sessions and keeping the feedback
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `INVALID_TRANSITION`, or a database error
    #[instrument(skip_all, fields(recommendation_id = %recommendation_id, actor_id = %actor_id))]
    pub async fn reject(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        reason: Option<String>,
        alternative_action: Option<String>,
    ) -> AppResult<Recommendation> {
        let committed = retry_transaction(
            || {
                self.reject_once(
                    recommendation_id,
                    actor_id,
                    reason.as_deref(),
                    alternative_action.as_deref(),
                )
            },
            self.max_retries,
        )
        .await?;

        self.finish(
            recommendation_id,
            RecommendationState::Rejected,
            HistoryAction::Rejected,
            actor_id,
            reason,
            committed,
        )
        .await
    }

    async fn reject_once(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        reason: Option<&str>,
        alternative_action: Option<&str>,
    ) -> AppResult<Committed> {
        let target = RecommendationState::Rejected;
        let mut guard = self.db.begin().await?;
        let current = load_for_transition(guard.executor()?, recommendation_id, target).await?;

        let mut deleted: u64 = 0;
        for session_id in current.session_references() {
            deleted += Database::delete_session_in(guard.executor()?, session_id).await?;
        }
        let deleted_session_count = u32::try_from(deleted).unwrap_or(u32::MAX);

        let now = Utc::now();
        let mut analysis = current.analysis.clone();
        analysis.feedback = Some(RejectionFeedback {
            reason: reason.map(str::to_owned),
            alternative_action: alternative_action.map(str::to_owned),
            rejected_by: actor_id,
            rejected_at: now,
            deleted_session_count,
        });

        if !Database::mark_rejected_in(guard.executor()?, recommendation_id, reason, &analysis, now)
            .await?
        {
            return Err(lost_race(guard.executor()?, recommendation_id, &current, target).await);
        }

        guard.commit().await?;
        Ok(Committed {
            previous_state: current.state,
            extra_data: Some(object(json!({
                "alternativeAction": alternative_action,
                "deletedSessionCount": deleted_session_count,
            }))),
        })
    }

    /// `IN_REVIEW` -> AMENDED, storing amendments and adjusting the generated session
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` for a blank justification, `RESOURCE_NOT_FOUND`,
    /// `INVALID_TRANSITION`, or a database error
    #[instrument(skip_all, fields(recommendation_id = %recommendation_id, actor_id = %actor_id))]
    pub async fn amend(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        request: AmendRequest,
    ) -> AppResult<Recommendation> {
        if request.justification.trim().is_empty() {
            return Err(AppError::invalid_input("Amendment justification must not be empty"));
        }

        let committed = retry_transaction(
            || self.amend_once(recommendation_id, actor_id, &request),
            self.max_retries,
        )
        .await?;

        let comment = request
            .comment
            .clone()
            .or_else(|| Some(request.justification.clone()));
        let recommendation = self
            .finish(
                recommendation_id,
                RecommendationState::Amended,
                HistoryAction::Amended,
                actor_id,
                comment,
                committed,
            )
            .await?;
        self.notify_plan_approved(&recommendation).await;
        Ok(recommendation)
    }

    async fn amend_once(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        request: &AmendRequest,
    ) -> AppResult<Committed> {
        let target = RecommendationState::Amended;
        let mut guard = self.db.begin().await?;
        let current = load_for_transition(guard.executor()?, recommendation_id, target).await?;

        if !Database::mark_amended_in(
            guard.executor()?,
            recommendation_id,
            actor_id,
            &request.amendments,
            request.justification.trim(),
            Utc::now(),
        )
        .await?
        {
            return Err(lost_race(guard.executor()?, recommendation_id, &current, target).await);
        }

        let mut session_adjusted = false;
        if let (Some(session_id), Some(adjustments)) =
            (current.generated_session_id, request.amendments.session.as_ref())
        {
            if !adjustments.is_empty() {
                if !Database::adjust_session_in(guard.executor()?, session_id, adjustments).await? {
                    return Err(missing_session(guard, recommendation_id, session_id).await);
                }
                session_adjusted = true;
            }
        }

        guard.commit().await?;
        Ok(Committed {
            previous_state: current.state,
            extra_data: Some(object(json!({
                "justification": request.justification.trim(),
                "sessionAdjusted": session_adjusted,
            }))),
        })
    }

    /// Audit trail, newest first
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` when the id does not resolve
    pub async fn get_history(
        &self,
        recommendation_id: RecommendationId,
    ) -> AppResult<Vec<HistoryEntry>> {
        if self.db.get_recommendation(recommendation_id).await?.is_none() {
            return Err(not_found(recommendation_id));
        }
        self.db.list_recommendation_history(recommendation_id).await
    }

    /// Counts by state, open priorities, and approval/amendment rates
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn get_statistics(&self) -> AppResult<RecommendationStats> {
        let by_state = self.db.count_recommendations_by_state().await?;
        let open_by_priority = self.db.count_open_recommendations_by_priority().await?;
        Ok(RecommendationStats::from_counts(by_state, open_by_priority))
    }

    /// Feedback of the most recently rejected recommendations
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn get_rejection_feedback(&self, limit: u32) -> AppResult<Vec<FeedbackEntry>> {
        self.db
            .list_rejection_feedback(limit.clamp(1, MAX_FEEDBACK_LIMIT))
            .await
    }

    /// Append the audit entry for a committed transition and reload the recommendation
    async fn finish(
        &self,
        recommendation_id: RecommendationId,
        new_state: RecommendationState,
        action: HistoryAction,
        actor_id: UserId,
        comment: Option<String>,
        committed: Committed,
    ) -> AppResult<Recommendation> {
        AppLogger::log_transition(
            recommendation_id,
            committed.previous_state,
            new_state,
            actor_id,
        );

        let entry = NewHistoryEntry {
            recommendation_id,
            previous_state: committed.previous_state,
            new_state,
            actor_id,
            action,
            comment,
            extra_data: committed.extra_data,
        };
        if let Err(e) = self.db.insert_history(&entry).await {
            error!(
                recommendation_id = %recommendation_id,
                action = action.as_str(),
                error = %e,
                "Transition committed but audit entry could not be written"
            );
            return Err(e);
        }

        self.get(recommendation_id).await
    }

    /// Best-effort; failures are logged and never undo the transition
    async fn notify_plan_approved(&self, recommendation: &Recommendation) {
        let notice = match self.build_notice(recommendation).await {
            Ok(notice) => notice,
            Err(e) => {
                warn!(
                    recommendation_id = %recommendation.id,
                    error = %e,
                    "Could not prepare plan approval notification"
                );
                return;
            }
        };

        if let Err(e) = self.notifier.notify_plan_approved(&notice).await {
            warn!(
                recommendation_id = %recommendation.id,
                error = %e,
                "Plan approval notification failed"
            );
        }
    }

    async fn build_notice(&self, recommendation: &Recommendation) -> AppResult<PlanApprovedNotice> {
        let athlete = self
            .db
            .get_athlete(recommendation.athlete_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Athlete {}", recommendation.athlete_id)))?;
        let cycle_code = match recommendation.cycle_id {
            Some(cycle_id) => self.db.get_cycle_code(cycle_id).await?,
            None => None,
        };

        Ok(PlanApprovedNotice {
            recommendation_id: recommendation.id,
            state: recommendation.state,
            athlete_user_id: athlete.user_id,
            trainer_user_id: athlete.trainer_user_id,
            cycle_code,
        })
    }
}

fn not_found(recommendation_id: RecommendationId) -> AppError {
    AppError::not_found(format!("Recommendation {recommendation_id}"))
        .with_resource_id(recommendation_id.to_string())
}

/// Read the recommendation inside the transaction and check the transition table
async fn load_for_transition(
    conn: &mut SqliteConnection,
    recommendation_id: RecommendationId,
    target: RecommendationState,
) -> AppResult<Recommendation> {
    let current = Database::get_recommendation_in(conn, recommendation_id)
        .await?
        .ok_or_else(|| not_found(recommendation_id))?;

    if !current.state.can_transition_to(target) {
        return Err(AppError::invalid_transition(
            format!("Recommendation {recommendation_id}"),
            current.state.as_str(),
            target.as_str(),
        ));
    }
    Ok(current)
}

/// The conditional update matched nothing: another writer moved the recommendation first
async fn lost_race(
    conn: &mut SqliteConnection,
    recommendation_id: RecommendationId,
    before: &Recommendation,
    target: RecommendationState,
) -> AppError {
    let state = match Database::get_recommendation_in(conn, recommendation_id).await {
        Ok(Some(latest)) => latest.state,
        Ok(None) => return not_found(recommendation_id),
        Err(_) => before.state,
    };
    warn!(
        recommendation_id = %recommendation_id,
        current_state = %state,
        requested_state = %target,
        "Concurrent transition detected"
    );
    AppError::invalid_transition(
        format!("Recommendation {recommendation_id}"),
        state.as_str(),
        target.as_str(),
    )
}

/// Roll back and report a referenced session that no longer exists
async fn missing_session(
    guard: SqliteTransactionGuard<'static>,
    recommendation_id: RecommendationId,
    session_id: SessionId,
) -> AppError {
    if let Err(e) = guard.rollback().await {
        warn!(error = %e, "Rollback after missing session failed");
    }
    AppError::not_found(format!(
        "Training session {session_id} referenced by recommendation {recommendation_id}"
    ))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
