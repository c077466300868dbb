// ABOUTME: Integration tests for the recommendation review workflow
// ABOUTME: Covers transitions, session side effects, audit trail, statistics, and atomicity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::{
    create_test_database, exercise_draft, reviewer, seed_athlete, seed_session,
    TRAINER_USER_ID,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tatami_core::errors::{AppError, AppResult, ErrorCode};
use tatami_core::models::{
    Amendments, AthleteId, HistoryAction, RecommendationId, RecommendationPriority,
    RecommendationState, RecommendationType, SessionAdjustments, SessionId, SessionStatus, UserId,
};
use tatami_insights::database::Database;
use tatami_insights::notifications::{
    BroadcastDispatcher, NotificationDispatcher, PlanApprovedNotice,
};
use tatami_insights::workflow::{AmendRequest, RecommendationWorkflow, SubmissionContext};

fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
}

/// Dispatcher whose delivery always fails
#[derive(Default)]
struct UnreachableDispatcher {
    attempts: AtomicU32,
}

#[async_trait]
impl NotificationDispatcher for UnreachableDispatcher {
    async fn notify_plan_approved(&self, _notice: &PlanApprovedNotice) -> AppResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::external_service("push", "gateway unreachable"))
    }
}

/// One PENDING recommendation for a fresh athlete, referencing a draft session
async fn submit_one(db: &Database, workflow: &RecommendationWorkflow) -> Result<(i64, i64)> {
    let athlete = seed_athlete(db, 10, "Aiko").await?;
    let session = seed_session(db, athlete.id, session_date(), SessionStatus::Draft).await?;
    let created = workflow
        .submit_drafts(
            athlete.id,
            &[exercise_draft(
                "Replace uchi mata entries",
                RecommendationType::ExerciseAdjustment,
                RecommendationPriority::Medium,
            )],
            &SubmissionContext {
                generated_session_id: Some(session.id),
                ..SubmissionContext::default()
            },
        )
        .await?;
    Ok((created[0].id.as_i64(), session.id.as_i64()))
}

/// Workflow plus one PENDING recommendation referencing a generated draft session
async fn setup_with_generated_session(
) -> Result<(Database, RecommendationWorkflow, Arc<BroadcastDispatcher>, i64, i64)> {
    let db = create_test_database().await?;
    let dispatcher = Arc::new(BroadcastDispatcher::default());
    let workflow = RecommendationWorkflow::with_notifier(db.clone(), dispatcher.clone());

    let athlete = seed_athlete(&db, 10, "Aiko").await?;
    let cycle = db.create_cycle(athlete.id, "2025-Q2").await?;
    let session = seed_session(&db, athlete.id, session_date(), SessionStatus::Draft).await?;

    let created = workflow
        .submit_drafts(
            athlete.id,
            &[exercise_draft(
                "Replace uchi mata entries",
                RecommendationType::ExerciseAdjustment,
                RecommendationPriority::Medium,
            )],
            &SubmissionContext {
                cycle_id: Some(cycle),
                generated_session_id: Some(session.id),
                affected_session_ids: Vec::new(),
            },
        )
        .await?;
    assert_eq!(created.len(), 1);

    Ok((
        db,
        workflow,
        dispatcher,
        created[0].id.as_i64(),
        session.id.as_i64(),
    ))
}

#[tokio::test]
async fn test_submitted_drafts_start_pending_without_history() -> Result<()> {
    let (_db, workflow, _, id, session_id) = setup_with_generated_session().await?;
    let recommendation = workflow.get(id.into()).await?;

    assert_eq!(recommendation.state, RecommendationState::Pending);
    assert_eq!(
        recommendation.generated_session_id.map(|s| s.as_i64()),
        Some(session_id)
    );
    assert!(workflow.get_history(id.into()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_approve_from_pending_is_invalid_transition() -> Result<()> {
    let (_db, workflow, _, id, _) = setup_with_generated_session().await?;

    let err = workflow
        .approve(id.into(), reviewer(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTransition);
    assert_eq!(err.current_state(), Some("PENDING"));

    let unchanged = workflow.get(id.into()).await?;
    assert_eq!(unchanged.state, RecommendationState::Pending);
    assert!(workflow.get_history(id.into()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_recommendation_is_not_found() -> Result<()> {
    let (_db, workflow, _, _, _) = setup_with_generated_session().await?;

    let err = workflow
        .start_review(RecommendationId::new(9_999), reviewer())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(workflow.get_history(RecommendationId::new(9_999)).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_approve_marks_session_and_notifies() -> Result<()> {
    let (db, workflow, dispatcher, id, session_id) = setup_with_generated_session().await?;
    let mut notices = dispatcher.subscribe();

    let reviewing = workflow.start_review(id.into(), reviewer()).await?;
    assert_eq!(reviewing.state, RecommendationState::InReview);
    assert_eq!(reviewing.reviewer_id, Some(reviewer()));
    assert!(reviewing.reviewed_at.is_some());

    let approved = workflow
        .approve(id.into(), reviewer(), Some("Good call".into()))
        .await?;
    assert_eq!(approved.state, RecommendationState::Fulfilled);
    assert_eq!(approved.applied_by, Some(reviewer()));
    assert!(approved.applied_at.is_some());

    let session = db.get_session(session_id.into()).await?.unwrap();
    assert_eq!(session.status, SessionStatus::Approved);

    let notice = notices.try_recv()?;
    assert_eq!(notice.recommendation_id, approved.id);
    assert_eq!(notice.athlete_user_id, UserId::new(10));
    assert_eq!(notice.trainer_user_id, Some(UserId::new(TRAINER_USER_ID)));
    assert_eq!(notice.cycle_code.as_deref(), Some("2025-Q2"));
    Ok(())
}

#[tokio::test]
async fn test_second_approve_is_invalid_transition() -> Result<()> {
    let (_db, workflow, _, id, _) = setup_with_generated_session().await?;
    workflow.start_review(id.into(), reviewer()).await?;
    workflow.approve(id.into(), reviewer(), None).await?;

    let err = workflow
        .approve(id.into(), reviewer(), None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(err.current_state(), Some("FULFILLED"));
    assert_eq!(workflow.get_history(id.into()).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_reject_deletes_generated_session_and_keeps_feedback() -> Result<()> {
    let (db, workflow, _, id, session_id) = setup_with_generated_session().await?;
    workflow.start_review(id.into(), reviewer()).await?;

    let rejected = workflow
        .reject(
            id.into(),
            reviewer(),
            Some("Competition next week".into()),
            Some("Revisit after the tournament".into()),
        )
        .await?;

    assert_eq!(rejected.state, RecommendationState::Rejected);
    assert!(rejected.session_references().is_empty());
    assert!(db.get_session(session_id.into()).await?.is_none());

    let feedback = rejected.analysis.feedback.as_ref().unwrap();
    assert_eq!(feedback.reason.as_deref(), Some("Competition next week"));
    assert_eq!(feedback.deleted_session_count, 1);

    let history = workflow.get_history(id.into()).await?;
    let latest = &history[0];
    assert_eq!(latest.action, HistoryAction::Rejected);
    assert_eq!(latest.previous_state, RecommendationState::InReview);
    let extra = latest.extra_data.as_ref().unwrap();
    assert!(extra["deletedSessionCount"].as_u64().unwrap() >= 1);
    assert_eq!(extra["alternativeAction"], "Revisit after the tournament");
    Ok(())
}

#[tokio::test]
async fn test_reject_without_sessions_clears_references() -> Result<()> {
    let db = create_test_database().await?;
    let workflow = RecommendationWorkflow::new(db.clone());
    let athlete = seed_athlete(&db, 11, "Kenji").await?;

    let created = workflow
        .submit_drafts(
            athlete.id,
            &[exercise_draft(
                "Deload ground work",
                RecommendationType::LoadReduction,
                RecommendationPriority::High,
            )],
            &SubmissionContext::default(),
        )
        .await?;
    let id = created[0].id;

    workflow.start_review(id, reviewer()).await?;
    let rejected = workflow.reject(id, reviewer(), None, None).await?;

    assert!(rejected.session_references().is_empty());
    assert_eq!(
        rejected.analysis.feedback.as_ref().unwrap().deleted_session_count,
        0
    );
    Ok(())
}

#[tokio::test]
async fn test_amend_applies_only_provided_session_fields() -> Result<()> {
    let (db, workflow, dispatcher, id, session_id) = setup_with_generated_session().await?;
    let mut notices = dispatcher.subscribe();
    workflow.start_review(id.into(), reviewer()).await?;

    let amendments = Amendments {
        session: Some(SessionAdjustments {
            duration_minutes: Some(45),
            notes: Some("Half volume after knee tweak".into()),
            ..SessionAdjustments::default()
        }),
        changes: None,
        instructions: Some("Keep the grip work".into()),
    };
    let amended = workflow
        .amend(
            id.into(),
            reviewer(),
            AmendRequest {
                amendments: amendments.clone(),
                justification: "Shorter session fits the week".into(),
                comment: None,
            },
        )
        .await?;

    assert_eq!(amended.state, RecommendationState::Amended);
    assert_eq!(amended.amendments.as_ref(), Some(&amendments));
    assert_eq!(
        amended.review_comment.as_deref(),
        Some("Shorter session fits the week")
    );

    let session = db.get_session(session_id.into()).await?.unwrap();
    assert_eq!(session.status, SessionStatus::Approved);
    assert_eq!(session.duration_minutes, Some(45));
    assert_eq!(session.volume, Some(12.0));
    assert_eq!(session.main_block.as_deref(), Some("randori"));
    assert_eq!(session.notes.as_deref(), Some("Half volume after knee tweak"));

    assert_eq!(notices.try_recv()?.state, RecommendationState::Amended);
    Ok(())
}

#[tokio::test]
async fn test_amend_requires_justification() -> Result<()> {
    let (_db, workflow, _, id, _) = setup_with_generated_session().await?;
    workflow.start_review(id.into(), reviewer()).await?;

    let err = workflow
        .amend(id.into(), reviewer(), AmendRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(
        workflow.get(id.into()).await?.state,
        RecommendationState::InReview
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_affected_session_rolls_back_approval() -> Result<()> {
    let db = create_test_database().await?;
    let workflow = RecommendationWorkflow::new(db.clone());
    let athlete = seed_athlete(&db, 12, "Mateo").await?;
    let kept = seed_session(&db, athlete.id, session_date(), SessionStatus::Draft).await?;

    let created = workflow
        .submit_drafts(
            athlete.id,
            &[exercise_draft(
                "Rebalance standing technique",
                RecommendationType::CategoryRebalance,
                RecommendationPriority::High,
            )],
            &SubmissionContext {
                cycle_id: None,
                generated_session_id: None,
                affected_session_ids: vec![kept.id, SessionId::new(4_242)],
            },
        )
        .await?;
    let id = created[0].id;
    workflow.start_review(id, reviewer()).await?;

    let err = workflow.approve(id, reviewer(), None).await.unwrap_err();
    assert!(err.is_not_found());

    let after = workflow.get(id).await?;
    assert_eq!(after.state, RecommendationState::InReview);
    assert!(after.applied_at.is_none());
    let session = db.get_session(kept.id).await?.unwrap();
    assert_eq!(session.status, SessionStatus::Draft);

    // Only the review entry exists; the failed approval wrote nothing
    let history = workflow.get_history(id).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, HistoryAction::InReview);
    Ok(())
}

#[tokio::test]
async fn test_history_records_previous_state_newest_first() -> Result<()> {
    let (_db, workflow, _, id, _) = setup_with_generated_session().await?;
    workflow.start_review(id.into(), reviewer()).await?;
    workflow
        .approve(id.into(), reviewer(), Some("ok".into()))
        .await?;

    let history = workflow.get_history(id.into()).await?;
    assert_eq!(history.len(), 2);

    assert_eq!(history[0].action, HistoryAction::Approved);
    assert_eq!(history[0].previous_state, RecommendationState::InReview);
    assert_eq!(history[0].new_state, RecommendationState::Fulfilled);
    assert_eq!(history[0].comment.as_deref(), Some("ok"));

    assert_eq!(history[1].action, HistoryAction::InReview);
    assert_eq!(history[1].previous_state, RecommendationState::Pending);
    assert_eq!(history[1].actor_id, reviewer());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_open_drafts_are_skipped() -> Result<()> {
    let db = create_test_database().await?;
    let workflow = RecommendationWorkflow::new(db.clone());
    let athlete = seed_athlete(&db, 13, "Sofia").await?;
    let draft = exercise_draft(
        "Replace o goshi drill",
        RecommendationType::ExerciseAdjustment,
        RecommendationPriority::Medium,
    );

    let first = workflow
        .submit_drafts(
            athlete.id,
            &[draft.clone(), draft.clone()],
            &SubmissionContext::default(),
        )
        .await?;
    assert_eq!(first.len(), 1);

    let again = workflow
        .submit_drafts(athlete.id, &[draft.clone()], &SubmissionContext::default())
        .await?;
    assert!(again.is_empty());

    // Once closed, the same advice may be given again
    workflow.start_review(first[0].id, reviewer()).await?;
    workflow.reject(first[0].id, reviewer(), None, None).await?;
    let after_close = workflow
        .submit_drafts(athlete.id, &[draft], &SubmissionContext::default())
        .await?;
    assert_eq!(after_close.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_submit_for_unknown_athlete_is_not_found() -> Result<()> {
    let db = create_test_database().await?;
    let workflow = RecommendationWorkflow::new(db);

    let err = workflow
        .submit_drafts(
            AthleteId::new(77),
            &[exercise_draft(
                "Anything",
                RecommendationType::Progression,
                RecommendationPriority::Low,
            )],
            &SubmissionContext::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_statistics_and_rejection_feedback() -> Result<()> {
    let db = create_test_database().await?;
    let workflow = RecommendationWorkflow::new(db.clone());
    let athlete = seed_athlete(&db, 14, "Lena").await?;

    let empty = workflow.get_statistics().await?;
    assert_eq!(empty.total, 0);
    assert!(empty.approval_rate.abs() < f64::EPSILON);
    assert!(empty.amendment_rate.abs() < f64::EPSILON);

    let drafts: Vec<_> = [
        ("A", RecommendationPriority::Critical),
        ("B", RecommendationPriority::High),
        ("C", RecommendationPriority::Medium),
        ("D", RecommendationPriority::Low),
        ("E", RecommendationPriority::High),
    ]
    .into_iter()
    .map(|(title, priority)| {
        exercise_draft(title, RecommendationType::ExerciseAdjustment, priority)
    })
    .collect();
    let created = workflow
        .submit_drafts(athlete.id, &drafts, &SubmissionContext::default())
        .await?;
    assert_eq!(created.len(), 5);

    // Most urgent first
    let open = workflow.list_open(Some(athlete.id)).await?;
    assert_eq!(open[0].priority, RecommendationPriority::Critical);
    assert_eq!(open[4].priority, RecommendationPriority::Low);

    // A fulfilled, B amended, C rejected, D in review, E pending
    for rec in &created[..4] {
        workflow.start_review(rec.id, reviewer()).await?;
    }
    workflow.approve(created[0].id, reviewer(), None).await?;
    workflow
        .amend(
            created[1].id,
            reviewer(),
            AmendRequest {
                justification: "Tweaked".into(),
                ..AmendRequest::default()
            },
        )
        .await?;
    workflow
        .reject(created[2].id, reviewer(), Some("Not now".into()), None)
        .await?;

    let stats = workflow.get_statistics().await?;
    assert_eq!(stats.total, 5);
    assert_eq!(stats.by_state.fulfilled, 1);
    assert_eq!(stats.by_state.amended, 1);
    assert_eq!(stats.by_state.rejected, 1);
    assert_eq!(stats.by_state.in_review, 1);
    assert_eq!(stats.by_state.pending, 1);
    assert_eq!(stats.open_by_priority.low, 1);
    assert_eq!(stats.open_by_priority.high, 1);
    assert_eq!(stats.open_by_priority.critical, 0);
    // 2 of 3 decisions accepted, 1 of 2 acceptances amended
    assert!((stats.approval_rate - 67.0).abs() < f64::EPSILON);
    assert!((stats.amendment_rate - 50.0).abs() < f64::EPSILON);

    let feedback = workflow.get_rejection_feedback(10).await?;
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].recommendation_id, created[2].id);
    assert_eq!(feedback[0].feedback.reason.as_deref(), Some("Not now"));
    assert_eq!(feedback[0].feedback.rejected_by, reviewer());
    Ok(())
}

#[tokio::test]
async fn test_notification_failure_keeps_committed_transitions() -> Result<()> {
    let db = create_test_database().await?;
    let dispatcher = Arc::new(UnreachableDispatcher::default());
    let workflow = RecommendationWorkflow::with_notifier(db.clone(), dispatcher.clone());
    let (approve_id, session_id) = submit_one(&db, &workflow).await?;

    workflow.start_review(approve_id.into(), reviewer()).await?;
    let approved = workflow.approve(approve_id.into(), reviewer(), None).await?;
    assert_eq!(approved.state, RecommendationState::Fulfilled);
    let session = db.get_session(session_id.into()).await?.unwrap();
    assert_eq!(session.status, SessionStatus::Approved);

    let history = workflow.get_history(approve_id.into()).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(
        history
            .iter()
            .filter(|h| h.action == HistoryAction::Approved)
            .count(),
        1
    );

    let amend_id = workflow
        .submit_drafts(
            approved.athlete_id,
            &[exercise_draft(
                "Shorten ne waza rounds",
                RecommendationType::ExerciseAdjustment,
                RecommendationPriority::Low,
            )],
            &SubmissionContext::default(),
        )
        .await?[0]
        .id;
    workflow.start_review(amend_id, reviewer()).await?;
    let amended = workflow
        .amend(
            amend_id,
            reviewer(),
            AmendRequest {
                justification: "Competition next week".into(),
                ..AmendRequest::default()
            },
        )
        .await?;
    assert_eq!(amended.state, RecommendationState::Amended);

    let history = workflow.get_history(amend_id).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, HistoryAction::Amended);

    assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_approvals_have_one_winner() -> Result<()> {
    common::init_test_logging();
    let temp_dir = tempfile::tempdir()?;
    let url = format!("sqlite:{}", temp_dir.path().join("race.db").display());
    let db = Database::new(&url).await?;
    let workflow = RecommendationWorkflow::new(db.clone());
    let (id, _) = submit_one(&db, &workflow).await?;
    workflow.start_review(id.into(), reviewer()).await?;

    let first = workflow.clone();
    let second = workflow.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.approve(id.into(), reviewer(), None).await }),
        tokio::spawn(async move { second.approve(id.into(), UserId::new(902), None).await }),
    );
    let outcomes = [a?, b?];

    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.code, ErrorCode::InvalidTransition);
    assert_eq!(loser.current_state(), Some("FULFILLED"));

    let history = workflow.get_history(id.into()).await?;
    let actions: Vec<HistoryAction> = history.iter().map(|h| h.action).collect();
    assert_eq!(actions, vec![HistoryAction::Approved, HistoryAction::InReview]);
    Ok(())
}
