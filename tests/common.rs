// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory database, seeding helpers, and recommendation draft builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::too_many_arguments
)]
//! Shared test utilities for `tatami_insights`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Once;
use tatami_core::models::{
    AnalysisFinding, AnalysisPayload, Athlete, AthleteId, CatalogExercise, ExerciseCategory,
    ExerciseFinding, ExerciseId, RecommendationPriority, RecommendationType, SessionStatus,
    SuggestedChanges, TrainingSession, UserId,
};
use tatami_insights::database::{
    Database, NewAthlete, NewExercise, NewPerformance, NewSession,
};
use tatami_intelligence::RecommendationDraft;

static INIT_LOGGER: Once = Once::new();

/// Trainer account used by seeded athletes
pub const TRAINER_USER_ID: i64 = 900;

/// Reviewer account used by workflow tests
pub const REVIEWER_USER_ID: i64 = 901;

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    let database = Database::new("sqlite::memory:").await?;
    Ok(database)
}

/// Reviewer id as a typed value
pub const fn reviewer() -> UserId {
    UserId::new(REVIEWER_USER_ID)
}

/// Athlete with an assigned trainer
pub async fn seed_athlete(db: &Database, user_id: i64, name: &str) -> Result<Athlete> {
    let athlete = db
        .create_athlete(&NewAthlete {
            user_id: UserId::new(user_id),
            display_name: name.to_owned(),
            trainer_user_id: Some(UserId::new(TRAINER_USER_ID)),
        })
        .await?;
    Ok(athlete)
}

/// Catalog exercise with the given zones and contraindications
pub async fn seed_exercise(
    db: &Database,
    name: &str,
    category: ExerciseCategory,
    difficulty: u8,
    body_zones: &[&str],
    contraindications: &[&str],
) -> Result<CatalogExercise> {
    let exercise = db
        .create_exercise(&NewExercise {
            name: name.to_owned(),
            category,
            difficulty,
            body_zones: body_zones.iter().map(|z| (*z).to_owned()).collect(),
            contraindications: contraindications.iter().map(|z| (*z).to_owned()).collect(),
        })
        .await?;
    Ok(exercise)
}

/// Session on `date` in the given status
pub async fn seed_session(
    db: &Database,
    athlete_id: AthleteId,
    date: NaiveDate,
    status: SessionStatus,
) -> Result<TrainingSession> {
    let session = db
        .create_session(&NewSession {
            athlete_id,
            session_date: date,
            status,
            duration_minutes: Some(90),
            volume: Some(12.0),
            intensity: Some(70.0),
            main_block: Some("randori".into()),
            ..NewSession::default()
        })
        .await?;
    Ok(session)
}

/// One rated exercise in its own session, `days_ago` days before `today`
pub async fn seed_rated_exercise(
    db: &Database,
    athlete_id: AthleteId,
    exercise_id: ExerciseId,
    today: NaiveDate,
    days_ago: i64,
    rating: Option<f64>,
    completed: bool,
) -> Result<()> {
    let date = today - Duration::days(days_ago);
    let session = seed_session(db, athlete_id, date, SessionStatus::Approved).await?;
    db.record_performance(&NewPerformance {
        session_id: session.id,
        exercise_id,
        rating,
        completed,
        recorded_at: noon(date),
    })
    .await?;
    Ok(())
}

/// Midday UTC on `date`
pub fn noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap_or_default())
}

/// A draft as the rule engine would produce for one exercise
pub fn exercise_draft(
    title: &str,
    recommendation_type: RecommendationType,
    priority: RecommendationPriority,
) -> RecommendationDraft {
    RecommendationDraft {
        rule: "recurring_failure".into(),
        recommendation_type,
        priority,
        title: title.to_owned(),
        message: format!("{title}: failed to complete 3 times in 30 days"),
        suggested_action: "Replace with an easier variant".into(),
        suggested_changes: SuggestedChanges::default(),
        analysis: AnalysisPayload {
            rule: "recurring_failure".into(),
            window_days: 30,
            analyzed_at: Utc::now(),
            finding: AnalysisFinding::Exercise(ExerciseFinding {
                exercise_id: ExerciseId::new(1),
                exercise_name: "Uchi mata entries".into(),
                category: ExerciseCategory::StandingTechnique,
                average_rating: Some(3.5),
                times_assigned: 4,
                times_completed: 1,
                times_incomplete: 3,
            }),
            feedback: None,
        },
    }
}
