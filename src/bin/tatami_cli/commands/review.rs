// ABOUTME: Review workflow commands for tatami-cli
// ABOUTME: Handles start, approve, reject, amend, history, stats, and feedback operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use tatami_core::models::{Amendments, AthleteId, RecommendationId, UserId};
use tatami_insights::{
    errors::{AppError, AppResult},
    services::InsightsService,
    workflow::AmendRequest,
};
use tracing::info;

use crate::helpers::display::print_json;

/// List open recommendations
pub async fn open(service: &InsightsService, athlete_id: Option<AthleteId>) -> AppResult<()> {
    let open = service.list_open(athlete_id).await?;
    info!(count = open.len(), "Open recommendations");
    print_json(&open)
}

/// PENDING -> `IN_REVIEW`
pub async fn start(
    service: &InsightsService,
    recommendation_id: RecommendationId,
    actor: UserId,
) -> AppResult<()> {
    let recommendation = service.start_review(recommendation_id, actor).await?;
    print_json(&recommendation)
}

/// `IN_REVIEW` -> FULFILLED
pub async fn approve(
    service: &InsightsService,
    recommendation_id: RecommendationId,
    actor: UserId,
    comment: Option<String>,
) -> AppResult<()> {
    let recommendation = service
        .approve(recommendation_id, actor, comment)
        .await?;
    print_json(&recommendation)
}

/// `IN_REVIEW` -> REJECTED
pub async fn reject(
    service: &InsightsService,
    recommendation_id: RecommendationId,
    actor: UserId,
    reason: Option<String>,
    alternative: Option<String>,
) -> AppResult<()> {
    let recommendation = service
        .reject(recommendation_id, actor, reason, alternative)
        .await?;
    print_json(&recommendation)
}

/// `IN_REVIEW` -> AMENDED
pub async fn amend(
    service: &InsightsService,
    recommendation_id: RecommendationId,
    actor: UserId,
    amendments_json: &str,
    justification: String,
    comment: Option<String>,
) -> AppResult<()> {
    let amendments: Amendments = serde_json::from_str(amendments_json).map_err(|e| {
        AppError::invalid_input(format!("--amendments is not valid amendment JSON: {e}"))
    })?;
    let request = AmendRequest {
        amendments,
        justification,
        comment,
    };
    let recommendation = service.amend(recommendation_id, actor, request).await?;
    print_json(&recommendation)
}

/// Audit trail, newest first
pub async fn history(service: &InsightsService, recommendation_id: RecommendationId) -> AppResult<()> {
    let entries = service.get_history(recommendation_id).await?;
    print_json(&entries)
}

/// Counts and rates
pub async fn stats(service: &InsightsService) -> AppResult<()> {
    let stats = service.get_statistics().await?;
    print_json(&stats)
}

/// Recent rejection feedback
pub async fn feedback(service: &InsightsService, limit: u32) -> AppResult<()> {
    let entries = service.get_rejection_feedback(limit).await?;
    info!(count = entries.len(), "Rejection feedback");
    print_json(&entries)
}
