// ABOUTME: Analysis commands for tatami-cli
// ABOUTME: Runs performance analysis and the analyze -> evaluate -> submit pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use tatami_core::models::{AthleteId, CycleId};
use tatami_insights::{errors::AppResult, services::InsightsService};
use tracing::info;

use crate::helpers::display::print_json;

/// Print the analysis snapshot of one athlete
pub async fn analyze(
    service: &InsightsService,
    athlete_id: AthleteId,
    window_days: u32,
) -> AppResult<()> {
    let snapshot = service.analyze_performance(athlete_id, window_days).await?;
    info!(
        categories = snapshot.categories.len(),
        problematic = snapshot.problematic_exercises.len(),
        needs_attention = snapshot.needs_attention,
        "Analysis finished"
    );
    print_json(&snapshot)
}

/// Generate recommendations and print what was stored
pub async fn generate(
    service: &InsightsService,
    athlete_id: AthleteId,
    window_days: u32,
    cycle_id: Option<CycleId>,
) -> AppResult<()> {
    let outcome = service
        .generate_recommendations(athlete_id, window_days, cycle_id)
        .await?;
    if outcome.created.is_empty() {
        info!("No new recommendations; nothing awaits review");
    }
    print_json(&outcome)
}
