// ABOUTME: Insights service binding the analysis engine, rule engine, and recommendation workflow
// ABOUTME: analyze -> evaluate -> submit pipeline plus delegation of every review operation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use crate::config::{IntelligenceConfig, ServerConfig};
use crate::database::Database;
use crate::errors::AppResult;
use crate::intelligence::PerformanceAnalysisEngine;
use crate::notifications::{LoggingDispatcher, NotificationDispatcher};
use crate::workflow::{AmendRequest, RecommendationWorkflow, SubmissionContext};
use serde::Serialize;
use std::sync::Arc;
use tatami_core::constants::windows::DEFAULT_ANALYSIS_WINDOW_DAYS;
use tatami_core::models::{
    AthleteId, CycleId, FeedbackEntry, HistoryEntry, Recommendation, RecommendationId,
    RecommendationStats, UserId,
};
use tatami_intelligence::{AnalysisSnapshot, RecommendationDraft, RuleEngine};
use tracing::{info, instrument};

/// Result of one analyze -> evaluate -> submit run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    /// Snapshot the rules were evaluated against
    pub snapshot: AnalysisSnapshot,
    /// Drafts produced by the rule engine
    pub drafts_evaluated: usize,
    /// Recommendations actually persisted (duplicates of open ones are skipped)
    pub created: Vec<Recommendation>,
}

/// Single entry point over analysis and review
#[derive(Clone)]
pub struct InsightsService {
    engine: PerformanceAnalysisEngine,
    rules: Arc<RuleEngine>,
    workflow: RecommendationWorkflow,
    default_window_days: u32,
}

impl InsightsService {
    /// Service over `db` with log-based notifications
    #[must_use]
    pub fn new(db: Database, config: &IntelligenceConfig) -> Self {
        Self::with_notifier(db, config, Arc::new(LoggingDispatcher))
    }

    /// Service over `db` with a custom notification dispatcher
    #[must_use]
    pub fn with_notifier(
        db: Database,
        config: &IntelligenceConfig,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            engine: PerformanceAnalysisEngine::new(Arc::new(db.clone()), config),
            rules: Arc::new(RuleEngine::from_config(config)),
            workflow: RecommendationWorkflow::with_notifier(db, notifier),
            default_window_days: DEFAULT_ANALYSIS_WINDOW_DAYS,
        }
    }

    /// Service configured from the environment-derived server settings
    #[must_use]
    pub fn from_server_config(db: Database, server: &ServerConfig) -> Self {
        let mut service = Self::new(db, IntelligenceConfig::global());
        service.workflow = service
            .workflow
            .with_max_retries(server.transaction_max_retries);
        service.default_window_days = server.analysis_window_days;
        service
    }

    /// Window used when a caller does not pick one
    #[must_use]
    pub const fn default_window_days(&self) -> u32 {
        self.default_window_days
    }

    /// Underlying workflow, for callers that submit their own drafts
    #[must_use]
    pub const fn workflow(&self) -> &RecommendationWorkflow {
        &self.workflow
    }

    /// Analyse an athlete's recent performance
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` for an unknown athlete, `INVALID_INPUT` for
    /// an out-of-range window, or a database error
    pub async fn analyze_performance(
        &self,
        athlete_id: AthleteId,
        window_days: u32,
    ) -> AppResult<AnalysisSnapshot> {
        self.engine.analyze(athlete_id, window_days).await
    }

    /// Run the rule engine over a snapshot
    #[must_use]
    pub fn evaluate_rules(&self, snapshot: &AnalysisSnapshot) -> Vec<RecommendationDraft> {
        self.rules.evaluate(snapshot)
    }

    /// Analyse, evaluate, and persist the resulting drafts as PENDING recommendations
    ///
    /// # Errors
    ///
    /// Same as [`Self::analyze_performance`], plus workflow persistence errors
    #[instrument(skip(self), fields(athlete_id = %athlete_id))]
    pub async fn generate_recommendations(
        &self,
        athlete_id: AthleteId,
        window_days: u32,
        cycle_id: Option<CycleId>,
    ) -> AppResult<GenerationOutcome> {
        let snapshot = self.analyze_performance(athlete_id, window_days).await?;
        let drafts = self.evaluate_rules(&snapshot);

        let context = SubmissionContext {
            cycle_id,
            ..SubmissionContext::default()
        };
        let created = self
            .workflow
            .submit_drafts(athlete_id, &drafts, &context)
            .await?;

        info!(
            drafts = drafts.len(),
            created = created.len(),
            needs_attention = snapshot.needs_attention,
            "Recommendation generation completed"
        );
        Ok(GenerationOutcome {
            snapshot,
            drafts_evaluated: drafts.len(),
            created,
        })
    }

    /// See [`RecommendationWorkflow::get`]
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` when the id does not resolve
    pub async fn get_recommendation(
        &self,
        recommendation_id: RecommendationId,
    ) -> AppResult<Recommendation> {
        self.workflow.get(recommendation_id).await
    }

    /// See [`RecommendationWorkflow::list_open`]
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn list_open(&self, athlete_id: Option<AthleteId>) -> AppResult<Vec<Recommendation>> {
        self.workflow.list_open(athlete_id).await
    }

    /// See [`RecommendationWorkflow::start_review`]
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `INVALID_TRANSITION`, or a database error
    pub async fn start_review(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
    ) -> AppResult<Recommendation> {
        self.workflow.start_review(recommendation_id, actor_id).await
    }

    /// See [`RecommendationWorkflow::approve`]
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `INVALID_TRANSITION`, or a database error
    pub async fn approve(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        comment: Option<String>,
    ) -> AppResult<Recommendation> {
        self.workflow
            .approve(recommendation_id, actor_id, comment)
            .await
    }

    /// See [`RecommendationWorkflow::reject`]
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND`, `INVALID_TRANSITION`, or a database error
    pub async fn reject(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        reason: Option<String>,
        alternative_action: Option<String>,
    ) -> AppResult<Recommendation> {
        self.workflow
            .reject(recommendation_id, actor_id, reason, alternative_action)
            .await
    }

    /// See [`RecommendationWorkflow::amend`]
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT`, `RESOURCE_NOT_FOUND`, `INVALID_TRANSITION`, or a database error
    pub async fn amend(
        &self,
        recommendation_id: RecommendationId,
        actor_id: UserId,
        request: AmendRequest,
    ) -> AppResult<Recommendation> {
        self.workflow
            .amend(recommendation_id, actor_id, request)
            .await
    }

    /// See [`RecommendationWorkflow::get_history`]
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` when the id does not resolve
    pub async fn get_history(
        &self,
        recommendation_id: RecommendationId,
    ) -> AppResult<Vec<HistoryEntry>> {
        self.workflow.get_history(recommendation_id).await
    }

    /// See [`RecommendationWorkflow::get_statistics`]
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn get_statistics(&self) -> AppResult<RecommendationStats> {
        self.workflow.get_statistics().await
    }

    /// See [`RecommendationWorkflow::get_rejection_feedback`]
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn get_rejection_feedback(&self, limit: u32) -> AppResult<Vec<FeedbackEntry>> {
        self.workflow.get_rejection_feedback(limit).await
    }
}
