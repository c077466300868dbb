// ABOUTME: Async performance analysis engine producing per-athlete analysis snapshots
// ABOUTME: Fetches windowed records and baselines, runs pure analysis, and attaches substitute exercises
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Performance analysis engine
//!
//! Data access goes through [`AnalysisDataProvider`]; everything numeric is
//! delegated to [`PerformanceAnalyzer`] in `tatami-intelligence`. The primary
//! window and the anomaly baseline window are independent: the baseline always
//! covers the configured number of days ending today, whatever window the
//! caller asked for.

use super::substitutes::select_substitutes;
use crate::database::AnalysisDataProvider;
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tatami_core::constants::windows::MAX_ANALYSIS_WINDOW_DAYS;
use tatami_core::models::{AthleteId, CatalogExercise, ExerciseCategory, ExerciseId, Injury};
use tatami_intelligence::config::SubstituteConfig;
use tatami_intelligence::{
    AnalysisSnapshot, AnalysisWindow, AthleteRef, CategoryInput, ExerciseCategoryPerformance,
    IntelligenceConfig, PerformanceAnalyzer,
};
use tracing::{debug, info, instrument};

/// Catalog lookups keyed by category and difficulty ceiling
type CatalogCache = HashMap<(ExerciseCategory, u8), Vec<CatalogExercise>>;

/// Produces [`AnalysisSnapshot`]s for athletes
#[derive(Clone)]
pub struct PerformanceAnalysisEngine {
    provider: Arc<dyn AnalysisDataProvider>,
    analyzer: PerformanceAnalyzer,
    substitutes: SubstituteConfig,
    baseline_days: u32,
}

impl PerformanceAnalysisEngine {
    /// Create an engine reading through `provider`
    #[must_use]
    pub fn new(provider: Arc<dyn AnalysisDataProvider>, config: &IntelligenceConfig) -> Self {
        Self {
            provider,
            analyzer: PerformanceAnalyzer::from_config(config),
            substitutes: config.substitutes.clone(),
            baseline_days: config.windows.anomaly_baseline_days,
        }
    }

    /// Analyse the window of `window_days` days ending today
    ///
    /// # Errors
    ///
    /// Returns `RESOURCE_NOT_FOUND` for an unknown athlete, `INVALID_INPUT` for
    /// a window outside 1-365 days, or a database error
    pub async fn analyze(
        &self,
        athlete_id: AthleteId,
        window_days: u32,
    ) -> AppResult<AnalysisSnapshot> {
        self.analyze_at(athlete_id, window_days, Utc::now()).await
    }

    /// Analyse as if the current time were `now`
    ///
    /// # Errors
    ///
    /// Same as [`Self::analyze`]
    #[instrument(skip_all, fields(athlete_id = %athlete_id, window_days = window_days))]
    pub async fn analyze_at(
        &self,
        athlete_id: AthleteId,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<AnalysisSnapshot> {
        if window_days == 0 || window_days > MAX_ANALYSIS_WINDOW_DAYS {
            return Err(AppError::invalid_input(format!(
                "Analysis window must be between 1 and {MAX_ANALYSIS_WINDOW_DAYS} days, got {window_days}"
            )));
        }

        let athlete = self
            .provider
            .athlete(athlete_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Athlete {athlete_id}")))?;
        let athlete = AthleteRef {
            id: athlete.id,
            display_name: athlete.display_name,
        };

        let today = now.date_naive();
        let window = AnalysisWindow::ending_at(today, window_days);
        let records = self
            .provider
            .performance_records(athlete_id, window.start, window.end)
            .await?;

        if records.len() < self.analyzer.min_records() {
            info!(
                records = records.len(),
                min_records = self.analyzer.min_records(),
                "Not enough performance records, returning empty snapshot"
            );
            return Ok(AnalysisSnapshot::empty(athlete, window, now));
        }

        let baseline = AnalysisWindow::ending_at(today, self.baseline_days);
        let mut inputs = Vec::new();
        for (category, category_records) in PerformanceAnalyzer::group_by_category(&records) {
            let baseline_ratings = if category_records.iter().any(|r| r.rating.is_some()) {
                self.provider
                    .category_ratings(athlete_id, category, baseline.start, baseline.end)
                    .await?
            } else {
                Vec::new()
            };
            inputs.push(CategoryInput {
                category,
                records: category_records,
                baseline: baseline_ratings,
            });
        }

        let mut categories = self.analyzer.analyze_categories(&inputs);
        self.attach_substitutes(athlete_id, &inputs, &mut categories)
            .await?;

        let snapshot = self
            .analyzer
            .assemble(athlete, window, now, &records, categories);
        info!(
            records = snapshot.summary.total_records,
            categories = snapshot.categories.len(),
            problematic = snapshot.summary.problematic_count,
            patterns = snapshot.patterns.len(),
            needs_attention = snapshot.needs_attention,
            "Performance analysis completed"
        );
        Ok(snapshot)
    }

    /// Fill substitute candidates for flagged exercises and underperforming categories
    async fn attach_substitutes(
        &self,
        athlete_id: AthleteId,
        inputs: &[CategoryInput],
        categories: &mut [ExerciseCategoryPerformance],
    ) -> AppResult<()> {
        let needs_category_level: Vec<bool> = categories
            .iter()
            .map(|c| self.analyzer.needs_category_substitutes(c))
            .collect();
        let any_problem = categories.iter().any(|c| !c.problematic_exercises.is_empty());
        if !any_problem && !needs_category_level.contains(&true) {
            return Ok(());
        }

        let injuries = self.provider.active_injuries(athlete_id).await?;
        let mut cache = CatalogCache::new();

        for (category, category_level) in categories.iter_mut().zip(needs_category_level) {
            let flagged: BTreeSet<ExerciseId> = category
                .problematic_exercises
                .iter()
                .map(|p| p.exercise_id)
                .collect();

            for index in 0..category.problematic_exercises.len() {
                let difficulty = category.problematic_exercises[index].difficulty;
                let catalog = self
                    .catalog(&mut cache, category.category, difficulty)
                    .await?;
                category.problematic_exercises[index].substitute_candidates =
                    select_substitutes(catalog, &injuries, &flagged, self.substitutes.limit);
            }

            if category_level {
                let ceiling = self.difficulty_ceiling(athlete_id).await?;
                let assigned: BTreeSet<ExerciseId> = inputs
                    .iter()
                    .filter(|input| input.category == category.category)
                    .flat_map(|input| input.records.iter().map(|r| r.exercise_id))
                    .collect();
                let catalog = self.catalog(&mut cache, category.category, ceiling).await?;
                category.substitute_candidates =
                    select_substitutes(catalog, &injuries, &assigned, self.substitutes.limit);
                debug!(
                    category = %category.category,
                    ceiling = ceiling,
                    candidates = category.substitute_candidates.len(),
                    "Category-level substitutes selected"
                );
            }
        }
        Ok(())
    }

    async fn catalog<'c>(
        &self,
        cache: &'c mut CatalogCache,
        category: ExerciseCategory,
        max_difficulty: u8,
    ) -> AppResult<&'c [CatalogExercise]> {
        let key = (category, max_difficulty);
        if !cache.contains_key(&key) {
            let exercises = self
                .provider
                .active_exercises(category, max_difficulty)
                .await?;
            cache.insert(key, exercises);
        }
        Ok(cache.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    /// Lower fitness test scores cap candidates at easier levels
    async fn difficulty_ceiling(&self, athlete_id: AthleteId) -> AppResult<u8> {
        let latest = self.provider.latest_fitness_test(athlete_id).await?;
        Ok(self
            .substitutes
            .ceiling_for_score(latest.map(|test| test.score)))
    }
}
