// ABOUTME: Read-side data access trait consumed by the performance analysis engine
// ABOUTME: Implemented for the SQLite Database; tests may substitute in-memory fixtures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::Database;
use crate::errors::AppResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use tatami_core::models::{
    Athlete, AthleteId, CatalogExercise, ExerciseCategory, FitnessTestSummary, Injury,
    PerformanceRecord,
};

/// Everything the analysis engine reads
#[async_trait]
pub trait AnalysisDataProvider: Send + Sync {
    /// Athlete identity, `None` when unknown
    async fn athlete(&self, athlete_id: AthleteId) -> AppResult<Option<Athlete>>;

    /// Records whose session date lies in `[start, end]`
    async fn performance_records(
        &self,
        athlete_id: AthleteId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<PerformanceRecord>>;

    /// Rated values of one category whose session date lies in `[start, end]`
    async fn category_ratings(
        &self,
        athlete_id: AthleteId,
        category: ExerciseCategory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<f64>>;

    /// Active catalog exercises of a category at or below a difficulty
    async fn active_exercises(
        &self,
        category: ExerciseCategory,
        max_difficulty: u8,
    ) -> AppResult<Vec<CatalogExercise>>;

    /// Injuries not yet recovered from
    async fn active_injuries(&self, athlete_id: AthleteId) -> AppResult<Vec<Injury>>;

    /// Most recent fitness test
    async fn latest_fitness_test(
        &self,
        athlete_id: AthleteId,
    ) -> AppResult<Option<FitnessTestSummary>>;
}

#[async_trait]
impl AnalysisDataProvider for Database {
    async fn athlete(&self, athlete_id: AthleteId) -> AppResult<Option<Athlete>> {
        self.get_athlete(athlete_id).await
    }

    async fn performance_records(
        &self,
        athlete_id: AthleteId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<PerformanceRecord>> {
        self.list_performance_records(athlete_id, start, end).await
    }

    async fn category_ratings(
        &self,
        athlete_id: AthleteId,
        category: ExerciseCategory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<f64>> {
        self.list_category_ratings(athlete_id, category, start, end)
            .await
    }

    async fn active_exercises(
        &self,
        category: ExerciseCategory,
        max_difficulty: u8,
    ) -> AppResult<Vec<CatalogExercise>> {
        self.list_active_exercises(category, max_difficulty).await
    }

    async fn active_injuries(&self, athlete_id: AthleteId) -> AppResult<Vec<Injury>> {
        self.get_active_injuries(athlete_id).await
    }

    async fn latest_fitness_test(
        &self,
        athlete_id: AthleteId,
    ) -> AppResult<Option<FitnessTestSummary>> {
        self.get_latest_fitness_test(athlete_id).await
    }
}
