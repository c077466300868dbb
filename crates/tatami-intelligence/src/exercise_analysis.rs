// ABOUTME: Per-exercise statistics and problem detection within one category
// ABOUTME: Flags exercises with low averages, very poor ratings, or repeated non-completion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(clippy::cast_possible_truncation)] // Safe: per-window occurrence counts fit in u32

use crate::config::ProblemDetectionConfig;
use crate::snapshot::{ProblemReason, ProblematicExercise};
use crate::statistics::{mean, round_to};
use crate::trend::{PerformanceSample, TrendAnalyzer};
use std::collections::BTreeMap;
use tatami_core::models::{ExerciseCategory, ExerciseId, PerformanceRecord};

/// Occurrence counts and dated ratings for one exercise
#[derive(Debug, Clone)]
pub struct ExerciseStats {
    /// Exercise id
    pub exercise_id: ExerciseId,
    /// Exercise name
    pub name: String,
    /// Exercise category
    pub category: ExerciseCategory,
    /// Difficulty level
    pub difficulty: u8,
    /// Occurrences
    pub times_assigned: u32,
    /// Completed occurrences
    pub times_completed: u32,
    /// Rated occurrences as dated samples
    pub ratings: Vec<PerformanceSample>,
}

impl ExerciseStats {
    /// Occurrences not completed
    #[must_use]
    pub const fn times_incomplete(&self) -> u32 {
        self.times_assigned - self.times_completed
    }

    /// Average over rated occurrences
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let values: Vec<f64> = self.ratings.iter().map(|s| s.value).collect();
        Some(mean(&values))
    }
}

/// Group records by exercise, ordered by exercise id
#[must_use]
pub fn collect_exercise_stats<'a, I>(records: I) -> Vec<ExerciseStats>
where
    I: IntoIterator<Item = &'a PerformanceRecord>,
{
    let mut by_exercise: BTreeMap<ExerciseId, ExerciseStats> = BTreeMap::new();
    for record in records {
        let stats = by_exercise
            .entry(record.exercise_id)
            .or_insert_with(|| ExerciseStats {
                exercise_id: record.exercise_id,
                name: record.exercise_name.clone(),
                category: record.category,
                difficulty: record.difficulty,
                times_assigned: 0,
                times_completed: 0,
                ratings: Vec::new(),
            });
        stats.times_assigned += 1;
        if record.completed {
            stats.times_completed += 1;
        }
        if let Some(rating) = record.rating {
            stats
                .ratings
                .push(PerformanceSample::new(record.session_date, rating));
        }
    }
    by_exercise.into_values().collect()
}

/// Decides which exercises an athlete is struggling with
#[derive(Debug, Clone, Default)]
pub struct ProblemDetector {
    config: ProblemDetectionConfig,
    trend: TrendAnalyzer,
}

impl ProblemDetector {
    /// Create a detector
    #[must_use]
    pub const fn new(config: ProblemDetectionConfig, trend: TrendAnalyzer) -> Self {
        Self { config, trend }
    }

    /// Conditions met by `stats`; empty when the exercise is fine
    #[must_use]
    pub fn reasons(&self, stats: &ExerciseStats) -> Vec<ProblemReason> {
        let mut reasons = Vec::new();
        if let Some(average) = stats.average_rating() {
            if stats.times_assigned >= self.config.min_assignments
                && average < self.config.low_average
            {
                reasons.push(ProblemReason::LowAverage);
            }
            if average <= self.config.very_low_average {
                reasons.push(ProblemReason::VeryLowRating);
            }
        }
        if stats.times_incomplete() >= self.config.incomplete_threshold {
            reasons.push(ProblemReason::RepeatedIncomplete);
        }
        reasons
    }

    /// Flag problematic exercises among `records`, which should share one category
    ///
    /// Each exercise is reported once regardless of how many conditions it meets.
    /// Substitute candidates are left empty for the caller to fill.
    #[must_use]
    pub fn detect<'a, I>(&self, records: I) -> Vec<ProblematicExercise>
    where
        I: IntoIterator<Item = &'a PerformanceRecord>,
    {
        collect_exercise_stats(records)
            .into_iter()
            .filter_map(|stats| {
                let reasons = self.reasons(&stats);
                if reasons.is_empty() {
                    return None;
                }
                let trend = (stats.ratings.len() >= self.trend.min_points())
                    .then(|| self.trend.analyze(&stats.ratings));
                Some(ProblematicExercise {
                    exercise_id: stats.exercise_id,
                    average_rating: stats.average_rating().map(|a| round_to(a, 2)),
                    times_incomplete: stats.times_incomplete(),
                    name: stats.name,
                    category: stats.category,
                    difficulty: stats.difficulty,
                    times_assigned: stats.times_assigned,
                    times_completed: stats.times_completed,
                    trend,
                    reasons,
                    substitute_candidates: Vec::new(),
                })
            })
            .collect()
    }
}
