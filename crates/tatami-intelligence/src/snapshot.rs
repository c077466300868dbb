// ABOUTME: Analysis snapshot produced by one analysis run for one athlete and window
// ABOUTME: Category performance, problematic exercises, substitutes, patterns, and attention rollup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(clippy::cast_precision_loss)] // Safe: record counts are small

use crate::pattern_detection::DetectedPattern;
use crate::statistics::round_to;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tatami_core::models::{
    AnomalyResult, AthleteId, CatalogExercise, CategoryFinding, ExerciseCategory, ExerciseFinding,
    ExerciseId, PatternSeverity, PerformanceRecord, TrendResult,
};

/// Athlete identity carried by a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteRef {
    /// Athlete id
    pub id: AthleteId,
    /// Name shown to reviewers
    pub display_name: String,
}

/// Inclusive session-date bounds of the primary window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWindow {
    /// First session date included
    pub start: NaiveDate,
    /// Last session date included
    pub end: NaiveDate,
    /// Window length in days
    pub days: u32,
}

impl AnalysisWindow {
    /// Window of `days` days ending on `end`
    #[must_use]
    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - chrono::Duration::days(i64::from(days)),
            end,
            days,
        }
    }

    /// Whether `date` falls within the window
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Why an exercise was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemReason {
    /// Repeatedly assigned with a mediocre average
    LowAverage,
    /// Rated very poorly at least once
    VeryLowRating,
    /// Repeatedly left incomplete
    RepeatedIncomplete,
}

/// Catalog exercise offered in place of a struggling one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteCandidate {
    /// Catalog id
    pub exercise_id: ExerciseId,
    /// Exercise name
    pub name: String,
    /// Exercise category
    pub category: ExerciseCategory,
    /// Difficulty level 1-5
    pub difficulty: u8,
}

impl From<&CatalogExercise> for SubstituteCandidate {
    fn from(exercise: &CatalogExercise) -> Self {
        Self {
            exercise_id: exercise.id,
            name: exercise.name.clone(),
            category: exercise.category,
            difficulty: exercise.difficulty,
        }
    }
}

/// An exercise the athlete is struggling with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblematicExercise {
    /// Exercise id
    pub exercise_id: ExerciseId,
    /// Exercise name
    pub name: String,
    /// Exercise category
    pub category: ExerciseCategory,
    /// Difficulty of the exercise, used as the substitute ceiling
    pub difficulty: u8,
    /// Average over rated occurrences
    pub average_rating: Option<f64>,
    /// Occurrences in the window
    pub times_assigned: u32,
    /// Completed occurrences
    pub times_completed: u32,
    /// Occurrences not completed
    pub times_incomplete: u32,
    /// Trend over the exercise's own ratings when enough exist
    pub trend: Option<TrendResult>,
    /// Conditions that flagged the exercise
    pub reasons: Vec<ProblemReason>,
    /// Replacement suggestions
    pub substitute_candidates: Vec<SubstituteCandidate>,
}

impl ProblematicExercise {
    /// Audit view of this exercise
    #[must_use]
    pub fn finding(&self) -> ExerciseFinding {
        ExerciseFinding {
            exercise_id: self.exercise_id,
            exercise_name: self.name.clone(),
            category: self.category,
            average_rating: self.average_rating,
            times_assigned: self.times_assigned,
            times_completed: self.times_completed,
            times_incomplete: self.times_incomplete,
        }
    }

    /// Worst first; unrated exercises sort after rated ones
    #[must_use]
    pub fn cmp_worst_first(&self, other: &Self) -> Ordering {
        match (self.average_rating, other.average_rating) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => other.times_incomplete.cmp(&self.times_incomplete),
        }
    }
}

/// Per-category aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCategoryPerformance {
    /// Category
    pub category: ExerciseCategory,
    /// Average over rated records in the window
    pub average_rating: f64,
    /// Rated records in the window
    pub sample_count: usize,
    /// All records in the window, rated or not
    pub record_count: usize,
    /// Trend over the category's dated ratings
    pub trend: TrendResult,
    /// Category average scored against the wider baseline
    pub anomaly: AnomalyResult,
    /// Flagged exercises in this category
    pub problematic_exercises: Vec<ProblematicExercise>,
    /// Category-level substitutes
    pub substitute_candidates: Vec<SubstituteCandidate>,
}

impl ExerciseCategoryPerformance {
    /// Audit view of this category
    #[must_use]
    pub fn finding(&self) -> CategoryFinding {
        CategoryFinding {
            category: self.category,
            average_rating: self.average_rating,
            sample_count: self.sample_count,
            anomaly: self.anomaly,
            trend: self.trend,
            problematic_exercise_ids: self
                .problematic_exercises
                .iter()
                .map(|p| p.exercise_id)
                .collect(),
        }
    }
}

/// Headline numbers of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// Records in the window
    pub total_records: usize,
    /// Records carrying a rating
    pub rated_records: usize,
    /// Distinct sessions
    pub sessions: usize,
    /// Average over rated records
    pub average_rating: f64,
    /// Completed share of records, percent
    pub completion_rate: f64,
    /// Categories with at least one rated record
    pub categories_analyzed: usize,
    /// Flagged exercises before capping
    pub problematic_count: usize,
}

impl AnalysisSummary {
    /// Summarise raw records; category and problem counts are filled in at assembly
    #[must_use]
    pub fn from_records(records: &[PerformanceRecord]) -> Self {
        let ratings: Vec<f64> = records.iter().filter_map(|r| r.rating).collect();
        let completed = records.iter().filter(|r| r.completed).count();
        let mut sessions: Vec<_> = records.iter().map(|r| r.session_id).collect();
        sessions.sort_unstable();
        sessions.dedup();

        let completion_rate = if records.is_empty() {
            0.0
        } else {
            round_to(completed as f64 / records.len() as f64 * 100.0, 1)
        };

        Self {
            total_records: records.len(),
            rated_records: ratings.len(),
            sessions: sessions.len(),
            average_rating: round_to(crate::statistics::mean(&ratings), 2),
            completion_rate,
            categories_analyzed: 0,
            problematic_count: 0,
        }
    }
}

/// Output of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    /// Athlete analysed
    pub athlete: AthleteRef,
    /// Primary window
    pub window: AnalysisWindow,
    /// When the run happened
    pub analyzed_at: DateTime<Utc>,
    /// Headline numbers
    pub summary: AnalysisSummary,
    /// One entry per category with rated records
    pub categories: Vec<ExerciseCategoryPerformance>,
    /// Flattened, worst first, capped
    pub problematic_exercises: Vec<ProblematicExercise>,
    /// Detected patterns
    pub patterns: Vec<DetectedPattern>,
    /// Whether any pattern was detected
    pub needs_attention: bool,
    /// Highest pattern severity
    pub attention_priority: Option<PatternSeverity>,
}

impl AnalysisSnapshot {
    /// Snapshot for a run with too little data to analyse
    #[must_use]
    pub fn empty(athlete: AthleteRef, window: AnalysisWindow, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            athlete,
            window,
            analyzed_at,
            summary: AnalysisSummary::default(),
            categories: Vec::new(),
            problematic_exercises: Vec::new(),
            patterns: Vec::new(),
            needs_attention: false,
            attention_priority: None,
        }
    }

    /// Look up a category's aggregate
    #[must_use]
    pub fn category(&self, category: ExerciseCategory) -> Option<&ExerciseCategoryPerformance> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Whether the run produced any category results
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
