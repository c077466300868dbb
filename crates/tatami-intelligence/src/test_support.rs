// ABOUTME: Snapshot fixtures for unit tests of pattern detection and rule evaluation
// ABOUTME: Builds category results with chosen anomaly and trend outcomes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(clippy::unwrap_used)]

use crate::snapshot::{
    AnalysisSnapshot, AnalysisWindow, AthleteRef, ExerciseCategoryPerformance, ProblemReason,
    ProblematicExercise,
};
use chrono::{NaiveDate, TimeZone, Utc};
use tatami_core::models::{
    AnomalyInterpretation, AnomalyResult, AthleteId, ExerciseCategory, ExerciseId,
    TrendClassification, TrendResult,
};

pub fn category(
    category: ExerciseCategory,
    average: f64,
    samples: usize,
    interpretation: AnomalyInterpretation,
    classification: TrendClassification,
) -> ExerciseCategoryPerformance {
    let (slope, z_score) = match (classification, interpretation) {
        (TrendClassification::Worsening, _) => (-0.4, -1.0),
        (TrendClassification::Improving, i) if i.is_high() => (0.3, 2.1),
        (TrendClassification::Improving, _) => (0.3, 0.0),
        (_, AnomalyInterpretation::CriticalLow) => (0.0, -2.6),
        _ => (0.0, 0.0),
    };
    ExerciseCategoryPerformance {
        category,
        average_rating: average,
        sample_count: samples,
        record_count: samples,
        trend: TrendResult {
            slope,
            intercept: average,
            classification,
            r_squared: if slope == 0.0 { 0.0 } else { 0.8 },
            next_value_prediction: average,
            insufficient_data: false,
        },
        anomaly: AnomalyResult {
            current_value: average,
            mean: 6.5,
            std_dev: 0.9,
            z_score,
            interpretation,
            insufficient_data: false,
        },
        problematic_exercises: Vec::new(),
        substitute_candidates: Vec::new(),
    }
}

pub fn problem(
    category: ExerciseCategory,
    id: i64,
    average: Option<f64>,
    times_incomplete: u32,
) -> ProblematicExercise {
    ProblematicExercise {
        exercise_id: ExerciseId::new(id),
        name: format!("exercise {id}"),
        category,
        difficulty: 3,
        average_rating: average,
        times_assigned: 4,
        times_completed: 4 - times_incomplete,
        times_incomplete,
        trend: None,
        reasons: vec![ProblemReason::LowAverage],
        substitute_candidates: Vec::new(),
    }
}

pub fn snapshot_with(categories: Vec<ExerciseCategoryPerformance>) -> AnalysisSnapshot {
    let problematic = categories
        .iter()
        .flat_map(|c| c.problematic_exercises.iter().cloned())
        .collect();
    AnalysisSnapshot {
        problematic_exercises: problematic,
        categories,
        ..AnalysisSnapshot::empty(
            AthleteRef {
                id: AthleteId::new(1),
                display_name: "Kenji".into(),
            },
            AnalysisWindow::ending_at(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 30),
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        )
    }
}
