// ABOUTME: Benchmark test fixtures for generating realistic exercise performance data
// ABOUTME: Provides deterministic data generation for reproducible performance measurements
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Benchmark test fixtures for generating exercise performance data.
//!
//! Ratings follow a slow downward drift with a fixed wobble so trend fitting
//! and problem detection do real work on every run.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tatami_core::models::{ExerciseCategory, ExerciseId, PerformanceRecord, SessionId};
use tatami_intelligence::PerformanceSample;

/// Predefined batch sizes for benchmark scenarios
#[derive(Debug, Clone, Copy)]
pub enum RecordBatchSize {
    /// One month of light training
    Small,
    /// A full training block
    Medium,
    /// A season
    Large,
}

impl RecordBatchSize {
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Small => 20,
            Self::Medium => 200,
            Self::Large => 2000,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// Fixed end date so runs are comparable
#[must_use]
pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default()
}

#[allow(clippy::cast_precision_loss)]
fn rating_at(index: usize) -> f64 {
    let drift = index as f64 * 0.01;
    let wobble = ((index * 7) % 5) as f64 * 0.3;
    (8.0 - drift + wobble).clamp(0.0, 10.0)
}

/// Daily samples with a downward drift
#[must_use]
pub fn generate_samples(count: usize) -> Vec<PerformanceSample> {
    let end = base_date();
    (0..count)
        .map(|i| {
            let days_ago = i64::try_from(count - i).unwrap_or(i64::MAX);
            PerformanceSample::new(end - Duration::days(days_ago), rating_at(i))
        })
        .collect()
}

/// Ratings usable as an anomaly baseline
#[must_use]
pub fn generate_baseline(count: usize) -> Vec<f64> {
    (0..count).map(rating_at).collect()
}

/// Records spread across every category and a dozen exercises
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn generate_records(count: usize) -> Vec<PerformanceRecord> {
    let end = base_date();
    let recorded_at = Utc.with_ymd_and_hms(2025, 6, 30, 18, 0, 0).single().unwrap_or_default();
    (0..count)
        .map(|i| {
            let exercise = (i % 12) as i64;
            let category = ExerciseCategory::ALL[i % ExerciseCategory::ALL.len()];
            let days_ago = i64::try_from(i / 4).unwrap_or(0);
            PerformanceRecord {
                exercise_id: ExerciseId::new(exercise + 1),
                exercise_name: format!("drill {exercise}"),
                category,
                difficulty: u8::try_from(i % 5 + 1).unwrap_or(1),
                session_id: SessionId::new((i / 4) as i64 + 1),
                session_date: end - Duration::days(days_ago),
                rating: (i % 9 != 0).then(|| rating_at(i)),
                completed: i % 6 != 0,
                recorded_at,
            }
        })
        .collect()
}
