// ABOUTME: Exercise catalog and performance record models
// ABOUTME: ExerciseCategory, CatalogExercise, and PerformanceRecord joined with session metadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::ids::{ExerciseId, SessionId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    /// Strength and conditioning work
    Physical,
    /// Standing technique (throws, grips, footwork)
    StandingTechnique,
    /// Ground technique (pins, chokes, joint locks, transitions)
    GroundTechnique,
    /// Aerobic and work-capacity conditioning
    Endurance,
    /// Speed and explosiveness drills
    Speed,
}

impl ExerciseCategory {
    /// All categories in canonical order
    pub const ALL: [Self; 5] = [
        Self::Physical,
        Self::StandingTechnique,
        Self::GroundTechnique,
        Self::Endurance,
        Self::Speed,
    ];

    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::StandingTechnique => "standing_technique",
            Self::GroundTechnique => "ground_technique",
            Self::Endurance => "endurance",
            Self::Speed => "speed",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "physical" => Some(Self::Physical),
            "standing_technique" => Some(Self::StandingTechnique),
            "ground_technique" => Some(Self::GroundTechnique),
            "endurance" => Some(Self::Endurance),
            "speed" => Some(Self::Speed),
            _ => None,
        }
    }

    /// Human-readable label used in recommendation messages
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Physical => "physical conditioning",
            Self::StandingTechnique => "standing technique",
            Self::GroundTechnique => "ground technique",
            Self::Endurance => "endurance",
            Self::Speed => "speed",
        }
    }
}

impl fmt::Display for ExerciseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exercise metadata as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogExercise {
    /// Unique identifier
    pub id: ExerciseId,
    /// Display name
    pub name: String,
    /// Exercise category
    pub category: ExerciseCategory,
    /// Difficulty level (1 = easiest, 5 = hardest)
    pub difficulty: u8,
    /// Whether the exercise may currently be assigned
    pub active: bool,
    /// Body zones loaded by the exercise
    #[serde(default)]
    pub body_zones: Vec<String>,
    /// Zones or conditions for which the exercise is contraindicated
    #[serde(default)]
    pub contraindications: Vec<String>,
}

impl CatalogExercise {
    /// Zone names an injury must not overlap with for this exercise to be safe
    pub fn sensitive_zones(&self) -> impl Iterator<Item = &str> {
        self.body_zones
            .iter()
            .chain(self.contraindications.iter())
            .map(String::as_str)
    }
}

/// One stored exercise-performance record joined with exercise and session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Exercise the record refers to
    pub exercise_id: ExerciseId,
    /// Exercise display name
    pub exercise_name: String,
    /// Exercise category
    pub category: ExerciseCategory,
    /// Exercise difficulty level
    pub difficulty: u8,
    /// Session the exercise was assigned in
    pub session_id: SessionId,
    /// Date the session took place (analysis windows use this, not `recorded_at`)
    pub session_date: NaiveDate,
    /// Performance rating 0-10, absent when the trainer did not rate the exercise
    pub rating: Option<f64>,
    /// Whether the athlete completed the exercise
    pub completed: bool,
    /// When the record was entered
    pub recorded_at: DateTime<Utc>,
}
