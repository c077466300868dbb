// ABOUTME: Threshold configuration for trend, anomaly, problem detection, substitutes, and rules
// ABOUTME: Defaults reproduce the documented analysis constants; env overrides are parsed in mod.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use serde::{Deserialize, Serialize};
use tatami_core::constants::{difficulty, windows};

/// Linear trend fitting and classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Minimum number of points for a fit
    pub min_points: usize,
    /// Slope (rating per day) above which a series is improving, below its negation worsening
    pub slope_threshold: f64,
    /// R-squared above which a worsening trend counts as confident
    pub confident_r_squared: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_points: 3,
            slope_threshold: 0.1,
            confident_r_squared: 0.5,
        }
    }
}

/// Z-score anomaly bucketing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Minimum historical sample size
    pub min_history: usize,
    /// |z| at which a deviation becomes an alert
    pub alert_z: f64,
    /// |z| at which a deviation becomes critical
    pub critical_z: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_history: 3,
            alert_z: 1.5,
            critical_z: 2.0,
        }
    }
}

/// Per-exercise problem detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetectionConfig {
    /// Assignments needed before a mediocre average counts
    pub min_assignments: u32,
    /// Average below which a repeatedly assigned exercise is problematic
    pub low_average: f64,
    /// Average at or below which one rated occurrence is enough
    pub very_low_average: f64,
    /// Not-completed count that flags an exercise
    pub incomplete_threshold: u32,
}

impl Default for ProblemDetectionConfig {
    fn default() -> Self {
        Self {
            min_assignments: 3,
            low_average: 5.0,
            very_low_average: 3.0,
            incomplete_threshold: 2,
        }
    }
}

/// Substitute exercise selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteConfig {
    /// Candidates returned per lookup
    pub limit: usize,
    /// Fitness test score below which the category ceiling is `low_score_ceiling`
    pub low_score_threshold: f64,
    /// Fitness test score below which the category ceiling is `mid_score_ceiling`
    pub mid_score_threshold: f64,
    /// Difficulty ceiling for low test scores
    pub low_score_ceiling: u8,
    /// Difficulty ceiling for middling test scores
    pub mid_score_ceiling: u8,
    /// Difficulty ceiling for high test scores
    pub high_score_ceiling: u8,
    /// Difficulty ceiling when the athlete has never been tested
    pub untested_ceiling: u8,
}

impl Default for SubstituteConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            low_score_threshold: 4.0,
            mid_score_threshold: 7.0,
            low_score_ceiling: 2,
            mid_score_ceiling: 3,
            high_score_ceiling: difficulty::MAX_LEVEL,
            untested_ceiling: 3,
        }
    }
}

impl SubstituteConfig {
    /// Difficulty ceiling for category-level substitutes; lower scores give lower ceilings
    #[must_use]
    pub fn ceiling_for_score(&self, score: Option<f64>) -> u8 {
        match score {
            None => self.untested_ceiling,
            Some(s) if s < self.low_score_threshold => self.low_score_ceiling,
            Some(s) if s < self.mid_score_threshold => self.mid_score_ceiling,
            Some(_) => self.high_score_ceiling,
        }
    }
}

/// Analysis windows and output sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisWindowConfig {
    /// Primary window when the caller gives none
    pub default_window_days: u32,
    /// Independent baseline window for anomaly scoring
    pub anomaly_baseline_days: u32,
    /// Records needed before any analysis is attempted
    pub min_records: usize,
    /// Cap on the flattened problematic exercise list
    pub problematic_cap: usize,
}

impl Default for AnalysisWindowConfig {
    fn default() -> Self {
        Self {
            default_window_days: windows::DEFAULT_ANALYSIS_WINDOW_DAYS,
            anomaly_baseline_days: windows::ANOMALY_BASELINE_DAYS,
            min_records: 3,
            problematic_cap: 10,
        }
    }
}

/// Category-level pattern and rule thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleThresholds {
    /// Category average below which performance is low
    pub low_category_average: f64,
    /// Rated records needed before a low average counts
    pub min_category_samples: usize,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            low_category_average: 5.0,
            min_category_samples: 3,
        }
    }
}
