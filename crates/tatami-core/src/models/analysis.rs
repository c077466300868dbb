// ABOUTME: Result types produced by trend and anomaly analysis
// ABOUTME: Shared by the intelligence crate and by recommendation audit payloads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a fitted performance trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendClassification {
    /// Ratings are rising over time
    Improving,
    /// No meaningful change
    Stable,
    /// Ratings are falling over time
    Worsening,
}

/// Linear trend fitted over a rating series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    /// Rating change per day (rounded to 3 decimals)
    pub slope: f64,
    /// Fitted rating at the first observation (rounded to 2 decimals)
    pub intercept: f64,
    /// Trend direction
    pub classification: TrendClassification,
    /// Goodness of fit in `[0, 1]` (rounded to 2 decimals)
    pub r_squared: f64,
    /// Forecast one day after the last observation, clamped to the rating scale
    pub next_value_prediction: f64,
    /// Fewer points than needed for a fit
    pub insufficient_data: bool,
}

impl TrendResult {
    /// Whether the trend is worsening with a fit better than `min_r_squared`
    #[must_use]
    pub fn is_confidently_worsening(&self, min_r_squared: f64) -> bool {
        self.classification == TrendClassification::Worsening && self.r_squared > min_r_squared
    }
}

/// Severity bucket for a standardized deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyInterpretation {
    /// Two or more standard deviations below the baseline
    CriticalLow,
    /// Between 1.5 and 2 standard deviations below the baseline
    AlertLow,
    /// Within the expected band
    Normal,
    /// Between 1.5 and 2 standard deviations above the baseline
    AlertHigh,
    /// Two or more standard deviations above the baseline
    CriticalHigh,
}

impl AnomalyInterpretation {
    /// Above the baseline by at least the alert threshold
    #[must_use]
    pub const fn is_high(&self) -> bool {
        matches!(self, Self::AlertHigh | Self::CriticalHigh)
    }
}

/// Standardized deviation of a current value from its historical baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    /// Value being scored
    pub current_value: f64,
    /// Baseline sample mean
    pub mean: f64,
    /// Baseline sample standard deviation (n - 1)
    pub std_dev: f64,
    /// `(current - mean) / std_dev`
    pub z_score: f64,
    /// Severity bucket
    pub interpretation: AnomalyInterpretation,
    /// Baseline too small to score
    pub insufficient_data: bool,
}

/// Severity of a detected pattern; ordering is `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternSeverity {
    /// Informational
    Low,
    /// Worth a look
    Medium,
    /// Needs attention soon
    High,
    /// Needs attention now
    Critical,
}

impl PatternSeverity {
    /// Upper-case name used in messages and storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for PatternSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
