// ABOUTME: Pattern detection over per-category analysis results
// ABOUTME: Low category performance, recurring failures, negative trends, and notable improvement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use crate::config::IntelligenceConfig;
use crate::snapshot::ExerciseCategoryPerformance;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tatami_core::models::{
    AnomalyInterpretation, ExerciseCategory, ExerciseId, PatternSeverity, TrendClassification,
};

/// Kinds of pattern the detector recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternType {
    /// Category average below the acceptable level
    LowCategoryPerformance,
    /// Exercise repeatedly left incomplete
    RecurringFailure,
    /// Confident downward trend
    NegativeTrend,
    /// Category well above its baseline and improving
    NotableImprovement,
}

impl PatternType {
    /// Stable identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LowCategoryPerformance => "LOW_CATEGORY_PERFORMANCE",
            Self::RecurringFailure => "RECURRING_FAILURE",
            Self::NegativeTrend => "NEGATIVE_TREND",
            Self::NotableImprovement => "NOTABLE_IMPROVEMENT",
        }
    }
}

/// One detected pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPattern {
    /// Pattern kind
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    /// Severity
    pub severity: PatternSeverity,
    /// Human readable description
    pub description: String,
    /// Category involved
    pub affected_category: Option<ExerciseCategory>,
    /// Exercise involved
    pub affected_exercise: Option<ExerciseId>,
    /// Supporting numbers
    pub data: Map<String, Value>,
}

/// Detects patterns across category results
#[derive(Debug, Clone)]
pub struct PatternDetector {
    low_category_average: f64,
    min_category_samples: usize,
    incomplete_threshold: u32,
    confident_r_squared: f64,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::from_config(&IntelligenceConfig::default())
    }
}

impl PatternDetector {
    /// Build from configuration
    #[must_use]
    pub const fn from_config(config: &IntelligenceConfig) -> Self {
        Self {
            low_category_average: config.rules.low_category_average,
            min_category_samples: config.rules.min_category_samples,
            incomplete_threshold: config.problems.incomplete_threshold,
            confident_r_squared: config.trend.confident_r_squared,
        }
    }

    /// Run every detector over every category; all patterns may co-occur
    #[must_use]
    pub fn detect(&self, categories: &[ExerciseCategoryPerformance]) -> Vec<DetectedPattern> {
        let mut patterns = Vec::new();
        for category in categories {
            if let Some(pattern) = self.low_performance(category) {
                patterns.push(pattern);
            }
            patterns.extend(self.recurring_failures(category));
            if let Some(pattern) = self.negative_trend(category) {
                patterns.push(pattern);
            }
            if let Some(pattern) = Self::improvement(category) {
                patterns.push(pattern);
            }
        }
        patterns
    }

    fn low_performance(&self, c: &ExerciseCategoryPerformance) -> Option<DetectedPattern> {
        if c.average_rating >= self.low_category_average
            || c.sample_count < self.min_category_samples
        {
            return None;
        }
        let severity = if c.anomaly.interpretation == AnomalyInterpretation::CriticalLow {
            PatternSeverity::Critical
        } else {
            PatternSeverity::High
        };
        Some(DetectedPattern {
            pattern_type: PatternType::LowCategoryPerformance,
            severity,
            description: format!(
                "Average {} rating is {:.1} over {} rated records",
                c.category.label(),
                c.average_rating,
                c.sample_count
            ),
            affected_category: Some(c.category),
            affected_exercise: None,
            data: object(json!({
                "averageRating": c.average_rating,
                "sampleCount": c.sample_count,
                "zScore": c.anomaly.z_score,
                "interpretation": c.anomaly.interpretation,
            })),
        })
    }

    fn recurring_failures<'a>(
        &'a self,
        c: &'a ExerciseCategoryPerformance,
    ) -> impl Iterator<Item = DetectedPattern> + 'a {
        c.problematic_exercises
            .iter()
            .filter(|p| p.times_incomplete >= self.incomplete_threshold)
            .map(|p| DetectedPattern {
                pattern_type: PatternType::RecurringFailure,
                severity: PatternSeverity::Medium,
                description: format!(
                    "{} was left incomplete {} of {} times",
                    p.name, p.times_incomplete, p.times_assigned
                ),
                affected_category: Some(p.category),
                affected_exercise: Some(p.exercise_id),
                data: object(json!({
                    "timesAssigned": p.times_assigned,
                    "timesIncomplete": p.times_incomplete,
                    "averageRating": p.average_rating,
                })),
            })
    }

    fn negative_trend(&self, c: &ExerciseCategoryPerformance) -> Option<DetectedPattern> {
        if !c.trend.is_confidently_worsening(self.confident_r_squared) {
            return None;
        }
        Some(DetectedPattern {
            pattern_type: PatternType::NegativeTrend,
            severity: PatternSeverity::High,
            description: format!(
                "{} ratings are declining by {:.2} per day (R\u{b2} {:.2})",
                c.category.label(),
                c.trend.slope.abs(),
                c.trend.r_squared
            ),
            affected_category: Some(c.category),
            affected_exercise: None,
            data: object(json!({
                "slope": c.trend.slope,
                "rSquared": c.trend.r_squared,
                "nextValuePrediction": c.trend.next_value_prediction,
            })),
        })
    }

    fn improvement(c: &ExerciseCategoryPerformance) -> Option<DetectedPattern> {
        if !c.anomaly.interpretation.is_high()
            || c.trend.classification != TrendClassification::Improving
        {
            return None;
        }
        Some(DetectedPattern {
            pattern_type: PatternType::NotableImprovement,
            severity: PatternSeverity::Low,
            description: format!(
                "{} is {:.1} standard deviations above baseline and improving",
                c.category.label(),
                c.anomaly.z_score
            ),
            affected_category: Some(c.category),
            affected_exercise: None,
            data: object(json!({
                "averageRating": c.average_rating,
                "zScore": c.anomaly.z_score,
                "slope": c.trend.slope,
            })),
        })
    }
}

/// Highest severity among `patterns`, `None` when there are none
#[must_use]
pub fn attention_priority(patterns: &[DetectedPattern]) -> Option<PatternSeverity> {
    patterns.iter().map(|p| p.severity).max()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
