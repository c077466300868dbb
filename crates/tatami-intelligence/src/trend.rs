// ABOUTME: Linear trend analysis over dated performance ratings
// ABOUTME: Ordinary least squares on elapsed days, R-squared fit quality, and a clamped forecast
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(clippy::cast_precision_loss)] // Safe: day offsets and sample counts are small

use crate::config::TrendConfig;
use crate::statistics::{mean, round_to};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tatami_core::constants::ratings::{MAX_RATING, MIN_RATING};
use tatami_core::models::{TrendClassification, TrendResult};

/// One dated rating, built per analysis run from stored records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Session date
    pub date: NaiveDate,
    /// Rating on the 0-10 scale
    pub value: f64,
}

impl PerformanceSample {
    /// Create a sample
    #[must_use]
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Fits and classifies linear trends
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    /// Create an analyzer with explicit thresholds
    #[must_use]
    pub const fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Points needed for a fit
    #[must_use]
    pub const fn min_points(&self) -> usize {
        self.config.min_points
    }

    /// Fit a trend to `samples`, which need not be sorted
    #[must_use]
    pub fn analyze(&self, samples: &[PerformanceSample]) -> TrendResult {
        let mut sorted = samples.to_vec();
        sorted.sort_by_key(|s| s.date);

        let Some(first) = sorted.first().copied() else {
            return Self::insufficient(0.0);
        };
        if sorted.len() < self.config.min_points {
            let last = sorted.last().map_or(0.0, |s| s.value);
            return Self::insufficient(last);
        }

        let xs: Vec<f64> = sorted
            .iter()
            .map(|s| (s.date - first.date).num_days() as f64)
            .collect();
        let ys: Vec<f64> = sorted.iter().map(|s| s.value).collect();
        let last_x = xs.last().copied().unwrap_or(0.0);

        let n = xs.len() as f64;
        let sum_x: f64 = xs.iter().sum();
        let sum_y: f64 = ys.iter().sum();
        let sum_xy: f64 = xs.iter().zip(&ys).map(|(x, y)| x * y).sum();
        let sum_xx: f64 = xs.iter().map(|x| x * x).sum();

        let denominator = n.mul_add(sum_xx, -(sum_x * sum_x));
        if denominator.abs() < f64::EPSILON {
            // Every sample on the same day: no time axis to fit against
            let intercept = mean(&ys);
            return TrendResult {
                slope: 0.0,
                intercept: round_to(intercept, 2),
                classification: TrendClassification::Stable,
                r_squared: 0.0,
                next_value_prediction: round_to(clamp_rating(intercept), 1),
                insufficient_data: false,
            };
        }

        let slope = n.mul_add(sum_xy, -(sum_x * sum_y)) / denominator;
        let intercept = slope.mul_add(-sum_x, sum_y) / n;

        let mean_y = sum_y / n;
        let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (y - slope.mul_add(*x, intercept)).powi(2))
            .sum();
        let r_squared = if ss_tot == 0.0 {
            0.0
        } else {
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        };

        let prediction = slope.mul_add(last_x + 1.0, intercept);

        TrendResult {
            slope: round_to(slope, 3),
            intercept: round_to(intercept, 2),
            classification: self.classify(slope),
            r_squared: round_to(r_squared, 2),
            next_value_prediction: round_to(clamp_rating(prediction), 1),
            insufficient_data: false,
        }
    }

    fn classify(&self, slope: f64) -> TrendClassification {
        if slope > self.config.slope_threshold {
            TrendClassification::Improving
        } else if slope < -self.config.slope_threshold {
            TrendClassification::Worsening
        } else {
            TrendClassification::Stable
        }
    }

    fn insufficient(last_value: f64) -> TrendResult {
        TrendResult {
            slope: 0.0,
            intercept: 0.0,
            classification: TrendClassification::Stable,
            r_squared: 0.0,
            next_value_prediction: round_to(last_value, 1),
            insufficient_data: true,
        }
    }
}

fn clamp_rating(value: f64) -> f64 {
    value.clamp(MIN_RATING, MAX_RATING)
}
