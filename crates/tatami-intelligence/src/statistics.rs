// ABOUTME: Small descriptive statistics helpers shared by trend and anomaly analysis
// ABOUTME: Mean, sample standard deviation, and presentation rounding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(clippy::cast_precision_loss)] // Safe: sample sizes are small

/// Arithmetic mean, `0.0` for an empty slice
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divides by `n - 1`), `0.0` below two values
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let sum_sq = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Round half away from zero to `decimals` places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
