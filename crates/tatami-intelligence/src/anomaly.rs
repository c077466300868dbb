// ABOUTME: Z-score anomaly scoring of a current aggregate against an athlete's own history
// ABOUTME: Sample standard deviation baseline with alert and critical severity buckets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use crate::config::AnomalyConfig;
use crate::statistics::{mean, round_to, sample_std_dev};
use tatami_core::models::{AnomalyInterpretation, AnomalyResult};

/// Scores how far a current value deviates from a historical baseline
#[derive(Debug, Clone, Default)]
pub struct AnomalyScorer {
    config: AnomalyConfig,
}

impl AnomalyScorer {
    /// Create a scorer with explicit thresholds
    #[must_use]
    pub const fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Score `current` against `history`
    ///
    /// Short or zero-variance histories yield a `NORMAL` result rather than an error.
    #[must_use]
    pub fn score(&self, current: f64, history: &[f64]) -> AnomalyResult {
        if history.len() < self.config.min_history {
            return AnomalyResult {
                current_value: current,
                mean: round_to(mean(history), 2),
                std_dev: 0.0,
                z_score: 0.0,
                interpretation: AnomalyInterpretation::Normal,
                insufficient_data: true,
            };
        }

        let avg = mean(history);
        let std_dev = sample_std_dev(history);
        if is_negligible_spread(std_dev, avg) {
            return AnomalyResult {
                current_value: current,
                mean: round_to(avg, 2),
                std_dev: 0.0,
                z_score: 0.0,
                interpretation: AnomalyInterpretation::Normal,
                insufficient_data: false,
            };
        }

        let z_score = (current - avg) / std_dev;
        AnomalyResult {
            current_value: current,
            mean: round_to(avg, 2),
            std_dev: round_to(std_dev, 2),
            z_score: round_to(z_score, 2),
            interpretation: self.interpret(z_score),
            insufficient_data: false,
        }
    }

    /// Bucket a z-score; the first matching threshold wins
    #[must_use]
    pub fn interpret(&self, z_score: f64) -> AnomalyInterpretation {
        let AnomalyConfig {
            alert_z,
            critical_z,
            ..
        } = self.config;
        if z_score >= critical_z {
            AnomalyInterpretation::CriticalHigh
        } else if z_score >= alert_z {
            AnomalyInterpretation::AlertHigh
        } else if z_score <= -critical_z {
            AnomalyInterpretation::CriticalLow
        } else if z_score <= -alert_z {
            AnomalyInterpretation::AlertLow
        } else {
            AnomalyInterpretation::Normal
        }
    }
}

/// Identical decimal ratings leave rounding noise around 1e-15 instead of an exact zero
fn is_negligible_spread(std_dev: f64, avg: f64) -> bool {
    std_dev <= f64::EPSILON * avg.abs().max(1.0) * 16.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_is_insufficient() {
        let scorer = AnomalyScorer::default();
        for history in [&[][..], &[5.0][..], &[5.0, 9.0][..]] {
            let result = scorer.score(1.0, history);
            assert!(result.insufficient_data);
            assert!(result.z_score.abs() < f64::EPSILON);
            assert_eq!(result.interpretation, AnomalyInterpretation::Normal);
        }
    }

    #[test]
    fn test_identical_history_takes_degenerate_path() {
        let scorer = AnomalyScorer::default();

        let low = scorer.score(2.0, &[5.0, 5.0, 5.0]);
        assert!(!low.insufficient_data);
        assert!(low.std_dev.abs() < f64::EPSILON);
        assert!(low.z_score.abs() < f64::EPSILON);
        assert_eq!(low.interpretation, AnomalyInterpretation::Normal);

        let high = scorer.score(9.0, &[5.0, 5.0, 5.0, 5.0, 5.0]);
        assert!(!high.insufficient_data);
        assert_eq!(high.interpretation, AnomalyInterpretation::Normal);
        assert!((high.mean - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_identical_decimal_history_is_normal() {
        let scorer = AnomalyScorer::default();
        for (current, history) in [(2.0, &[7.3; 7][..]), (9.0, &[0.1; 3][..]), (6.1, &[6.1; 4][..])] {
            let result = scorer.score(current, history);
            assert!(!result.insufficient_data);
            assert!(result.std_dev.abs() < f64::EPSILON);
            assert!(result.z_score.abs() < f64::EPSILON);
            assert_eq!(result.interpretation, AnomalyInterpretation::Normal);
        }
    }

    #[test]
    fn test_small_real_spread_still_scores() {
        // mean 5.0, sample std 0.1 -> z = -3
        let result = AnomalyScorer::default().score(4.7, &[4.9, 5.0, 5.1]);
        assert!(!result.insufficient_data);
        assert_eq!(result.interpretation, AnomalyInterpretation::CriticalLow);
    }

    #[test]
    fn test_uses_sample_standard_deviation() {
        // mean 6, sample std 2 (population std would be ~1.63)
        let result = AnomalyScorer::default().score(2.0, &[4.0, 6.0, 8.0]);
        assert!((result.mean - 6.0).abs() < f64::EPSILON);
        assert!((result.std_dev - 2.0).abs() < f64::EPSILON);
        assert!((result.z_score - -2.0).abs() < f64::EPSILON);
        assert_eq!(result.interpretation, AnomalyInterpretation::CriticalLow);
    }

    #[test]
    fn test_threshold_buckets() {
        let scorer = AnomalyScorer::default();
        assert_eq!(scorer.interpret(2.0), AnomalyInterpretation::CriticalHigh);
        assert_eq!(scorer.interpret(1.5), AnomalyInterpretation::AlertHigh);
        assert_eq!(scorer.interpret(1.49), AnomalyInterpretation::Normal);
        assert_eq!(scorer.interpret(0.0), AnomalyInterpretation::Normal);
        assert_eq!(scorer.interpret(-1.5), AnomalyInterpretation::AlertLow);
        assert_eq!(scorer.interpret(-1.99), AnomalyInterpretation::AlertLow);
        assert_eq!(scorer.interpret(-2.0), AnomalyInterpretation::CriticalLow);
    }

    #[test]
    fn test_alert_high() {
        // mean 6, std 2 -> z = 1.75
        let result = AnomalyScorer::default().score(9.5, &[4.0, 6.0, 8.0]);
        assert_eq!(result.interpretation, AnomalyInterpretation::AlertHigh);
        assert!((result.z_score - 1.75).abs() < f64::EPSILON);
    }
}
