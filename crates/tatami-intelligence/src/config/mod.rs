// ABOUTME: Configuration module for the tatami-intelligence crate
// ABOUTME: IntelligenceConfig with defaults, environment overrides, validation, and a global instance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Analysis configuration
//!
//! Every threshold used by trend fitting, anomaly scoring, problem detection,
//! substitute selection, and the rule engine lives here. Defaults reproduce the
//! documented constants; `TATAMI_*` environment variables override them.

/// Configuration error types
pub mod error;
/// Threshold sub-configurations
pub mod thresholds;

pub use error::ConfigError;
pub use thresholds::{
    AnalysisWindowConfig, AnomalyConfig, ProblemDetectionConfig, RuleThresholds,
    SubstituteConfig, TrendConfig,
};

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

/// Global configuration singleton
static INTELLIGENCE_CONFIG: OnceLock<IntelligenceConfig> = OnceLock::new();

/// Main intelligence configuration container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntelligenceConfig {
    /// Trend fitting
    pub trend: TrendConfig,
    /// Anomaly scoring
    pub anomaly: AnomalyConfig,
    /// Per-exercise problem detection
    pub problems: ProblemDetectionConfig,
    /// Substitute exercise selection
    pub substitutes: SubstituteConfig,
    /// Windows and output caps
    pub windows: AnalysisWindowConfig,
    /// Category pattern and rule thresholds
    pub rules: RuleThresholds,
}

impl IntelligenceConfig {
    /// Get the global configuration instance
    pub fn global() -> &'static Self {
        INTELLIGENCE_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                warn!("Failed to load intelligence config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Load configuration from defaults plus environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values or validation fails
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::default().apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        env_override("TATAMI_TREND_SLOPE_THRESHOLD", &mut self.trend.slope_threshold)?;
        env_override(
            "TATAMI_TREND_CONFIDENT_R_SQUARED",
            &mut self.trend.confident_r_squared,
        )?;
        env_override("TATAMI_ANOMALY_ALERT_Z", &mut self.anomaly.alert_z)?;
        env_override("TATAMI_ANOMALY_CRITICAL_Z", &mut self.anomaly.critical_z)?;
        env_override(
            "TATAMI_ANOMALY_BASELINE_DAYS",
            &mut self.windows.anomaly_baseline_days,
        )?;
        env_override("TATAMI_PROBLEM_LOW_AVERAGE", &mut self.problems.low_average)?;
        env_override(
            "TATAMI_PROBLEM_VERY_LOW_AVERAGE",
            &mut self.problems.very_low_average,
        )?;
        env_override(
            "TATAMI_PROBLEM_MIN_ASSIGNMENTS",
            &mut self.problems.min_assignments,
        )?;
        env_override(
            "TATAMI_PROBLEM_INCOMPLETE_THRESHOLD",
            &mut self.problems.incomplete_threshold,
        )?;
        env_override("TATAMI_SUBSTITUTE_LIMIT", &mut self.substitutes.limit)?;
        env_override("TATAMI_PROBLEMATIC_CAP", &mut self.windows.problematic_cap)?;
        env_override("TATAMI_MIN_RECORDS", &mut self.windows.min_records)?;
        Ok(self)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error when thresholds are inconsistent with each other
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trend.slope_threshold < 0.0 {
            return Err(ConfigError::ValueOutOfRange(
                "trend slope_threshold must be >= 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.trend.confident_r_squared) {
            return Err(ConfigError::ValueOutOfRange(
                "trend confident_r_squared must be within [0, 1]",
            ));
        }
        if self.anomaly.alert_z <= 0.0 || self.anomaly.alert_z >= self.anomaly.critical_z {
            return Err(ConfigError::InvalidRange(
                "anomaly alert_z must be > 0 and < critical_z",
            ));
        }
        if self.anomaly.min_history < 2 {
            return Err(ConfigError::ValueOutOfRange(
                "anomaly min_history must be >= 2 for a sample standard deviation",
            ));
        }
        if self.problems.very_low_average >= self.problems.low_average {
            return Err(ConfigError::InvalidRange(
                "problem very_low_average must be < low_average",
            ));
        }
        if self.windows.default_window_days == 0 || self.windows.anomaly_baseline_days == 0 {
            return Err(ConfigError::ValueOutOfRange(
                "analysis windows must be at least one day",
            ));
        }
        if self.substitutes.limit == 0 || self.windows.problematic_cap == 0 {
            return Err(ConfigError::ValueOutOfRange(
                "substitute limit and problematic cap must be positive",
            ));
        }
        let s = &self.substitutes;
        if s.low_score_threshold >= s.mid_score_threshold
            || s.low_score_ceiling > s.mid_score_ceiling
            || s.mid_score_ceiling > s.high_score_ceiling
        {
            return Err(ConfigError::InvalidRange(
                "substitute score thresholds and ceilings must be ascending",
            ));
        }
        Ok(())
    }
}

fn env_override<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(raw) = env::var(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Parse(format!("{key}={raw}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(IntelligenceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_anomaly_thresholds_rejected() {
        let mut config = IntelligenceConfig::default();
        config.anomaly.alert_z = 2.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_ceiling_for_score() {
        let substitutes = SubstituteConfig::default();
        assert_eq!(substitutes.ceiling_for_score(Some(2.0)), 2);
        assert_eq!(substitutes.ceiling_for_score(Some(5.5)), 3);
        assert_eq!(substitutes.ceiling_for_score(Some(9.0)), 5);
        assert_eq!(substitutes.ceiling_for_score(None), 3);
    }
}
