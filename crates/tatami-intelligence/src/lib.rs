// ABOUTME: Pure analysis algorithms and recommendation rules for athlete training data
// ABOUTME: Trend fitting, anomaly scoring, problem and pattern detection, rule evaluation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

#![deny(unsafe_code)]

//! # Tatami Intelligence
//!
//! I/O-free analysis used by the service crate. Everything here is a pure
//! function of its inputs, so runs for different athletes can proceed in
//! parallel without shared state.
//!
//! ## Modules
//!
//! - **trend**: linear trend fitting over dated ratings
//! - **anomaly**: z-score anomaly scoring against a baseline
//! - **exercise_analysis**: per-exercise problem detection
//! - **performance_analyzer**: per-category analysis and snapshot assembly
//! - **pattern_detection**: patterns and the attention rollup
//! - **rule_engine**: ordered rules producing recommendation drafts
//! - **config**: tunable thresholds

/// Anomaly scoring
pub mod anomaly;
/// Threshold configuration
pub mod config;
/// Per-exercise statistics and problem detection
pub mod exercise_analysis;
/// Pattern detection
pub mod pattern_detection;
/// Category analysis and snapshot assembly
pub mod performance_analyzer;
/// Rule engine
pub mod rule_engine;
/// Snapshot types
pub mod snapshot;
/// Descriptive statistics helpers
pub mod statistics;
/// Trend analysis
pub mod trend;

#[cfg(test)]
mod test_support;

pub use anomaly::AnomalyScorer;
pub use config::IntelligenceConfig;
pub use exercise_analysis::{ExerciseStats, ProblemDetector};
pub use pattern_detection::{DetectedPattern, PatternDetector, PatternType};
pub use performance_analyzer::{CategoryInput, PerformanceAnalyzer};
pub use rule_engine::{RecommendationDraft, Rule, RuleEngine};
pub use snapshot::{
    AnalysisSnapshot, AnalysisSummary, AnalysisWindow, AthleteRef, ExerciseCategoryPerformance,
    ProblemReason, ProblematicExercise, SubstituteCandidate,
};
pub use trend::{PerformanceSample, TrendAnalyzer};
