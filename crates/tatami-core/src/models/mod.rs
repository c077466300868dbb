// ABOUTME: Core data models for athletes, exercises, sessions, analysis results, and recommendations
// ABOUTME: Re-exports every model so consumers can import from `tatami_core::models`
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

/// Trend and anomaly result types
pub mod analysis;
/// Athlete identity, injuries, fitness tests
pub mod athlete;
/// Exercise catalog and performance records
pub mod exercise;
/// Strongly typed identifiers
pub mod ids;
/// Recommendations, audit history, feedback, statistics
pub mod recommendation;
/// Training sessions
pub mod session;

pub use analysis::{
    AnomalyInterpretation, AnomalyResult, PatternSeverity, TrendClassification, TrendResult,
};
pub use athlete::{Athlete, FitnessTestSummary, Injury};
pub use exercise::{CatalogExercise, ExerciseCategory, PerformanceRecord};
pub use ids::{AthleteId, CycleId, ExerciseId, RecommendationId, SessionId, UserId};
pub use recommendation::{
    Amendments, AnalysisFinding, AnalysisPayload, CategoryFinding, ChangeEntry, ExerciseFinding,
    FeedbackEntry, HistoryAction, HistoryEntry, PriorityCounts, Recommendation,
    RecommendationPriority, RecommendationState, RecommendationStats, RecommendationType,
    RejectionFeedback, StateCounts, SuggestedChanges,
};
pub use session::{SessionAdjustments, SessionStatus, TrainingSession};
