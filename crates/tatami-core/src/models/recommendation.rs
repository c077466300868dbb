// ABOUTME: Recommendation entity, lifecycle states, audit history, and feedback models
// ABOUTME: Encodes the allowed state transitions and the typed analysis/amendment payloads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::analysis::{AnomalyResult, PatternSeverity, TrendResult};
use super::exercise::ExerciseCategory;
use super::ids::{AthleteId, CycleId, ExerciseId, RecommendationId, SessionId, UserId};
use super::session::SessionAdjustments;
use crate::constants::states;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a persisted recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationState {
    /// Created, waiting for a reviewer
    Pending,
    /// Picked up by a reviewer
    InReview,
    /// Approved as suggested (terminal)
    Fulfilled,
    /// Rejected (terminal)
    Rejected,
    /// Applied with amendments (terminal)
    Amended,
}

impl RecommendationState {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => states::PENDING,
            Self::InReview => states::IN_REVIEW,
            Self::Fulfilled => states::FULFILLED,
            Self::Rejected => states::REJECTED,
            Self::Amended => states::AMENDED,
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            states::PENDING => Some(Self::Pending),
            states::IN_REVIEW => Some(Self::InReview),
            states::FULFILLED => Some(Self::Fulfilled),
            states::REJECTED => Some(Self::Rejected),
            states::AMENDED => Some(Self::Amended),
            _ => None,
        }
    }

    /// States reachable in one step from this state
    #[must_use]
    pub const fn allowed_targets(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InReview],
            Self::InReview => &[Self::Fulfilled, Self::Rejected, Self::Amended],
            Self::Fulfilled | Self::Rejected | Self::Amended => &[],
        }
    }

    /// Whether `target` is reachable in one step
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// No further transitions are possible
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected | Self::Amended)
    }

    /// Still waiting for a decision
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InReview)
    }
}

impl fmt::Display for RecommendationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationPriority {
    /// Informational
    Low,
    /// Should be reviewed this cycle
    Medium,
    /// Should be reviewed soon
    High,
    /// Should be reviewed immediately
    Critical,
}

impl RecommendationPriority {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl From<PatternSeverity> for RecommendationPriority {
    fn from(severity: PatternSeverity) -> Self {
        match severity {
            PatternSeverity::Low => Self::Low,
            PatternSeverity::Medium => Self::Medium,
            PatternSeverity::High => Self::High,
            PatternSeverity::Critical => Self::Critical,
        }
    }
}

/// Kind of advice a recommendation carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    /// Cut load in a category whose ratings collapsed against the athlete's baseline
    LoadReduction,
    /// Rebalance a category that is underperforming overall
    CategoryRebalance,
    /// Intervene on a confident downward trend
    TrendIntervention,
    /// Replace or regress a single exercise that keeps failing
    ExerciseAdjustment,
    /// Progress a category that is clearly improving
    Progression,
}

impl RecommendationType {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LoadReduction => "load_reduction",
            Self::CategoryRebalance => "category_rebalance",
            Self::TrendIntervention => "trend_intervention",
            Self::ExerciseAdjustment => "exercise_adjustment",
            Self::Progression => "progression",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "load_reduction" => Some(Self::LoadReduction),
            "category_rebalance" => Some(Self::CategoryRebalance),
            "trend_intervention" => Some(Self::TrendIntervention),
            "exercise_adjustment" => Some(Self::ExerciseAdjustment),
            "progression" => Some(Self::Progression),
            _ => None,
        }
    }
}

/// One concrete change inside a recommendation's suggested changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Exercise the change refers to, when it targets a concrete exercise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<ExerciseId>,
    /// Exercise or block name
    pub name: String,
    /// Category the change applies to
    pub category: ExerciseCategory,
    /// What to do, in plain words
    pub detail: String,
}

/// Suggested plan changes grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedChanges {
    /// Exercises to reduce or remove
    #[serde(default)]
    pub reduce: Vec<ChangeEntry>,
    /// Exercises to add
    #[serde(default)]
    pub add: Vec<ChangeEntry>,
    /// Exercises or blocks to modify
    #[serde(default)]
    pub modify: Vec<ChangeEntry>,
}

impl SuggestedChanges {
    /// No change of any kind
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reduce.is_empty() && self.add.is_empty() && self.modify.is_empty()
    }
}

/// Category-level numbers that triggered a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFinding {
    /// Category analysed
    pub category: ExerciseCategory,
    /// Average rating in the analysis window
    pub average_rating: f64,
    /// Rated records in the analysis window
    pub sample_count: usize,
    /// Baseline comparison
    pub anomaly: AnomalyResult,
    /// Trend over the window
    pub trend: TrendResult,
    /// Exercises flagged as problematic in this category
    #[serde(default)]
    pub problematic_exercise_ids: Vec<ExerciseId>,
}

/// Exercise-level numbers that triggered a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseFinding {
    /// Exercise analysed
    pub exercise_id: ExerciseId,
    /// Exercise name
    pub exercise_name: String,
    /// Exercise category
    pub category: ExerciseCategory,
    /// Average rating over rated occurrences, absent when none were rated
    pub average_rating: Option<f64>,
    /// Times the exercise was assigned
    pub times_assigned: u32,
    /// Times the exercise was completed
    pub times_completed: u32,
    /// Times the exercise was not completed
    pub times_incomplete: u32,
}

/// Snapshot excerpt that justified a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AnalysisFinding {
    /// Triggered by category statistics
    Category(CategoryFinding),
    /// Triggered by a single exercise
    Exercise(ExerciseFinding),
}

/// Reviewer feedback captured when a recommendation is rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionFeedback {
    /// Why the reviewer rejected the recommendation
    pub reason: Option<String>,
    /// What the reviewer would have done instead
    pub alternative_action: Option<String>,
    /// Reviewer who rejected
    pub rejected_by: UserId,
    /// When the rejection was committed
    pub rejected_at: DateTime<Utc>,
    /// Sessions deleted as the compensating action
    pub deleted_session_count: u32,
}

/// Structured audit payload stored with each recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    /// Rule that produced the recommendation
    pub rule: String,
    /// Primary analysis window in days
    pub window_days: u32,
    /// When the analysis ran
    pub analyzed_at: DateTime<Utc>,
    /// Numbers behind the recommendation
    pub finding: AnalysisFinding,
    /// Rejection feedback, present once the recommendation has been rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<RejectionFeedback>,
}

/// Reviewer amendments stored verbatim on an amended recommendation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amendments {
    /// Adjustments to the generated session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionAdjustments>,
    /// Replacement plan changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<SuggestedChanges>,
    /// Free-text instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A persisted recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Unique identifier
    pub id: RecommendationId,
    /// Athlete the recommendation is about
    pub athlete_id: AthleteId,
    /// Affected training cycle
    pub cycle_id: Option<CycleId>,
    /// Kind of advice
    pub recommendation_type: RecommendationType,
    /// Urgency
    pub priority: RecommendationPriority,
    /// Short title
    pub title: String,
    /// Human-readable explanation
    pub message: String,
    /// What the reviewer is asked to do
    pub suggested_action: String,
    /// Audit payload
    pub analysis: AnalysisPayload,
    /// Suggested plan changes
    pub suggested_changes: SuggestedChanges,
    /// Lifecycle state
    pub state: RecommendationState,
    /// Reviewer who started the review
    pub reviewer_id: Option<UserId>,
    /// When the review started
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewer comment, rejection reason, or amendment justification
    pub review_comment: Option<String>,
    /// Who applied the decision
    pub applied_by: Option<UserId>,
    /// When the decision was applied
    pub applied_at: Option<DateTime<Utc>>,
    /// Amendments, for amended recommendations
    pub amendments: Option<Amendments>,
    /// Session generated for this recommendation
    pub generated_session_id: Option<SessionId>,
    /// Existing sessions affected by this recommendation
    pub affected_session_ids: Vec<SessionId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Recommendation {
    /// Every session id this recommendation references
    #[must_use]
    pub fn session_references(&self) -> Vec<SessionId> {
        self.generated_session_id
            .into_iter()
            .chain(self.affected_session_ids.iter().copied())
            .collect()
    }
}

/// Action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    /// Review started
    InReview,
    /// Approved as suggested
    Approved,
    /// Rejected
    Rejected,
    /// Applied with amendments
    Amended,
}

impl HistoryAction {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InReview => "IN_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Amended => "AMENDED",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_REVIEW" => Some(Self::InReview),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "AMENDED" => Some(Self::Amended),
            _ => None,
        }
    }
}

/// Append-only audit record of one state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Storage key (insertion order)
    pub id: i64,
    /// Recommendation the entry belongs to
    pub recommendation_id: RecommendationId,
    /// State before the transition
    pub previous_state: RecommendationState,
    /// State after the transition
    pub new_state: RecommendationState,
    /// Who performed the transition
    pub actor_id: UserId,
    /// What was done
    pub action: HistoryAction,
    /// Free-text comment
    pub comment: Option<String>,
    /// Schema-less forensic data
    pub extra_data: Option<serde_json::Map<String, serde_json::Value>>,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// A rejected recommendation's feedback, for manual rule tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// Rejected recommendation
    pub recommendation_id: RecommendationId,
    /// Athlete concerned
    pub athlete_id: AthleteId,
    /// Kind of advice that was rejected
    pub recommendation_type: RecommendationType,
    /// Rule that produced it
    pub rule: String,
    /// Title of the rejected recommendation
    pub title: String,
    /// Stored feedback
    pub feedback: RejectionFeedback,
}

/// Recommendation counts per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCounts {
    /// Waiting for review
    pub pending: u64,
    /// Under review
    pub in_review: u64,
    /// Approved
    pub fulfilled: u64,
    /// Rejected
    pub rejected: u64,
    /// Amended
    pub amended: u64,
}

impl StateCounts {
    /// Add one recommendation in `state`
    pub fn add(&mut self, state: RecommendationState, count: u64) {
        match state {
            RecommendationState::Pending => self.pending += count,
            RecommendationState::InReview => self.in_review += count,
            RecommendationState::Fulfilled => self.fulfilled += count,
            RecommendationState::Rejected => self.rejected += count,
            RecommendationState::Amended => self.amended += count,
        }
    }

    /// All recommendations
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending + self.in_review + self.fulfilled + self.rejected + self.amended
    }

    /// Percentage of decided recommendations that were accepted (approved or amended), rounded
    #[must_use]
    pub fn approval_rate(&self) -> f64 {
        let accepted = self.fulfilled + self.amended;
        percentage(accepted, accepted + self.rejected)
    }

    /// Percentage of accepted recommendations that needed amendments, rounded
    #[must_use]
    pub fn amendment_rate(&self) -> f64 {
        percentage(self.amended, self.fulfilled + self.amended)
    }
}

fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64 * 100.0).round()
}

/// Open recommendation counts per priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    /// Critical
    pub critical: u64,
    /// High
    pub high: u64,
    /// Medium
    pub medium: u64,
    /// Low
    pub low: u64,
}

impl PriorityCounts {
    /// Add `count` recommendations of `priority`
    pub fn add(&mut self, priority: RecommendationPriority, count: u64) {
        match priority {
            RecommendationPriority::Critical => self.critical += count,
            RecommendationPriority::High => self.high += count,
            RecommendationPriority::Medium => self.medium += count,
            RecommendationPriority::Low => self.low += count,
        }
    }
}

/// Workflow statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationStats {
    /// Total recommendations
    pub total: u64,
    /// Counts by state
    pub by_state: StateCounts,
    /// Priority breakdown of PENDING + `IN_REVIEW` recommendations
    pub open_by_priority: PriorityCounts,
    /// `(fulfilled + amended) / (fulfilled + amended + rejected) * 100`, rounded
    pub approval_rate: f64,
    /// `amended / (fulfilled + amended) * 100`, rounded
    pub amendment_rate: f64,
}

impl RecommendationStats {
    /// Derive rates from raw counts
    #[must_use]
    pub fn from_counts(by_state: StateCounts, open_by_priority: PriorityCounts) -> Self {
        Self {
            total: by_state.total(),
            by_state,
            open_by_priority,
            approval_rate: by_state.approval_rate(),
            amendment_rate: by_state.amendment_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use RecommendationState::{Amended, Fulfilled, InReview, Pending, Rejected};

        assert!(Pending.can_transition_to(InReview));
        for target in [Pending, Fulfilled, Rejected, Amended] {
            assert!(!Pending.can_transition_to(target));
        }
        for target in [Fulfilled, Rejected, Amended] {
            assert!(InReview.can_transition_to(target));
        }
        assert!(!InReview.can_transition_to(Pending));
        for terminal in [Fulfilled, Rejected, Amended] {
            assert!(terminal.is_terminal());
            assert!(terminal.allowed_targets().is_empty());
        }
    }

    #[test]
    fn test_rates_with_no_decisions_are_zero() {
        let counts = StateCounts {
            pending: 4,
            in_review: 1,
            ..StateCounts::default()
        };
        assert!(counts.approval_rate().abs() < f64::EPSILON);
        assert!(counts.amendment_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_rates_are_rounded_percentages() {
        let counts = StateCounts {
            fulfilled: 1,
            amended: 1,
            rejected: 1,
            ..StateCounts::default()
        };
        // 2/3 = 66.67% -> 67
        assert!((counts.approval_rate() - 67.0).abs() < f64::EPSILON);
        assert!((counts.amendment_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_state_round_trip_through_storage_names() {
        for state in [
            RecommendationState::Pending,
            RecommendationState::InReview,
            RecommendationState::Fulfilled,
            RecommendationState::Rejected,
            RecommendationState::Amended,
        ] {
            assert_eq!(RecommendationState::parse(state.as_str()), Some(state));
        }
        assert_eq!(RecommendationState::parse("DRAFT"), None);
    }
}
