// ABOUTME: Forward-chaining rule engine turning analysis snapshots into recommendation drafts
// ABOUTME: Ordered rule descriptors, every satisfied rule fires, failing rules are isolated
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Rule engine
//!
//! Rules are evaluated in a fixed order (critical, high, high, medium, low) and
//! all of them fire when their condition holds. A rule fires once per matching
//! category or exercise, so one snapshot can yield several drafts per rule.
//! A rule that returns an error or panics is logged and skipped.

use crate::config::IntelligenceConfig;
use crate::snapshot::{
    AnalysisSnapshot, ExerciseCategoryPerformance, ProblematicExercise, SubstituteCandidate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tatami_core::errors::{AppError, AppResult};
use tatami_core::models::{
    AnalysisFinding, AnalysisPayload, AnomalyInterpretation, ChangeEntry, RecommendationPriority,
    RecommendationType, SuggestedChanges, TrendClassification,
};
use tracing::{debug, warn};

/// Rule names in evaluation order
pub mod names {
    /// Category average far below its own baseline
    pub const CRITICAL_ANOMALY: &str = "critical_anomaly";
    /// Category average below the acceptable level
    pub const LOW_CATEGORY_PERFORMANCE: &str = "low_category_performance";
    /// Confident downward trend in a category
    pub const NEGATIVE_TREND: &str = "negative_trend";
    /// Exercise repeatedly left incomplete
    pub const RECURRING_FAILURE: &str = "recurring_failure";
    /// Category well above baseline and improving
    pub const NOTABLE_IMPROVEMENT: &str = "notable_improvement";
}

/// Output of one rule firing, before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDraft {
    /// Rule that produced the draft
    pub rule: String,
    /// Recommendation kind
    pub recommendation_type: RecommendationType,
    /// Priority
    pub priority: RecommendationPriority,
    /// Short title
    pub title: String,
    /// Message built from snapshot numbers
    pub message: String,
    /// What the reviewer is asked to do
    pub suggested_action: String,
    /// Structured exercise changes
    pub suggested_changes: SuggestedChanges,
    /// Audit payload
    pub analysis: AnalysisPayload,
}

type Condition = Box<dyn Fn(&AnalysisSnapshot) -> bool + Send + Sync>;
type Action = Box<dyn Fn(&AnalysisSnapshot) -> AppResult<Vec<RecommendationDraft>> + Send + Sync>;

/// A condition/action pair with its priority
pub struct Rule {
    name: &'static str,
    priority: RecommendationPriority,
    condition: Condition,
    action: Action,
}

impl Rule {
    /// Create a rule descriptor
    pub fn new<C, A>(
        name: &'static str,
        priority: RecommendationPriority,
        condition: C,
        action: A,
    ) -> Self
    where
        C: Fn(&AnalysisSnapshot) -> bool + Send + Sync + 'static,
        A: Fn(&AnalysisSnapshot) -> AppResult<Vec<RecommendationDraft>> + Send + Sync + 'static,
    {
        Self {
            name,
            priority,
            condition: Box::new(condition),
            action: Box::new(action),
        }
    }

    /// Rule name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Rule priority
    #[must_use]
    pub const fn priority(&self) -> RecommendationPriority {
        self.priority
    }

    fn fire(&self, snapshot: &AnalysisSnapshot) -> AppResult<Vec<RecommendationDraft>> {
        if (self.condition)(snapshot) {
            (self.action)(snapshot)
        } else {
            Ok(Vec::new())
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Thresholds the canonical rules read
#[derive(Debug, Clone, Copy)]
struct RuleParams {
    low_category_average: f64,
    min_category_samples: usize,
    confident_r_squared: f64,
    incomplete_threshold: u32,
}

impl RuleParams {
    const fn from_config(config: &IntelligenceConfig) -> Self {
        Self {
            low_category_average: config.rules.low_category_average,
            min_category_samples: config.rules.min_category_samples,
            confident_r_squared: config.trend.confident_r_squared,
            incomplete_threshold: config.problems.incomplete_threshold,
        }
    }

    fn is_low_performance(self, c: &ExerciseCategoryPerformance) -> bool {
        c.average_rating < self.low_category_average && c.sample_count >= self.min_category_samples
    }

    fn is_negative_trend(self, c: &ExerciseCategoryPerformance) -> bool {
        c.trend.is_confidently_worsening(self.confident_r_squared)
    }

    fn is_recurring_failure(self, p: &ProblematicExercise) -> bool {
        p.times_incomplete >= self.incomplete_threshold
    }
}

fn is_critical_anomaly(c: &ExerciseCategoryPerformance) -> bool {
    c.anomaly.interpretation == AnomalyInterpretation::CriticalLow
}

fn is_notable_improvement(c: &ExerciseCategoryPerformance) -> bool {
    c.anomaly.interpretation.is_high() && c.trend.classification == TrendClassification::Improving
}

/// Evaluates the ordered rule list against a snapshot
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::from_config(&IntelligenceConfig::default())
    }
}

impl RuleEngine {
    /// Engine with the canonical rules in priority order
    #[must_use]
    pub fn from_config(config: &IntelligenceConfig) -> Self {
        Self {
            rules: canonical_rules(RuleParams::from_config(config)),
        }
    }

    /// Engine with the canonical rules followed by `extra`
    #[must_use]
    pub fn with_rules(config: &IntelligenceConfig, extra: Vec<Rule>) -> Self {
        let mut engine = Self::from_config(config);
        engine.rules.extend(extra);
        engine
    }

    /// Rule names in evaluation order
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Fire every satisfied rule; a failing rule is logged and skipped
    #[must_use]
    pub fn evaluate(&self, snapshot: &AnalysisSnapshot) -> Vec<RecommendationDraft> {
        let mut drafts = Vec::new();
        for rule in &self.rules {
            match panic::catch_unwind(AssertUnwindSafe(|| rule.fire(snapshot))) {
                Ok(Ok(fired)) => {
                    if !fired.is_empty() {
                        debug!(rule = rule.name, count = fired.len(), "rule fired");
                    }
                    drafts.extend(fired);
                }
                Ok(Err(e)) => {
                    warn!(rule = rule.name, athlete_id = %snapshot.athlete.id, error = %e, "rule evaluation failed, continuing");
                }
                Err(_) => {
                    warn!(rule = rule.name, athlete_id = %snapshot.athlete.id, "rule panicked, continuing");
                }
            }
        }
        drafts
    }
}

fn canonical_rules(params: RuleParams) -> Vec<Rule> {
    vec![
        Rule::new(
            names::CRITICAL_ANOMALY,
            RecommendationPriority::Critical,
            |s| s.categories.iter().any(is_critical_anomaly),
            |s| {
                Ok(matching_categories(s, is_critical_anomaly)
                    .map(|c| critical_anomaly_draft(s, c))
                    .collect())
            },
        ),
        Rule::new(
            names::LOW_CATEGORY_PERFORMANCE,
            RecommendationPriority::High,
            move |s| s.categories.iter().any(|c| params.is_low_performance(c)),
            move |s| {
                Ok(matching_categories(s, move |c| params.is_low_performance(c))
                    .map(|c| low_performance_draft(s, c, params))
                    .collect())
            },
        ),
        Rule::new(
            names::NEGATIVE_TREND,
            RecommendationPriority::High,
            move |s| s.categories.iter().any(|c| params.is_negative_trend(c)),
            move |s| {
                Ok(matching_categories(s, move |c| params.is_negative_trend(c))
                    .map(|c| negative_trend_draft(s, c))
                    .collect())
            },
        ),
        Rule::new(
            names::RECURRING_FAILURE,
            RecommendationPriority::Medium,
            // Per-category lists: the flattened list is capped and would drop
            // unrated failures that pattern detection still reports
            move |s| all_problems(s).any(|p| params.is_recurring_failure(p)),
            move |s| {
                all_problems(s)
                    .filter(|p| params.is_recurring_failure(p))
                    .map(|p| recurring_failure_draft(s, p))
                    .collect()
            },
        ),
        Rule::new(
            names::NOTABLE_IMPROVEMENT,
            RecommendationPriority::Low,
            |s| s.categories.iter().any(is_notable_improvement),
            |s| {
                Ok(matching_categories(s, is_notable_improvement)
                    .map(|c| improvement_draft(s, c))
                    .collect())
            },
        ),
    ]
}

fn matching_categories<'a, F>(
    snapshot: &'a AnalysisSnapshot,
    predicate: F,
) -> impl Iterator<Item = &'a ExerciseCategoryPerformance> + 'a
where
    F: Fn(&ExerciseCategoryPerformance) -> bool + 'a,
{
    snapshot.categories.iter().filter(move |c| predicate(*c))
}

fn all_problems(snapshot: &AnalysisSnapshot) -> impl Iterator<Item = &ProblematicExercise> {
    snapshot
        .categories
        .iter()
        .flat_map(|c| c.problematic_exercises.iter())
}

fn payload(snapshot: &AnalysisSnapshot, rule: &str, finding: AnalysisFinding) -> AnalysisPayload {
    AnalysisPayload {
        rule: rule.to_owned(),
        window_days: snapshot.window.days,
        analyzed_at: snapshot.analyzed_at,
        finding,
        feedback: None,
    }
}

fn problem_entry(problem: &ProblematicExercise, detail: impl Into<String>) -> ChangeEntry {
    ChangeEntry {
        exercise_id: Some(problem.exercise_id),
        name: problem.name.clone(),
        category: problem.category,
        detail: detail.into(),
    }
}

fn substitute_entry(candidate: &SubstituteCandidate, replaces: Option<&str>) -> ChangeEntry {
    let detail = replaces.map_or_else(
        || format!("Introduce at difficulty {}", candidate.difficulty),
        |name| format!("Substitute for {name} at difficulty {}", candidate.difficulty),
    );
    ChangeEntry {
        exercise_id: Some(candidate.exercise_id),
        name: candidate.name.clone(),
        category: candidate.category,
        detail,
    }
}

/// Category-level plus per-exercise substitutes, first occurrence of each exercise kept
fn substitutes_for(category: &ExerciseCategoryPerformance) -> Vec<ChangeEntry> {
    let mut entries: Vec<ChangeEntry> = Vec::new();
    let per_exercise = category.problematic_exercises.iter().flat_map(|p| {
        p.substitute_candidates
            .iter()
            .map(move |c| substitute_entry(c, Some(&p.name)))
    });
    let category_level = category
        .substitute_candidates
        .iter()
        .map(|c| substitute_entry(c, None));
    for entry in per_exercise.chain(category_level) {
        if !entries.iter().any(|e| e.exercise_id == entry.exercise_id) {
            entries.push(entry);
        }
    }
    entries
}

fn critical_anomaly_draft(
    snapshot: &AnalysisSnapshot,
    c: &ExerciseCategoryPerformance,
) -> RecommendationDraft {
    let label = c.category.label();
    RecommendationDraft {
        rule: names::CRITICAL_ANOMALY.to_owned(),
        recommendation_type: RecommendationType::LoadReduction,
        priority: RecommendationPriority::Critical,
        title: format!("Critical drop in {label}"),
        message: format!(
            "{} averaged {:.1} in {} rated records over the last {} days, against a baseline of {:.1} \u{b1} {:.1} (z-score {:.2}).",
            capitalize(label),
            c.average_rating,
            c.sample_count,
            snapshot.window.days,
            c.anomaly.mean,
            c.anomaly.std_dev,
            c.anomaly.z_score
        ),
        suggested_action: format!(
            "Reduce {label} load for the coming sessions and check for fatigue or injury before progressing again."
        ),
        suggested_changes: SuggestedChanges {
            reduce: c
                .problematic_exercises
                .iter()
                .map(|p| problem_entry(p, "Reduce volume and intensity"))
                .collect(),
            add: substitutes_for(c),
            modify: Vec::new(),
        },
        analysis: payload(
            snapshot,
            names::CRITICAL_ANOMALY,
            AnalysisFinding::Category(c.finding()),
        ),
    }
}

fn low_performance_draft(
    snapshot: &AnalysisSnapshot,
    c: &ExerciseCategoryPerformance,
    params: RuleParams,
) -> RecommendationDraft {
    let label = c.category.label();
    RecommendationDraft {
        rule: names::LOW_CATEGORY_PERFORMANCE.to_owned(),
        recommendation_type: RecommendationType::CategoryRebalance,
        priority: RecommendationPriority::High,
        title: format!("Low {label} performance"),
        message: format!(
            "{} averaged {:.1} across {} rated records, below the target of {:.1}. {} exercise(s) in this category were flagged.",
            capitalize(label),
            c.average_rating,
            c.sample_count,
            params.low_category_average,
            c.problematic_exercises.len()
        ),
        suggested_action: format!(
            "Rebalance the {label} block: regress the flagged exercises and introduce easier variations."
        ),
        suggested_changes: SuggestedChanges {
            reduce: Vec::new(),
            add: substitutes_for(c),
            modify: c
                .problematic_exercises
                .iter()
                .map(|p| problem_entry(p, "Regress to an easier variation"))
                .collect(),
        },
        analysis: payload(
            snapshot,
            names::LOW_CATEGORY_PERFORMANCE,
            AnalysisFinding::Category(c.finding()),
        ),
    }
}

fn negative_trend_draft(
    snapshot: &AnalysisSnapshot,
    c: &ExerciseCategoryPerformance,
) -> RecommendationDraft {
    let label = c.category.label();
    RecommendationDraft {
        rule: names::NEGATIVE_TREND.to_owned(),
        recommendation_type: RecommendationType::TrendIntervention,
        priority: RecommendationPriority::High,
        title: format!("Declining {label} trend"),
        message: format!(
            "{} ratings are falling by {:.3} per day (R\u{b2} {:.2}); the next session is projected at {:.1}.",
            capitalize(label),
            c.trend.slope.abs(),
            c.trend.r_squared,
            c.trend.next_value_prediction
        ),
        suggested_action: format!(
            "Review recent {label} sessions with the athlete and adjust the plan before the decline continues."
        ),
        suggested_changes: SuggestedChanges {
            reduce: Vec::new(),
            add: Vec::new(),
            modify: c
                .problematic_exercises
                .iter()
                .map(|p| problem_entry(p, "Review execution and adjust load"))
                .collect(),
        },
        analysis: payload(
            snapshot,
            names::NEGATIVE_TREND,
            AnalysisFinding::Category(c.finding()),
        ),
    }
}

fn recurring_failure_draft(
    snapshot: &AnalysisSnapshot,
    p: &ProblematicExercise,
) -> AppResult<RecommendationDraft> {
    let category = snapshot.category(p.category).ok_or_else(|| {
        AppError::internal(format!(
            "problematic exercise {} references unanalysed category {}",
            p.exercise_id, p.category
        ))
    })?;
    let average = p
        .average_rating
        .map_or_else(|| "no ratings".to_owned(), |a| format!("an average of {a:.1}"));
    Ok(RecommendationDraft {
        rule: names::RECURRING_FAILURE.to_owned(),
        recommendation_type: RecommendationType::ExerciseAdjustment,
        priority: RecommendationPriority::Medium,
        title: format!("{} repeatedly incomplete", p.name),
        message: format!(
            "{} was left incomplete {} of {} times in the last {} days, with {}.",
            p.name, p.times_incomplete, p.times_assigned, snapshot.window.days, average
        ),
        suggested_action: format!(
            "Replace or regress {} within the {} block.",
            p.name,
            category.category.label()
        ),
        suggested_changes: SuggestedChanges {
            reduce: vec![problem_entry(p, "Remove from upcoming sessions")],
            add: p
                .substitute_candidates
                .iter()
                .map(|c| substitute_entry(c, Some(&p.name)))
                .collect(),
            modify: Vec::new(),
        },
        analysis: payload(
            snapshot,
            names::RECURRING_FAILURE,
            AnalysisFinding::Exercise(p.finding()),
        ),
    })
}

fn improvement_draft(
    snapshot: &AnalysisSnapshot,
    c: &ExerciseCategoryPerformance,
) -> RecommendationDraft {
    let label = c.category.label();
    RecommendationDraft {
        rule: names::NOTABLE_IMPROVEMENT.to_owned(),
        recommendation_type: RecommendationType::Progression,
        priority: RecommendationPriority::Low,
        title: format!("{} ready for progression", capitalize(label)),
        message: format!(
            "{} averaged {:.1}, {:.2} standard deviations above baseline, and is improving by {:.3} per day.",
            capitalize(label),
            c.average_rating,
            c.anomaly.z_score,
            c.trend.slope
        ),
        suggested_action: format!("Consider progressing {label} difficulty in the next cycle."),
        suggested_changes: SuggestedChanges::default(),
        analysis: payload(
            snapshot,
            names::NOTABLE_IMPROVEMENT,
            AnalysisFinding::Category(c.finding()),
        ),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::test_support::{category, problem, snapshot_with};
    use tatami_core::models::{ExerciseCategory, ExerciseId};

    #[test]
    fn test_rule_order_is_fixed() {
        let engine = RuleEngine::default();
        assert_eq!(
            engine.rule_names(),
            vec![
                names::CRITICAL_ANOMALY,
                names::LOW_CATEGORY_PERFORMANCE,
                names::NEGATIVE_TREND,
                names::RECURRING_FAILURE,
                names::NOTABLE_IMPROVEMENT,
            ]
        );
        let priorities: Vec<RecommendationPriority> =
            engine.rules.iter().map(Rule::priority).collect();
        assert!(priorities.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_critical_and_low_rules_both_fire_for_one_category() {
        let mut physical = category(
            ExerciseCategory::Physical,
            4.2,
            6,
            AnomalyInterpretation::CriticalLow,
            TrendClassification::Stable,
        );
        physical.problematic_exercises = vec![
            problem(ExerciseCategory::Physical, 11, Some(3.0), 1),
            problem(ExerciseCategory::Physical, 12, Some(4.0), 0),
        ];
        let snapshot = snapshot_with(vec![physical]);

        let drafts = RuleEngine::default().evaluate(&snapshot);
        let rules: Vec<&str> = drafts.iter().map(|d| d.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec![names::CRITICAL_ANOMALY, names::LOW_CATEGORY_PERFORMANCE]
        );
        assert_eq!(drafts[0].priority, RecommendationPriority::Critical);
        assert_eq!(drafts[1].priority, RecommendationPriority::High);
        assert_ne!(drafts[0].title, drafts[1].title);
        assert_eq!(drafts[0].suggested_changes.reduce.len(), 2);
        assert_eq!(
            drafts[1].suggested_changes.modify[0].exercise_id,
            Some(ExerciseId::new(11))
        );
        assert!(drafts[0].message.contains("4.2"));
    }

    #[test]
    fn test_recurring_failure_fires_per_exercise() {
        let mut ground = category(
            ExerciseCategory::GroundTechnique,
            6.5,
            5,
            AnomalyInterpretation::Normal,
            TrendClassification::Stable,
        );
        ground.problematic_exercises = vec![
            problem(ExerciseCategory::GroundTechnique, 21, None, 2),
            problem(ExerciseCategory::GroundTechnique, 22, Some(2.0), 3),
        ];
        let mut snapshot = snapshot_with(vec![ground]);
        snapshot.problematic_exercises = snapshot.categories[0].problematic_exercises.clone();

        let drafts = RuleEngine::default().evaluate(&snapshot);
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|d| d.rule == names::RECURRING_FAILURE));
        assert!(matches!(
            drafts[0].analysis.finding,
            AnalysisFinding::Exercise(_)
        ));
    }

    #[test]
    fn test_recurring_failure_beyond_flattened_cap() {
        let mut standing = category(
            ExerciseCategory::StandingTechnique,
            6.5,
            40,
            AnomalyInterpretation::Normal,
            TrendClassification::Stable,
        );
        standing.problematic_exercises = (1..=11)
            .map(|id| problem(ExerciseCategory::StandingTechnique, id, Some(2.0), 0))
            .collect();
        standing
            .problematic_exercises
            .push(problem(ExerciseCategory::StandingTechnique, 99, None, 3));

        let mut snapshot = snapshot_with(vec![standing]);
        // Worst first puts the unrated exercise past the cap
        snapshot.problematic_exercises.truncate(10);

        let failing: Vec<ExerciseId> = RuleEngine::default()
            .evaluate(&snapshot)
            .into_iter()
            .filter(|d| d.rule == names::RECURRING_FAILURE)
            .filter_map(|d| match d.analysis.finding {
                AnalysisFinding::Exercise(f) => Some(f.exercise_id),
                AnalysisFinding::Category(_) => None,
            })
            .collect();
        assert_eq!(failing, vec![ExerciseId::new(99)]);
    }

    #[test]
    fn test_improvement_is_informational() {
        let speed = category(
            ExerciseCategory::Speed,
            8.8,
            4,
            AnomalyInterpretation::AlertHigh,
            TrendClassification::Improving,
        );
        let drafts = RuleEngine::default().evaluate(&snapshot_with(vec![speed]));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].priority, RecommendationPriority::Low);
        assert_eq!(drafts[0].recommendation_type, RecommendationType::Progression);
    }

    #[test]
    fn test_empty_snapshot_produces_nothing() {
        assert!(RuleEngine::default()
            .evaluate(&snapshot_with(Vec::new()))
            .is_empty());
    }

    #[test]
    fn test_failing_rules_do_not_abort_evaluation() {
        let config = IntelligenceConfig::default();
        let engine = RuleEngine::with_rules(
            &config,
            vec![
                Rule::new(
                    "always_errors",
                    RecommendationPriority::Low,
                    |_| true,
                    |_| Err(AppError::internal("broken rule")),
                ),
                Rule::new(
                    "always_panics",
                    RecommendationPriority::Low,
                    |_| true,
                    |_| panic!("rule blew up"),
                ),
            ],
        );
        assert_eq!(engine.rule_names().len(), 7);

        let speed = category(
            ExerciseCategory::Speed,
            8.8,
            4,
            AnomalyInterpretation::CriticalHigh,
            TrendClassification::Improving,
        );
        let drafts = engine.evaluate(&snapshot_with(vec![speed]));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].rule, names::NOTABLE_IMPROVEMENT);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("ground technique"), "Ground technique");
        assert_eq!(capitalize(""), "");
    }
}
