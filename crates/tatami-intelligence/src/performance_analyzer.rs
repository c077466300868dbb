// ABOUTME: Pure per-category performance analysis and snapshot assembly
// ABOUTME: Groups records by category, scores trend and anomaly, flags exercises, rolls up attention
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Category analysis
//!
//! The async engine in the service crate fetches records and baselines, then hands
//! them to [`PerformanceAnalyzer`] which does all computation without I/O. Categories
//! are independent, so [`PerformanceAnalyzer::analyze_categories`] fans them out with
//! rayon.

use crate::anomaly::AnomalyScorer;
use crate::config::{IntelligenceConfig, RuleThresholds};
use crate::exercise_analysis::ProblemDetector;
use crate::pattern_detection::{attention_priority, PatternDetector};
use crate::snapshot::{
    AnalysisSnapshot, AnalysisSummary, AnalysisWindow, AthleteRef, ExerciseCategoryPerformance,
    ProblematicExercise,
};
use crate::statistics::{mean, round_to};
use crate::trend::{PerformanceSample, TrendAnalyzer};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tatami_core::models::{ExerciseCategory, PerformanceRecord};
use tracing::debug;

/// Records of one category plus its wider anomaly baseline
#[derive(Debug, Clone)]
pub struct CategoryInput {
    /// Category
    pub category: ExerciseCategory,
    /// Records in the primary window
    pub records: Vec<PerformanceRecord>,
    /// Ratings from the baseline window
    pub baseline: Vec<f64>,
}

/// Computes category results and assembles snapshots
#[derive(Debug, Clone)]
pub struct PerformanceAnalyzer {
    trend: TrendAnalyzer,
    anomaly: AnomalyScorer,
    problems: ProblemDetector,
    patterns: PatternDetector,
    rules: RuleThresholds,
    min_records: usize,
    problematic_cap: usize,
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self::from_config(&IntelligenceConfig::default())
    }
}

impl PerformanceAnalyzer {
    /// Build every analyzer from one configuration
    #[must_use]
    pub fn from_config(config: &IntelligenceConfig) -> Self {
        let trend = TrendAnalyzer::new(config.trend.clone());
        Self {
            anomaly: AnomalyScorer::new(config.anomaly.clone()),
            problems: ProblemDetector::new(config.problems.clone(), trend.clone()),
            patterns: PatternDetector::from_config(config),
            rules: config.rules.clone(),
            min_records: config.windows.min_records,
            problematic_cap: config.windows.problematic_cap,
            trend,
        }
    }

    /// Records needed before a run is attempted
    #[must_use]
    pub const fn min_records(&self) -> usize {
        self.min_records
    }

    /// Split records by category in category order
    #[must_use]
    pub fn group_by_category(
        records: &[PerformanceRecord],
    ) -> BTreeMap<ExerciseCategory, Vec<PerformanceRecord>> {
        let mut groups: BTreeMap<ExerciseCategory, Vec<PerformanceRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.category)
                .or_default()
                .push(record.clone());
        }
        groups
    }

    /// Analyse one category; `None` when it has no rated records
    #[must_use]
    pub fn analyze_category(&self, input: &CategoryInput) -> Option<ExerciseCategoryPerformance> {
        let samples: Vec<PerformanceSample> = input
            .records
            .iter()
            .filter_map(|r| r.rating.map(|v| PerformanceSample::new(r.session_date, v)))
            .collect();
        if samples.is_empty() {
            debug!(category = %input.category, "no rated records, skipping category");
            return None;
        }

        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        let average = mean(&values);

        Some(ExerciseCategoryPerformance {
            category: input.category,
            average_rating: round_to(average, 2),
            sample_count: samples.len(),
            record_count: input.records.len(),
            trend: self.trend.analyze(&samples),
            anomaly: self.anomaly.score(average, &input.baseline),
            problematic_exercises: self.problems.detect(&input.records),
            substitute_candidates: Vec::new(),
        })
    }

    /// Analyse categories in parallel, preserving input order
    #[must_use]
    pub fn analyze_categories(&self, inputs: &[CategoryInput]) -> Vec<ExerciseCategoryPerformance> {
        inputs
            .par_iter()
            .filter_map(|input| self.analyze_category(input))
            .collect()
    }

    /// Whether a category underperforms without any single exercise being flagged
    #[must_use]
    pub fn needs_category_substitutes(&self, category: &ExerciseCategoryPerformance) -> bool {
        category.average_rating < self.rules.low_category_average
            && category.problematic_exercises.is_empty()
    }

    /// Flatten problems, detect patterns, and derive the attention rollup
    #[must_use]
    pub fn assemble(
        &self,
        athlete: AthleteRef,
        window: AnalysisWindow,
        analyzed_at: DateTime<Utc>,
        records: &[PerformanceRecord],
        categories: Vec<ExerciseCategoryPerformance>,
    ) -> AnalysisSnapshot {
        let mut problematic: Vec<ProblematicExercise> = categories
            .iter()
            .flat_map(|c| c.problematic_exercises.iter().cloned())
            .collect();
        problematic.sort_by(ProblematicExercise::cmp_worst_first);

        let mut summary = AnalysisSummary::from_records(records);
        summary.categories_analyzed = categories.len();
        summary.problematic_count = problematic.len();
        problematic.truncate(self.problematic_cap);

        let patterns = self.patterns.detect(&categories);
        let priority = attention_priority(&patterns);

        AnalysisSnapshot {
            athlete,
            window,
            analyzed_at,
            summary,
            categories,
            problematic_exercises: problematic,
            patterns,
            needs_attention: priority.is_some(),
            attention_priority: priority,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::pattern_detection::PatternType;
    use chrono::{NaiveDate, TimeZone};
    use tatami_core::models::{
        AnomalyInterpretation, AthleteId, ExerciseId, PatternSeverity, SessionId,
        TrendClassification,
    };

    fn record(
        category: ExerciseCategory,
        exercise: i64,
        day: u32,
        rating: Option<f64>,
        completed: bool,
    ) -> PerformanceRecord {
        PerformanceRecord {
            exercise_id: ExerciseId::new(exercise),
            exercise_name: format!("exercise {exercise}"),
            category,
            difficulty: 3,
            session_id: SessionId::new(i64::from(day)),
            session_date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            rating,
            completed,
            recorded_at: Utc.with_ymd_and_hms(2025, 5, day, 19, 0, 0).unwrap(),
        }
    }

    fn athlete() -> AthleteRef {
        AthleteRef {
            id: AthleteId::new(7),
            display_name: "Aiko".into(),
        }
    }

    fn window() -> AnalysisWindow {
        AnalysisWindow::ending_at(NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(), 30)
    }

    #[test]
    fn test_category_without_ratings_is_skipped() {
        let input = CategoryInput {
            category: ExerciseCategory::Speed,
            records: vec![
                record(ExerciseCategory::Speed, 1, 1, None, true),
                record(ExerciseCategory::Speed, 1, 2, None, true),
            ],
            baseline: vec![],
        };
        assert!(PerformanceAnalyzer::default().analyze_category(&input).is_none());
    }

    #[test]
    fn test_declining_low_category_raises_attention() {
        let physical = ExerciseCategory::Physical;
        let records = vec![
            record(physical, 1, 1, Some(5.0), true),
            record(physical, 1, 2, Some(4.0), false),
            record(physical, 2, 3, Some(3.0), false),
            record(physical, 2, 4, Some(2.0), true),
        ];
        let analyzer = PerformanceAnalyzer::default();
        let inputs = vec![CategoryInput {
            category: physical,
            records: records.clone(),
            baseline: vec![7.0, 8.0, 7.5, 8.0, 7.0],
        }];

        let categories = analyzer.analyze_categories(&inputs);
        assert_eq!(categories.len(), 1);
        let category = &categories[0];
        assert!((category.average_rating - 3.5).abs() < f64::EPSILON);
        assert_eq!(category.sample_count, 4);
        assert_eq!(category.trend.classification, TrendClassification::Worsening);
        assert_eq!(
            category.anomaly.interpretation,
            AnomalyInterpretation::CriticalLow
        );

        let snapshot = analyzer.assemble(athlete(), window(), Utc::now(), &records, categories);
        assert!(snapshot.needs_attention);
        assert_eq!(snapshot.attention_priority, Some(PatternSeverity::Critical));
        assert_eq!(snapshot.summary.total_records, 4);
        assert_eq!(snapshot.summary.categories_analyzed, 1);
        let types: Vec<PatternType> = snapshot.patterns.iter().map(|p| p.pattern_type).collect();
        assert!(types.contains(&PatternType::LowCategoryPerformance));
        assert!(types.contains(&PatternType::NegativeTrend));
    }

    #[test]
    fn test_problematic_list_is_capped_and_sorted() {
        let ground = ExerciseCategory::GroundTechnique;
        let records: Vec<PerformanceRecord> = (1..=12)
            .map(|i| record(ground, i, 1, Some(f64::from(u32::try_from(i).unwrap()) / 5.0), true))
            .collect();
        let analyzer = PerformanceAnalyzer::default();
        let categories = analyzer.analyze_categories(&[CategoryInput {
            category: ground,
            records: records.clone(),
            baseline: vec![],
        }]);

        let snapshot = analyzer.assemble(athlete(), window(), Utc::now(), &records, categories);
        assert_eq!(snapshot.summary.problematic_count, 12);
        assert_eq!(snapshot.problematic_exercises.len(), 10);
        assert_eq!(snapshot.problematic_exercises[0].exercise_id, ExerciseId::new(1));
        let averages: Vec<f64> = snapshot
            .problematic_exercises
            .iter()
            .filter_map(|p| p.average_rating)
            .collect();
        assert!(averages.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_healthy_category_needs_no_attention() {
        let endurance = ExerciseCategory::Endurance;
        let records = vec![
            record(endurance, 1, 1, Some(7.0), true),
            record(endurance, 1, 2, Some(7.0), true),
            record(endurance, 2, 3, Some(7.5), true),
        ];
        let analyzer = PerformanceAnalyzer::default();
        let categories = analyzer.analyze_categories(&[CategoryInput {
            category: endurance,
            records: records.clone(),
            baseline: vec![7.0, 7.5, 7.0],
        }]);
        let snapshot = analyzer.assemble(athlete(), window(), Utc::now(), &records, categories);
        assert!(!snapshot.needs_attention);
        assert_eq!(snapshot.attention_priority, None);
        assert!(snapshot.problematic_exercises.is_empty());
    }
}
