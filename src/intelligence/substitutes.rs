// ABOUTME: Injury-aware selection of substitute exercises from catalog lookups
// ABOUTME: Filters retired, excluded, and injury-conflicting exercises and caps the result
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use std::collections::BTreeSet;
use tatami_core::models::{CatalogExercise, ExerciseId, Injury};
use tatami_intelligence::SubstituteCandidate;

/// Whether any active injury overlaps a zone the exercise loads or is contraindicated for
#[must_use]
pub fn conflicts_with_injuries(exercise: &CatalogExercise, injuries: &[Injury]) -> bool {
    exercise
        .sensitive_zones()
        .any(|zone| injuries.iter().any(|injury| injury.affects_zone(zone)))
}

/// Pick up to `limit` candidates, preserving catalog order
#[must_use]
pub fn select_substitutes(
    catalog: &[CatalogExercise],
    injuries: &[Injury],
    exclude: &BTreeSet<ExerciseId>,
    limit: usize,
) -> Vec<SubstituteCandidate> {
    catalog
        .iter()
        .filter(|exercise| exercise.active)
        .filter(|exercise| !exclude.contains(&exercise.id))
        .filter(|exercise| !conflicts_with_injuries(exercise, injuries))
        .take(limit)
        .map(SubstituteCandidate::from)
        .collect()
}
