// ABOUTME: Database operations for the exercise catalog
// ABOUTME: Category and difficulty lookups used for substitute-exercise candidates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::Database;
use crate::errors::{AppError, AppResult};
use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tatami_core::constants::difficulty::{MAX_LEVEL, MIN_LEVEL};
use tatami_core::models::{CatalogExercise, ExerciseCategory, ExerciseId};

/// Fields needed to add a catalog exercise
#[derive(Debug, Clone)]
pub struct NewExercise {
    /// Display name
    pub name: String,
    /// Category
    pub category: ExerciseCategory,
    /// Difficulty level 1-5
    pub difficulty: u8,
    /// Body zones the exercise loads
    pub body_zones: Vec<String>,
    /// Contraindicated zones or conditions
    pub contraindications: Vec<String>,
}

impl Database {
    pub(super) async fn migrate_exercises(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT NOT NULL CHECK (category IN ('physical', 'standing_technique', 'ground_technique', 'endurance', 'speed')),
                difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5),
                active INTEGER NOT NULL DEFAULT 1,
                body_zones TEXT NOT NULL DEFAULT '[]',
                contraindications TEXT NOT NULL DEFAULT '[]'
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_exercises_category ON exercises(category, active, difficulty)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Add an exercise to the catalog; new exercises are active
    ///
    /// # Errors
    ///
    /// Returns an error if the difficulty is outside 1-5 or the insert fails
    pub async fn create_exercise(&self, exercise: &NewExercise) -> AppResult<CatalogExercise> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&exercise.difficulty) {
            return Err(AppError::invalid_input(format!(
                "Difficulty {} is outside {MIN_LEVEL}-{MAX_LEVEL}",
                exercise.difficulty
            )));
        }

        let result = sqlx::query(
            r"
            INSERT INTO exercises (name, category, difficulty, active, body_zones, contraindications)
            VALUES ($1, $2, $3, 1, $4, $5)
            ",
        )
        .bind(&exercise.name)
        .bind(exercise.category.as_str())
        .bind(i64::from(exercise.difficulty))
        .bind(serde_json::to_string(&exercise.body_zones)?)
        .bind(serde_json::to_string(&exercise.contraindications)?)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create exercise: {e}")))?;

        Ok(CatalogExercise {
            id: ExerciseId::new(result.last_insert_rowid()),
            name: exercise.name.clone(),
            category: exercise.category,
            difficulty: exercise.difficulty,
            active: true,
            body_zones: exercise.body_zones.clone(),
            contraindications: exercise.contraindications.clone(),
        })
    }

    /// Enable or retire a catalog exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn set_exercise_active(&self, exercise_id: ExerciseId, active: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE exercises SET active = $1 WHERE id = $2")
            .bind(active)
            .bind(exercise_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update exercise: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Active exercises of `category` no harder than `max_difficulty`, hardest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or stored JSON is malformed
    pub async fn list_active_exercises(
        &self,
        category: ExerciseCategory,
        max_difficulty: u8,
    ) -> AppResult<Vec<CatalogExercise>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, category, difficulty, active, body_zones, contraindications
            FROM exercises
            WHERE active = 1 AND category = $1 AND difficulty <= $2
            ORDER BY difficulty DESC, id ASC
            ",
        )
        .bind(category.as_str())
        .bind(i64::from(max_difficulty))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list exercises: {e}")))?;

        rows.iter().map(row_to_exercise).collect()
    }
}

fn row_to_exercise(row: &SqliteRow) -> AppResult<CatalogExercise> {
    let category_str: String = row.get("category");
    let difficulty: i64 = row.get("difficulty");
    let body_zones_json: String = row.get("body_zones");
    let contraindications_json: String = row.get("contraindications");

    Ok(CatalogExercise {
        id: ExerciseId::new(row.get("id")),
        name: row.get("name"),
        category: ExerciseCategory::parse(&category_str).ok_or_else(|| {
            AppError::database(format!("Unknown exercise category '{category_str}'"))
        })?,
        difficulty: u8::try_from(difficulty)
            .map_err(|_| AppError::database(format!("Invalid difficulty {difficulty}")))?,
        active: row.get("active"),
        body_zones: serde_json::from_str(&body_zones_json)?,
        contraindications: serde_json::from_str(&contraindications_json)?,
    })
}
