// ABOUTME: Training session model referenced by recommendations
// ABOUTME: Generated sessions are approved, adjusted, or deleted by the approval workflow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::ids::{AthleteId, CycleId, SessionId};
use crate::constants::session_status;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a training session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Generated, waiting for recommendation approval
    #[default]
    Draft,
    /// Approved for the athlete
    Approved,
}

impl SessionStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => session_status::DRAFT,
            Self::Approved => session_status::APPROVED,
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            session_status::APPROVED => Self::Approved,
            _ => Self::Draft,
        }
    }
}

/// A planned or completed training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Unique identifier
    pub id: SessionId,
    /// Athlete the session belongs to
    pub athlete_id: AthleteId,
    /// Training cycle the session is part of
    pub cycle_id: Option<CycleId>,
    /// Calendar date of the session
    pub session_date: NaiveDate,
    /// Approval status
    pub status: SessionStatus,
    /// Planned duration in minutes
    pub duration_minutes: Option<u32>,
    /// Planned volume (sets x reps units)
    pub volume: Option<f64>,
    /// Planned intensity (percent of maximal effort)
    pub intensity: Option<f64>,
    /// Warm-up content
    pub warmup: Option<String>,
    /// Main block content
    pub main_block: Option<String>,
    /// Cool-down content
    pub cooldown: Option<String>,
    /// Trainer notes
    pub notes: Option<String>,
}

/// Session-level adjustments a reviewer can apply while amending a recommendation.
///
/// Only provided fields are written; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAdjustments {
    /// New duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// New volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// New intensity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    /// Replacement warm-up content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup: Option<String>,
    /// Replacement main block content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_block: Option<String>,
    /// Replacement cool-down content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<String>,
    /// Replacement notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionAdjustments {
    /// Whether any field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.duration_minutes.is_none()
            && self.volume.is_none()
            && self.intensity.is_none()
            && self.warmup.is_none()
            && self.main_block.is_none()
            && self.cooldown.is_none()
            && self.notes.is_none()
    }
}
