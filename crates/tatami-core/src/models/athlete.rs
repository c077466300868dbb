// ABOUTME: Athlete identity, injury, and fitness test models
// ABOUTME: Read-side inputs for analysis and substitute-exercise selection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use super::ids::{AthleteId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Athlete identity as needed by the analysis and notification layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Athlete {
    /// Athlete primary key
    pub id: AthleteId,
    /// Login account of the athlete (notification target)
    pub user_id: UserId,
    /// Name shown in reports and messages
    pub display_name: String,
    /// Assigned trainer's login account, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trainer_user_id: Option<UserId>,
}

/// An injury the athlete has not recovered from yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Injury {
    /// Affected body zone (free text, e.g. "left knee", "shoulder")
    pub zone: String,
    /// Injury type (free text, e.g. "sprain")
    pub injury_type: String,
}

impl Injury {
    /// Case-insensitive zone overlap: either name contains the other
    #[must_use]
    pub fn affects_zone(&self, zone: &str) -> bool {
        let injury_zone = self.zone.trim().to_lowercase();
        let zone = zone.trim().to_lowercase();
        if injury_zone.is_empty() || zone.is_empty() {
            return false;
        }
        injury_zone.contains(&zone) || zone.contains(&injury_zone)
    }
}

/// Summary of the athlete's most recent fitness test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessTestSummary {
    /// Overall score on the 0-10 scale
    pub score: f64,
    /// When the test was taken
    pub tested_at: DateTime<Utc>,
}
