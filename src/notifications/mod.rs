// ABOUTME: Notification dispatch for approved or amended training plans
// ABOUTME: Trait seam plus logging and in-process broadcast implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Plan approval notifications
//!
//! The workflow calls [`NotificationDispatcher::notify_plan_approved`] after an
//! approval or amendment has committed. Delivery is best-effort: the workflow
//! logs a failed dispatch and carries on.

use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tatami_core::models::{RecommendationId, RecommendationState, UserId};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the broadcast channel before slow subscribers start lagging
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Sent to the athlete and their trainer once a plan is approved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanApprovedNotice {
    /// Recommendation whose plan was applied
    pub recommendation_id: RecommendationId,
    /// FULFILLED or AMENDED
    pub state: RecommendationState,
    /// Athlete login to notify
    pub athlete_user_id: UserId,
    /// Trainer login to notify, if one is assigned
    pub trainer_user_id: Option<UserId>,
    /// Code of the affected training cycle
    pub cycle_code: Option<String>,
}

/// Delivers plan approval notices
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Notify athlete and trainer that a plan was approved
    async fn notify_plan_approved(&self, notice: &PlanApprovedNotice) -> AppResult<()>;
}

/// Emits a structured log event per notice
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn notify_plan_approved(&self, notice: &PlanApprovedNotice) -> AppResult<()> {
        info!(
            recommendation_id = %notice.recommendation_id,
            state = %notice.state,
            athlete_user_id = %notice.athlete_user_id,
            trainer_user_id = ?notice.trainer_user_id.map(|id| id.as_i64()),
            cycle_code = notice.cycle_code.as_deref().unwrap_or("-"),
            "Training plan approved"
        );
        Ok(())
    }
}

/// Fans notices out to in-process subscribers
#[derive(Debug, Clone)]
pub struct BroadcastDispatcher {
    sender: broadcast::Sender<PlanApprovedNotice>,
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl BroadcastDispatcher {
    /// Create a dispatcher buffering up to `capacity` notices per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every notice sent from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlanApprovedNotice> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl NotificationDispatcher for BroadcastDispatcher {
    async fn notify_plan_approved(&self, notice: &PlanApprovedNotice) -> AppResult<()> {
        match self.sender.send(notice.clone()) {
            Ok(receivers) => {
                debug!(
                    recommendation_id = %notice.recommendation_id,
                    receivers = receivers,
                    "Plan approval broadcast"
                );
            }
            // No subscribers is not a delivery failure
            Err(_) => debug!(
                recommendation_id = %notice.recommendation_id,
                "Plan approval broadcast with no subscribers"
            ),
        }
        Ok(())
    }
}
