// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Rating bounds, difficulty scale, analysis windows, and state names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Constants module
//!
//! Pure data constants grouped by domain. Tunable analysis thresholds live in
//! `tatami-intelligence`'s configuration; the values here are structural and
//! never overridden at runtime.

/// Performance rating scale
pub mod ratings {
    /// Lowest possible performance rating
    pub const MIN_RATING: f64 = 0.0;
    /// Highest possible performance rating
    pub const MAX_RATING: f64 = 10.0;
}

/// Exercise difficulty scale
pub mod difficulty {
    /// Easiest catalog difficulty level
    pub const MIN_LEVEL: u8 = 1;
    /// Hardest catalog difficulty level
    pub const MAX_LEVEL: u8 = 5;
}

/// Analysis time windows (days)
pub mod windows {
    /// Default primary analysis window
    pub const DEFAULT_ANALYSIS_WINDOW_DAYS: u32 = 30;
    /// Historical baseline used for anomaly scoring, independent of the primary window
    pub const ANOMALY_BASELINE_DAYS: u32 = 28;
    /// Largest window accepted by the analysis entry point
    pub const MAX_ANALYSIS_WINDOW_DAYS: u32 = 365;
}

/// Database string representations for recommendation states
pub mod states {
    /// Awaiting a reviewer
    pub const PENDING: &str = "PENDING";
    /// A reviewer has picked the recommendation up
    pub const IN_REVIEW: &str = "IN_REVIEW";
    /// Approved and applied as suggested
    pub const FULFILLED: &str = "FULFILLED";
    /// Rejected by the reviewer
    pub const REJECTED: &str = "REJECTED";
    /// Applied with reviewer amendments
    pub const AMENDED: &str = "AMENDED";
}

/// Training session status values
pub mod session_status {
    /// Session generated but not yet approved
    pub const DRAFT: &str = "draft";
    /// Session approved for the athlete
    pub const APPROVED: &str = "approved";
}

/// Workflow defaults
pub mod workflow {
    /// Default number of feedback entries returned
    pub const DEFAULT_FEEDBACK_LIMIT: u32 = 20;
    /// Maximum number of feedback entries returned in one call
    pub const MAX_FEEDBACK_LIMIT: u32 = 500;
}
