// ABOUTME: Intelligence module wiring the pure tatami-intelligence crate to persisted data
// ABOUTME: Hosts the async analysis engine and injury-aware substitute selection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! # Intelligence Module
//!
//! Trend fitting, anomaly scoring, problem detection, and rule evaluation live
//! in the `tatami-intelligence` crate and never touch the database. This module
//! adds the pieces that need data access.

// Re-export all public items from tatami-intelligence
pub use tatami_intelligence::*;

/// Async engine producing analysis snapshots from stored performance data
pub mod performance_engine;
/// Substitute exercise selection
pub mod substitutes;

pub use performance_engine::PerformanceAnalysisEngine;
pub use substitutes::{conflicts_with_injuries, select_substitutes};
