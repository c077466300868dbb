// ABOUTME: Domain service layer composing analysis, rule evaluation, and the approval workflow
// ABOUTME: Provides one entry point reusable by the CLI and by embedding applications
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Domain service layer
//!
//! Services hold no state of their own beyond shared handles, so they are
//! cheap to clone into tasks.

/// Analysis-to-recommendation pipeline and workflow delegation
pub mod insights;

pub use insights::InsightsService;
