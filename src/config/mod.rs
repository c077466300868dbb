// ABOUTME: Configuration management module for service settings
// ABOUTME: Environment-driven service config; analysis thresholds live in tatami-intelligence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Configuration module
//!
//! - **Environment**: database location, default analysis window, transaction retries
//! - **Intelligence**: re-export of the analysis threshold configuration

/// Environment and service configuration
pub mod environment;

pub use environment::{DatabaseUrl, Environment, ServerConfig};
pub use tatami_intelligence::config::{ConfigError, IntelligenceConfig};
