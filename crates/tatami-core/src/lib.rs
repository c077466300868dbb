// ABOUTME: Core types and constants for the Tatami Insights platform
// ABOUTME: Foundation crate with error handling, identifiers, domain models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

#![deny(unsafe_code)]

//! # Tatami Core
//!
//! Foundation crate providing shared types and constants for athlete
//! performance analysis and the recommendation approval workflow. This crate
//! is designed to change infrequently, enabling incremental compilation
//! benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `AppResult`
//! - **constants**: Structural constants (rating scale, windows, state names)
//! - **models**: Athletes, exercises, sessions, analysis results, recommendations

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models
pub mod models;
