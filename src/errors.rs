// ABOUTME: Re-export of the shared error types from tatami-core
// ABOUTME: Lets service modules import AppError and AppResult from `crate::errors`
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

pub use tatami_core::errors::{AppError, AppResult, ErrorCode, ErrorContext};
