// ABOUTME: Re-exports command modules for tatami-cli
// ABOUTME: Provides access to analysis and review workflow commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

pub mod analysis;
pub mod review;
