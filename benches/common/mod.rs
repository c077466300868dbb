// ABOUTME: Common benchmark utilities and test fixtures for performance testing
// ABOUTME: Provides reusable performance-record generators for Criterion benchmarks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

//! Common benchmark utilities and test fixtures.

pub mod fixtures;
