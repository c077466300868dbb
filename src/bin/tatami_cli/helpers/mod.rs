// ABOUTME: Helper modules for tatami-cli
// ABOUTME: Output formatting shared by all commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

pub mod display;
