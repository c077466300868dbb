// ABOUTME: Output formatting helpers for tatami-cli
// ABOUTME: Pretty JSON on stdout so results can be piped; a short summary line goes to the log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use serde::Serialize;
use tatami_insights::errors::AppResult;

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
