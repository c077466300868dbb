// ABOUTME: Tests that every Rust source file carries the project license header
// ABOUTME: Walks the workspace sources and checks the ABOUTME and SPDX lines in one style
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

const SOURCE_ROOTS: [&str; 4] = ["src", "crates", "tests", "benches"];

const HEADER_TAIL: [&str; 3] = [
    "//",
    "// SPDX-License-Identifier: MIT OR Apache-2.0",
    "// Copyright (c) 2025 Tatami Insights Contributors",
];

fn collect_rust_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            if path.file_name().is_some_and(|name| name == "target") {
                continue;
            }
            collect_rust_files(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn test_every_source_file_has_the_project_header() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    for dir in SOURCE_ROOTS {
        collect_rust_files(&root.join(dir), &mut files);
    }
    assert!(!files.is_empty());

    let mut offenders = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file).unwrap();
        let lines: Vec<&str> = text.lines().take(5).collect();
        let ok = lines.len() == 5
            && lines[0].starts_with("// ABOUTME: ")
            && lines[1].starts_with("// ABOUTME: ")
            && lines[2..] == HEADER_TAIL;
        if !ok {
            offenders.push(file.strip_prefix(root).unwrap_or(file).display().to_string());
        }
    }
    assert!(offenders.is_empty(), "non-standard headers: {offenders:?}");
}
