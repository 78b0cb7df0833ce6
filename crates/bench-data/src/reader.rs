//! Benchmark log discovery and loading.
//!
//! Walks a collection directory for `.log` units and parses each one into
//! [`InvocationRecord`]s.

use std::path::{Path, PathBuf};

use bench_core::error::{BenchError, Result};
use bench_core::models::InvocationRecord;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::parser::{parse_log_lines, ParseWarning, ParsedUnit};

/// Directory name reserved for the harness' own logs; never scanned.
pub const RESERVED_LOG_DIR: &str = "logs";

// ── LoadReport ────────────────────────────────────────────────────────────────

/// Totals collected while loading a directory of log units.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub files_found: usize,
    pub files_parsed: usize,
    /// Unreadable files plus files whose metadata header was rejected.
    pub files_failed: usize,
    pub records_loaded: usize,
    pub malformed_lines: usize,
    pub line_errors: Vec<String>,
    pub warnings: Vec<ParseWarning>,
}

impl LoadReport {
    fn absorb(&mut self, path: &Path, unit: &ParsedUnit) {
        let diag = &unit.diagnostics;
        if diag.metadata_error.is_some() {
            self.files_failed += 1;
        } else {
            self.files_parsed += 1;
        }
        self.records_loaded += unit.records.len();
        self.malformed_lines += diag.malformed_lines;
        self.line_errors.extend(
            diag.line_errors
                .iter()
                .map(|e| format!("{}: {}", path.display(), e)),
        );
        self.warnings.extend(diag.warnings.iter().cloned());
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.log` files under `root`, sorted by path.
///
/// Files anywhere below a directory named [`RESERVED_LOG_DIR`] are skipped.
pub fn find_log_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        warn!("Log directory does not exist: {}", root.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir() && entry.file_name() == RESERVED_LOG_DIR)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "log")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read and parse a single log unit.
///
/// Lines are decoded independently, with invalid UTF-8 replaced, so a torn
/// line fails JSON parsing on its own instead of failing the whole file.
pub fn parse_log_file(path: &Path) -> Result<ParsedUnit> {
    let bytes = std::fs::read(path).map_err(|source| BenchError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let lines = bytes.split_inclusive(|&b| b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line))
    });
    Ok(parse_log_lines(lines, &path.display().to_string()))
}

/// Load every log unit under `root`.
///
/// Records are returned in path order, then line order. Missing or empty
/// roots yield an empty result.
pub fn load_records_from_directory(root: &Path) -> (Vec<InvocationRecord>, LoadReport) {
    let files = find_log_files(root);
    let mut report = LoadReport {
        files_found: files.len(),
        ..LoadReport::default()
    };
    let mut records = Vec::new();

    for path in &files {
        match parse_log_file(path) {
            Ok(unit) => {
                debug!(
                    "Parsed {} records from {}",
                    unit.records.len(),
                    path.display()
                );
                report.absorb(path, &unit);
                records.extend(unit.records);
            }
            Err(e) => {
                warn!("Skipping unreadable log file: {}", e);
                report.files_failed += 1;
            }
        }
    }

    info!(
        "Loaded {} records from {} of {} log files",
        report.records_loaded, report.files_parsed, report.files_found
    );

    (records, report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
