//! File path utilities for organizing data files.
//!
//! This module provides a centralized way to manage file paths for the store
//! database, logs and saved history-page captures.

use std::path::{Path, PathBuf};

/// File path manager for data files
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create a new DataPaths with the given root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Captures ==========

    /// Get the directory holding saved history-page captures
    pub fn captures_dir(&self) -> PathBuf {
        self.root.join("captures")
    }

    /// Get the capture directory for one day
    pub fn day_captures_dir(&self, day_key: &str) -> PathBuf {
        self.captures_dir().join(day_key)
    }

    /// Get the path of the nth capture of a day (`page-000.html`, ...)
    pub fn capture_file(&self, day_key: &str, index: usize) -> PathBuf {
        self.day_captures_dir(day_key)
            .join(format!("page-{:03}.html", index))
    }

    /// List the HTML captures saved for a day, in scroll order
    pub fn list_day_captures(&self, day_key: &str) -> std::io::Result<Vec<PathBuf>> {
        let dir = self.day_captures_dir(day_key);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut captures = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_html = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
                .unwrap_or(false);
            if path.is_file() && is_html {
                captures.push(path);
            }
        }
        // Numbered captures replay by index, so page-1000 follows page-999
        captures.sort_by_cached_key(|path| {
            (capture_index(path).unwrap_or(u64::MAX), path.clone())
        });

        Ok(captures)
    }

    // ========== Logs ==========

    /// Get logs directory
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    // ========== Utility Methods ==========

    /// Create all necessary directories
    pub fn create_dirs(&self) -> std::io::Result<()> {
        let dirs = vec![self.root.clone(), self.captures_dir(), self.logs_dir()];

        for dir in dirs {
            std::fs::create_dir_all(&dir)?;
        }

        Ok(())
    }
}

/// Trailing number of a capture file stem (`page-012.html` -> 12)
fn capture_index(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    stem[digits_start..].parse().ok()
}
