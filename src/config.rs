//! Indexer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default per-file size cap (512 KiB). Anything larger is skipped.
pub const MAX_FILE_SIZE: u64 = 512 * 1024;

/// Bytes sniffed from the head of a file to detect binary content.
pub const BINARY_SNIFF_BYTES: usize = 8 * 1024;

/// Configuration for building a project index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project root directory to index.
    pub root: PathBuf,
    /// Directory names and glob patterns excluded from discovery.
    pub exclude_patterns: Vec<String>,
    /// Maximum file size in bytes; larger files are skipped with a warning.
    pub max_file_size: u64,
}

impl Config {
    /// Config rooted at an explicit directory, with default filters.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude_patterns: default_excludes(),
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// Resolve the project root from the `PROJECT_ROOT` environment variable,
    /// falling back to the current working directory.
    pub fn from_env() -> crate::error::Result<Self> {
        let root = match std::env::var("PROJECT_ROOT") {
            Ok(v) if !v.is_empty() => PathBuf::from(v),
            _ => std::env::current_dir()?,
        };
        if !root.is_dir() {
            return Err(crate::error::CodemapError::ProjectNotFound(root));
        }
        Ok(Self::new(root))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

fn default_excludes() -> Vec<String> {
    [
        "__pycache__",
        "node_modules",
        ".git",
        ".venv",
        "venv",
        "target",
        "dist",
        "build",
        "*.egg-info",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_cover_common_build_dirs() {
        let config = Config::new("/tmp/project");
        for dir in ["node_modules", ".git", "target", "__pycache__"] {
            assert!(config.exclude_patterns.iter().any(|p| p == dir));
        }
        assert_eq!(config.max_file_size, 512 * 1024);
    }
}
