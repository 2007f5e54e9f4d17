//! Typed parameter records, one per query operation.
//!
//! `max_*` fields follow the uniform truncation contract: `0` means
//! unbounded, any positive value caps the result.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListFilesParams {
    /// Optional glob filter (e.g. `*.py`, `src/**/*.ts`).
    pub pattern: Option<String>,
    pub max_results: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StructureSummaryParams {
    /// Omit for a project-level summary.
    pub path: Option<String>,
}

/// Shared by `get_functions`, `get_classes`, and `get_imports`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingParams {
    /// Restrict to one file; omit for the whole project.
    pub path: Option<String>,
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceParams {
    /// Function or class name, bare or `Class.method` qualified.
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub max_lines: usize,
}

impl SourceParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            max_lines: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FindSymbolParams {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencyParams {
    pub symbol: String,
    #[serde(default)]
    pub max_results: usize,
}

impl DependencyParams {
    pub fn named(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            max_results: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeImpactParams {
    pub symbol: String,
    #[serde(default)]
    pub max_direct: usize,
    #[serde(default)]
    pub max_transitive: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallChainParams {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileGraphParams {
    pub path: String,
    #[serde(default)]
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub pattern: String,
    pub max_results: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            max_results: 100,
        }
    }
}

impl SearchParams {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetLinesParams {
    pub path: String,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ReindexParams {
    /// `true` discards the index and rebuilds from disk; `false` re-walks
    /// the tree and applies a hash-diff incremental update.
    pub full: bool,
}
