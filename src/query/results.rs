//! Typed result records with explicit truncation flags.
//!
//! Every list-returning result documents its ordering and carries a
//! `truncated` flag; the `render()` helpers reproduce the human-readable
//! text the surrounding tool protocol ships to callers.

use serde::Serialize;

use crate::index::IndexStats;
use crate::model::{ClassKind, LineRange, SectionRecord, SymbolKind};

/// Sorted file paths, optionally glob-filtered.
#[derive(Debug, Clone, Serialize)]
pub struct FileList {
    pub paths: Vec<String>,
    pub truncated: bool,
}

/// One function or method, flattened for listings.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionView {
    pub name: String,
    pub qualified_name: String,
    pub file: String,
    pub range: LineRange,
    pub params: Vec<String>,
    pub is_method: bool,
    pub parent: Option<String>,
}

/// Functions, ordered by (file, start line).
#[derive(Debug, Clone, Serialize)]
pub struct FunctionList {
    pub functions: Vec<FunctionView>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassView {
    pub name: String,
    pub file: String,
    pub range: LineRange,
    pub kind: ClassKind,
    pub bases: Vec<String>,
    pub methods: Vec<String>,
}

/// Classes, ordered by (file, start line).
#[derive(Debug, Clone, Serialize)]
pub struct ClassList {
    pub classes: Vec<ClassView>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportView {
    pub module: String,
    pub names: Vec<String>,
    pub alias: Option<String>,
    pub file: String,
    pub line: u32,
    pub is_from: bool,
}

/// Imports, ordered by (file, line).
#[derive(Debug, Clone, Serialize)]
pub struct ImportList {
    pub imports: Vec<ImportView>,
    pub truncated: bool,
}

/// Where a symbol is defined. Ties resolve to the lexicographically
/// smallest path, then the smallest line; `candidates` counts every
/// definition site that carries the name.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolLocation {
    pub name: String,
    pub path: String,
    pub line: u32,
    pub kind: SymbolKind,
    pub candidates: usize,
}

/// A verbatim slice of source lines starting at `start_line`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSlice {
    pub path: String,
    pub start_line: u32,
    pub lines: Vec<String>,
    pub truncated: bool,
    /// Lines dropped by `max_lines` truncation.
    pub omitted_lines: u32,
}

impl SourceSlice {
    /// The slice as text, with a single marker line when truncated.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.truncated {
            out.push_str(&format!("\n... ({} more lines)", self.omitted_lines));
        }
        out
    }
}

/// A dependency-graph neighbor, located at its definition site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEntry {
    pub symbol: String,
    pub path: String,
    pub line: u32,
    pub kind: SymbolKind,
}

/// Dependencies or dependents of one symbol, ordered by (path, line).
#[derive(Debug, Clone, Serialize)]
pub struct DependencyList {
    pub symbol: String,
    pub entries: Vec<DependencyEntry>,
    pub truncated: bool,
}

/// Direct and transitive dependents of a symbol. `direct` is ordered by
/// (path, line); `transitive` is in BFS level order with (path, line)
/// tie-breaks inside each level. The two sets are disjoint and exclude the
/// symbol itself.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeImpact {
    pub symbol: String,
    pub direct: Vec<DependencyEntry>,
    pub transitive: Vec<DependencyEntry>,
    pub direct_truncated: bool,
    pub transitive_truncated: bool,
}

/// Shortest dependency path between two symbols; `chain` is absent when no
/// path exists.
#[derive(Debug, Clone, Serialize)]
pub struct CallChain {
    pub from: String,
    pub to: String,
    pub chain: Option<Vec<String>>,
}

/// Files a file imports from, or files importing it; sorted
/// lexicographically.
#[derive(Debug, Clone, Serialize)]
pub struct FileDependencyList {
    pub path: String,
    pub files: Vec<String>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub path: String,
    pub line: u32,
    pub content: String,
}

/// Regex matches in sorted path order, at most one per line. Truncation
/// short-circuits the scan.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub matches: Vec<SearchMatch>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSite {
    pub name: String,
    pub path: String,
}

/// High-level project overview. Class/function listings cap at 20 entries;
/// the `more_*` counters carry the overflow.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub root: String,
    pub stats: IndexStats,
    pub packages: Vec<String>,
    pub classes: Vec<SymbolSite>,
    pub more_classes: usize,
    pub functions: Vec<SymbolSite>,
    pub more_functions: usize,
}

impl ProjectSummary {
    pub fn render(&self) -> String {
        let mut parts = vec![
            format!("Project: {}", self.root),
            format!(
                "Files: {}, Lines: {}, Functions: {}, Classes: {}",
                self.stats.total_files,
                self.stats.total_lines,
                self.stats.total_functions,
                self.stats.total_classes
            ),
        ];
        if !self.packages.is_empty() {
            parts.push(format!("Packages: {}", self.packages.join(", ")));
        }
        if !self.classes.is_empty() {
            let listed: Vec<String> = self
                .classes
                .iter()
                .map(|s| format!("{} ({})", s.name, s.path))
                .collect();
            parts.push(format!("Classes: {}", listed.join(", ")));
            if self.more_classes > 0 {
                parts.push(format!("  ... and {} more", self.more_classes));
            }
        }
        if !self.functions.is_empty() {
            let listed: Vec<String> = self
                .functions
                .iter()
                .map(|s| format!("{} ({})", s.name, s.path))
                .collect();
            parts.push(format!("Functions: {}", listed.join(", ")));
            if self.more_functions > 0 {
                parts.push(format!("  ... and {} more", self.more_functions));
            }
        }
        parts.join("\n")
    }
}

/// Per-file structure: imports, classes with methods, top-level functions,
/// text sections.
#[derive(Debug, Clone, Serialize)]
pub struct FileStructure {
    pub path: String,
    pub total_lines: u32,
    pub imports: Vec<String>,
    pub classes: Vec<ClassView>,
    pub functions: Vec<FunctionView>,
    pub sections: Vec<SectionRecord>,
}

impl FileStructure {
    pub fn render(&self) -> String {
        let mut parts = vec![format!("File: {} ({} lines)", self.path, self.total_lines)];
        if !self.imports.is_empty() {
            parts.push(format!("Imports: {}", self.imports.join(", ")));
        }
        for cls in &self.classes {
            let bases = if cls.bases.is_empty() {
                String::new()
            } else {
                format!("({})", cls.bases.join(", "))
            };
            let methods = if cls.methods.is_empty() {
                "none".to_string()
            } else {
                cls.methods.join(", ")
            };
            parts.push(format!(
                "Class {}{} (lines {}-{}): methods: {}",
                cls.name, bases, cls.range.start, cls.range.end, methods
            ));
        }
        for func in &self.functions {
            parts.push(format!(
                "Function {}({}) (lines {}-{})",
                func.name,
                func.params.join(", "),
                func.range.start,
                func.range.end
            ));
        }
        for sec in &self.sections {
            let indent = "  ".repeat(sec.level.saturating_sub(1) as usize);
            parts.push(format!(
                "{}Section: {} (lines {}-{})",
                indent, sec.title, sec.range.start, sec.range.end
            ));
        }
        parts.join("\n")
    }
}

/// `get_structure_summary` output: project-level or file-level.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StructureSummary {
    Project(ProjectSummary),
    File(FileStructure),
}

impl StructureSummary {
    pub fn render(&self) -> String {
        match self {
            Self::Project(p) => p.render(),
            Self::File(f) => f.render(),
        }
    }
}
