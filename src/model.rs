//! Core Data Model for Structural Metadata
//!
//! Plain records produced by the per-language extractors and fused into the
//! project index. Line numbers are 1-indexed and ranges are inclusive on both
//! ends. Paths are project-relative, forward-slash normalized, case-sensitive.
//!
//! @module model

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// LINE RANGE
// =============================================================================

/// An inclusive 1-indexed range of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    /// Create a range, clamping `end` so that `start <= end` always holds.
    pub fn new(start: u32, end: u32) -> Self {
        let start = start.max(1);
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of lines covered.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether a 1-indexed line falls inside the range.
    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }
}

// =============================================================================
// SYMBOL KINDS
// =============================================================================

/// Classification of symbol definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Trait,
    TypeAlias,
    Macro,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::TypeAlias => "type_alias",
            Self::Macro => "macro",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a class-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Class,
    Struct,
    Enum,
    Interface,
    Trait,
}

impl ClassKind {
    pub fn as_symbol_kind(&self) -> SymbolKind {
        match self {
            Self::Class => SymbolKind::Class,
            Self::Struct => SymbolKind::Struct,
            Self::Enum => SymbolKind::Enum,
            Self::Interface => SymbolKind::Interface,
            Self::Trait => SymbolKind::Trait,
        }
    }
}

bitflags! {
    /// Declaration modifiers carried on function records.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const ASYNC  = 0b0000_0001;
        const CONST  = 0b0000_0010;
        const UNSAFE = 0b0000_0100;
        const PUB    = 0b0000_1000;
        const STATIC = 0b0001_0000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// DECLARATION RECORDS
// =============================================================================

/// A single declared parameter, order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Textual default value, if one is declared.
    pub default: Option<String>,
    /// Textual type annotation, if one is declared.
    pub annotation: Option<String>,
}

impl Parameter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            annotation: None,
        }
    }
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    /// `Parent.name` for methods, `name` otherwise. Not namespaced across files.
    pub qualified_name: String,
    pub range: LineRange,
    pub params: Vec<Parameter>,
    /// Decorator / attribute names in textual form, without sigils.
    pub decorators: Vec<String>,
    pub doc: Option<String>,
    pub is_method: bool,
    /// Enclosing class/struct/trait name for methods.
    pub parent: Option<String>,
    pub modifiers: Modifiers,
}

/// A class-like declaration (class, struct, enum, interface, trait).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    pub range: LineRange,
    /// Base classes, embedded types, or supertraits.
    pub bases: Vec<String>,
    pub methods: Vec<FunctionRecord>,
    pub decorators: Vec<String>,
    pub doc: Option<String>,
    pub kind: ClassKind,
}

/// An import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// The module specifier as written in the source.
    pub module: String,
    /// Names introduced into local scope; `["*"]` for a wildcard import.
    pub names: Vec<String>,
    pub alias: Option<String>,
    pub line: u32,
    /// `from X import Y` style (Python), named/ES imports (TS), `use` (Rust).
    pub is_from: bool,
}

/// A heading-delimited section of a text document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub title: String,
    /// Heading level, 1 = top-level.
    pub level: u32,
    pub range: LineRange,
}

// =============================================================================
// LANGUAGE
// =============================================================================

/// Language classification chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    TypeScript,
    Go,
    Rust,
    Text,
    Generic,
}

impl Language {
    /// Extension table. Unknown extensions bind to the generic extractor.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or("");
        match ext {
            "py" | "pyw" => Self::Python,
            "ts" | "tsx" | "js" | "jsx" => Self::TypeScript,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "md" | "txt" | "rst" => Self::Text,
            _ => Self::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Text => "text",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FILE RECORD
// =============================================================================

/// Complete structural metadata for one file.
///
/// `lines` preserves the raw content split on `\n` verbatim so source-slice
/// queries can splice without re-reading the file. Records are immutable once
/// inserted into an index; modification installs a fresh record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Project-relative, forward-slash normalized path.
    pub path: String,
    pub language: Language,
    pub total_lines: u32,
    pub total_chars: usize,
    pub lines: Vec<String>,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub imports: Vec<ImportRecord>,
    pub sections: Vec<SectionRecord>,
    /// Intra-file references: declaring qualified name -> referenced names.
    pub local_refs: HashMap<String, HashSet<String>>,
    /// xxh3 of the raw bytes, used for hash-diff reindexing.
    pub content_hash: u64,
}

impl FileRecord {
    /// A lines-only record (generic files, unreadable files, parse fallback).
    pub fn lines_only(path: &str, language: Language, source: &str) -> Self {
        let lines = split_lines(source);
        Self {
            path: path.to_string(),
            language,
            total_lines: lines.len() as u32,
            total_chars: source.chars().count(),
            lines,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            sections: Vec::new(),
            local_refs: HashMap::new(),
            content_hash: xxhash_rust::xxh3::xxh3_64(source.as_bytes()),
        }
    }

    /// Splice `range` out of `lines`, 1-indexed inclusive.
    pub fn slice(&self, range: LineRange) -> &[String] {
        let start = (range.start as usize - 1).min(self.lines.len());
        let end = (range.end as usize).min(self.lines.len());
        &self.lines[start..end]
    }

    /// All qualified names this file defines (functions, methods, classes).
    pub fn defined_names(&self) -> impl Iterator<Item = &str> {
        self.functions
            .iter()
            .map(|f| f.qualified_name.as_str())
            .chain(self.classes.iter().map(|c| c.name.as_str()))
    }
}

/// Split source on `\n`, preserving content verbatim (no trailing-newline
/// normalization beyond what `split` gives: a trailing newline yields a final
/// empty line which is dropped to match line-count expectations).
pub fn split_lines(source: &str) -> Vec<String> {
    if source.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = source.split('\n').map(|l| l.to_string()).collect();
    if source.ends_with('\n') {
        lines.pop();
    }
    lines
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_range_clamps_and_contains() {
        let r = LineRange::new(3, 1);
        assert_eq!(r.start, 3);
        assert_eq!(r.end, 3);
        assert_eq!(r.len(), 1);

        let r = LineRange::new(2, 5);
        assert!(r.contains(2));
        assert!(r.contains(5));
        assert!(!r.contains(6));
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn language_from_path() {
        assert_eq!(Language::from_path("src/app.py"), Language::Python);
        assert_eq!(Language::from_path("a/b/c.tsx"), Language::TypeScript);
        assert_eq!(Language::from_path("main.go"), Language::Go);
        assert_eq!(Language::from_path("lib.rs"), Language::Rust);
        assert_eq!(Language::from_path("README.md"), Language::Text);
        assert_eq!(Language::from_path("data.bin"), Language::Generic);
        assert_eq!(Language::from_path("Makefile"), Language::Generic);
    }

    #[test]
    fn split_lines_preserves_content() {
        assert_eq!(split_lines(""), Vec::<String>::new());
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("\n"), vec![""]);
        assert_eq!(split_lines("  indented  \n"), vec!["  indented  "]);
    }

    #[test]
    fn lines_only_record_counts() {
        let rec = FileRecord::lines_only("notes.bin", Language::Generic, "one\ntwo\nthree\n");
        assert_eq!(rec.total_lines, 3);
        assert_eq!(rec.total_chars, 14);
        assert!(rec.functions.is_empty());
        assert!(rec.sections.is_empty());
    }

    #[test]
    fn slice_is_inclusive_and_bounded() {
        let rec = FileRecord::lines_only("f.txt", Language::Text, "l1\nl2\nl3\nl4\n");
        let got = rec.slice(LineRange::new(2, 3));
        assert_eq!(got, &["l2".to_string(), "l3".to_string()]);
        // Out-of-bounds end is clamped rather than panicking.
        let got = rec.slice(LineRange::new(3, 99));
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn modifiers_compose() {
        let m = Modifiers::PUB | Modifiers::ASYNC;
        assert!(m.contains(Modifiers::PUB));
        assert!(!m.contains(Modifiers::UNSAFE));
    }
}
