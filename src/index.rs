//! Project Index
//!
//! The in-memory fusion of per-file records: a global symbol table, the
//! file-level import graph, the symbol-level dependency graph, and the
//! inverses of both. Iteration order of the maps is never exposed; queries
//! sort before returning.
//!
//! @module index

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::model::{FileRecord, FunctionRecord, SymbolKind};

// =============================================================================
// SYMBOL TABLE
// =============================================================================

/// One definition site of a symbol name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub path: String,
    pub line: u32,
    pub kind: SymbolKind,
}

/// Symbol kind of a function record, honoring the macro marker the Rust
/// extractor leaves in the decorator list.
pub fn function_symbol_kind(func: &FunctionRecord) -> SymbolKind {
    if func.decorators.iter().any(|d| d == "macro") {
        SymbolKind::Macro
    } else if func.is_method {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    }
}

// =============================================================================
// STATS
// =============================================================================

/// Aggregate counts over the indexed file set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_lines: u64,
    pub total_functions: usize,
    pub total_classes: usize,
}

// =============================================================================
// PROJECT INDEX
// =============================================================================

/// Structural index for an entire codebase.
///
/// `deps_out`/`deps_in` and `imports_out`/`imports_in` are mutual inverses;
/// identifiers are plain interned strings (qualified names and file paths).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectIndex {
    pub root: PathBuf,
    pub files: HashMap<String, FileRecord>,
    /// name -> every definition site, sorted by (path, line).
    pub symbols: HashMap<String, Vec<SymbolEntry>>,
    pub imports_out: HashMap<String, HashSet<String>>,
    pub imports_in: HashMap<String, HashSet<String>>,
    pub deps_out: HashMap<String, HashSet<String>>,
    pub deps_in: HashMap<String, HashSet<String>>,
    pub stats: IndexStats,
}

impl ProjectIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: HashMap::new(),
            symbols: HashMap::new(),
            imports_out: HashMap::new(),
            imports_in: HashMap::new(),
            deps_out: HashMap::new(),
            deps_in: HashMap::new(),
            stats: IndexStats::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Symbol table maintenance
    // -------------------------------------------------------------------------

    /// Register every symbol a file record defines. Methods are keyed by both
    /// `Class.method` and the bare method name; the per-name vec stays sorted
    /// by (path, line) so builds are order-independent.
    pub fn add_symbols_for(&mut self, record: &FileRecord) {
        for func in &record.functions {
            let kind = function_symbol_kind(func);
            self.insert_symbol(&func.qualified_name, &record.path, func.range.start, kind);
            if func.is_method {
                self.insert_symbol(&func.name, &record.path, func.range.start, kind);
            }
        }
        for class in &record.classes {
            self.insert_symbol(
                &class.name,
                &record.path,
                class.range.start,
                class.kind.as_symbol_kind(),
            );
        }
    }

    fn insert_symbol(&mut self, name: &str, path: &str, line: u32, kind: SymbolKind) {
        let entry = SymbolEntry {
            path: path.to_string(),
            line,
            kind,
        };
        let entries = self.symbols.entry(name.to_string()).or_default();
        if !entries.contains(&entry) {
            let pos = entries.partition_point(|e| e < &entry);
            entries.insert(pos, entry);
        }
    }

    /// Drop every symbol entry pointing into `path`.
    pub fn remove_symbols_for(&mut self, path: &str) {
        self.symbols.retain(|_, entries| {
            entries.retain(|e| e.path != path);
            !entries.is_empty()
        });
    }

    /// Resolve a name to its definition, ties broken by smallest path then
    /// smallest line (the vec is kept in that order).
    pub fn symbol_definition(&self, name: &str) -> Option<&SymbolEntry> {
        self.symbols.get(name).and_then(|entries| entries.first())
    }

    /// Whether the name is known at all, either as a definition or as a node
    /// in the dependency graph.
    pub fn knows_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
            || self.deps_out.contains_key(name)
            || self.deps_in.contains_key(name)
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    pub fn recompute_stats(&mut self) {
        let mut stats = IndexStats {
            total_files: self.files.len(),
            ..Default::default()
        };
        for record in self.files.values() {
            stats.total_lines += record.total_lines as u64;
            stats.total_functions += record.functions.len();
            stats.total_classes += record.classes.len();
        }
        self.stats = stats;
    }

    // -------------------------------------------------------------------------
    // Invariants
    // -------------------------------------------------------------------------

    /// Graph inverse consistency and range validity. Used behind
    /// `debug_assert!` after builds and updates.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        check_inverse(&self.imports_out, &self.imports_in, "imports")?;
        check_inverse(&self.imports_in, &self.imports_out, "imports_in")?;
        check_inverse(&self.deps_out, &self.deps_in, "deps")?;
        check_inverse(&self.deps_in, &self.deps_out, "deps_in")?;

        for record in self.files.values() {
            for func in &record.functions {
                if func.range.end > record.total_lines.max(1) {
                    return Err(format!(
                        "{}: range {}..{} exceeds {} lines",
                        record.path, func.range.start, func.range.end, record.total_lines
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_inverse(
    forward: &HashMap<String, HashSet<String>>,
    inverse: &HashMap<String, HashSet<String>>,
    label: &str,
) -> std::result::Result<(), String> {
    for (source, targets) in forward {
        for target in targets {
            let ok = inverse
                .get(target)
                .is_some_and(|sources| sources.contains(source));
            if !ok {
                return Err(format!(
                    "{}: edge {} -> {} missing from inverse",
                    label, source, target
                ));
            }
        }
    }
    Ok(())
}

/// Transpose a graph: for each target, collect all sources.
pub fn reverse_graph(graph: &HashMap<String, HashSet<String>>) -> HashMap<String, HashSet<String>> {
    let mut reverse: HashMap<String, HashSet<String>> = HashMap::new();
    for (source, targets) in graph {
        for target in targets {
            reverse
                .entry(target.clone())
                .or_default()
                .insert(source.clone());
        }
    }
    reverse
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Language;

    fn record_with_symbols(path: &str, source: &str) -> FileRecord {
        let (rec, _) = crate::extract::extract_file(path, source);
        rec
    }

    #[test]
    fn symbol_entries_sorted_by_path_then_line() {
        let mut index = ProjectIndex::new("/p");
        let b = record_with_symbols("b.py", "def foo():\n    pass\n");
        let a = record_with_symbols("a.py", "x = 1\n\ndef foo():\n    pass\n");
        // Insert out of order; lookups still see a.py first.
        index.add_symbols_for(&b);
        index.add_symbols_for(&a);

        let entries = index.symbols.get("foo").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "a.py");
        assert_eq!(entries[1].path, "b.py");
        assert_eq!(index.symbol_definition("foo").unwrap().path, "a.py");
    }

    #[test]
    fn methods_keyed_both_ways() {
        let mut index = ProjectIndex::new("/p");
        let rec = record_with_symbols(
            "svc.py",
            "class Service:\n    def start(self):\n        pass\n",
        );
        index.add_symbols_for(&rec);

        assert!(index.symbols.contains_key("Service.start"));
        assert!(index.symbols.contains_key("start"));
        assert!(index.symbols.contains_key("Service"));
        assert_eq!(
            index.symbol_definition("Service.start").unwrap().kind,
            SymbolKind::Method
        );
        assert_eq!(
            index.symbol_definition("Service").unwrap().kind,
            SymbolKind::Class
        );
    }

    #[test]
    fn remove_symbols_for_path() {
        let mut index = ProjectIndex::new("/p");
        let a = record_with_symbols("a.py", "def foo():\n    pass\n");
        let b = record_with_symbols("b.py", "def foo():\n    pass\n");
        index.add_symbols_for(&a);
        index.add_symbols_for(&b);

        index.remove_symbols_for("a.py");
        let entries = index.symbols.get("foo").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "b.py");

        index.remove_symbols_for("b.py");
        assert!(!index.symbols.contains_key("foo"));
    }

    #[test]
    fn reverse_graph_transposes() {
        let mut graph: HashMap<String, HashSet<String>> = HashMap::new();
        graph
            .entry("a".into())
            .or_default()
            .extend(["b".to_string(), "c".to_string()]);
        graph.entry("d".into()).or_default().insert("b".to_string());

        let rev = reverse_graph(&graph);
        assert_eq!(
            rev.get("b").unwrap(),
            &["a".to_string(), "d".to_string()].into_iter().collect()
        );
        assert!(!rev.contains_key("a"));
    }

    #[test]
    fn stats_recompute() {
        let mut index = ProjectIndex::new("/p");
        let rec = FileRecord::lines_only("x.txt", Language::Text, "a\nb\nc\n");
        index.files.insert("x.txt".into(), rec);
        index.recompute_stats();
        assert_eq!(index.stats.total_files, 1);
        assert_eq!(index.stats.total_lines, 3);
    }

    #[test]
    fn invariant_check_catches_missing_inverse() {
        let mut index = ProjectIndex::new("/p");
        index
            .deps_out
            .entry("a".into())
            .or_default()
            .insert("b".into());
        assert!(index.check_invariants().is_err());

        index
            .deps_in
            .entry("b".into())
            .or_default()
            .insert("a".into());
        assert!(index.check_invariants().is_ok());
    }
}
