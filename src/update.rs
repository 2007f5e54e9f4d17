//! Incremental Updater
//!
//! Applies a changeset of added/modified/removed paths to an existing index.
//! File records and symbol-table entries are updated surgically; the import
//! and dependency graphs are then re-fused from the in-memory records by the
//! same pass the full build uses, which makes the post-update index
//! observationally identical to a rebuild of the final file set. Extraction,
//! the I/O- and parse-bound cost, runs only for the changed files.
//!
//! @module update

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::builder::{extract_one, fuse, BuildReport};
use crate::index::ProjectIndex;

/// Disjoint sets of project-relative paths that changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

/// Mutate `index` in place to reflect `changes`. The caller is responsible
/// for exclusive access for the duration of the update.
pub fn apply(index: &mut ProjectIndex, root: &Path, changes: &ChangeSet) -> BuildReport {
    let start = Instant::now();
    let mut warnings = Vec::new();

    // Old records go first: symbols and file entries for removed and
    // modified paths disappear before re-extraction.
    let stale: BTreeSet<&String> = changes.removed.iter().chain(&changes.modified).collect();
    for path in &stale {
        index.remove_symbols_for(path);
        if index.files.remove(path.as_str()).is_some() {
            debug!(file = %path, "Dropped stale record");
        }
    }

    // Fresh extraction for added and modified paths.
    let fresh: BTreeSet<&String> = changes.added.iter().chain(&changes.modified).collect();
    for path in &fresh {
        let abs = root.join(path.as_str());
        if let Some((record, warning)) = extract_one(path, &abs) {
            warnings.extend(warning);
            index.add_symbols_for(&record);
            index.files.insert(record.path.clone(), record);
        }
    }

    // Re-fuse the graphs from the updated record set.
    fuse(index);

    let report = BuildReport {
        files_indexed: fresh.len(),
        warnings,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        cancelled: false,
    };
    info!(
        changed = changes.len(),
        files = index.stats.total_files,
        elapsed_ms = report.elapsed_ms,
        "Incremental update applied"
    );
    report
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, content: &str) {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    fn modified(paths: &[&str]) -> ChangeSet {
        ChangeSet {
            modified: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn rename_invalidates_old_symbol() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", "def foo():\n    pass\n");
        write(&dir, "b.py", "from a import foo\n\ndef run():\n    foo()\n");

        let config = Config::new(dir.path());
        let (mut index, _) = build(&config).unwrap();
        assert!(index.deps_in.get("foo").unwrap().contains("run"));

        // Rename foo -> foo2 in a.py.
        write(&dir, "a.py", "def foo2():\n    pass\n");
        apply(&mut index, dir.path(), &modified(&["a.py"]));

        assert!(index.symbol_definition("foo").is_none());
        let foo2 = index.symbol_definition("foo2").unwrap();
        assert_eq!((foo2.path.as_str(), foo2.line), ("a.py", 1));

        // b.py still imports the name foo, which no longer resolves: the
        // dependency edge is gone and foo2 has no dependents.
        assert!(index.deps_in.get("foo2").unwrap().is_empty());
        assert!(!index
            .deps_in
            .get("foo")
            .is_some_and(|deps| deps.contains("run")));
    }

    #[test]
    fn update_equals_rebuild() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", "def foo():\n    pass\n");
        write(&dir, "b.py", "from a import foo\n\ndef run():\n    foo()\n");
        write(&dir, "c.py", "def lonely():\n    pass\n");

        let config = Config::new(dir.path());
        let (mut index, _) = build(&config).unwrap();

        // A batch of edits: modify, add, remove.
        write(&dir, "a.py", "def foo():\n    return 1\n\ndef extra():\n    foo()\n");
        write(&dir, "d.py", "from a import extra\n\ndef top():\n    extra()\n");
        fs::remove_file(dir.path().join("c.py")).unwrap();

        apply(
            &mut index,
            dir.path(),
            &ChangeSet {
                added: vec!["d.py".into()],
                modified: vec!["a.py".into()],
                removed: vec!["c.py".into()],
            },
        );

        let (rebuilt, _) = build(&config).unwrap();
        assert_eq!(index, rebuilt);
    }

    #[test]
    fn removed_file_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", "def foo():\n    pass\n");
        write(&dir, "b.py", "from a import foo\n\ndef run():\n    foo()\n");

        let config = Config::new(dir.path());
        let (mut index, _) = build(&config).unwrap();

        fs::remove_file(dir.path().join("a.py")).unwrap();
        apply(
            &mut index,
            dir.path(),
            &ChangeSet {
                removed: vec!["a.py".into()],
                ..Default::default()
            },
        );

        assert!(!index.files.contains_key("a.py"));
        assert!(index.symbol_definition("foo").is_none());
        assert!(!index.imports_out.contains_key("b.py"));
        assert!(!index.imports_in.contains_key("a.py"));
        assert!(index.deps_out.get("run").unwrap().is_empty());
        assert_eq!(index.stats.total_files, 1);
        assert!(index.check_invariants().is_ok());
    }

    #[test]
    fn added_file_resolves_previously_dangling_refs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.py", "from a import foo\n\ndef run():\n    foo()\n");

        let config = Config::new(dir.path());
        let (mut index, _) = build(&config).unwrap();
        assert!(index.deps_out.get("run").unwrap().is_empty());

        write(&dir, "a.py", "def foo():\n    pass\n");
        apply(
            &mut index,
            dir.path(),
            &ChangeSet {
                added: vec!["a.py".into()],
                ..Default::default()
            },
        );

        assert!(index.deps_out.get("run").unwrap().contains("foo"));
        assert!(index.imports_out.get("b.py").unwrap().contains("a.py"));

        let (rebuilt, _) = build(&config).unwrap();
        assert_eq!(index, rebuilt);
    }

    #[test]
    fn stats_track_update() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", "def foo():\n    pass\n");
        let config = Config::new(dir.path());
        let (mut index, _) = build(&config).unwrap();
        assert_eq!(index.stats.total_functions, 1);

        write(&dir, "a.py", "def foo():\n    pass\n\ndef bar():\n    pass\n");
        apply(&mut index, dir.path(), &modified(&["a.py"]));
        assert_eq!(index.stats.total_functions, 2);
        assert_eq!(index.stats.total_lines, 5);
    }
}
