//! Index Service
//!
//! `Codemap` owns the `ProjectIndex` behind a `parking_lot::RwLock`: any
//! number of concurrent readers share a stable snapshot, while updates take
//! the write lock. parking_lot's write-preference blocks new readers once a
//! writer is queued, so writers cannot starve. File records are immutable
//! once inserted; an update installs fresh records rather than mutating.
//!
//! @module service

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use tracing::info;

use crate::builder::{build, BuildReport};
use crate::config::Config;
use crate::discover::{read_source, FileWalker};
use crate::error::Result;
use crate::index::{IndexStats, ProjectIndex};
use crate::query::params::*;
use crate::query::results::*;
use crate::query::Queries;
use crate::update::{self, ChangeSet};

/// The stable operation surface: one value owning the index, exposing the
/// query set plus reindexing. A thin server adapts these typed functions to
/// its wire protocol.
pub struct Codemap {
    config: Config,
    index: RwLock<ProjectIndex>,
    last_report: Mutex<BuildReport>,
}

impl Codemap {
    /// Build the index for the configured root and wrap it for serving.
    pub fn open(config: Config) -> Result<Self> {
        let (index, report) = build(&config)?;
        Ok(Self {
            config,
            index: RwLock::new(index),
            last_report: Mutex::new(report),
        })
    }

    /// Open against `PROJECT_ROOT`, or the working directory if unset.
    pub fn from_env() -> Result<Self> {
        Self::open(Config::from_env()?)
    }

    /// Warnings and timing from the most recent build or update.
    pub fn last_report(&self) -> BuildReport {
        self.last_report.lock().clone()
    }

    pub fn stats(&self) -> IndexStats {
        self.index.read().stats
    }

    /// Run a closure against a read-locked query snapshot.
    pub fn with_queries<R>(&self, f: impl FnOnce(&Queries) -> R) -> R {
        let index = self.index.read();
        f(&Queries::new(&index))
    }

    // -------------------------------------------------------------------------
    // Query surface
    // -------------------------------------------------------------------------

    pub fn get_project_summary(&self) -> ProjectSummary {
        self.with_queries(|q| q.project_summary())
    }

    pub fn list_files(&self, params: &ListFilesParams) -> Result<FileList> {
        self.with_queries(|q| q.list_files(params))
    }

    pub fn get_structure_summary(&self, params: &StructureSummaryParams) -> Result<StructureSummary> {
        self.with_queries(|q| q.structure_summary(params))
    }

    pub fn get_functions(&self, params: &ListingParams) -> Result<FunctionList> {
        self.with_queries(|q| q.functions(params))
    }

    pub fn get_classes(&self, params: &ListingParams) -> Result<ClassList> {
        self.with_queries(|q| q.classes(params))
    }

    pub fn get_imports(&self, params: &ListingParams) -> Result<ImportList> {
        self.with_queries(|q| q.imports(params))
    }

    pub fn get_function_source(&self, params: &SourceParams) -> Result<SourceSlice> {
        self.with_queries(|q| q.function_source(params))
    }

    pub fn get_class_source(&self, params: &SourceParams) -> Result<SourceSlice> {
        self.with_queries(|q| q.class_source(params))
    }

    pub fn find_symbol(&self, params: &FindSymbolParams) -> Result<SymbolLocation> {
        self.with_queries(|q| q.find_symbol(params))
    }

    pub fn get_dependencies(&self, params: &DependencyParams) -> Result<DependencyList> {
        self.with_queries(|q| q.dependencies(params))
    }

    pub fn get_dependents(&self, params: &DependencyParams) -> Result<DependencyList> {
        self.with_queries(|q| q.dependents(params))
    }

    pub fn get_change_impact(&self, params: &ChangeImpactParams) -> Result<ChangeImpact> {
        self.with_queries(|q| q.change_impact(params))
    }

    pub fn get_call_chain(&self, params: &CallChainParams) -> Result<CallChain> {
        self.with_queries(|q| q.call_chain(params))
    }

    pub fn get_file_dependencies(&self, params: &FileGraphParams) -> Result<FileDependencyList> {
        self.with_queries(|q| q.file_dependencies(params))
    }

    pub fn get_file_dependents(&self, params: &FileGraphParams) -> Result<FileDependencyList> {
        self.with_queries(|q| q.file_dependents(params))
    }

    pub fn search_codebase(&self, params: &SearchParams) -> Result<SearchResults> {
        self.with_queries(|q| q.search(params))
    }

    pub fn get_lines(&self, params: &GetLinesParams) -> Result<SourceSlice> {
        self.with_queries(|q| q.lines(params))
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Apply an externally computed changeset under the write lock.
    pub fn apply_changes(&self, changes: &ChangeSet) -> Result<BuildReport> {
        let mut index = self.index.write();
        let report = update::apply(&mut index, &self.config.root, changes);
        *self.last_report.lock() = report.clone();
        Ok(report)
    }

    /// Rebuild the index. `full` discards everything and re-extracts from
    /// disk; otherwise the tree is re-walked and a content-hash diff drives
    /// an incremental update.
    pub fn reindex(&self, params: &ReindexParams) -> Result<BuildReport> {
        if params.full {
            let (index, report) = build(&self.config)?;
            *self.index.write() = index;
            *self.last_report.lock() = report.clone();
            return Ok(report);
        }

        let changes = self.detect_changes()?;
        if changes.is_empty() {
            info!("Reindex: no changes detected");
            return Ok(BuildReport::default());
        }
        self.apply_changes(&changes)
    }

    /// Diff the on-disk tree against the indexed content hashes.
    fn detect_changes(&self) -> Result<ChangeSet> {
        let walker = FileWalker::new(&self.config)?;
        let discovered = walker.walk();

        let mut changes = ChangeSet::default();
        let mut seen: HashSet<String> = HashSet::new();
        {
            let index = self.index.read();
            for file in &discovered {
                seen.insert(file.rel_path.clone());
                let on_disk = match read_source(&file.abs_path) {
                    Ok(Some(source)) => xxhash_rust::xxh3::xxh3_64(source.as_bytes()),
                    // Binary now: treated as gone below. Unreadable: hashes
                    // like the empty record such files degrade to.
                    Ok(None) => {
                        seen.remove(&file.rel_path);
                        continue;
                    }
                    Err(_) => xxhash_rust::xxh3::xxh3_64(b""),
                };
                match index.files.get(&file.rel_path) {
                    Some(record) if record.content_hash == on_disk => {}
                    Some(_) => changes.modified.push(file.rel_path.clone()),
                    None => changes.added.push(file.rel_path.clone()),
                }
            }
            for path in index.files.keys() {
                if !seen.contains(path) {
                    changes.removed.push(path.clone());
                }
            }
        }
        changes.added.sort();
        changes.modified.sort();
        changes.removed.sort();
        Ok(changes)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn service(files: &[(&str, &str)]) -> (TempDir, Codemap) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }
        let codemap = Codemap::open(Config::new(dir.path())).unwrap();
        (dir, codemap)
    }

    #[test]
    fn open_and_query() {
        let (_dir, codemap) = service(&[
            ("a.py", "def foo():\n    pass\n"),
            ("b.py", "from a import foo\n\ndef run():\n    foo()\n"),
        ]);

        assert_eq!(codemap.stats().total_files, 2);
        let loc = codemap
            .find_symbol(&FindSymbolParams { name: "foo".into() })
            .unwrap();
        assert_eq!(loc.path, "a.py");

        let dependents = codemap
            .get_dependents(&DependencyParams::named("foo"))
            .unwrap();
        assert_eq!(dependents.entries.len(), 1);
        assert_eq!(dependents.entries[0].symbol, "run");
    }

    #[test]
    fn hash_diff_reindex_detects_edits() {
        let (dir, codemap) = service(&[("a.py", "def foo():\n    pass\n")]);

        // Untouched tree: no work.
        let report = codemap.reindex(&ReindexParams { full: false }).unwrap();
        assert_eq!(report.files_indexed, 0);

        fs::write(dir.path().join("a.py"), "def foo2():\n    pass\n").unwrap();
        fs::write(dir.path().join("b.py"), "x = 1\n").unwrap();
        codemap.reindex(&ReindexParams { full: false }).unwrap();

        assert!(codemap
            .find_symbol(&FindSymbolParams { name: "foo".into() })
            .is_err());
        assert!(codemap
            .find_symbol(&FindSymbolParams { name: "foo2".into() })
            .is_ok());
        assert_eq!(codemap.stats().total_files, 2);
    }

    #[test]
    fn hash_diff_reindex_detects_removal() {
        let (dir, codemap) = service(&[
            ("a.py", "def foo():\n    pass\n"),
            ("b.py", "def bar():\n    pass\n"),
        ]);
        fs::remove_file(dir.path().join("b.py")).unwrap();
        codemap.reindex(&ReindexParams { full: false }).unwrap();
        assert_eq!(codemap.stats().total_files, 1);
        assert!(codemap
            .find_symbol(&FindSymbolParams { name: "bar".into() })
            .is_err());
    }

    #[test]
    fn full_reindex_rebuilds() {
        let (dir, codemap) = service(&[("a.py", "def foo():\n    pass\n")]);
        fs::write(dir.path().join("a.py"), "def other():\n    pass\n").unwrap();
        let report = codemap.reindex(&ReindexParams { full: true }).unwrap();
        assert_eq!(report.files_indexed, 1);
        assert!(codemap
            .find_symbol(&FindSymbolParams { name: "other".into() })
            .is_ok());
    }

    #[test]
    fn concurrent_readers_during_update() {
        let (dir, codemap) = service(&[("a.py", "def foo():\n    pass\n")]);
        fs::write(dir.path().join("a.py"), "def foo():\n    return 2\n").unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        // Readers always observe a coherent snapshot: foo is
                        // findable before and after the update.
                        let loc = codemap
                            .find_symbol(&FindSymbolParams { name: "foo".into() })
                            .unwrap();
                        assert_eq!(loc.path, "a.py");
                    }
                });
            }
            scope.spawn(|| {
                codemap.reindex(&ReindexParams { full: false }).unwrap();
            });
        });

        let source = codemap
            .get_function_source(&SourceParams::named("foo"))
            .unwrap();
        assert_eq!(source.lines[1], "    return 2");
    }

    #[test]
    fn build_warnings_are_retrievable() {
        let (_dir, codemap) = service(&[("bad.py", "def broken(:\n    pass\n")]);
        let report = codemap.last_report();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, "bad.py");
    }
}
