//! Index Builder
//!
//! Builds a `ProjectIndex` in four passes: parallel per-file extraction,
//! symbol-table population, import-graph resolution, and dependency-graph
//! resolution. The graph passes are pure functions over the in-memory file
//! records, shared with the incremental updater so both paths fuse records
//! identically.
//!
//! @module builder

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::discover::{read_source, FileWalker};
use crate::error::Result;
use crate::extract::extract_file;
use crate::index::{reverse_graph, ProjectIndex};
use crate::model::{FileRecord, ImportRecord, Language, LineRange};

// =============================================================================
// WARNINGS AND REPORT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Read,
    Parse,
}

/// A non-fatal problem encountered while indexing one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildWarning {
    pub path: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Outcome of a full build or incremental update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub files_indexed: usize,
    pub warnings: Vec<BuildWarning>,
    pub elapsed_ms: f64,
    pub cancelled: bool,
}

// =============================================================================
// FULL BUILD
// =============================================================================

/// Build an index of the configured project root.
pub fn build(config: &Config) -> Result<(ProjectIndex, BuildReport)> {
    build_with_cancel(config, None)
}

/// Build, checking `cancel` between files. A cancelled build still returns
/// the partial index assembled so far, flagged in the report.
pub fn build_with_cancel(
    config: &Config,
    cancel: Option<&AtomicBool>,
) -> Result<(ProjectIndex, BuildReport)> {
    let start = Instant::now();
    let walker = FileWalker::new(config)?;
    let discovered = walker.walk();
    info!(files = discovered.len(), root = %config.root.display(), "Discovered files");

    // Extractors are pure per-file; fan out across the discovered set.
    let extracted: Vec<(FileRecord, Option<BuildWarning>)> = discovered
        .par_iter()
        .filter_map(|file| {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return None;
            }
            extract_one(&file.rel_path, &file.abs_path)
        })
        .collect();

    let cancelled = cancel.is_some_and(|c| c.load(Ordering::Relaxed));

    let mut index = ProjectIndex::new(config.root.clone());
    let mut warnings = Vec::new();
    for (record, warning) in extracted {
        warnings.extend(warning);
        index.add_symbols_for(&record);
        index.files.insert(record.path.clone(), record);
    }

    fuse(&mut index);

    let report = BuildReport {
        files_indexed: index.files.len(),
        warnings,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        cancelled,
    };
    info!(
        files = report.files_indexed,
        lines = index.stats.total_lines,
        functions = index.stats.total_functions,
        classes = index.stats.total_classes,
        elapsed_ms = report.elapsed_ms,
        "Index built"
    );
    Ok((index, report))
}

/// Read and extract one file. `None` means the file was rejected (binary).
pub(crate) fn extract_one(
    rel_path: &str,
    abs_path: &std::path::Path,
) -> Option<(FileRecord, Option<BuildWarning>)> {
    let source = match read_source(abs_path) {
        Ok(Some(source)) => source,
        Ok(None) => {
            debug!(file = rel_path, "Skipping binary file");
            return None;
        }
        Err(err) => {
            warn!(file = rel_path, error = %err, "Unreadable file, indexing empty record");
            let record = FileRecord::lines_only(rel_path, Language::Generic, "");
            let warning = BuildWarning {
                path: rel_path.to_string(),
                kind: WarningKind::Read,
                message: err.to_string(),
            };
            return Some((record, Some(warning)));
        }
    };

    let (record, parse_warning) = extract_file(rel_path, &source);
    let warning = parse_warning.map(|message| {
        warn!(file = rel_path, message = %message, "Extractor degraded");
        BuildWarning {
            path: rel_path.to_string(),
            kind: WarningKind::Parse,
            message,
        }
    });
    Some((record, warning))
}

/// Recompute everything derived from the file records: import graph,
/// dependency graph, their inverses, and the stats. Shared by the full
/// build and the incremental updater so both produce identical structures.
pub(crate) fn fuse(index: &mut ProjectIndex) {
    resolve_import_graph(index);
    resolve_dependency_graph(index);
    index.recompute_stats();
    debug_assert!(index.check_invariants().is_ok(), "index invariants violated");
}

// =============================================================================
// IMPORT GRAPH (pass 3)
// =============================================================================

fn resolve_import_graph(index: &mut ProjectIndex) {
    let paths: HashSet<String> = index.files.keys().cloned().collect();
    let go_dirs = go_package_dirs(&paths);

    let mut imports_out: HashMap<String, HashSet<String>> = HashMap::new();
    for (path, record) in &index.files {
        let mut targets: HashSet<String> = HashSet::new();
        for imp in &record.imports {
            targets.extend(resolve_import(path, imp, &paths, &go_dirs));
        }
        targets.remove(path);
        if !targets.is_empty() {
            imports_out.insert(path.clone(), targets);
        }
    }

    index.imports_in = reverse_graph(&imports_out);
    index.imports_out = imports_out;
}

/// Directories containing `.go` files, keyed by full directory path.
fn go_package_dirs(paths: &HashSet<String>) -> HashMap<String, Vec<String>> {
    let mut dirs: HashMap<String, Vec<String>> = HashMap::new();
    for path in paths {
        if path.ends_with(".go") {
            let dir = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
            dirs.entry(dir.to_string()).or_default().push(path.clone());
        }
    }
    dirs
}

/// Resolve one import to project-local file paths. Unresolvable imports
/// (external packages, stdlib) yield nothing; that is a normal outcome.
pub(crate) fn resolve_import(
    importing: &str,
    imp: &ImportRecord,
    paths: &HashSet<String>,
    go_dirs: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    if imp.module.is_empty() {
        return Vec::new();
    }
    let ext = importing.rsplit('.').next().unwrap_or("");
    match ext {
        "py" | "pyw" => resolve_python(&imp.module, paths).into_iter().collect(),
        "ts" | "tsx" | "js" | "jsx" => resolve_typescript(importing, &imp.module, paths)
            .into_iter()
            .collect(),
        "go" => resolve_go(&imp.module, go_dirs),
        "rs" => resolve_rust(importing, imp, paths).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// `a.b.c` -> `a/b/c.py` or `a/b/c/__init__.py`, searched under the project
/// root, `src/`, and `lib/`.
fn resolve_python(module: &str, paths: &HashSet<String>) -> Option<String> {
    let rel = module.replace('.', "/");
    for prefix in ["", "src/", "lib/"] {
        let as_file = format!("{}{}.py", prefix, rel);
        if paths.contains(&as_file) {
            return Some(as_file);
        }
        let as_package = format!("{}{}/__init__.py", prefix, rel);
        if paths.contains(&as_package) {
            return Some(as_package);
        }
    }
    None
}

const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx"];

fn resolve_typescript(importing: &str, module: &str, paths: &HashSet<String>) -> Option<String> {
    let base = if module.starts_with('.') {
        let dir = importing.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        join_normalized(dir, module)
    } else if let Some(rest) = module.strip_prefix("@/") {
        format!("src/{}", rest)
    } else {
        // External package.
        return None;
    };

    if paths.contains(&base) {
        return Some(base);
    }
    for ext in TS_EXTENSIONS {
        let candidate = format!("{}{}", base, ext);
        if paths.contains(&candidate) {
            return Some(candidate);
        }
    }
    for ext in TS_EXTENSIONS {
        let candidate = format!("{}/index{}", base, ext);
        if paths.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Resolve `./x` and `../x` against a base directory.
fn join_normalized(dir: &str, module: &str) -> String {
    let mut parts: Vec<&str> = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect()
    };
    for seg in module.split('/') {
        match seg {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// The last path segment names a Go package. When exactly one project
/// directory mirrors that name, the import targets every `.go` file directly
/// in it; anything ambiguous is dropped.
fn resolve_go(module: &str, go_dirs: &HashMap<String, Vec<String>>) -> Vec<String> {
    let seg = module.rsplit('/').next().unwrap_or(module);
    if seg.is_empty() {
        return Vec::new();
    }
    let suffix = format!("/{}", seg);
    let matches: Vec<&String> = go_dirs
        .keys()
        .filter(|dir| dir.as_str() == seg || dir.ends_with(&suffix))
        .collect();
    match matches.as_slice() {
        [only] => go_dirs[only.as_str()].clone(),
        _ => Vec::new(),
    }
}

/// Best-effort `use` resolution. `crate::` anchors at the importing file's
/// `src/` root, `self::`/`super::` at its module directory; external crates
/// are dropped.
fn resolve_rust(importing: &str, imp: &ImportRecord, paths: &HashSet<String>) -> Option<String> {
    let segs: Vec<&str> = imp.module.split("::").collect();
    let (anchor, rest) = match segs.first().copied() {
        Some("crate") => (rust_src_root(importing), &segs[1..]),
        Some("self") => (rust_module_dir(importing), &segs[1..]),
        Some("super") => {
            let module_dir = rust_module_dir(importing);
            let parent = module_dir
                .rsplit_once('/')
                .map(|(d, _)| d.to_string())
                .unwrap_or_default();
            (parent, &segs[1..])
        }
        _ => return None,
    };

    // A single imported name may itself be a module (`use crate::a::b`),
    // so try the deeper path first.
    let mut seg_chain: Vec<&str> = rest.to_vec();
    if imp.names.len() == 1 && imp.names[0] != "*" && imp.names[0] != "self" {
        seg_chain.push(imp.names[0].as_str());
    }

    for depth in (1..=seg_chain.len()).rev() {
        let joined = seg_chain[..depth].join("/");
        let prefix = if anchor.is_empty() {
            joined
        } else {
            format!("{}/{}", anchor, joined)
        };
        let as_file = format!("{}.rs", prefix);
        if paths.contains(&as_file) {
            return Some(as_file);
        }
        let as_mod = format!("{}/mod.rs", prefix);
        if paths.contains(&as_mod) {
            return Some(as_mod);
        }
    }
    None
}

fn rust_src_root(importing: &str) -> String {
    if importing.starts_with("src/") {
        return "src".to_string();
    }
    if let Some(pos) = importing.find("/src/") {
        return importing[..pos + 4].to_string();
    }
    String::new()
}

fn rust_module_dir(importing: &str) -> String {
    if let Some(dir) = importing.strip_suffix("/mod.rs") {
        return dir.to_string();
    }
    if importing.ends_with("/lib.rs") || importing.ends_with("/main.rs") {
        return importing.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default();
    }
    importing.strip_suffix(".rs").unwrap_or(importing).to_string()
}

// =============================================================================
// DEPENDENCY GRAPH (pass 4)
// =============================================================================

static WORD_RE_CACHE: Lazy<parking_lot::Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| parking_lot::Mutex::new(HashMap::new()));

fn word_regex(name: &str) -> Regex {
    let mut cache = WORD_RE_CACHE.lock();
    cache
        .entry(name.to_string())
        .or_insert_with(|| {
            Regex::new(&format!(r"\b{}\b", regex::escape(name)))
                .unwrap_or_else(|_| Regex::new(r"\bunmatchable\b").unwrap())
        })
        .clone()
}

/// An import-introduced local binding: local name -> (exported name, files
/// the import resolved to).
type ImportedNames = HashMap<String, (String, Vec<String>)>;

fn resolve_dependency_graph(index: &mut ProjectIndex) {
    let paths: HashSet<String> = index.files.keys().cloned().collect();
    let go_dirs = go_package_dirs(&paths);

    let mut deps_out: HashMap<String, HashSet<String>> = HashMap::new();

    // Every defined qualified name owns a node, so "no edges" is
    // distinguishable from "unknown symbol".
    for record in index.files.values() {
        for name in record.defined_names() {
            deps_out.entry(name.to_string()).or_default();
        }
    }

    for (path, record) in &index.files {
        let imported = imported_names(index, path, record, &paths, &go_dirs);

        // Declared references, resolved per the (a)/(b)/(c) rules.
        for (source, refs) in &record.local_refs {
            let mut resolved: HashSet<String> = HashSet::new();
            for name in refs {
                if let Some(target) = resolve_ref(name, record, &imported, index) {
                    if &target != source {
                        resolved.insert(target);
                    }
                }
            }
            deps_out.entry(source.clone()).or_default().extend(resolved);
        }

        // Text-level rescan of declaration bodies against imported names,
        // catching references the declaration walk missed.
        if imported.is_empty() {
            continue;
        }
        let spans: Vec<(String, LineRange)> = record
            .functions
            .iter()
            .map(|f| (f.qualified_name.clone(), f.range))
            .chain(record.classes.iter().map(|c| (c.name.clone(), c.range)))
            .collect();
        for (source, range) in spans {
            let body = record.slice(range).join(" ");
            for (local, (exported, target_paths)) in &imported {
                if !word_regex(local).is_match(&body) {
                    continue;
                }
                if let Some(target) =
                    resolve_imported(exported, target_paths, index)
                {
                    if target != source {
                        deps_out.entry(source.clone()).or_default().insert(target);
                    }
                }
            }
        }
    }

    index.deps_in = reverse_graph(&deps_out);
    // Defined symbols keep (possibly empty) nodes on the inverse side too.
    for name in deps_out.keys() {
        index.deps_in.entry(name.clone()).or_default();
    }
    index.deps_out = deps_out;
}

/// Build the local-name table an import block introduces into a file.
fn imported_names(
    index: &ProjectIndex,
    path: &str,
    record: &FileRecord,
    paths: &HashSet<String>,
    go_dirs: &HashMap<String, Vec<String>>,
) -> ImportedNames {
    let mut imported = ImportedNames::new();
    for imp in &record.imports {
        let targets = resolve_import(path, imp, paths, go_dirs);

        if imp.names.len() == 1 && imp.names[0] != "*" {
            let exported = imp.names[0].clone();
            let local = imp.alias.clone().unwrap_or_else(|| exported.clone());
            imported.insert(local, (exported, targets));
            continue;
        }

        for name in &imp.names {
            if name == "*" {
                // A wildcard introduces every top-level symbol of the
                // resolved target files.
                for target in &targets {
                    if let Some(target_record) = index.files.get(target) {
                        for exported in wildcard_names(target_record) {
                            imported
                                .entry(exported.clone())
                                .or_insert_with(|| (exported, targets.clone()));
                        }
                    }
                }
            } else {
                imported.insert(name.clone(), (name.clone(), targets.clone()));
            }
        }
    }
    imported
}

fn wildcard_names(record: &FileRecord) -> Vec<String> {
    record
        .functions
        .iter()
        .filter(|f| !f.is_method)
        .map(|f| f.name.clone())
        .chain(record.classes.iter().map(|c| c.name.clone()))
        .collect()
}

/// Resolution rules for one reference: (a) import-introduced, (b) defined in
/// this file, (c) unique global symbol. Anything else is dropped.
fn resolve_ref(
    name: &str,
    record: &FileRecord,
    imported: &ImportedNames,
    index: &ProjectIndex,
) -> Option<String> {
    if let Some((exported, target_paths)) = imported.get(name) {
        return resolve_imported(exported, target_paths, index);
    }
    if record.defined_names().any(|n| n == name)
        || record.functions.iter().any(|f| f.name == name)
    {
        return Some(name.to_string());
    }
    match index.symbols.get(name) {
        Some(entries) if entries.len() == 1 => Some(name.to_string()),
        _ => None,
    }
}

fn resolve_imported(
    exported: &str,
    target_paths: &[String],
    index: &ProjectIndex,
) -> Option<String> {
    let entries = index.symbols.get(exported)?;
    if target_paths.is_empty() {
        // Import did not resolve to a project file; accept the name since the
        // import binds it explicitly (ties break at query time).
        return Some(exported.to_string());
    }
    entries
        .iter()
        .any(|e| target_paths.iter().any(|t| t == &e.path))
        .then(|| exported.to_string())
}

// =============================================================================
// TESTS
// =============================================================================
