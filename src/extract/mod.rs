//! Per-Language Extractors
//!
//! Each extractor is a pure function from `(path, source)` to a `FileRecord`;
//! none touches global state, so the builder fans them out across files.
//! Dispatch is by file extension: full-AST for Python, regex/brace-counting
//! lexical extraction for TypeScript/JavaScript, Go, and Rust, heading
//! detection for text files, and a line-count fallback for everything else.
//!
//! @module extract

pub mod generic;
pub mod go;
pub mod python;
pub mod rust;
pub mod scan;
pub mod text;
pub mod typescript;

use std::collections::{HashMap, HashSet};

use crate::model::{ClassRecord, FileRecord, FunctionRecord, ImportRecord, Language};

/// Extract one file. The second element carries a parse-degradation message
/// when the extractor fell back to a lines-only record.
pub fn extract_file(path: &str, source: &str) -> (FileRecord, Option<String>) {
    match Language::from_path(path) {
        Language::Python => python::extract(path, source),
        Language::TypeScript => (typescript::extract(path, source), None),
        Language::Go => (go::extract(path, source), None),
        Language::Rust => (rust::extract(path, source), None),
        Language::Text => (text::extract(path, source), None),
        Language::Generic => (generic::extract(path, source), None),
    }
}

/// Names an import statement introduces into the file's scope: exported names
/// (or the local alias that shadows a single renamed import), plus module and
/// default-import aliases. Wildcards introduce no concrete name here.
pub fn import_locals(imports: &[ImportRecord]) -> Vec<String> {
    let mut out = Vec::new();
    for imp in imports {
        if imp.names.len() == 1 && imp.names[0] != "*" {
            if let Some(alias) = &imp.alias {
                out.push(alias.clone());
                continue;
            }
        }
        for name in &imp.names {
            if name != "*" {
                out.push(name.clone());
            }
        }
        if imp.names.is_empty() {
            if let Some(alias) = &imp.alias {
                out.push(alias.clone());
            }
        }
    }
    out
}

/// Intra-file reference collection for the lexical extractors: identifiers
/// occurring inside each declaration's range, intersected with the file's own
/// declaration names plus import-introduced names.
pub(crate) fn body_refs(
    lines: &[String],
    functions: &[FunctionRecord],
    classes: &[ClassRecord],
    imports: &[ImportRecord],
    profile: scan::ScanProfile,
) -> HashMap<String, HashSet<String>> {
    let sanitized = scan::sanitize_lines(lines, profile);

    let mut candidates: HashSet<&str> = functions.iter().map(|f| f.name.as_str()).collect();
    for c in classes {
        candidates.insert(c.name.as_str());
    }
    let locals = import_locals(imports);
    candidates.extend(locals.iter().map(|s| s.as_str()));

    let mut refs: HashMap<String, HashSet<String>> = HashMap::new();
    for f in functions {
        let found = scan::collect_refs(
            &sanitized,
            f.range.start as usize - 1,
            f.range.end as usize - 1,
            &f.name,
            &candidates,
        );
        refs.entry(f.qualified_name.clone()).or_default().extend(found);
    }
    for c in classes {
        let mut found = scan::collect_refs(
            &sanitized,
            c.range.start as usize - 1,
            c.range.end as usize - 1,
            &c.name,
            &candidates,
        );
        found.extend(
            c.bases
                .iter()
                .filter(|b| candidates.contains(b.as_str()) && **b != c.name)
                .cloned(),
        );
        refs.entry(c.name.clone()).or_default().extend(found);
    }
    refs
}
