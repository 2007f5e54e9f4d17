//! TypeScript / JavaScript Extractor
//!
//! Pattern-driven, best-effort extraction: function declarations, arrow
//! functions bound to `const`/`let`/`var`, classes, interfaces, type aliases,
//! class methods, and ES import statements. Line ranges come from brace
//! matching with string/comment skipping. Not a parser; functions inside
//! template literals and generics containing `>` in strings may be missed.
//!
//! @module extract/typescript

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use super::scan;
use crate::model::{
    ClassKind, ClassRecord, FileRecord, FunctionRecord, ImportRecord, Language, LineRange,
    Modifiers, Parameter,
};

// =============================================================================
// PATTERNS
// =============================================================================

static FUNC_DECL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:export\s+)?(?:default\s+)?(async\s+)?function\s+(\w+)\s*\(([^)]*)\)").unwrap());

static ARROW_FUNC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(async\s+)?\(([^)]*)\)\s*(?::\s*[^=]+?)?\s*=>")
        .unwrap()
});

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)(?:\s+extends\s+([\w.]+))?(?:\s+implements\s+([\w.,\s]+))?")
        .unwrap()
});

static INTERFACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:export\s+)?interface\s+(\w+)(?:\s+extends\s+([\w.,\s]+))?").unwrap());

static TYPE_ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:export\s+)?type\s+(\w+)\s*(?:<[^>]*>)?\s*=").unwrap());

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s+(?:(?:public|private|protected|static|async|readonly|abstract|override|get|set)\s+)*(\w+)\s*\(([^)]*)\)")
        .unwrap()
});

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)^import\s+
           (?:
             (?:type\s+)? \{([^}]*)\} \s+from\s+          # named:      { A, B }
             | (\*\s+as\s+\w+) \s+from\s+                 # namespace:  * as X
             | (\w+) \s*,\s* \{([^}]*)\} \s+from\s+       # default + named
             | (\w+) \s+from\s+                           # default:    Foo
           )
           ['"]([^'"]+)['"]"#,
    )
    .unwrap()
});

static SIDE_EFFECT_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^import\s+['"]([^'"]+)['"]"#).unwrap());

const METHOD_NAME_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "return", "new", "throw", "import", "export", "const",
    "let", "var", "catch", "function", "typeof",
];

// =============================================================================
// EXTRACTION
// =============================================================================

pub fn extract(path: &str, source: &str) -> FileRecord {
    let mut record = FileRecord::lines_only(path, Language::TypeScript, source);
    let lines = record.lines.clone();
    let total = lines.len();

    record.imports = parse_imports(&lines);

    // Pass 1: class-like declarations, consuming their body ranges.
    let mut class_heads: Vec<(String, usize, usize, Vec<String>, ClassKind)> = Vec::new();
    let mut i = 0;
    while i < total {
        let stripped = lines[i].trim();

        if let Some(caps) = CLASS_RE.captures(stripped) {
            let mut bases = Vec::new();
            if let Some(ext) = caps.get(2) {
                bases.push(ext.as_str().trim().to_string());
            }
            if let Some(impls) = caps.get(3) {
                bases.extend(split_names(impls.as_str()));
            }
            let end = scan::find_block_end(&lines, i, scan::TYPESCRIPT);
            class_heads.push((caps[1].to_string(), i, end, bases, ClassKind::Class));
            i = end + 1;
            continue;
        }

        if let Some(caps) = INTERFACE_RE.captures(stripped) {
            let bases = caps.get(2).map(|m| split_names(m.as_str())).unwrap_or_default();
            let end = scan::find_block_end(&lines, i, scan::TYPESCRIPT);
            class_heads.push((caps[1].to_string(), i, end, bases, ClassKind::Interface));
            i = end + 1;
            continue;
        }

        if let Some(caps) = TYPE_ALIAS_RE.captures(stripped) {
            let end = if stripped.contains('{') {
                scan::find_block_end(&lines, i, scan::TYPESCRIPT)
            } else {
                alias_end(&lines, i)
            };
            class_heads.push((caps[1].to_string(), i, end, Vec::new(), ClassKind::Class));
            i = end + 1;
            continue;
        }

        i += 1;
    }

    // Pass 2: methods inside class bodies.
    let mut class_methods: HashMap<String, Vec<FunctionRecord>> = HashMap::new();
    let mut functions: Vec<FunctionRecord> = Vec::new();

    for (class_name, start, end, _, kind) in &class_heads {
        if *kind != ClassKind::Class && *kind != ClassKind::Interface {
            continue;
        }
        let mut j = start + 1;
        while j <= (*end).min(total.saturating_sub(1)) {
            let line = &lines[j];
            let caps = match METHOD_RE.captures(line) {
                Some(c) => c,
                None => {
                    j += 1;
                    continue;
                }
            };
            let name = caps[1].to_string();
            if METHOD_NAME_KEYWORDS.contains(&name.as_str()) {
                j += 1;
                continue;
            }
            let method_end = if line.contains('{') {
                scan::find_block_end(&lines, j, scan::TYPESCRIPT)
            } else {
                j
            };
            let mut m = Modifiers::empty();
            if line.contains("async ") {
                m |= Modifiers::ASYNC;
            }
            if line.contains("static ") {
                m |= Modifiers::STATIC;
            }
            let func = FunctionRecord {
                name: name.clone(),
                qualified_name: format!("{}.{}", class_name, name),
                range: LineRange::new(j as u32 + 1, method_end as u32 + 1),
                params: parse_params(&caps[2]),
                decorators: Vec::new(),
                doc: None,
                is_method: true,
                parent: Some(class_name.clone()),
                modifiers: m,
            };
            class_methods.entry(class_name.clone()).or_default().push(func.clone());
            functions.push(func);
            // Skip the method body so call sites inside it are not misread
            // as further method declarations.
            j = method_end + 1;
        }
    }

    // Lines consumed by class bodies, so top-level detection skips them.
    let mut class_line_set: HashSet<usize> = HashSet::new();
    for (_, start, end, _, _) in &class_heads {
        class_line_set.extend(*start..=*end);
    }

    // Pass 3: top-level functions and arrow functions.
    let mut i = 0;
    while i < total {
        if class_line_set.contains(&i) {
            i += 1;
            continue;
        }
        let stripped = lines[i].trim();
        let exported = stripped.starts_with("export ");

        if let Some(caps) = FUNC_DECL_RE.captures(stripped) {
            let has_brace =
                stripped.contains('{') || lines.get(i + 1).is_some_and(|l| l.trim().contains('{'));
            let end = if has_brace {
                scan::find_block_end(&lines, i, scan::TYPESCRIPT)
            } else {
                i
            };
            functions.push(FunctionRecord {
                name: caps[2].to_string(),
                qualified_name: caps[2].to_string(),
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                params: parse_params(&caps[3]),
                decorators: Vec::new(),
                doc: None,
                is_method: false,
                parent: None,
                modifiers: modifiers(exported, caps.get(1).is_some()),
            });
            i = end + 1;
            continue;
        }

        if let Some(caps) = ARROW_FUNC_RE.captures(stripped) {
            let end = if stripped.contains('{') {
                scan::find_block_end(&lines, i, scan::TYPESCRIPT)
            } else {
                alias_end(&lines, i)
            };
            functions.push(FunctionRecord {
                name: caps[1].to_string(),
                qualified_name: caps[1].to_string(),
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                params: parse_params(&caps[3]),
                decorators: Vec::new(),
                doc: None,
                is_method: false,
                parent: None,
                modifiers: modifiers(exported, caps.get(2).is_some()),
            });
            i = end + 1;
            continue;
        }

        i += 1;
    }

    let classes: Vec<ClassRecord> = class_heads
        .into_iter()
        .map(|(name, start, end, bases, kind)| ClassRecord {
            methods: class_methods.remove(&name).unwrap_or_default(),
            name,
            range: LineRange::new(start as u32 + 1, end as u32 + 1),
            bases,
            decorators: Vec::new(),
            doc: None,
            kind,
        })
        .collect();

    record.local_refs = super::body_refs(&lines, &functions, &classes, &record.imports, scan::TYPESCRIPT);
    record.functions = functions;
    record.classes = classes;
    record
}

fn modifiers(exported: bool, is_async: bool) -> Modifiers {
    let mut m = Modifiers::empty();
    if exported {
        m |= Modifiers::PUB;
    }
    if is_async {
        m |= Modifiers::ASYNC;
    }
    m
}

/// End line of a one-expression construct (arrow body, type alias): the first
/// line containing `;`, or the first following line that does not continue
/// the expression.
fn alias_end(lines: &[String], start: usize) -> usize {
    for (j, line) in lines.iter().enumerate().skip(start) {
        let t = line.trim();
        if line.contains(';') {
            return j;
        }
        if j > start && !t.is_empty() && !t.starts_with('|') && !t.starts_with('&') && !t.ends_with(',') {
            return j;
        }
    }
    lines.len().saturating_sub(1)
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Parse `name: Type = default` parameter fragments. Destructuring and rest
/// parameters are skipped.
fn parse_params(raw: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() || part.starts_with('{') || part.starts_with('[') || part.starts_with("...") {
            continue;
        }
        let (head, default) = match part.split_once('=') {
            Some((h, d)) => (h.trim(), Some(d.trim().to_string())),
            None => (part, None),
        };
        let (name, annotation) = match head.split_once(':') {
            Some((n, a)) => (n.trim().trim_end_matches('?'), Some(a.trim().to_string())),
            None => (head.trim_end_matches('?'), None),
        };
        if scan::IDENT_RE.find(name).is_some_and(|m| m.as_str() == name) {
            params.push(Parameter {
                name: name.to_string(),
                default,
                annotation,
            });
        }
    }
    params
}

// =============================================================================
// IMPORTS
// =============================================================================

fn parse_imports(lines: &[String]) -> Vec<ImportRecord> {
    let mut imports = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if !stripped.starts_with("import") {
            continue;
        }

        if let Some(caps) = IMPORT_RE.captures(stripped) {
            let module = caps[6].to_string();
            let mut names: Vec<String> = Vec::new();
            let mut alias: Option<String> = None;

            if let Some(named) = caps.get(1) {
                names = named_imports(named.as_str());
            } else if let Some(ns) = caps.get(2) {
                // * as X
                alias = ns.as_str().rsplit("as").next().map(|s| s.trim().to_string());
            } else if let (Some(default), Some(named)) = (caps.get(3), caps.get(4)) {
                alias = Some(default.as_str().to_string());
                names = named_imports(named.as_str());
            } else if let Some(default) = caps.get(5) {
                alias = Some(default.as_str().to_string());
            }

            imports.push(ImportRecord {
                module,
                names,
                alias,
                line: idx as u32 + 1,
                is_from: true,
            });
            continue;
        }

        if let Some(caps) = SIDE_EFFECT_IMPORT_RE.captures(stripped) {
            imports.push(ImportRecord {
                module: caps[1].to_string(),
                names: Vec::new(),
                alias: None,
                line: idx as u32 + 1,
                is_from: false,
            });
        }
    }
    imports
}

/// `{ A, B as C }` introduces the exported names A and B; the local binding
/// for an aliased name is handled by the dependency pass.
fn named_imports(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(|n| n.split(" as ").next().unwrap_or(n).trim().to_string())
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_declarations() {
        let src = r#"
export function greet(name: string): string {
    return `Hello, ${name}`;
}

async function fetchData(url: string) {
    return await fetch(url);
}

const add = (a: number, b: number) => a + b;
"#;
        let rec = extract("util.ts", src);
        let names: Vec<_> = rec.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["greet", "fetchData", "add"]);

        let greet = &rec.functions[0];
        assert!(greet.modifiers.contains(Modifiers::PUB));
        assert_eq!(greet.range, LineRange::new(2, 4));
        assert_eq!(greet.params.len(), 1);
        assert_eq!(greet.params[0].name, "name");
        assert_eq!(greet.params[0].annotation.as_deref(), Some("string"));

        let fetch_data = &rec.functions[1];
        assert!(fetch_data.modifiers.contains(Modifiers::ASYNC));
    }

    #[test]
    fn class_with_methods() {
        let src = r#"
export class Engine extends Base implements Runnable, Closeable {
    private count = 0;

    start(mode: string) {
        this.count += 1;
    }

    async stop() {
        return this.count;
    }
}
"#;
        let rec = extract("engine.ts", src);
        assert_eq!(rec.classes.len(), 1);
        let cls = &rec.classes[0];
        assert_eq!(cls.name, "Engine");
        assert_eq!(cls.bases, vec!["Base", "Runnable", "Closeable"]);
        assert_eq!(cls.kind, ClassKind::Class);

        let method_names: Vec<_> = cls.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(method_names, vec!["start", "stop"]);
        assert_eq!(cls.methods[0].qualified_name, "Engine.start");
        assert!(cls.methods[0].is_method);
        assert_eq!(cls.methods[0].parent.as_deref(), Some("Engine"));
    }

    #[test]
    fn interface_and_type_alias() {
        let src = "export interface Shape extends Printable {\n    area(): number;\n}\ntype Point = { x: number; y: number };\n";
        let rec = extract("shapes.ts", src);
        assert_eq!(rec.classes.len(), 2);
        assert_eq!(rec.classes[0].kind, ClassKind::Interface);
        assert_eq!(rec.classes[0].bases, vec!["Printable"]);
        assert_eq!(rec.classes[1].name, "Point");
    }

    #[test]
    fn import_forms() {
        let src = r#"import { foo, bar as baz } from './util';
import * as path from 'path';
import React, { useState } from 'react';
import Default from './default';
import './side-effect';
"#;
        let rec = extract("app.ts", src);
        assert_eq!(rec.imports.len(), 5);

        assert_eq!(rec.imports[0].module, "./util");
        assert_eq!(rec.imports[0].names, vec!["foo", "bar"]);
        assert!(rec.imports[0].is_from);

        assert_eq!(rec.imports[1].alias.as_deref(), Some("path"));
        assert!(rec.imports[1].names.is_empty());

        assert_eq!(rec.imports[2].alias.as_deref(), Some("React"));
        assert_eq!(rec.imports[2].names, vec!["useState"]);

        assert_eq!(rec.imports[3].alias.as_deref(), Some("Default"));

        assert_eq!(rec.imports[4].module, "./side-effect");
        assert!(!rec.imports[4].is_from);
    }

    #[test]
    fn local_refs_within_file() {
        let src = r#"
function helper() {
    return 1;
}

function main() {
    return helper() + other();
}
"#;
        let rec = extract("main.ts", src);
        let refs = rec.local_refs.get("main").unwrap();
        assert!(refs.contains("helper"));
        assert!(!refs.contains("other"));
        assert!(rec.local_refs.get("helper").unwrap().is_empty());
    }

    #[test]
    fn imported_names_show_up_in_refs() {
        let src = "import { render } from './view';\n\nfunction page() {\n    return render();\n}\n";
        let rec = extract("page.ts", src);
        assert!(rec.local_refs.get("page").unwrap().contains("render"));
    }

    #[test]
    fn braces_in_strings_do_not_break_ranges() {
        let src = "function f() {\n    const s = \"}\";\n    return s;\n}\nfunction g() {\n    return 2;\n}\n";
        let rec = extract("s.ts", src);
        assert_eq!(rec.functions.len(), 2);
        assert_eq!(rec.functions[0].range, LineRange::new(1, 4));
        assert_eq!(rec.functions[1].range, LineRange::new(5, 7));
    }
}
