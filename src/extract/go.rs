//! Go Extractor
//!
//! Pattern-driven extraction of `func` declarations, receiver methods,
//! struct/interface types, type aliases, and imports (single and grouped).
//! Doc comments are the consecutive `//` lines immediately above a
//! declaration. Ranges come from brace matching that skips strings, raw
//! strings, and comments.
//!
//! @module extract/go

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::scan;
use crate::model::{
    ClassKind, ClassRecord, FileRecord, FunctionRecord, ImportRecord, Language, LineRange,
    Modifiers, Parameter,
};

// =============================================================================
// PATTERNS
// =============================================================================

static FUNC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^func\s+(\w+)\s*(?:\[[^\]]*\]\s*)?\(([^)]*)\)").unwrap());

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^func\s+\(\s*\w+\s+\*?(\w+)\s*\)\s*(\w+)\s*(?:\[[^\]]*\]\s*)?\(([^)]*)\)").unwrap()
});

static STRUCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^type\s+(\w+)\s+struct\b").unwrap());
static INTERFACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^type\s+(\w+)\s+interface\b").unwrap());
static TYPE_ALIAS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^type\s+(\w+)\s*=\s*(\w+)").unwrap());

static SINGLE_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^import\s+(?:(\w+)\s+)?"([^"]+)""#).unwrap());
static IMPORT_GROUP_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s*\(").unwrap());
static IMPORT_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:(\.|_|\w+)\s+)?"([^"]+)""#).unwrap());

static IFACE_METHOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)\s*\(([^)]*)\)").unwrap());

// =============================================================================
// EXTRACTION
// =============================================================================

pub fn extract(path: &str, source: &str) -> FileRecord {
    let mut record = FileRecord::lines_only(path, Language::Go, source);
    let lines = record.lines.clone();
    let total = lines.len();

    record.imports = parse_imports(&lines);

    let mut functions: Vec<FunctionRecord> = Vec::new();
    let mut classes: Vec<ClassRecord> = Vec::new();

    let mut i = 0;
    while i < total {
        let stripped = lines[i].trim();

        if stripped.is_empty() || stripped.starts_with("//") || stripped.starts_with("/*") {
            i += 1;
            continue;
        }

        // Import blocks were parsed up front.
        if stripped.starts_with("import") {
            if stripped.contains('(') {
                while i < total && !lines[i].contains(')') {
                    i += 1;
                }
            }
            i += 1;
            continue;
        }

        // Method declaration, more specific than a plain func.
        if let Some(caps) = METHOD_RE.captures(stripped) {
            let receiver = caps[1].to_string();
            let name = caps[2].to_string();
            let end = body_end(&lines, i, stripped);
            functions.push(FunctionRecord {
                qualified_name: format!("{}.{}", receiver, name),
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                params: parse_params(&caps[3]),
                decorators: Vec::new(),
                doc: doc_comment(&lines, i),
                is_method: true,
                parent: Some(receiver),
                modifiers: exported_modifier(&name),
                name,
            });
            i = end + 1;
            continue;
        }

        if let Some(caps) = FUNC_RE.captures(stripped) {
            let name = caps[1].to_string();
            let end = body_end(&lines, i, stripped);
            functions.push(FunctionRecord {
                qualified_name: name.clone(),
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                params: parse_params(&caps[2]),
                decorators: Vec::new(),
                doc: doc_comment(&lines, i),
                is_method: false,
                parent: None,
                modifiers: exported_modifier(&name),
                name,
            });
            i = end + 1;
            continue;
        }

        if let Some(caps) = STRUCT_RE.captures(stripped) {
            let name = caps[1].to_string();
            let end = body_end(&lines, i, stripped);
            let bases = embedded_types(&lines, i, end);
            classes.push(ClassRecord {
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                bases,
                methods: Vec::new(),
                decorators: Vec::new(),
                doc: doc_comment(&lines, i),
                kind: ClassKind::Struct,
                name,
            });
            i = end + 1;
            continue;
        }

        if let Some(caps) = INTERFACE_RE.captures(stripped) {
            let name = caps[1].to_string();
            let end = body_end(&lines, i, stripped);
            let bases = embedded_types(&lines, i, end);
            let methods = interface_methods(&lines, i, end, &name);
            functions.extend(methods.iter().cloned());
            classes.push(ClassRecord {
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                bases,
                methods,
                decorators: Vec::new(),
                doc: doc_comment(&lines, i),
                kind: ClassKind::Interface,
                name,
            });
            i = end + 1;
            continue;
        }

        if let Some(caps) = TYPE_ALIAS_RE.captures(stripped) {
            classes.push(ClassRecord {
                name: caps[1].to_string(),
                range: LineRange::new(i as u32 + 1, i as u32 + 1),
                bases: vec![caps[2].to_string()],
                methods: Vec::new(),
                decorators: Vec::new(),
                doc: doc_comment(&lines, i),
                kind: ClassKind::Class,
            });
            i += 1;
            continue;
        }

        i += 1;
    }

    // Attach receiver methods to their struct.
    let mut by_receiver: HashMap<&str, Vec<FunctionRecord>> = HashMap::new();
    for f in &functions {
        if let Some(parent) = f.parent.as_deref() {
            if f.is_method {
                by_receiver.entry(parent).or_default().push(f.clone());
            }
        }
    }
    for cls in &mut classes {
        if cls.methods.is_empty() {
            if let Some(methods) = by_receiver.get(cls.name.as_str()) {
                cls.methods = methods.clone();
            }
        }
    }

    record.local_refs = super::body_refs(&lines, &functions, &classes, &record.imports, scan::GO);
    record.functions = functions;
    record.classes = classes;
    record
}

fn body_end(lines: &[String], start: usize, stripped: &str) -> usize {
    let has_brace =
        stripped.contains('{') || lines.get(start + 1).is_some_and(|l| l.trim().contains('{'));
    if has_brace {
        scan::find_block_end(lines, start, scan::GO)
    } else {
        start
    }
}

/// Exported Go identifiers start with an uppercase letter.
fn exported_modifier(name: &str) -> Modifiers {
    if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        Modifiers::PUB
    } else {
        Modifiers::empty()
    }
}

/// Consecutive `//` lines immediately above a declaration.
fn doc_comment(lines: &[String], decl_line: usize) -> Option<String> {
    let mut doc: Vec<String> = Vec::new();
    let mut j = decl_line;
    while j > 0 {
        let above = lines[j - 1].trim();
        if let Some(text) = above.strip_prefix("//") {
            doc.insert(0, text.trim().to_string());
            j -= 1;
        } else {
            break;
        }
    }
    if doc.is_empty() {
        None
    } else {
        Some(doc.join("\n"))
    }
}

/// Go params: `name type`, `a, b type`, variadic `args ...int`.
fn parse_params(raw: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut tokens = part.split_whitespace();
        let (Some(first), Some(rest)) = (tokens.next(), tokens.next()) else {
            // A lone token is an unnamed parameter (interface style); skip.
            continue;
        };
        if first.starts_with('*') || first.starts_with("[]") || first.starts_with("...") {
            continue;
        }
        if first.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            // Looks like a type, not a parameter name.
            continue;
        }
        params.push(Parameter {
            name: first.to_string(),
            default: None,
            annotation: Some(rest.trim_start_matches("...").to_string()),
        });
    }
    params
}

/// Embedded types are single-token lines inside a struct/interface body.
fn embedded_types(lines: &[String], start: usize, end: usize) -> Vec<String> {
    let mut bases = Vec::new();
    for line in lines.iter().take(end).skip(start + 1) {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with("//") || stripped == "}" {
            continue;
        }
        let tokens: Vec<&str> = stripped.split_whitespace().collect();
        if tokens.len() == 1 {
            let name = tokens[0].trim_start_matches('*');
            if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                bases.push(name.to_string());
            }
        }
    }
    bases
}

/// Method signatures declared inside an interface body.
fn interface_methods(
    lines: &[String],
    start: usize,
    end: usize,
    iface_name: &str,
) -> Vec<FunctionRecord> {
    let mut methods = Vec::new();
    for (idx, line) in lines.iter().enumerate().take(end).skip(start + 1) {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with("//") || stripped == "}" {
            continue;
        }
        if let Some(caps) = IFACE_METHOD_RE.captures(stripped) {
            let name = caps[1].to_string();
            methods.push(FunctionRecord {
                qualified_name: format!("{}.{}", iface_name, name),
                range: LineRange::new(idx as u32 + 1, idx as u32 + 1),
                params: parse_params(&caps[2]),
                decorators: Vec::new(),
                doc: None,
                is_method: true,
                parent: Some(iface_name.to_string()),
                modifiers: exported_modifier(&name),
                name,
            });
        }
    }
    methods
}

// =============================================================================
// IMPORTS
// =============================================================================

fn parse_imports(lines: &[String]) -> Vec<ImportRecord> {
    let mut imports = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let stripped = lines[i].trim();

        if let Some(caps) = SINGLE_IMPORT_RE.captures(stripped) {
            imports.push(import_record(
                caps.get(1).map(|m| m.as_str()),
                &caps[2],
                i as u32 + 1,
            ));
            i += 1;
            continue;
        }

        if IMPORT_GROUP_START_RE.is_match(stripped) {
            i += 1;
            while i < lines.len() {
                let line = lines[i].trim();
                if line == ")" {
                    i += 1;
                    break;
                }
                if let Some(caps) = IMPORT_LINE_RE.captures(line) {
                    imports.push(import_record(
                        caps.get(1).map(|m| m.as_str()),
                        &caps[2],
                        i as u32 + 1,
                    ));
                }
                i += 1;
            }
            continue;
        }

        i += 1;
    }
    imports
}

/// The last path segment names the package; without an alias it is the name
/// the import introduces.
fn import_record(alias: Option<&str>, module: &str, line: u32) -> ImportRecord {
    let short = module.rsplit('/').next().unwrap_or(module).to_string();
    let names = if alias.is_none() { vec![short] } else { Vec::new() };
    ImportRecord {
        module: module.to_string(),
        names,
        alias: alias.map(|a| a.to_string()),
        line,
        is_from: false,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_and_methods() {
        let src = r#"package server

// Serve starts the listener.
func Serve(addr string) error {
	return nil
}

func (s *Server) Handle(req Request) {
	s.count++
}

func helper(n int) int {
	return n * 2
}
"#;
        let rec = extract("server.go", src);
        let names: Vec<_> = rec.functions.iter().map(|f| f.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["Serve", "Server.Handle", "helper"]);

        let serve = &rec.functions[0];
        assert_eq!(serve.doc.as_deref(), Some("Serve starts the listener."));
        assert!(serve.modifiers.contains(Modifiers::PUB));
        assert_eq!(serve.range, LineRange::new(4, 6));
        assert_eq!(serve.params[0].name, "addr");
        assert_eq!(serve.params[0].annotation.as_deref(), Some("string"));

        let handle = &rec.functions[1];
        assert!(handle.is_method);
        assert_eq!(handle.parent.as_deref(), Some("Server"));

        assert!(!rec.functions[2].modifiers.contains(Modifiers::PUB));
    }

    #[test]
    fn structs_interfaces_and_aliases() {
        let src = r#"package model

type Server struct {
	Base
	count int
}

type Handler interface {
	Handle(req Request) error
}

type ID = string

func (s *Server) Start() {}
"#;
        let rec = extract("model.go", src);
        assert_eq!(rec.classes.len(), 3);

        let server = &rec.classes[0];
        assert_eq!(server.kind, ClassKind::Struct);
        assert_eq!(server.bases, vec!["Base"]);
        // Receiver methods are attached after the scan.
        assert_eq!(server.methods.len(), 1);
        assert_eq!(server.methods[0].qualified_name, "Server.Start");

        let handler = &rec.classes[1];
        assert_eq!(handler.kind, ClassKind::Interface);
        assert_eq!(handler.methods.len(), 1);
        assert_eq!(handler.methods[0].qualified_name, "Handler.Handle");

        let alias = &rec.classes[2];
        assert_eq!(alias.bases, vec!["string"]);
    }

    #[test]
    fn single_and_grouped_imports() {
        let src = r#"package main

import "fmt"

import (
	"os"
	stdlog "log"
	_ "net/http/pprof"
	"github.com/pkg/errors"
)
"#;
        let rec = extract("main.go", src);
        assert_eq!(rec.imports.len(), 5);

        assert_eq!(rec.imports[0].module, "fmt");
        assert_eq!(rec.imports[0].names, vec!["fmt"]);

        assert_eq!(rec.imports[2].module, "log");
        assert_eq!(rec.imports[2].alias.as_deref(), Some("stdlog"));
        assert!(rec.imports[2].names.is_empty());

        assert_eq!(rec.imports[3].alias.as_deref(), Some("_"));

        assert_eq!(rec.imports[4].module, "github.com/pkg/errors");
        assert_eq!(rec.imports[4].names, vec!["errors"]);
    }

    #[test]
    fn raw_string_braces_do_not_break_ranges() {
        let src = "package q\n\nfunc Query() string {\n\treturn `select {\n}`\n}\n\nfunc After() {}\n";
        let rec = extract("q.go", src);
        assert_eq!(rec.functions.len(), 2);
        assert_eq!(rec.functions[0].range, LineRange::new(3, 6));
    }

    #[test]
    fn local_refs_between_funcs() {
        let src = "package p\n\nfunc a() {\n\tb()\n}\n\nfunc b() {}\n";
        let rec = extract("p.go", src);
        assert!(rec.local_refs.get("a").unwrap().contains("b"));
        assert!(rec.local_refs.get("b").unwrap().is_empty());
    }
}
