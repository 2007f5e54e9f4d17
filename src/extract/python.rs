//! Python Extractor
//!
//! Full-AST extraction via tree-sitter: functions, methods (nested classes
//! use dotted qualification), decorators, parameters with defaults and
//! annotations, docstrings, imports with alias bookkeeping, and lexically
//! scoped intra-file references.
//!
//! A file whose parse tree contains errors degrades to a lines-only record
//! plus a parse warning; the surrounding build continues.
//!
//! @module extract/python

use std::collections::{HashMap, HashSet};
use tree_sitter::{Node, Parser};

use crate::model::{
    ClassKind, ClassRecord, FileRecord, FunctionRecord, ImportRecord, Language, LineRange,
    Modifiers, Parameter,
};

/// Extract a Python file. The second element is a parse warning message when
/// the source could not be parsed and the record degraded to lines-only.
pub fn extract(path: &str, source: &str) -> (FileRecord, Option<String>) {
    let mut record = FileRecord::lines_only(path, Language::Python, source);

    let mut parser = Parser::new();
    if parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .is_err()
    {
        return (record, Some("python grammar unavailable".to_string()));
    }
    let tree = match parser.parse(source, None) {
        Some(t) => t,
        None => return (record, Some("parser returned no tree".to_string())),
    };
    let root = tree.root_node();
    if root.has_error() {
        return (
            record,
            Some("syntax error, falling back to line-only record".to_string()),
        );
    }

    let src = source.as_bytes();
    let mut functions: Vec<FunctionRecord> = Vec::new();
    let mut classes: Vec<ClassRecord> = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        walk_top_level(child, src, &mut functions, &mut classes, &[]);
    }

    let imports = collect_imports(root, src);
    let local_refs = build_local_refs(root, src, &functions, &classes, &imports);

    record.functions = functions;
    record.classes = classes;
    record.imports = imports;
    record.local_refs = local_refs;
    (record, None)
}

// =============================================================================
// DECLARATION WALK
// =============================================================================

fn walk_top_level(
    node: Node,
    src: &[u8],
    functions: &mut Vec<FunctionRecord>,
    classes: &mut Vec<ClassRecord>,
    class_stack: &[String],
) {
    match node.kind() {
        "function_definition" => {
            if let Some(func) = function_record(node, src, &[], class_stack) {
                functions.push(func);
            }
        }
        "class_definition" => {
            walk_class(node, src, &[], functions, classes, class_stack, None);
        }
        "decorated_definition" => {
            let decorators = decorator_names(node, src);
            let start = node.start_position().row as u32 + 1;
            if let Some(def) = node.child_by_field_name("definition") {
                match def.kind() {
                    "function_definition" => {
                        if let Some(mut func) = function_record(def, src, &decorators, class_stack)
                        {
                            // Range starts at the first decorator line.
                            func.range = LineRange::new(start, func.range.end);
                            functions.push(func);
                        }
                    }
                    "class_definition" => {
                        walk_class(def, src, &decorators, functions, classes, class_stack, Some(start));
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_class(
    node: Node,
    src: &[u8],
    decorators: &[String],
    functions: &mut Vec<FunctionRecord>,
    classes: &mut Vec<ClassRecord>,
    class_stack: &[String],
    start_override: Option<u32>,
) {
    let Some(name) = field_text(node, "name", src) else {
        return;
    };

    let mut stack: Vec<String> = class_stack.to_vec();
    stack.push(name.clone());
    let dotted = stack.join(".");

    let bases = node
        .child_by_field_name("superclasses")
        .map(|args| {
            let mut cursor = args.walk();
            args.named_children(&mut cursor)
                .filter_map(|b| base_name(b, src))
                .collect()
        })
        .unwrap_or_default();

    let mut methods: Vec<FunctionRecord> = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "function_definition" => {
                    if let Some(func) = function_record(child, src, &[], &stack) {
                        methods.push(func);
                    }
                }
                "decorated_definition" => {
                    let decs = decorator_names(child, src);
                    if let Some(def) = child.child_by_field_name("definition") {
                        match def.kind() {
                            "function_definition" => {
                                if let Some(mut func) = function_record(def, src, &decs, &stack) {
                                    func.range = LineRange::new(
                                        child.start_position().row as u32 + 1,
                                        func.range.end,
                                    );
                                    methods.push(func);
                                }
                            }
                            "class_definition" => {
                                let start = child.start_position().row as u32 + 1;
                                walk_class(def, src, &decs, functions, classes, &stack, Some(start));
                            }
                            _ => {}
                        }
                    }
                }
                "class_definition" => {
                    walk_class(child, src, &[], functions, classes, &stack, None);
                }
                _ => {}
            }
        }
    }

    let mut range = node_range(node);
    if let Some(start) = start_override {
        range = LineRange::new(start, range.end);
    }

    functions.extend(methods.iter().cloned());
    classes.push(ClassRecord {
        name: dotted,
        range,
        bases,
        methods,
        decorators: decorators.to_vec(),
        doc: docstring(node, src),
        kind: ClassKind::Class,
    });
}

fn function_record(
    node: Node,
    src: &[u8],
    decorators: &[String],
    class_stack: &[String],
) -> Option<FunctionRecord> {
    let name = field_text(node, "name", src)?;
    let is_method = !class_stack.is_empty();
    let qualified_name = if is_method {
        format!("{}.{}", class_stack.join("."), name)
    } else {
        name.clone()
    };

    let mut modifiers = Modifiers::empty();
    if node.child(0).is_some_and(|c| c.kind() == "async") {
        modifiers |= Modifiers::ASYNC;
    }

    Some(FunctionRecord {
        params: parameters(node, src, is_method),
        qualified_name,
        range: node_range(node),
        decorators: decorators.to_vec(),
        doc: docstring(node, src),
        is_method,
        parent: if is_method {
            Some(class_stack.join("."))
        } else {
            None
        },
        modifiers,
        name,
    })
}

fn parameters(node: Node, src: &[u8], is_method: bool) -> Vec<Parameter> {
    let Some(params_node) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut params = Vec::new();
    let mut cursor = params_node.walk();
    for (idx, p) in params_node.named_children(&mut cursor).enumerate() {
        let param = match p.kind() {
            "identifier" => node_text(p, src).map(Parameter::named),
            "typed_parameter" => {
                let name = p
                    .named_child(0)
                    .filter(|c| c.kind() == "identifier")
                    .and_then(|c| node_text(c, src));
                name.map(|n| Parameter {
                    name: n,
                    default: None,
                    annotation: field_text(p, "type", src),
                })
            }
            "default_parameter" => field_text(p, "name", src).map(|n| Parameter {
                name: n,
                default: field_text(p, "value", src),
                annotation: None,
            }),
            "typed_default_parameter" => field_text(p, "name", src).map(|n| Parameter {
                name: n,
                default: field_text(p, "value", src),
                annotation: field_text(p, "type", src),
            }),
            "list_splat_pattern" => p
                .named_child(0)
                .and_then(|c| node_text(c, src))
                .map(|n| Parameter::named(format!("*{}", n))),
            "dictionary_splat_pattern" => p
                .named_child(0)
                .and_then(|c| node_text(c, src))
                .map(|n| Parameter::named(format!("**{}", n))),
            _ => None,
        };
        if let Some(param) = param {
            if is_method && idx == 0 && (param.name == "self" || param.name == "cls") {
                continue;
            }
            params.push(param);
        }
    }
    params
}

fn decorator_names(node: Node, src: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(text) = node_text(child, src) {
                let text = text.trim_start_matches('@');
                // `@app.route("/")` records as `app.route`.
                let name = text.split('(').next().unwrap_or(text).trim();
                out.push(name.to_string());
            }
        }
    }
    out
}

/// First statement of a body, when it is a bare string expression.
fn docstring(node: Node, src: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0)?;
    if string.kind() != "string" {
        return None;
    }
    node_text(string, src).map(|t| strip_string_literal(&t))
}

/// Base class name: identifier, dotted attribute, or `Generic[T]` stripped of
/// its subscript.
fn base_name(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "attribute" => node_text(node, src),
        "subscript" => node
            .child_by_field_name("value")
            .and_then(|v| node_text(v, src)),
        "keyword_argument" => None,
        _ => node_text(node, src),
    }
}

// =============================================================================
// IMPORTS
// =============================================================================

fn collect_imports(root: Node, src: &[u8]) -> Vec<ImportRecord> {
    let mut imports = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                let line = node.start_position().row as u32 + 1;
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            if let Some(module) = node_text(child, src) {
                                imports.push(ImportRecord {
                                    module,
                                    names: Vec::new(),
                                    alias: None,
                                    line,
                                    is_from: false,
                                });
                            }
                        }
                        "aliased_import" => {
                            let module = field_text(child, "name", src);
                            let alias = field_text(child, "alias", src);
                            if let Some(module) = module {
                                imports.push(ImportRecord {
                                    module,
                                    names: Vec::new(),
                                    alias,
                                    line,
                                    is_from: false,
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let line = node.start_position().row as u32 + 1;
                let module_node = node.child_by_field_name("module_name");
                let module = module_node
                    .and_then(|m| node_text(m, src))
                    .unwrap_or_default();
                let module_id = module_node.map(|m| m.id());

                let mut names: Vec<String> = Vec::new();
                let mut alias: Option<String> = None;
                let mut aliased_count = 0;

                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if Some(child.id()) == module_id {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" | "identifier" => {
                            if let Some(n) = node_text(child, src) {
                                names.push(n);
                            }
                        }
                        "aliased_import" => {
                            if let Some(n) = field_text(child, "name", src) {
                                names.push(n);
                            }
                            alias = field_text(child, "alias", src);
                            aliased_count += 1;
                        }
                        "wildcard_import" => names.push("*".to_string()),
                        _ => {}
                    }
                }
                // The single alias slot only describes a single-name import.
                if names.len() != 1 || aliased_count != 1 {
                    alias = None;
                }
                imports.push(ImportRecord {
                    module,
                    names,
                    alias,
                    line,
                    is_from: true,
                });
            }
            _ => {
                for i in 0..node.child_count() {
                    if let Some(child) = node.child(i) {
                        stack.push(child);
                    }
                }
            }
        }
    }
    imports.sort_by_key(|imp| imp.line);
    imports
}

// =============================================================================
// LOCAL REFERENCES
// =============================================================================

fn build_local_refs(
    root: Node,
    src: &[u8],
    functions: &[FunctionRecord],
    classes: &[ClassRecord],
    imports: &[ImportRecord],
) -> HashMap<String, HashSet<String>> {
    let mut candidates: HashSet<String> = HashSet::new();
    for f in functions {
        candidates.insert(f.name.clone());
    }
    for c in classes {
        candidates.insert(c.name.clone());
    }
    candidates.extend(super::import_locals(imports));

    // Index declaration nodes by their start row to match records to nodes.
    let mut refs: HashMap<String, HashSet<String>> = HashMap::new();
    let mut stack = vec![root];
    let mut nodes_by_row: HashMap<u32, Node> = HashMap::new();
    while let Some(node) = stack.pop() {
        if node.kind() == "function_definition" || node.kind() == "class_definition" {
            nodes_by_row.insert(node.start_position().row as u32 + 1, node);
        }
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }

    for f in functions {
        let entry = refs.entry(f.qualified_name.clone()).or_default();
        if let Some(node) = decl_node(&nodes_by_row, f.range) {
            let mut found = HashSet::new();
            collect_identifiers(node, src, &mut found);
            entry.extend(
                found
                    .into_iter()
                    .filter(|n| n != &f.name && candidates.contains(n)),
            );
        }
    }
    for c in classes {
        let entry = refs.entry(c.name.clone()).or_default();
        if let Some(node) = decl_node(&nodes_by_row, c.range) {
            let mut found = HashSet::new();
            collect_identifiers(node, src, &mut found);
            entry.extend(
                found
                    .into_iter()
                    .filter(|n| n != &c.name && candidates.contains(n)),
            );
        }
        // Base classes are references too.
        entry.extend(
            c.bases
                .iter()
                .filter(|b| candidates.contains(*b) && **b != c.name)
                .cloned(),
        );
    }
    refs
}

/// A record's declaration node starts on the record's first line or, for
/// decorated definitions, a following line.
fn decl_node<'a>(nodes_by_row: &HashMap<u32, Node<'a>>, range: LineRange) -> Option<Node<'a>> {
    (range.start..=range.end).find_map(|row| nodes_by_row.get(&row).copied())
}

/// Bare identifiers plus the roots of attribute chains (`a.b.c` yields `a`),
/// mirroring how name references behave in lexical scope.
fn collect_identifiers(node: Node, src: &[u8], out: &mut HashSet<String>) {
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        match n.kind() {
            "identifier" => {
                if let Ok(text) = n.utf8_text(src) {
                    out.insert(text.to_string());
                }
            }
            "attribute" => {
                if let Some(object) = n.child_by_field_name("object") {
                    stack.push(object);
                }
            }
            _ => {
                for i in 0..n.child_count() {
                    if let Some(child) = n.child(i) {
                        stack.push(child);
                    }
                }
            }
        }
    }
}

// =============================================================================
// NODE HELPERS
// =============================================================================

fn node_text(node: Node, src: &[u8]) -> Option<String> {
    node.utf8_text(src).ok().map(|s| s.to_string())
}

fn field_text(node: Node, field: &str, src: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| node_text(n, src))
}

fn node_range(node: Node) -> LineRange {
    let start = node.start_position().row as u32 + 1;
    let end_pos = node.end_position();
    let end_row = if end_pos.column == 0 && end_pos.row > 0 {
        end_pos.row - 1
    } else {
        end_pos.row
    };
    LineRange::new(start, end_row as u32 + 1)
}

fn strip_string_literal(text: &str) -> String {
    let trimmed = text
        .trim_start_matches(|c| matches!(c, 'r' | 'b' | 'u' | 'f' | 'R' | 'B' | 'U' | 'F'));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.trim().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_params_and_docstrings() {
        let src = r#"def greet(name, times=2, *args, **kwargs):
    """Say hello."""
    return name * times

async def poll(url: str, timeout: float = 5.0):
    pass
"#;
        let (rec, warn) = extract("app.py", src);
        assert!(warn.is_none());
        assert_eq!(rec.functions.len(), 2);

        let greet = &rec.functions[0];
        assert_eq!(greet.name, "greet");
        assert_eq!(greet.qualified_name, "greet");
        assert_eq!(greet.doc.as_deref(), Some("Say hello."));
        assert_eq!(greet.range, LineRange::new(1, 3));
        let names: Vec<_> = greet.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "times", "*args", "**kwargs"]);
        assert_eq!(greet.params[1].default.as_deref(), Some("2"));

        let poll = &rec.functions[1];
        assert!(poll.modifiers.contains(Modifiers::ASYNC));
        assert_eq!(poll.params[0].annotation.as_deref(), Some("str"));
        assert_eq!(poll.params[1].default.as_deref(), Some("5.0"));
    }

    #[test]
    fn classes_methods_and_decorators() {
        let src = r#"@register
class Worker(Base, mixins.Loggable):
    """Does work."""

    def __init__(self, queue):
        self.queue = queue

    @staticmethod
    def capacity():
        return 4
"#;
        let (rec, _) = extract("worker.py", src);
        assert_eq!(rec.classes.len(), 1);

        let worker = &rec.classes[0];
        assert_eq!(worker.name, "Worker");
        assert_eq!(worker.bases, vec!["Base", "mixins.Loggable"]);
        assert_eq!(worker.decorators, vec!["register"]);
        assert_eq!(worker.doc.as_deref(), Some("Does work."));

        let methods: Vec<_> = worker.methods.iter().map(|m| m.qualified_name.as_str()).collect();
        assert_eq!(methods, vec!["Worker.__init__", "Worker.capacity"]);
        assert!(worker.methods[0].is_method);
        assert_eq!(worker.methods[0].parent.as_deref(), Some("Worker"));
        // self is skipped
        assert_eq!(worker.methods[0].params.len(), 1);
        assert_eq!(worker.methods[0].params[0].name, "queue");
        assert_eq!(worker.methods[1].decorators, vec!["staticmethod"]);

        // methods are also present in the flat function list
        assert!(rec
            .functions
            .iter()
            .any(|f| f.qualified_name == "Worker.capacity"));
    }

    #[test]
    fn nested_classes_use_dotted_qualification() {
        let src = r#"class Outer:
    class Inner:
        def run(self):
            pass
"#;
        let (rec, _) = extract("nested.py", src);
        let names: Vec<_> = rec.classes.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Outer"));
        assert!(names.contains(&"Outer.Inner"));
        assert!(rec
            .functions
            .iter()
            .any(|f| f.qualified_name == "Outer.Inner.run"));
    }

    #[test]
    fn import_forms() {
        let src = r#"import os.path
import numpy as np
from collections import OrderedDict, defaultdict
from utils import helper as h
from pkg import *
"#;
        let (rec, _) = extract("imports.py", src);
        assert_eq!(rec.imports.len(), 5);

        assert_eq!(rec.imports[0].module, "os.path");
        assert!(!rec.imports[0].is_from);
        assert!(rec.imports[0].names.is_empty());

        assert_eq!(rec.imports[1].module, "numpy");
        assert_eq!(rec.imports[1].alias.as_deref(), Some("np"));

        assert_eq!(rec.imports[2].module, "collections");
        assert_eq!(rec.imports[2].names, vec!["OrderedDict", "defaultdict"]);
        assert!(rec.imports[2].is_from);

        assert_eq!(rec.imports[3].names, vec!["helper"]);
        assert_eq!(rec.imports[3].alias.as_deref(), Some("h"));

        assert_eq!(rec.imports[4].names, vec!["*"]);
    }

    #[test]
    fn local_refs_resolve_lexically() {
        let src = r#"from helpers import shared

def leaf():
    return 1

def branch():
    return leaf() + shared()

class Tree:
    def grow(self):
        return branch()
"#;
        let (rec, _) = extract("tree.py", src);

        let branch = rec.local_refs.get("branch").unwrap();
        assert!(branch.contains("leaf"));
        assert!(branch.contains("shared"));

        let grow = rec.local_refs.get("Tree.grow").unwrap();
        assert!(grow.contains("branch"));

        // Class-level entry aggregates the body references.
        let tree = rec.local_refs.get("Tree").unwrap();
        assert!(tree.contains("branch"));

        assert!(rec.local_refs.get("leaf").unwrap().is_empty());
    }

    #[test]
    fn aliased_import_ref_uses_alias() {
        let src = "from utils import helper as h\n\ndef run():\n    return h()\n";
        let (rec, _) = extract("run.py", src);
        assert!(rec.local_refs.get("run").unwrap().contains("h"));
    }

    #[test]
    fn syntax_error_degrades_to_lines_only() {
        let src = "def broken(:\n    pass\n";
        let (rec, warn) = extract("broken.py", src);
        assert!(warn.is_some());
        assert!(rec.functions.is_empty());
        assert!(rec.classes.is_empty());
        assert_eq!(rec.total_lines, 2);
    }

    #[test]
    fn attribute_roots_count_as_references() {
        let src = r#"import os

class Store:
    def save(self):
        pass

def persist(store):
    store.save()
    Store.save(store)
"#;
        let (rec, _) = extract("store.py", src);
        let persist = rec.local_refs.get("persist").unwrap();
        // `Store.save(...)` roots at Store; `store.save()` roots at a local.
        assert!(persist.contains("Store"));
        assert!(!persist.contains("os"));
    }
}
