//! Rust Extractor
//!
//! Pattern-driven extraction of `fn` items, structs, enums, traits, impl
//! blocks (methods attributed to the self type), `macro_rules!` definitions,
//! and `use` statements. `///` doc comments and `#[...]` attributes above a
//! declaration are collected; brace matching skips strings, raw strings,
//! char literals, and nested block comments.
//!
//! @module extract/rust

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

static FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^((?:(?:pub(?:\([^)]*\))?|async|const|unsafe|extern\s+"[^"]*")\s+)*)fn\s+(\w+)"#)
        .unwrap()
});

static STRUCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?struct\s+(\w+)").unwrap());

static ENUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?enum\s+(\w+)").unwrap());

static TRAIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(\w+)(?:\s*:\s*([^{]+))?").unwrap()
});

static IMPL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^impl(?:<[^>]*>)?\s+(?:([\w:]+)\s+for\s+)?(\w+)").unwrap());

static MACRO_RULES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?macro_rules!\s+(\w+)").unwrap());

static USE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:pub\s+)?use\s+(.+?)\s*;").unwrap());

static ATTR_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#!?\[(\w+)").unwrap());
static DERIVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#\[derive\(([^)]+)\)\]").unwrap());
static USE_ALIAS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s+as\s+(\w+)$").unwrap());
static USE_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)::\{(.+)\}$").unwrap());
static ITEM_ALIAS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)\s+as\s+(\w+)$").unwrap());

// =============================================================================
// EXTRACTION
// =============================================================================

pub fn extract(path: &str, source: &str) -> FileRecord {
    let mut record = FileRecord::lines_only(path, Language::Rust, source);
    let lines = record.lines.clone();
    let total = lines.len();

    record.imports = parse_use_statements(&lines);

    let mut functions: Vec<FunctionRecord> = Vec::new();
    let mut classes: Vec<ClassRecord> = Vec::new();
    let mut consumed: HashSet<usize> = HashSet::new();

    // Pass 1: impl blocks; methods are attributed to the self type.
    let mut impl_methods: HashMap<String, Vec<FunctionRecord>> = HashMap::new();

    let mut i = 0;
    while i < total {
        let stripped = lines[i].trim();
        let check = stripped.strip_prefix("pub ").unwrap_or(stripped).trim_start();

        if check.starts_with("impl") {
            if let Some(caps) = IMPL_RE.captures(check) {
                let trait_name = caps.get(1).map(|m| m.as_str().to_string());
                let type_name = caps[2].to_string();

                let has_brace = stripped.contains('{')
                    || lines.get(i + 1).is_some_and(|l| l.trim().contains('{'));
                if !has_brace {
                    i += 1;
                    continue;
                }
                let impl_end = scan::find_block_end(&lines, i, scan::RUST);

                let mut j = i + 1;
                while j < impl_end {
                    if consumed.contains(&j) {
                        j += 1;
                        continue;
                    }
                    let fn_line = lines[j].trim();
                    if let Some(fn_caps) = FN_RE.captures(fn_line) {
                        let fn_name = fn_caps[2].to_string();
                        let (mut attrs, doc) = attrs_and_docs(&lines, j);
                        if let Some(trait_name) = &trait_name {
                            attrs.push(format!("impl:{}", trait_name));
                        }
                        let fn_end = fn_body_end(&lines, j);
                        let func = FunctionRecord {
                            qualified_name: format!("{}.{}", type_name, fn_name),
                            range: LineRange::new(j as u32 + 1, fn_end as u32 + 1),
                            params: parse_fn_params(&lines, j),
                            decorators: attrs,
                            doc,
                            is_method: true,
                            parent: Some(type_name.clone()),
                            modifiers: parse_modifiers(&fn_caps[1]),
                            name: fn_name,
                        };
                        impl_methods.entry(type_name.clone()).or_default().push(func.clone());
                        functions.push(func);
                        consumed.extend(j..=fn_end);
                        j = fn_end + 1;
                    } else {
                        j += 1;
                    }
                }

                consumed.extend(i..=impl_end);
                i = impl_end + 1;
                continue;
            }
        }
        i += 1;
    }

    // Pass 2: top-level items outside impl blocks.
    let mut i = 0;
    while i < total {
        if consumed.contains(&i) {
            i += 1;
            continue;
        }
        let stripped = lines[i].trim();

        if stripped.is_empty()
            || stripped.starts_with("//")
            || stripped.starts_with("/*")
            || stripped.starts_with("#[")
            || stripped.starts_with("#![")
        {
            i += 1;
            continue;
        }

        if stripped.starts_with("use ") || stripped.starts_with("pub use ") {
            while i < total && !lines[i].contains(';') {
                i += 1;
            }
            i += 1;
            continue;
        }

        if let Some(caps) = MACRO_RULES_RE.captures(stripped) {
            let name = caps[1].to_string();
            let (attrs, doc) = attrs_and_docs(&lines, i);
            let end = brace_or_self(&lines, i, stripped);
            functions.push(FunctionRecord {
                qualified_name: name.clone(),
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                params: Vec::new(),
                decorators: with_macro_marker(attrs),
                doc,
                is_method: false,
                parent: None,
                modifiers: Modifiers::empty(),
                name,
            });
            consumed.extend(i..=end);
            i = end + 1;
            continue;
        }

        if let Some(caps) = STRUCT_RE.captures(stripped) {
            let name = caps[1].to_string();
            let (attrs, doc) = attrs_and_docs(&lines, i);
            let end = if stripped.contains('{')
                || lines.get(i + 1).is_some_and(|l| l.trim().contains('{'))
            {
                scan::find_block_end(&lines, i, scan::RUST)
            } else if stripped.contains('(') {
                scan::find_semicolon_end(&lines, i)
            } else {
                i
            };
            classes.push(ClassRecord {
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                bases: Vec::new(),
                methods: impl_methods.get(&name).cloned().unwrap_or_default(),
                decorators: attrs,
                doc,
                kind: ClassKind::Struct,
                name,
            });
            consumed.extend(i..=end);
            i = end + 1;
            continue;
        }

        if let Some(caps) = ENUM_RE.captures(stripped) {
            let name = caps[1].to_string();
            let (attrs, doc) = attrs_and_docs(&lines, i);
            let end = brace_or_self(&lines, i, stripped);
            classes.push(ClassRecord {
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                bases: Vec::new(),
                methods: impl_methods.get(&name).cloned().unwrap_or_default(),
                decorators: attrs,
                doc,
                kind: ClassKind::Enum,
                name,
            });
            consumed.extend(i..=end);
            i = end + 1;
            continue;
        }

        if is_trait_line(stripped) {
            if let Some(caps) = TRAIT_RE.captures(stripped) {
                let name = caps[1].to_string();
                let (attrs, doc) = attrs_and_docs(&lines, i);
                let bases = caps
                    .get(2)
                    .map(|m| supertraits(m.as_str()))
                    .unwrap_or_default();
                let end = brace_or_self(&lines, i, stripped);

                // Signature-only and default trait methods.
                let mut trait_methods: Vec<FunctionRecord> = Vec::new();
                let mut j = i + 1;
                while j < end {
                    let fn_line = lines[j].trim();
                    if let Some(fn_caps) = FN_RE.captures(fn_line) {
                        let fn_name = fn_caps[2].to_string();
                        let fn_end = fn_body_end(&lines, j);
                        let func = FunctionRecord {
                            qualified_name: format!("{}.{}", name, fn_name),
                            range: LineRange::new(j as u32 + 1, fn_end as u32 + 1),
                            params: parse_fn_params(&lines, j),
                            decorators: Vec::new(),
                            doc: None,
                            is_method: true,
                            parent: Some(name.clone()),
                            modifiers: parse_modifiers(&fn_caps[1]),
                            name: fn_name,
                        };
                        trait_methods.push(func.clone());
                        functions.push(func);
                        j = fn_end + 1;
                    } else {
                        j += 1;
                    }
                }

                let mut methods = trait_methods;
                if let Some(extra) = impl_methods.get(&name) {
                    methods.extend(extra.iter().cloned());
                }
                classes.push(ClassRecord {
                    range: LineRange::new(i as u32 + 1, end as u32 + 1),
                    bases,
                    methods,
                    decorators: attrs,
                    doc,
                    kind: ClassKind::Trait,
                    name,
                });
                consumed.extend(i..=end);
                i = end + 1;
                continue;
            }
        }

        if let Some(caps) = FN_RE.captures(stripped) {
            let name = caps[2].to_string();
            let (attrs, doc) = attrs_and_docs(&lines, i);
            let end = fn_body_end(&lines, i);
            functions.push(FunctionRecord {
                qualified_name: name.clone(),
                range: LineRange::new(i as u32 + 1, end as u32 + 1),
                params: parse_fn_params(&lines, i),
                decorators: attrs,
                doc,
                is_method: false,
                parent: None,
                modifiers: parse_modifiers(&caps[1]),
                name,
            });
            consumed.extend(i..=end);
            i = end + 1;
            continue;
        }

        i += 1;
    }

    record.local_refs = super::body_refs(&lines, &functions, &classes, &record.imports, scan::RUST);
    record.functions = functions;
    record.classes = classes;
    record
}

fn is_trait_line(stripped: &str) -> bool {
    stripped.starts_with("trait ")
        || stripped.starts_with("pub trait ")
        || stripped.starts_with("unsafe trait ")
        || stripped.starts_with("pub unsafe trait ")
        || (stripped.starts_with("pub(") && stripped.contains(" trait "))
}

fn brace_or_self(lines: &[String], start: usize, stripped: &str) -> usize {
    if stripped.contains('{') || lines.get(start + 1).is_some_and(|l| l.trim().contains('{')) {
        scan::find_block_end(lines, start, scan::RUST)
    } else {
        start
    }
}

/// End of a fn item: closing brace for bodies, the `;` line for signatures.
fn fn_body_end(lines: &[String], start: usize) -> usize {
    let stripped = lines[start].trim();
    if stripped.contains('{') {
        return scan::find_block_end(lines, start, scan::RUST);
    }
    // Signature may wrap; decide once the declaration ends in `{` or `;`.
    for (j, line) in lines.iter().enumerate().skip(start) {
        if line.contains('{') {
            return scan::find_block_end(lines, start, scan::RUST);
        }
        if line.contains(';') {
            return j;
        }
    }
    start
}

fn parse_modifiers(prefix: &str) -> Modifiers {
    let mut m = Modifiers::empty();
    if prefix.contains("pub") {
        m |= Modifiers::PUB;
    }
    if prefix.contains("async") {
        m |= Modifiers::ASYNC;
    }
    if prefix.contains("const") {
        m |= Modifiers::CONST;
    }
    if prefix.contains("unsafe") {
        m |= Modifiers::UNSAFE;
    }
    m
}

fn with_macro_marker(mut attrs: Vec<String>) -> Vec<String> {
    attrs.push("macro".to_string());
    attrs
}

fn supertraits(raw: &str) -> Vec<String> {
    raw.split('+')
        .map(|s| s.trim().trim_end_matches('{').trim())
        .filter(|s| !s.is_empty() && *s != "where")
        .map(|s| {
            // Strip generic arguments from the supertrait name.
            s.split('<').next().unwrap_or(s).trim().to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// `///` docs and `#[...]` attributes stacked above a declaration.
fn attrs_and_docs(lines: &[String], decl_line: usize) -> (Vec<String>, Option<String>) {
    let mut attrs: Vec<String> = Vec::new();
    let mut doc: Vec<String> = Vec::new();
    let mut j = decl_line;
    while j > 0 {
        let above = lines[j - 1].trim();
        if let Some(text) = above.strip_prefix("///") {
            doc.insert(0, text.trim().to_string());
            j -= 1;
        } else if above.starts_with("#[") || above.starts_with("#![") {
            if let Some(caps) = DERIVE_RE.captures(above) {
                attrs.insert(0, format!("derive({})", caps[1].trim()));
            } else if let Some(caps) = ATTR_NAME_RE.captures(above) {
                attrs.insert(0, caps[1].to_string());
            }
            j -= 1;
        } else {
            break;
        }
    }
    let doc = if doc.is_empty() { None } else { Some(doc.join("\n")) };
    (attrs, doc)
}

/// Extract the parameter list of a fn declaration that may span lines.
fn parse_fn_params(lines: &[String], start: usize) -> Vec<Parameter> {
    let mut depth = 0i32;
    let mut collecting = false;
    let mut raw = String::new();

    'outer: for line in lines.iter().skip(start) {
        for ch in line.chars() {
            match ch {
                '(' => {
                    if collecting {
                        raw.push(ch);
                    }
                    depth += 1;
                    if depth == 1 {
                        collecting = true;
                    }
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 && collecting {
                        break 'outer;
                    }
                    if collecting {
                        raw.push(ch);
                    }
                }
                _ => {
                    if collecting {
                        raw.push(ch);
                    }
                }
            }
        }
        if collecting {
            raw.push(' ');
        }
    }

    let mut params = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part == "self" || part == "&self" || part == "&mut self" || part == "mut self" {
            continue;
        }
        if part.starts_with("self:") || part.starts_with("&self") {
            continue;
        }
        let Some((name_part, ty)) = part.split_once(':') else {
            continue;
        };
        let name = name_part.trim().trim_start_matches("mut ").trim();
        if !name.is_empty() && scan::IDENT_RE.find(name).is_some_and(|m| m.as_str() == name) {
            params.push(Parameter {
                name: name.to_string(),
                default: None,
                annotation: Some(ty.trim().to_string()),
            });
        }
    }
    params
}

// =============================================================================
// USE STATEMENTS
// =============================================================================

fn parse_use_statements(lines: &[String]) -> Vec<ImportRecord> {
    let mut imports = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let stripped = lines[i].trim();
        if !(stripped.starts_with("use ") || stripped.starts_with("pub use ")) {
            i += 1;
            continue;
        }

        if let Some(caps) = USE_RE.captures(stripped) {
            parse_use_path(caps[1].trim(), i as u32 + 1, &mut imports);
            i += 1;
            continue;
        }

        // Multi-line use: join until the terminating semicolon.
        let start = i;
        while i < lines.len() && !lines[i].contains(';') {
            i += 1;
        }
        if i < lines.len() {
            let joined: String = lines[start..=i]
                .iter()
                .map(|l| l.trim())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(caps) = USE_RE.captures(&joined) {
                parse_use_path(caps[1].trim(), start as u32 + 1, &mut imports);
            }
        }
        i += 1;
    }
    imports
}

/// Parse a use path: `a::b::{X, Y}`, `a::b::*`, `a::b::C as D`, `a::b::C`.
fn parse_use_path(path: &str, line: u32, imports: &mut Vec<ImportRecord>) {
    if let Some(module) = path.strip_suffix("::*") {
        imports.push(ImportRecord {
            module: module.to_string(),
            names: vec!["*".to_string()],
            alias: None,
            line,
            is_from: true,
        });
        return;
    }

    if let Some(caps) = USE_ALIAS_RE.captures(path) {
        let full = caps[1].trim();
        let (module, name) = split_last_segment(full);
        imports.push(ImportRecord {
            module,
            names: vec![name],
            alias: Some(caps[2].to_string()),
            line,
            is_from: true,
        });
        return;
    }

    if let Some(caps) = USE_GROUP_RE.captures(path) {
        let module = caps[1].trim().to_string();
        let names = caps[2]
            .split(',')
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(|item| match ITEM_ALIAS_RE.captures(item) {
                Some(a) => a[1].to_string(),
                None => item.to_string(),
            })
            .collect();
        imports.push(ImportRecord {
            module,
            names,
            alias: None,
            line,
            is_from: true,
        });
        return;
    }

    if path.contains("::") {
        let (module, name) = split_last_segment(path);
        imports.push(ImportRecord {
            module,
            names: vec![name],
            alias: None,
            line,
            is_from: true,
        });
    } else {
        imports.push(ImportRecord {
            module: path.to_string(),
            names: Vec::new(),
            alias: None,
            line,
            is_from: false,
        });
    }
}

fn split_last_segment(path: &str) -> (String, String) {
    match path.rsplit_once("::") {
        Some((module, name)) => (module.to_string(), name.to_string()),
        None => (path.to_string(), path.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
