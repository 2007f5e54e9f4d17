//! Lexical Scanning Helpers
//!
//! Shared machinery for the regex-based extractors: a brace matcher and a
//! line sanitizer that both skip string literals, raw strings, char literals,
//! and comments so that `{`/`}` counting and identifier collection never see
//! quoted or commented text.
//!
//! @module extract/scan

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Identifier shape shared by all supported languages.
pub static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap());

// =============================================================================
// SCAN PROFILES
// =============================================================================

/// Per-language lexical quirks for the scanner.
#[derive(Debug, Clone, Copy)]
pub struct ScanProfile {
    /// `//`-style line comment introducer.
    pub line_comment: &'static str,
    /// `/* */` block comments.
    pub block_comments: bool,
    /// Block comments nest (Rust).
    pub nested_block_comments: bool,
    /// `'...'` is a string (TS/JS) rather than a char literal.
    pub single_quote_strings: bool,
    /// Backtick strings, possibly multi-line (Go raw strings, JS templates).
    pub backtick_strings: bool,
    /// `r"..."` / `r#"..."#` raw strings (Rust).
    pub rust_raw_strings: bool,
    /// `'a'` / `'\n'` char literals, distinguished from lifetimes (Rust).
    pub char_literals: bool,
}

pub const TYPESCRIPT: ScanProfile = ScanProfile {
    line_comment: "//",
    block_comments: true,
    nested_block_comments: false,
    single_quote_strings: true,
    backtick_strings: true,
    rust_raw_strings: false,
    char_literals: false,
};

pub const GO: ScanProfile = ScanProfile {
    line_comment: "//",
    block_comments: true,
    nested_block_comments: false,
    single_quote_strings: false,
    backtick_strings: true,
    rust_raw_strings: false,
    char_literals: true,
};

pub const RUST: ScanProfile = ScanProfile {
    line_comment: "//",
    block_comments: true,
    nested_block_comments: true,
    single_quote_strings: false,
    backtick_strings: false,
    rust_raw_strings: true,
    char_literals: true,
};

// =============================================================================
// SCANNER
// =============================================================================

/// Lexical state carried across lines.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    block_depth: u32,
    in_backtick: bool,
    /// Inside a Rust raw string, with this many `#` marks in the delimiter.
    raw_hashes: Option<u32>,
}

/// Strip comments and literals from one line, replacing them with spaces.
///
/// The returned string contains only code characters (non-ASCII bytes are
/// blanked; identifiers and structure are ASCII in every supported
/// language); `state` carries multi-line constructs (block comments,
/// backtick strings, raw strings) over to the next call. All scanning is
/// byte-based so multi-byte UTF-8 content cannot split the cursor.
pub fn strip_line(line: &str, state: &mut ScanState, profile: ScanProfile) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < bytes.len() {
        // Multi-line raw string continuation.
        if let Some(hashes) = state.raw_hashes {
            let closing = format!("\"{}", "#".repeat(hashes as usize));
            match find_bytes(&bytes[i..], closing.as_bytes()) {
                Some(pos) => {
                    push_spaces(&mut out, pos + closing.len());
                    i += pos + closing.len();
                    state.raw_hashes = None;
                    continue;
                }
                None => {
                    push_spaces(&mut out, bytes.len() - i);
                    return out;
                }
            }
        }

        // Multi-line backtick string continuation.
        if state.in_backtick {
            match bytes[i..].iter().position(|&b| b == b'`') {
                Some(pos) => {
                    push_spaces(&mut out, pos + 1);
                    i += pos + 1;
                    state.in_backtick = false;
                    continue;
                }
                None => {
                    push_spaces(&mut out, bytes.len() - i);
                    return out;
                }
            }
        }

        // Block comment continuation.
        if state.block_depth > 0 {
            if profile.nested_block_comments && bytes[i..].starts_with(b"/*") {
                state.block_depth += 1;
                push_spaces(&mut out, 2);
                i += 2;
                continue;
            }
            if bytes[i..].starts_with(b"*/") {
                state.block_depth -= 1;
                push_spaces(&mut out, 2);
                i += 2;
                continue;
            }
            out.push(' ');
            i += 1;
            continue;
        }

        // Line comment: rest of the line is dead.
        if bytes[i..].starts_with(profile.line_comment.as_bytes()) {
            push_spaces(&mut out, bytes.len() - i);
            return out;
        }

        // Block comment start.
        if profile.block_comments && bytes[i..].starts_with(b"/*") {
            state.block_depth += 1;
            push_spaces(&mut out, 2);
            i += 2;
            continue;
        }

        let b = bytes[i];

        // Rust raw string start: r"..." or r#"..."#.
        if profile.rust_raw_strings && b == b'r' {
            let rest = &bytes[i + 1..];
            let hashes = rest.iter().take_while(|&&b| b == b'#').count();
            if rest.get(hashes) == Some(&b'"') {
                push_spaces(&mut out, 1 + hashes + 1);
                i += 1 + hashes + 1;
                state.raw_hashes = Some(hashes as u32);
                continue;
            }
        }

        // Backtick string start.
        if profile.backtick_strings && b == b'`' {
            state.in_backtick = true;
            out.push(' ');
            i += 1;
            continue;
        }

        // Double-quoted string (single-line; unterminated runs to EOL).
        if b == b'"' {
            i += 1;
            out.push(' ');
            while i < bytes.len() {
                if bytes[i] == b'\\' {
                    push_spaces(&mut out, 2.min(bytes.len() - i));
                    i += 2;
                    continue;
                }
                let done = bytes[i] == b'"';
                out.push(' ');
                i += 1;
                if done {
                    break;
                }
            }
            continue;
        }

        // Single quote: string, char literal, or lifetime.
        if b == b'\'' {
            if profile.single_quote_strings {
                i += 1;
                out.push(' ');
                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        push_spaces(&mut out, 2.min(bytes.len() - i));
                        i += 2;
                        continue;
                    }
                    let done = bytes[i] == b'\'';
                    out.push(' ');
                    i += 1;
                    if done {
                        break;
                    }
                }
                continue;
            }
            if profile.char_literals {
                // '\n' style escaped literal
                if bytes.get(i + 1) == Some(&b'\\') {
                    if let Some(pos) = bytes[i + 2..].iter().position(|&b| b == b'\'') {
                        if pos <= 3 {
                            push_spaces(&mut out, 2 + pos + 1);
                            i += 2 + pos + 1;
                            continue;
                        }
                    }
                }
                // 'a' style plain literal; anything else is a lifetime
                if bytes.get(i + 2) == Some(&b'\'') {
                    push_spaces(&mut out, 3);
                    i += 3;
                    continue;
                }
            }
            out.push(' ');
            i += 1;
            continue;
        }

        if b.is_ascii() {
            out.push(b as char);
        } else {
            out.push(' ');
        }
        i += 1;
    }

    out
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn push_spaces(out: &mut String, n: usize) {
    for _ in 0..n {
        out.push(' ');
    }
}

/// Sanitize a whole file: every line stripped of comments and literals.
pub fn sanitize_lines(lines: &[String], profile: ScanProfile) -> Vec<String> {
    let mut state = ScanState::default();
    lines
        .iter()
        .map(|l| strip_line(l, &mut state, profile))
        .collect()
}

/// Find the 0-based line index where the outermost `{` opened at or after
/// `start` closes. Returns the last line if the brace never closes, and
/// `start` itself if no brace is found.
pub fn find_block_end(lines: &[String], start: usize, profile: ScanProfile) -> usize {
    let mut depth = 0i32;
    let mut found_open = false;
    let mut state = ScanState::default();

    for (idx, line) in lines.iter().enumerate().skip(start) {
        let code = strip_line(line, &mut state, profile);
        for ch in code.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    found_open = true;
                }
                '}' => {
                    depth -= 1;
                    if found_open && depth == 0 {
                        return idx;
                    }
                }
                _ => {}
            }
        }
    }

    if found_open {
        lines.len().saturating_sub(1)
    } else {
        start
    }
}

/// Find the line containing the terminating `;` at or after `start`.
pub fn find_semicolon_end(lines: &[String], start: usize) -> usize {
    for (idx, line) in lines.iter().enumerate().skip(start) {
        if line.contains(';') {
            return idx;
        }
    }
    start
}

/// Collect identifiers inside `sanitized[start..=end]` (0-based, inclusive)
/// that occur in `candidates`, excluding `own_name`.
pub fn collect_refs(
    sanitized: &[String],
    start: usize,
    end: usize,
    own_name: &str,
    candidates: &HashSet<&str>,
) -> HashSet<String> {
    let mut refs = HashSet::new();
    if sanitized.is_empty() {
        return refs;
    }
    let lo = start.min(sanitized.len() - 1);
    let hi = end.min(sanitized.len() - 1);
    if lo > hi {
        return refs;
    }
    for line in &sanitized[lo..=hi] {
        for m in IDENT_RE.find_iter(line) {
            let name = m.as_str();
            if name != own_name && candidates.contains(name) {
                refs.insert(name.to_string());
            }
        }
    }
    refs
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        src.split('\n').map(|s| s.to_string()).collect()
    }

    #[test]
    fn strip_line_comments() {
        let mut st = ScanState::default();
        let out = strip_line("let x = 1; // brace {", &mut st, TYPESCRIPT);
        assert!(!out.contains('{'));
        assert!(out.contains("let x = 1;"));
    }

    #[test]
    fn strip_strings_hide_braces() {
        let mut st = ScanState::default();
        let out = strip_line(r#"call("{"); other('{')"#, &mut st, TYPESCRIPT);
        assert!(!out.contains('{'));
        assert!(out.contains("call"));
    }

    #[test]
    fn block_comment_spans_lines() {
        let src = lines("a /* start\nstill { comment\nend */ b {");
        let sanitized = sanitize_lines(&src, TYPESCRIPT);
        assert!(!sanitized[1].contains('{'));
        assert!(sanitized[2].contains('{'));
    }

    #[test]
    fn rust_raw_string_spans_lines() {
        let src = lines("let s = r#\"open {\nstill {\n\"# ; }");
        let sanitized = sanitize_lines(&src, RUST);
        assert!(!sanitized[0].contains('{'));
        assert!(!sanitized[1].contains('{'));
        assert!(sanitized[2].contains('}'));
    }

    #[test]
    fn rust_lifetimes_are_not_char_literals() {
        let mut st = ScanState::default();
        let out = strip_line("fn f<'a>(x: &'a str) { let c = 'x'; }", &mut st, RUST);
        assert!(out.contains('{'));
        assert!(out.contains('}'));
        // char literal contents removed
        assert!(!out.contains('x') || out.matches('x').count() == 1);
    }

    #[test]
    fn go_backtick_raw_string() {
        let src = lines("q := `select {\nfrom t`\ndone := true");
        let sanitized = sanitize_lines(&src, GO);
        assert!(!sanitized[0].contains('{'));
        assert!(sanitized[2].contains("done"));
    }

    #[test]
    fn find_block_end_basic() {
        let src = lines("fn f() {\n  body();\n}\nafter");
        assert_eq!(find_block_end(&src, 0, RUST), 2);
    }

    #[test]
    fn find_block_end_nested() {
        let src = lines("class A {\n  m() {\n    if (x) { y(); }\n  }\n}\n");
        assert_eq!(find_block_end(&src, 0, TYPESCRIPT), 4);
        assert_eq!(find_block_end(&src, 1, TYPESCRIPT), 3);
    }

    #[test]
    fn find_block_end_ignores_quoted_braces() {
        let src = lines("fn f() {\n  let s = \"}\";\n}");
        assert_eq!(find_block_end(&src, 0, RUST), 2);
    }

    #[test]
    fn find_block_end_no_brace_returns_start() {
        let src = lines("type X = Y;\nmore");
        assert_eq!(find_block_end(&src, 0, TYPESCRIPT), 0);
    }

    #[test]
    fn collect_refs_intersects_candidates() {
        let src = lines("fn run() {\n  helper();\n  other(); // ignored()\n}");
        let sanitized = sanitize_lines(&src, RUST);
        let candidates: HashSet<&str> = ["helper", "run", "ignored"].into_iter().collect();
        let refs = collect_refs(&sanitized, 0, 3, "run", &candidates);
        assert!(refs.contains("helper"));
        assert!(!refs.contains("ignored"));
        assert!(!refs.contains("run"));
    }
}
