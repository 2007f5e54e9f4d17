//! Text/Markdown Extractor
//!
//! Heuristic heading detection for `.md`, `.txt`, and `.rst` files. Four
//! rules, first match per line wins:
//!
//! 1. Markdown headings: `#{1..6} Title` (level = number of hashes)
//! 2. Underline headings: a non-empty line followed by `===` (level 1) or
//!    `---` (level 2), underline at least 3 characters
//! 3. Numbered headings: `1.2.3 Title` (level = numbering depth)
//! 4. ALL-CAPS standalone lines of 4+ words (level 1)
//!
//! A section spans from its heading line up to (but not including) the next
//! heading of equal-or-higher level, or EOF.
//!
//! @module extract/text

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{FileRecord, Language, LineRange, SectionRecord};

static MD_HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*)").unwrap());
static NUMBERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\s+(.*)").unwrap());
static EQ_UNDERLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^=+$").unwrap());
static DASH_UNDERLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-+$").unwrap());

pub fn extract(path: &str, source: &str) -> FileRecord {
    let mut record = FileRecord::lines_only(path, Language::Text, source);
    record.sections = detect_sections(&record.lines);
    record
}

/// First pass: (0-based line index, title, level) per detected heading.
fn detect_headings(lines: &[String]) -> Vec<(usize, String, u32)> {
    let mut headings = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let stripped = line.trim();

        // Underline headings need a look-ahead, and must run first so the
        // underline line itself is not misread by the other rules.
        if i + 1 < lines.len() && !stripped.is_empty() && !stripped.starts_with('#') {
            let next = lines[i + 1].trim();
            if next.len() >= 3 && EQ_UNDERLINE_RE.is_match(next) {
                headings.push((i, stripped.to_string(), 1));
                i += 2;
                continue;
            }
            if next.len() >= 3 && DASH_UNDERLINE_RE.is_match(next) {
                headings.push((i, stripped.to_string(), 2));
                i += 2;
                continue;
            }
        }

        if let Some(caps) = MD_HEADING_RE.captures(line) {
            let title = caps[2].trim().to_string();
            if !title.is_empty() {
                headings.push((i, title, caps[1].len() as u32));
                i += 1;
                continue;
            }
        }

        if let Some(caps) = NUMBERED_RE.captures(stripped) {
            let numbering = &caps[1];
            let title = caps[2].trim();
            if !title.is_empty() {
                let level = numbering.matches('.').count() as u32 + 1;
                headings.push((i, format!("{} {}", numbering, title), level));
                i += 1;
                continue;
            }
        }

        // ALL-CAPS standalone lines of 4+ words.
        if !stripped.is_empty() {
            let words = stripped.split_whitespace().count();
            if words >= 4
                && stripped == stripped.to_uppercase()
                && stripped.chars().any(|c| c.is_ascii_uppercase())
            {
                headings.push((i, stripped.to_string(), 1));
            }
        }

        i += 1;
    }

    headings
}

fn detect_sections(lines: &[String]) -> Vec<SectionRecord> {
    let total = lines.len() as u32;
    let headings = detect_headings(lines);

    headings
        .iter()
        .enumerate()
        .map(|(idx, (line_idx, title, level))| {
            // Section runs to the line before the next heading of equal or
            // higher level (smaller level number binds tighter).
            let end = headings[idx + 1..]
                .iter()
                .find(|(_, _, l)| l <= level)
                .map(|(next_idx, _, _)| *next_idx as u32)
                .unwrap_or(total);
            SectionRecord {
                title: title.clone(),
                level: *level,
                range: LineRange::new(*line_idx as u32 + 1, end.max(*line_idx as u32 + 1)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_headings() {
        let src = "# Top\nbody\n## Sub\nmore\n# Next\ntail\n";
        let rec = extract("doc.md", src);
        assert_eq!(rec.sections.len(), 3);

        let top = &rec.sections[0];
        assert_eq!(top.title, "Top");
        assert_eq!(top.level, 1);
        assert_eq!(top.range, LineRange::new(1, 4));

        let sub = &rec.sections[1];
        assert_eq!(sub.level, 2);
        assert_eq!(sub.range, LineRange::new(3, 4));

        let next = &rec.sections[2];
        assert_eq!(next.range, LineRange::new(5, 6));
    }

    #[test]
    fn underline_headings() {
        let src = "Title\n=====\ntext\nSection\n-------\nmore\n";
        let rec = extract("doc.rst", src);
        assert_eq!(rec.sections.len(), 2);
        assert_eq!(rec.sections[0].title, "Title");
        assert_eq!(rec.sections[0].level, 1);
        assert_eq!(rec.sections[1].title, "Section");
        assert_eq!(rec.sections[1].level, 2);
    }

    #[test]
    fn short_underline_is_not_a_heading() {
        let src = "Title\n==\ntext\n";
        let rec = extract("doc.txt", src);
        assert!(rec.sections.is_empty());
    }

    #[test]
    fn numbered_sections() {
        let src = "1 Intro\ntext\n1.1 Detail\ntext\n2 Next\ntext\n";
        let rec = extract("doc.txt", src);
        assert_eq!(rec.sections.len(), 3);
        assert_eq!(rec.sections[0].title, "1 Intro");
        assert_eq!(rec.sections[0].level, 1);
        assert_eq!(rec.sections[1].title, "1.1 Detail");
        assert_eq!(rec.sections[1].level, 2);
        // "1 Intro" encloses "1.1 Detail" and ends before "2 Next".
        assert_eq!(rec.sections[0].range, LineRange::new(1, 4));
    }

    #[test]
    fn all_caps_heading() {
        let src = "intro\nTHIS IS A HEADING LINE\nbody text\n";
        let rec = extract("doc.txt", src);
        assert_eq!(rec.sections.len(), 1);
        assert_eq!(rec.sections[0].title, "THIS IS A HEADING LINE");
        assert_eq!(rec.sections[0].level, 1);
    }

    #[test]
    fn caps_needs_four_words() {
        let src = "SHORT CAPS LINE\nbody\n";
        let rec = extract("doc.txt", src);
        assert!(rec.sections.is_empty());
    }

    #[test]
    fn section_extends_to_eof() {
        let src = "# Only\nline2\nline3\n";
        let rec = extract("doc.md", src);
        assert_eq!(rec.sections[0].range, LineRange::new(1, 3));
    }
}
