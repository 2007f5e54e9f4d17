//! Fallback extractor: line and character counts only.

use crate::model::{FileRecord, Language};

pub fn extract(path: &str, source: &str) -> FileRecord {
    FileRecord::lines_only(path, Language::Generic, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only() {
        let rec = extract("data.csv", "a,b\n1,2\n");
        assert_eq!(rec.total_lines, 2);
        assert_eq!(rec.language, Language::Generic);
        assert!(rec.functions.is_empty());
        assert!(rec.imports.is_empty());
        assert_eq!(rec.lines, vec!["a,b", "1,2"]);
    }
}
