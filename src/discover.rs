//! File Discovery
//!
//! Walks the project root, applies exclude patterns and the file-size cap,
//! and classifies each path by language. Binary content is rejected by
//! sniffing the first 8 KiB for a NUL byte at read time.
//!
//! @module discover

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{Config, BINARY_SNIFF_BYTES};
use crate::error::{CodemapError, Result};
use crate::model::Language;

/// Extensions the structural extractors understand. Everything else is left
/// to explicit include configuration and the generic extractor.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "py", "pyw", "ts", "tsx", "js", "jsx", "go", "rs", "md", "txt", "rst",
];

/// A discovered source file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Project-relative path, forward-slash normalized.
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub language: Language,
}

/// Walks project files, skipping excluded directories and oversized files.
pub struct FileWalker {
    root: PathBuf,
    excludes: GlobSet,
    exclude_components: Vec<String>,
    max_file_size: u64,
}

impl FileWalker {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut components = Vec::new();
        for pattern in &config.exclude_patterns {
            if pattern.contains('*') || pattern.contains('/') {
                let glob = Glob::new(&format!("**/{}", pattern))
                    .map_err(|e| CodemapError::InvalidGlob(e.to_string()))?;
                builder.add(glob);
            } else {
                components.push(pattern.clone());
            }
        }
        let excludes = builder
            .build()
            .map_err(|e| CodemapError::InvalidGlob(e.to_string()))?;
        Ok(Self {
            root: config.root.clone(),
            excludes,
            exclude_components: components,
            max_file_size: config.max_file_size,
        })
    }

    /// Walk all indexable files, sorted by relative path.
    pub fn walk(&self) -> Vec<DiscoveredFile> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!("Walk error: {}", err);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let rel_path = match self.relative(path) {
                Some(p) => p,
                None => continue,
            };
            if self.is_excluded(&rel_path) {
                continue;
            }
            if !is_supported(path) {
                continue;
            }

            if let Ok(meta) = path.metadata() {
                if meta.len() > self.max_file_size {
                    debug!(
                        file = %rel_path,
                        size = meta.len(),
                        "Skipping oversized file"
                    );
                    continue;
                }
            }

            files.push(DiscoveredFile {
                language: Language::from_path(&rel_path),
                rel_path,
                abs_path: path.to_path_buf(),
            });
        }

        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        files
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(normalize(rel))
    }

    fn is_excluded(&self, rel_path: &str) -> bool {
        if self.excludes.is_match(rel_path) {
            return true;
        }
        rel_path
            .split('/')
            .any(|part| self.exclude_components.iter().any(|c| c == part))
    }
}

/// Forward-slash normalize a relative path.
pub fn normalize(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Read a file as text. Returns `Ok(None)` for binary content (a NUL byte in
/// the first 8 KiB). Non-UTF-8 text is decoded lossily.
pub fn read_source(path: &Path) -> std::io::Result<Option<String>> {
    let bytes = std::fs::read(path)?;
    if bytes
        .iter()
        .take(BINARY_SNIFF_BYTES)
        .any(|&b| b == 0)
    {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walks_supported_files_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("a.rs"), "fn f() {}\n").unwrap();
        fs::write(dir.path().join("notes.md"), "# hi\n").unwrap();
        fs::write(dir.path().join("image.bin"), [0u8, 1, 2]).unwrap();

        let config = Config::new(dir.path());
        let walker = FileWalker::new(&config).unwrap();
        let files = walker.walk();

        let paths: Vec<_> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.py", "notes.md"]);
        assert_eq!(files[0].language, Language::Rust);
        assert_eq!(files[1].language, Language::Python);
    }

    #[test]
    fn excludes_build_dirs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x\n").unwrap();
        fs::create_dir_all(dir.path().join("src/__pycache__")).unwrap();
        fs::write(dir.path().join("src/__pycache__/mod.py"), "x\n").unwrap();
        fs::write(dir.path().join("src/app.py"), "x = 1\n").unwrap();

        let config = Config::new(dir.path());
        let walker = FileWalker::new(&config).unwrap();
        let paths: Vec<_> = walker.walk().into_iter().map(|f| f.rel_path).collect();
        assert_eq!(paths, vec!["src/app.py"]);
    }

    #[test]
    fn size_cap_skips_large_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("big.py"), "x".repeat(4096)).unwrap();
        fs::write(dir.path().join("small.py"), "x = 1\n").unwrap();

        let mut config = Config::new(dir.path());
        config.max_file_size = 1024;
        let walker = FileWalker::new(&config).unwrap();
        let paths: Vec<_> = walker.walk().into_iter().map(|f| f.rel_path).collect();
        assert_eq!(paths, vec!["small.py"]);
    }

    #[test]
    fn binary_sniff_rejects_nul() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weird.py");
        fs::write(&path, b"print(1)\x00hidden").unwrap();
        assert!(read_source(&path).unwrap().is_none());

        let path = dir.path().join("fine.py");
        fs::write(&path, "print(1)\n").unwrap();
        assert_eq!(read_source(&path).unwrap().unwrap(), "print(1)\n");
    }
}
