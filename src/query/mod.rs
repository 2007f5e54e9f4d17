//! Query Engine
//!
//! Sixteen read-only operations over a `ProjectIndex`, exposed as methods on
//! `Queries`, a borrow of a stable index snapshot. Every list-returning
//! operation takes a `max_*` cap (`0` = unbounded), documents its ordering,
//! and flags truncation; results are typed records, never bare strings.
//!
//! @module query

pub mod params;
pub mod results;
pub mod traverse;

use globset::Glob;
use regex::Regex;

use crate::error::{CodemapError, Result};
use crate::index::{ProjectIndex, SymbolEntry};
use crate::model::{FileRecord, LineRange};
use params::*;
use results::*;

/// Read-only query surface over one index snapshot.
pub struct Queries<'a> {
    index: &'a ProjectIndex,
}

impl<'a> Queries<'a> {
    pub fn new(index: &'a ProjectIndex) -> Self {
        Self { index }
    }

    // -------------------------------------------------------------------------
    // Overview
    // -------------------------------------------------------------------------

    /// High-level project overview: counts, packages, top classes and
    /// functions (20 each, overflow counted).
    pub fn project_summary(&self) -> ProjectSummary {
        const LISTING_CAP: usize = 20;

        let mut packages: Vec<String> = self
            .index
            .files
            .keys()
            .filter_map(|p| p.rsplit_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        packages.sort();
        packages.dedup();

        let mut paths: Vec<&String> = self.index.files.keys().collect();
        paths.sort();

        let mut classes: Vec<SymbolSite> = Vec::new();
        let mut functions: Vec<SymbolSite> = Vec::new();
        for path in paths {
            let record = &self.index.files[path];
            for cls in &record.classes {
                classes.push(SymbolSite {
                    name: cls.name.clone(),
                    path: path.clone(),
                });
            }
            for func in record.functions.iter().filter(|f| !f.is_method) {
                functions.push(SymbolSite {
                    name: func.name.clone(),
                    path: path.clone(),
                });
            }
        }

        let more_classes = classes.len().saturating_sub(LISTING_CAP);
        let more_functions = functions.len().saturating_sub(LISTING_CAP);
        classes.truncate(LISTING_CAP);
        functions.truncate(LISTING_CAP);

        ProjectSummary {
            root: self.index.root.display().to_string(),
            stats: self.index.stats,
            packages,
            classes,
            more_classes,
            functions,
            more_functions,
        }
    }

    /// Sorted file paths, optionally glob-filtered.
    pub fn list_files(&self, params: &ListFilesParams) -> Result<FileList> {
        let mut paths: Vec<String> = self.index.files.keys().cloned().collect();
        paths.sort();

        if let Some(pattern) = &params.pattern {
            let matcher = Glob::new(pattern)
                .map_err(|e| CodemapError::InvalidGlob(e.to_string()))?
                .compile_matcher();
            paths.retain(|p| matcher.is_match(p.as_str()));
        }

        let (paths, truncated) = truncate(paths, params.max_results);
        Ok(FileList { paths, truncated })
    }

    /// Per-file structure, or the project summary when no path is given.
    pub fn structure_summary(&self, params: &StructureSummaryParams) -> Result<StructureSummary> {
        let Some(path) = &params.path else {
            return Ok(StructureSummary::Project(self.project_summary()));
        };
        let record = self.record(path)?;

        let mut imports: Vec<String> = record.imports.iter().map(|i| i.module.clone()).collect();
        imports.sort();
        imports.dedup();

        Ok(StructureSummary::File(FileStructure {
            path: record.path.clone(),
            total_lines: record.total_lines,
            imports,
            classes: record
                .classes
                .iter()
                .map(|c| class_view(&record.path, c))
                .collect(),
            functions: record
                .functions
                .iter()
                .filter(|f| !f.is_method)
                .map(|f| function_view(&record.path, f))
                .collect(),
            sections: record.sections.clone(),
        }))
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    /// Functions (methods included), ordered by (file, start line).
    pub fn functions(&self, params: &ListingParams) -> Result<FunctionList> {
        let mut views: Vec<FunctionView> = Vec::new();
        for record in self.listing_records(params.path.as_deref())? {
            views.extend(record.functions.iter().map(|f| function_view(&record.path, f)));
        }
        views.sort_by(|a, b| (&a.file, a.range.start).cmp(&(&b.file, b.range.start)));
        let (functions, truncated) = truncate(views, params.max_results);
        Ok(FunctionList {
            functions,
            truncated,
        })
    }

    /// Classes, ordered by (file, start line).
    pub fn classes(&self, params: &ListingParams) -> Result<ClassList> {
        let mut views: Vec<ClassView> = Vec::new();
        for record in self.listing_records(params.path.as_deref())? {
            views.extend(record.classes.iter().map(|c| class_view(&record.path, c)));
        }
        views.sort_by(|a, b| (&a.file, a.range.start).cmp(&(&b.file, b.range.start)));
        let (classes, truncated) = truncate(views, params.max_results);
        Ok(ClassList { classes, truncated })
    }

    /// Imports, ordered by (file, line).
    pub fn imports(&self, params: &ListingParams) -> Result<ImportList> {
        let mut views: Vec<ImportView> = Vec::new();
        for record in self.listing_records(params.path.as_deref())? {
            views.extend(record.imports.iter().map(|i| ImportView {
                module: i.module.clone(),
                names: i.names.clone(),
                alias: i.alias.clone(),
                file: record.path.clone(),
                line: i.line,
                is_from: i.is_from,
            }));
        }
        views.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        let (imports, truncated) = truncate(views, params.max_results);
        Ok(ImportList { imports, truncated })
    }

    fn listing_records(&self, path: Option<&str>) -> Result<Vec<&FileRecord>> {
        match path {
            Some(p) => Ok(vec![self.record(p)?]),
            None => {
                let mut records: Vec<&FileRecord> = self.index.files.values().collect();
                records.sort_by(|a, b| a.path.cmp(&b.path));
                Ok(records)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Source retrieval
    // -------------------------------------------------------------------------

    /// Source of a function or method, located via the symbol table when no
    /// path narrows the search.
    pub fn function_source(&self, params: &SourceParams) -> Result<SourceSlice> {
        let found = self.locate(&params.name, params.path.as_deref(), |record, name| {
            record
                .functions
                .iter()
                .find(|f| f.name == name || f.qualified_name == name)
                .map(|f| f.range)
        })?;
        Ok(self.splice(found.0, found.1, params.max_lines))
    }

    /// Source of a class by name.
    pub fn class_source(&self, params: &SourceParams) -> Result<SourceSlice> {
        let found = self.locate(&params.name, params.path.as_deref(), |record, name| {
            record
                .classes
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.range)
        })?;
        Ok(self.splice(found.0, found.1, params.max_lines))
    }

    /// Verbatim lines `start..=end` (1-indexed) of a file. `end` beyond EOF
    /// is clamped; an empty or inverted range is an error.
    pub fn lines(&self, params: &GetLinesParams) -> Result<SourceSlice> {
        let record = self.record(&params.path)?;
        if params.start < 1 {
            return Err(CodemapError::InvalidRange {
                start: params.start,
                end: params.end,
                reason: "start must be >= 1".into(),
            });
        }
        if params.start > record.total_lines {
            return Err(CodemapError::InvalidRange {
                start: params.start,
                end: params.end,
                reason: format!("file has {} lines", record.total_lines),
            });
        }
        let end = params.end.min(record.total_lines);
        if params.start > end {
            return Err(CodemapError::InvalidRange {
                start: params.start,
                end: params.end,
                reason: "start exceeds end".into(),
            });
        }
        let range = LineRange::new(params.start, end);
        Ok(self.splice(record, range, 0))
    }

    /// Find a declaration range by name: explicit path first, then the
    /// symbol table (entries already tie-broken by path then line), then a
    /// full scan in sorted path order.
    fn locate(
        &self,
        name: &str,
        path: Option<&str>,
        probe: impl Fn(&FileRecord, &str) -> Option<LineRange>,
    ) -> Result<(&FileRecord, LineRange)> {
        if let Some(path) = path {
            let record = self.record(path)?;
            return probe(record, name)
                .map(|range| (record, range))
                .ok_or_else(|| CodemapError::SymbolNotFound(name.to_string()));
        }

        if let Some(entries) = self.index.symbols.get(name) {
            for entry in entries {
                if let Some(record) = self.index.files.get(&entry.path) {
                    if let Some(range) = probe(record, name) {
                        return Ok((record, range));
                    }
                }
            }
        }

        let mut paths: Vec<&String> = self.index.files.keys().collect();
        paths.sort();
        for path in paths {
            let record = &self.index.files[path];
            if let Some(range) = probe(record, name) {
                return Ok((record, range));
            }
        }
        Err(CodemapError::SymbolNotFound(name.to_string()))
    }

    fn splice(&self, record: &FileRecord, range: LineRange, max_lines: usize) -> SourceSlice {
        let all = record.slice(range);
        let truncated = max_lines > 0 && all.len() > max_lines;
        let keep = if truncated { max_lines } else { all.len() };
        SourceSlice {
            path: record.path.clone(),
            start_line: range.start,
            lines: all[..keep].to_vec(),
            truncated,
            omitted_lines: (all.len() - keep) as u32,
        }
    }

    // -------------------------------------------------------------------------
    // Symbols and dependency graphs
    // -------------------------------------------------------------------------

    /// Where a symbol is defined; ties break by smallest path, then line.
    pub fn find_symbol(&self, params: &FindSymbolParams) -> Result<SymbolLocation> {
        let entries = self
            .index
            .symbols
            .get(&params.name)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| CodemapError::SymbolNotFound(params.name.clone()))?;
        let first = &entries[0];
        Ok(SymbolLocation {
            name: params.name.clone(),
            path: first.path.clone(),
            line: first.line,
            kind: first.kind,
            candidates: entries.len(),
        })
    }

    /// What `symbol` references, ordered by the target's (path, line).
    pub fn dependencies(&self, params: &DependencyParams) -> Result<DependencyList> {
        self.graph_neighbors(&params.symbol, params.max_results, &self.index.deps_out)
    }

    /// What references `symbol`, ordered by the source's (path, line).
    pub fn dependents(&self, params: &DependencyParams) -> Result<DependencyList> {
        self.graph_neighbors(&params.symbol, params.max_results, &self.index.deps_in)
    }

    fn graph_neighbors(
        &self,
        symbol: &str,
        max_results: usize,
        graph: &std::collections::HashMap<String, std::collections::HashSet<String>>,
    ) -> Result<DependencyList> {
        if !self.index.knows_symbol(symbol) {
            return Err(CodemapError::SymbolNotFound(symbol.to_string()));
        }
        let mut entries: Vec<DependencyEntry> = graph
            .get(symbol)
            .into_iter()
            .flatten()
            .map(|name| self.dependency_entry(name))
            .collect();
        entries.sort_by(|a, b| (&a.path, a.line, &a.symbol).cmp(&(&b.path, b.line, &b.symbol)));
        let (entries, truncated) = truncate(entries, max_results);
        Ok(DependencyList {
            symbol: symbol.to_string(),
            entries,
            truncated,
        })
    }

    fn dependency_entry(&self, name: &str) -> DependencyEntry {
        match self.index.symbol_definition(name) {
            Some(SymbolEntry { path, line, kind }) => DependencyEntry {
                symbol: name.to_string(),
                path: path.clone(),
                line: *line,
                kind: *kind,
            },
            None => DependencyEntry {
                symbol: name.to_string(),
                path: String::new(),
                line: 0,
                kind: crate::model::SymbolKind::Function,
            },
        }
    }

    /// Direct and transitive dependents. Disjoint sets; the symbol itself is
    /// in neither; truncation caps are independent.
    pub fn change_impact(&self, params: &ChangeImpactParams) -> Result<ChangeImpact> {
        if !self.index.knows_symbol(&params.symbol) {
            return Err(CodemapError::SymbolNotFound(params.symbol.clone()));
        }

        let (direct_names, levels) = traverse::impact_closure(&self.index.deps_in, &params.symbol);

        let mut direct: Vec<DependencyEntry> = direct_names
            .iter()
            .map(|n| self.dependency_entry(n))
            .collect();
        direct.sort_by(|a, b| (&a.path, a.line, &a.symbol).cmp(&(&b.path, b.line, &b.symbol)));

        let mut transitive: Vec<DependencyEntry> = Vec::new();
        for level in levels {
            let mut entries: Vec<DependencyEntry> =
                level.iter().map(|n| self.dependency_entry(n)).collect();
            entries.sort_by(|a, b| (&a.path, a.line, &a.symbol).cmp(&(&b.path, b.line, &b.symbol)));
            transitive.extend(entries);
        }

        let (direct, direct_truncated) = truncate(direct, params.max_direct);
        let (transitive, transitive_truncated) = truncate(transitive, params.max_transitive);
        Ok(ChangeImpact {
            symbol: params.symbol.clone(),
            direct,
            transitive,
            direct_truncated,
            transitive_truncated,
        })
    }

    /// Shortest path over forward dependencies. No path is a `None` chain,
    /// never an error; an unknown starting symbol is an error.
    pub fn call_chain(&self, params: &CallChainParams) -> Result<CallChain> {
        if !self.index.knows_symbol(&params.from) {
            return Err(CodemapError::SymbolNotFound(params.from.clone()));
        }
        Ok(CallChain {
            from: params.from.clone(),
            to: params.to.clone(),
            chain: traverse::shortest_chain(&self.index.deps_out, &params.from, &params.to),
        })
    }

    // -------------------------------------------------------------------------
    // File graph
    // -------------------------------------------------------------------------

    /// Files this file imports from, sorted lexicographically.
    pub fn file_dependencies(&self, params: &FileGraphParams) -> Result<FileDependencyList> {
        self.file_neighbors(&params.path, params.max_results, true)
    }

    /// Files importing this file, sorted lexicographically.
    pub fn file_dependents(&self, params: &FileGraphParams) -> Result<FileDependencyList> {
        self.file_neighbors(&params.path, params.max_results, false)
    }

    fn file_neighbors(
        &self,
        path: &str,
        max_results: usize,
        outgoing: bool,
    ) -> Result<FileDependencyList> {
        let record = self.record(path)?;
        let graph = if outgoing {
            &self.index.imports_out
        } else {
            &self.index.imports_in
        };
        let mut files: Vec<String> = graph
            .get(&record.path)
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        files.sort();
        let (files, truncated) = truncate(files, max_results);
        Ok(FileDependencyList {
            path: record.path.clone(),
            files,
            truncated,
        })
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Regex search across all files in sorted path order, one match per
    /// line. The scan stops as soon as the cap is reached.
    pub fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let regex =
            Regex::new(&params.pattern).map_err(|e| CodemapError::InvalidRegex(e.to_string()))?;

        let mut paths: Vec<&String> = self.index.files.keys().collect();
        paths.sort();

        let mut matches = Vec::new();
        let mut truncated = false;
        'scan: for path in paths {
            let record = &self.index.files[path];
            for (idx, line) in record.lines.iter().enumerate() {
                if regex.is_match(line) {
                    if params.max_results > 0 && matches.len() >= params.max_results {
                        truncated = true;
                        break 'scan;
                    }
                    matches.push(SearchMatch {
                        path: path.clone(),
                        line: idx as u32 + 1,
                        content: line.clone(),
                    });
                }
            }
        }
        Ok(SearchResults { matches, truncated })
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Resolve a path argument: exact match, then unique suffix leniency
    /// (`indexer.py` finds `src/indexer.py`).
    fn record(&self, path: &str) -> Result<&FileRecord> {
        if let Some(record) = self.index.files.get(path) {
            return Ok(record);
        }
        let suffix = format!("/{}", path);
        let mut candidates: Vec<&String> = self
            .index
            .files
            .keys()
            .filter(|stored| stored.ends_with(&suffix) || path.ends_with(&format!("/{}", stored)))
            .collect();
        candidates.sort();
        candidates
            .first()
            .map(|p| &self.index.files[p.as_str()])
            .ok_or_else(|| CodemapError::FileNotFound(path.to_string()))
    }
}

fn truncate<T>(mut items: Vec<T>, max: usize) -> (Vec<T>, bool) {
    if max > 0 && items.len() > max {
        items.truncate(max);
        (items, true)
    } else {
        (items, false)
    }
}

fn function_view(path: &str, func: &crate::model::FunctionRecord) -> FunctionView {
    FunctionView {
        name: func.name.clone(),
        qualified_name: func.qualified_name.clone(),
        file: path.to_string(),
        range: func.range,
        params: func.params.iter().map(|p| p.name.clone()).collect(),
        is_method: func.is_method,
        parent: func.parent.clone(),
    }
}

fn class_view(path: &str, cls: &crate::model::ClassRecord) -> ClassView {
    ClassView {
        name: cls.name.clone(),
        file: path.to_string(),
        range: cls.range,
        kind: cls.kind,
        bases: cls.bases.clone(),
        methods: cls.methods.iter().map(|m| m.name.clone()).collect(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
