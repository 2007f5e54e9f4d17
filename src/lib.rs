//! codemap - Structural indexer for source-code repositories
//!
//! Answers navigation and impact queries about a codebase without requiring
//! the caller to read source files: definition lookup, forward/reverse
//! dependencies, transitive change impact, shortest call chains, structural
//! summaries, source slices, and regex search, all with bounded output.
//!
//! The pipeline: discovery walks the root and classifies files; per-language
//! extractors (parallel, pure) turn each file into a typed record; the
//! builder fuses records into a cross-file symbol table, import graph, and
//! symbol dependency graph with their inverses; `Codemap` owns the result
//! behind a single-writer/multi-reader lock and serves the query surface.

pub mod builder;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod index;
pub mod model;
pub mod query;
pub mod service;
pub mod update;

pub use builder::{build, BuildReport, BuildWarning, WarningKind};
pub use config::Config;
pub use error::{CodemapError, Result};
pub use index::{IndexStats, ProjectIndex, SymbolEntry};
pub use query::Queries;
pub use service::Codemap;
pub use update::ChangeSet;
