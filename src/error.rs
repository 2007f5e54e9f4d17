use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodemapError>;

#[derive(Error, Debug)]
pub enum CodemapError {
    #[error("Project root not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("File '{0}' not found in index")]
    FileNotFound(String),

    #[error("Symbol '{0}' not found")]
    SymbolNotFound(String),

    #[error("Invalid regex: {0}")]
    InvalidRegex(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("Invalid line range {start}..{end}: {reason}")]
    InvalidRange {
        start: u32,
        end: u32,
        reason: String,
    },

    #[error("Build cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
