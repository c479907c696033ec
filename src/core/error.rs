/*!
 * Error types for the password recovery engine
 *
 * Only startup problems are errors here. Wrong keys are plain `false`
 * answers from the oracle and per-partition failures are reported as
 * progress events, so neither shows up in these enums.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned by a crack run
#[derive(Error, Debug)]
pub enum CrackError {
    /// The target archive could not be used
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Invalid search parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Fatal archive problems detected before any worker is dispatched
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Archive '{}' is corrupt: {reason}", path.display())]
    BadFormat { path: PathBuf, reason: String },

    #[error("Archive '{}' contains no files", .0.display())]
    Empty(PathBuf),

    #[error("Archive '{}' has no encrypted members", .0.display())]
    NotEncrypted(PathBuf),

    #[error("Failed to extract '{}': {reason}", path.display())]
    Extract { path: PathBuf, reason: String },

    #[error("Failed to read archive '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Search-space and settings validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Character set must not be empty")]
    EmptyCharset,

    #[error("Character set must be ASCII, found {0:?}")]
    NonAsciiCharset(char),

    #[error("Character set contains '{0}' more than once")]
    DuplicateSymbol(char),

    #[error("Password length must be at least 1")]
    ZeroLength,

    #[error("Prefix length {prefix} exceeds password length {length}")]
    PrefixTooLong { prefix: usize, length: usize },

    #[error("Search space of {symbols}^{length} candidates is too large")]
    SpaceTooLarge { symbols: usize, length: usize },

    #[error("Thread count must be at least 1")]
    ZeroThreads,

    #[error("Failed to load config '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, CrackError>;
