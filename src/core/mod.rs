//! Parallel password recovery for encrypted ZIP archives
//!
//! ```text
//! prefix cursor ──> bounded queue ──> worker 0 (own archive handle) ─┐
//!                                ├──> worker 1 (own archive handle) ─┼──> coordinator ──> RunResult
//!                                └──> worker N (own archive handle) ─┘        │
//!                                          shared SearchState <───────────────┘
//! ```

// Core library modules
pub mod bruteforce;
pub mod config;
pub mod error;
pub mod oracle;
pub mod password_gen;
pub mod report;
pub mod state;

// Re-exports
pub use bruteforce::{
    search_partition, ArchiveBruteForcer, CoordinatorPhase, CrackProgress, RunResult, RunStats,
};
pub use config::CrackConfig;
pub use error::{ArchiveError, ConfigError, CrackError};
pub use oracle::{
    extract_all, list_members, ArchiveMember, Oracle, OracleFactory, ZipOracle, ZipOracleFactory,
};
pub use password_gen::{
    partition_cursor, partitions, Alphabet, Candidates, Partition, PartitionCursor,
};
pub use report::{FilePasswordStore, PasswordStore, RunSummary};
pub use state::SearchState;
