/*!
 * Result persistence and report formatting
 */

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::bruteforce::RunResult;

/// Durable sink for the discovered password
pub trait PasswordStore: Sync {
    fn persist(&self, password: &str) -> io::Result<()>;
}

/// Writes the password as a single line, replacing previous content
pub struct FilePasswordStore {
    path: PathBuf,
}

impl FilePasswordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PasswordStore for FilePasswordStore {
    fn persist(&self, password: &str) -> io::Result<()> {
        let mut file = File::create(&self.path)?;
        writeln!(file, "{}", password)?;
        file.sync_all()
    }
}

/// Machine-readable run summary
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub attempts: u64,
    pub elapsed_secs: f64,
    pub passwords_per_second: f64,
    pub workers: usize,
    pub partitions: u64,
    pub failed_partitions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<&RunResult> for RunSummary {
    fn from(result: &RunResult) -> Self {
        let stats = result.stats();
        let (outcome, password, warning) = match result {
            RunResult::Found {
                password,
                persist_warning,
                ..
            } => ("found", Some(password.clone()), persist_warning.clone()),
            RunResult::Exhausted { .. } => ("exhausted", None, None),
            RunResult::Stopped { .. } => ("stopped", None, None),
        };

        Self {
            outcome,
            password,
            attempts: stats.attempts,
            elapsed_secs: stats.elapsed.as_secs_f64(),
            passwords_per_second: stats.rate(),
            workers: stats.workers,
            partitions: stats.partitions,
            failed_partitions: stats.failed_partitions,
            warning,
        }
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
