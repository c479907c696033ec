/*!
 * Crack configuration
 *
 * Defaults reproduce the classic setup: six characters from `a-z0-9`,
 * split on two-character prefixes, one core left free for the caller.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::password_gen::{
    Alphabet, DEFAULT_CHARSET, DEFAULT_LENGTH, DEFAULT_PREFIX_LENGTH,
};

/// Where the discovered password is written by default
pub const DEFAULT_OUTPUT: &str = "password.txt";

/// Settings for one crack run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrackConfig {
    pub charset: String,
    pub length: usize,
    pub prefix_length: usize,
    /// Worker threads, `None` for available parallelism minus one
    pub threads: Option<usize>,
    pub progress_interval_ms: u64,
    pub output: PathBuf,
}

impl Default for CrackConfig {
    fn default() -> Self {
        Self {
            charset: DEFAULT_CHARSET.to_string(),
            length: DEFAULT_LENGTH,
            prefix_length: DEFAULT_PREFIX_LENGTH,
            threads: None,
            progress_interval_ms: 2000,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl CrackConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let load_err = |reason: String| ConfigError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))
    }

    pub fn alphabet(&self) -> Result<Alphabet, ConfigError> {
        Alphabet::new(&self.charset)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Number of workers to run
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let alphabet = self.alphabet()?;

        if self.length == 0 {
            return Err(ConfigError::ZeroLength);
        }
        if self.prefix_length > self.length {
            return Err(ConfigError::PrefixTooLong {
                prefix: self.prefix_length,
                length: self.length,
            });
        }
        if alphabet.space_size(self.length).is_none() {
            return Err(ConfigError::SpaceTooLarge {
                symbols: alphabet.len(),
                length: self.length,
            });
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }

        Ok(())
    }
}
