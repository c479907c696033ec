use clap::Parser;
use std::path::PathBuf;

use bruteforce_zip::{ConfigError, CrackConfig};

#[derive(Parser)]
#[command(name = "bruteforce-zip")]
#[command(author = "maxgfr")]
#[command(version)]
#[command(about = "Encrypted ZIP offline password recovery - Educational use only", long_about = None)]
pub struct Args {
    /// Path to the password-protected ZIP archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Number of threads to use (default: CPU count minus one)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Characters a password may contain, in search order
    #[arg(long)]
    pub charset: Option<String>,

    /// Exact password length
    #[arg(short, long)]
    pub length: Option<usize>,

    /// Prefix length used to split work between threads
    #[arg(long)]
    pub prefix_length: Option<usize>,

    /// File the discovered password is written to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// JSON config file; command line flags take precedence
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extract the archive into DIR once the password is found
    #[arg(long, value_name = "DIR")]
    pub extract: Option<PathBuf>,

    /// Print a JSON summary instead of the progress bar
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Merge the config file (if any) with command line overrides
    pub fn to_config(&self) -> Result<CrackConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => CrackConfig::load(path)?,
            None => CrackConfig::default(),
        };

        if let Some(threads) = self.threads {
            config.threads = Some(threads);
        }
        if let Some(charset) = &self.charset {
            config.charset = charset.clone();
        }
        if let Some(length) = self.length {
            config.length = length;
        }
        if let Some(prefix_length) = self.prefix_length {
            config.prefix_length = prefix_length;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "bruteforce-zip",
            "vault.zip",
            "--charset",
            "ab",
            "-l",
            "3",
            "-t",
            "2",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.charset, "ab");
        assert_eq!(config.length, 3);
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.prefix_length, 2);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["bruteforce-zip", "vault.zip", "--prefix-length", "9"]);
        assert!(matches!(
            args.to_config(),
            Err(ConfigError::PrefixTooLong { prefix: 9, length: 6 })
        ));
    }
}
