//! Command-line interface definitions for bloomdupe.
//!
//! # Example
//!
//! ```bash
//! # Scan two directories, writing filter.bloom / filter.db
//! bloomdupe ~/Downloads ~/Documents
//!
//! # Tighter filter, JSON report, no persistence
//! bloomdupe --fp-rate 0.0001 --no-persist -o json ~/Downloads
//!
//! # Reuse the filter written by the previous run over the same tree
//! bloomdupe --recover filter.bloom ~/Downloads
//!
//! # Fail when anything had to be ignored
//! bloomdupe --strict /srv/data
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::progress::Progress;

use crate::config::ConfigOverrides;

/// Duplicate file finder with a bloom-filter pre-pass.
///
/// Every regular file under the given paths gets a cheap prefix digest; only
/// files whose prefix may have been seen before are hashed in full.
#[derive(Debug, Parser)]
#[command(name = "bloomdupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files or directories to scan
    #[arg(value_name = "PATH", required_unless_present = "print_config")]
    pub paths: Vec<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Exit with an error when any file had to be ignored
    #[arg(long)]
    pub strict: bool,

    /// Target bloom filter false-positive probability, between 0 and 1
    #[arg(long, value_name = "P", value_parser = parse_probability)]
    pub fp_rate: Option<f64>,

    /// Bytes read for the shallow digest (e.g. 64, 4KiB)
    #[arg(long, value_name = "BYTES", value_parser = parse_size)]
    pub shallow_len: Option<u64>,

    /// Base path for the filter snapshot (.bloom) and hash index (.db)
    #[arg(long, value_name = "BASE")]
    pub index_base: Option<String>,

    /// Do not write the filter snapshot or hash index
    #[arg(long, conflicts_with = "index_base")]
    pub no_persist: bool,

    /// Load filter bits from a previous snapshot instead of starting empty
    ///
    /// The snapshot must have been written for the same number of files.
    #[arg(long, value_name = "FILE")]
    pub recover: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", env = "BLOOMDUPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Configuration values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let index_base = if self.no_persist {
            Some(String::new())
        } else {
            self.index_base.clone()
        };

        ConfigOverrides {
            false_positive_rate: self.fp_rate,
            shallow_len: self
                .shallow_len
                .map(|len| usize::try_from(len).unwrap_or(usize::MAX)),
            strict: self.strict.then_some(true),
            index_base,
        }
    }

    /// Progress reporter for the session, unless `--no-progress` was given.
    ///
    /// Under `--quiet` the reporter is attached but draws nothing.
    #[must_use]
    pub fn progress(&self) -> Option<Progress> {
        (!self.no_progress).then(|| Progress::new(self.quiet))
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Group listing with wasted-byte totals
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a probability strictly between 0 and 1.
///
/// # Errors
///
/// Returns an error for non-numbers and values outside (0, 1).
pub fn parse_probability(s: &str) -> Result<f64, String> {
    let p: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if p > 0.0 && p < 1.0 {
        Ok(p)
    } else {
        Err(format!("Probability must be between 0 and 1 (exclusive), got {p}"))
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB. Case-insensitive.
/// Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use bloomdupe::cli::parse_size;
///
/// assert_eq!(parse_size("64").unwrap(), 64);
/// assert_eq!(parse_size("4KiB").unwrap(), 4096);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
