//! Logging setup for bloomdupe.
//!
//! Every component logs through the `log` facade; this module installs the
//! `env_logger` backend for the binary. The level comes from, in order:
//!
//! 1. `RUST_LOG`, when set
//! 2. `--quiet` (errors only)
//! 3. `-v` (debug) or `-vv` (trace)
//! 4. info otherwise
//!
//! Debug builds prefix each line with a timestamp and, when verbose, the
//! module path. Release builds print a bracketed level tag and the message.
//!
//! # Example
//!
//! ```rust,no_run
//! use bloomdupe::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("shown with -v");
//! ```

use env_logger::Builder;
use log::{Level, LevelFilter};
use std::env;
use std::io::Write;

/// Install the global logger.
///
/// Only the first call in a process takes effect; later calls keep the
/// logger that is already installed.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    configure_format(&mut builder, verbose);
    if builder.try_init().is_err() {
        return;
    }

    if from_env {
        log::debug!("Log level taken from RUST_LOG={:?}", env::var("RUST_LOG").ok());
    } else {
        log::debug!("Log level: {}", level_name(log::max_level()));
    }
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Tag printed in front of release-build lines.
#[cfg_attr(debug_assertions, allow(dead_code))]
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

#[cfg(debug_assertions)]
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let timestamp = buf.timestamp_seconds();
        let level = record.level();
        let style = buf.default_level_style(level);

        if verbose >= 1 {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                timestamp,
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{} {style}{:<5}{style:#} {}", timestamp, level, record.args())
        }
    });
}

#[cfg(not(debug_assertions))]
fn configure_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}[{}]{style:#} {}", level_tag(level), record.args())
    });
}

/// Lowercase name of a level filter.
#[must_use]
pub fn level_name(filter: LevelFilter) -> &'static str {
    match filter {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
