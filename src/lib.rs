//! bloomdupe - Duplicate File Finder with a bloom-filter pre-pass
//!
//! Walks the given paths, digests a short prefix of every regular file into a
//! bloom filter and only hashes files in full when their prefix may have been
//! seen before. Exact duplicates are reported as groups with the space they
//! waste; the filter and the full-hash index can be persisted for later runs.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod persist;
pub mod progress;
pub mod scanner;
pub mod session;

use std::io::{self, Write};
use std::rc::Rc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::session::Session;

/// Run bloomdupe for parsed command-line arguments.
///
/// Writes the report to stdout and returns the exit code for a completed
/// run.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the scan fails (including
/// a strict-mode violation), or persistence fails.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;

    if cli.print_config {
        let rendered = config.to_toml().context("Failed to render configuration")?;
        print!("{rendered}");
        return Ok(ExitCode::Success);
    }

    log::debug!("Effective configuration: {config:?}");

    let mut session = Session::new(config);
    if let Some(progress) = cli.progress() {
        session = session.with_progress_callback(Rc::new(progress));
    }

    let report = session
        .run(&cli.paths, cli.recover.as_deref())
        .context("Scan failed")?;

    let exit_code = ExitCode::Success;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.output {
        OutputFormat::Text => TextOutput::new(&report)
            .write_to(&mut out)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON report")?,
    }
    out.flush().context("Failed to write report")?;

    Ok(exit_code)
}
