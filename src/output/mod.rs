//! Output formatters for session reports.
//!
//! - [`text`]: the human-readable group listing with wasted-byte totals
//! - [`json`]: machine-readable groups, counters and persisted paths
//!
//! # Example
//!
//! ```no_run
//! use bloomdupe::config::Config;
//! use bloomdupe::output::TextOutput;
//! use bloomdupe::session::Session;
//! use std::path::PathBuf;
//!
//! let mut session = Session::new(Config::default());
//! let report = session.run(&[PathBuf::from(".")], None).unwrap();
//! TextOutput::new(&report).write_to(&mut std::io::stdout()).unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
