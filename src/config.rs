//! Layered run configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file: `--config <FILE>`, or `config.toml` in the platform
//!    config directory (`~/.config/bloomdupe/` on Linux) when it exists
//! 3. `BLOOMDUPE_*` environment variables, e.g. `BLOOMDUPE_STRICT=true`
//! 4. command-line flags, passed in as [`ConfigOverrides`]
//!
//! # Example
//!
//! ```no_run
//! use bloomdupe::config::{Config, ConfigOverrides};
//!
//! let overrides = ConfigOverrides {
//!     strict: Some(true),
//!     ..ConfigOverrides::default()
//! };
//! let config = Config::load(None, &overrides).unwrap();
//! assert!(config.strict);
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{BloomConfig, DEFAULT_FALSE_POSITIVE_RATE};
use crate::scanner::{WalkerConfig, DEFAULT_MAX_PATH_LEN, DEFAULT_SHALLOW_LEN};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "BLOOMDUPE_";

/// Default base name for the persisted filter and index.
pub const DEFAULT_INDEX_BASE: &str = "filter";

/// Errors from loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or had the wrong types.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The false-positive rate is outside (0, 1).
    #[error("false_positive_rate must be between 0 and 1 (exclusive), got {0}")]
    FalsePositiveRate(f64),

    /// The shallow prefix length is zero.
    #[error("shallow_len must be at least 1 byte")]
    ShallowLen,

    /// The path length bound is zero.
    #[error("max_path_len must be at least 1 byte")]
    MaxPathLen,

    /// The configuration could not be rendered as TOML.
    #[error("Cannot render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Effective configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target bloom filter false-positive probability
    pub false_positive_rate: f64,
    /// Bytes hashed for the shallow digest
    pub shallow_len: usize,
    /// Children whose path reaches this many bytes are skipped
    pub max_path_len: usize,
    /// Fail the run when any file was ignored
    pub strict: bool,
    /// Base path for `<base>.bloom` and `<base>.db`; empty disables persistence
    pub index_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            shallow_len: DEFAULT_SHALLOW_LEN,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            strict: false,
            index_base: DEFAULT_INDEX_BASE.to_string(),
        }
    }
}

/// Command-line values layered over everything else.
///
/// `None` leaves the lower layers' value in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    /// `--fp-rate`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_positive_rate: Option<f64>,
    /// `--shallow-len`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shallow_len: Option<usize>,
    /// `--strict`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    /// `--index-base`, or an empty string for `--no-persist`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_base: Option<String>,
}

impl Config {
    /// Platform config file path, whether or not it exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "bloomdupe", "bloomdupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The merged provider stack, before extraction.
    ///
    /// With no explicit file the platform file is used when present.
    #[must_use]
    pub fn figment(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        let file = config_file
            .map(Path::to_path_buf)
            .or_else(|| Self::default_path().filter(|p| p.is_file()));
        if let Some(file) = file {
            log::debug!("Reading config file {}", file.display());
            figment = figment.merge(Toml::file(file));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    /// Load, merge and validate the configuration.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::NotFound`] if `config_file` is given but missing.
    /// * [`ConfigError::Load`] if a layer is malformed.
    /// * A validation error from [`Config::validate`].
    pub fn load(
        config_file: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }

        let config: Config = Self::figment(config_file, overrides)
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.false_positive_rate;
        if !(p > 0.0 && p < 1.0) {
            return Err(ConfigError::FalsePositiveRate(p));
        }
        if self.shallow_len == 0 {
            return Err(ConfigError::ShallowLen);
        }
        if self.max_path_len == 0 {
            return Err(ConfigError::MaxPathLen);
        }
        Ok(())
    }

    /// Render as TOML, as accepted by `--config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Filter sizing parameters.
    #[must_use]
    pub fn bloom_config(&self) -> BloomConfig {
        BloomConfig::default().with_false_positive_rate(self.false_positive_rate)
    }

    /// Walker parameters.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::default().with_max_path_len(self.max_path_len)
    }

    /// Base path for persistence, or `None` when disabled.
    #[must_use]
    pub fn index_base_path(&self) -> Option<PathBuf> {
        if self.index_base.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.index_base))
        }
    }
}
