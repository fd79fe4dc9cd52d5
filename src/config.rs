//! Process-wide configuration for future diagnostics.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: a [`FutureConfig`] passed to [`install`]
//! 2. **Environment variables**: values from `PROMISSORY_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`FutureConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `PROMISSORY_LOG_FAILURES` | `bool` | `log_failures` |
//! | `PROMISSORY_TRACE_TIMEOUTS` | `bool` | `trace_timeouts` |

use std::sync::OnceLock;

use crate::tracing_compat::warn;

/// Environment variable name for failure diagnostics.
pub const ENV_LOG_FAILURES: &str = "PROMISSORY_LOG_FAILURES";
/// Environment variable name for timeout call-site tracing.
pub const ENV_TRACE_TIMEOUTS: &str = "PROMISSORY_TRACE_TIMEOUTS";

static GLOBAL: OnceLock<FutureConfig> = OnceLock::new();

/// Errors raised while building a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set to a value that does not parse.
    #[error("invalid value for {var}: {detail}")]
    InvalidEnv {
        /// The offending variable.
        var: String,
        /// What was expected and what was found.
        detail: String,
    },
    /// [`install`] was called after the global configuration was fixed.
    #[error("global configuration is already installed")]
    AlreadyInstalled,
    /// The config file could not be read.
    #[cfg(feature = "config-file")]
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`FutureTomlConfig`].
    #[cfg(feature = "config-file")]
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings that shape failure and timeout diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FutureConfig {
    /// Log the cause at debug level when a failed terminal future is built.
    pub log_failures: bool,
    /// Capture the call site of `timeout` and log it when the timer fires.
    pub trace_timeouts: bool,
}

impl Default for FutureConfig {
    fn default() -> Self {
        Self {
            log_failures: cfg!(debug_assertions),
            trace_timeouts: false,
        }
    }
}

impl FutureConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }
}

/// Installs the process-wide configuration.
///
/// Must run before the first call to [`global`]; afterwards the configuration
/// is fixed and this returns [`ConfigError::AlreadyInstalled`].
pub fn install(config: FutureConfig) -> Result<(), ConfigError> {
    GLOBAL
        .set(config)
        .map_err(|_| ConfigError::AlreadyInstalled)
}

/// Returns the process-wide configuration.
///
/// Without a prior [`install`], the first call resolves defaults plus
/// environment overrides. Unparseable variables are logged and ignored.
pub fn global() -> &'static FutureConfig {
    GLOBAL.get_or_init(|| {
        FutureConfig::from_env().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring invalid environment configuration");
            FutureConfig::default()
        })
    })
}

/// Apply environment variable overrides to a [`FutureConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut FutureConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_LOG_FAILURES) {
        config.log_failures = parse_bool(ENV_LOG_FAILURES, &val)?;
    }
    if let Some(val) = read_env(ENV_TRACE_TIMEOUTS) {
        config.trace_timeouts = parse_bool(ENV_TRACE_TIMEOUTS, &val)?;
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var_name.to_string(),
            detail: format!("expected bool (true/false/1/0/yes/no), got {val:?}"),
        }),
    }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable configuration.
///
/// ```toml
/// [futures]
/// log_failures = true
/// trace_timeouts = false
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct FutureTomlConfig {
    /// Diagnostic settings.
    #[serde(default)]
    pub futures: FuturesToml,
}

/// `[futures]` section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct FuturesToml {
    /// Log failed terminal futures at construction.
    pub log_failures: Option<bool>,
    /// Capture `timeout` call sites.
    pub trace_timeouts: Option<bool>,
}

/// Apply a parsed TOML config to a [`FutureConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut FutureConfig, toml: &FutureTomlConfig) {
    if let Some(v) = toml.futures.log_failures {
        config.log_failures = v;
    }
    if let Some(v) = toml.futures.trace_timeouts {
        config.trace_timeouts = v;
    }
}

/// Parse a TOML string into a [`FutureTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<FutureTomlConfig, ConfigError> {
    Ok(toml::from_str(toml_str)?)
}

/// Read and parse a TOML file into a [`FutureTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<FutureTomlConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml_str(&content)
}

/// Defaults, then the TOML file, then environment overrides.
#[cfg(feature = "config-file")]
pub fn load(path: &std::path::Path) -> Result<FutureConfig, ConfigError> {
    let mut config = FutureConfig::default();
    apply_toml_config(&mut config, &parse_toml_file(path)?);
    apply_env_overrides(&mut config)?;
    Ok(config)
}
