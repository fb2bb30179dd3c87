//! Bridge configuration (`.ums/config.toml`).
//!
//! Defines the typed configuration for the coordination layer: watcher
//! polling, hook timeout policy, and model resource discovery. Missing
//! fields use defaults; a missing file means all defaults (no error).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration for the coordination layer.
///
/// Parsed from `.ums/config.toml`:
///
/// ```toml
/// [watch]
/// poll_interval_ms = 500
///
/// [hooks]
/// result_timeout_secs = 10
/// fail_open = false
///
/// [model]
/// include = ["**/*.model.json"]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
#[derive(Default)]
pub struct BridgeConfig {
    /// Watcher polling settings.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Hook script behaviour.
    #[serde(default)]
    pub hooks: HooksConfig,

    /// Model resource discovery.
    #[serde(default)]
    pub model: ModelConfig,
}

// ---------------------------------------------------------------------------
// WatchConfig
// ---------------------------------------------------------------------------

/// Watcher polling settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Interval between trigger polls, in milliseconds (default: 500).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WatchConfig {
    /// The poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

const fn default_poll_interval_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// HooksConfig
// ---------------------------------------------------------------------------

/// Behaviour baked into the installed hook scripts.
///
/// These settings are read at install time: the scripts must work with no
/// coordinating process running, so the policy is written into the script
/// text rather than consulted at hook runtime.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooksConfig {
    /// How long a blocking hook waits for its result, in seconds
    /// (default: 10).
    #[serde(default = "default_result_timeout_secs")]
    pub result_timeout_secs: u64,

    /// Whether a blocking hook allows the commit when no result arrives in
    /// time (default: `false` — fail closed).
    #[serde(default)]
    pub fail_open: bool,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            result_timeout_secs: default_result_timeout_secs(),
            fail_open: false,
        }
    }
}

const fn default_result_timeout_secs() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Model resource discovery settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Glob patterns, relative to the repository root, selecting the model
    /// resources the store loads (default: `["**/*.model.json"]`).
    #[serde(default = "default_model_include")]
    pub include: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            include: default_model_include(),
        }
    }
}

fn default_model_include() -> Vec<String> {
    vec!["**/*.model.json".to_owned()]
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a bridge configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::BridgeError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            path: err.path.unwrap_or_default(),
            detail: err.message,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse
    /// errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                // Calculate line number from byte offset.
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }

    /// The default contents written by `umsb init`.
    #[must_use]
    pub fn default_toml() -> &'static str {
        "\
[watch]
poll_interval_ms = 500

[hooks]
result_timeout_secs = 10
fail_open = false

[model]
include = [\"**/*.model.json\"]
"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
