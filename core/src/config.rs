//! Provider configuration.
//!
//! Configuration is fixed once a `Provider` is built. It can come from an
//! environment preset or a TOML file:
//!
//! ```toml
//! environment = "dev"      # dev | test | prd
//! base_url = "https://..."  # optional, overrides the preset
//! timeout_ms = 10000
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Deployment environment, each with its own backend base URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Test,
    Prd,
}

impl Environment {
    /// Base URL of this environment's backend. Test and production have not
    /// been provisioned yet and resolve to an empty base.
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Dev => "https://www.wanandroid.com",
            Environment::Test => "",
            Environment::Prd => "",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Prd => "prd",
        };
        f.write_str(name)
    }
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "prd" => Ok(Environment::Prd),
            other => Err(ApiError::ConfigError(format!("unknown environment: {other}"))),
        }
    }
}

/// Base URL and timeout for a `Provider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    environment: Environment,
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn for_environment(environment: Environment) -> Self {
        Self::new(environment.base_url())
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ApiError> {
        let raw: RawConfig = toml::from_str(contents)?;
        let config = Self {
            base_url: raw
                .base_url
                .unwrap_or_else(|| raw.environment.base_url().to_string()),
            timeout_ms: raw.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ApiError::ConfigError(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject a zero timeout and a non-empty base URL without an HTTP scheme.
    /// An empty base URL is allowed; such a provider only accepts absolute
    /// URLs.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.timeout_ms == 0 {
            return Err(ApiError::ConfigError("timeout_ms must be greater than zero".to_string()));
        }
        let base = self.base_url.as_str();
        if !base.is_empty() && !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ApiError::ConfigError(format!(
                "base_url must start with http:// or https://, got '{base}'"
            )));
        }
        Ok(())
    }
}
