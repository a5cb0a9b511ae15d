use std::path::Path;
use std::time::Duration;

use config::{Config as Cfg, File};
use serde::Deserialize;

use super::retry::RetryPolicy;
use crate::core::FacturaError;

/// Environment variable prefix; nested keys use `__` (e.g. `AUTHORITY__RETRY__MAX_RETRIES`).
pub const ENV_PREFIX: &str = "AUTHORITY";

/// Connection and signing settings for the tax authority.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub url: String,
    pub token: String,
    /// "test" or "production".
    pub environment: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Shared secret of the placeholder HMAC signer.
    pub signing_secret: String,
    pub retry: RetryPolicy,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            url: "https://api.hacienda.gob.sv".into(),
            token: String::new(),
            environment: "test".into(),
            timeout_ms: 10_000,
            signing_secret: "clave_simulada".into(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AuthorityConfig {
    /// Load from an optional `authority.{toml,yaml,json}` in the working
    /// directory, overridden by `AUTHORITY__*` environment variables.
    pub fn load() -> Result<Self, FacturaError> {
        Self::load_from("authority")
    }

    /// Like [`load`](Self::load) with an explicit file stem or path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, FacturaError> {
        let name = path.as_ref().to_string_lossy().into_owned();
        let config = Cfg::builder()
            .add_source(File::with_name(&name).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| FacturaError::Config(e.to_string()))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| FacturaError::Config(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), FacturaError> {
        if self.timeout_ms == 0 {
            return Err(FacturaError::Config("timeout_ms must be greater than zero".into()));
        }
        if !matches!(self.environment.as_str(), "test" | "production") {
            return Err(FacturaError::Config(format!(
                "environment must be 'test' or 'production', got '{}'",
                self.environment
            )));
        }
        if self.signing_secret.is_empty() {
            return Err(FacturaError::Config("signing_secret must not be empty".into()));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(FacturaError::Config(
                "retry.backoff_multiplier must be at least 1.0".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
