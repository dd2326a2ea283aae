//! Demo configuration.
//!
//! Loaded from environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `SWITCHBOARD_DEMO_SCENARIO` | `success` | Scripted collaborator outcome |
//! | `SWITCHBOARD_BROADCAST_CAPACITY` | `64` | Store action broadcast capacity |
//! | `SWITCHBOARD_SHUTDOWN_TIMEOUT_SECS` | `30` | Store shutdown timeout |

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use switchboard_runtime::StoreConfig;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `SWITCHBOARD_DEMO_SCENARIO` names no known scenario
    #[error("Unknown scenario '{0}', expected one of: success, login-fails, token-fails, register-fails, empty-token")]
    UnknownScenario(String),
}

/// Which collaborator outcome the demo scripts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scenario {
    /// Every step succeeds
    #[default]
    Success,
    /// The login provider fails
    LoginFails,
    /// The token endpoint fails after login succeeded
    TokenFails,
    /// The SDK rejects the registration
    RegisterFails,
    /// The token endpoint issues an empty token
    EmptyToken,
}

impl Scenario {
    /// Every scenario, in documentation order
    pub const ALL: [Self; 5] = [
        Self::Success,
        Self::LoginFails,
        Self::TokenFails,
        Self::RegisterFails,
        Self::EmptyToken,
    ];

    /// Name used in `SWITCHBOARD_DEMO_SCENARIO`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::LoginFails => "login-fails",
            Self::TokenFails => "token-fails",
            Self::RegisterFails => "register-fails",
            Self::EmptyToken => "empty-token",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownScenario(s.to_string()))
    }
}

/// Demo binary configuration
#[derive(Clone, Debug, Default)]
pub struct DemoConfig {
    /// Scripted collaborator outcome
    pub scenario: Scenario,
    /// Store settings
    pub store: StoreConfig,
}

impl DemoConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownScenario`] if the scenario is not recognised.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownScenario`] if the scenario is not recognised.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scenario = lookup("SWITCHBOARD_DEMO_SCENARIO")
            .map(|value| value.parse::<Scenario>())
            .transpose()?
            .unwrap_or_default();

        let mut store = StoreConfig::default();
        if let Some(capacity) = lookup("SWITCHBOARD_BROADCAST_CAPACITY").and_then(|s| s.parse().ok()) {
            store = store.with_broadcast_capacity(capacity);
        }
        if let Some(secs) = lookup("SWITCHBOARD_SHUTDOWN_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            store = store.with_shutdown_timeout(Duration::from_secs(secs));
        }

        Ok(Self { scenario, store })
    }
}
