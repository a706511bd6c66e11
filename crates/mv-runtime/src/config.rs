//! Client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use mv_core::{MvError, MvResult, UserPrivacySettings};
use mv_spatial::{GeographyConfig, ResolverConfig};

/// Session behaviour
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Abandon a negotiation the parcel server has not answered (milliseconds)
    pub negotiation_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            negotiation_timeout_ms: 10_000,
        }
    }
}

impl SessionConfig {
    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }
}

/// Log output settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Everything the client core needs, usually loaded from the settings store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub resolver: ResolverConfig,
    pub geography: GeographyConfig,
    pub privacy: UserPrivacySettings,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Parse and validate a JSON settings document. Missing fields take
    /// their defaults.
    pub fn from_json(json: &str) -> MvResult<Self> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| MvError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> MvResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| MvError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> MvResult<()> {
        self.resolver.validate()?;
        self.geography.validate()?;
        if self.session.negotiation_timeout_ms == 0 {
            return Err(MvError::InvalidConfig(
                "negotiation_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
