//! Network stack settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// User agent string for NetKit.
const USER_AGENT: &str = concat!("netkit/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Stack Settings
// ============================================================================

/// Settings for a [`NetworkStack`](crate::stack::NetworkStack) and its
/// default session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Total request timeout in seconds.
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// User agent sent by the default session.
    pub user_agent: String,
    /// How many times a single fetch may re-authenticate after the
    /// authenticator reported an invalid credential.
    pub max_reauthentications: u32,
    /// How many identity challenges the default session answers per request.
    pub max_challenge_rounds: u32,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: USER_AGENT.to_string(),
            max_reauthentications: 3,
            max_challenge_rounds: 1,
        }
    }
}

impl StackSettings {
    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the re-authentication limit.
    pub fn with_max_reauthentications(mut self, max: u32) -> Self {
        self.max_reauthentications = max;
        self
    }

    /// Checks that the settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".to_string()));
        }
        if self.connect_timeout_secs > self.timeout_secs {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must not exceed timeout_secs".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent must not be empty".to_string()));
        }
        Ok(())
    }

    /// Loads settings from a JSON file, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: StackSettings = serde_json::from_str(&content)?;
        settings.validate()?;

        info!(path = %path.display(), "Loaded network settings");
        Ok(settings)
    }

    /// Saves settings to a JSON file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved network settings");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = StackSettings::default();
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert_eq!(settings.max_reauthentications, 3);
        assert!(settings.user_agent.starts_with("netkit/"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: StackSettings =
            serde_json::from_str(r#"{"max_reauthentications": 1}"#).unwrap();
        assert_eq!(settings.max_reauthentications, 1);
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let settings = StackSettings::default().with_timeout(Duration::ZERO);
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StackSettings::load_from(&dir.path().join("missing.json")).unwrap();
        assert_eq!(settings, StackSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("network.json");

        let settings = StackSettings::default().with_max_reauthentications(5);
        settings.save_to(&path).unwrap();

        assert_eq!(StackSettings::load_from(&path).unwrap(), settings);
    }
}
