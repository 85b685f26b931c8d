//! Coordinator configuration

use crate::{ConfigError, StoreKeys};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thirty days, the expiry horizon shared by all three collections
pub const DEFAULT_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Settings for an [`ExchangeCoordinator`](crate::ExchangeCoordinator)
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// namespace = "santa_2026"
/// ttl_secs = 604800
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Prefix of the three store keys
    pub namespace: String,
    /// Lifetime of the registry, ledger and flag, counted from initialization
    pub ttl_secs: u64,
    /// Receiver name shown when the user no longer exists in the directory
    pub unknown_name_label: String,
    /// Receiver wish shown when none was recorded
    pub missing_description_label: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            namespace: "gift_exchange".to_string(),
            ttl_secs: DEFAULT_TTL_SECS,
            unknown_name_label: "Unknown".to_string(),
            missing_description_label: "Not available".to_string(),
        }
    }
}

impl ExchangeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Validation("namespace must not be empty".into()));
        }
        if self.ttl_secs == 0 {
            return Err(ConfigError::Validation("ttl_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn keys(&self) -> StoreKeys {
        StoreKeys::new(&self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(2_592_000));
        assert_eq!(config.keys().drawn(), "gift_exchange:drawn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ExchangeConfig::from_toml_str(
            r#"
            namespace = "santa_2026"
            ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.namespace, "santa_2026");
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.unknown_name_label, "Unknown");
        assert_eq!(config.missing_description_label, "Not available");
    }

    #[test]
    fn test_validation_rejects_zero_ttl_and_blank_namespace() {
        assert!(matches!(
            ExchangeConfig::from_toml_str("ttl_secs = 0"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            ExchangeConfig::from_toml_str("namespace = \"  \""),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            ExchangeConfig::from_toml_str("ttl_secs = \"soon\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
