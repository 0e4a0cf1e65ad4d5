//! Configuration layer
//!
//! Project-level settings that tune composition without code changes:
//! composer behavior flags and default secret wiring. Configuration is
//! plain data; loading it is the caller's choice, and nothing in the engine
//! requires a config file to exist.

mod file;

pub use file::{ConfigLevel, FileConfigProvider};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::composer::ComposerOptions;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KubricateConfig {
    /// Composer behavior flags.
    pub composer: ComposerOptions,

    /// Default secret wiring applied to managers.
    pub secrets: SecretsDefaults,
}

/// Default connector and provider ids for secret managers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecretsDefaults {
    /// Connector id to use when a secret names none.
    pub connector: Option<String>,

    /// Provider id to use when a secret names none.
    pub provider: Option<String>,
}

/// Errors raised by configuration providers.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_permissive() {
        let config = KubricateConfig::default();
        assert!(!config.composer.strict_ids);
        assert!(!config.composer.legacy_skip_missing_constructor);
        assert_eq!(config.secrets.connector, None);
        assert_eq!(config.secrets.provider, None);
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let config = KubricateConfig {
            composer: ComposerOptions::new().with_strict_ids(true),
            secrets: SecretsDefaults {
                connector: Some("env".to_string()),
                provider: None,
            },
        };
        let rendered = serde_yaml::to_string(&config).unwrap();
        let parsed: KubricateConfig = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let parsed: KubricateConfig =
            serde_yaml::from_str("secrets:\n  connector: env\n").unwrap();
        assert_eq!(parsed.secrets.connector.as_deref(), Some("env"));
        assert!(!parsed.composer.strict_ids);
    }
}
