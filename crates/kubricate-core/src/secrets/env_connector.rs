//! Environment variable connector

use std::collections::HashMap;
use std::env;
use std::fmt;

use serde_json::Value;

use crate::logging::SharedLogger;
use crate::secrets::connector::{Connector, ConnectorError, ConnectorResult};
use crate::secrets::types::SecretValue;

/// Connector that reads secrets from process environment variables.
///
/// Secret names map to variable names directly, optionally behind a prefix,
/// so the secret `DB_PASSWORD` with prefix `APP_` reads `APP_DB_PASSWORD`.
/// Values always load as strings.
#[derive(Default)]
pub struct EnvConnector {
    prefix: String,
    case_insensitive: bool,
    loaded: HashMap<String, SecretValue>,
    logger: Option<SharedLogger>,
}

impl fmt::Debug for EnvConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConnector")
            .field("prefix", &self.prefix)
            .field("case_insensitive", &self.case_insensitive)
            .field("loaded", &self.loaded.len())
            .finish()
    }
}

impl EnvConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a fixed prefix to every variable lookup.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Match variable names case-insensitively. Costs a scan of the whole
    /// environment per lookup.
    pub fn with_case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    fn variable_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn lookup(&self, variable: &str) -> Option<String> {
        if self.case_insensitive {
            // `env::vars` panics on non-Unicode entries; scan the raw
            // environment and skip entries that cannot match.
            env::vars_os().find_map(|(key, value)| match key.to_str() {
                Some(key) if key.eq_ignore_ascii_case(variable) => value.into_string().ok(),
                _ => None,
            })
        } else {
            env::var(variable).ok()
        }
    }
}

impl Connector for EnvConnector {
    fn name(&self) -> &str {
        "env"
    }

    fn load(&mut self, names: &[String]) -> ConnectorResult<()> {
        for name in names {
            let variable = self.variable_name(name);
            let value = self.lookup(&variable).ok_or_else(|| {
                ConnectorError::not_found(
                    name,
                    format!("environment variable `{variable}` is not set"),
                )
            })?;
            self.loaded.insert(name.clone(), Value::String(value));
        }
        if let Some(logger) = &self.logger {
            logger.debug(&format!(
                "loaded {} secrets from the environment",
                names.len()
            ));
        }
        Ok(())
    }

    fn get(&self, name: &str) -> ConnectorResult<SecretValue> {
        self.loaded
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectorError::not_loaded(name))
    }

    fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = Some(logger);
    }
}
