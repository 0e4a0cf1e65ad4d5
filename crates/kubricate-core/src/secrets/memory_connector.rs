//! In-memory connector for tests and programmatic sources

use std::collections::{HashMap, HashSet};

use crate::secrets::connector::{Connector, ConnectorError, ConnectorResult};
use crate::secrets::types::SecretValue;

/// Connector backed by a plain map.
///
/// Keeps the same load-then-get contract as real sources so orchestration
/// code can be exercised without touching the environment or the network.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    secrets: HashMap<String, SecretValue>,
    loaded: HashSet<String>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one secret, builder-style.
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<SecretValue>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a secret after construction.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<SecretValue>) {
        self.secrets.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl Connector for InMemoryConnector {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&mut self, names: &[String]) -> ConnectorResult<()> {
        for name in names {
            if !self.secrets.contains_key(name) {
                return Err(ConnectorError::not_found(
                    name,
                    "not present in the in-memory source",
                ));
            }
            self.loaded.insert(name.clone());
        }
        Ok(())
    }

    fn get(&self, name: &str) -> ConnectorResult<SecretValue> {
        if !self.loaded.contains(name) {
            return Err(ConnectorError::not_loaded(name));
        }
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectorError::not_found(name, "value disappeared after load"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_then_get() {
        let mut connector = InMemoryConnector::new()
            .with_secret("API_KEY", "abc123")
            .with_secret("LIMITS", json!({"rps": 10}));
        assert_eq!(connector.len(), 2);
        connector
            .load(&["API_KEY".to_string(), "LIMITS".to_string()])
            .unwrap();
        assert_eq!(connector.get("API_KEY").unwrap(), json!("abc123"));
        assert_eq!(connector.get("LIMITS").unwrap(), json!({"rps": 10}));
    }

    #[test]
    fn test_get_without_load_is_rejected() {
        let connector = InMemoryConnector::new().with_secret("API_KEY", "abc123");
        assert!(matches!(
            connector.get("API_KEY").unwrap_err(),
            ConnectorError::NotLoaded { .. }
        ));
    }

    #[test]
    fn test_load_fails_on_missing_name() {
        let mut connector = InMemoryConnector::new().with_secret("PRESENT", "1");
        let err = connector
            .load(&["PRESENT".to_string(), "ABSENT".to_string()])
            .unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound { name, .. } if name == "ABSENT"));
    }

    #[test]
    fn test_set_replaces_existing_value() {
        let mut connector = InMemoryConnector::new().with_secret("KEY", "old");
        connector.set("KEY", "new");
        connector.load(&["KEY".to_string()]).unwrap();
        assert_eq!(connector.get("KEY").unwrap(), json!("new"));
    }
}
