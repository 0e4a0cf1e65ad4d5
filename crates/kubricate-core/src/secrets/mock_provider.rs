//! Scripted provider for tests and dry runs

use serde_json::{json, Map, Value};

use crate::secrets::provider::{Provider, ProviderError, ProviderResult};
use crate::secrets::types::{
    PreparedEffect, ProviderInjection, SecretInjectionStrategy, SecretValue,
};

/// Provider with deterministic, cluster-free behavior.
///
/// Prepares one Opaque-style Secret manifest per secret value and injects
/// `secretKeyRef` env entries, which makes merge and injection paths easy
/// to assert against in tests.
#[derive(Debug)]
pub struct MockProvider {
    name: Option<String>,
    secret_name: String,
    namespace: String,
    target_kind: String,
    fail_prepare: bool,
}

impl MockProvider {
    /// `secret_name` is the name of the Secret manifest the provider
    /// pretends to manage.
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            name: None,
            secret_name: secret_name.into(),
            namespace: "default".to_string(),
            target_kind: "Deployment".to_string(),
            fail_prepare: false,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_target_kind(mut self, kind: impl Into<String>) -> Self {
        self.target_kind = kind.into();
        self
    }

    /// Make every `prepare` call fail, for error-path tests.
    pub fn failing(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("mock")
    }
}

impl Provider for MockProvider {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn target_kind(&self) -> &str {
        &self.target_kind
    }

    fn target_path(&self, strategy: &SecretInjectionStrategy) -> ProviderResult<String> {
        match strategy {
            SecretInjectionStrategy::Env { container_index } => Ok(format!(
                "spec.template.spec.containers[{container_index}].env"
            )),
            other => Err(ProviderError::unsupported_strategy(self.label(), other)),
        }
    }

    fn injection_payload(&self, injects: &[ProviderInjection]) -> Value {
        Value::Array(
            injects
                .iter()
                .map(|inject| {
                    json!({
                        "name": inject.meta.target_or_secret_name(),
                        "valueFrom": {
                            "secretKeyRef": {
                                "name": self.secret_name.clone(),
                                "key": inject.meta.secret_name.clone()
                            }
                        }
                    })
                })
                .collect(),
        )
    }

    fn prepare(&self, name: &str, value: SecretValue) -> ProviderResult<Vec<PreparedEffect>> {
        if self.fail_prepare {
            return Err(ProviderError::invalid_secret_value(
                self.label(),
                name,
                "scripted failure",
            ));
        }
        let mut data = Map::new();
        data.insert(name.to_string(), value);
        let mut effect = PreparedEffect::kubectl(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": self.secret_name.clone(),
                "namespace": self.namespace.clone()
            },
            "type": "Opaque",
            "data": data
        }));
        if let Some(name) = &self.name {
            effect = effect.with_provider_name(name.clone());
        }
        Ok(vec![effect])
    }

    fn effect_identifier(&self, effect: &PreparedEffect) -> String {
        let metadata = &effect.value["metadata"];
        format!(
            "{}/{}",
            metadata["namespace"].as_str().unwrap_or("default"),
            metadata["name"].as_str().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::types::InjectionMeta;

    #[test]
    fn test_target_path_indexes_the_container() {
        let provider = MockProvider::new("my-secret");
        assert_eq!(
            provider
                .target_path(&SecretInjectionStrategy::env())
                .unwrap(),
            "spec.template.spec.containers[0].env"
        );
        assert_eq!(
            provider
                .target_path(&SecretInjectionStrategy::Env { container_index: 2 })
                .unwrap(),
            "spec.template.spec.containers[2].env"
        );
    }

    #[test]
    fn test_unsupported_strategy_is_an_error() {
        let provider = MockProvider::new("my-secret");
        assert!(!provider.supports_strategy(&SecretInjectionStrategy::ImagePullSecret));
        assert!(matches!(
            provider
                .target_path(&SecretInjectionStrategy::ImagePullSecret)
                .unwrap_err(),
            ProviderError::UnsupportedStrategy { .. }
        ));
    }

    #[test]
    fn test_injection_payload_references_the_secret() {
        let provider = MockProvider::new("my-secret");
        let injects = vec![
            ProviderInjection {
                resource_id: "app".to_string(),
                path: "spec.template.spec.containers[0].env".to_string(),
                meta: InjectionMeta::new("API_KEY"),
            },
            ProviderInjection {
                resource_id: "app".to_string(),
                path: "spec.template.spec.containers[0].env".to_string(),
                meta: InjectionMeta::new("DB_URL").with_target_name("DATABASE_URL"),
            },
        ];
        assert_eq!(
            provider.injection_payload(&injects),
            json!([
                {
                    "name": "API_KEY",
                    "valueFrom": {"secretKeyRef": {"name": "my-secret", "key": "API_KEY"}}
                },
                {
                    "name": "DATABASE_URL",
                    "valueFrom": {"secretKeyRef": {"name": "my-secret", "key": "DB_URL"}}
                }
            ])
        );
    }

    #[test]
    fn test_prepare_emits_a_secret_manifest() {
        let provider = MockProvider::new("my-secret").with_namespace("apps");
        let effects = provider.prepare("API_KEY", json!("s3cret")).unwrap();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].value["metadata"]["namespace"], "apps");
        assert_eq!(effects[0].value["data"], json!({"API_KEY": "s3cret"}));
        assert_eq!(provider.effect_identifier(&effects[0]), "apps/my-secret");
    }

    #[test]
    fn test_failing_provider_rejects_prepare() {
        let provider = MockProvider::new("my-secret").failing();
        assert!(matches!(
            provider.prepare("API_KEY", json!("x")).unwrap_err(),
            ProviderError::InvalidSecretValue { .. }
        ));
    }

    #[test]
    fn test_default_merge_unions_same_secret_effects() {
        let provider = MockProvider::new("my-secret");
        let mut effects = provider.prepare("KEY_A", json!("xxx")).unwrap();
        effects.extend(provider.prepare("KEY_B", json!("yyy")).unwrap());
        let merged = provider.merge_secrets(effects);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].value["data"],
            json!({"KEY_A": "xxx", "KEY_B": "yyy"})
        );
    }
}
