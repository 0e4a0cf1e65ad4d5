//! Opaque Secret provider

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Value};

use kubricate_core::secrets::{
    PreparedEffect, Provider, ProviderError, ProviderInjection, ProviderResult,
    SecretInjectionStrategy, SecretValue,
};

use crate::merge::{kubernetes_effect_identifier, merge_kubernetes_effects};

/// Config for [`OpaqueSecretProvider`].
#[derive(Debug, Clone)]
pub struct OpaqueSecretProviderConfig {
    /// Name of the Secret object to create and reference.
    pub name: String,
    /// Namespace of the Secret object; `default` when unset.
    pub namespace: Option<String>,
}

impl OpaqueSecretProviderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("default")
    }
}

/// Provider that stores secret values in an Opaque `v1/Secret` and injects
/// `secretKeyRef` environment entries referencing it.
///
/// Each prepared secret becomes one data key in the Secret manifest, so
/// several secrets routed through the same provider merge into a single
/// manifest. String values are stored as-is and anything structured as
/// compact JSON, base64-encoded under `data`.
pub struct OpaqueSecretProvider {
    config: OpaqueSecretProviderConfig,
    name: Option<String>,
}

impl OpaqueSecretProvider {
    pub fn new(config: OpaqueSecretProviderConfig) -> Self {
        Self { config, name: None }
    }

    pub fn config(&self) -> &OpaqueSecretProviderConfig {
        &self.config
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("opaque-secret")
    }
}

impl Provider for OpaqueSecretProvider {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn target_kind(&self) -> &str {
        "Deployment"
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
                                "name": self.config.name.clone(),
                                "key": inject.meta.secret_name.clone()
                            }
                        }
                    })
                })
                .collect(),
        )
    }

    fn prepare(&self, name: &str, value: SecretValue) -> ProviderResult<Vec<PreparedEffect>> {
        let rendered = render_secret_string(&value)
            .map_err(|reason| ProviderError::invalid_secret_value(self.label(), name, reason))?;
        let mut data = Map::new();
        data.insert(
            name.to_string(),
            Value::String(BASE64.encode(rendered.as_bytes())),
        );
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": self.config.name.clone(),
                "namespace": self.config.namespace().to_string()
            },
            "type": "Opaque",
            "data": data
        });
        let mut effect = PreparedEffect::kubectl(manifest);
        if let Some(name) = &self.name {
            effect = effect.with_provider_name(name.clone());
        }
        Ok(vec![effect])
    }

    fn effect_identifier(&self, effect: &PreparedEffect) -> String {
        kubernetes_effect_identifier(effect)
    }

    fn merge_secrets(&self, effects: Vec<PreparedEffect>) -> Vec<PreparedEffect> {
        merge_kubernetes_effects(effects)
    }
}

fn render_secret_string(value: &SecretValue) -> Result<String, String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => serde_json::to_string(other).map_err(|e| e.to_string()),
    }
}
