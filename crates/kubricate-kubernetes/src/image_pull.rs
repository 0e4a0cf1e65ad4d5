//! Image pull Secret provider

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use kubricate_core::secrets::{
    PreparedEffect, Provider, ProviderError, ProviderInjection, ProviderResult,
    SecretInjectionStrategy, SecretValue,
};

use crate::merge::{kubernetes_effect_identifier, merge_kubernetes_effects};

/// Registry credentials expected as the secret value for
/// [`ImagePullSecretProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerRegistryCredentials {
    pub username: String,
    pub password: String,
    /// Registry host, e.g. `ghcr.io`.
    pub registry: String,
}

/// Config for [`ImagePullSecretProvider`].
#[derive(Debug, Clone)]
pub struct ImagePullSecretProviderConfig {
    /// Name of the dockerconfigjson Secret object.
    pub name: String,
    /// Namespace of the Secret object; `default` when unset.
    pub namespace: Option<String>,
}

impl ImagePullSecretProviderConfig {
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

/// Provider that renders registry credentials into a
/// `kubernetes.io/dockerconfigjson` Secret and injects the pod template's
/// `imagePullSecrets` entry referencing it.
///
/// The secret value must deserialize into [`DockerRegistryCredentials`];
/// anything else is rejected at prepare time rather than producing a
/// manifest the cluster cannot use.
pub struct ImagePullSecretProvider {
    config: ImagePullSecretProviderConfig,
    name: Option<String>,
}

impl ImagePullSecretProvider {
    pub fn new(config: ImagePullSecretProviderConfig) -> Self {
        Self { config, name: None }
    }

    pub fn config(&self) -> &ImagePullSecretProviderConfig {
        &self.config
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("image-pull-secret")
    }
}

impl Provider for ImagePullSecretProvider {
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
            SecretInjectionStrategy::ImagePullSecret => {
                Ok("spec.template.spec.imagePullSecrets".to_string())
            }
            other => Err(ProviderError::unsupported_strategy(self.label(), other)),
        }
    }

    fn injection_payload(&self, _injects: &[ProviderInjection]) -> Value {
        // Every injection references the same Secret object, so the entry
        // list does not grow with the number of declared secrets.
        json!([{ "name": self.config.name.clone() }])
    }

    fn prepare(&self, name: &str, value: SecretValue) -> ProviderResult<Vec<PreparedEffect>> {
        let creds: DockerRegistryCredentials = serde_json::from_value(value).map_err(|e| {
            ProviderError::invalid_secret_value(
                self.label(),
                name,
                format!("expected registry credentials: {e}"),
            )
        })?;
        let auth = BASE64.encode(format!("{}:{}", creds.username, creds.password));
        let mut auths = Map::new();
        auths.insert(
            creds.registry.clone(),
            json!({
                "username": creds.username.clone(),
                "password": creds.password.clone(),
                "auth": auth
            }),
        );
        let config_json = serde_json::to_string(&json!({ "auths": auths }))
            .map_err(|e| ProviderError::invalid_secret_value(self.label(), name, e.to_string()))?;
        let mut data = Map::new();
        data.insert(
            ".dockerconfigjson".to_string(),
            Value::String(BASE64.encode(config_json.as_bytes())),
        );
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": self.config.name.clone(),
                "namespace": self.config.namespace().to_string()
            },
            "type": "kubernetes.io/dockerconfigjson",
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
