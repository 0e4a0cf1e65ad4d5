//! Shared types for the secret orchestration layer

use serde_json::Value;

/// A secret value as loaded from a connector: a string, number, boolean, or
/// structured object, depending on what the source stores.
pub type SecretValue = Value;

/// Delivery channel a prepared effect is meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectType {
    /// A manifest to apply with kubectl-style tooling.
    Kubectl,
    /// Something an operator must do by hand.
    Manual,
    /// Provider-defined channel.
    Custom(String),
}

impl EffectType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Kubectl => "kubectl",
            Self::Manual => "manual",
            Self::Custom(name) => name,
        }
    }
}

/// One unit of applyable output a provider prepared from a secret value.
#[derive(Debug, Clone)]
pub struct PreparedEffect {
    /// Name of the provider that produced the effect, when it had one
    /// assigned.
    pub provider_name: Option<String>,
    pub effect_type: EffectType,
    /// Structured payload, e.g. a Secret manifest.
    pub value: Value,
}

impl PreparedEffect {
    pub fn new(effect_type: EffectType, value: Value) -> Self {
        Self {
            provider_name: None,
            effect_type,
            value,
        }
    }

    /// Shorthand for a kubectl-applyable manifest effect.
    pub fn kubectl(value: Value) -> Self {
        Self::new(EffectType::Kubectl, value)
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }
}

/// Where and how a provider should inject a secret reference into a
/// resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretInjectionStrategy {
    /// Environment variables of one container in the pod template.
    Env { container_index: usize },
    /// The pod template's image pull secret list.
    ImagePullSecret,
}

impl SecretInjectionStrategy {
    /// The default strategy: environment variables of the first container.
    pub fn env() -> Self {
        Self::Env { container_index: 0 }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Env { .. } => "env",
            Self::ImagePullSecret => "imagePullSecret",
        }
    }
}

impl Default for SecretInjectionStrategy {
    fn default() -> Self {
        Self::env()
    }
}

/// Naming metadata for one injected secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionMeta {
    /// The secret's name as declared with the manager.
    pub secret_name: String,
    /// Optional rename for the injected reference, e.g. the env var name.
    pub target_name: Option<String>,
}

impl InjectionMeta {
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            target_name: None,
        }
    }

    pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    /// The name the injected reference should carry.
    pub fn target_or_secret_name(&self) -> &str {
        self.target_name.as_deref().unwrap_or(&self.secret_name)
    }
}

/// One resolved injection handed to a provider when computing a payload.
#[derive(Debug, Clone)]
pub struct ProviderInjection {
    /// Composer id of the resource being injected into.
    pub resource_id: String,
    /// Field path inside that resource.
    pub path: String,
    pub meta: InjectionMeta,
}

/// Declaration of one managed secret.
///
/// Connector and provider references are optional; unset ones fall back to
/// the manager's defaults at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretOptions {
    pub name: String,
    pub connector: Option<String>,
    pub provider: Option<String>,
}

impl SecretOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connector: None,
            provider: None,
        }
    }

    pub fn with_connector(mut self, id: impl Into<String>) -> Self {
        self.connector = Some(id.into());
        self
    }

    pub fn with_provider(mut self, id: impl Into<String>) -> Self {
        self.provider = Some(id.into());
        self
    }
}

impl From<&str> for SecretOptions {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SecretOptions {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
