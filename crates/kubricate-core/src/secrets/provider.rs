//! Provider trait: backends that turn secret values into effects

use serde_json::Value;
use thiserror::Error;

use crate::logging::SharedLogger;
use crate::secrets::merge::merge_prepared_effects;
use crate::secrets::types::{
    PreparedEffect, ProviderInjection, SecretInjectionStrategy, SecretValue,
};

/// Errors raised by secret providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider has no target path for the requested strategy.
    #[error("provider `{provider}` does not support injection strategy `{strategy}`")]
    UnsupportedStrategy { provider: String, strategy: String },

    /// The loaded value does not fit the shape the provider requires.
    #[error("provider `{provider}` rejected the value for secret `{name}`: {reason}")]
    InvalidSecretValue {
        provider: String,
        name: String,
        reason: String,
    },
}

impl ProviderError {
    pub fn unsupported_strategy(
        provider: impl Into<String>,
        strategy: &SecretInjectionStrategy,
    ) -> Self {
        Self::UnsupportedStrategy {
            provider: provider.into(),
            strategy: strategy.kind().to_string(),
        }
    }

    pub fn invalid_secret_value(
        provider: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSecretValue {
            provider: provider.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A pluggable backend that knows how to deliver secrets to a target
/// resource shape.
///
/// Providers do two independent jobs. At preparation time they turn one
/// loaded secret value into [`PreparedEffect`]s, typically manifests for
/// outer tooling to apply. At injection time they answer where a secret
/// reference belongs inside a target resource and what payload to put
/// there. Neither job performs I/O.
pub trait Provider: Send + Sync {
    /// Name assigned when the provider was registered with a manager, if
    /// any.
    fn name(&self) -> Option<&str>;

    /// Called by the manager at registration time.
    fn set_name(&mut self, name: &str);

    /// Resource kind this provider injects into, e.g. `Deployment`. Drives
    /// automatic target selection when a plan names no resource id.
    fn target_kind(&self) -> &str;

    /// Field path inside the target resource for the given strategy.
    /// Strategies the provider cannot place return
    /// [`ProviderError::UnsupportedStrategy`].
    fn target_path(&self, strategy: &SecretInjectionStrategy) -> ProviderResult<String>;

    /// Payload to inject at the target path, computed from every injection
    /// that resolved to that path.
    fn injection_payload(&self, injects: &[ProviderInjection]) -> Value;

    /// Whether the provider can place the given strategy.
    fn supports_strategy(&self, strategy: &SecretInjectionStrategy) -> bool {
        self.target_path(strategy).is_ok()
    }

    /// Turn one named secret value into prepared effects.
    fn prepare(&self, name: &str, value: SecretValue) -> ProviderResult<Vec<PreparedEffect>>;

    /// Grouping key for effect merging, e.g. `namespace/name` of the
    /// manifest an effect creates.
    fn effect_identifier(&self, effect: &PreparedEffect) -> String;

    /// Collapse effects that share an identifier into one. The default
    /// merges payloads structurally in first-appearance order.
    fn merge_secrets(&self, effects: Vec<PreparedEffect>) -> Vec<PreparedEffect> {
        merge_prepared_effects(effects, |effect| self.effect_identifier(effect))
    }

    /// Attach a logger. Implementations without diagnostics ignore it.
    fn set_logger(&mut self, _logger: SharedLogger) {}
}
