//! # Kubricate Core
//!
//! Composition engine for Kubernetes-style manifests. Resource fragments
//! register under stable ids and build into manifests in registration
//! order; later phases inject values at field paths inside them with
//! type-aware merging. A secret orchestration layer wires declared secrets
//! through pluggable connectors and providers. The core never talks to a
//! cluster; it produces manifests and prepared effects for outer tooling
//! to apply.
//!
//! ## Modules
//!
//! - [`composer`]: entry registry, value injection, build pipeline
//! - [`stack`]: a composer plus secret managers and injection plans
//! - [`secrets`]: connectors, providers, the secret manager, effect merging
//! - [`config`]: file-backed project configuration
//! - [`logging`]: optional, outcome-neutral diagnostics
//! - [`value`]: field path parsing and deep-merge primitives
//!
//! ## Example
//!
//! ```
//! use kubricate_core::{ResourceComposer, Stack};
//! use kubricate_core::secrets::{InMemoryConnector, MockProvider, SecretManager};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let composer = ResourceComposer::new().add_object(
//!     "app",
//!     json!({
//!         "apiVersion": "apps/v1",
//!         "kind": "Deployment",
//!         "metadata": {"name": "app"},
//!         "spec": {"template": {"spec": {"containers": [{"name": "main"}]}}}
//!     }),
//! )?;
//!
//! let manager = SecretManager::new()
//!     .add_connector(
//!         "memory",
//!         Box::new(InMemoryConnector::new().with_secret("APP_KEY", "s3cret")),
//!     )?
//!     .add_provider("mock", Box::new(MockProvider::new("app-secrets")))?
//!     .add_secret("APP_KEY")?;
//!
//! let mut stack = Stack::from_composer("demo", composer);
//! stack.use_secrets(manager, |ctx| {
//!     ctx.secrets("APP_KEY");
//! })?;
//! stack.inject_secrets()?;
//!
//! let manifests = stack.build()?;
//! assert_eq!(
//!     manifests[0]["metadata"]["labels"]["thaitype.dev/managed-by"],
//!     "kubricate"
//! );
//! assert_eq!(
//!     manifests[0]["spec"]["template"]["spec"]["containers"][0]["env"][0]["name"],
//!     "APP_KEY"
//! );
//! # Ok(())
//! # }
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod logging;
pub mod secrets;
pub mod stack;
pub mod value;

pub use composer::{
    typed_constructor, ComposerOptions, EntryKind, ResourceComposer, ResourceConstructor,
    ResourceEntry, LABEL_MANAGED_BY_KEY, LABEL_MANAGED_BY_VALUE,
};
pub use config::{
    ConfigError, ConfigLevel, ConfigResult, FileConfigProvider, KubricateConfig, SecretsDefaults,
};
pub use error::{ComposeError, ComposeResult};
pub use logging::{BoxedLogger, ConsoleLogger, LogLevel, Logger, NoOpLogger, SharedLogger};
pub use secrets::{
    merge_prepared_effects, Connector, ConnectorError, ConnectorResult, EffectType, EnvConnector,
    InMemoryConnector, InjectionMeta, MockProvider, PreparedEffect, Provider, ProviderError,
    ProviderInjection, ProviderResult, SecretInjectionStrategy, SecretManager, SecretManagerError,
    SecretManagerResult, SecretOptions, SecretValue,
};
pub use stack::{
    SecretInjection, SecretInjectionBuilder, SecretsInjectionContext, Stack, StackError,
    StackResult, DEFAULT_SECRET_MANAGER_ID,
};
