//! Secret orchestration.
//!
//! Connectors load named secret values from a source. Providers turn loaded
//! values into applyable effects and injection payloads. The
//! [`SecretManager`] wires declared secrets to both. The manager never talks
//! to a cluster; its output is a plan of [`PreparedEffect`]s for outer
//! tooling to apply.

mod connector;
mod env_connector;
mod manager;
mod memory_connector;
mod merge;
mod mock_provider;
mod provider;
mod types;

pub use connector::{Connector, ConnectorError, ConnectorResult};
pub use env_connector::EnvConnector;
pub use manager::{SecretManager, SecretManagerError, SecretManagerResult};
pub use memory_connector::InMemoryConnector;
pub use merge::merge_prepared_effects;
pub use mock_provider::MockProvider;
pub use provider::{Provider, ProviderError, ProviderResult};
pub use types::{
    EffectType, InjectionMeta, PreparedEffect, ProviderInjection, SecretInjectionStrategy,
    SecretOptions, SecretValue,
};
