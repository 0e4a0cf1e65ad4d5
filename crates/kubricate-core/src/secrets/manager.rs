//! Secret manager: declared secrets wired to connectors and providers

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::config::SecretsDefaults;
use crate::logging::SharedLogger;
use crate::secrets::connector::{Connector, ConnectorError};
use crate::secrets::provider::{Provider, ProviderError};
use crate::secrets::types::{PreparedEffect, SecretOptions};

/// Errors raised by the secret manager.
#[derive(Error, Debug)]
pub enum SecretManagerError {
    #[error("secret `{name}` is already registered")]
    DuplicateSecret { name: String },

    #[error("connector `{id}` is already registered")]
    DuplicateConnector { id: String },

    #[error("provider `{id}` is already registered")]
    DuplicateProvider { id: String },

    #[error("connector `{id}` is not registered")]
    UnknownConnector { id: String },

    #[error("provider `{id}` is not registered")]
    UnknownProvider { id: String },

    #[error("no connector is registered")]
    NoConnector,

    #[error("no provider is registered")]
    NoProvider,

    #[error("multiple connectors are registered; set a default or name one per secret")]
    AmbiguousConnector,

    #[error("multiple providers are registered; set a default or name one per secret")]
    AmbiguousProvider,

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type SecretManagerResult<T> = Result<T, SecretManagerError>;

/// Registry of declared secrets plus the connectors that load them and the
/// providers that deliver them.
///
/// Secrets, connectors, and providers all keep registration order. When
/// exactly one connector or provider is registered it acts as the implicit
/// default; with several registered, resolution requires either an explicit
/// reference on the secret or a configured default.
#[derive(Default)]
pub struct SecretManager {
    secrets: IndexMap<String, SecretOptions>,
    connectors: IndexMap<String, Box<dyn Connector>>,
    providers: IndexMap<String, Box<dyn Provider>>,
    default_connector: Option<String>,
    default_provider: Option<String>,
    logger: Option<SharedLogger>,
}

impl SecretManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a managed secret. Accepts a bare name or full
    /// [`SecretOptions`].
    pub fn add_secret(mut self, options: impl Into<SecretOptions>) -> SecretManagerResult<Self> {
        let options = options.into();
        if self.secrets.contains_key(&options.name) {
            return Err(SecretManagerError::DuplicateSecret { name: options.name });
        }
        self.secrets.insert(options.name.clone(), options);
        Ok(self)
    }

    pub fn add_connector(
        mut self,
        id: impl Into<String>,
        mut connector: Box<dyn Connector>,
    ) -> SecretManagerResult<Self> {
        let id = id.into();
        if self.connectors.contains_key(&id) {
            return Err(SecretManagerError::DuplicateConnector { id });
        }
        if let Some(logger) = &self.logger {
            connector.set_logger(Arc::clone(logger));
        }
        self.connectors.insert(id, connector);
        Ok(self)
    }

    /// Register a provider under `id`. The id becomes the provider's
    /// assigned name.
    pub fn add_provider(
        mut self,
        id: impl Into<String>,
        mut provider: Box<dyn Provider>,
    ) -> SecretManagerResult<Self> {
        let id = id.into();
        if self.providers.contains_key(&id) {
            return Err(SecretManagerError::DuplicateProvider { id });
        }
        provider.set_name(&id);
        if let Some(logger) = &self.logger {
            provider.set_logger(Arc::clone(logger));
        }
        self.providers.insert(id, provider);
        Ok(self)
    }

    pub fn set_default_connector(mut self, id: impl Into<String>) -> SecretManagerResult<Self> {
        let id = id.into();
        if !self.connectors.contains_key(&id) {
            return Err(SecretManagerError::UnknownConnector { id });
        }
        self.default_connector = Some(id);
        Ok(self)
    }

    pub fn set_default_provider(mut self, id: impl Into<String>) -> SecretManagerResult<Self> {
        let id = id.into();
        if !self.providers.contains_key(&id) {
            return Err(SecretManagerError::UnknownProvider { id });
        }
        self.default_provider = Some(id);
        Ok(self)
    }

    /// Apply defaults from loaded configuration. Unset fields are left
    /// alone.
    pub fn with_defaults(mut self, defaults: &SecretsDefaults) -> SecretManagerResult<Self> {
        if let Some(connector) = &defaults.connector {
            self = self.set_default_connector(connector.clone())?;
        }
        if let Some(provider) = &defaults.provider {
            self = self.set_default_provider(provider.clone())?;
        }
        Ok(self)
    }

    /// Attach a logger and propagate it to every registered connector and
    /// provider.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        for connector in self.connectors.values_mut() {
            connector.set_logger(Arc::clone(&logger));
        }
        for provider in self.providers.values_mut() {
            provider.set_logger(Arc::clone(&logger));
        }
        self.logger = Some(logger);
    }

    /// Declared secret names in registration order.
    pub fn secret_names(&self) -> Vec<&str> {
        self.secrets.keys().map(String::as_str).collect()
    }

    pub fn has_secret(&self, name: &str) -> bool {
        self.secrets.contains_key(name)
    }

    /// Resolve a provider reference to its id and instance, falling back
    /// to the default or the single registered provider.
    pub fn resolve_provider(
        &self,
        explicit: Option<&str>,
    ) -> SecretManagerResult<(String, &dyn Provider)> {
        let id = self.resolve_provider_id(explicit)?;
        let provider = self
            .providers
            .get(&id)
            .ok_or_else(|| SecretManagerError::UnknownProvider { id: id.clone() })?;
        Ok((id, provider.as_ref()))
    }

    fn resolve_connector_id(&self, explicit: Option<&str>) -> SecretManagerResult<String> {
        if let Some(id) = explicit {
            if !self.connectors.contains_key(id) {
                return Err(SecretManagerError::UnknownConnector { id: id.to_string() });
            }
            return Ok(id.to_string());
        }
        if let Some(id) = &self.default_connector {
            return Ok(id.clone());
        }
        let mut ids = self.connectors.keys();
        match (ids.next(), ids.next()) {
            (Some(only), None) => Ok(only.clone()),
            (None, _) => Err(SecretManagerError::NoConnector),
            (Some(_), Some(_)) => Err(SecretManagerError::AmbiguousConnector),
        }
    }

    fn resolve_provider_id(&self, explicit: Option<&str>) -> SecretManagerResult<String> {
        if let Some(id) = explicit {
            if !self.providers.contains_key(id) {
                return Err(SecretManagerError::UnknownProvider { id: id.to_string() });
            }
            return Ok(id.to_string());
        }
        if let Some(id) = &self.default_provider {
            return Ok(id.clone());
        }
        let mut ids = self.providers.keys();
        match (ids.next(), ids.next()) {
            (Some(only), None) => Ok(only.clone()),
            (None, _) => Err(SecretManagerError::NoProvider),
            (Some(_), Some(_)) => Err(SecretManagerError::AmbiguousProvider),
        }
    }

    /// Load every declared secret through its resolved connector. Fails on
    /// the first secret no source can supply.
    pub fn load_secrets(&mut self) -> SecretManagerResult<()> {
        let mut plan: IndexMap<String, Vec<String>> = IndexMap::new();
        for options in self.secrets.values() {
            let connector_id = self.resolve_connector_id(options.connector.as_deref())?;
            plan.entry(connector_id).or_default().push(options.name.clone());
        }
        for (connector_id, names) in plan {
            let connector = self
                .connectors
                .get_mut(&connector_id)
                .ok_or_else(|| SecretManagerError::UnknownConnector {
                    id: connector_id.clone(),
                })?;
            connector.load(&names)?;
            if let Some(logger) = &self.logger {
                logger.debug(&format!(
                    "loaded {} secrets via connector `{connector_id}`",
                    names.len()
                ));
            }
        }
        Ok(())
    }

    /// Load secrets, prepare effects through each secret's provider, and
    /// merge per provider.
    ///
    /// Effects come out grouped by provider in provider first-use order,
    /// with each provider's own `merge_secrets` applied to its group.
    pub fn prepare_effects(&mut self) -> SecretManagerResult<Vec<PreparedEffect>> {
        self.load_secrets()?;
        let mut grouped: IndexMap<String, Vec<PreparedEffect>> = IndexMap::new();
        for options in self.secrets.values() {
            let connector_id = self.resolve_connector_id(options.connector.as_deref())?;
            let connector = self
                .connectors
                .get(&connector_id)
                .ok_or_else(|| SecretManagerError::UnknownConnector {
                    id: connector_id.clone(),
                })?;
            let value = connector.get(&options.name)?;
            let provider_id = self.resolve_provider_id(options.provider.as_deref())?;
            let provider = self
                .providers
                .get(&provider_id)
                .ok_or_else(|| SecretManagerError::UnknownProvider {
                    id: provider_id.clone(),
                })?;
            let effects = provider.prepare(&options.name, value)?;
            grouped.entry(provider_id).or_default().extend(effects);
        }
        let mut merged = Vec::new();
        for (provider_id, effects) in grouped {
            let provider = self
                .providers
                .get(&provider_id)
                .ok_or_else(|| SecretManagerError::UnknownProvider {
                    id: provider_id.clone(),
                })?;
            merged.extend(provider.merge_secrets(effects));
        }
        if let Some(logger) = &self.logger {
            logger.info(&format!(
                "prepared {} effects from {} secrets",
                merged.len(),
                self.secrets.len()
            ));
        }
        Ok(merged)
    }
}

impl fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManager")
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .field("connectors", &self.connectors.keys().collect::<Vec<_>>())
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("default_connector", &self.default_connector)
            .field("default_provider", &self.default_provider)
            .finish()
    }
}
