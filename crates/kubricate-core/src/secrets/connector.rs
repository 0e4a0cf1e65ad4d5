//! Connector trait: named sources of secret values

use thiserror::Error;

use crate::logging::SharedLogger;
use crate::secrets::types::SecretValue;

/// Errors raised by secret connectors.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// The source has no value under this name.
    #[error("secret `{name}` was not found: {reason}")]
    NotFound { name: String, reason: String },

    /// `get` was called for a name that was never loaded.
    #[error("secret `{name}` has not been loaded; call load() first")]
    NotLoaded { name: String },

    /// The source itself failed.
    #[error("connector `{connector}` failed to load secrets: {reason}")]
    LoadFailed { connector: String, reason: String },
}

impl ConnectorError {
    pub fn not_found(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn not_loaded(name: impl Into<String>) -> Self {
        Self::NotLoaded { name: name.into() }
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// A named source that loads and exposes secret values.
///
/// `load` is the validation point: it must fail if any requested name is
/// missing, so orchestration surfaces configuration problems before any
/// effect is prepared. `get` only hands out values a prior `load` fetched.
pub trait Connector: Send + Sync {
    /// Short source name used in diagnostics, e.g. `env`.
    fn name(&self) -> &str;

    /// Fetch and cache the given secret names, failing on the first one the
    /// source cannot supply.
    fn load(&mut self, names: &[String]) -> ConnectorResult<()>;

    /// Read a previously loaded secret value.
    fn get(&self, name: &str) -> ConnectorResult<SecretValue>;

    /// Attach a logger. Implementations without diagnostics ignore it.
    fn set_logger(&mut self, _logger: SharedLogger) {}
}
