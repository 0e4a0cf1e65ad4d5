//! Composition error types

use serde_json::Value;
use thiserror::Error;

use crate::composer::EntryKind;

/// Errors raised by the resource composer and value injector.
///
/// Every error is raised synchronously at the call that caused it; a failed
/// `inject` or `build` never leaves an entry half-merged.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// The injection target id is not registered.
    #[error("resource with id `{id}` not found")]
    EntryNotFound { id: String },

    /// Injection was attempted against an opaque entry kind.
    #[error("resource `{id}` has kind `{kind}` and cannot be injected into")]
    UnsupportedEntryKind { id: String, kind: EntryKind },

    /// The path already holds a value the new one cannot merge with.
    ///
    /// Both sides are carried so a caller can decide whether to change the
    /// injection path or the source data. The injector never overwrites a
    /// concrete scalar and never guesses intent.
    #[error("conflicting values at `{path}` on resource `{id}`: existing {existing}, attempted {attempted}")]
    InjectionConflict {
        id: String,
        path: String,
        existing: Value,
        attempted: Value,
    },

    /// A class entry reached build time without a constructor.
    #[error("class resource `{id}` has no constructor")]
    MissingConstructor { id: String },

    /// Strict mode only: the id was already registered.
    #[error("resource with id `{id}` is already registered")]
    DuplicateId { id: String },

    /// An entry's config is not a JSON object.
    #[error("invalid config for resource `{id}`: {reason}")]
    InvalidConfig { id: String, reason: String },

    /// A field path could not be parsed or does not fit the config's shape.
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A class entry's constructor rejected the merged config.
    #[error("constructor for resource `{id}` failed: {reason}")]
    ConstructorFailed { id: String, reason: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ComposeError {
    /// Create an entry-not-found error
    pub fn entry_not_found(id: impl Into<String>) -> Self {
        Self::EntryNotFound { id: id.into() }
    }

    /// Create an invalid-path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-config error
    pub fn invalid_config(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub type ComposeResult<T> = Result<T, ComposeError>;
