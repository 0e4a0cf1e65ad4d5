//! Registered entry types

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ComposeResult;

/// How an entry is materialized when the composer builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Config is merged, labeled, then handed to a constructor.
    Class,
    /// Config is merged and labeled, then emitted as-is.
    Object,
    /// A finished resource; emitted verbatim, closed to injection.
    Instance,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Object => "object",
            Self::Instance => "instance",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factory that turns a merged config into the final resource on each build.
///
/// Constructors run late, after label stamping and override merging, so the
/// same registration can be rebuilt with different overrides.
pub type ResourceConstructor = Box<dyn Fn(Value) -> ComposeResult<Value> + Send + Sync>;

/// One registered resource fragment.
pub struct ResourceEntry {
    pub kind: EntryKind,
    pub config: Value,
    pub constructor: Option<ResourceConstructor>,
}

impl fmt::Debug for ResourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceEntry")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .field("constructor", &self.constructor.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Build a constructor that round-trips the merged config through `T`.
///
/// Deserializing into `T` validates the shape and fills serde defaults;
/// serializing back yields the resource the build emits. This is the usual
/// way to register a class entry against a typed resource model.
pub fn typed_constructor<T>() -> ResourceConstructor
where
    T: DeserializeOwned + Serialize,
{
    Box::new(|config| {
        let typed: T = serde_json::from_value(config)?;
        Ok(serde_json::to_value(typed)?)
    })
}
