//! Resource composition engine.
//!
//! A [`ResourceComposer`] accumulates resource fragments under caller-chosen
//! ids and materializes the final manifest set on demand; later phases can
//! inject values at field paths inside any registered fragment. Build order
//! is always registration order, and building never consumes the composer,
//! so the same registrations can be built repeatedly with different
//! overrides.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ComposeError, ComposeResult};
use crate::logging::SharedLogger;
use crate::value::{deep_merge, get_path_mut, parse_path, set_path};

mod entry;

pub use entry::{typed_constructor, EntryKind, ResourceConstructor, ResourceEntry};

/// Label key stamped into every managed resource.
pub const LABEL_MANAGED_BY_KEY: &str = "thaitype.dev/managed-by";

/// Label value identifying this engine as the manager.
pub const LABEL_MANAGED_BY_VALUE: &str = "kubricate";

/// Tunable composer behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerOptions {
    /// Reject re-registration of an id instead of replacing the entry.
    pub strict_ids: bool,
    /// Silently skip class entries without a constructor at build time
    /// instead of failing. Kept for callers migrating from older releases.
    pub legacy_skip_missing_constructor: bool,
}

impl ComposerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_ids(mut self, enabled: bool) -> Self {
        self.strict_ids = enabled;
        self
    }

    pub fn with_legacy_skip_missing_constructor(mut self, enabled: bool) -> Self {
        self.legacy_skip_missing_constructor = enabled;
        self
    }
}

/// Orchestrates resource registration, injection, override merging, and
/// final assembly of the manifest set.
#[derive(Default)]
pub struct ResourceComposer {
    entries: IndexMap<String, ResourceEntry>,
    overrides: Map<String, Value>,
    options: ComposerOptions,
    logger: Option<SharedLogger>,
}

impl ResourceComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ComposerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ComposerOptions {
        &self.options
    }

    /// Attach a logger. Purely informational; never changes build output.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = Some(logger);
    }

    /// Register a class entry: `config` is validated and completed by
    /// `constructor` on every build, after overrides are merged in.
    pub fn add_class<T: Serialize>(
        self,
        id: impl Into<String>,
        config: T,
        constructor: ResourceConstructor,
    ) -> ComposeResult<Self> {
        let config = serde_json::to_value(config)?;
        self.register(
            id.into(),
            ResourceEntry {
                kind: EntryKind::Class,
                config,
                constructor: Some(constructor),
            },
        )
    }

    /// Register a plain object entry emitted as-is after labeling and
    /// override merging.
    pub fn add_object<T: Serialize>(self, id: impl Into<String>, config: T) -> ComposeResult<Self> {
        let config = serde_json::to_value(config)?;
        self.register(
            id.into(),
            ResourceEntry {
                kind: EntryKind::Object,
                config,
                constructor: None,
            },
        )
    }

    /// Register a finished resource. Instances pass through the build
    /// untouched: no label, no overrides, and injection into them is an
    /// error.
    pub fn add_instance<T: Serialize>(
        self,
        id: impl Into<String>,
        config: T,
    ) -> ComposeResult<Self> {
        let config = serde_json::to_value(config)?;
        self.register(
            id.into(),
            ResourceEntry {
                kind: EntryKind::Instance,
                config,
                constructor: None,
            },
        )
    }

    /// Register an entry with an explicit kind tag. The `add_class`,
    /// `add_object`, and `add_instance` variants all funnel through the
    /// same registration; constructors are only consulted for class
    /// entries.
    pub fn add_entry<T: Serialize>(
        self,
        id: impl Into<String>,
        kind: EntryKind,
        config: T,
        constructor: Option<ResourceConstructor>,
    ) -> ComposeResult<Self> {
        let config = serde_json::to_value(config)?;
        self.register(
            id.into(),
            ResourceEntry {
                kind,
                config,
                constructor,
            },
        )
    }

    fn register(mut self, id: String, entry: ResourceEntry) -> ComposeResult<Self> {
        if !entry.config.is_object() {
            return Err(ComposeError::invalid_config(
                id,
                format!(
                    "expected a JSON object, got {}",
                    value_kind_name(&entry.config)
                ),
            ));
        }
        if self.options.strict_ids && self.entries.contains_key(&id) {
            return Err(ComposeError::DuplicateId { id });
        }
        // Replacement keeps the entry's original position in build order.
        self.entries.insert(id, entry);
        Ok(self)
    }

    /// Replace the override set wholesale. Overrides are keyed by entry id
    /// and deep-merged over the labeled config at build time, with the
    /// override side winning. Ids without a matching entry are ignored.
    pub fn override_with<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.overrides = overrides.into_iter().collect();
    }

    /// Merge `value` into the entry's config at `path`.
    ///
    /// An absent path is set, creating intermediate containers. Array meets
    /// array concatenates, object meets object deep-merges with the new
    /// value winning on collisions. Every other pairing is a conflict,
    /// detected before anything is written. An explicit `null` counts as a
    /// concrete value and therefore conflicts.
    pub fn inject(&mut self, id: &str, path: &str, value: Value) -> ComposeResult<()> {
        let segments = parse_path(path)?;
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ComposeError::entry_not_found(id))?;
        if entry.kind == EntryKind::Instance {
            return Err(ComposeError::UnsupportedEntryKind {
                id: id.to_string(),
                kind: entry.kind,
            });
        }
        match get_path_mut(&mut entry.config, &segments) {
            Some(existing) => match (existing, value) {
                (Value::Array(current), Value::Array(new_items)) => current.extend(new_items),
                (existing @ Value::Object(_), patch @ Value::Object(_)) => {
                    deep_merge(existing, patch)
                }
                (existing, attempted) => {
                    return Err(ComposeError::InjectionConflict {
                        id: id.to_string(),
                        path: path.to_string(),
                        existing: existing.clone(),
                        attempted,
                    })
                }
            },
            None => set_path(&mut entry.config, &segments, value)?,
        }
        if let Some(logger) = &self.logger {
            logger.debug(&format!("injected value at `{path}` into resource `{id}`"));
        }
        Ok(())
    }

    /// Apply a batch of injections as a unit.
    ///
    /// Entry configs touched by earlier items are restored when a later
    /// item fails, so an error leaves the composer exactly as it was and
    /// the whole batch can be retried.
    pub fn inject_all<I>(&mut self, batch: I) -> ComposeResult<()>
    where
        I: IntoIterator<Item = (String, String, Value)>,
    {
        let mut snapshots: IndexMap<String, Value> = IndexMap::new();
        for (id, path, value) in batch {
            if !snapshots.contains_key(&id) {
                if let Some(entry) = self.entries.get(&id) {
                    snapshots.insert(id.clone(), entry.config.clone());
                }
            }
            if let Err(err) = self.inject(&id, &path, value) {
                for (id, config) in snapshots {
                    if let Some(entry) = self.entries.get_mut(&id) {
                        entry.config = config;
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Materialize the manifest set in registration order.
    pub fn build(&self) -> ComposeResult<Vec<Value>> {
        let resources = self.materialize()?;
        if let Some(logger) = &self.logger {
            logger.debug(&format!(
                "built {} resources from {} entries",
                resources.len(),
                self.entries.len()
            ));
        }
        Ok(resources.into_iter().map(|(_, resource)| resource).collect())
    }

    /// Ids of entries whose built resource declares the given `kind` field.
    ///
    /// The index is computed fresh from the current build output on every
    /// call; resources without a `kind` field never match.
    pub fn find_resource_ids_by_kind(&self, kind: &str) -> ComposeResult<Vec<String>> {
        Ok(self
            .materialize()?
            .into_iter()
            .filter(|(_, resource)| resource.get("kind").and_then(Value::as_str) == Some(kind))
            .map(|(id, _)| id)
            .collect())
    }

    fn materialize(&self) -> ComposeResult<Vec<(String, Value)>> {
        let mut resources = Vec::with_capacity(self.entries.len());
        for (id, entry) in &self.entries {
            if entry.kind == EntryKind::Instance {
                resources.push((id.clone(), entry.config.clone()));
                continue;
            }
            let mut resource = entry.config.clone();
            stamp_managed_by_label(&mut resource);
            if let Some(patch) = self.overrides.get(id) {
                deep_merge(&mut resource, patch.clone());
            }
            if entry.kind == EntryKind::Class {
                match &entry.constructor {
                    Some(constructor) => {
                        resource = constructor(resource).map_err(|source| {
                            ComposeError::ConstructorFailed {
                                id: id.clone(),
                                reason: source.to_string(),
                            }
                        })?;
                    }
                    None if self.options.legacy_skip_missing_constructor => {
                        if let Some(logger) = &self.logger {
                            logger.warn(&format!(
                                "skipping class resource `{id}` with no constructor"
                            ));
                        }
                        continue;
                    }
                    None => return Err(ComposeError::MissingConstructor { id: id.clone() }),
                }
            }
            resources.push((id.clone(), resource));
        }
        Ok(resources)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn entry(&self, id: &str) -> Option<&ResourceEntry> {
        self.entries.get(id)
    }

    /// Registered ids in registration order.
    pub fn entry_ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ResourceComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceComposer")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}

/// Ensure `metadata.labels` exists and carries the management label.
/// Non-object `metadata` or `labels` values cannot hold the label and are
/// replaced; the label itself overwrites any value the config put under the
/// same key.
fn stamp_managed_by_label(resource: &mut Value) {
    if let Some(root) = resource.as_object_mut() {
        let metadata = root
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Some(metadata_map) = metadata.as_object_mut() {
            let labels = metadata_map
                .entry("labels")
                .or_insert_with(|| Value::Object(Map::new()));
            if !labels.is_object() {
                *labels = Value::Object(Map::new());
            }
            if let Some(label_map) = labels.as_object_mut() {
                label_map.insert(
                    LABEL_MANAGED_BY_KEY.to_string(),
                    Value::String(LABEL_MANAGED_BY_VALUE.to_string()),
                );
            }
        }
    }
}

fn value_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
