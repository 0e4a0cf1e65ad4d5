//! Path-addressed access and merging over JSON-shaped values.
//!
//! Field paths use dotted keys with numeric brackets for array positions,
//! e.g. `spec.template.spec.containers[0].env`. The composer resolves every
//! path against plain [`serde_json::Value`] trees; there is no reflection
//! and no schema awareness at this layer.

use serde_json::{Map, Value};

use crate::error::{ComposeError, ComposeResult};

/// One step of a parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key, e.g. `spec` or `template`.
    Key(String),
    /// Array position, e.g. `[0]`.
    Index(usize),
}

/// Parse a dotted/bracketed field path into segments.
///
/// # Example
///
/// ```
/// use kubricate_core::value::{parse_path, PathSegment};
///
/// let segments = parse_path("spec.containers[0].image").unwrap();
/// assert_eq!(segments.len(), 4);
/// assert_eq!(segments[1], PathSegment::Key("containers".to_string()));
/// assert_eq!(segments[2], PathSegment::Index(0));
/// ```
pub fn parse_path(path: &str) -> ComposeResult<Vec<PathSegment>> {
    let invalid = |reason: &str| ComposeError::invalid_path(path, reason);
    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    let mut segments = Vec::new();
    let mut rest = path;
    loop {
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let end = after_bracket
                .find(']')
                .ok_or_else(|| invalid("unterminated index bracket"))?;
            let index: usize = after_bracket[..end]
                .parse()
                .map_err(|_| invalid("index is not an unsigned integer"))?;
            segments.push(PathSegment::Index(index));
            rest = &after_bracket[end + 1..];
        } else {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            if end == 0 {
                return Err(invalid("empty key segment"));
            }
            segments.push(PathSegment::Key(rest[..end].to_string()));
            rest = &rest[end..];
        }
        if rest.is_empty() {
            return Ok(segments);
        }
        if let Some(after_dot) = rest.strip_prefix('.') {
            if after_dot.is_empty() {
                return Err(invalid("trailing dot"));
            }
            if after_dot.starts_with('[') {
                return Err(invalid("index bracket cannot follow a dot"));
            }
            rest = after_dot;
        } else if !rest.starts_with('[') {
            return Err(invalid("expected `.` or `[` between segments"));
        }
    }
}

/// Render parsed segments back into path notation.
pub fn path_to_string(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Resolve a path to a shared reference, or `None` when any step is absent
/// or the tree's shape does not match the segment kind.
pub fn get_path<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match segment {
            PathSegment::Key(key) => current.as_object()?.get(key)?,
            PathSegment::Index(index) => current.as_array()?.get(*index)?,
        };
    }
    Some(current)
}

/// Mutable counterpart of [`get_path`].
pub fn get_path_mut<'a>(root: &'a mut Value, segments: &[PathSegment]) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in segments {
        current = match segment {
            PathSegment::Key(key) => current.as_object_mut()?.get_mut(key)?,
            PathSegment::Index(index) => current.as_array_mut()?.get_mut(*index)?,
        };
    }
    Some(current)
}

/// Set the value at a path, creating missing intermediate containers.
///
/// A missing intermediate becomes an object or an array depending on the
/// next segment, and arrays are padded with `null` up to the written index.
/// Existing intermediates are never coerced: descending through a value
/// that is not a container of the required shape is an error, so a concrete
/// scalar (including an explicit `null`) is never silently destroyed.
/// Padding slots created here are the one exception; they are claimed on
/// descent.
///
/// The final segment replaces whatever is there. Callers that must not
/// overwrite check with [`get_path`] first.
pub fn set_path(root: &mut Value, segments: &[PathSegment], value: Value) -> ComposeResult<()> {
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Err(ComposeError::invalid_path("", "path is empty")),
    };
    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        current = match segment {
            PathSegment::Key(key) => {
                let map = current
                    .as_object_mut()
                    .ok_or_else(|| shape_mismatch(segments, depth, "an object"))?;
                let created = !map.contains_key(key);
                let slot = map
                    .entry(key.clone())
                    .or_insert_with(|| empty_container(&segments[depth + 1]));
                if !created && slot.is_null() {
                    return Err(shape_mismatch(segments, depth + 1, "a container"));
                }
                slot
            }
            PathSegment::Index(index) => {
                let array = current
                    .as_array_mut()
                    .ok_or_else(|| shape_mismatch(segments, depth, "an array"))?;
                let created = array.len() <= *index;
                if created {
                    array.resize(*index + 1, Value::Null);
                }
                let slot = &mut array[*index];
                if slot.is_null() {
                    if !created {
                        return Err(shape_mismatch(segments, depth + 1, "a container"));
                    }
                    *slot = empty_container(&segments[depth + 1]);
                }
                slot
            }
        };
    }
    match last {
        PathSegment::Key(key) => {
            let map = current
                .as_object_mut()
                .ok_or_else(|| shape_mismatch(segments, segments.len() - 1, "an object"))?;
            map.insert(key.clone(), value);
        }
        PathSegment::Index(index) => {
            let array = current
                .as_array_mut()
                .ok_or_else(|| shape_mismatch(segments, segments.len() - 1, "an array"))?;
            if array.len() <= *index {
                array.resize(*index + 1, Value::Null);
            }
            array[*index] = value;
        }
    }
    Ok(())
}

fn empty_container(next: &PathSegment) -> Value {
    match next {
        PathSegment::Key(_) => Value::Object(Map::new()),
        PathSegment::Index(_) => Value::Array(Vec::new()),
    }
}

fn shape_mismatch(segments: &[PathSegment], depth: usize, expected: &str) -> ComposeError {
    let prefix = path_to_string(&segments[..depth]);
    let location = if prefix.is_empty() {
        "the root value".to_string()
    } else {
        format!("value at `{prefix}`")
    };
    ComposeError::invalid_path(
        path_to_string(segments),
        format!("{location} is not {expected}"),
    )
}

/// Recursively merge `patch` into `base` with `patch` taking precedence.
///
/// Objects merge key by key, keeping `base` insertion order and appending
/// keys only `patch` has. Any other pairing, arrays included, replaces the
/// base value wholesale. Array concatenation is an injection-time rule and
/// does not apply here.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use kubricate_core::value::deep_merge;
///
/// let mut base = json!({"metadata": {"name": "db", "labels": {"a": "1"}}});
/// deep_merge(&mut base, json!({"metadata": {"labels": {"b": "2"}}}));
/// assert_eq!(
///     base,
///     json!({"metadata": {"name": "db", "labels": {"a": "1", "b": "2"}}})
/// );
/// ```
pub fn deep_merge(base: &mut Value, patch: Value) {
    if let Value::Object(patch_map) = patch {
        if let Value::Object(base_map) = base {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, patch_value),
                    None => {
                        base_map.insert(key, patch_value);
                    }
                }
            }
            return;
        }
        *base = Value::Object(patch_map);
        return;
    }
    *base = patch;
}
