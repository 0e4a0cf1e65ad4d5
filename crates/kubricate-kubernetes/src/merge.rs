//! Kubernetes-aware effect merging

use kubricate_core::secrets::{merge_prepared_effects, PreparedEffect};
use serde_json::Value;

/// Group key for Kubernetes manifest effects: `namespace/name`, with the
/// namespace defaulting to `default` when the manifest omits it.
pub fn kubernetes_effect_identifier(effect: &PreparedEffect) -> String {
    let metadata = effect.value.get("metadata");
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str)
        .unwrap_or("default");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    format!("{namespace}/{name}")
}

/// Merge effects that target the same Kubernetes object into one manifest,
/// unioning their payloads.
pub fn merge_kubernetes_effects(effects: Vec<PreparedEffect>) -> Vec<PreparedEffect> {
    merge_prepared_effects(effects, kubernetes_effect_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn secret(namespace: Option<&str>, name: &str, data: Value) -> PreparedEffect {
        let mut metadata = json!({"name": name});
        if let Some(namespace) = namespace {
            metadata["namespace"] = json!(namespace);
        }
        PreparedEffect::kubectl(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": metadata,
            "data": data
        }))
    }

    #[test]
    fn test_same_object_effects_merge_into_one_manifest() {
        let merged = merge_kubernetes_effects(vec![
            secret(Some("default"), "my-secret", json!({"KEY_A": "eHh4"})),
            secret(Some("default"), "my-secret", json!({"KEY_B": "eXl5"})),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].value["data"],
            json!({"KEY_A": "eHh4", "KEY_B": "eXl5"})
        );
    }

    #[test]
    fn test_missing_namespace_defaults_when_grouping() {
        let effect = secret(None, "my-secret", json!({}));
        assert_eq!(kubernetes_effect_identifier(&effect), "default/my-secret");
        let merged = merge_kubernetes_effects(vec![
            secret(None, "my-secret", json!({"A": "MQ=="})),
            secret(Some("default"), "my-secret", json!({"B": "Mg=="})),
        ]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_different_namespaces_stay_separate() {
        let merged = merge_kubernetes_effects(vec![
            secret(Some("default"), "my-secret", json!({"A": "MQ=="})),
            secret(Some("staging"), "my-secret", json!({"A": "Mg=="})),
        ]);
        assert_eq!(merged.len(), 2);
    }
}
