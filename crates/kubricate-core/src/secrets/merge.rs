//! Deduplication of prepared effects

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::secrets::types::PreparedEffect;
use crate::value::deep_merge;

/// Collapse effects that share an identifier into one effect whose payload
/// is the structural union of the group.
///
/// `identifier` decides which effects describe the same target, e.g.
/// `namespace/name` for Kubernetes manifests. Groups keep the order in
/// which their identifier first appeared, and within a group the first
/// effect's provider name and effect type survive while payloads deep-merge
/// left to right, later values winning on leaf collisions.
///
/// Merging never fails; an unmergeable pairing degrades to the later value
/// replacing the earlier one.
pub fn merge_prepared_effects<F>(effects: Vec<PreparedEffect>, identifier: F) -> Vec<PreparedEffect>
where
    F: Fn(&PreparedEffect) -> String,
{
    let mut groups: IndexMap<String, PreparedEffect> = IndexMap::new();
    for effect in effects {
        match groups.entry(identifier(&effect)) {
            Entry::Occupied(mut merged) => {
                deep_merge(&mut merged.get_mut().value, effect.value);
            }
            Entry::Vacant(slot) => {
                slot.insert(effect);
            }
        }
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::types::EffectType;
    use serde_json::{json, Value};

    fn secret_effect(namespace: &str, name: &str, data: Value) -> PreparedEffect {
        PreparedEffect::kubectl(json!({
            "kind": "Secret",
            "metadata": {"name": name, "namespace": namespace},
            "data": data
        }))
    }

    fn by_namespace_and_name(effect: &PreparedEffect) -> String {
        let metadata = &effect.value["metadata"];
        format!(
            "{}/{}",
            metadata["namespace"].as_str().unwrap_or("default"),
            metadata["name"].as_str().unwrap_or("")
        )
    }

    #[test]
    fn test_effects_with_same_identifier_union_their_data() {
        let effects = vec![
            secret_effect("default", "my-secret", json!({"KEY_A": "xxx"})),
            secret_effect("default", "my-secret", json!({"KEY_B": "yyy"})),
        ];
        let merged = merge_prepared_effects(effects, by_namespace_and_name);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].value["data"],
            json!({"KEY_A": "xxx", "KEY_B": "yyy"})
        );
    }

    #[test]
    fn test_distinct_identifiers_stay_separate() {
        let effects = vec![
            secret_effect("default", "a", json!({"K": "1"})),
            secret_effect("other", "a", json!({"K": "2"})),
            secret_effect("default", "b", json!({"K": "3"})),
        ];
        let merged = merge_prepared_effects(effects, by_namespace_and_name);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let effects = vec![
            secret_effect("default", "b", json!({})),
            secret_effect("default", "a", json!({})),
            secret_effect("default", "b", json!({"late": "1"})),
        ];
        let merged = merge_prepared_effects(effects, by_namespace_and_name);
        let names: Vec<&str> = merged
            .iter()
            .map(|e| e.value["metadata"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_later_value_wins_on_leaf_collision() {
        let effects = vec![
            secret_effect("default", "s", json!({"KEY": "old"})),
            secret_effect("default", "s", json!({"KEY": "new"})),
        ];
        let merged = merge_prepared_effects(effects, by_namespace_and_name);
        assert_eq!(merged[0].value["data"], json!({"KEY": "new"}));
    }

    #[test]
    fn test_first_effect_keeps_its_provider_and_type() {
        let first = secret_effect("default", "s", json!({"A": "1"})).with_provider_name("opaque");
        let mut second = secret_effect("default", "s", json!({"B": "2"}));
        second.effect_type = EffectType::Manual;
        second.provider_name = Some("other".to_string());
        let merged = merge_prepared_effects(vec![first, second], by_namespace_and_name);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].provider_name.as_deref(), Some("opaque"));
        assert_eq!(merged[0].effect_type, EffectType::Kubectl);
    }

    #[test]
    fn test_merge_is_stable_under_regrouping() {
        // merging all at once equals merging one then folding in the rest
        let a = secret_effect("default", "s", json!({"A": "1"}));
        let b = secret_effect("default", "s", json!({"B": "2"}));
        let c = secret_effect("default", "s", json!({"C": "3"}));
        let all_at_once =
            merge_prepared_effects(vec![a.clone(), b.clone(), c.clone()], by_namespace_and_name);
        let first_two = merge_prepared_effects(vec![a, b], by_namespace_and_name);
        let folded = merge_prepared_effects(
            first_two.into_iter().chain([c]).collect(),
            by_namespace_and_name,
        );
        assert_eq!(all_at_once.len(), 1);
        assert_eq!(folded.len(), 1);
        assert_eq!(all_at_once[0].value, folded[0].value);
    }

    #[test]
    fn test_empty_input_merges_to_empty_output() {
        assert!(merge_prepared_effects(Vec::new(), by_namespace_and_name).is_empty());
    }
}
