//! Schema canonicalization: `$ref` expansion and `allOf` merging.
//!
//! The output tree contains no `$ref` and no `allOf` node anywhere; the
//! generator layer never has to think about either. Reference substitution
//! deep-copies the target subtree — two refs to one target become two
//! independent fragments that still collapse to a single emitted declaration
//! through the type cache when they share an `$id`.

use serde_json::{Map, Value};

use crate::error::CompileError;

/// Resolve one schema document to canonical form.
///
/// The top-level `$id` is mandatory; everything downstream (root type name,
/// parse entry point) derives from it.
pub fn resolve_document(schema: Value) -> Result<Value, CompileError> {
    let has_id = schema
        .as_object()
        .is_some_and(|map| map.contains_key("$id"));
    if !has_id {
        return Err(CompileError::MissingId);
    }
    let resolved = resolve_refs(&schema, &schema, &mut Vec::new())?;
    merge_all_of(resolved)
}

/// Walk `node`, replacing every `{"$ref": "#/..."}` mapping with a resolved
/// copy of its target. The ref chain is tracked so a cyclic schema dies with
/// a configuration error instead of blowing the stack.
fn resolve_refs(
    full: &Value,
    node: &Value,
    chain: &mut Vec<String>,
) -> Result<Value, CompileError> {
    match node {
        Value::Object(map) if map.contains_key("$ref") => {
            let reference = match &map["$ref"] {
                Value::String(s) => s.clone(),
                other => {
                    return Err(CompileError::ExternalReference {
                        reference: other.to_string(),
                    });
                }
            };
            if map.len() > 1 {
                return Err(CompileError::ReferenceWithSiblings { reference });
            }
            if chain.iter().any(|seen| *seen == reference) {
                chain.push(reference);
                return Err(CompileError::CyclicReference {
                    chain: chain.join(" -> "),
                });
            }
            let target = lookup_reference(full, &reference)?;
            chain.push(reference);
            let resolved = resolve_refs(full, target, chain);
            chain.pop();
            resolved
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                out.insert(key.clone(), resolve_refs(full, value, chain)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let resolved: Result<Vec<_>, _> = items
                .iter()
                .map(|item| resolve_refs(full, item, chain))
                .collect();
            Ok(Value::Array(resolved?))
        }
        scalar => Ok(scalar.clone()),
    }
}

/// Only in-document, path-style references (`#/a/b/c`) are supported.
fn lookup_reference<'a>(full: &'a Value, reference: &str) -> Result<&'a Value, CompileError> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(CompileError::ExternalReference {
            reference: reference.to_string(),
        });
    };
    if !fragment.starts_with('/') {
        return Err(CompileError::IdReference {
            reference: reference.to_string(),
        });
    }
    full.pointer(fragment)
        .ok_or_else(|| CompileError::DanglingReference {
            reference: reference.to_string(),
        })
}

/// Merge every `allOf` list into its enclosing schema object, bottom-up.
/// Arrays are traversed too, so the no-`allOf`-left invariant holds for the
/// entire tree.
fn merge_all_of(node: Value) -> Result<Value, CompileError> {
    match node {
        Value::Object(map) => {
            let mut result = Map::new();
            let mut all_of = None;
            for (key, value) in map {
                if key == "allOf" {
                    all_of = Some(value);
                } else {
                    result.insert(key, merge_all_of(value)?);
                }
            }
            let mut merged = Value::Object(result);
            match all_of {
                None => {}
                Some(Value::Array(parts)) => {
                    for part in parts {
                        let part = merge_all_of(part)?;
                        merged = merge_pair(merged, part)?;
                    }
                }
                Some(other) => {
                    return Err(CompileError::AllOfNotAList {
                        found: other.to_string(),
                    });
                }
            }
            Ok(merged)
        }
        Value::Array(items) => {
            let merged: Result<Vec<_>, _> = items.into_iter().map(merge_all_of).collect();
            Ok(Value::Array(merged?))
        }
        scalar => Ok(scalar),
    }
}

/// Merge rule for one field present in both operands: map+map recurses,
/// list+list is an order-preserving duplicate-free union (left first),
/// scalars must be equal, anything else is a type mismatch.
fn merge_pair(left: Value, right: Value) -> Result<Value, CompileError> {
    match (left, right) {
        (Value::Object(mut left), Value::Object(right)) => {
            for (key, value) in right {
                // Re-inserting an existing key keeps its position, so merged
                // fields stay where the left operand declared them.
                match left.get(&key).cloned() {
                    Some(existing) => {
                        left.insert(key, merge_pair(existing, value)?);
                    }
                    None => {
                        left.insert(key, value);
                    }
                }
            }
            Ok(Value::Object(left))
        }
        (Value::Array(mut left), Value::Array(right)) => {
            for item in right {
                if !left.contains(&item) {
                    left.push(item);
                }
            }
            Ok(Value::Array(left))
        }
        (left, right) => {
            if json_kind(&left) != json_kind(&right) {
                return Err(CompileError::MergeTypeMismatch {
                    left: left.to_string(),
                    right: right.to_string(),
                });
            }
            if left == right {
                Ok(left)
            } else {
                Err(CompileError::MergeConflict {
                    left: left.to_string(),
                    right: right.to_string(),
                })
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_top_level_id_is_rejected() {
        let err = resolve_document(json!({"type": "object"})).unwrap_err();
        assert!(matches!(err, CompileError::MissingId));
    }

    #[test]
    fn path_refs_are_substituted() {
        let schema = json!({
            "$id": "#root",
            "type": "object",
            "properties": {
                "num": {"$ref": "#/definitions/num"}
            },
            "definitions": {
                "num": {"type": "integer", "minimum": 0}
            }
        });
        let resolved = resolve_document(schema).unwrap();
        assert_eq!(
            resolved["properties"]["num"],
            json!({"type": "integer", "minimum": 0})
        );
    }

    #[test]
    fn refs_substitute_independent_copies() {
        let schema = json!({
            "$id": "#root",
            "properties": {
                "a": {"$ref": "#/definitions/num"},
                "b": {"$ref": "#/definitions/num"}
            },
            "definitions": {"num": {"type": "integer"}}
        });
        let mut resolved = resolve_document(schema).unwrap();
        resolved["properties"]["a"]["minimum"] = json!(5);
        // Mutating one substitution must not leak into the other.
        assert_eq!(resolved["properties"]["b"], json!({"type": "integer"}));
    }

    #[test]
    fn nested_refs_resolve_through() {
        let schema = json!({
            "$id": "#root",
            "value": {"$ref": "#/a"},
            "a": {"$ref": "#/b"},
            "b": {"type": "boolean"}
        });
        let resolved = resolve_document(schema).unwrap();
        assert_eq!(resolved["value"], json!({"type": "boolean"}));
    }

    #[test]
    fn ref_with_sibling_keys_is_rejected() {
        let schema = json!({
            "$id": "#root",
            "value": {"$ref": "#/b", "description": "nope"},
            "b": {"type": "boolean"}
        });
        let err = resolve_document(schema).unwrap_err();
        assert!(matches!(err, CompileError::ReferenceWithSiblings { .. }));
    }

    #[test]
    fn external_and_id_style_refs_are_rejected() {
        let external = json!({"$id": "#r", "v": {"$ref": "http://x/y"}});
        assert!(matches!(
            resolve_document(external).unwrap_err(),
            CompileError::ExternalReference { .. }
        ));
        let id_style = json!({"$id": "#r", "v": {"$ref": "#name"}});
        assert!(matches!(
            resolve_document(id_style).unwrap_err(),
            CompileError::IdReference { .. }
        ));
    }

    #[test]
    fn cyclic_refs_are_a_config_error_not_a_stack_overflow() {
        let schema = json!({
            "$id": "#root",
            "a": {"$ref": "#/b"},
            "b": {"$ref": "#/a"}
        });
        let err = resolve_document(schema).unwrap_err();
        assert!(matches!(err, CompileError::CyclicReference { .. }));
    }

    #[test]
    fn all_of_merges_away() {
        let schema = json!({
            "$id": "#root",
            "type": "object",
            "properties": {"a": {"type": "boolean"}},
            "required": ["a"],
            "allOf": [
                {
                    "properties": {"b": {"type": "integer", "minimum": 0}},
                    "required": ["b", "a"]
                }
            ]
        });
        let resolved = resolve_document(schema).unwrap();
        assert_eq!(resolved["properties"]["a"], json!({"type": "boolean"}));
        assert_eq!(
            resolved["properties"]["b"],
            json!({"type": "integer", "minimum": 0})
        );
        // Left list plus right elements not already present.
        assert_eq!(resolved["required"], json!(["a", "b"]));
        assert!(resolved.get("allOf").is_none());
    }

    #[test]
    fn all_of_scalar_conflict_is_fatal() {
        let schema = json!({
            "$id": "#root",
            "type": "object",
            "allOf": [{"type": "string"}]
        });
        let err = resolve_document(schema).unwrap_err();
        assert!(matches!(err, CompileError::MergeConflict { .. }));
    }

    #[test]
    fn all_of_type_mismatch_is_fatal() {
        let schema = json!({
            "$id": "#root",
            "minimum": 3,
            "allOf": [{"minimum": [3]}]
        });
        let err = resolve_document(schema).unwrap_err();
        assert!(matches!(err, CompileError::MergeTypeMismatch { .. }));
    }

    #[test]
    fn all_of_inside_arrays_is_expanded_too() {
        let schema = json!({
            "$id": "#root",
            "anyOf": [
                {"type": "integer"},
                {"type": "string", "allOf": [{"pattern": "[0-9]+"}]}
            ]
        });
        let resolved = resolve_document(schema).unwrap();
        assert_eq!(
            resolved["anyOf"][1],
            json!({"type": "string", "pattern": "[0-9]+"})
        );
    }

    #[test]
    fn refs_resolve_before_all_of_merging() {
        let schema = json!({
            "$id": "#root",
            "type": "object",
            "properties": {"a": {"type": "boolean"}},
            "allOf": [{"$ref": "#/definitions/base"}],
            "definitions": {
                "base": {"properties": {"b": {"type": "boolean"}}}
            }
        });
        let resolved = resolve_document(schema).unwrap();
        assert!(resolved["properties"]["a"].is_object());
        assert!(resolved["properties"]["b"].is_object());
    }
}
