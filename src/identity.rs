//! Stable identity derivation for arbitrary JSON values.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use sha1::{Digest, Sha1};

/// Field consulted for an explicit identity when no key is configured.
pub const DEFAULT_ID_KEY: &str = "id";

/// Derive the identity string for `value`.
///
/// When the value is an object carrying `id_key` (or `id` when no key is
/// configured) with a non-null value, the identity is that field's string
/// form: strings verbatim, numbers in base-10 decimal, booleans as
/// `true`/`false`, and nested objects or arrays as their canonical JSON
/// text. Otherwise the identity is the base64-encoded SHA-1 digest of the
/// value's canonical JSON serialization.
///
/// Canonical means object keys sorted byte-wise ascending at every nesting
/// level, with no insignificant whitespace. serde_json's default map
/// representation keeps keys sorted, so the serialization is independent
/// of input key order and stable across processes and platforms.
pub fn identity(value: &Value, id_key: Option<&str>) -> String {
    let key = id_key.unwrap_or(DEFAULT_ID_KEY);
    match value.get(key) {
        Some(field) if !field.is_null() => field_string(field),
        _ => content_hash(value),
    }
}

fn field_string(field: &Value) -> String {
    match field {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn content_hash(value: &Value) -> String {
    let mut hasher = Sha1::new();
    hasher.update(value.to_string().as_bytes());
    STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hashes_canonical_serialization() {
        assert_eq!(
            identity(&json!({"foo": "bar"}), None),
            "pedE0BZFQNM7HX6mFsKPL6l+dUo="
        );
        assert_eq!(
            identity(&json!({"foo": "xyz"}), None),
            "JLlNsm5BmruzidmR1EbUCv3dgZs="
        );
        assert_eq!(
            identity(&json!({"foo": "123"}), None),
            "tCZLP88NkBIfJD1s7bgZ3Zx56jU="
        );
    }

    #[test]
    fn invariant_under_key_order() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"d":2,"c":3}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"c":3,"d":2},"b":1}"#).unwrap();
        assert_eq!(identity(&a, None), identity(&b, None));
    }

    #[test]
    fn uses_id_field_by_default() {
        assert_eq!(identity(&json!({"id": 1}), None), "1");
        assert_eq!(identity(&json!({"id": "abc"}), None), "abc");
        assert_eq!(identity(&json!({"id": true}), None), "true");
        assert_eq!(identity(&json!({"id": 1.5}), None), "1.5");
    }

    #[test]
    fn configured_key_replaces_default() {
        assert_eq!(identity(&json!({"test_id": 1}), Some("test_id")), "1");
        // A configured key that is absent means the default "id" field is
        // ignored too and the value falls back to hashing.
        let value = json!({"id": 5});
        let hashed = identity(&value, Some("test_id"));
        assert_ne!(hashed, "5");
        assert_eq!(hashed, content_hash(&value));
    }

    #[test]
    fn null_id_field_falls_back_to_hash() {
        let value = json!({"id": null, "foo": "bar"});
        assert_eq!(identity(&value, None), content_hash(&value));
    }

    #[test]
    fn non_primitive_id_field_uses_canonical_json() {
        let value: Value = serde_json::from_str(r#"{"id":{"b":1,"a":2}}"#).unwrap();
        assert_eq!(identity(&value, None), r#"{"a":2,"b":1}"#);
        assert_eq!(identity(&json!({"id": [1, 2]}), None), "[1,2]");
    }

    #[test]
    fn non_object_values_are_hashed() {
        assert_eq!(identity(&json!(42), None), content_hash(&json!(42)));
        assert_eq!(identity(&json!([1, 2]), None), content_hash(&json!([1, 2])));
    }

    #[test]
    fn repeated_invocation_is_stable() {
        let value = json!({"foo": "bar", "nested": {"x": [1, 2, 3]}});
        assert_eq!(identity(&value, None), identity(&value, None));
    }
}
