//! Deterministic cache key construction.
//!
//! Keys follow `decision:{principal}:{action}:{resource}:{context_hash}`. The
//! resource segment has `:` and `/` replaced with `_` so prefix scans stay
//! unambiguous, and the context hash is the first 16 hex characters of a
//! SHA-256 over a canonical JSON rendering of the request context. Two
//! requests whose contexts hold the same key/value pairs in any insertion
//! order produce the same key.

use std::fmt::Write as _;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Prefix shared by every decision key, used for scoped invalidation scans.
pub const KEY_PREFIX: &str = "decision";

/// Builds the cache key for one principal/action/resource/context tuple.
#[must_use]
pub fn decision_key(
    principal_id: &str,
    action: &str,
    resource: &str,
    context: &Map<String, Value>,
) -> String {
    format!(
        "{KEY_PREFIX}:{principal_id}:{action}:{}:{}",
        sanitize_resource(resource),
        context_fingerprint(context),
    )
}

/// Key prefix pattern matching every decision cached for one principal.
#[must_use]
pub fn principal_pattern(principal_id: &str) -> String {
    format!("{KEY_PREFIX}:{principal_id}:*")
}

fn sanitize_resource(resource: &str) -> String {
    resource.replace([':', '/'], "_")
}

/// Hashes the context into a 16-character hex fingerprint, insensitive to
/// object key order at every nesting depth.
#[must_use]
pub fn context_fingerprint(context: &Map<String, Value>) -> String {
    if context.is_empty() {
        return "none".to_owned();
    }
    let mut canonical = String::new();
    write_canonical_object(context, &mut canonical);

    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in &digest[..8] {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars already have a single canonical rendering.
        other => out.push_str(&other.to_string()),
    }
}

fn write_canonical_object(map: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    out.push('{');
    for (idx, key) in keys.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&Value::String((*key).clone()).to_string());
        out.push(':');
        write_canonical(&map[key.as_str()], out);
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_context_hashes_to_none() {
        assert_eq!(context_fingerprint(&Map::new()), "none");
    }

    #[test]
    fn fingerprint_ignores_key_insertion_order() {
        let mut first = Map::new();
        first.insert("b".into(), json!({"y": 2, "x": 1}));
        first.insert("a".into(), json!(true));

        let mut second = Map::new();
        second.insert("a".into(), json!(true));
        second.insert("b".into(), json!({"x": 1, "y": 2}));

        assert_eq!(context_fingerprint(&first), context_fingerprint(&second));
    }

    #[test]
    fn fingerprint_distinguishes_values_and_array_order() {
        let base = map(json!({"items": [1, 2, 3]}));
        let reordered = map(json!({"items": [3, 2, 1]}));
        let changed = map(json!({"items": [1, 2, 4]}));

        assert_ne!(context_fingerprint(&base), context_fingerprint(&reordered));
        assert_ne!(context_fingerprint(&base), context_fingerprint(&changed));
    }

    #[test]
    fn decision_key_sanitizes_the_resource_segment() {
        let key = decision_key("alice", "gateway:tool:invoke", "srv/db:query", &Map::new());
        assert_eq!(key, "decision:alice:gateway:tool:invoke:srv_db_query:none");
    }

    #[test]
    fn decision_key_embeds_the_context_hash() {
        let context = map(json!({"env": "prod"}));
        let key = decision_key("alice", "server:register", "db", &context);

        assert!(key.starts_with("decision:alice:server:register:db:"));
        let hash = key.rsplit(':').next().unwrap();
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn principal_pattern_scopes_to_one_principal() {
        assert_eq!(principal_pattern("alice"), "decision:alice:*");
    }
}
