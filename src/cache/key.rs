//! Request fingerprinting.

use super::canonical::Canonical;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Content fingerprint of a normalized request; the lookup key into a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Renders `value` as canonical JSON.
///
/// Object keys are emitted in sorted order at every depth, so two maps with
/// the same entries render identically regardless of insertion order. Array
/// order is preserved. Non-finite floats are tagged rather than collapsed to
/// `null` (see [`NON_FINITE_KEY`](super::NON_FINITE_KEY)).
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(Canonical(value))?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(item, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// Derives [`Fingerprint`]s from serializable values.
///
/// The digest is SHA-256 over the canonical JSON of the value, hex encoded.
/// A namespace, when set, is prepended as `namespace:digest` so that several
/// caches can share one store without colliding.
#[derive(Debug, Clone, Default)]
pub struct FingerprintGenerator {
    namespace: Option<String>,
}

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn fingerprint<T: Serialize + ?Sized>(&self, value: &T) -> Result<Fingerprint> {
        let canonical = canonical_json(value)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Ok(match self.namespace {
            Some(ref ns) => Fingerprint::new(format!("{}:{}", ns, hash)),
            None => Fingerprint::new(hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": {"y": 1, "x": [2, 1]}, "a": null});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":null,"b":{"x":[2,1],"y":1}}"#
        );
    }

    #[test]
    fn test_fingerprint_ignores_map_insertion_order() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for (k, v) in [("alpha", 1), ("beta", 2), ("gamma", 3), ("delta", 4)] {
            first.insert(k.to_string(), v);
        }
        for (k, v) in [("delta", 4), ("gamma", 3), ("beta", 2), ("alpha", 1)] {
            second.insert(k.to_string(), v);
        }
        let gen = FingerprintGenerator::new();
        assert_eq!(
            gen.fingerprint(&first).unwrap(),
            gen.fingerprint(&second).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_respects_sequence_order() {
        let gen = FingerprintGenerator::new();
        let one = gen.fingerprint(&json!({"a": [1, 2], "b": [3, 4]})).unwrap();
        let two = gen.fingerprint(&json!({"a": [2, 1], "b": [3, 4]})).unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn test_fingerprint_distinguishes_scalar_types() {
        let gen = FingerprintGenerator::new();
        assert_ne!(
            gen.fingerprint(&json!(1)).unwrap(),
            gen.fingerprint(&json!("1")).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_separates_non_finite_floats() {
        let gen = FingerprintGenerator::new();
        let fingerprints = [
            gen.fingerprint(&None::<f64>).unwrap(),
            gen.fingerprint(&Some(f64::NAN)).unwrap(),
            gen.fingerprint(&Some(f64::INFINITY)).unwrap(),
            gen.fingerprint(&Some(f64::NEG_INFINITY)).unwrap(),
        ];
        for (i, a) in fingerprints.iter().enumerate() {
            for b in &fingerprints[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_non_finite_f32_matches_f64() {
        let gen = FingerprintGenerator::new();
        assert_eq!(
            gen.fingerprint(&f32::INFINITY).unwrap(),
            gen.fingerprint(&f64::INFINITY).unwrap()
        );
        assert_ne!(
            gen.fingerprint(&json!({"x": null})).unwrap(),
            gen.fingerprint(&HashMap::from([("x", f32::NAN)])).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fp = FingerprintGenerator::new()
            .fingerprint("some request")
            .unwrap();
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_namespace_prefixes_fingerprint() {
        let plain = FingerprintGenerator::new().fingerprint(&42).unwrap();
        let scoped = FingerprintGenerator::new()
            .with_namespace("users")
            .fingerprint(&42)
            .unwrap();
        assert_eq!(scoped.as_str(), format!("users:{}", plain));
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut map = HashMap::new();
        map.insert((1, 2), "pair");
        let err = FingerprintGenerator::new().fingerprint(&map).unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));
    }
}
