use thiserror::Error;

/// Unified error type for cache infrastructure failures.
///
/// Producer failures are never wrapped in this type: they flow back to the
/// caller as the producer's own error. Only fingerprinting and storage
/// problems are reported here, and they reach the caller through the
/// producer error's `From<Error>` conversion.
#[derive(Debug, Error)]
pub enum Error {
    /// Canonicalizing a request or encoding/decoding a stored value failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A storage backend could not service the operation.
    #[error("Cache store '{store}' unavailable: {message}")]
    StoreUnavailable {
        store: &'static str,
        message: String,
    },

    /// The store acknowledged a fingerprint but returned no value for it.
    #[error("Cache store '{store}' has no entry for fingerprint {fingerprint}")]
    MissingEntry {
        store: &'static str,
        fingerprint: String,
    },
}

impl Error {
    /// Create a backend failure for the named store
    pub fn store_unavailable(store: &'static str, message: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            store,
            message: message.into(),
        }
    }

    /// Create a missing-entry error for the named store
    pub fn missing_entry(store: &'static str, fingerprint: impl Into<String>) -> Self {
        Error::MissingEntry {
            store,
            fingerprint: fingerprint.into(),
        }
    }

    /// Whether the error originated in a storage backend
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Error::StoreUnavailable { .. } | Error::MissingEntry { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_unavailable_display() {
        let err = Error::store_unavailable("memory", "lock poisoned");
        assert_eq!(
            err.to_string(),
            "Cache store 'memory' unavailable: lock poisoned"
        );
        assert!(err.is_store_error());
    }

    #[test]
    fn test_serialization_is_not_store_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert!(!err.is_store_error());
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
