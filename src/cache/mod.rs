//! # Read-Through Caching Module
//!
//! This module puts a memoizing cache in front of an expensive or
//! side-effecting async operation, so identical logical requests are served
//! from a backing store instead of being recomputed.
//!
//! ## Overview
//!
//! A call to [`ReadThrough::read_through`] flows through four steps:
//!
//! 1. The request is passed through a [`Normalizer`] (identity by default)
//! 2. The normalized value is rendered as canonical JSON and hashed into a [`Fingerprint`]
//! 3. On a hit the stored value is returned and the producer is not called
//! 4. On a miss the [`Producer`] runs with the original request, the result is
//!    stored, and the stored value is re-read and returned
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ReadThrough`] | Orchestrates normalize, fingerprint, lookup, and produce |
//! | [`ReadThroughConfig`] | Namespace and opt-in single-flight mode |
//! | [`CacheStore`] | Trait for implementing custom storage backends |
//! | [`MemoryStore`] | Default unbounded in-memory store |
//! | [`JsonMemoryStore`] | In-memory store that round-trips values through JSON |
//! | [`FingerprintGenerator`] | Canonical JSON + SHA-256 request fingerprints |
//!
//! ## Example
//!
//! ```rust
//! use read_through_cache::cache::ReadThrough;
//!
//! # tokio_test::block_on(async {
//! let cache: ReadThrough<String, usize, _> =
//!     ReadThrough::new(|q: String| async move { Ok::<_, read_through_cache::Error>(q.len()) });
//!
//! assert_eq!(cache.read_through("hello".to_string()).await.unwrap(), 5);
//! assert_eq!(cache.read_through("hello".to_string()).await.unwrap(), 5);
//! assert_eq!(cache.stats().producer_calls, 1);
//! # });
//! ```
//!
//! ## Concurrency
//!
//! Insertion happens only after the producer resolves, so two overlapping
//! calls for the same fingerprint both miss and both run the producer. Enable
//! [`ReadThroughConfig::with_single_flight`] to make later callers wait for
//! the first one and then read its stored result.

mod backend;
mod canonical;
mod flight;
mod key;
mod manager;
mod producer;

pub use backend::{CacheStore, JsonMemoryStore, MemoryStore};
pub use canonical::NON_FINITE_KEY;
pub use key::{canonical_json, Fingerprint, FingerprintGenerator};
pub use manager::{ReadThrough, ReadThroughConfig, ReadThroughParts, ReadThroughStats};
pub use producer::{sync_producer, Identity, Normalizer, Producer, SyncProducer};
