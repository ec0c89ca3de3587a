//! # read-through-cache
//!
//! Read-through memoization for expensive or side-effecting async operations.
//!
//! ## Overview
//!
//! Wrap a producer in a [`ReadThrough`] and every request is normalized,
//! fingerprinted, and looked up in a pluggable [`CacheStore`] before the
//! producer is ever called. Results are stored on the first miss and served
//! from the store afterwards.
//!
//! ## Key Features
//!
//! - **Structural fingerprints**: canonical JSON with sorted object keys, hashed with SHA-256
//! - **Request normalization**: canonicalize semantically equal requests before hashing
//! - **Pluggable storage**: implement [`CacheStore`] for any backend ([`MemoryStore`] by default)
//! - **Transparent errors**: producer errors are returned unchanged and never cached
//! - **Opt-in single-flight**: overlapping calls for one fingerprint share one producer run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use read_through_cache::{ReadThrough, sync_producer};
//!
//! #[tokio::main]
//! async fn main() -> read_through_cache::Result<()> {
//!     let cache: ReadThrough<u64, u64, _> =
//!         ReadThrough::new(sync_producer(|n: u64| Ok::<_, read_through_cache::Error>(n * n)));
//!
//!     let first = cache.read_through(12).await?;
//!     let second = cache.read_through(12).await?;
//!     assert_eq!(first, second);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Orchestrator, stores, fingerprints, producer and normalizer seams |
//! | [`error`] | Error type for fingerprinting and storage failures |

pub mod cache;

pub use cache::{
    canonical_json, sync_producer, CacheStore, Fingerprint, FingerprintGenerator, Identity,
    JsonMemoryStore, MemoryStore, Normalizer, Producer, ReadThrough, ReadThroughConfig,
    ReadThroughParts, ReadThroughStats, SyncProducer,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
