//! Producer and normalizer seams.

use futures::future::{ready, Ready};
use serde::Serialize;
use std::future::Future;

/// The expensive operation a cache sits in front of.
///
/// Any `Fn(Req) -> impl Future<Output = Result<V, E>>` is a producer. Plain
/// synchronous functions can be adapted with [`sync_producer`].
pub trait Producer<Req, V> {
    type Error;
    type Future: Future<Output = std::result::Result<V, Self::Error>>;

    fn produce(&self, request: Req) -> Self::Future;
}

impl<Req, V, E, F, Fut> Producer<Req, V> for F
where
    F: Fn(Req) -> Fut,
    Fut: Future<Output = std::result::Result<V, E>>,
{
    type Error = E;
    type Future = Fut;

    fn produce(&self, request: Req) -> Fut {
        (self)(request)
    }
}

/// Adapter that runs a synchronous function as a [`Producer`].
#[derive(Debug, Clone, Copy)]
pub struct SyncProducer<F>(F);

impl<F> SyncProducer<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<Req, V, E, F> Producer<Req, V> for SyncProducer<F>
where
    F: Fn(Req) -> std::result::Result<V, E>,
{
    type Error = E;
    type Future = Ready<std::result::Result<V, E>>;

    fn produce(&self, request: Req) -> Self::Future {
        ready((self.0)(request))
    }
}

/// Wrap a synchronous function so it can back a cache.
pub fn sync_producer<F>(f: F) -> SyncProducer<F> {
    SyncProducer::new(f)
}

/// Canonicalizes a request before fingerprinting.
///
/// Semantically equal requests should normalize to structurally equal
/// outputs. Any `Fn(&Req) -> impl Serialize` is a normalizer. The output may
/// borrow from the request, so no copy is needed when nothing changes.
pub trait Normalizer<Req> {
    type Output<'a>: Serialize
    where
        Self: 'a,
        Req: 'a;

    fn normalize<'a>(&'a self, request: &'a Req) -> Self::Output<'a>;
}

impl<Req, O, F> Normalizer<Req> for F
where
    F: Fn(&Req) -> O,
    O: Serialize,
{
    type Output<'a> = O
    where
        Self: 'a,
        Req: 'a;

    fn normalize<'a>(&'a self, request: &'a Req) -> O {
        (self)(request)
    }
}

/// Normalizer that fingerprints the request exactly as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<Req: Serialize> Normalizer<Req> for Identity {
    type Output<'a> = &'a Req
    where
        Req: 'a;

    fn normalize<'a>(&'a self, request: &'a Req) -> &'a Req {
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_closure_producer() {
        let producer = |n: u32| async move { Ok::<_, String>(n * 2) };
        assert_eq!(producer.produce(21).await, Ok(42));
    }

    #[tokio::test]
    async fn test_sync_producer_adapter() {
        let producer = sync_producer(|s: String| {
            if s.is_empty() {
                Err("empty")
            } else {
                Ok(s.len())
            }
        });
        assert_eq!(producer.produce("four".to_string()).await, Ok(4));
        assert_eq!(producer.produce(String::new()).await, Err("empty"));
    }

    #[test]
    fn test_closure_normalizer() {
        let sort = |v: &Vec<i32>| {
            let mut v = v.clone();
            v.sort();
            v
        };
        assert_eq!(sort.normalize(&vec![3, 1, 2]), vec![1, 2, 3]);
    }

    #[test]
    fn test_identity_normalizer_borrows() {
        let request = ("a".to_string(), 1);
        assert!(std::ptr::eq(Identity.normalize(&request), &request));
    }
}
