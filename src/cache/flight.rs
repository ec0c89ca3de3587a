//! Per-fingerprint gates for single-flight mode.

use super::key::Fingerprint;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;

type Gate = Arc<AsyncMutex<()>>;

/// Tracks fingerprints that currently have a caller computing or waiting.
///
/// The map only ever holds gates that some caller references, so a poisoned
/// lock still guards consistent state and is recovered rather than reported.
#[derive(Default)]
pub(crate) struct InFlight {
    gates: Mutex<HashMap<Fingerprint, Gate>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn gates(&self) -> MutexGuard<'_, HashMap<Fingerprint, Gate>> {
        self.gates.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register interest in `fingerprint` and return its slot.
    pub(crate) fn enter(&self, fingerprint: &Fingerprint) -> Slot<'_> {
        let gate = Arc::clone(
            self.gates()
                .entry(fingerprint.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );
        Slot {
            owner: self,
            fingerprint: fingerprint.clone(),
            gate,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.gates().len()
    }
}

/// A caller's stake in a fingerprint's gate. Dropping it removes the gate
/// once no other caller holds a reference.
pub(crate) struct Slot<'a> {
    owner: &'a InFlight,
    fingerprint: Fingerprint,
    gate: Gate,
}

impl Slot<'_> {
    pub(crate) fn gate(&self) -> &AsyncMutex<()> {
        &self.gate
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let mut gates = self.owner.gates();
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.gate) == 2 {
            gates.remove(&self.fingerprint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_released_on_drop() {
        let flights = InFlight::new();
        let fp = Fingerprint::new("a");
        {
            let _slot = flights.enter(&fp);
            assert_eq!(flights.len(), 1);
        }
        assert_eq!(flights.len(), 0);
    }

    #[test]
    fn test_gate_shared_while_any_slot_alive() {
        let flights = InFlight::new();
        let fp = Fingerprint::new("a");
        let first = flights.enter(&fp);
        let second = flights.enter(&fp);
        assert!(std::ptr::eq(first.gate(), second.gate()));
        drop(first);
        assert_eq!(flights.len(), 1);
        drop(second);
        assert_eq!(flights.len(), 0);
    }

    #[tokio::test]
    async fn test_second_caller_waits_for_gate() {
        let flights = InFlight::new();
        let fp = Fingerprint::new("a");
        let first = flights.enter(&fp);
        let second = flights.enter(&fp);
        let guard = first.gate().lock().await;
        assert!(second.gate().try_lock().is_err());
        drop(guard);
        assert!(second.gate().try_lock().is_ok());
    }
}
