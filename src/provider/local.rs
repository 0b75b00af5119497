//! In-process capped endpoint.
//!
//! [`SharedCapEndpoint`] models a remote endpoint enforcing a maximum
//! concurrent-connection cap: many provider handles (one per participant)
//! share a single occupancy counter, creations beyond the cap are rejected,
//! and the endpoint can sever live slots to simulate peer-side closes.
//! Everything resolves on the tokio timer, so sessions built on it run
//! deterministically under a paused test clock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Duration;

use super::{CreateError, SlotProvider};

/// A slot held against a [`SharedCapEndpoint`].
///
/// The open flag is shared with the endpoint: either side may close the
/// slot, and exactly one close releases the occupancy it accounts for.
#[derive(Debug)]
pub struct LocalSlot {
    id: u64,
    open: Arc<AtomicBool>,
}

impl LocalSlot {
    /// Endpoint-assigned slot identifier, unique per endpoint.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct EndpointState {
    cap: usize,
    /// Open-flag registry of currently live slots, in creation order.
    live: Mutex<Vec<(u64, Arc<AtomicBool>)>>,
    next_id: AtomicU64,
    create_latency_ms: u64,
}

impl EndpointState {
    fn live(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Arc<AtomicBool>)>> {
        self.live.lock().expect("endpoint registry lock poisoned")
    }

    /// Closes a slot's shared flag; returns true for the closing caller.
    fn close(&self, id: u64, open: &AtomicBool) -> bool {
        if open.swap(false, Ordering::SeqCst) {
            self.live().retain(|(slot_id, _)| *slot_id != id);
            true
        } else {
            false
        }
    }
}

/// Handle to an in-process endpoint with a shared connection cap.
///
/// Clones share the same cap, exactly as two browser tabs share one host's
/// connection limit. Implements [`SlotProvider`] directly.
#[derive(Debug, Clone)]
pub struct SharedCapEndpoint {
    state: Arc<EndpointState>,
}

impl SharedCapEndpoint {
    /// Creates an endpoint admitting at most `cap` concurrent slots.
    ///
    /// # Panics
    ///
    /// Panics if `cap == 0`.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "cap must be > 0");
        Self {
            state: Arc::new(EndpointState {
                cap,
                live: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                create_latency_ms: 0,
            }),
        }
    }

    /// Endpoint with a fixed per-creation latency, simulating connection
    /// setup time.
    ///
    /// # Panics
    ///
    /// Panics if `cap == 0`.
    #[must_use]
    pub fn with_create_latency(cap: usize, latency_ms: u64) -> Self {
        assert!(cap > 0, "cap must be > 0");
        Self {
            state: Arc::new(EndpointState {
                cap,
                live: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                create_latency_ms: latency_ms,
            }),
        }
    }

    /// Number of slots currently occupied across all holders.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.state.live().len()
    }

    /// The endpoint's concurrency cap.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.state.cap
    }

    /// Force-closes up to `max` live slots, oldest first, as if the remote
    /// end dropped them. Returns the number severed.
    ///
    /// Severed slots report dead through `is_live` until their holder
    /// sweeps them; the occupancy they accounted for is freed immediately.
    pub fn sever(&self, max: usize) -> usize {
        let victims: Vec<(u64, Arc<AtomicBool>)> =
            self.state.live().iter().take(max).cloned().collect();
        let mut severed = 0;
        for (id, open) in victims {
            if self.state.close(id, &open) {
                severed += 1;
            }
        }
        severed
    }
}

#[async_trait]
impl SlotProvider for SharedCapEndpoint {
    type Slot = LocalSlot;

    async fn create(&self) -> Result<LocalSlot, CreateError> {
        if self.state.create_latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.state.create_latency_ms)).await;
        }

        let open = Arc::new(AtomicBool::new(true));
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut live = self.state.live();
            if live.len() >= self.state.cap {
                return Err(CreateError::CapacityExhausted);
            }
            live.push((id, Arc::clone(&open)));
        }
        Ok(LocalSlot { id, open })
    }

    async fn destroy(&self, slot: LocalSlot) {
        // Already severed by the endpoint: nothing left to release.
        let _ = self.state.close(slot.id, &slot.open);
    }

    fn is_live(&self, slot: &LocalSlot) -> Option<bool> {
        Some(slot.open.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_past_cap() {
        let endpoint = SharedCapEndpoint::new(2);
        let a = endpoint.create().await.unwrap();
        let _b = endpoint.create().await.unwrap();

        assert!(matches!(
            endpoint.create().await,
            Err(CreateError::CapacityExhausted)
        ));
        assert_eq!(endpoint.occupied(), 2);

        endpoint.destroy(a).await;
        assert_eq!(endpoint.occupied(), 1);
        assert!(endpoint.create().await.is_ok());
    }

    #[tokio::test]
    async fn cap_is_shared_between_handles() {
        let endpoint = SharedCapEndpoint::new(3);
        let peer = endpoint.clone();

        let _a = endpoint.create().await.unwrap();
        let _b = peer.create().await.unwrap();
        let _c = peer.create().await.unwrap();

        assert!(endpoint.create().await.is_err());
        assert!(peer.create().await.is_err());
    }

    #[tokio::test]
    async fn severed_slots_report_dead_and_free_capacity() {
        let endpoint = SharedCapEndpoint::new(2);
        let a = endpoint.create().await.unwrap();
        let b = endpoint.create().await.unwrap();

        assert_eq!(endpoint.sever(1), 1);
        assert_eq!(endpoint.is_live(&a), Some(false));
        assert_eq!(endpoint.is_live(&b), Some(true));
        assert_eq!(endpoint.occupied(), 1);

        // Destroying the severed slot is a harmless no-op.
        endpoint.destroy(a).await;
        assert_eq!(endpoint.occupied(), 1);
    }
}
