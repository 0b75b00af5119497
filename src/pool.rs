//! Bounded, observable ownership of held slots.
//!
//! The pool is one participant's view of the shared capped resource: it
//! owns every slot it created and nothing else. Batch creations and
//! destructions are issued concurrently and joined with settle-all
//! semantics; individual rejections are folded into aggregate counts
//! because a rejection *is* the signal (it means the cap is reached).
//!
//! Each participant owns its pool outright. Nothing here is global, so
//! independent sessions can run against independently scoped pools, and
//! tests drive everything through an in-process provider.

use futures::future::join_all;

use crate::clock::{Clock, EpochMillis};
use crate::log;
use crate::provider::SlotProvider;
use crate::trace::OccupancyTrace;

/// One held unit of the shared resource.
struct HeldSlot<S> {
    slot: S,
    created_at: EpochMillis,
}

/// Owned set of currently-held slots with consume/release/probe primitives.
///
/// Invariants:
/// - the held count equals the set size at every quiescent point;
/// - no slot is referenced after it has been destroyed;
/// - dead slots are swept out within one settling delay of detection.
pub struct Pool<P: SlotProvider> {
    provider: P,
    clock: Clock,
    settling_ms: u64,
    held: Vec<HeldSlot<P::Slot>>,
    trace: OccupancyTrace,
}

impl<P: SlotProvider> Pool<P> {
    /// Creates an empty pool over `provider`.
    #[must_use]
    pub fn new(provider: P, clock: Clock, settling_ms: u64) -> Self {
        Self {
            provider,
            clock,
            settling_ms,
            held: Vec::new(),
            trace: OccupancyTrace::new(),
        }
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn held(&self) -> usize {
        self.held.len()
    }

    /// Creation timestamp of the oldest held slot, if any.
    #[must_use]
    pub fn held_since(&self) -> Option<EpochMillis> {
        self.held.first().map(|h| h.created_at)
    }

    /// The occupancy trace recorded so far.
    #[must_use]
    pub fn trace(&self) -> &OccupancyTrace {
        &self.trace
    }

    /// Takes the occupancy trace, leaving an empty one behind.
    pub fn take_trace(&mut self) -> OccupancyTrace {
        std::mem::take(&mut self.trace)
    }

    /// Attempts to create up to `max` slots concurrently and returns the
    /// net change in held count.
    ///
    /// Every attempt independently succeeds or fails; failures are routine
    /// (the cap is reached) and never abort the batch. After the batch is
    /// joined, the pool settles and sweeps dead slots, so the return value
    /// reflects what is actually held, which may fall short of `max` when
    /// the shared resource is near capacity. That shortfall is the signal
    /// the receiver reads.
    pub async fn consume(&mut self, max: usize) -> usize {
        self.capture();
        let start = self.held.len();

        let results = join_all((0..max).map(|_| self.provider.create())).await;
        let now = self.clock.now();
        for result in results {
            // Rejections mean the cap is reached; only the aggregate
            // count matters.
            if let Ok(slot) = result {
                self.held.push(HeldSlot {
                    slot,
                    created_at: now,
                });
            }
        }
        self.capture();

        self.settle().await;
        self.sweep_dead().await;

        let finish = self.held.len();
        self.capture();
        log::debug!(attempted = max, held = finish, "consume settled");
        finish.saturating_sub(start)
    }

    /// Destroys `min(max, held)` slots in held order and returns the count
    /// released.
    ///
    /// Destruction is best-effort: provider failures are swallowed and the
    /// slots count as released regardless.
    pub async fn release(&mut self, max: usize) -> usize {
        self.capture();
        if max == 0 {
            return 0;
        }

        let count = max.min(self.held.len());
        let victims: Vec<P::Slot> = self.held.drain(..count).map(|h| h.slot).collect();
        join_all(victims.into_iter().map(|slot| self.provider.destroy(slot))).await;
        self.capture();

        self.settle().await;
        self.capture();
        log::debug!(released = count, held = self.held.len(), "release settled");
        count
    }

    /// Removes every held slot whose liveness predicate reports false,
    /// destroying it first in case the provider has not already done so.
    ///
    /// Idempotent; a no-op when the provider has no liveness predicate.
    pub async fn sweep_dead(&mut self) {
        let mut dead: Vec<P::Slot> = Vec::new();
        let mut index = 0;
        while index < self.held.len() {
            if self.provider.is_live(&self.held[index].slot) == Some(false) {
                dead.push(self.held.remove(index).slot);
            } else {
                index += 1;
            }
        }
        if dead.is_empty() {
            return;
        }

        log::debug!(swept = dead.len(), held = self.held.len(), "swept dead slots");
        join_all(dead.into_iter().map(|slot| self.provider.destroy(slot))).await;
        self.capture();
    }

    /// Measures available headroom in the shared cap without retaining it:
    /// consumes up to `max`, releases exactly what was consumed, and
    /// returns the transient count.
    ///
    /// The held count is unchanged afterwards. This is the primitive the
    /// receiver uses to read one transmitted digit.
    pub async fn probe(&mut self, max: usize) -> usize {
        let consumed = self.consume(max).await;
        self.release(consumed).await;
        consumed
    }

    /// Releases every held slot. Idempotent; must run at session end on
    /// every path so the shared resource is never left starved.
    pub async fn drain(&mut self) {
        let held = self.held.len();
        if held > 0 {
            self.release(held).await;
        }
    }

    /// Appends an occupancy sample to the trace.
    fn capture(&mut self) {
        self.trace.record(self.clock.now(), self.held.len());
    }

    /// Waits for asynchronous create/destroy operations to resolve.
    async fn settle(&self) {
        if self.settling_ms > 0 {
            self.clock.sleep_ms(self.settling_ms).await;
        }
    }
}
