//! The resource-provider seam.
//!
//! The protocol core never talks to a concrete resource directly; it goes
//! through [`SlotProvider`], the capability set every resource kind must
//! offer: create a unit of the capped resource, destroy it best-effort, and
//! optionally answer a liveness query. One implementation exists per
//! resource kind (streaming-socket, event-stream, worker-process, …);
//! [`local::SharedCapEndpoint`] ships in-crate as the deterministic
//! stand-in used by tests and the demo binary.

use async_trait::async_trait;
use thiserror::Error;

pub mod local;

/// Why a slot creation attempt failed.
///
/// Creation failures are routine protocol signal, not faults: a rejection
/// means the shared cap is (near) exhaustion, which is exactly what the
/// receiver wants to observe. The pool folds these into aggregate counts
/// and never escalates them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CreateError {
    /// The shared cap is reached; no slot can be created right now.
    #[error("shared capacity exhausted")]
    CapacityExhausted,
    /// The provider rejected the attempt for another reason.
    #[error("creation rejected: {0}")]
    Rejected(String),
    /// The provider's own creation deadline elapsed.
    #[error("creation timed out")]
    TimedOut,
}

/// One resource kind's `{create, destroy, is_live}` capability set.
///
/// Implementations bound their own `create` latency: a provider that can
/// hang indefinitely must enforce an internal deadline and resolve with
/// [`CreateError::TimedOut`]. The pool joins whatever the provider
/// resolves and applies no timeout of its own.
#[async_trait]
pub trait SlotProvider: Send + Sync {
    /// Handle to one unit of the shared capped resource.
    type Slot: Send;

    /// Attempts to create one slot. May fail asynchronously once the
    /// shared cap is reached.
    async fn create(&self) -> Result<Self::Slot, CreateError>;

    /// Destroys a slot. Best-effort: implementations swallow provider
    /// errors, and the caller treats the slot as released regardless.
    async fn destroy(&self, slot: Self::Slot);

    /// Synchronous liveness query.
    ///
    /// Returns `None` when this resource kind has no liveness predicate;
    /// dead-slot sweeping is then a no-op and the pool trusts its own
    /// create/destroy bookkeeping.
    fn is_live(&self, _slot: &Self::Slot) -> Option<bool> {
        None
    }
}
