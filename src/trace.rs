//! Occupancy trace for diagnostics.
//!
//! The pool appends a `(timestamp, held)` sample at every state-changing
//! operation. The trace never feeds back into protocol decisions; it exists
//! so a garbled session can be diagnosed after the fact and so tests can
//! assert on the shape of a run. Reports serialize it as JSON for whatever
//! collector sink sits downstream.

use serde::{Deserialize, Serialize};

use crate::clock::EpochMillis;

/// One observation of the pool's held count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSample {
    /// Wall-clock time of the observation, ms since the Unix epoch.
    pub at_ms: u64,
    /// Number of slots held at that instant.
    pub held: usize,
}

/// Append-only sequence of occupancy samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OccupancyTrace {
    samples: Vec<TraceSample>,
}

impl OccupancyTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample.
    pub fn record(&mut self, at: EpochMillis, held: usize) {
        self.samples.push(TraceSample {
            at_ms: at.as_u64(),
            held,
        });
    }

    /// All samples, in recording order.
    #[must_use]
    pub fn samples(&self) -> &[TraceSample] {
        &self.samples
    }

    /// Number of samples recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Discards all samples, keeping the allocation.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
