//! Wall-clock pulse scheduling.
//!
//! Sender and receiver never exchange a start signal: the only state they
//! share is wall-clock time. Both sides round the current time up to the
//! next multiple of the cycle interval and wake there, so two participants
//! started anywhere inside the same grid window converge on the same `t0`.
//!
//! The clock anchors a tokio [`Instant`] to a Unix-epoch reading at
//! construction. All protocol arithmetic happens in epoch milliseconds,
//! while the actual suspension runs on the tokio timer, which keeps every
//! pulse wait testable under a paused runtime clock.

use core::fmt;
use core::ops::{Add, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{Duration, Instant};

/// A point in wall-clock time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EpochMillis(u64);

impl EpochMillis {
    /// Creates a timestamp from a raw millisecond count.
    #[inline]
    #[must_use]
    pub const fn new(ms: u64) -> Self {
        Self(ms)
    }

    /// Returns the raw millisecond count.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Rounds up to the next exact multiple of `interval_ms`.
    ///
    /// A timestamp already on the grid advances to the *next* grid point,
    /// so repeated alignment always moves forward.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ms == 0`.
    #[must_use]
    pub const fn next_grid_point(self, interval_ms: u64) -> Self {
        assert!(interval_ms > 0, "grid interval must be > 0");
        Self((self.0 / interval_ms + 1) * interval_ms)
    }
}

impl Add<u64> for EpochMillis {
    type Output = Self;
    #[inline]
    fn add(self, ms: u64) -> Self {
        Self(self.0 + ms)
    }
}

impl Sub for EpochMillis {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Self) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Pulse scheduler over wall-clock time.
///
/// Cloning is cheap; clones share the same epoch anchor, so a pool and its
/// session can hold independent handles to one timeline.
#[derive(Debug, Clone)]
pub struct Clock {
    /// Tokio instant captured at construction.
    anchor: Instant,
    /// Epoch reading taken at the same moment as `anchor`.
    anchor_epoch: EpochMillis,
}

impl Clock {
    /// Creates a clock anchored to the system wall clock.
    #[must_use]
    pub fn system() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        Self::anchored(EpochMillis::new(epoch_ms))
    }

    /// Creates a clock whose "now" starts at the given epoch instant.
    ///
    /// Two clocks anchored to the same instant inside one runtime model a
    /// pair of participants with zero skew; anchoring them apart models a
    /// known skew. Intended for tests and simulations.
    #[must_use]
    pub fn anchored(epoch: EpochMillis) -> Self {
        Self {
            anchor: Instant::now(),
            anchor_epoch: epoch,
        }
    }

    /// Current wall-clock time on this clock's timeline.
    #[must_use]
    pub fn now(&self) -> EpochMillis {
        self.anchor_epoch + self.anchor.elapsed().as_millis() as u64
    }

    /// Suspends until wall-clock time reaches `target`.
    ///
    /// Resolves immediately if `target` is already past.
    pub async fn sleep_until(&self, target: EpochMillis) {
        let now = self.now();
        if target <= now {
            return;
        }
        tokio::time::sleep_until(self.anchor + Duration::from_millis(target - self.anchor_epoch))
            .await;
    }

    /// Suspends for `ms` milliseconds. A zero duration still yields.
    pub async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Sleeps until the next wall-clock instant that is an exact multiple
    /// of `interval_ms`, and returns that instant.
    ///
    /// This is the synchronization primitive: both participants, run
    /// independently, round up to the same grid point and therefore agree
    /// on the phase origin `t0` without exchanging a message.
    pub async fn align_to_grid(&self, interval_ms: u64) -> EpochMillis {
        let target = self.now().next_grid_point(interval_ms);
        self.sleep_until(target).await;
        target
    }
}
