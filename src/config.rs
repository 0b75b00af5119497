//! Protocol constants per resource kind.
//!
//! Every (resource kind, environment) pair needs its own tuning: how many
//! slots the shared cap admits, how many digits a word carries, how long a
//! pulse lasts, and how long asynchronous create/destroy takes to settle.
//! The protocol core never inspects its environment; whoever builds the
//! session injects one of these.
//!
//! # Tuning Guidelines
//!
//! - `pulse_ms` must dominate `settling_ms` by a wide margin: the receiver
//!   probes mid-pulse and its own transient consumption has to be reclaimed
//!   well before the sender's next pulse edge. A probe costs two settling
//!   delays (consume + release), so keep `pulse_ms` at several multiples of
//!   `settling_ms`.
//! - `negotiate_ms` must cover the whole saturation round: one oversubscribed
//!   consume, its settling delay, and the loser's full release.
//! - `max_value` may not exceed `max_slots`: the sender leaves `digit + 1`
//!   slots unheld, and that many must exist.

use crate::codec;

/// Validated protocol constants for one resource kind.
///
/// All durations are wall-clock milliseconds; both participants must run
/// with identical constants or the pulse grids will not line up.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Number of digits per transmitted word.
    pub list_size: usize,

    /// Total capacity cap of the shared external resource.
    pub max_slots: usize,

    /// Digit radix; each pulse carries a value in `0..max_value`.
    pub max_value: u32,

    /// Duration of one transmission pulse.
    pub pulse_ms: u64,

    /// Lead time between the grid-aligned `t0` and the first digit pulse,
    /// reserved for role negotiation.
    pub negotiate_ms: u64,

    /// Delay letting asynchronous create/destroy resolve before the pool
    /// samples its own state.
    pub settling_ms: u64,

    /// Saturation factor for role negotiation: each participant attempts
    /// `max_slots * oversubscribe` creations to force the cap to exhaustion.
    pub oversubscribe: usize,
}

impl SessionConfig {
    /// Creates a configuration with validation.
    ///
    /// # Panics
    ///
    /// Panics if any of `list_size`, `max_slots`, `max_value`, `pulse_ms`
    /// or `oversubscribe` is zero, or if `max_value > max_slots`.
    #[must_use]
    fn new_validated(
        list_size: usize,
        max_slots: usize,
        max_value: u32,
        pulse_ms: u64,
        negotiate_ms: u64,
        settling_ms: u64,
        oversubscribe: usize,
    ) -> Self {
        assert!(list_size > 0, "list_size must be > 0");
        assert!(max_slots > 0, "max_slots must be > 0");
        assert!(max_value > 0, "max_value must be > 0");
        assert!(pulse_ms > 0, "pulse_ms must be > 0");
        assert!(oversubscribe > 0, "oversubscribe must be > 0");
        assert!(
            max_value as usize <= max_slots,
            "max_value must not exceed max_slots"
        );

        Self {
            list_size,
            max_slots,
            max_value,
            pulse_ms,
            negotiate_ms,
            settling_ms,
            oversubscribe,
        }
    }

    /// Creates a configuration with custom constants.
    ///
    /// # Panics
    ///
    /// Same validation as the presets; see the type-level docs for the
    /// timing relationships the constants should respect.
    #[must_use]
    pub fn new(
        list_size: usize,
        max_slots: usize,
        max_value: u32,
        pulse_ms: u64,
        negotiate_ms: u64,
        settling_ms: u64,
    ) -> Self {
        Self::new_validated(
            list_size,
            max_slots,
            max_value,
            pulse_ms,
            negotiate_ms,
            settling_ms,
            1,
        )
    }

    /// Constants for a Chromium-style WebSocket pool (cap 255, fast
    /// connection churn, no settling needed).
    #[must_use]
    pub fn websocket_chrome() -> Self {
        Self::new_validated(5, 255, 128, 50, 50, 0, 1)
    }

    /// Constants for a Firefox-style WebSocket pool (cap 255, slower
    /// connection teardown, 50ms settling).
    #[must_use]
    pub fn websocket_firefox() -> Self {
        Self::new_validated(5, 255, 128, 350, 350, 50, 1)
    }

    /// Builder-style setter for the digit count.
    #[must_use]
    pub const fn with_list_size(mut self, list_size: usize) -> Self {
        self.list_size = list_size;
        self
    }

    /// Builder-style setter for the pulse duration.
    #[must_use]
    pub const fn with_pulse_ms(mut self, pulse_ms: u64) -> Self {
        self.pulse_ms = pulse_ms;
        self
    }

    /// Builder-style setter for the negotiation lead time.
    #[must_use]
    pub const fn with_negotiate_ms(mut self, negotiate_ms: u64) -> Self {
        self.negotiate_ms = negotiate_ms;
        self
    }

    /// Builder-style setter for the settling delay.
    #[must_use]
    pub const fn with_settling_ms(mut self, settling_ms: u64) -> Self {
        self.settling_ms = settling_ms;
        self
    }

    /// Builder-style setter for the negotiation saturation factor.
    #[must_use]
    pub const fn with_oversubscribe(mut self, oversubscribe: usize) -> Self {
        self.oversubscribe = oversubscribe;
        self
    }

    /// Payload width in bits: `list_size * log2(max_value)`.
    ///
    /// Fractional when the radix is not a power of two.
    #[must_use]
    pub fn num_bits(&self) -> f64 {
        codec::num_bits(self.list_size, self.max_value)
    }

    /// Length of one full protocol cycle: negotiation lead plus one pulse
    /// per digit. Participants align their `t0` to multiples of this.
    #[must_use]
    pub const fn cycle_ms(&self) -> u64 {
        self.negotiate_ms + self.list_size as u64 * self.pulse_ms
    }
}
