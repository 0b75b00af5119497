//! The telegraphy protocol engine.
//!
//! One session runs a participant through the protocol phases:
//!
//! ```text
//! Idle -> RoleNegotiation -> { Sending | Receiving } -> Drained
//! ```
//!
//! Role negotiation is a saturation race: each participant floods the
//! shared cap with creation attempts, and whoever ends up holding at least
//! half the cap becomes the sender (its holdings are the encoding
//! baseline); the other side releases everything and listens. No message
//! is ever exchanged: the phase origin `t0` comes from grid-aligned
//! wall-clock time, and the payload rides entirely on how many slots are
//! left unheld during each pulse.
//!
//! Per pulse the sender leaves exactly `digit + 1` slots unheld (never
//! zero, so digit 0 stays distinguishable from "no sender active"), and
//! the receiver probes mid-pulse for acquirable headroom. Clock skew
//! beyond one pulse width is not detected and garbles the decode; that is
//! a documented limit of the design, not a recoverable condition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, EpochMillis};
use crate::codec;
use crate::config::SessionConfig;
use crate::log;
use crate::pool::Pool;
use crate::provider::SlotProvider;
use crate::trace::OccupancyTrace;

/// The role a participant takes for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Holds the cap and modulates unheld slots.
    Sender,
    /// Vacates the cap and probes for headroom.
    Receiver,
}

/// The word a sender transmits in each cycle.
#[derive(Debug, Clone, Copy)]
pub enum Payload {
    /// Transmit this value. Precondition: `value < max_value ^ list_size`.
    Fixed(u64),
    /// Sample a fresh uniform value per cycle (self-test traffic).
    Random,
}

/// A fully decoded reception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    /// The decoded integer.
    pub value: u64,
    /// Raw digits, least-significant first.
    pub digits: Vec<u32>,
    /// Fixed-width hexadecimal rendering of `value`.
    pub hex: String,
}

/// Protocol-level failures that escalate to the caller.
///
/// These are recoverable results, not fatal faults: the session still
/// drains its pool before reporting one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A probe observed an occupancy no sender would produce, meaning the
    /// participants' pulse schedules have drifted apart. Carries the
    /// partially decoded value (missing digits read as zero).
    #[error("desynchronized at pulse {pulse}: observed {observed} unheld slots")]
    Desynchronized {
        /// Index of the pulse that failed to decode.
        pulse: usize,
        /// The raw probe count observed.
        observed: usize,
        /// Value composed from the digits decoded before the failure.
        partial: u64,
    },
}

/// How one protocol cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// This participant transmitted `hex`.
    Sent { hex: String },
    /// This participant decoded `hex`; `digits` are the raw probed
    /// digits, least-significant first.
    Received { hex: String, digits: Vec<u32> },
    /// The receive cycle desynchronized; `partial_hex` holds the digits
    /// decoded before the abort.
    Garbled {
        pulse: usize,
        observed: usize,
        partial_hex: String,
    },
}

/// Result of one full cycle, ready for a collector sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Role taken after negotiation.
    pub role: Role,
    /// How the cycle ended.
    pub outcome: CycleOutcome,
    /// The grid-aligned phase origin for the cycle.
    pub t0_ms: u64,
    /// Wall-clock duration of the cycle.
    pub elapsed_ms: u64,
    /// Occupancy samples recorded during the cycle.
    pub trace: OccupancyTrace,
}

/// One participant's protocol engine.
///
/// Owns the pool for its lifetime; the pool is drained at the end of every
/// cycle on every path, so a dropped session after [`Session::run`] leaves
/// no slot behind.
pub struct Session<P: SlotProvider> {
    pool: Pool<P>,
    clock: Clock,
    config: SessionConfig,
}

impl<P: SlotProvider> Session<P> {
    /// Creates a session over `provider` with the given timeline and
    /// constants.
    #[must_use]
    pub fn new(provider: P, clock: Clock, config: SessionConfig) -> Self {
        let pool = Pool::new(provider, clock.clone(), config.settling_ms);
        Self {
            pool,
            clock,
            config,
        }
    }

    /// Number of slots currently held by this participant.
    #[must_use]
    pub fn held(&self) -> usize {
        self.pool.held()
    }

    /// The configuration this session runs with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs the saturation race and returns the role this participant
    /// takes for the current cycle.
    ///
    /// Holding at least half the cap after saturation classifies as
    /// [`Role::Sender`]; the holdings stay put as the encoding baseline.
    /// Anything less classifies as [`Role::Receiver`] and releases
    /// everything, vacating capacity for the sender's modulation. A count
    /// of exactly half falls to the sender side.
    pub async fn negotiate(&mut self) -> Role {
        self.pool.drain().await;
        self.pool
            .consume(self.config.max_slots * self.config.oversubscribe)
            .await;

        let held = self.pool.held();
        if held * 2 < self.config.max_slots {
            log::debug!(held, cap = self.config.max_slots, "negotiated receiver");
            self.pool.drain().await;
            Role::Receiver
        } else {
            log::debug!(held, cap = self.config.max_slots, "negotiated sender");
            Role::Sender
        }
    }

    /// Transmits `value` over `list_size` pulses starting at
    /// `t0 + negotiate_ms`, and returns its hex rendering.
    ///
    /// The wire signal is the sequence of occupancy levels, not the return
    /// value; the hex string exists for verification against the peer.
    /// Precondition: `value < max_value ^ list_size` (wraps silently
    /// otherwise, per the codec contract).
    pub async fn send(&mut self, value: u64, t0: EpochMillis) -> String {
        let digits = codec::integer_to_digits(value, self.config.list_size, self.config.max_value);

        // Baseline: occupy the whole cap so that unheld == 0 until the
        // first digit pulse begins.
        let top_up = self.config.max_slots.saturating_sub(self.pool.held());
        self.pool.consume(top_up).await;

        let first_pulse = t0 + self.config.negotiate_ms;
        let mut last_target = 0usize;
        for (i, &digit) in digits.iter().enumerate() {
            self.clock
                .sleep_until(first_pulse + i as u64 * self.config.pulse_ms)
                .await;

            // Leave exactly `digit + 1` slots unheld for the rest of the
            // pulse. The +1 keeps digit 0 distinguishable from silence.
            let target = digit as usize + 1;
            if target > last_target {
                self.pool.release(target - last_target).await;
            } else {
                self.pool.consume(last_target - target).await;
            }
            last_target = target;
            log::trace!(pulse = i, digit, unheld = target, "pulse level set");

            self.clock
                .sleep_until(first_pulse + (i as u64 + 1) * self.config.pulse_ms)
                .await;
        }

        codec::to_fixed_hex(value, self.config.num_bits())
    }

    /// Decodes `list_size` digits by probing mid-pulse, mirroring the
    /// sender's schedule offset by half a pulse to dodge edge jitter.
    ///
    /// A probe of zero (no sender active) or above the radix aborts the
    /// cycle early with [`SessionError::Desynchronized`] carrying the
    /// partial decode.
    pub async fn receive(&mut self, t0: EpochMillis) -> Result<Reception, SessionError> {
        let first_pulse = t0 + self.config.negotiate_ms;
        let half_pulse = self.config.pulse_ms / 2;
        let mut digits: Vec<u32> = Vec::with_capacity(self.config.list_size);

        for i in 0..self.config.list_size {
            self.clock
                .sleep_until(first_pulse + i as u64 * self.config.pulse_ms + half_pulse)
                .await;

            // One slot of headroom past the radix: free capacity no
            // sender would leave shows up as observed > max_value.
            let observed = self.pool.probe(self.config.max_value as usize + 1).await;
            if observed == 0 || observed > self.config.max_value as usize {
                log::warn!(pulse = i, observed, "probe outside digit range");
                return Err(SessionError::Desynchronized {
                    pulse: i,
                    observed,
                    partial: codec::digits_to_integer(&digits, self.config.max_value),
                });
            }
            log::trace!(pulse = i, observed, digit = observed - 1, "digit probed");
            digits.push(observed as u32 - 1);
        }

        // End on the same pulse boundary as the sender: repeated cycles
        // stay phase-locked because both roles re-align from the same
        // instant.
        self.clock
            .sleep_until(first_pulse + self.config.list_size as u64 * self.config.pulse_ms)
            .await;

        let value = codec::digits_to_integer(&digits, self.config.max_value);
        Ok(Reception {
            value,
            hex: codec::to_fixed_hex(value, self.config.num_bits()),
            digits,
        })
    }

    /// Runs one full cycle: align to the grid, negotiate a role, send or
    /// receive, then drain.
    ///
    /// The drain runs on every path, including after a desynchronized
    /// receive, so the shared resource is never left starved for other
    /// participants.
    pub async fn run_cycle(&mut self, payload: Payload) -> CycleReport {
        let t0 = self.clock.align_to_grid(self.config.cycle_ms()).await;
        let started = self.clock.now();

        let role = self.negotiate().await;
        let outcome = match role {
            Role::Sender => {
                let value = match payload {
                    Payload::Fixed(value) => value,
                    Payload::Random => codec::random_integer(self.config.num_bits()),
                };
                let hex = self.send(value, t0).await;
                CycleOutcome::Sent { hex }
            }
            Role::Receiver => match self.receive(t0).await {
                Ok(reception) => CycleOutcome::Received {
                    hex: reception.hex,
                    digits: reception.digits,
                },
                Err(SessionError::Desynchronized {
                    pulse,
                    observed,
                    partial,
                }) => CycleOutcome::Garbled {
                    pulse,
                    observed,
                    partial_hex: codec::to_fixed_hex(partial, self.config.num_bits()),
                },
            },
        };

        self.pool.drain().await;
        let finished = self.clock.now();

        CycleReport {
            role,
            outcome,
            t0_ms: t0.as_u64(),
            elapsed_ms: finished - started,
            trace: self.pool.take_trace(),
        }
    }

    /// Runs `cycles` back-to-back cycles and returns every report.
    pub async fn run(&mut self, cycles: usize, payload: Payload) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(cycles);
        for _ in 0..cycles {
            reports.push(self.run_cycle(payload).await);
        }
        reports
    }
}
