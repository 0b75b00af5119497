//! Resource-pool telegraphy.
//!
//! Two independent processes that share no channel and no state beyond
//! wall-clock time can still talk, provided they both lean on the same capped
//! external resource (say, an endpoint with a maximum concurrent-connection
//! limit). One side holds slots and modulates how many it leaves free; the
//! other samples the remaining headroom at agreed instants and reads the
//! digits back out. This crate implements that protocol: role negotiation
//! by saturation race, pulse-synchronized slot modulation, and probe-based
//! decoding of one fixed-width integer per session.
//!
//! # Layers
//!
//! - [`provider`]: the `{create, destroy, is_live}` seam a resource kind
//!   implements, plus an in-process capped endpoint for tests and demos.
//! - [`pool`]: bounded, observable ownership of held slots.
//! - [`clock`]: wall-clock grid alignment, the only synchronization the
//!   participants get.
//! - [`codec`]: mixed-radix digit conversion and hex rendering.
//! - [`session`]: the role/pulse state machine tying it together.
//!
//! # Example
//!
//! ```no_run
//! use slotwire::{Clock, Payload, Session, SessionConfig, SharedCapEndpoint};
//!
//! # async fn demo() {
//! let endpoint = SharedCapEndpoint::new(255);
//! let mut session = Session::new(endpoint, Clock::system(), SessionConfig::websocket_chrome());
//! let reports = session.run(10, Payload::Random).await;
//! for report in &reports {
//!     println!("{}", serde_json::to_string(report).unwrap());
//! }
//! # }
//! ```
//!
//! The protocol offers no delivery guarantee, no payload secrecy, and no
//! resistance to a third consumer of the same resource; a garbled cycle
//! reports a partial decode and a full occupancy trace instead.

pub mod clock;
pub mod codec;
pub mod config;
pub(crate) mod log;
pub mod pool;
pub mod provider;
pub mod session;
pub mod trace;

pub use clock::{Clock, EpochMillis};
pub use config::SessionConfig;
pub use pool::Pool;
pub use provider::local::SharedCapEndpoint;
pub use provider::{CreateError, SlotProvider};
pub use session::{CycleOutcome, CycleReport, Payload, Reception, Role, Session, SessionError};
pub use trace::{OccupancyTrace, TraceSample};

#[doc(inline)]
pub use log::init_tracing;
