//! `selective-repeat` — Selective-Repeat ARQ over an unreliable, order-preserving link.
//!
//! # Architecture
//!
//! ```text
//!  application                                        application
//!      │ submit(msg)                                       ▲ deliver
//!  ┌───▼──────┐     data packets      ┌───────────────┐    │
//!  │ SrSender │──────────────────────▶│  SrReceiver   │────┘
//!  │   (A)    │◀──────────────────────│     (B)       │
//!  └───┬──────┘   individual ACKs     └───────────────┘
//!      │ arm / cancel
//!  ┌───▼─────────────────────────────────────────────┐
//!  │  Harness  (simulator, or a Recorder in tests)   │
//!  └─────────────────────────────────────────────────┘
//! ```
//!
//! Both entities are plain owned state machines.  They share no memory and
//! perform every side effect through the [`harness::Harness`] they are
//! handed on each call, so any single-threaded event loop can drive them.
//!
//! Each module has a single responsibility:
//! - [`seq_space`]   — modulo arithmetic, window membership, sizing rules
//! - [`packet`]      — packet / message records, checksum, corruption test
//! - [`harness`]     — side-effect interface consumed by the entities
//! - [`timer`]       — the sender's single retransmit timer
//! - [`sr_sender`]   — SR outbound window state machine (A)
//! - [`sr_receiver`] — SR inbound buffering state machine (B)
//! - [`simulator`]   — seeded lossy/corrupting discrete-event channel
//! - [`error`]       — configuration errors

pub mod error;
pub mod harness;
pub mod packet;
pub mod seq_space;
pub mod simulator;
pub mod sr_receiver;
pub mod sr_sender;
pub mod timer;

pub use error::ConfigError;
pub use harness::{Entity, Harness};
pub use packet::{Message, Packet};
pub use seq_space::SeqSpace;
pub use sr_receiver::SrReceiver;
pub use sr_sender::SrSender;
