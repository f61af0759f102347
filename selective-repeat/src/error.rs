//! Error types.
//!
//! Protocol events (corruption, stale ACKs, a full window) are never errors;
//! they are absorbed by the state machines and show up only in outcomes and
//! counters.  The only fallible step is building a configuration.

use thiserror::Error;

/// A configuration value the protocol or simulator cannot run with.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The window must hold at least one packet.
    #[error("window size must be at least 1")]
    ZeroWindow,

    /// Selective Repeat needs `modulus >= 2 * window`, otherwise a
    /// retransmitted old packet is indistinguishable from a new one after
    /// the sequence numbers wrap.
    #[error("sequence space {modulus} is too small for window {window} (need modulus >= 2 * window)")]
    SeqSpaceTooSmall { modulus: i32, window: i32 },

    /// A value too large to be used as a sequence number bound.
    #[error("{name} = {value} is out of range")]
    OutOfRange { name: &'static str, value: usize },

    /// A probability outside `[0.0, 1.0]`.
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    /// A time interval that is not strictly positive (or not finite).
    #[error("{name} must be a positive number of time units, got {value}")]
    InvalidInterval { name: &'static str, value: f64 },
}
