//! Sequence-number arithmetic shared by both ends.
//!
//! Sequence numbers live in `[0, modulus)` and wrap.  A *window* is the
//! circular range of `size` numbers starting at some base:
//!
//! ```text
//!  modulus = 8, base = 6, size = 4
//!
//!    0   1   2   3   4   5   6   7
//!  ┌───┬───┬───┬───┬───┬───┬───┬───┐
//!  │ ■ │ ■ │   │   │   │   │ ■ │ ■ │      ■ = in window {6, 7, 0, 1}
//!  └───┴───┴───┴───┴───┴───┴───┴───┘
//! ```
//!
//! [`SeqSpace`] bundles the modulus with the protocol window size and is the
//! only way the state machines learn either.  Construction enforces the
//! Selective-Repeat bound `modulus >= 2 * window`.

use crate::error::ConfigError;

/// Default window size (maximum number of unacknowledged packets).
pub const DEFAULT_WINDOW: i32 = 6;

/// Default sequence-number modulus: the smallest one valid for
/// [`DEFAULT_WINDOW`].
pub const DEFAULT_MODULUS: i32 = 2 * DEFAULT_WINDOW;

/// Returns `true` when `seq` is one of `{base, base+1, …, base+size-1}`
/// taken modulo `modulus`.
///
/// Any `seq` outside `[0, modulus)` is never in a window, so a packet with a
/// mangled sequence number cannot be mistaken for a valid one.
#[inline]
pub fn in_window(seq: i32, base: i32, size: i32, modulus: i32) -> bool {
    if modulus <= 0 || size <= 0 || !(0..modulus).contains(&seq) {
        return false;
    }
    (seq - base).rem_euclid(modulus) < size.min(modulus)
}

/// Sequence-space parameters for one sender/receiver pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    modulus: i32,
    window: i32,
}

impl SeqSpace {
    /// Validate and build a sequence space.
    ///
    /// Fails with [`ConfigError::SeqSpaceTooSmall`] for any modulus below
    /// `2 * window`, including the Go-Back-N sizing `window + 1`.
    pub fn new(modulus: usize, window: usize) -> Result<Self, ConfigError> {
        let window = i32::try_from(window).map_err(|_| ConfigError::OutOfRange {
            name: "window",
            value: window,
        })?;
        let modulus = i32::try_from(modulus).map_err(|_| ConfigError::OutOfRange {
            name: "seq_space",
            value: modulus,
        })?;
        if window < 1 {
            return Err(ConfigError::ZeroWindow);
        }
        if i64::from(modulus) < 2 * i64::from(window) {
            return Err(ConfigError::SeqSpaceTooSmall { modulus, window });
        }
        Ok(Self { modulus, window })
    }

    /// Number of distinct sequence numbers.
    pub fn modulus(&self) -> i32 {
        self.modulus
    }

    /// Window size W.
    pub fn window(&self) -> i32 {
        self.window
    }

    /// `true` when `seq` is a legal sequence number.
    pub fn contains(&self, seq: i32) -> bool {
        (0..self.modulus).contains(&seq)
    }

    /// See [`in_window`].
    pub fn in_window(&self, seq: i32, base: i32, size: i32) -> bool {
        in_window(seq, base, size, self.modulus)
    }

    /// The sequence number following `seq`.
    pub fn next(&self, seq: i32) -> i32 {
        (seq + 1).rem_euclid(self.modulus)
    }

    /// The sequence number preceding `seq`.
    pub fn prev(&self, seq: i32) -> i32 {
        (seq - 1).rem_euclid(self.modulus)
    }

    /// How many steps forward it takes to get from `from` to `to`.
    pub fn distance(&self, from: i32, to: i32) -> i32 {
        (to - from).rem_euclid(self.modulus)
    }

    /// Buffer slot for a sequence number already known to be in range.
    pub(crate) fn slot(&self, seq: i32) -> usize {
        debug_assert!(self.contains(seq), "sequence number {seq} out of range");
        seq.rem_euclid(self.modulus) as usize
    }
}

impl Default for SeqSpace {
    fn default() -> Self {
        Self {
            modulus: DEFAULT_MODULUS,
            window: DEFAULT_WINDOW,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
