//! Retransmit timer management.
//!
//! Each sender owns exactly one logical timer.  It is armed while at least
//! one packet is unacknowledged and always covers the *oldest* one.  This
//! module provides:
//! - [`TimerConfig`] — the retransmission interval.
//! - [`RetransmitTimer`] — the armed/disarmed bookkeeping that sits in front
//!   of the [`Harness`] timer, so start and stop calls always pair up.
//!
//! The harness timer is single-shot and does not forgive misuse, so the
//! pairing is enforced here: arming an armed timer and cancelling a stopped
//! one are both no-ops.

use crate::harness::{Entity, Harness};

/// Default round-trip interval, in simulated time units.
pub const DEFAULT_RTT: f64 = 16.0;

/// Adjustable timeout parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerConfig {
    /// Time between a (re)transmission and its timeout.
    pub rtt: f64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { rtt: DEFAULT_RTT }
    }
}

/// Armed/disarmed state of one entity's retransmit timer.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    owner: Entity,
    config: TimerConfig,
    armed: bool,
}

impl RetransmitTimer {
    pub fn new(owner: Entity, config: TimerConfig) -> Self {
        Self {
            owner,
            config,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    /// Start the timer for one round-trip interval.
    pub fn arm<H: Harness>(&mut self, harness: &mut H) {
        if self.armed {
            log::warn!("{}: timer already running, not restarting", self.owner);
            return;
        }
        harness.arm_timer(self.owner, self.config.rtt);
        self.armed = true;
    }

    /// Stop the timer if it is running.
    pub fn cancel<H: Harness>(&mut self, harness: &mut H) {
        if !self.armed {
            log::trace!("{}: timer already stopped", self.owner);
            return;
        }
        harness.cancel_timer(self.owner);
        self.armed = false;
    }

    /// Stop (if running) and start again from now.
    pub fn restart<H: Harness>(&mut self, harness: &mut H) {
        self.cancel(harness);
        self.arm(harness);
    }

    /// The harness reported expiry; the single-shot timer is no longer running.
    pub fn expired(&mut self) {
        self.armed = false;
    }

    /// Forget the running state without telling the harness (entity reset).
    pub fn reset(&mut self) {
        self.armed = false;
    }
}
