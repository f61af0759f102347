//! The surface the state machines drive.
//!
//! [`crate::sr_sender::SrSender`] and [`crate::sr_receiver::SrReceiver`]
//! never touch a channel, a clock or the application directly.  Every side
//! effect goes through a [`Harness`]: the discrete-event
//! [`crate::simulator::Simulator`] in normal runs, or a [`Recorder`] when a
//! test drives the machines by hand.

use std::fmt;

use crate::packet::{Packet, PAYLOAD_LEN};

/// The two ends of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Sender side.
    A,
    /// Receiver side.
    B,
}

impl Entity {
    /// The other end of the link.
    pub fn peer(self) -> Self {
        match self {
            Entity::A => Entity::B,
            Entity::B => Entity::A,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::A => write!(f, "A"),
            Entity::B => write!(f, "B"),
        }
    }
}

/// Side effects available to an entity while it handles one event.
pub trait Harness {
    /// Hand `packet` to the unreliable channel, addressed to `from`'s peer.
    fn transmit(&mut self, from: Entity, packet: Packet);

    /// Pass an in-order payload up to the application at `at`.
    fn deliver(&mut self, at: Entity, payload: [u8; PAYLOAD_LEN]);

    /// Start `entity`'s single-shot timer, expiring `increment` time units
    /// from now.
    fn arm_timer(&mut self, entity: Entity, increment: f64);

    /// Stop `entity`'s timer.
    fn cancel_timer(&mut self, entity: Entity);
}

/// A timer call seen by a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerEvent {
    Armed(Entity, f64),
    Cancelled(Entity),
}

/// A [`Harness`] that just writes down every call, in order.
#[derive(Debug, Default)]
pub struct Recorder {
    /// `(sender, packet)` for every transmission.
    pub sent: Vec<(Entity, Packet)>,
    /// `(entity, payload)` for every delivery.
    pub delivered: Vec<(Entity, [u8; PAYLOAD_LEN])>,
    pub timer_events: Vec<TimerEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets transmitted by `entity`, oldest first.
    pub fn sent_by(&self, entity: Entity) -> impl Iterator<Item = &Packet> {
        self.sent
            .iter()
            .filter(move |(from, _)| *from == entity)
            .map(|(_, p)| p)
    }

    /// Drop everything recorded so far.
    pub fn clear(&mut self) {
        self.sent.clear();
        self.delivered.clear();
        self.timer_events.clear();
    }
}

impl Harness for Recorder {
    fn transmit(&mut self, from: Entity, packet: Packet) {
        self.sent.push((from, packet));
    }

    fn deliver(&mut self, at: Entity, payload: [u8; PAYLOAD_LEN]) {
        self.delivered.push((at, payload));
    }

    fn arm_timer(&mut self, entity: Entity, increment: f64) {
        self.timer_events.push(TimerEvent::Armed(entity, increment));
    }

    fn cancel_timer(&mut self, entity: Entity) {
        self.timer_events.push(TimerEvent::Cancelled(entity));
    }
}
