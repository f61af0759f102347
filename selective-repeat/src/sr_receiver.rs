//! Selective-Repeat receive-side state machine (entity B).
//!
//! [`SrReceiver`] implements the receiver side of Selective Repeat:
//!
//! - Any intact packet inside `[expected_seq, expected_seq + W)` is
//!   **buffered**, even when it arrives ahead of a gap.  A second copy of a
//!   buffered packet is not stored again.
//! - Every intact packet is acknowledged **individually** with its own
//!   sequence number, whether it was in the window or not.  A packet below
//!   the window is an old one whose ACK got lost; re-acknowledging it
//!   unblocks the sender.
//! - A corrupted packet is answered with an ACK for the last in-order
//!   sequence number (`expected_seq - 1`).
//! - After buffering, the contiguous run starting at `expected_seq` is
//!   delivered to the application and the window slides past it.
//!
//! Exactly one ACK is transmitted per inbound packet.

use crate::harness::{Entity, Harness};
use crate::packet::Packet;
use crate::seq_space::SeqSpace;

// ---------------------------------------------------------------------------
// Outcomes and counters
// ---------------------------------------------------------------------------

/// What [`SrReceiver::on_packet`] did with an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// Checksum mismatch; answered with an ACK for `expected_seq - 1`.
    Corrupted,
    /// First copy of an in-window packet; `delivered` payloads went up.
    Accepted { delivered: usize },
    /// In-window packet that was already buffered.
    Duplicate,
    /// Intact packet outside the receive window; acknowledged, not kept.
    OutOfWindow,
}

/// Diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Distinct in-window packets accepted into the buffer.
    pub packets_received: u64,
    /// Payloads handed to the application.
    pub delivered: u64,
    /// In-window packets that were already buffered.
    pub duplicates: u64,
    /// Intact packets outside the window.
    pub out_of_window: u64,
    /// Packets that failed the checksum.
    pub corrupted: u64,
    pub acks_sent: u64,
}

// ---------------------------------------------------------------------------
// SrReceiver
// ---------------------------------------------------------------------------

/// Selective-Repeat receive-side state.
///
/// ```text
///   expected_seq
///        │
///  ──────┼──────────────────────┼──────▶ seq space (mod M)
///        │ <── may buffer ────▶ │
///                        expected_seq + W
/// ```
#[derive(Debug)]
pub struct SrReceiver {
    seq: SeqSpace,

    /// Next sequence number the application is waiting for.
    expected_seq: i32,

    /// Received but not yet delivered, one slot per sequence number.
    buffer: Vec<Option<Packet>>,

    stats: ReceiverStats,
}

impl SrReceiver {
    pub fn new(seq: SeqSpace) -> Self {
        Self {
            seq,
            expected_seq: 0,
            buffer: vec![None; seq.modulus() as usize],
            stats: ReceiverStats::default(),
        }
    }

    /// Reset to expect sequence number 0 with an empty buffer.
    pub fn init(&mut self) {
        self.expected_seq = 0;
        self.buffer.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn expected_seq(&self) -> i32 {
        self.expected_seq
    }

    /// `true` when `seq` has been received but not yet delivered.
    pub fn is_buffered(&self, seq: i32) -> bool {
        self.seq.contains(seq) && self.buffer[self.seq.slot(seq)].is_some()
    }

    /// Number of packets held back waiting for a gap to fill.
    pub fn buffered(&self) -> usize {
        self.buffer.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Process one packet arriving from A.
    pub fn on_packet<H: Harness>(&mut self, packet: &Packet, harness: &mut H) -> RecvOutcome {
        if packet.is_corrupted() {
            let last = self.seq.prev(self.expected_seq);
            log::debug!("B: corrupted packet received, re-acknowledging {last}");
            self.stats.corrupted += 1;
            self.send_ack(last, harness);
            return RecvOutcome::Corrupted;
        }

        let seq = packet.seqnum;
        if !self.seq.in_window(seq, self.expected_seq, self.seq.window()) {
            log::debug!(
                "B: packet {seq} outside window starting at {}, acknowledging only",
                self.expected_seq
            );
            self.stats.out_of_window += 1;
            self.send_ack(seq, harness);
            return RecvOutcome::OutOfWindow;
        }

        let slot = self.seq.slot(seq);
        let first_copy = self.buffer[slot].is_none();
        if first_copy {
            log::debug!("B: packet {seq} received");
            self.buffer[slot] = Some(*packet);
            self.stats.packets_received += 1;
        } else {
            log::debug!("B: packet {seq} already buffered");
            self.stats.duplicates += 1;
        }

        self.send_ack(seq, harness);

        if !first_copy {
            return RecvOutcome::Duplicate;
        }
        let delivered = self.deliver_in_order(harness);
        RecvOutcome::Accepted { delivered }
    }

    /// Hand the contiguous run at `expected_seq` to the application.
    fn deliver_in_order<H: Harness>(&mut self, harness: &mut H) -> usize {
        let mut delivered = 0;
        while let Some(packet) = self.buffer[self.seq.slot(self.expected_seq)].take() {
            log::trace!("B: delivering packet {}", packet.seqnum);
            harness.deliver(Entity::B, packet.payload);
            self.expected_seq = self.seq.next(self.expected_seq);
            delivered += 1;
        }
        self.stats.delivered += delivered as u64;
        delivered
    }

    fn send_ack<H: Harness>(&mut self, acknum: i32, harness: &mut H) {
        harness.transmit(Entity::B, Packet::ack(acknum));
        self.stats.acks_sent += 1;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
