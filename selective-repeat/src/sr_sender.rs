//! Selective-Repeat send-side state machine (entity A).
//!
//! [`SrSender`] maintains a sliding window of up to `W` in-flight packets.
//! Unlike Go-Back-N, each packet is acknowledged and retransmitted on its own.
//!
//! # Protocol contract
//!
//! - At most `window` packets may be unacknowledged at once.  A submission
//!   while the window is full is dropped and counted; it never blocks.
//! - ACKs are **individual**: `acknum = K` acknowledges packet `K` only.
//! - The window base advances only over a contiguous run of acknowledged
//!   packets starting at `base`.  An ACK for a later packet retires that slot
//!   but leaves `base` where it is.
//! - On timeout, only the **oldest** unacknowledged packet (the one at
//!   `base`) is retransmitted.  One packet per timeout, always.
//! - The single timer runs iff something is outstanding, and is restarted
//!   after every new ACK so it covers the current oldest packet.
//!
//! All side effects go through the [`Harness`] passed to each call.

use crate::harness::{Entity, Harness};
use crate::packet::{Message, Packet};
use crate::seq_space::SeqSpace;
use crate::timer::{RetransmitTimer, TimerConfig};

// ---------------------------------------------------------------------------
// SrEntry
// ---------------------------------------------------------------------------

/// A packet occupying one slot of the send buffer.
#[derive(Debug, Clone)]
pub struct SrEntry {
    /// The packet as last handed to the channel.
    pub packet: Packet,
    /// An ACK for this sequence number has arrived.
    pub acked: bool,
    /// Total number of times this packet has been transmitted.
    pub tx_count: u32,
}

// ---------------------------------------------------------------------------
// Outcomes and counters
// ---------------------------------------------------------------------------

/// What [`SrSender::on_packet`] did with an inbound ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Checksum mismatch; ignored.
    Corrupted,
    /// `acknum` is not one of the outstanding sequence numbers.
    OutOfRange,
    /// The packet was already acknowledged.
    Duplicate,
    /// A new ACK; `advanced` is how far `base` moved (possibly 0).
    New { advanced: usize },
}

/// Diagnostic counters.  They never influence protocol decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Packets transmitted for the first time.
    pub packets_sent: u64,
    /// Submissions dropped because the window was full.
    pub window_full: u64,
    /// Uncorrupted ACKs received.
    pub acks_received: u64,
    /// ACKs that retired a packet.
    pub new_acks: u64,
    /// ACKs for packets already retired.
    pub duplicate_acks: u64,
    /// ACKs outside the outstanding range.
    pub stale_acks: u64,
    /// ACKs that failed the checksum.
    pub corrupted_acks: u64,
    /// Timeout-driven retransmissions.
    pub packets_resent: u64,
}

// ---------------------------------------------------------------------------
// SrSender
// ---------------------------------------------------------------------------

/// Selective-Repeat send-side state.
///
/// # Sequence-number layout
///
/// ```text
///       base              next_seq
///        │                   │
///  ──────┼───────────────────┼──────────────┼──────▶ seq space (mod M)
///        │ <── in flight ──▶ │ <─ sendable ▶│
///                                      base + W
/// ```
#[derive(Debug)]
pub struct SrSender {
    seq: SeqSpace,

    /// Oldest unacknowledged sequence number (left window edge).
    base: i32,

    /// Sequence number for the next new packet.
    next_seq: i32,

    /// One slot per sequence number; `None` when the number is not in flight.
    buffer: Vec<Option<SrEntry>>,

    timer: RetransmitTimer,

    stats: SenderStats,
}

impl SrSender {
    /// Create a sender in its initial state.
    pub fn new(seq: SeqSpace, timer: TimerConfig) -> Self {
        Self {
            seq,
            base: 0,
            next_seq: 0,
            buffer: vec![None; seq.modulus() as usize],
            timer: RetransmitTimer::new(Entity::A, timer),
            stats: SenderStats::default(),
        }
    }

    /// Reset the window to empty, starting again at sequence number 0.
    ///
    /// The harness is expected to have no timer pending for A when it calls
    /// this.  Counters survive a reset.
    pub fn init(&mut self) {
        self.base = 0;
        self.next_seq = 0;
        self.buffer.iter_mut().for_each(|slot| *slot = None);
        self.timer.reset();
    }

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn next_seq(&self) -> i32 {
        self.next_seq
    }

    pub fn seq_space(&self) -> SeqSpace {
        self.seq
    }

    /// Number of packets sent but not yet slid out of the window.
    pub fn in_flight(&self) -> usize {
        self.seq.distance(self.base, self.next_seq) as usize
    }

    /// `true` when there is room for at least one more packet.
    pub fn can_send(&self) -> bool {
        (self.in_flight() as i32) < self.seq.window()
    }

    /// `true` when at least one packet is awaiting acknowledgement.
    pub fn has_unacked(&self) -> bool {
        self.base != self.next_seq
    }

    /// `true` when `seq` is in flight and has been acknowledged.
    pub fn is_acked(&self, seq: i32) -> bool {
        self.entry(seq).is_some_and(|e| e.acked)
    }

    /// The buffered entry for `seq`, if it is in flight.
    pub fn entry(&self, seq: i32) -> Option<&SrEntry> {
        if !self.seq.contains(seq) {
            return None;
        }
        self.buffer[self.seq.slot(seq)].as_ref()
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    /// Accept a message from the application.
    ///
    /// Returns `false` (and transmits nothing) when the window is full.
    pub fn submit<H: Harness>(&mut self, message: &Message, harness: &mut H) -> bool {
        if !self.can_send() {
            log::debug!("A: window full ({} in flight), message dropped", self.in_flight());
            self.stats.window_full += 1;
            return false;
        }

        let packet = Packet::data(self.next_seq, message);
        let slot = self.seq.slot(self.next_seq);
        self.buffer[slot] = Some(SrEntry {
            packet,
            acked: false,
            tx_count: 1,
        });

        log::debug!("A: sending packet {}", packet.seqnum);
        harness.transmit(Entity::A, packet);
        self.stats.packets_sent += 1;

        if !self.has_unacked() {
            self.timer.arm(harness);
        }
        self.next_seq = self.seq.next(self.next_seq);
        true
    }

    /// Process a packet arriving from B.  B only ever sends ACKs.
    pub fn on_packet<H: Harness>(&mut self, packet: &Packet, harness: &mut H) -> AckOutcome {
        if packet.is_corrupted() {
            log::debug!("A: corrupted ACK received, ignored");
            self.stats.corrupted_acks += 1;
            return AckOutcome::Corrupted;
        }
        self.stats.acks_received += 1;

        let acknum = packet.acknum;
        if !self
            .seq
            .in_window(acknum, self.base, self.in_flight() as i32)
        {
            log::debug!(
                "A: ACK {acknum} outside outstanding range [{}, {}), ignored",
                self.base,
                self.next_seq
            );
            self.stats.stale_acks += 1;
            return AckOutcome::OutOfRange;
        }

        let slot = self.seq.slot(acknum);
        match self.buffer[slot].as_mut() {
            Some(entry) if !entry.acked => entry.acked = true,
            _ => {
                log::debug!("A: duplicate ACK {acknum}, nothing to do");
                self.stats.duplicate_acks += 1;
                return AckOutcome::Duplicate;
            }
        }
        log::debug!("A: ACK {acknum} is new");
        self.stats.new_acks += 1;

        let advanced = self.slide();

        self.timer.cancel(harness);
        if self.has_unacked() {
            self.timer.arm(harness);
        }
        AckOutcome::New { advanced }
    }

    /// Retransmit the oldest unacknowledged packet and restart the timer.
    ///
    /// Returns the retransmitted sequence number, or `None` for an expiry
    /// that raced with the last ACK and found nothing outstanding.
    pub fn on_timeout<H: Harness>(&mut self, harness: &mut H) -> Option<i32> {
        self.timer.expired();
        if !self.has_unacked() {
            log::debug!("A: timeout with nothing outstanding");
            return None;
        }

        let slot = self.seq.slot(self.base);
        let entry = self.buffer[slot].as_mut()?;
        entry.tx_count += 1;
        let packet = entry.packet;

        log::debug!("A: timeout, resending packet {}", packet.seqnum);
        harness.transmit(Entity::A, packet);
        self.stats.packets_resent += 1;

        self.timer.arm(harness);
        Some(packet.seqnum)
    }

    /// Release every acknowledged slot at the front of the window.
    fn slide(&mut self) -> usize {
        let mut advanced = 0;
        while self.has_unacked() {
            let slot = self.seq.slot(self.base);
            if !matches!(&self.buffer[slot], Some(entry) if entry.acked) {
                break;
            }
            self.buffer[slot] = None;
            self.base = self.seq.next(self.base);
            advanced += 1;
        }
        advanced
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Recorder, TimerEvent};

    fn sender(modulus: usize, window: usize) -> SrSender {
        SrSender::new(SeqSpace::new(modulus, window).unwrap(), TimerConfig::default())
    }

    fn msg(n: u8) -> Message {
        Message::filled(b'a' + n)
    }

    #[test]
    fn initial_state() {
        let s = sender(12, 6);
        assert_eq!(s.base(), 0);
        assert_eq!(s.next_seq(), 0);
        assert!(s.can_send());
        assert!(!s.has_unacked());
        assert!(!s.timer_armed());
        assert_eq!(s.in_flight(), 0);
    }

    #[test]
    fn submit_transmits_and_arms_timer_once() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);

        assert!(s.submit(&msg(0), &mut h));
        assert!(s.submit(&msg(1), &mut h));

        let seqs: Vec<_> = h.sent_by(Entity::A).map(|p| p.seqnum).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(h.timer_events, vec![TimerEvent::Armed(Entity::A, 16.0)]);
        assert_eq!(s.next_seq(), 2);
        assert_eq!(s.in_flight(), 2);
        assert_eq!(s.stats().packets_sent, 2);
    }

    #[test]
    fn full_window_drops_submission() {
        let mut h = Recorder::new();
        let mut s = sender(8, 4);
        for n in 0..4 {
            assert!(s.submit(&msg(n), &mut h));
        }
        assert!(!s.can_send());
        assert!(!s.submit(&msg(4), &mut h));
        assert_eq!(h.sent.len(), 4);
        assert_eq!(s.stats().window_full, 1);
        assert_eq!(s.next_seq(), 4);
    }

    #[test]
    fn ack_for_base_slides_and_restarts_timer() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        s.submit(&msg(0), &mut h);
        s.submit(&msg(1), &mut h);
        h.clear();

        assert_eq!(
            s.on_packet(&Packet::ack(0), &mut h),
            AckOutcome::New { advanced: 1 }
        );
        assert_eq!(s.base(), 1);
        assert_eq!(
            h.timer_events,
            vec![TimerEvent::Cancelled(Entity::A), TimerEvent::Armed(Entity::A, 16.0)]
        );
    }

    #[test]
    fn last_ack_stops_timer() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        s.submit(&msg(0), &mut h);
        h.clear();

        s.on_packet(&Packet::ack(0), &mut h);
        assert!(!s.has_unacked());
        assert!(!s.timer_armed());
        assert_eq!(h.timer_events, vec![TimerEvent::Cancelled(Entity::A)]);
    }

    #[test]
    fn out_of_order_ack_holds_base() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        for n in 0..3 {
            s.submit(&msg(n), &mut h);
        }

        assert_eq!(
            s.on_packet(&Packet::ack(2), &mut h),
            AckOutcome::New { advanced: 0 }
        );
        assert_eq!(s.base(), 0);
        assert!(s.is_acked(2));
        assert!(!s.is_acked(0));
    }

    #[test]
    fn duplicate_ack_changes_nothing() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        s.submit(&msg(0), &mut h);
        s.submit(&msg(1), &mut h);
        s.on_packet(&Packet::ack(1), &mut h);
        h.clear();

        assert_eq!(s.on_packet(&Packet::ack(1), &mut h), AckOutcome::Duplicate);
        assert_eq!(s.base(), 0);
        assert!(h.timer_events.is_empty());
        assert_eq!(s.stats().duplicate_acks, 1);
        assert_eq!(s.stats().new_acks, 1);
    }

    #[test]
    fn ack_beyond_next_seq_ignored() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        s.submit(&msg(0), &mut h);

        assert_eq!(s.on_packet(&Packet::ack(5), &mut h), AckOutcome::OutOfRange);
        assert_eq!(s.on_packet(&Packet::ack(-1), &mut h), AckOutcome::OutOfRange);
        assert_eq!(s.base(), 0);
        assert_eq!(s.stats().stale_acks, 2);
    }

    #[test]
    fn ack_with_empty_window_ignored() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        assert_eq!(s.on_packet(&Packet::ack(0), &mut h), AckOutcome::OutOfRange);
        assert!(h.timer_events.is_empty());
    }

    #[test]
    fn corrupted_ack_ignored() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        s.submit(&msg(0), &mut h);

        let mut ack = Packet::ack(0);
        ack.acknum = 999_999;
        assert_eq!(s.on_packet(&ack, &mut h), AckOutcome::Corrupted);
        assert_eq!(s.base(), 0);
        assert_eq!(s.stats().acks_received, 0);
        assert_eq!(s.stats().corrupted_acks, 1);
    }

    #[test]
    fn timeout_resends_oldest_only() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        for n in 0..3 {
            s.submit(&msg(n), &mut h);
        }
        s.on_packet(&Packet::ack(0), &mut h);
        h.clear();

        assert_eq!(s.on_timeout(&mut h), Some(1));
        let resent: Vec<_> = h.sent_by(Entity::A).map(|p| p.seqnum).collect();
        assert_eq!(resent, vec![1]);
        assert_eq!(s.entry(1).unwrap().tx_count, 2);
        assert_eq!(s.entry(2).unwrap().tx_count, 1);
        assert!(s.timer_armed());
    }

    #[test]
    fn spurious_timeout_does_nothing() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        assert_eq!(s.on_timeout(&mut h), None);
        assert!(h.sent.is_empty());
        assert!(h.timer_events.is_empty());
    }

    #[test]
    fn window_wraps_around_sequence_space() {
        let mut h = Recorder::new();
        let mut s = sender(4, 2);

        for round in 0..5u8 {
            assert!(s.submit(&msg(round), &mut h));
            assert!(s.submit(&msg(round), &mut h));
            let first = s.base();
            let second = s.seq_space().next(first);
            s.on_packet(&Packet::ack(second), &mut h);
            s.on_packet(&Packet::ack(first), &mut h);
            assert!(!s.has_unacked());
        }
        assert_eq!(s.base(), 10 % 4);
        assert_eq!(s.stats().new_acks, 10);
    }

    #[test]
    fn init_empties_window() {
        let mut h = Recorder::new();
        let mut s = sender(12, 6);
        s.submit(&msg(0), &mut h);
        s.submit(&msg(1), &mut h);

        s.init();
        assert_eq!(s.base(), 0);
        assert_eq!(s.next_seq(), 0);
        assert!(!s.has_unacked());
        assert!(!s.timer_armed());
        assert!(s.entry(0).is_none());
    }
}
