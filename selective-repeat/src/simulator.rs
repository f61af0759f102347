//! Discrete-event network simulator.
//!
//! Real links drop and damage packets.  To exercise the reliability
//! mechanisms deterministically, [`Simulator`] drives one [`SrSender`] and one
//! [`SrReceiver`] over a simulated channel with a seeded fault model:
//!
//! | Fault       | Description                                               |
//! |-------------|-----------------------------------------------------------|
//! | Packet loss | Drop a packet with probability `loss_prob`.               |
//! | Corruption  | Overwrite the first payload byte (3/4 of cases), the      |
//! |             | sequence number (1/8) or the ack number (1/8) with        |
//! |             | probability `corrupt_prob`.                               |
//! | Delay       | Each packet takes 1–10 time units.  The channel is FIFO:  |
//! |             | a packet never overtakes an earlier one to the same peer. |
//!
//! The application at A produces `messages` messages, spaced on average
//! `avg_interarrival` time units apart.  A message that arrives while the
//! send window is full is dropped, exactly as the sender reports it.
//!
//! The same seed always yields the same run.

use std::collections::VecDeque;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;
use crate::harness::{Entity, Harness};
use crate::packet::{Message, Packet, PAYLOAD_LEN};
use crate::seq_space::SeqSpace;
use crate::sr_receiver::{ReceiverStats, SrReceiver};
use crate::sr_sender::{SenderStats, SrSender};
use crate::timer::TimerConfig;

/// Value written into a header field the channel mangles.
const MANGLED_FIELD: i32 = 999_999;

/// Byte written over the first payload byte the channel mangles.
const MANGLED_BYTE: u8 = b'Z';

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the fault-injection model and the traffic source.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of messages the application at A generates.
    pub messages: usize,
    /// Probability that any given packet is silently dropped.
    pub loss_prob: f64,
    /// Probability that a packet that was not dropped is corrupted.
    pub corrupt_prob: f64,
    /// Mean time between two application messages.
    pub avg_interarrival: f64,
    /// RNG seed.
    pub seed: u64,
    /// Simulated time after which the run is abandoned.
    pub max_time: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default: the channel only delays.
        Self {
            messages: 20,
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            avg_interarrival: 10.0,
            seed: 0,
            max_time: 1_000_000.0,
        }
    }
}

impl SimulatorConfig {
    /// Reject values the simulator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("loss_prob", self.loss_prob), ("corrupt_prob", self.corrupt_prob)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        for (name, value) in [
            ("avg_interarrival", self.avg_interarrival),
            ("max_time", self.max_time),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidInterval { name, value });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum EventKind {
    /// The application at A has a new message.
    FromApplication,
    /// A packet reaches `to`.
    FromNetwork { to: Entity, packet: Packet },
    /// `entity`'s timer went off.
    TimerExpiry(Entity),
}

#[derive(Debug, Clone)]
struct Event {
    time: f64,
    kind: EventKind,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Channel-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Packets handed to the channel by either side.
    pub transmitted: u64,
    pub lost: u64,
    pub corrupted: u64,
}

/// The clock, the event list and the fault model.  This is the [`Harness`]
/// the two entities see.
#[derive(Debug)]
struct Network {
    now: f64,
    /// Ordered by time; events with equal times keep insertion order.
    events: VecDeque<Event>,
    rng: StdRng,
    loss_prob: f64,
    corrupt_prob: f64,
    /// Latest scheduled arrival per destination, to keep the channel FIFO.
    last_arrival: [f64; 2],
    stats: ChannelStats,
    delivered: Vec<[u8; PAYLOAD_LEN]>,
}

impl Network {
    fn new(config: &SimulatorConfig) -> Self {
        Self {
            now: 0.0,
            events: VecDeque::new(),
            rng: StdRng::seed_from_u64(config.seed),
            loss_prob: config.loss_prob,
            corrupt_prob: config.corrupt_prob,
            last_arrival: [0.0; 2],
            stats: ChannelStats::default(),
            delivered: Vec::new(),
        }
    }

    fn schedule(&mut self, time: f64, kind: EventKind) {
        let at = self.events.partition_point(|e| e.time <= time);
        self.events.insert(at, Event { time, kind });
    }

    fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn timer_pending(&self, entity: Entity) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e.kind, EventKind::TimerExpiry(owner) if owner == entity))
    }

    fn corrupt(&mut self, packet: &mut Packet) {
        let x = self.uniform();
        if x < 0.75 {
            packet.payload[0] = MANGLED_BYTE;
        } else if x < 0.875 {
            packet.seqnum = MANGLED_FIELD;
        } else {
            packet.acknum = MANGLED_FIELD;
        }
    }
}

fn index(entity: Entity) -> usize {
    match entity {
        Entity::A => 0,
        Entity::B => 1,
    }
}

impl Harness for Network {
    fn transmit(&mut self, from: Entity, mut packet: Packet) {
        self.stats.transmitted += 1;

        if self.uniform() < self.loss_prob {
            log::trace!("channel: packet from {from} lost");
            self.stats.lost += 1;
            return;
        }

        if self.uniform() < self.corrupt_prob {
            log::trace!("channel: packet from {from} corrupted");
            self.corrupt(&mut packet);
            self.stats.corrupted += 1;
        }

        let to = from.peer();
        let slot = index(to);
        let arrival = self.now.max(self.last_arrival[slot]) + 1.0 + 9.0 * self.uniform();
        self.last_arrival[slot] = arrival;
        log::trace!("channel: packet from {from} arrives at {to} at t={arrival:.3}");
        self.schedule(arrival, EventKind::FromNetwork { to, packet });
    }

    fn deliver(&mut self, at: Entity, payload: [u8; PAYLOAD_LEN]) {
        log::trace!("t={:.3}: {at} delivers {:?}", self.now, String::from_utf8_lossy(&payload));
        if at == Entity::B {
            self.delivered.push(payload);
        }
    }

    fn arm_timer(&mut self, entity: Entity, increment: f64) {
        if self.timer_pending(entity) {
            log::warn!("t={:.3}: {entity} started a timer that is already running", self.now);
            return;
        }
        self.schedule(self.now + increment, EventKind::TimerExpiry(entity));
    }

    fn cancel_timer(&mut self, entity: Entity) {
        let before = self.events.len();
        self.events
            .retain(|e| !matches!(e.kind, EventKind::TimerExpiry(owner) if owner == entity));
        if self.events.len() == before {
            log::warn!("t={:.3}: {entity} stopped a timer that was not running", self.now);
        }
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Result of one [`Simulator::run`].
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    pub channel: ChannelStats,
    /// Messages the application at A produced.
    pub generated: usize,
    /// Payloads A accepted into its window, in submission order.
    pub accepted: Vec<[u8; PAYLOAD_LEN]>,
    /// Payloads B handed to its application, in delivery order.
    pub delivered: Vec<[u8; PAYLOAD_LEN]>,
    /// Simulated time of the last processed event.
    pub end_time: f64,
    /// The run hit `max_time` with events still pending.
    pub timed_out: bool,
}

impl SimulationReport {
    /// Every accepted message reached B exactly once and in order.
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.accepted == self.delivered
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulation ended at t={:.3}", self.end_time)?;
        writeln!(f, "  messages generated:      {}", self.generated)?;
        writeln!(f, "  dropped, window full:    {}", self.sender.window_full)?;
        writeln!(f, "  packets sent by A:       {}", self.sender.packets_sent)?;
        writeln!(f, "  packets resent by A:     {}", self.sender.packets_resent)?;
        writeln!(f, "  ACKs received by A:      {}", self.sender.acks_received)?;
        writeln!(f, "  new ACKs:                {}", self.sender.new_acks)?;
        writeln!(f, "  packets received by B:   {}", self.receiver.packets_received)?;
        writeln!(f, "  messages delivered by B: {}", self.delivered.len())?;
        writeln!(
            f,
            "  channel: {} transmitted, {} lost, {} corrupted",
            self.channel.transmitted, self.channel.lost, self.channel.corrupted
        )?;
        if self.timed_out {
            write!(f, "  gave up before the link drained")
        } else if self.is_complete() {
            write!(f, "  all accepted messages delivered in order")
        } else {
            write!(f, "  DELIVERY MISMATCH")
        }
    }
}

/// One sender, one receiver and the channel between them.
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    sender: SrSender,
    receiver: SrReceiver,
    net: Network,
    generated: usize,
    accepted: Vec<[u8; PAYLOAD_LEN]>,
}

impl Simulator {
    /// Build a simulator with both entities freshly initialised.
    pub fn new(
        config: SimulatorConfig,
        seq: SeqSpace,
        timer: TimerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !timer.rtt.is_finite() || timer.rtt <= 0.0 {
            return Err(ConfigError::InvalidInterval {
                name: "rtt",
                value: timer.rtt,
            });
        }

        let mut sender = SrSender::new(seq, timer);
        let mut receiver = SrReceiver::new(seq);
        sender.init();
        receiver.init();

        let mut sim = Self {
            net: Network::new(&config),
            config,
            sender,
            receiver,
            generated: 0,
            accepted: Vec::new(),
        };
        if sim.config.messages > 0 {
            sim.schedule_next_message();
        }
        Ok(sim)
    }

    /// Process events until nothing is left or `max_time` is reached.
    pub fn run(mut self) -> SimulationReport {
        log::info!(
            "simulating {} messages (loss {}, corruption {}, seed {})",
            self.config.messages,
            self.config.loss_prob,
            self.config.corrupt_prob,
            self.config.seed
        );

        let mut timed_out = false;
        while let Some(event) = self.net.pop() {
            if event.time > self.config.max_time {
                timed_out = true;
                break;
            }
            self.net.now = event.time;
            self.dispatch(event.kind);
        }

        let report = SimulationReport {
            sender: self.sender.stats(),
            receiver: self.receiver.stats(),
            channel: self.net.stats,
            generated: self.generated,
            accepted: self.accepted,
            delivered: self.net.delivered,
            end_time: self.net.now,
            timed_out,
        };
        log::info!(
            "simulation finished at t={:.3}: {} of {} accepted messages delivered",
            report.end_time,
            report.delivered.len(),
            report.accepted.len()
        );
        report
    }

    fn dispatch(&mut self, kind: EventKind) {
        match kind {
            EventKind::FromApplication => {
                let message = self.next_message();
                self.generated += 1;
                if self.sender.submit(&message, &mut self.net) {
                    self.accepted.push(message.data);
                }
                if self.generated < self.config.messages {
                    self.schedule_next_message();
                }
            }
            EventKind::FromNetwork {
                to: Entity::A,
                packet,
            } => {
                self.sender.on_packet(&packet, &mut self.net);
            }
            EventKind::FromNetwork {
                to: Entity::B,
                packet,
            } => {
                self.receiver.on_packet(&packet, &mut self.net);
            }
            EventKind::TimerExpiry(Entity::A) => {
                self.sender.on_timeout(&mut self.net);
            }
            EventKind::TimerExpiry(Entity::B) => {
                log::warn!("B has no timer, expiry ignored");
            }
        }
    }

    /// Twenty copies of one letter, cycling through the alphabet.
    fn next_message(&self) -> Message {
        Message::filled(b'a' + (self.generated % 26) as u8)
    }

    fn schedule_next_message(&mut self) {
        let gap = self.config.avg_interarrival * 2.0 * self.net.uniform();
        let at = self.net.now + gap;
        self.net.schedule(at, EventKind::FromApplication);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(config: SimulatorConfig) -> SimulationReport {
        Simulator::new(config, SeqSpace::default(), TimerConfig::default())
            .unwrap()
            .run()
    }

    #[test]
    fn events_kept_in_time_order() {
        let mut net = Network::new(&SimulatorConfig::default());
        net.schedule(5.0, EventKind::TimerExpiry(Entity::A));
        net.schedule(1.0, EventKind::FromApplication);
        net.schedule(5.0, EventKind::TimerExpiry(Entity::B));
        net.schedule(3.0, EventKind::FromApplication);

        let times: Vec<f64> = std::iter::from_fn(|| net.pop()).map(|e| e.time).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0, 5.0]);
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut net = Network::new(&SimulatorConfig::default());
        net.schedule(2.0, EventKind::TimerExpiry(Entity::A));
        net.schedule(2.0, EventKind::TimerExpiry(Entity::B));
        assert!(matches!(
            net.pop().map(|e| e.kind),
            Some(EventKind::TimerExpiry(Entity::A))
        ));
    }

    #[test]
    fn channel_is_fifo() {
        let mut net = Network::new(&SimulatorConfig::default());
        for seq in 0..20 {
            net.transmit(Entity::A, Packet::ack(seq));
        }
        let order: Vec<i32> = std::iter::from_fn(|| net.pop())
            .filter_map(|e| match e.kind {
                EventKind::FromNetwork { packet, .. } => Some(packet.acknum),
                _ => None,
            })
            .collect();
        assert_eq!(order, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn arrival_delay_bounds() {
        let mut net = Network::new(&SimulatorConfig::default());
        net.now = 100.0;
        net.transmit(Entity::B, Packet::ack(0));
        let event = net.pop().unwrap();
        assert!(event.time >= 101.0 && event.time <= 110.0);
    }

    #[test]
    fn total_loss_delivers_nothing() {
        let mut net = Network::new(&SimulatorConfig {
            loss_prob: 1.0,
            ..SimulatorConfig::default()
        });
        net.transmit(Entity::A, Packet::ack(0));
        assert!(net.pop().is_none());
        assert_eq!(net.stats.lost, 1);
    }

    #[test]
    fn total_corruption_always_detected() {
        let mut net = Network::new(&SimulatorConfig {
            corrupt_prob: 1.0,
            ..SimulatorConfig::default()
        });
        for seq in 0..50 {
            net.transmit(Entity::A, Packet::data(seq % 12, &Message::filled(b'q')));
        }
        while let Some(event) = net.pop() {
            if let EventKind::FromNetwork { packet, .. } = event.kind {
                assert!(packet.is_corrupted());
            }
        }
        assert_eq!(net.stats.corrupted, 50);
    }

    #[test]
    fn timer_arm_and_cancel() {
        let mut net = Network::new(&SimulatorConfig::default());
        net.arm_timer(Entity::A, 16.0);
        net.arm_timer(Entity::A, 16.0);
        assert_eq!(net.events.len(), 1);
        net.cancel_timer(Entity::A);
        assert!(!net.timer_pending(Entity::A));
        net.cancel_timer(Entity::A);
        assert!(net.events.is_empty());
    }

    #[test]
    fn invalid_probability_rejected() {
        let config = SimulatorConfig {
            loss_prob: 1.5,
            ..SimulatorConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidProbability {
                name: "loss_prob",
                value: 1.5
            })
        );
    }

    #[test]
    fn invalid_interval_rejected() {
        let config = SimulatorConfig {
            avg_interarrival: 0.0,
            ..SimulatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval { name: "avg_interarrival", .. })
        ));
    }

    #[test]
    fn invalid_rtt_rejected() {
        let err = Simulator::new(
            SimulatorConfig::default(),
            SeqSpace::default(),
            TimerConfig { rtt: -1.0 },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval { name: "rtt", .. }));
    }

    #[test]
    fn perfect_link_delivers_everything() {
        let report = run(SimulatorConfig {
            messages: 50,
            avg_interarrival: 20.0,
            ..SimulatorConfig::default()
        });
        assert!(report.is_complete());
        assert_eq!(report.generated, 50);
        assert_eq!(report.channel.lost, 0);
        assert_eq!(report.channel.corrupted, 0);
    }

    #[test]
    fn zero_messages_ends_immediately() {
        let report = run(SimulatorConfig {
            messages: 0,
            ..SimulatorConfig::default()
        });
        assert!(report.is_complete());
        assert_eq!(report.generated, 0);
        assert_eq!(report.channel.transmitted, 0);
    }

    #[test]
    fn same_seed_same_run() {
        let config = SimulatorConfig {
            messages: 40,
            loss_prob: 0.2,
            corrupt_prob: 0.2,
            seed: 7,
            ..SimulatorConfig::default()
        };
        let a = run(config.clone());
        let b = run(config);
        assert_eq!(a.sender, b.sender);
        assert_eq!(a.channel, b.channel);
        assert_eq!(a.end_time, b.end_time);
    }
}
