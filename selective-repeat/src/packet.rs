//! Packet and message records exchanged with the link and the application.
//!
//! Every unit handed to the channel is a [`Packet`]; every unit exchanged
//! with the application is a [`Message`].  This module is responsible for:
//! - Building data and acknowledgment packets with a valid checksum.
//! - Computing the checksum and detecting corruption.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Layout
//!
//! ```text
//! +-----------+-----------+-----------+----------------------------+
//! |  seqnum   |  acknum   | checksum  |     payload (20 bytes)     |
//! +-----------+-----------+-----------+----------------------------+
//!   data:  seqnum = N,           acknum = NOT_IN_USE, payload = message
//!   ack:   seqnum = NOT_IN_USE,  acknum = N,          payload = zeroes
//! ```
//!
//! The checksum is the wrapping 32-bit sum `seqnum + acknum + Σ payload[i]`.
//! That catches the simulated link's corruption model (one field or one
//! byte overwritten); it is not a general-purpose integrity check.

/// Bytes carried by every packet and message.
pub const PAYLOAD_LEN: usize = 20;

/// Filler for header fields a packet does not use.
pub const NOT_IN_USE: i32 = -1;

/// Fixed-size application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub data: [u8; PAYLOAD_LEN],
}

impl Message {
    pub fn new(data: [u8; PAYLOAD_LEN]) -> Self {
        Self { data }
    }

    /// A message made of one repeated byte.
    pub fn filled(byte: u8) -> Self {
        Self {
            data: [byte; PAYLOAD_LEN],
        }
    }
}

impl From<[u8; PAYLOAD_LEN]> for Message {
    fn from(data: [u8; PAYLOAD_LEN]) -> Self {
        Self { data }
    }
}

/// A datagram on the simulated link.
///
/// Fields are public because the link may overwrite them in flight; code
/// that creates packets should go through [`Packet::data`] or
/// [`Packet::ack`] so the checksum is always filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub seqnum: i32,
    pub acknum: i32,
    pub checksum: i32,
    pub payload: [u8; PAYLOAD_LEN],
}

impl Packet {
    /// Data packet carrying `message` under sequence number `seqnum`.
    pub fn data(seqnum: i32, message: &Message) -> Self {
        Self::sealed(seqnum, NOT_IN_USE, message.data)
    }

    /// Acknowledgment for sequence number `acknum`.
    pub fn ack(acknum: i32) -> Self {
        Self::sealed(NOT_IN_USE, acknum, [0u8; PAYLOAD_LEN])
    }

    fn sealed(seqnum: i32, acknum: i32, payload: [u8; PAYLOAD_LEN]) -> Self {
        let mut packet = Self {
            seqnum,
            acknum,
            checksum: 0,
            payload,
        };
        packet.checksum = compute_checksum(&packet);
        packet
    }

    /// See [`is_corrupted`].
    pub fn is_corrupted(&self) -> bool {
        is_corrupted(self)
    }
}

/// Checksum over every field except `checksum` itself.
pub fn compute_checksum(packet: &Packet) -> i32 {
    packet
        .payload
        .iter()
        .fold(packet.seqnum.wrapping_add(packet.acknum), |sum, &b| {
            sum.wrapping_add(i32::from(b))
        })
}

/// `true` when the stored checksum no longer matches the packet contents.
pub fn is_corrupted(packet: &Packet) -> bool {
    compute_checksum(packet) != packet.checksum
}
