//! Delivery trace: one record per message the simulator handled.
//!
//! The trace captures the distance each message actually carried (read
//! from the sender at delivery time) and what became of the message. Its
//! hash is a cheap fingerprint for replay and determinism checks.

use crate::message::{Message, MessageKind};
use crate::node::Distance;
use crate::round::Round;

/// What happened to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DeliveryOutcome {
    /// The target's handler ran to completion.
    Delivered,
    /// The link between sender and target was gone; nothing ran.
    Dropped,
    /// The handler refused the message as a protocol violation.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    pub round: Round,
    pub message: Message,
    /// The sender's distance at the moment of delivery.
    pub carried: Distance,
    pub outcome: DeliveryOutcome,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {}] {}={} {:?}",
            self.round, self.message.id, self.message, self.carried, self.outcome
        )
    }
}

/// Combine two hashes deterministically (no randomized `std` hasher).
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Order-sensitive fingerprint of a trace.
pub fn trace_hash(entries: &[TraceEntry]) -> u64 {
    let mut h: u64 = 0;
    for e in entries {
        h = hash_combine(h, e.round.number());
        h = hash_combine(h, e.message.id.raw());
        h = hash_combine(h, e.message.from.raw());
        h = hash_combine(h, e.message.to.raw());
        h = hash_combine(h, kind_code(e.message.kind));
        h = hash_combine(h, e.carried.value().to_bits());
        h = hash_combine(h, e.outcome as u64);
    }
    h
}

fn kind_code(kind: MessageKind) -> u64 {
    match kind {
        MessageKind::Update => 1,
        MessageKind::Query => 2,
        MessageKind::Reply => 3,
    }
}
